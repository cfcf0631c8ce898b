//! # mpdc Performance Benchmarks
//!
//! - **Parsing**: lexing and parsing expressions of growing size
//! - **Evaluation**: resolving expressions over synthetic catalogs
//! - **Collections**: nested collection resolution and cycle checks
//! - **Cache**: snapshot writes and reads through SQLite
//!
//! ```bash
//! cargo bench
//! cargo bench evaluation
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::hint::black_box;
use tempfile::TempDir;

use mpdc::cache::{Cache, CacheExt, SqliteCache};
use mpdc::catalog::{Catalog, Playlists, TagRecord, Track};
use mpdc::cel;
use mpdc::collections::CollectionStore;

/// Catalog of `size` tracks spread over 50 artists and 200 albums, plus a
/// stored playlist holding every tenth track in reverse.
fn create_catalog(size: usize) -> Catalog {
    let tracks: Vec<Track> = (0..size)
        .map(|i| {
            Track::new(
                format!("Artist {}/Album {}/{:04}.{}", i % 50, i % 200, i, if i % 3 == 0 { "flac" } else { "mp3" }),
                TagRecord {
                    artist: format!("Artist {}", i % 50),
                    albumartist: format!("Artist {}", i % 50),
                    album: format!("Album {}", i % 200),
                    title: format!("Song {i}"),
                    track: format!("{}", i % 12 + 1),
                },
            )
        })
        .collect();

    let mut playlists = Playlists::new();
    playlists.insert(
        "road".to_string(),
        tracks.iter().rev().step_by(10).map(|t| t.file.clone()).collect(),
    );
    Catalog::new(tracks, playlists)
}

/// Chain `level0 = artist:1`, `levelN = level(N-1) OR album:N`.
fn create_store(depth: usize) -> CollectionStore {
    let mut store = CollectionStore::new();
    store.define("level0", "artist:\"Artist 1\"").expect("valid definition");
    for n in 1..depth {
        store
            .define(&format!("level{n}"), &format!("level{} OR album:\"Album {n}\"", n - 1))
            .expect("valid definition");
    }
    store
}

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    group.bench_function("typical_expression", |b| {
        b.iter(|| {
            black_box(cel::parse_expression(black_box(
                r#"(artist:"Miles Davis" OR road) AND NOT (extension:mp3 OR track:1)"#,
            )))
        })
    });

    for terms in [10usize, 100, 1000] {
        let text = (0..terms).map(|i| format!("album:{i}")).collect::<Vec<_>>().join(" OR ");
        group.bench_with_input(BenchmarkId::new("or_chain", terms), &text, |b, text| {
            b.iter(|| black_box(cel::parse_expression(text)))
        });
    }

    group.finish();
}

fn benchmark_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");
    let store = CollectionStore::new();

    for size in [1_000usize, 10_000, 50_000] {
        let catalog = create_catalog(size);
        let tree = cel::parse_expression(r#"(artist:"Artist 7" OR road) AND NOT extension:mp3"#)
            .expect("valid expression");
        group.bench_with_input(BenchmarkId::new("mixed", size), &catalog, |b, catalog| {
            b.iter(|| black_box(cel::evaluate(&tree, catalog, &store)))
        });

        let all = cel::parse_expression("NOT NOT all").expect("valid expression");
        group.bench_with_input(BenchmarkId::new("double_negation_all", size), &catalog, |b, catalog| {
            b.iter(|| black_box(cel::evaluate(&all, catalog, &store)))
        });
    }

    group.finish();
}

fn benchmark_collections(c: &mut Criterion) {
    let mut group = c.benchmark_group("collections");
    let catalog = create_catalog(10_000);

    for depth in [5usize, 50] {
        let store = create_store(depth);
        let top = format!("level{}", depth - 1);
        group.bench_with_input(BenchmarkId::new("resolve_chain", depth), &top, |b, top| {
            b.iter(|| black_box(store.resolve(top, &catalog)))
        });
    }

    group.bench_function("define_with_cycle_check", |b| {
        b.iter_batched(
            || create_store(50),
            |mut store| black_box(store.define("top", "level49 AND level10")),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("refresh_results", |b| {
        b.iter_batched(
            || create_store(50),
            |mut store| black_box(store.refresh_results(&catalog)),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn benchmark_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let catalog = create_catalog(10_000);
    let tracks = catalog.tracks().to_vec();

    group.bench_function("write_tracks", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().expect("Failed to create temp directory");
                let cache = SqliteCache::open(&temp_dir.path().join("cache.db")).expect("Failed to open cache");
                (temp_dir, cache)
            },
            |(_temp_dir, mut cache)| cache.write_as("songs_tags", &tracks),
            BatchSize::SmallInput,
        )
    });

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("cache.db");
    SqliteCache::open(&path).expect("Failed to open cache").write_as("songs_tags", &tracks);

    group.bench_function("read_tracks_cold", |b| {
        b.iter(|| {
            let mut cache = SqliteCache::open(&path).expect("Failed to open cache");
            black_box(cache.read_as::<Vec<Track>>("songs_tags"))
        })
    });

    group.bench_function("last_modified", |b| {
        let mut cache = SqliteCache::open(&path).expect("Failed to open cache");
        b.iter(|| black_box(cache.last_modified("songs_tags")))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_parsing,
    benchmark_evaluation,
    benchmark_collections,
    benchmark_cache,
);

criterion_main!(benches);
