//! # Command Handlers
//!
//! What each subcommand does once a [`Session`] is open. Handlers write their
//! results to the given writers so they can be driven from tests.

use anyhow::{anyhow, bail, Result};
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use crate::catalog::{Catalog, Tag, TagRecord, Track};
use crate::cel;
use crate::cli::{CollectionsAction, DatabaseAction, PlaylistAction};
use crate::error::StoreError;
use crate::mpd_client::Daemon;
use crate::session::Session;

/// One output line for `track`: the `columns` joined by ` - `, or the file
/// when every column is empty.
pub fn format_track(track: &Track, columns: &[Tag]) -> String {
    let values: Vec<&str> = columns
        .iter()
        .map(|tag| match tag {
            Tag::Artist => track.tags.artist.as_str(),
            Tag::AlbumArtist => track.tags.albumartist.as_str(),
            Tag::Album => track.tags.album.as_str(),
            Tag::Title => track.tags.title.as_str(),
            Tag::Track => track.tags.track.as_str(),
            Tag::File | Tag::Extension => track.file.as_str(),
        })
        .collect();

    if values.iter().all(|v| v.is_empty()) {
        track.file.clone()
    } else {
        values.join(" - ")
    }
}

/// Queue positions (1-based) whose file satisfies `keep_if`.
fn queue_positions(queue: &[String], keep_if: impl Fn(&str) -> bool) -> Vec<usize> {
    queue
        .iter()
        .enumerate()
        .filter(|(_, file)| keep_if(file))
        .map(|(index, _)| index + 1)
        .collect()
}

pub fn playlist<D: Daemon>(session: &mut Session<D>, action: &PlaylistAction) -> Result<()> {
    match action {
        PlaylistAction::Add(expression) => {
            let files = session.resolve(&expression.text())?;
            session.daemon_mut().add(&files)?;
            info!("Added {} tracks", files.len());
        }
        PlaylistAction::Addp(expression) => {
            let files = session.resolve(&expression.text())?;
            if !files.is_empty() {
                let first_new = session.daemon_mut().queue_files()?.len() + 1;
                session.daemon_mut().add(&files)?;
                session.daemon_mut().play_position(first_new)?;
            }
        }
        PlaylistAction::Insert(expression) => {
            let files = session.resolve(&expression.text())?;
            session.daemon_mut().insert(&files)?;
        }
        PlaylistAction::Replace(expression) => {
            let files = session.resolve(&expression.text())?;
            session.daemon_mut().clear()?;
            session.daemon_mut().add(&files)?;
        }
        PlaylistAction::Remove(expression) => {
            let files: HashSet<String> = session.resolve(&expression.text())?.into_iter().collect();
            let queue = session.daemon_mut().queue_files()?;
            let positions = queue_positions(&queue, |file| files.contains(file));
            debug!("Removing {} queued tracks", positions.len());
            session.daemon_mut().remove_positions(&positions)?;
        }
        PlaylistAction::Keep(expression) => {
            let files: HashSet<String> = session.resolve(&expression.text())?.into_iter().collect();
            let queue = session.daemon_mut().queue_files()?;
            let positions = queue_positions(&queue, |file| !files.contains(file));
            debug!("Removing {} queued tracks", positions.len());
            session.daemon_mut().remove_positions(&positions)?;
        }
        PlaylistAction::Play(expression) => {
            let files: HashSet<String> = session.resolve(&expression.text())?.into_iter().collect();
            let queue = session.daemon_mut().queue_files()?;
            match queue_positions(&queue, |file| files.contains(file)).first() {
                Some(&position) => session.daemon_mut().play_position(position)?,
                None => info!("No queued track matches"),
            }
        }
        PlaylistAction::Clear => session.daemon_mut().clear()?,
        PlaylistAction::Crop => session.daemon_mut().crop()?,
    }
    Ok(())
}

/// Prints the tracks of every expression. Failures go to `err`, one line
/// each, and do not stop the remaining expressions.
///
/// # Errors
///
/// After all expressions ran, if any of them failed.
pub fn show<D: Daemon>(
    session: &Session<D>,
    expressions: &[String],
    columns: &[Tag],
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let mut failed = 0;

    for expression in expressions {
        let files = cel::parse_expression(expression)
            .map_err(anyhow::Error::from)
            .and_then(|ast| Ok(cel::evaluate(&ast, session.catalog(), session.store())?));

        match files {
            Ok(files) => {
                if expressions.len() > 1 {
                    writeln!(out, ":: {expression}")?;
                }
                for file in &files {
                    if let Some(track) = session.catalog().get(file) {
                        writeln!(out, "{}", format_track(track, columns))?;
                    }
                }
            }
            Err(e) => {
                failed += 1;
                writeln!(err, "{expression}: {e}")?;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} expressions failed", expressions.len());
    }
    Ok(())
}

pub fn collections<D: Daemon>(
    session: &mut Session<D>,
    action: &CollectionsAction,
    columns: &[Tag],
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    match action {
        CollectionsAction::List => {
            for collection in session.store().iter() {
                writeln!(out, "{} = {}", collection.name(), collection.expression())?;
            }
        }
        CollectionsAction::Show { expressions } => show(session, expressions, columns, out, err)?,
        CollectionsAction::Define { name, expression } => {
            let text = expression.text();
            session.store_mut().define(name, &text).map_err(|e| match e {
                StoreError::InvalidExpression { source, .. } => {
                    debug!("{}", source.render_diagnostic(&text));
                    anyhow!(source)
                }
                other => other.into(),
            })?;
            info!("Defined collection `{name}`");
        }
        CollectionsAction::Delete { name } => {
            session.store_mut().delete(name)?;
            info!("Deleted collection `{name}`");
        }
        CollectionsAction::Check => {
            let failures = session.refresh_results();
            for (name, e) in &failures {
                writeln!(err, "{name}: {e}")?;
            }
            writeln!(out, "{} collections, {} failed", session.store().len(), failures.len())?;
            if !failures.is_empty() {
                bail!("{} collections do not resolve", failures.len());
            }
        }
    }
    Ok(())
}

/// Tracks lacking tags, and groups of tracks sharing every tag.
#[derive(Debug, Default, PartialEq)]
pub struct TagReport {
    pub missing: Vec<(String, Vec<&'static str>)>,
    pub conflicts: Vec<(TagRecord, Vec<String>)>,
}

pub fn check_tags(catalog: &Catalog, files: &[String]) -> TagReport {
    let mut report = TagReport::default();
    let mut by_tags: BTreeMap<Vec<&str>, Vec<&Track>> = BTreeMap::new();

    for track in files.iter().filter_map(|file| catalog.get(file)) {
        let fields = track.tags.fields();
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            by_tags.entry(fields.iter().map(|(_, value)| *value).collect()).or_default().push(track);
        } else {
            report.missing.push((track.file.clone(), missing));
        }
    }

    report.conflicts = by_tags
        .into_values()
        .filter(|tracks| tracks.len() > 1)
        .map(|tracks| {
            let tags = tracks[0].tags.clone();
            (tags, tracks.into_iter().map(|t| t.file.clone()).collect())
        })
        .collect();
    report
}

pub fn database<D: Daemon>(session: &mut Session<D>, action: &DatabaseAction, out: &mut dyn Write) -> Result<()> {
    match action {
        DatabaseAction::Update => session.refresh()?,
        DatabaseAction::Check { words } => {
            let files = session.resolve(&words.join(" "))?;
            let report = check_tags(session.catalog(), &files);

            for (file, missing) in &report.missing {
                writeln!(out, "{file}")?;
                writeln!(out, "missing tag(s): {}", missing.join(", "))?;
            }
            if !report.conflicts.is_empty() {
                writeln!(out, "\nConflict(s) found:")?;
                for (tags, files) in &report.conflicts {
                    writeln!(
                        out,
                        "Conflict with tags {} - {} - {} - {}",
                        tags.artist, tags.album, tags.title, tags.track
                    )?;
                    for file in files {
                        writeln!(out, "    {file}")?;
                    }
                }
            }
        }
    }
    Ok(())
}
