use std::path::PathBuf;
use thiserror::Error;

use crate::cel::SyntaxError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("collection cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
    #[error("cannot read collections file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write collections file {path}: {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid collection name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("collection `{name}` has an invalid expression: {source}")]
    InvalidExpression {
        name: String,
        #[source]
        source: SyntaxError,
    },
    #[error("collection `{name}` has a line break in its expression")]
    MultilineExpression { name: String },
    #[error("no collection named `{0}`")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("unknown reference `{0}`: not a playlist or collection")]
    UnknownReference(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
