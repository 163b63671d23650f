use std::{io, path::PathBuf};

use thiserror::Error;

use crate::types::DocumentTitle;

/// Local document storage failure. Concerned document is skipped, sync continues.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document '{0}' can't be mapped to a local file")]
    InvalidTitle(DocumentTitle),
    #[error("Document '{0}' not found")]
    NotFound(DocumentTitle),
    #[error("Document '{0}' already exist")]
    AlreadyExist(DocumentTitle),
    #[error("Related file io error : {0:?} ({1})")]
    Io(PathBuf, io::Error),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings file io error : {0:?} ({1})")]
    Io(PathBuf, io::Error),
    #[error("Settings file {0:?} is not valid : {1}")]
    Invalid(PathBuf, serde_json::Error),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
