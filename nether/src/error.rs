use std::path::PathBuf;

use nether_core::{
    client::{PullError, TransportError},
    error::SettingsError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to build remote client : {0}")]
    Client(#[from] TransportError),
    #[error("Unable to load sync state : {0}")]
    Settings(#[from] SettingsError),
    #[error("Unable to pull : {0}")]
    Pull(#[from] PullError),
    #[error("Unable to watch folder {0:?} : {1}")]
    Watch(PathBuf, String),
    #[error("Unexpected error : {0}")]
    UnexpectedError(String),
}

impl From<notify::Error> for Error {
    fn from(error: notify::Error) -> Self {
        Error::UnexpectedError(format!("Notify error {:?}", error))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::UnexpectedError(format!("{:?}", error))
    }
}
