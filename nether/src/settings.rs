use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use mockall::automock;
use nether_core::{error::SettingsError, types::SyncState};

pub const SETTINGS_FILE_NAME: &str = ".nether.json";

/// Durable storage of `SyncState`
#[automock]
pub trait Settings {
    /// Return `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<SyncState>, SettingsError>;
    fn save(&self, state: &SyncState) -> Result<(), SettingsError>;
}

/// Store `SyncState` as a json document in synchronized folder
pub struct JsonSettings {
    path: PathBuf,
}

impl JsonSettings {
    pub fn new(folder_path: &PathBuf) -> Self {
        Self {
            path: folder_path.join(SETTINGS_FILE_NAME),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Settings for JsonSettings {
    fn load(&self) -> Result<Option<SyncState>, SettingsError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(SettingsError::Io(self.path.clone(), error)),
        };

        let state = serde_json::from_str::<SyncState>(&raw)
            .map_err(|error| SettingsError::Invalid(self.path.clone(), error))?;
        Ok(Some(state))
    }

    fn save(&self, state: &SyncState) -> Result<(), SettingsError> {
        let folder = self.path.parent().ok_or(SettingsError::Unexpected(format!(
            "Settings path {} has no parent",
            self.path.display()
        )))?;
        let raw = serde_json::to_string_pretty(state)
            .map_err(|error| SettingsError::Invalid(self.path.clone(), error))?;

        // Write aside then rename to never leave a truncated file
        let mut file = tempfile::NamedTempFile::new_in(folder)
            .map_err(|error| SettingsError::Io(folder.to_path_buf(), error))?;
        file.write_all(raw.as_bytes())
            .map_err(|error| SettingsError::Io(file.path().to_path_buf(), error))?;
        file.persist(&self.path)
            .map_err(|error| SettingsError::Io(self.path.clone(), error.error))?;

        Ok(())
    }
}
