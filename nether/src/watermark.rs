use std::sync::{Mutex, PoisonError};

use nether_core::{
    error::SettingsError,
    types::{SyncState, Timestamp},
};

use crate::settings::Settings;

/// Owner of `SyncState`. `advance` is the only way to move the watermark, and
/// it only moves forward.
pub struct Watermark {
    state: Mutex<SyncState>,
    settings: Box<dyn Settings + Send + Sync>,
}

impl Watermark {
    pub fn new(state: SyncState, settings: Box<dyn Settings + Send + Sync>) -> Self {
        Self {
            state: Mutex::new(state),
            settings,
        }
    }

    /// Resume from persisted watermark when it belongs to the same server and
    /// collection. Never move the in memory watermark backward (a previous
    /// save may have failed).
    pub fn load(&self) -> Result<SyncState, SettingsError> {
        let persisted = self.settings.load()?;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(persisted) = persisted {
            let resumed = state.clone().resume(&persisted);
            if resumed.last_synced_at != persisted.last_synced_at {
                log::info!(
                    "Persisted watermark belong to '{}' ('{}'), ignore it",
                    persisted.server_url,
                    persisted.collection_name,
                );
            }
            state.last_synced_at = state.last_synced_at.max(resumed.last_synced_at);
        }

        Ok(state.clone())
    }

    pub fn last_synced_at(&self) -> Timestamp {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_synced_at
    }

    /// Set watermark to `max(current, candidate)`. Persist (and return true)
    /// only if value changed.
    pub fn advance(&self, candidate: Timestamp) -> Result<bool, SettingsError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if candidate <= state.last_synced_at {
            return Ok(false);
        }

        // Lock is kept during save so that saves can't be reordered
        state.last_synced_at = candidate;
        self.settings.save(&state)?;
        Ok(true)
    }
}
