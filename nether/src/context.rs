use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use nether_core::client::{HttpRemote, TransportError};
use nether_core::types::SyncState;

#[derive(Clone)]
pub struct Context {
    pub server_url: String,
    pub api_key: String,
    pub collection: String,
    pub folder_path: PathBuf,
    pub upload_delay: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub exit_after_sync: bool,
}

impl Context {
    pub fn client(&self) -> Result<HttpRemote, TransportError> {
        HttpRemote::new(
            self.server_url.clone(),
            self.collection.clone(),
            self.api_key.clone(),
            self.timeout,
        )
    }

    /// State to use when nothing (usable) has been persisted
    pub fn initial_state(&self) -> SyncState {
        SyncState::new(
            self.server_url.clone(),
            self.api_key.clone(),
            self.collection.clone(),
        )
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("server_url", &self.server_url)
            .field("collection", &self.collection)
            .field("folder_path", &self.folder_path)
            .field("upload_delay", &self.upload_delay)
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .field("exit_after_sync", &self.exit_after_sync)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::context;

    #[test]
    fn test_debug_hide_api_key() {
        let context = context(PathBuf::from("/tmp/notes"));

        let debug = format!("{:?}", context);

        assert!(debug.contains("MyVault"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_initial_state() {
        let state = context(PathBuf::from("/tmp/notes")).initial_state();

        assert_eq!(state.collection_name, "MyVault");
        assert_eq!(state.api_key, "secret");
        assert_eq!(state.last_synced_at.0, 0);
    }
}
