use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use serde_derive::{Deserialize, Serialize};

use crate::DOCUMENT_EXTENSION;

/// Identity of a document : its path relative to the synchronized folder,
/// without the document extension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentTitle(pub String);

impl DocumentTitle {
    /// Build title from a path relative to the synchronized folder. Return
    /// `None` if the path is not a managed document.
    pub fn from_relative_path(relative_path: &Path) -> Option<Self> {
        let path_as_str = relative_path.to_str()?;
        let title = path_as_str.strip_suffix(DOCUMENT_EXTENSION)?;
        if title.is_empty() || title.ends_with('/') || title.ends_with('\\') {
            return None;
        }

        // Keep the same separator on every platform, remote only knows "/"
        Some(Self(title.replace('\\', "/")))
    }

    /// A title can be mapped to a file inside synchronized folder only if it
    /// has no empty, current or parent component.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && !self.0.contains('\\')
            && self
                .0
                .split('/')
                .all(|part| !part.is_empty() && part != "." && part != "..")
    }

    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        path.extend(self.0.split('/'));
        path.set_file_name(format!(
            "{}{}",
            path.file_name()
                .and_then(|file_name| file_name.to_str())
                .unwrap_or_default(),
            DOCUMENT_EXTENSION
        ));
        path
    }
}

impl Display for DocumentTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentTitle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Milliseconds since epoch
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis().max(0) as u64)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_string())
    }
}

/// A document version received from remote. Applied then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUpdate {
    pub title: DocumentTitle,
    pub content: String,
    pub timestamp: Timestamp,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub server_url: String,
    // Never written to disk : the keyring (or user) provides it at startup
    #[serde(default, skip_serializing)]
    pub api_key: String,
    pub collection_name: String,
    #[serde(default)]
    pub last_synced_at: Timestamp,
}

impl SyncState {
    pub fn new(server_url: String, api_key: String, collection_name: String) -> Self {
        Self {
            server_url,
            api_key,
            collection_name,
            last_synced_at: Timestamp::default(),
        }
    }

    /// Take the watermark of a persisted state if it was produced for the same
    /// server and collection. A watermark of another collection is meaningless here.
    pub fn resume(self, persisted: &SyncState) -> Self {
        if persisted.server_url == self.server_url
            && persisted.collection_name == self.collection_name
        {
            return Self {
                last_synced_at: persisted.last_synced_at,
                ..self
            };
        }

        Self {
            last_synced_at: Timestamp::default(),
            ..self
        }
    }
}

impl fmt::Debug for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncState")
            .field("server_url", &self.server_url)
            .field("collection_name", &self.collection_name)
            .field("last_synced_at", &self.last_synced_at)
            .finish()
    }
}
