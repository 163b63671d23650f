use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nether_core::client::{MockRemoteClient, RemoteEntry};
use nether_core::types::{DocumentTitle, SyncState, Timestamp};
use serde_json::json;
use testdir::testdir;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::context::Context;
use crate::settings::MockSettings;

pub fn tmpdir() -> PathBuf {
    let path = testdir!().join(PathBuf::from(Uuid::new_v4().to_string()));
    fs::create_dir_all(&path).unwrap();
    path
}

pub fn disk_files(tmpdir: &PathBuf) -> Vec<String> {
    WalkDir::new(tmpdir)
        .into_iter()
        .map(|entry| {
            entry
                .unwrap()
                .path()
                .strip_prefix(tmpdir)
                .unwrap()
                .display()
                .to_string()
        })
        .filter(|p| !p.is_empty())
        .collect::<Vec<String>>()
}

pub fn entry(title: &str, content: &str, timestamp: u64) -> RemoteEntry {
    RemoteEntry(json!({"title": title, "content": content, "timestamp": timestamp}))
}

/// Settings which start from given watermark and remember each saved state
pub fn recording_settings(last_synced_at: u64) -> (MockSettings, Arc<Mutex<Vec<SyncState>>>) {
    let saved = Arc::new(Mutex::new(vec![]));
    let saved_ = saved.clone();
    let mut settings = MockSettings::new();
    settings.expect_load().returning(move || {
        Ok(Some(SyncState {
            last_synced_at: Timestamp(last_synced_at),
            ..sync_state()
        }))
    });
    settings.expect_save().returning(move |state| {
        saved_.lock().unwrap().push(state.clone());
        Ok(())
    });
    (settings, saved)
}

pub fn context(folder_path: PathBuf) -> Context {
    Context {
        server_url: "http://127.0.0.1:1/apps/nether".to_string(),
        api_key: "secret".to_string(),
        collection: "MyVault".to_string(),
        folder_path,
        upload_delay: Duration::from_millis(200),
        poll_interval: Duration::from_millis(100),
        timeout: Duration::from_secs(1),
        exit_after_sync: false,
    }
}

pub fn sync_state() -> SyncState {
    SyncState::new(
        "http://127.0.0.1:1/apps/nether".to_string(),
        "secret".to_string(),
        "MyVault".to_string(),
    )
}

pub enum MockRemoteClientCase {
    PushOk(&'static str, &'static str),
    PushStatus(&'static str, u16),
    Pull(u64, Vec<RemoteEntry>),
}

impl MockRemoteClientCase {
    pub fn apply_multiples(mock: &mut MockRemoteClient, cases: Vec<Self>) {
        for case in cases {
            case.apply(mock)
        }
    }

    pub fn apply(self, mock: &mut MockRemoteClient) {
        match self {
            MockRemoteClientCase::PushOk(raw_title, raw_content) => {
                mock.expect_push()
                    .withf(move |title, content, _| {
                        title == &DocumentTitle::from(raw_title) && content == raw_content
                    })
                    .times(1)
                    .returning(|_, _, _| Ok(()));
            }
            MockRemoteClientCase::PushStatus(raw_title, status) => {
                mock.expect_push()
                    .withf(move |title, _, _| title == &DocumentTitle::from(raw_title))
                    .times(1)
                    .returning(move |_, _, _| {
                        Err(nether_core::client::TransportError::UnexpectedStatus(
                            status,
                            "".to_string(),
                        ))
                    });
            }
            MockRemoteClientCase::Pull(raw_since, entries) => {
                mock.expect_pull()
                    .withf(move |since| since == &Timestamp(raw_since))
                    .times(1)
                    .returning(move |_| Ok(entries.clone()));
            }
        }
    }
}
