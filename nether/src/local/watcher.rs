use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use notify::DebouncedEvent;
use notify::{watcher, RecursiveMode, Watcher};

use crate::context::Context;
use crate::error::Error;
use crate::local::{managed_title, LocalChange};

/// Produce `LocalChange` for each event on managed documents of the folder
pub struct LocalWatcher {
    context: Context,
    stop_signal: Arc<AtomicBool>,
    change_sender: Sender<LocalChange>,
}

trait IntoRelative {
    fn relative(&self, prefix: &Path) -> Option<PathBuf>;
}

impl IntoRelative for PathBuf {
    fn relative(&self, prefix: &Path) -> Option<PathBuf> {
        self.strip_prefix(prefix).ok().map(Path::to_path_buf)
    }
}

impl LocalWatcher {
    pub fn new(
        context: Context,
        stop_signal: Arc<AtomicBool>,
        change_sender: Sender<LocalChange>,
    ) -> Self {
        Self {
            context,
            stop_signal,
            change_sender,
        }
    }

    pub fn listen(&mut self) -> Result<(), Error> {
        log::debug!(
            "[{}] Start listening for local changes",
            self.context.collection
        );
        let folder_path = fs::canonicalize(&self.context.folder_path)
            .map_err(|error| Error::Watch(self.context.folder_path.clone(), error.to_string()))?;
        let (inotify_sender, inotify_receiver) = channel();
        let mut inotify_watcher = watcher(inotify_sender, Duration::from_secs(1))?;
        inotify_watcher.watch(&folder_path, RecursiveMode::Recursive)?;

        loop {
            match inotify_receiver.recv_timeout(Duration::from_millis(250)) {
                Ok(event) => {
                    for change in self.digest_event(&event, &folder_path) {
                        if let Err(error) = self.change_sender.send(change) {
                            log::error!(
                                "[{}] Finished local listening (on change channel closed) : {}",
                                self.context.collection,
                                error
                            );
                            return Ok(());
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop_signal.load(Ordering::Relaxed) {
                        log::info!(
                            "[{}] Finished local listening (on stop signal)",
                            self.context.collection
                        );
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::error!(
                        "[{}] Finished local listening (on channel closed)",
                        self.context.collection
                    );
                    break;
                }
            }
        }

        Ok(())
    }

    pub fn digest_event(&self, event: &DebouncedEvent, folder_path: &Path) -> Vec<LocalChange> {
        log::debug!(
            "[{}] Local event received: {:?}",
            self.context.collection,
            &event
        );

        let title = |absolute_path: &PathBuf| {
            absolute_path
                .relative(folder_path)
                .and_then(|relative_path| managed_title(&relative_path))
        };

        let changes: Vec<LocalChange> = match event {
            DebouncedEvent::Create(absolute_path) | DebouncedEvent::Write(absolute_path) => {
                title(absolute_path)
                    .map(LocalChange::Modified)
                    .into_iter()
                    .collect()
            }
            DebouncedEvent::Remove(absolute_path) => title(absolute_path)
                .map(LocalChange::Removed)
                .into_iter()
                .collect(),
            // Editors often save by renaming a temporary file over the document
            DebouncedEvent::Rename(absolute_source_path, absolute_dest_path) => {
                title(absolute_source_path)
                    .map(LocalChange::Removed)
                    .into_iter()
                    .chain(title(absolute_dest_path).map(LocalChange::Modified))
                    .collect()
            }
            // Ignore these
            DebouncedEvent::NoticeWrite(_)
            | DebouncedEvent::NoticeRemove(_)
            | DebouncedEvent::Chmod(_)
            | DebouncedEvent::Rescan => vec![],
            DebouncedEvent::Error(err, path) => {
                log::error!(
                    "[{}] Error {} on {:?}",
                    self.context.collection,
                    err,
                    path
                );
                vec![]
            }
        };

        if !changes.is_empty() {
            log::debug!(
                "[{}] Produced changes for event: {:?}",
                self.context.collection,
                &changes
            );
        }
        changes
    }
}
