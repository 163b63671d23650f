use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use nether_core::{
    client::{RemoteClient, TransportError},
    error::StoreError,
    types::{DocumentTitle, Timestamp},
};
use thiserror::Error;

use crate::{debounce::KeyedTimers, ledger::Ledger, watermark::Watermark};

/// Give current content of a document at upload time, `None` if it no longer exists
pub type Producer = Box<dyn Fn() -> Result<Option<String>, StoreError> + Send>;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Unable to read document : {0}")]
    Local(#[from] StoreError),
    #[error("Unable to push document : {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Pushed(Timestamp),
    /// Content is the one already known by remote
    Unchanged,
    /// Document has been deleted before the upload
    Vanished,
}

pub struct Uploader {
    client: Arc<dyn RemoteClient + Send + Sync>,
    watermark: Arc<Watermark>,
    ledger: Arc<Ledger>,
}

impl Uploader {
    pub fn new(
        client: Arc<dyn RemoteClient + Send + Sync>,
        watermark: Arc<Watermark>,
        ledger: Arc<Ledger>,
    ) -> Self {
        Self {
            client,
            watermark,
            ledger,
        }
    }

    pub fn upload(
        &self,
        title: &DocumentTitle,
        producer: &Producer,
    ) -> Result<UploadOutcome, UploadError> {
        let content = match producer()? {
            Some(content) => content,
            None => return Ok(UploadOutcome::Vanished),
        };

        if self.ledger.is_synced(title, &content) {
            return Ok(UploadOutcome::Unchanged);
        }

        let timestamp = Timestamp::now();
        self.client.push(title, &content, timestamp)?;
        self.ledger.record(title, &content);

        // Document is on remote, a failing persistence must not be reported as failing upload
        if let Err(error) = self.watermark.advance(timestamp) {
            log::error!("Unable to persist watermark {} : {}", timestamp, error);
        }

        Ok(UploadOutcome::Pushed(timestamp))
    }
}

enum SchedulerMessage {
    Wake,
    Stop,
}

type Timers = Arc<Mutex<KeyedTimers<DocumentTitle, Producer>>>;

fn lock(timers: &Timers) -> MutexGuard<'_, KeyedTimers<DocumentTitle, Producer>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle used to feed the scheduler from other threads
#[derive(Clone)]
pub struct UploadQueue {
    timers: Timers,
    sender: Sender<SchedulerMessage>,
}

impl UploadQueue {
    /// (Re)start upload timer of document. A waiting upload of the same
    /// document is canceled.
    pub fn schedule(&self, title: DocumentTitle, producer: Producer) {
        let canceled = lock(&self.timers).schedule(title.clone(), producer, Instant::now());
        if canceled {
            log::debug!("Upload of '{}' postponed", title);
        } else {
            log::debug!("Upload of '{}' scheduled", title);
        }

        if self.sender.send(SchedulerMessage::Wake).is_err() {
            log::error!("Upload scheduler is not running, '{}' will not be uploaded", title);
        }
    }

    /// Upload is waiting or running
    pub fn is_pending(&self, title: &DocumentTitle) -> bool {
        lock(&self.timers).contains(title)
    }
}

/// Debounced upload of documents : each document is uploaded once its edits
/// stopped since `delay`.
pub struct UploadScheduler {
    queue: UploadQueue,
    handle: Option<JoinHandle<()>>,
}

impl UploadScheduler {
    pub fn start(collection: String, delay: Duration, uploader: Uploader) -> Self {
        let timers: Timers = Arc::new(Mutex::new(KeyedTimers::new(delay)));
        let (sender, receiver): (Sender<SchedulerMessage>, Receiver<SchedulerMessage>) =
            unbounded();

        let mut scheduler_loop = SchedulerLoop {
            collection,
            timers: timers.clone(),
            receiver,
            uploader,
        };
        let handle = thread::spawn(move || scheduler_loop.run());

        Self {
            queue: UploadQueue { timers, sender },
            handle: Some(handle),
        }
    }

    pub fn queue(&self) -> UploadQueue {
        self.queue.clone()
    }

    pub fn schedule(&self, title: DocumentTitle, producer: Producer) {
        self.queue.schedule(title, producer)
    }

    pub fn is_pending(&self, title: &DocumentTitle) -> bool {
        self.queue.is_pending(title)
    }

    /// Cancel waiting uploads (without uploading them) and wait end of running one.
    /// Return count of canceled uploads.
    pub fn stop(mut self) -> usize {
        let canceled = lock(&self.queue.timers).clear();
        let _ = self.queue.sender.send(SchedulerMessage::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Upload scheduler thread panicked");
            }
        }
        canceled
    }
}

struct SchedulerLoop {
    collection: String,
    timers: Timers,
    receiver: Receiver<SchedulerMessage>,
    uploader: Uploader,
}

impl SchedulerLoop {
    fn run(&mut self) {
        loop {
            let next_deadline = lock(&self.timers).next_deadline();
            let message = match next_deadline {
                Some(deadline) => self
                    .receiver
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => self
                    .receiver
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match message {
                Ok(SchedulerMessage::Wake) | Err(RecvTimeoutError::Timeout) => self.fire(),
                Ok(SchedulerMessage::Stop) => {
                    log::info!("[{}] Finished upload scheduling (on stop)", self.collection);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::info!(
                        "[{}] Finished upload scheduling (on channel closed)",
                        self.collection
                    );
                    break;
                }
            }
        }
    }

    fn fire(&self) {
        // Lock is released during uploads, edits can be scheduled meanwhile
        let fired = lock(&self.timers).expired(Instant::now());

        for fired in fired {
            match self.uploader.upload(&fired.key, &fired.action) {
                Ok(UploadOutcome::Pushed(timestamp)) => {
                    log::info!(
                        "[{}] Pushed '{}' at {}",
                        self.collection,
                        fired.key,
                        timestamp
                    )
                }
                Ok(UploadOutcome::Unchanged) => {
                    log::debug!(
                        "[{}] Skip upload of '{}' : unchanged since last sync",
                        self.collection,
                        fired.key
                    )
                }
                Ok(UploadOutcome::Vanished) => {
                    log::debug!(
                        "[{}] Skip upload of '{}' : document no longer exists",
                        self.collection,
                        fired.key
                    )
                }
                Err(error) => {
                    log::error!(
                        "[{}] Upload of '{}' failed : {}",
                        self.collection,
                        fired.key,
                        error
                    )
                }
            }

            lock(&self.timers).complete(&fired.key, fired.generation);
        }
    }
}
