use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use nether_core::{
    client::{PullError, RemoteClient},
    error::StoreError,
    types::{DocumentTitle, SyncState, Timestamp},
};

use crate::{
    context::Context,
    error::Error,
    ledger::Ledger,
    local::LocalChange,
    pull::{PullLoop, PullReport},
    scheduler::{UploadQueue, UploadScheduler, Uploader},
    settings::Settings,
    store::FileStore,
    watermark::Watermark,
};

struct Running {
    scheduler: UploadScheduler,
    stop_sender: Sender<()>,
    router_handle: JoinHandle<()>,
    ticker_handle: JoinHandle<()>,
}

/// Wire local changes to the upload scheduler and periodically pull remote
/// updates
pub struct Orchestrator {
    context: Context,
    client: Arc<dyn RemoteClient + Send + Sync>,
    store: Arc<dyn FileStore + Send + Sync>,
    watermark: Arc<Watermark>,
    ledger: Arc<Ledger>,
    running: Option<Running>,
}

impl Orchestrator {
    pub fn new(
        context: Context,
        client: Arc<dyn RemoteClient + Send + Sync>,
        store: Arc<dyn FileStore + Send + Sync>,
        settings: Box<dyn Settings + Send + Sync>,
    ) -> Self {
        let watermark = Arc::new(Watermark::new(context.initial_state(), settings));
        Self {
            context,
            client,
            store,
            watermark,
            ledger: Arc::new(Ledger::default()),
            running: None,
        }
    }

    pub fn last_synced_at(&self) -> Timestamp {
        self.watermark.last_synced_at()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn pull_loop(&self) -> PullLoop {
        PullLoop::new(
            self.context.collection.clone(),
            self.client.clone(),
            self.store.clone(),
            self.watermark.clone(),
            self.ledger.clone(),
        )
    }

    /// Load sync state then start upload scheduling of `changes` and pull ticks
    pub fn start(&mut self, changes: Receiver<LocalChange>) -> Result<SyncState, Error> {
        if self.running.is_some() {
            return Err(Error::UnexpectedError(format!(
                "Synchronization of '{}' is already started",
                self.context.collection
            )));
        }

        let state = self.load()?;
        let scheduler = UploadScheduler::start(
            self.context.collection.clone(),
            self.context.upload_delay,
            Uploader::new(
                self.client.clone(),
                self.watermark.clone(),
                self.ledger.clone(),
            ),
        );
        let (stop_sender, stop_receiver) = bounded::<()>(0);

        let router_handle = {
            let collection = self.context.collection.clone();
            let queue = scheduler.queue();
            let store = self.store.clone();
            let stop_receiver = stop_receiver.clone();
            thread::spawn(move || loop {
                select! {
                    recv(stop_receiver) -> _ => break,
                    recv(changes) -> change => match change {
                        Ok(change) => route(&collection, &queue, &store, change),
                        Err(_) => {
                            log::info!("[{}] Finished change routing (on channel closed)", collection);
                            break;
                        }
                    },
                }
            })
        };

        let ticker_handle = {
            let collection = self.context.collection.clone();
            let queue = scheduler.queue();
            let pull_loop = self.pull_loop();
            let ticker = tick(self.context.poll_interval);
            thread::spawn(move || loop {
                select! {
                    recv(stop_receiver) -> _ => break,
                    recv(ticker) -> _ => {
                        let is_pending = |title: &DocumentTitle| queue.is_pending(title);
                        match pull_loop.run(&is_pending) {
                            Ok(report) => log_report(&collection, &report),
                            Err(error) => log::error!("[{}] Pull failed : {}", collection, error),
                        }
                    },
                }
            })
        };

        self.running = Some(Running {
            scheduler,
            stop_sender,
            router_handle,
            ticker_handle,
        });
        log::info!(
            "[{}] Synchronization started from {}",
            self.context.collection,
            state.last_synced_at
        );
        Ok(state)
    }

    /// Read persisted sync state, done by `start`
    pub fn load(&self) -> Result<SyncState, Error> {
        Ok(self.watermark.load()?)
    }

    /// Run one pull now
    pub fn pull_now(&self) -> Result<PullReport, PullError> {
        let queue = self.running.as_ref().map(|running| running.scheduler.queue());
        let report = self.pull_loop().run(&|title: &DocumentTitle| {
            queue
                .as_ref()
                .map(|queue| queue.is_pending(title))
                .unwrap_or(false)
        })?;
        log_report(&self.context.collection, &report);
        Ok(report)
    }

    /// Stop pull ticks and cancel waiting uploads without uploading them.
    /// Return count of canceled uploads.
    pub fn stop(&mut self) -> usize {
        let running = match self.running.take() {
            Some(running) => running,
            None => return 0,
        };

        drop(running.stop_sender);
        if running.router_handle.join().is_err() {
            log::error!("[{}] Change router thread panicked", self.context.collection);
        }
        let canceled = running.scheduler.stop();
        // Let an in progress pull finish
        if running.ticker_handle.join().is_err() {
            log::error!("[{}] Pull ticker thread panicked", self.context.collection);
        }

        log::info!(
            "[{}] Synchronization stopped ({} upload(s) canceled)",
            self.context.collection,
            canceled
        );
        canceled
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn route(
    collection: &str,
    queue: &UploadQueue,
    store: &Arc<dyn FileStore + Send + Sync>,
    change: LocalChange,
) {
    log::debug!("[{}] Route local change {:?}", collection, &change);
    let title = change.title().clone();
    let store = store.clone();
    let produced_title = title.clone();
    queue.schedule(
        title,
        Box::new(move || {
            if !store.exists(&produced_title) {
                return Ok(None);
            }
            match store.read(&produced_title) {
                Err(StoreError::NotFound(_)) => Ok(None),
                result => result.map(Some),
            }
        }),
    );
}

fn log_report(collection: &str, report: &PullReport) {
    if report.malformed > 0 || report.failed > 0 {
        log::warn!(
            "[{}] Pull partially applied : {:?}",
            collection,
            report
        );
    } else {
        log::debug!("[{}] Pull done : {:?}", collection, report);
    }
}
