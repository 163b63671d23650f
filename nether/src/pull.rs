use std::sync::Arc;

use nether_core::{
    client::{PullError, RemoteClient},
    error::StoreError,
    types::{DocumentTitle, RemoteUpdate, Timestamp},
};

use crate::{ledger::Ledger, store::FileStore, watermark::Watermark};

/// What happened during one pull
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    pub applied: usize,
    pub malformed: usize,
    /// Updates of documents with a pending upload
    pub deferred: usize,
    pub failed: usize,
    pub watermark: Timestamp,
}

pub struct PullLoop {
    collection: String,
    client: Arc<dyn RemoteClient + Send + Sync>,
    store: Arc<dyn FileStore + Send + Sync>,
    watermark: Arc<Watermark>,
    ledger: Arc<Ledger>,
}

impl PullLoop {
    pub fn new(
        collection: String,
        client: Arc<dyn RemoteClient + Send + Sync>,
        store: Arc<dyn FileStore + Send + Sync>,
        watermark: Arc<Watermark>,
        ledger: Arc<Ledger>,
    ) -> Self {
        Self {
            collection,
            client,
            store,
            watermark,
            ledger,
        }
    }

    /// Fetch updates newer than watermark and write them in store. Remote
    /// content replaces local one, except for documents with a pending upload
    /// (`is_pending`) carrying a real local edit : these updates are skipped
    /// and will be pulled again. Watermark is advanced once, to the newest
    /// applied update but below the oldest skipped one.
    pub fn run(&self, is_pending: &dyn Fn(&DocumentTitle) -> bool) -> Result<PullReport, PullError> {
        let since = self.watermark.last_synced_at();
        let entries = self.client.pull(since)?;
        log::debug!(
            "[{}] Pulled {} update(s) since {}",
            self.collection,
            entries.len(),
            since
        );

        let mut report = PullReport::default();
        let mut newest = since;
        let mut oldest_deferred: Option<Timestamp> = None;
        for entry in entries {
            let update = match entry.update() {
                Ok(update) => update,
                Err(error) => {
                    log::warn!("[{}] Skip malformed update : {}", self.collection, error);
                    report.malformed += 1;
                    continue;
                }
            };

            if is_pending(&update.title) && self.has_local_edit(&update.title) {
                log::debug!(
                    "[{}] Defer update of '{}' : local upload is pending",
                    self.collection,
                    update.title
                );
                oldest_deferred = Some(
                    oldest_deferred.map_or(update.timestamp, |oldest| oldest.min(update.timestamp)),
                );
                report.deferred += 1;
                continue;
            }

            match self.apply(&update) {
                Ok(_) => {
                    log::info!(
                        "[{}] Pulled and updated '{}' ({})",
                        self.collection,
                        update.title,
                        update.timestamp
                    );
                    self.ledger.record(&update.title, &update.content);
                    newest = newest.max(update.timestamp);
                    report.applied += 1;
                }
                Err(error) => {
                    log::error!(
                        "[{}] Unable to apply update of '{}' : {}",
                        self.collection,
                        update.title,
                        error
                    );
                    report.failed += 1;
                }
            }
        }

        // Deferred updates must be fetched again by next pulls
        if let Some(oldest_deferred) = oldest_deferred {
            newest = newest.min(Timestamp(oldest_deferred.0.saturating_sub(1)));
        }

        if let Err(error) = self.watermark.advance(newest) {
            log::error!(
                "[{}] Unable to persist watermark {} : {}",
                self.collection,
                newest,
                error
            );
        }
        report.watermark = self.watermark.last_synced_at();

        Ok(report)
    }

    /// Local content differs from the last synced one. A document written by
    /// a previous pull is pending only because of its own write event.
    fn has_local_edit(&self, title: &DocumentTitle) -> bool {
        match self.store.read(title) {
            Ok(content) => !self.ledger.is_synced(title, &content),
            Err(_) => true,
        }
    }

    fn apply(&self, update: &RemoteUpdate) -> Result<(), StoreError> {
        if self.store.exists(&update.title) {
            return self.store.write(&update.title, &update.content);
        }

        match self.store.create(&update.title, &update.content) {
            // Created by user since exists check
            Err(StoreError::AlreadyExist(_)) => self.store.write(&update.title, &update.content),
            result => result,
        }
    }
}
