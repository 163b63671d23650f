use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::context::Context;
use crate::error::Error;
use crate::local::{watcher::LocalWatcher, LocalChange};
use crate::orchestrator::Orchestrator;
use crate::settings::JsonSettings;
use crate::store::LocalFolder;

/// Synchronize folder of context until `stop_signal` (or only pull once if
/// context `exit_after_sync`)
pub fn run(context: Context, stop_signal: Arc<AtomicBool>) -> Result<(), Error> {
    log::info!(
        "[{}] Prepare to sync {:?}",
        context.collection,
        &context.folder_path
    );
    fs::create_dir_all(&context.folder_path)?;

    let client = Arc::new(context.client()?);
    let store = Arc::new(LocalFolder::new(context.folder_path.clone()));
    let settings = Box::new(JsonSettings::new(&context.folder_path));
    let mut orchestrator = Orchestrator::new(context.clone(), client, store, settings);

    if context.exit_after_sync {
        orchestrator.load()?;
        let report = orchestrator.pull_now()?;
        log::info!(
            "[{}] Synchronization finished ({} update(s) applied)",
            context.collection,
            report.applied
        );
        return Ok(());
    }

    let (change_sender, change_receiver): (Sender<LocalChange>, Receiver<LocalChange>) =
        unbounded();
    orchestrator.start(change_receiver)?;

    log::info!("[{}] Start local watcher", context.collection);
    let mut local_watcher = LocalWatcher::new(context.clone(), stop_signal, change_sender);
    let local_watch_result = thread::spawn(move || local_watcher.listen()).join();

    orchestrator.stop();
    match local_watch_result {
        Ok(result) => result,
        Err(_) => Err(Error::UnexpectedError(
            "Local watcher thread panicked".to_string(),
        )),
    }
}
