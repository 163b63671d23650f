pub mod context;
pub mod debounce;
pub mod error;
pub mod ledger;
pub mod local;
pub mod orchestrator;
pub mod pull;
pub mod run;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod watermark;

#[cfg(test)]
mod tests;
