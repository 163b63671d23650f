use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use nether_core::{types::DocumentTitle, utils::content_digest};

/// Remember digest of the last content known as identical on both sides, for
/// each document. Used to not upload back what was just pulled.
#[derive(Default)]
pub struct Ledger {
    digests: Mutex<HashMap<DocumentTitle, String>>,
}

impl Ledger {
    pub fn record(&self, title: &DocumentTitle, content: &str) {
        self.digests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(title.clone(), content_digest(content));
    }

    pub fn is_synced(&self, title: &DocumentTitle, content: &str) -> bool {
        self.digests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(title)
            .map(|digest| digest == &content_digest(content))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger() {
        let ledger = Ledger::default();
        let title = DocumentTitle::from("Notes");

        assert!(!ledger.is_synced(&title, "a"));
        ledger.record(&title, "a");
        assert!(ledger.is_synced(&title, "a"));
        assert!(!ledger.is_synced(&title, "b"));
        assert!(!ledger.is_synced(&DocumentTitle::from("Other"), "a"));
        ledger.record(&title, "b");
        assert!(!ledger.is_synced(&title, "a"));
    }
}
