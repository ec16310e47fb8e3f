//! services/api/src/adapters/credential.rs
//!
//! The currently selected Gemini API key, shared between the model adapter and
//! the credential endpoints.

use std::sync::{Arc, RwLock};

#[derive(Clone, Default)]
pub struct CredentialSlot {
    inner: Arc<RwLock<Option<String>>>,
}

impl CredentialSlot {
    pub fn new(initial: Option<String>) -> Self {
        let slot = Self::default();
        slot.select(initial);
        slot
    }

    /// Replaces the selected key. Blank keys count as no key.
    pub fn select(&self, key: Option<String>) {
        let key = key.filter(|k| !k.trim().is_empty());
        match self.inner.write() {
            Ok(mut guard) => *guard = key,
            Err(poisoned) => *poisoned.into_inner() = key,
        }
    }

    pub fn current(&self) -> Option<String> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.current().is_some()
    }
}
