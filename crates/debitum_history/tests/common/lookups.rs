//! In-memory contact stores standing in for the backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use debitum_history::{ContactLookup, ContactRecord, LookupError};

/// Knows a fixed set of contacts; ids in `broken` fail like an unreachable server.
/// Counts every call per contact id.
pub struct CountingLookup {
    contacts: HashMap<String, ContactRecord>,
    broken: Vec<String>,
    calls: std::sync::Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl CountingLookup {
    pub fn new() -> Self {
        Self {
            contacts: HashMap::new(),
            broken: Vec::new(),
            calls: std::sync::Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
        }
    }

    pub fn with_contact(mut self, id: &str, name: &str, username: Option<&str>) -> Self {
        self.contacts.insert(
            id.to_string(),
            ContactRecord {
                id: id.to_string(),
                name: name.to_string(),
                username: username.map(str::to_string),
            },
        );
        self
    }

    pub fn with_broken(mut self, id: &str) -> Self {
        self.broken.push(id.to_string());
        self
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls.lock().expect("calls").get(id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactLookup for CountingLookup {
    async fn find_contact(&self, contact_id: &str) -> Result<Option<ContactRecord>, LookupError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().expect("calls").entry(contact_id.to_string()).or_insert(0) += 1;
        if self.broken.iter().any(|b| b == contact_id) {
            return Err(LookupError::Http("connection refused".to_string()));
        }
        Ok(self.contacts.get(contact_id).cloned())
    }
}
