//! Contact lookup capability and the per-pass memoization cache in front of it.

use crate::models::ContactRecord;
use crate::rust_log;
use crate::state_builder;
use crate::storage;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("contact lookup not configured")]
    NotConfigured,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Single-entity lookup into the current-state contact store.
/// `Ok(None)` is an explicit not-found; errors are swallowed by the resolver.
#[async_trait]
pub trait ContactLookup: Send + Sync {
    async fn find_contact(&self, contact_id: &str) -> Result<Option<ContactRecord>, LookupError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CachedContact {
    pub name: String,
    pub username: Option<String>,
}

/// Contact id -> resolved display name, scoped to one derivation pass.
/// Construct a fresh cache per pass; the underlying store may change between passes.
#[derive(Debug, Default)]
pub struct LookupCache {
    contacts: HashMap<String, CachedContact>,
    missing: HashSet<String>,
    lookups: usize,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, contact_id: &str) -> Option<&CachedContact> {
        self.contacts.get(contact_id)
    }

    /// Record a name seen in the log. Keeps a previously cached username when the event has none.
    pub fn remember(&mut self, contact_id: &str, name: &str, username: Option<&str>) {
        let entry = self.contacts.entry(contact_id.to_string()).or_default();
        entry.name = name.to_string();
        if let Some(u) = username {
            entry.username = Some(u.to_string());
        }
        self.missing.remove(contact_id);
    }

    /// Number of external lookups issued through this cache.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Cache, then the external store. Hits and not-found answers are memoized for the rest
    /// of the pass; a failed lookup is logged and treated as a miss.
    pub async fn resolve<L: ContactLookup + ?Sized>(
        &mut self,
        lookup: &L,
        contact_id: &str,
    ) -> Option<CachedContact> {
        if let Some(hit) = self.contacts.get(contact_id) {
            return Some(hit.clone());
        }
        if self.missing.contains(contact_id) {
            return None;
        }
        self.lookups += 1;
        match lookup.find_contact(contact_id).await {
            Ok(Some(record)) => {
                let cached = CachedContact {
                    name: record.name,
                    username: record.username,
                };
                self.contacts.insert(contact_id.to_string(), cached.clone());
                Some(cached)
            }
            Ok(None) => {
                self.missing.insert(contact_id.to_string());
                None
            }
            Err(e) => {
                rust_log!(
                    "[debitum_rs] contact lookup failed contact_id={} error={}",
                    contact_id,
                    e
                );
                None
            }
        }
    }
}

/// Lookup that never finds anything. For passes that must not touch any store.
pub struct NoLookup;

#[async_trait]
impl ContactLookup for NoLookup {
    async fn find_contact(&self, _contact_id: &str) -> Result<Option<ContactRecord>, LookupError> {
        Ok(None)
    }
}

/// Lookup over the local contact projection of one wallet. Rebuilds the projection from stored
/// events when none has been saved yet.
pub struct StorageContactLookup {
    wallet_id: String,
}

impl StorageContactLookup {
    pub fn new(wallet_id: impl Into<String>) -> Self {
        Self {
            wallet_id: wallet_id.into(),
        }
    }
}

#[async_trait]
impl ContactLookup for StorageContactLookup {
    async fn find_contact(&self, contact_id: &str) -> Result<Option<ContactRecord>, LookupError> {
        if !storage::is_ready() {
            return Err(LookupError::NotConfigured);
        }
        let contacts = match storage::state_load(&self.wallet_id).map_err(LookupError::Storage)? {
            Some(contacts) => contacts,
            None => {
                let events = storage::events_get_all(&self.wallet_id).map_err(LookupError::Storage)?;
                let contacts = state_builder::build_contacts_from_stored(&events);
                storage::state_save(&self.wallet_id, &contacts).map_err(LookupError::Storage)?;
                contacts
            }
        };
        Ok(contacts
            .into_iter()
            .find(|c| c.id == contact_id)
            .map(|c| ContactRecord {
                id: c.id,
                name: c.name,
                username: c.username,
            }))
    }
}
