//! One derivation pass over the event log: every event becomes a [`HistoryEntry`] for the
//! events log screen. The pass owns its [`LookupCache`]; nothing outlives it.

use crate::amount::resolve_amount;
use crate::contact_name::resolve_contact;
use crate::index::UndoneEventIndex;
use crate::label::resolve_label;
use crate::lookup::{ContactLookup, LookupCache};
use crate::models::{AggregateType, AmountDisplay, Event, RawEvent};
use crate::rust_log;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Display facts for one event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub event_id: String,
    pub aggregate_type: AggregateType,
    pub aggregate_id: String,
    pub event_type: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub label: String,
    pub contact_name: Option<String>,
    pub username: Option<String>,
    pub amount: Option<AmountDisplay>,
    pub total_debt: Option<i64>,
    /// Id of the UNDO event that compensates this one, if any.
    pub undone_by: Option<String>,
}

pub struct HistoryPass<'a, L: ContactLookup + ?Sized> {
    log: &'a [Event],
    undone: &'a UndoneEventIndex,
    lookup: &'a L,
    cache: LookupCache,
    undone_by: HashMap<&'a str, &'a str>,
}

impl<'a, L: ContactLookup + ?Sized> HistoryPass<'a, L> {
    /// `log` must already be in its authoritative order; the pass never sorts.
    pub fn new(log: &'a [Event], undone: &'a UndoneEventIndex, lookup: &'a L) -> Self {
        let undone_by = log
            .iter()
            .filter_map(|e| e.undone_event_id().map(|target| (target, e.id.as_str())))
            .collect();
        Self {
            log,
            undone,
            lookup,
            cache: LookupCache::new(),
            undone_by,
        }
    }

    pub async fn describe(&mut self, event: &Event) -> HistoryEntry {
        let contact = resolve_contact(event, &mut self.cache, self.undone, self.log, self.lookup).await;
        let (contact_name, username) = match contact {
            Some(c) => (Some(c.name), c.username),
            None => (None, None),
        };
        HistoryEntry {
            event_id: event.id.clone(),
            aggregate_type: event.aggregate_type.clone(),
            aggregate_id: event.aggregate_id.clone(),
            event_type: event.raw_event_type.clone(),
            timestamp: event.timestamp,
            label: resolve_label(event, self.undone),
            contact_name,
            username,
            amount: resolve_amount(event, self.undone, self.log),
            total_debt: event.total_debt,
            undone_by: self.undone_by.get(event.id.as_str()).map(|id| id.to_string()),
        }
    }

    /// Describe every event in log order. Consumes the pass so its cache cannot leak into
    /// another one.
    pub async fn run(mut self) -> Vec<HistoryEntry> {
        let mut entries = Vec::with_capacity(self.log.len());
        for event in self.log {
            entries.push(self.describe(event).await);
        }
        rust_log!(
            "[debitum_rs] history pass: {} events, {} undone, {} contact lookups",
            entries.len(),
            self.undone.len(),
            self.cache.lookups()
        );
        entries
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }
}

/// Decode the log, build the undone index and run one pass with a fresh cache.
pub async fn derive_history<L: ContactLookup + ?Sized>(raw_events: &[RawEvent], lookup: &L) -> Vec<HistoryEntry> {
    let log: Vec<Event> = raw_events.iter().map(Event::from_raw).collect();
    let undone = UndoneEventIndex::from_log(&log);
    HistoryPass::new(&log, &undone, lookup).run().await
}
