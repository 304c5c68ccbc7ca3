//! Lookups over the ordered event log: undone-event index, creation event, predecessor.
//! All searches return `Option`; "not found" is never signalled by handing back the input.

use crate::models::{AggregateType, Event, EventKind};
use std::collections::HashMap;

/// Undone event id -> the event it references. Built once per pass from the same log the
/// resolver reads. A missing entry is a valid state (the undone event is outside the log).
#[derive(Clone, Debug, Default)]
pub struct UndoneEventIndex {
    by_id: HashMap<String, Event>,
}

impl UndoneEventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_log(log: &[Event]) -> Self {
        let by_id: HashMap<&str, &Event> = log.iter().map(|e| (e.id.as_str(), e)).collect();
        let mut index = Self::new();
        for undone_id in log.iter().filter_map(|e| e.undone_event_id()) {
            if let Some(target) = by_id.get(undone_id) {
                index.insert((*target).clone());
            }
        }
        index
    }

    pub fn insert(&mut self, event: Event) {
        self.by_id.insert(event.id.clone(), event);
    }

    pub fn get(&self, event_id: &str) -> Option<&Event> {
        self.by_id.get(event_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// The event an UNDO compensates, if the UNDO names one and it is indexed.
    pub fn target_of(&self, undo: &Event) -> Option<&Event> {
        undo.undone_event_id().and_then(|id| self.get(id))
    }
}

/// First creation event for the aggregate, in log order.
pub fn find_creation_event<'a>(
    log: &'a [Event],
    aggregate_type: &AggregateType,
    aggregate_id: &str,
) -> Option<&'a Event> {
    log.iter().find(|e| {
        e.kind == EventKind::Create && &e.aggregate_type == aggregate_type && e.aggregate_id == aggregate_id
    })
}

/// The event right before `event` in the log, across all aggregates.
pub fn find_previous_event<'a>(log: &'a [Event], event: &Event) -> Option<&'a Event> {
    let pos = log.iter().position(|e| e.id == event.id)?;
    pos.checked_sub(1).map(|prev| &log[prev])
}
