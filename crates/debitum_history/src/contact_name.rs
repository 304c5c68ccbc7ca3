//! Contact display name and username for an event.
//!
//! Sources are tried in order: the event's own payload, an embedded delete snapshot, the
//! per-pass [`LookupCache`], the contact's creation event in the log, and finally the external
//! [`ContactLookup`]. Which of these apply depends on the event (see [`resolve_contact`]).
//! Nothing here fails; unresolved names become "Unknown" or "Unknown Contact".

use crate::index::{find_creation_event, UndoneEventIndex};
use crate::lookup::{ContactLookup, LookupCache};
use crate::models::{AggregateType, ContactFields, Event, EventKind, EventPayload};

pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_CONTACT: &str = "Unknown Contact";

/// Resolved contact for one event. `username` is `None` whenever `name` is a sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedContact {
    pub name: String,
    pub username: Option<String>,
}

impl ResolvedContact {
    fn unknown(sentinel: &str) -> Self {
        Self {
            name: sentinel.to_string(),
            username: None,
        }
    }
}

pub async fn resolve_contact_name<L: ContactLookup + ?Sized>(
    event: &Event,
    cache: &mut LookupCache,
    undone: &UndoneEventIndex,
    log: &[Event],
    lookup: &L,
) -> Option<String> {
    resolve_contact(event, cache, undone, log, lookup).await.map(|c| c.name)
}

pub async fn resolve_username<L: ContactLookup + ?Sized>(
    event: &Event,
    cache: &mut LookupCache,
    undone: &UndoneEventIndex,
    log: &[Event],
    lookup: &L,
) -> Option<String> {
    resolve_contact(event, cache, undone, log, lookup)
        .await
        .and_then(|c| c.username)
}

/// Name and username in one go. `None` only for transaction events with no `contact_id` and
/// for aggregates that are neither contacts nor transactions.
pub async fn resolve_contact<L: ContactLookup + ?Sized>(
    event: &Event,
    cache: &mut LookupCache,
    undone: &UndoneEventIndex,
    log: &[Event],
    lookup: &L,
) -> Option<ResolvedContact> {
    match (&event.kind, &event.aggregate_type) {
        // One level only: the undone event is resolved as a target, never as another UNDO.
        // A dangling reference falls back to the UNDO's own aggregate.
        (EventKind::Undo, _) => {
            let target = undone.target_of(event).unwrap_or(event);
            match &target.aggregate_type {
                AggregateType::Contact => Some(contact_from_log(target, log)),
                AggregateType::Transaction => Some(transaction_contact(target, cache, log, lookup).await),
                AggregateType::Other(_) => None,
            }
        }
        (EventKind::Delete, AggregateType::Contact) => Some(deleted_contact(event, cache, log)),
        (EventKind::Delete, AggregateType::Transaction) => {
            Some(transaction_contact(event, cache, log, lookup).await)
        }
        (_, AggregateType::Contact) => Some(plain_contact(event, cache)),
        (_, AggregateType::Transaction) => {
            let contact_id = event.embedded_transaction()?.contact_id.as_deref()?;
            Some(contact_by_id(contact_id, cache, lookup).await)
        }
        (_, AggregateType::Other(_)) => None,
    }
}

fn creation_fields<'a>(log: &'a [Event], aggregate_id: &str) -> Option<&'a ContactFields> {
    find_creation_event(log, &AggregateType::Contact, aggregate_id).and_then(Event::embedded_contact)
}

/// Embedded name first, then the contact's creation event.
fn contact_from_log(target: &Event, log: &[Event]) -> ResolvedContact {
    let embedded = target.embedded_contact();
    let created = creation_fields(log, &target.aggregate_id);
    let name = embedded
        .and_then(|f| f.name.clone())
        .or_else(|| created.and_then(|f| f.name.clone()));
    match name {
        Some(name) => ResolvedContact {
            name,
            username: embedded
                .and_then(|f| f.username.clone())
                .or_else(|| created.and_then(|f| f.username.clone())),
        },
        None => ResolvedContact::unknown(UNKNOWN),
    }
}

/// Delete snapshot, then the cache, then the creation event. No external lookup: the contact
/// is gone from the current-state store.
fn deleted_contact(event: &Event, cache: &LookupCache, log: &[Event]) -> ResolvedContact {
    let snapshot = match &event.payload {
        EventPayload::ContactDeleted { deleted_contact } => deleted_contact.as_ref(),
        _ => None,
    };
    let cached = cache.get(&event.aggregate_id);
    let created = creation_fields(log, &event.aggregate_id);

    let name = snapshot
        .and_then(|f| f.name.clone())
        .or_else(|| cached.map(|c| c.name.clone()))
        .or_else(|| created.and_then(|f| f.name.clone()));
    match name {
        Some(name) => ResolvedContact {
            name,
            username: snapshot
                .and_then(|f| f.username.clone())
                .or_else(|| cached.and_then(|c| c.username.clone()))
                .or_else(|| created.and_then(|f| f.username.clone())),
        },
        None => ResolvedContact::unknown(UNKNOWN),
    }
}

/// Payload name, remembered for later events of the pass; otherwise whatever the cache knows.
fn plain_contact(event: &Event, cache: &mut LookupCache) -> ResolvedContact {
    let fields = event.embedded_contact().cloned().unwrap_or_default();
    if let Some(name) = &fields.name {
        cache.remember(&event.aggregate_id, name, fields.username.as_deref());
    }
    match (fields.name, cache.get(&event.aggregate_id)) {
        (Some(name), cached) => ResolvedContact {
            name,
            username: fields.username.or_else(|| cached.and_then(|c| c.username.clone())),
        },
        (None, Some(cached)) => ResolvedContact {
            name: cached.name.clone(),
            username: fields.username.or_else(|| cached.username.clone()),
        },
        (None, None) => ResolvedContact::unknown(UNKNOWN),
    }
}

/// Contact of a transaction event: the event's own (or snapshot) `contact_id`, else the one
/// recorded when the transaction was created.
async fn transaction_contact<L: ContactLookup + ?Sized>(
    event: &Event,
    cache: &mut LookupCache,
    log: &[Event],
    lookup: &L,
) -> ResolvedContact {
    let contact_id = event
        .embedded_transaction()
        .and_then(|f| f.contact_id.clone())
        .or_else(|| {
            find_creation_event(log, &AggregateType::Transaction, &event.aggregate_id)
                .and_then(Event::embedded_transaction)
                .and_then(|f| f.contact_id.clone())
        });
    match contact_id {
        Some(id) => contact_by_id(&id, cache, lookup).await,
        None => ResolvedContact::unknown(UNKNOWN_CONTACT),
    }
}

async fn contact_by_id<L: ContactLookup + ?Sized>(
    contact_id: &str,
    cache: &mut LookupCache,
    lookup: &L,
) -> ResolvedContact {
    match cache.resolve(lookup, contact_id).await {
        Some(found) => ResolvedContact {
            name: found.name,
            username: found.username,
        },
        None => ResolvedContact::unknown(UNKNOWN_CONTACT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{LookupError, NoLookup};
    use crate::models::{ContactRecord, RawEvent};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapLookup {
        contacts: HashMap<String, ContactRecord>,
        calls: AtomicUsize,
    }

    impl MapLookup {
        fn with(contacts: &[(&str, &str, Option<&str>)]) -> Self {
            Self {
                contacts: contacts
                    .iter()
                    .map(|(id, name, username)| {
                        (
                            id.to_string(),
                            ContactRecord {
                                id: id.to_string(),
                                name: name.to_string(),
                                username: username.map(String::from),
                            },
                        )
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContactLookup for MapLookup {
        async fn find_contact(&self, contact_id: &str) -> Result<Option<ContactRecord>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.contacts.get(contact_id).cloned())
        }
    }

    fn event(id: &str, aggregate_type: &str, aggregate_id: &str, event_type: &str, data: serde_json::Value) -> Event {
        Event::from_raw(&RawEvent {
            id: id.to_string(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_id: aggregate_id.to_string(),
            event_type: event_type.to_string(),
            event_data: data,
            timestamp: String::new(),
            version: 1,
            synced: false,
        })
    }

    async fn resolve_at<L: ContactLookup>(log: &[Event], at: usize, lookup: &L) -> Option<ResolvedContact> {
        let index = UndoneEventIndex::from_log(log);
        let mut cache = LookupCache::new();
        resolve_contact(&log[at], &mut cache, &index, log, lookup).await
    }

    fn named(name: &str, username: Option<&str>) -> Option<ResolvedContact> {
        Some(ResolvedContact {
            name: name.to_string(),
            username: username.map(String::from),
        })
    }

    #[tokio::test]
    async fn bare_contact_delete_falls_back_to_creation_event() {
        let log = vec![
            event("e1", "contact", "c1", "CREATED", json!({"name": "Alice", "username": "alice"})),
            event("e2", "contact", "c1", "DELETED", json!({})),
        ];
        let index = UndoneEventIndex::from_log(&log);
        let mut cache = LookupCache::new();
        let name = resolve_contact_name(&log[1], &mut cache, &index, &log, &NoLookup).await;
        assert_eq!(name.as_deref(), Some("Alice"));
        let username = resolve_username(&log[1], &mut cache, &index, &log, &NoLookup).await;
        assert_eq!(username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn unknown_event_types_resolve_through_their_own_payload() {
        let log = vec![
            event("e1", "contact", "c1", "CREATED", json!({"name": "Alice", "username": "alice"})),
            event("e2", "transaction", "t1", "SETTLED", json!({"contact_id": "c1", "amount": 300, "direction": "lent"})),
            event("e3", "contact", "c1", "ARCHIVED", json!({"name": "Alice Archived"})),
            event("e4", "transaction", "t2", "SETTLED", json!({"contact_id": "c2", "amount": 5})),
        ];
        let lookup = MapLookup::with(&[("c2", "Bob", None)]);
        let index = UndoneEventIndex::from_log(&log);
        let mut cache = LookupCache::new();
        let mut resolved = Vec::new();
        for e in &log {
            resolved.push(resolve_contact(e, &mut cache, &index, &log, &lookup).await);
        }
        assert_eq!(resolved[1], named("Alice", Some("alice")));
        assert_eq!(resolved[2], named("Alice Archived", Some("alice")));
        assert_eq!(resolved[3], named("Bob", None));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn contact_delete_prefers_snapshot_then_cache() {
        let log = vec![
            event("e1", "contact", "c1", "CREATED", json!({"name": "Alice"})),
            event("e2", "contact", "c1", "UPDATED", json!({"name": "Alice Smith"})),
            event("e3", "contact", "c1", "DELETED", json!({})),
            event("e4", "contact", "c2", "DELETED", json!({"deleted_contact": {"name": "Bob", "username": "bob"}})),
            event("e5", "contact", "c3", "DELETED", json!({})),
        ];
        let index = UndoneEventIndex::from_log(&log);
        let mut cache = LookupCache::new();
        let mut names = Vec::new();
        for e in &log {
            names.push(resolve_contact(e, &mut cache, &index, &log, &NoLookup).await);
        }
        assert_eq!(names[2], named("Alice Smith", None));
        assert_eq!(names[3], named("Bob", Some("bob")));
        assert_eq!(names[4], named(UNKNOWN, None));
    }

    #[tokio::test]
    async fn plain_contact_event_without_name_uses_cache() {
        let log = vec![
            event("e1", "contact", "c1", "CREATED", json!({"name": "Alice", "username": "alice"})),
            event("e2", "contact", "c1", "UPDATED", json!({"total_debt": 10})),
            event("e3", "contact", "c9", "UPDATED", json!({})),
        ];
        let index = UndoneEventIndex::from_log(&log);
        let mut cache = LookupCache::new();
        let first = resolve_contact(&log[0], &mut cache, &index, &log, &NoLookup).await;
        let second = resolve_contact(&log[1], &mut cache, &index, &log, &NoLookup).await;
        let third = resolve_contact(&log[2], &mut cache, &index, &log, &NoLookup).await;
        assert_eq!(first, named("Alice", Some("alice")));
        assert_eq!(second, named("Alice", Some("alice")));
        assert_eq!(third, named(UNKNOWN, None));
    }

    #[tokio::test]
    async fn transaction_without_contact_id_has_no_contact() {
        let log = vec![event("e1", "transaction", "t1", "CREATED", json!({"amount": 10}))];
        let lookup = MapLookup::with(&[]);
        assert_eq!(resolve_at(&log, 0, &lookup).await, None);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transaction_contact_comes_from_lookup() {
        let log = vec![
            event("e1", "transaction", "t1", "CREATED", json!({"contact_id": "c1", "amount": 10})),
            event("e2", "transaction", "t2", "CREATED", json!({"contact_id": "c404", "amount": 10})),
        ];
        let lookup = MapLookup::with(&[("c1", "Alice", Some("alice"))]);
        assert_eq!(resolve_at(&log, 0, &lookup).await, named("Alice", Some("alice")));
        assert_eq!(resolve_at(&log, 1, &lookup).await, named(UNKNOWN_CONTACT, None));
    }

    #[tokio::test]
    async fn transaction_delete_uses_snapshot_or_creation_contact() {
        let log = vec![
            event("e1", "transaction", "t1", "CREATED", json!({"contact_id": "c1", "amount": 10})),
            event("e2", "transaction", "t1", "DELETED", json!({})),
            event("e3", "transaction", "t2", "DELETED", json!({"deleted_transaction": {"contact_id": "c2", "amount": 5}})),
            event("e4", "transaction", "t3", "DELETED", json!({})),
        ];
        let lookup = MapLookup::with(&[("c1", "Alice", None), ("c2", "Bob", None)]);
        assert_eq!(resolve_at(&log, 1, &lookup).await, named("Alice", None));
        assert_eq!(resolve_at(&log, 2, &lookup).await, named("Bob", None));
        assert_eq!(resolve_at(&log, 3, &lookup).await, named(UNKNOWN_CONTACT, None));
    }

    #[tokio::test]
    async fn undo_resolves_through_the_undone_event() {
        let log = vec![
            event("e1", "contact", "c1", "CREATED", json!({"name": "Alice"})),
            event("e2", "contact", "c1", "DELETED", json!({})),
            event("e3", "contact", "c1", "UNDO", json!({"undone_event_id": "e2"})),
            event("e4", "transaction", "t1", "CREATED", json!({"contact_id": "c1", "amount": 500})),
            event("e5", "transaction", "t1", "UNDO", json!({"undone_event_id": "e4"})),
            event("e6", "contact", "c7", "UNDO", json!({"undone_event_id": "gone"})),
        ];
        let lookup = MapLookup::with(&[("c1", "Alice (now)", None)]);
        assert_eq!(resolve_at(&log, 2, &lookup).await, named("Alice", None));
        assert_eq!(resolve_at(&log, 4, &lookup).await, named("Alice (now)", None));
        assert_eq!(resolve_at(&log, 5, &lookup).await, named(UNKNOWN, None));
    }

    #[tokio::test]
    async fn undo_of_contact_update_prefers_the_updated_name() {
        let log = vec![
            event("e1", "contact", "c1", "CREATED", json!({"name": "Alice"})),
            event("e2", "contact", "c1", "UPDATED", json!({"name": "Alicia", "username": "alicia"})),
            event("e3", "contact", "c1", "UNDO", json!({"undone_event_id": "e2"})),
        ];
        assert_eq!(resolve_at(&log, 2, &NoLookup).await, named("Alicia", Some("alicia")));
    }

    #[tokio::test]
    async fn other_aggregates_have_no_contact() {
        let log = vec![event("e1", "wallet", "w1", "CREATED", json!({"name": "Home"}))];
        assert_eq!(resolve_at(&log, 0, &NoLookup).await, None);
    }
}
