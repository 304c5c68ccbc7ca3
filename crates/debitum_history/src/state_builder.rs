//! Build the current contact projection from stored events. This is the current-state store the
//! history resolver falls back to when the log alone cannot name a contact, and the source of
//! the `total_debt` snapshot written into locally recorded events.

use crate::models::{AggregateType, Direction, Event, EventKind, EventPayload};
use crate::storage::StoredEvent;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Contact as it exists now (wire format: strings for IDs and dates).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProjectedContact {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    /// Sum of live transactions: lent adds, owed subtracts.
    #[serde(default)]
    pub balance: i64,
}

struct BuildTransaction {
    contact_id: String,
    amount: i64,
    direction: Direction,
}

pub fn build_contacts_from_stored(events: &[StoredEvent]) -> Vec<ProjectedContact> {
    let decoded: Vec<Event> = events.iter().map(|e| Event::from_raw(&e.to_raw())).collect();
    build_contacts(&decoded)
}

/// Wallet-wide debt: the sum of all contact balances.
pub fn total_debt(contacts: &[ProjectedContact]) -> i64 {
    contacts.iter().map(|c| c.balance).sum()
}

/// Replays contact and transaction events in log order. UNDO events and the events they undo
/// are skipped.
pub fn build_contacts(events: &[Event]) -> Vec<ProjectedContact> {
    let undone_event_ids: HashSet<&str> = events
        .iter()
        .filter_map(|e| e.undone_event_id())
        .collect();

    let mut contacts: HashMap<String, ProjectedContact> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut transactions: HashMap<String, BuildTransaction> = HashMap::new();

    for event in events {
        if event.kind == EventKind::Undo || undone_event_ids.contains(event.id.as_str()) {
            continue;
        }
        match event.aggregate_type {
            AggregateType::Contact => apply_contact_event(&mut contacts, &mut order, event),
            AggregateType::Transaction => apply_transaction_event(&mut transactions, event, &contacts),
            AggregateType::Other(_) => {}
        }
    }

    calculate_balances(&mut contacts, transactions.into_values());
    order
        .into_iter()
        .filter_map(|id| contacts.remove(&id))
        .collect()
}

fn apply_transaction_event(
    transactions: &mut HashMap<String, BuildTransaction>,
    event: &Event,
    contacts: &HashMap<String, ProjectedContact>,
) {
    let txn_id = event.aggregate_id.clone();
    let fields = match &event.payload {
        EventPayload::TransactionChanged(fields) => fields,
        _ => {
            if event.kind == EventKind::Delete {
                transactions.remove(&txn_id);
            }
            return;
        }
    };
    match event.kind {
        EventKind::Create => {
            let contact_id = fields.contact_id.clone().unwrap_or_default();
            if contact_id.is_empty() || !contacts.contains_key(&contact_id) {
                return;
            }
            transactions.insert(
                txn_id,
                BuildTransaction {
                    contact_id,
                    amount: fields.amount.unwrap_or(0),
                    direction: fields.direction.unwrap_or(Direction::Owed),
                },
            );
        }
        EventKind::Update => {
            if let Some(existing) = transactions.get_mut(&txn_id) {
                if let Some(amount) = fields.amount {
                    existing.amount = amount;
                }
                if let Some(direction) = fields.direction {
                    existing.direction = direction;
                }
                if let Some(contact_id) = fields.contact_id.as_ref().filter(|id| contacts.contains_key(*id)) {
                    existing.contact_id = contact_id.clone();
                }
            }
        }
        _ => {}
    }
}

/// Transactions of deleted contacts count for nobody.
fn calculate_balances(
    contacts: &mut HashMap<String, ProjectedContact>,
    transactions: impl Iterator<Item = BuildTransaction>,
) {
    for c in contacts.values_mut() {
        c.balance = 0;
    }
    for t in transactions {
        if let Some(c) = contacts.get_mut(&t.contact_id) {
            c.balance += match t.direction {
                Direction::Lent => t.amount,
                Direction::Owed => -t.amount,
            };
        }
    }
}

fn apply_contact_event(
    contacts: &mut HashMap<String, ProjectedContact>,
    order: &mut Vec<String>,
    event: &Event,
) {
    let contact_id = event.aggregate_id.clone();
    let ts = event.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default();
    let fields = match &event.payload {
        EventPayload::ContactChanged(fields) => Some(fields),
        _ => None,
    };

    match event.kind {
        EventKind::Create => {
            let fields = fields.cloned().unwrap_or_default();
            if !contacts.contains_key(&contact_id) {
                order.push(contact_id.clone());
            }
            contacts.insert(
                contact_id.clone(),
                ProjectedContact {
                    id: contact_id,
                    name: fields.name.unwrap_or_default(),
                    username: fields.username,
                    created_at: ts.clone(),
                    updated_at: ts,
                    balance: 0,
                },
            );
        }
        EventKind::Update => {
            if let (Some(existing), Some(fields)) = (contacts.get_mut(&contact_id), fields) {
                if let Some(name) = &fields.name {
                    existing.name = name.clone();
                }
                if let Some(username) = &fields.username {
                    existing.username = Some(username.clone());
                }
                existing.updated_at = ts;
            }
        }
        EventKind::Delete => {
            contacts.remove(&contact_id);
            order.retain(|id| id != &contact_id);
        }
        _ => {}
    }
}
