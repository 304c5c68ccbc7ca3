//! Money shown next to an event: a literal transaction amount, or a net impact computed by
//! differencing `total_debt` snapshots.

use crate::index::{find_creation_event, find_previous_event, UndoneEventIndex};
use crate::models::{AggregateType, AmountDisplay, Event, EventKind, EventPayload, TransactionFields};

pub fn resolve_amount(event: &Event, undone: &UndoneEventIndex, log: &[Event]) -> Option<AmountDisplay> {
    match (&event.kind, &event.aggregate_type) {
        (EventKind::Undo, _) => {
            let target = undone.target_of(event);
            let aggregate = target.map(|t| &t.aggregate_type).unwrap_or(&event.aggregate_type);
            match aggregate {
                AggregateType::Transaction => undo_transaction_amount(event, target, log),
                AggregateType::Contact => undo_contact_amount(event, target),
                AggregateType::Other(_) => None,
            }
        }
        (EventKind::Delete, AggregateType::Contact) => delete_contact_amount(event, log),
        (EventKind::Delete, AggregateType::Transaction) => delete_transaction_amount(event, log),
        (_, AggregateType::Transaction) => match &event.payload {
            EventPayload::TransactionChanged(fields) => literal(fields),
            _ => None,
        },
        _ => None,
    }
}

fn literal(fields: &TransactionFields) -> Option<AmountDisplay> {
    fields.amount.map(|amount| AmountDisplay::literal(amount, fields.direction))
}

fn creation_amount(log: &[Event], transaction_id: &str) -> Option<AmountDisplay> {
    find_creation_event(log, &AggregateType::Transaction, transaction_id)
        .and_then(Event::embedded_transaction)
        .and_then(literal)
}

/// Own amount (undo of an update), then the undone delete's snapshot, then the original
/// creation amount (undo of a create cancels it).
fn undo_transaction_amount(undo: &Event, target: Option<&Event>, log: &[Event]) -> Option<AmountDisplay> {
    if let EventPayload::Undo { transaction, .. } = &undo.payload {
        if let Some(amount) = literal(transaction) {
            return Some(amount);
        }
    }
    if let Some(EventPayload::TransactionDeleted { deleted_transaction: Some(fields) }) = target.map(|t| &t.payload) {
        if let Some(amount) = literal(fields) {
            return Some(amount);
        }
    }
    let transaction_id = target.map(|t| t.aggregate_id.as_str()).unwrap_or(undo.aggregate_id.as_str());
    creation_amount(log, transaction_id)
}

/// Only undoing a delete moves the balance; undoing a contact create or update has no money.
fn undo_contact_amount(undo: &Event, target: Option<&Event>) -> Option<AmountDisplay> {
    let deleted = target.filter(|t| t.kind == EventKind::Delete)?;
    let net_impact = undo.total_debt?.checked_sub(deleted.total_debt?)?;
    AmountDisplay::net_impact(net_impact)
}

fn delete_contact_amount(event: &Event, log: &[Event]) -> Option<AmountDisplay> {
    let previous = find_previous_event(log, event)?;
    let net_impact = event.total_debt?.checked_sub(previous.total_debt?)?;
    AmountDisplay::net_impact(net_impact)
}

fn delete_transaction_amount(event: &Event, log: &[Event]) -> Option<AmountDisplay> {
    if let EventPayload::TransactionDeleted { deleted_transaction: Some(fields) } = &event.payload {
        if let Some(amount) = literal(fields) {
            return Some(amount);
        }
    }
    creation_amount(log, &event.aggregate_id)
}
