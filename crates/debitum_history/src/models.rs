//! Event log models: wire events, decoded events with typed payloads, derived display values.
//! Wire format keeps strings for IDs and dates (FFI/JSON); decoding never fails, missing or
//! wrong-typed keys become `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which kind of entity an event concerns.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AggregateType {
    Contact,
    Transaction,
    /// Unknown value from historical data, kept verbatim.
    Other(String),
}

impl AggregateType {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "contact" => AggregateType::Contact,
            "transaction" => AggregateType::Transaction,
            _ => AggregateType::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AggregateType::Contact => "contact",
            AggregateType::Transaction => "transaction",
            AggregateType::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for AggregateType {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(self.as_str())
    }
}

/// Normalized event type. Source tokens vary ("CREATE" vs "CREATED", any case), so all
/// fuzzy matching happens in [`EventKind::normalize`] and nowhere else.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Update,
    Delete,
    Undo,
    Other(String),
}

impl EventKind {
    pub fn normalize(raw: &str) -> Self {
        let upper = raw.to_uppercase();
        if upper.contains("UNDO") {
            EventKind::Undo
        } else if upper.contains("DELETE") {
            EventKind::Delete
        } else if upper.contains("UPDATE") {
            EventKind::Update
        } else if upper.contains("CREATE") {
            EventKind::Create
        } else {
            EventKind::Other(raw.to_string())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Owed,
    Lent,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "owed" => Some(Direction::Owed),
            "lent" => Some(Direction::Lent),
            _ => None,
        }
    }

    /// Sign rule for snapshot deltas: debt going up reads as lent, going down as owed.
    pub fn from_net_impact(net_impact: i64) -> Self {
        if net_impact > 0 {
            Direction::Lent
        } else {
            Direction::Owed
        }
    }
}

/// Wire event as stored locally and exchanged with the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    #[serde(default)]
    pub aggregate_type: String,
    #[serde(default)]
    pub aggregate_id: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub event_data: Value,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub synced: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactFields {
    pub name: Option<String>,
    pub username: Option<String>,
}

impl ContactFields {
    fn from_value(v: &Value) -> Self {
        Self {
            name: str_field(v, "name"),
            username: str_field(v, "username"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFields {
    pub contact_id: Option<String>,
    pub amount: Option<i64>,
    pub direction: Option<Direction>,
}

impl TransactionFields {
    fn from_value(v: &Value) -> Self {
        Self {
            contact_id: str_field(v, "contact_id"),
            amount: int_field(v, "amount"),
            direction: str_field(v, "direction").and_then(|d| Direction::parse(&d)),
        }
    }
}

/// Typed event payload, one variant per (aggregate type, event kind) shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventPayload {
    /// contact CREATED / UPDATED, and any other non-delete contact event
    ContactChanged(ContactFields),
    /// contact DELETED, optionally embedding a snapshot of what was deleted
    ContactDeleted { deleted_contact: Option<ContactFields> },
    /// transaction CREATED / UPDATED, and any other non-delete transaction event
    TransactionChanged(TransactionFields),
    /// transaction DELETED, optionally embedding a snapshot of what was deleted
    TransactionDeleted { deleted_transaction: Option<TransactionFields> },
    /// UNDO of any aggregate; `transaction` holds the undo's own amount fields, if any.
    Undo {
        undone_event_id: Option<String>,
        transaction: TransactionFields,
    },
    /// any event of an unknown aggregate type
    Other,
}

impl EventPayload {
    pub fn decode(aggregate_type: &AggregateType, kind: &EventKind, data: &Value) -> Self {
        match (aggregate_type, kind) {
            (_, EventKind::Undo) => EventPayload::Undo {
                undone_event_id: str_field(data, "undone_event_id"),
                transaction: TransactionFields::from_value(data),
            },
            (AggregateType::Contact, EventKind::Create | EventKind::Update | EventKind::Other(_)) => {
                EventPayload::ContactChanged(ContactFields::from_value(data))
            }
            (AggregateType::Contact, EventKind::Delete) => EventPayload::ContactDeleted {
                deleted_contact: object_field(data, "deleted_contact").map(ContactFields::from_value),
            },
            (AggregateType::Transaction, EventKind::Create | EventKind::Update | EventKind::Other(_)) => {
                EventPayload::TransactionChanged(TransactionFields::from_value(data))
            }
            (AggregateType::Transaction, EventKind::Delete) => EventPayload::TransactionDeleted {
                deleted_transaction: object_field(data, "deleted_transaction")
                    .map(TransactionFields::from_value),
            },
            (AggregateType::Other(_), _) => EventPayload::Other,
        }
    }
}

/// Decoded, immutable event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: String,
    pub aggregate_type: AggregateType,
    pub aggregate_id: String,
    pub kind: EventKind,
    pub raw_event_type: String,
    pub payload: EventPayload,
    /// Running debt snapshot recorded with the event (after it was applied).
    pub total_debt: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub version: i32,
    pub synced: bool,
}

impl Event {
    pub fn from_raw(raw: &RawEvent) -> Self {
        let aggregate_type = AggregateType::parse(&raw.aggregate_type);
        let kind = EventKind::normalize(&raw.event_type);
        let payload = EventPayload::decode(&aggregate_type, &kind, &raw.event_data);
        let timestamp = DateTime::parse_from_rfc3339(&raw.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
        Event {
            id: raw.id.clone(),
            aggregate_type,
            aggregate_id: raw.aggregate_id.clone(),
            kind,
            raw_event_type: raw.event_type.clone(),
            payload,
            total_debt: int_field(&raw.event_data, "total_debt"),
            timestamp,
            version: raw.version,
            synced: raw.synced,
        }
    }

    pub fn undone_event_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Undo { undone_event_id, .. } => undone_event_id.as_deref(),
            _ => None,
        }
    }

    /// Name/username carried by the event itself (payload or embedded delete snapshot).
    pub fn embedded_contact(&self) -> Option<&ContactFields> {
        match &self.payload {
            EventPayload::ContactChanged(fields) => Some(fields),
            EventPayload::ContactDeleted { deleted_contact } => deleted_contact.as_ref(),
            _ => None,
        }
    }

    /// Transaction fields carried by the event itself (payload or embedded delete snapshot).
    pub fn embedded_transaction(&self) -> Option<&TransactionFields> {
        match &self.payload {
            EventPayload::TransactionChanged(fields) => Some(fields),
            EventPayload::TransactionDeleted { deleted_transaction } => deleted_transaction.as_ref(),
            EventPayload::Undo { transaction, .. } => Some(transaction),
            _ => None,
        }
    }
}

/// Derived monetary descriptor. `is_net_impact` marks a snapshot delta rather than a
/// literal transaction amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountDisplay {
    pub amount: u64,
    pub direction: Direction,
    pub is_net_impact: bool,
}

impl AmountDisplay {
    pub fn literal(amount: i64, direction: Option<Direction>) -> Self {
        Self {
            amount: amount.unsigned_abs(),
            direction: direction.unwrap_or(Direction::Owed),
            is_net_impact: false,
        }
    }

    /// Zero delta means nothing to show.
    pub fn net_impact(net_impact: i64) -> Option<Self> {
        if net_impact == 0 {
            return None;
        }
        Some(Self {
            amount: net_impact.unsigned_abs(),
            direction: Direction::from_net_impact(net_impact),
            is_net_impact: true,
        })
    }
}

/// Current-state contact as returned by a lookup (projection or backend).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn int_field(v: &Value, key: &str) -> Option<i64> {
    let v = v.get(key)?;
    v.as_i64().or_else(|| {
        v.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn object_field<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get(key).filter(|v| v.is_object())
}
