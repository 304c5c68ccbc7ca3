//! Event log history for the Debitum client.
//!
//! Every mutation in Debitum is an append-only event. This crate turns the local event log into
//! display rows: an action label, the contact the event is about, and the money involved
//! (a literal transaction amount or a net impact computed from `total_debt` snapshots).
//!
//! The resolvers ([`resolve_label`], [`resolve_contact_name`], [`resolve_username`],
//! [`resolve_amount`]) are usable on their own; [`HistoryPass`] / [`derive_history`] run them
//! over a whole log with one [`LookupCache`]. The free functions at the bottom are the
//! JSON-string surface the host app calls.

use std::sync::Mutex;
use once_cell::sync::Lazy;

pub use serde_json::Value;

mod amount;
mod api;
mod config;
mod contact_name;
mod history;
mod ids;
mod index;
mod label;
mod log_bridge;
mod lookup;
mod models;
mod state_builder;
mod storage;

pub use amount::resolve_amount;
pub use api::RemoteContactLookup;
pub use config::RemoteConfig;
pub use contact_name::{
    resolve_contact, resolve_contact_name, resolve_username, ResolvedContact, UNKNOWN, UNKNOWN_CONTACT,
};
pub use history::{derive_history, HistoryEntry, HistoryPass};
pub use ids::{ContactId, WalletId};
pub use index::{find_creation_event, find_previous_event, UndoneEventIndex};
pub use label::{capitalize, resolve_label};
pub use lookup::{CachedContact, ContactLookup, LookupCache, LookupError, NoLookup, StorageContactLookup};
pub use models::{
    AggregateType, AmountDisplay, ContactFields, ContactRecord, Direction, Event, EventKind, EventPayload,
    RawEvent, TransactionFields,
};
pub use state_builder::{build_contacts, ProjectedContact};
pub use storage::StoredEvent;

struct BackendConfig {
    base_url: String,
}
static BACKEND_CONFIG: Lazy<Mutex<Option<BackendConfig>>> = Lazy::new(|| Mutex::new(None));

static RUNTIME: Lazy<Result<tokio::runtime::Runtime, String>> =
    Lazy::new(|| tokio::runtime::Runtime::new().map_err(|e| e.to_string()));

/// Call once at startup with the app documents directory path.
pub fn init_storage(storage_path: String) -> Result<(), String> {
    storage::init(&storage_path)?;
    rust_log!("[debitum_rs] history: storage ready");
    Ok(())
}

pub fn set_backend_config(base_url: String) {
    if let Ok(mut cfg) = BACKEND_CONFIG.lock() {
        *cfg = Some(BackendConfig { base_url });
    }
}

pub fn get_base_url() -> Option<String> {
    BACKEND_CONFIG
        .lock()
        .ok()
        .and_then(|cfg| cfg.as_ref().map(|c| c.base_url.clone()))
}

// --- Wallet ---
pub fn set_current_wallet_id(wallet_id: String) -> Result<(), String> {
    WalletId::parse(&wallet_id)?;
    storage::config_set("current_wallet_id", &wallet_id)?;
    // Rebuild this wallet's projection from its events on the next lookup.
    storage::state_clear(&wallet_id)
}

pub fn get_current_wallet_id() -> Option<String> {
    storage::config_get("current_wallet_id").ok().and_then(|o| o)
}

/// Append a wire event (JSON) to the local log of the current wallet. Events without a
/// `total_debt` get the wallet total after replaying the log, so deletes and undos recorded
/// here have a net impact.
pub fn record_event(event_json: String) -> Result<(), String> {
    let wallet_id = storage::config_get("current_wallet_id")?
        .ok_or_else(|| "No wallet selected".to_string())?;
    let raw: RawEvent = serde_json::from_str(&event_json).map_err(|e| e.to_string())?;
    let has_snapshot = raw.event_data.get("total_debt").is_some();
    let mut data = raw.event_data;
    let stored = StoredEvent {
        id: raw.id,
        wallet_id: wallet_id.clone(),
        aggregate_type: raw.aggregate_type,
        aggregate_id: raw.aggregate_id,
        event_type: raw.event_type,
        event_data: serde_json::to_string(&data).map_err(|e| e.to_string())?,
        timestamp: raw.timestamp,
        version: raw.version,
        synced: raw.synced,
    };
    if !storage::events_insert(&stored)? {
        rust_log!("[debitum_rs] history record_event: duplicate id={} ignored", stored.id);
        return Ok(());
    }
    let contacts = state_builder::build_contacts_from_stored(&storage::events_get_all(&wallet_id)?);
    storage::state_save(&wallet_id, &contacts)?;
    if has_snapshot {
        return Ok(());
    }
    let total_debt = state_builder::total_debt(&contacts);
    if data.is_null() {
        data = serde_json::json!({});
    }
    match data.as_object_mut() {
        Some(map) => {
            map.insert("total_debt".to_string(), serde_json::json!(total_debt));
        }
        // Scalar payloads carry no fields to extend.
        None => return Ok(()),
    }
    let updated = serde_json::to_string(&data).map_err(|e| e.to_string())?;
    storage::events_update_event_data(&stored.id, &updated)
}

fn current_log() -> Result<Option<(String, Vec<RawEvent>)>, String> {
    let wallet_id = match storage::config_get("current_wallet_id")? {
        Some(id) => id,
        None => return Ok(None),
    };
    let events = storage::events_get_all(&wallet_id)?;
    Ok(Some((wallet_id, events.iter().map(StoredEvent::to_raw).collect())))
}

// --- Events (JSON strings for the host app) ---
pub fn get_events() -> Result<String, String> {
    match current_log()? {
        Some((_, events)) => serde_json::to_string(&events).map_err(|e| e.to_string()),
        None => {
            rust_log!("[debitum_rs] history get_events: no current_wallet_id in config -> []");
            Ok("[]".to_string())
        }
    }
}

/// Derived rows for the current wallet's log, in log order. Contacts missing from the log are
/// looked up in the local projection.
pub fn get_event_history() -> Result<String, String> {
    let (wallet_id, events) = match current_log()? {
        Some(log) => log,
        None => {
            rust_log!("[debitum_rs] history get_event_history: no current_wallet_id in config -> []");
            return Ok("[]".to_string());
        }
    };
    let runtime = RUNTIME.as_ref().map_err(|e| e.clone())?;
    let lookup = StorageContactLookup::new(wallet_id);
    let entries = runtime.block_on(derive_history(&events, &lookup));
    serde_json::to_string(&entries).map_err(|e| e.to_string())
}

/// Same as [`get_event_history`], but contacts missing from the log are fetched from the backend.
pub fn get_event_history_remote() -> Result<String, String> {
    let (_, events) = match current_log()? {
        Some(log) => log,
        None => return Ok("[]".to_string()),
    };
    let config = RemoteConfig::from_storage().map_err(|e| e.to_string())?;
    let lookup = RemoteContactLookup::new(config).map_err(|e| e.to_string())?;
    let runtime = RUNTIME.as_ref().map_err(|e| e.clone())?;
    let entries = runtime.block_on(derive_history(&events, &lookup));
    serde_json::to_string(&entries).map_err(|e| e.to_string())
}

/// Drain buffered Rust log lines so the host app can show them.
pub fn drain_rust_logs() -> Vec<String> {
    log_bridge::drain_rust_logs()
}
