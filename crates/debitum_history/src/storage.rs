//! SQLite storage: config, the local event log, the saved contact projection.
//! Thread-local so each thread (e.g. each test) has its own DB; the host app uses a single thread.

use crate::models::RawEvent;
use crate::rust_log;
use crate::state_builder::ProjectedContact;
use rusqlite::{params, Connection};
use std::cell::RefCell;
use std::path::Path;

thread_local! {
    static DB: RefCell<Option<Connection>> = RefCell::new(None);
}

/// True if the current thread has called init() successfully.
pub fn is_ready() -> bool {
    DB.with(|cell| cell.borrow().is_some())
}

pub fn init(path: &str) -> Result<(), String> {
    let path_obj = Path::new(path);
    std::fs::create_dir_all(path_obj).map_err(|e| e.to_string())?;
    let db_path = path_obj.join("debitum.db");
    rust_log!("[debitum_rs] storage::init path={:?} db={:?}", path, db_path);
    let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;
    create_tables(&conn)?;
    DB.with(|cell| *cell.borrow_mut() = Some(conn));
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config (key TEXT PRIMARY KEY, value TEXT);
        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            wallet_id TEXT NOT NULL,
            aggregate_type TEXT NOT NULL,
            aggregate_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            event_data TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            synced INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_events_wallet ON events(wallet_id);
        CREATE TABLE IF NOT EXISTS state (
            wallet_id TEXT PRIMARY KEY,
            contacts_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}

fn with_db<F, T>(f: F) -> Result<T, String>
where
    F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
{
    DB.with(|cell| {
        let borrow = cell.borrow();
        let conn = borrow.as_ref().ok_or("Storage not initialized")?;
        f(conn).map_err(|e| e.to_string())
    })
}

// Config
pub fn config_get(key: &str) -> Result<Option<String>, String> {
    with_db(|conn| {
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get(0)?));
        }
        Ok(None)
    })
}

pub fn config_set(key: &str, value: &str) -> Result<(), String> {
    with_db(|conn| {
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    })
}

// Events
#[derive(Clone, Debug)]
pub struct StoredEvent {
    pub id: String,
    pub wallet_id: String,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub event_data: String,
    pub timestamp: String,
    pub version: i32,
    pub synced: bool,
}

impl StoredEvent {
    /// Unparsable event_data becomes JSON null; the decoder treats every key as absent.
    pub fn to_raw(&self) -> RawEvent {
        RawEvent {
            id: self.id.clone(),
            aggregate_type: self.aggregate_type.clone(),
            aggregate_id: self.aggregate_id.clone(),
            event_type: self.event_type.clone(),
            event_data: serde_json::from_str(&self.event_data).unwrap_or(serde_json::Value::Null),
            timestamp: self.timestamp.clone(),
            version: self.version,
            synced: self.synced,
        }
    }
}

/// Returns false when an event with the same id is already stored.
pub fn events_insert(e: &StoredEvent) -> Result<bool, String> {
    rust_log!(
        "[debitum_rs] storage::events_insert wallet_id={} aggregate={}/{} event_type={} id={}",
        e.wallet_id, e.aggregate_type, e.aggregate_id, e.event_type, e.id
    );
    with_db(|conn| {
        conn.execute(
            r#"
            INSERT OR IGNORE INTO events (id, wallet_id, aggregate_type, aggregate_id, event_type, event_data, timestamp, version, synced)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![e.id, e.wallet_id, e.aggregate_type, e.aggregate_id, e.event_type, e.event_data, e.timestamp, e.version, if e.synced { 1 } else { 0 }],
        )
    })
    .map(|inserted| inserted > 0)
}

pub fn events_update_event_data(event_id: &str, event_data_json: &str) -> Result<(), String> {
    with_db(|conn| {
        conn.execute("UPDATE events SET event_data = ?1 WHERE id = ?2", params![event_data_json, event_id])?;
        Ok(())
    })
}

/// All events of a wallet, oldest first. Ties keep insertion order.
pub fn events_get_all(wallet_id: &str) -> Result<Vec<StoredEvent>, String> {
    with_db(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, wallet_id, aggregate_type, aggregate_id, event_type, event_data, timestamp, version, synced FROM events WHERE wallet_id = ?1 ORDER BY timestamp ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![wallet_id], |row| {
            Ok(StoredEvent {
                id: row.get(0)?,
                wallet_id: row.get(1)?,
                aggregate_type: row.get(2)?,
                aggregate_id: row.get(3)?,
                event_type: row.get(4)?,
                event_data: row.get(5)?,
                timestamp: row.get(6)?,
                version: row.get(7)?,
                synced: row.get::<_, i32>(8)? != 0,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
    })
}

// State (contact projection cache)
pub fn state_save(wallet_id: &str, contacts: &[ProjectedContact]) -> Result<(), String> {
    let contacts_json = serde_json::to_string(contacts).map_err(|e| e.to_string())?;
    let updated_at = chrono::Utc::now().to_rfc3339();
    with_db(|conn| {
        conn.execute(
            r#"
            INSERT INTO state (wallet_id, contacts_json, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(wallet_id) DO UPDATE SET contacts_json = ?2, updated_at = ?3
            "#,
            params![wallet_id, contacts_json, updated_at],
        )?;
        Ok(())
    })
}

pub fn state_load(wallet_id: &str) -> Result<Option<Vec<ProjectedContact>>, String> {
    let json = with_db(|conn| {
        let mut stmt = conn.prepare("SELECT contacts_json FROM state WHERE wallet_id = ?1")?;
        let mut rows = stmt.query(params![wallet_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get::<_, String>(0)?));
        }
        Ok(None)
    })?;
    match json {
        Some(json) => {
            let contacts: Vec<ProjectedContact> = serde_json::from_str(&json).map_err(|e| e.to_string())?;
            Ok(Some(contacts))
        }
        None => Ok(None),
    }
}

/// Drop the saved projection so the next lookup rebuilds it from events.
pub fn state_clear(wallet_id: &str) -> Result<(), String> {
    with_db(|conn| {
        conn.execute("DELETE FROM state WHERE wallet_id = ?1", params![wallet_id])?;
        Ok(())
    })
}
