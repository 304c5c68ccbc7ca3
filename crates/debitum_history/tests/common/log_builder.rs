//! Log builder: turn commands like "transaction create t1 c1 lent 500" into wire events with
//! realistic `total_debt` snapshots, the way the app would have recorded them.
//!
//! Event ids are "e1", "e2", ... in command order. Positive totals mean the user lent money.

use std::collections::HashMap;

use debitum_history::RawEvent;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Contact {
    name: String,
    username: Option<String>,
    alive: bool,
}

#[derive(Clone)]
struct Transaction {
    contact_id: String,
    amount: i64,
    direction: String,
    alive: bool,
}

impl Transaction {
    fn signed(&self) -> i64 {
        if self.direction == "lent" {
            self.amount
        } else {
            -self.amount
        }
    }
}

#[derive(Clone, Default)]
struct State {
    contacts: HashMap<String, Contact>,
    transactions: HashMap<String, Transaction>,
}

impl State {
    fn total_debt(&self) -> i64 {
        self.transactions
            .values()
            .filter(|t| t.alive)
            .filter(|t| self.contacts.get(&t.contact_id).map(|c| c.alive).unwrap_or(false))
            .map(Transaction::signed)
            .sum()
    }
}

pub struct LogBuilder {
    state: State,
    /// State before each event, so an undo can restore it.
    before: HashMap<String, State>,
    /// (aggregate_type, aggregate_id) of each event.
    aggregates: HashMap<String, (String, String)>,
    events: Vec<RawEvent>,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self {
            state: State::default(),
            before: HashMap::new(),
            aggregates: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Run commands in order. Empty lines and # comments are skipped.
    pub fn run_commands(mut self, commands: &[&str]) -> Result<Self, String> {
        for cmd in commands {
            let cmd = cmd.trim();
            if cmd.is_empty() || cmd.starts_with('#') {
                continue;
            }
            self.execute_command(cmd)?;
        }
        Ok(self)
    }

    pub fn events(&self) -> &[RawEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<RawEvent> {
        self.events
    }

    fn execute_command(&mut self, command: &str) -> Result<(), String> {
        let tokens = tokenize(command);
        let t: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let snapshot = self.state.clone();
        let (aggregate_type, aggregate_id, event_type, mut data) = match t.as_slice() {
            ["contact", "create", id, name, rest @ ..] => {
                let username = rest.first().map(|u| u.to_string());
                self.state.contacts.insert(
                    id.to_string(),
                    Contact { name: name.to_string(), username: username.clone(), alive: true },
                );
                ("contact", *id, "CREATED", json!({"name": name, "username": username}))
            }
            ["contact", "update", id, name] => {
                let contact = self.contact_mut(id)?;
                contact.name = name.to_string();
                ("contact", *id, "UPDATED", json!({"name": name}))
            }
            ["contact", "delete", id] => {
                let contact = self.contact_mut(id)?;
                contact.alive = false;
                let snapshot = json!({"name": contact.name, "username": contact.username});
                ("contact", *id, "DELETED", json!({"deleted_contact": snapshot}))
            }
            ["transaction", "create", id, contact_id, direction, amount] => {
                let amount: i64 = amount.parse().map_err(|_| format!("Bad amount in: {}", command))?;
                self.state.transactions.insert(
                    id.to_string(),
                    Transaction {
                        contact_id: contact_id.to_string(),
                        amount,
                        direction: direction.to_string(),
                        alive: true,
                    },
                );
                (
                    "transaction",
                    *id,
                    "CREATED",
                    json!({"contact_id": contact_id, "amount": amount, "direction": direction}),
                )
            }
            ["transaction", "update", id, amount] => {
                let amount: i64 = amount.parse().map_err(|_| format!("Bad amount in: {}", command))?;
                let tx = self.transaction_mut(id)?;
                tx.amount = amount;
                let data = json!({"contact_id": tx.contact_id, "amount": amount, "direction": tx.direction});
                ("transaction", *id, "UPDATED", data)
            }
            ["transaction", "delete", id] => {
                let tx = self.transaction_mut(id)?;
                tx.alive = false;
                let snapshot = json!({"contact_id": tx.contact_id, "amount": tx.amount, "direction": tx.direction});
                ("transaction", *id, "DELETED", json!({"deleted_transaction": snapshot}))
            }
            ["undo", target] => {
                let (aggregate_type, aggregate_id) = self
                    .aggregates
                    .get(*target)
                    .cloned()
                    .ok_or_else(|| format!("Unknown event: {}", target))?;
                self.state = self.before[*target].clone();
                return self.push(&aggregate_type, &aggregate_id, "UNDO", json!({"undone_event_id": target}), snapshot);
            }
            _ => return Err(format!("Unknown command: {}", command)),
        };
        data["total_debt"] = json!(self.state.total_debt());
        self.push(aggregate_type, aggregate_id, event_type, data, snapshot)
    }

    fn push(&mut self, aggregate_type: &str, aggregate_id: &str, event_type: &str, mut data: Value, before: State) -> Result<(), String> {
        let id = format!("e{}", self.events.len() + 1);
        if data.get("total_debt").is_none() {
            data["total_debt"] = json!(self.state.total_debt());
        }
        self.events.push(RawEvent {
            id: id.clone(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_id: aggregate_id.to_string(),
            event_type: event_type.to_string(),
            event_data: data,
            timestamp: format!("2026-02-04T12:00:{:02}Z", self.events.len()),
            version: 1,
            synced: true,
        });
        self.before.insert(id.clone(), before);
        self.aggregates.insert(id, (aggregate_type.to_string(), aggregate_id.to_string()));
        Ok(())
    }

    fn contact_mut(&mut self, id: &str) -> Result<&mut Contact, String> {
        self.state.contacts.get_mut(id).ok_or_else(|| format!("Unknown contact: {}", id))
    }

    fn transaction_mut(&mut self, id: &str) -> Result<&mut Transaction, String> {
        self.state.transactions.get_mut(id).ok_or_else(|| format!("Unknown transaction: {}", id))
    }
}

/// Split on whitespace, keeping "quoted names" together.
fn tokenize(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in command.chars() {
        match ch {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Build a log from commands, panicking on a bad command.
pub fn build_log(commands: &[&str]) -> Vec<RawEvent> {
    LogBuilder::new()
        .run_commands(commands)
        .expect("run_commands")
        .into_events()
}
