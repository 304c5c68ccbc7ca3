//! HTTP contact lookup against the backend's contact projection.
use crate::config::RemoteConfig;
use crate::ids::ContactId;
use crate::lookup::{ContactLookup, LookupError};
use crate::models::ContactRecord;
use async_trait::async_trait;
use serde::Deserialize;

/// Row of GET /api/admin/contacts (only the fields the history needs).
#[derive(Debug, Deserialize)]
struct ContactResponse {
    id: String,
    name: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    is_deleted: bool,
}

pub struct RemoteContactLookup {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl RemoteContactLookup {
    pub fn new(config: RemoteConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LookupError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn contacts_url(&self) -> String {
        format!("{}/api/admin/contacts", self.config.base_url)
    }
}

#[async_trait]
impl ContactLookup for RemoteContactLookup {
    async fn find_contact(&self, contact_id: &str) -> Result<Option<ContactRecord>, LookupError> {
        // Server ids are UUIDs; anything else cannot be there.
        let contact_id = match ContactId::parse(contact_id) {
            Ok(id) => id,
            Err(_) => return Ok(None),
        };
        let resp = self
            .client
            .get(self.contacts_url())
            .bearer_auth(&self.config.token)
            .header("x-wallet-id", self.config.wallet_id.as_str())
            .query(&[("wallet_id", self.config.wallet_id.as_str())])
            .send()
            .await
            .map_err(|e| LookupError::Http(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| LookupError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(LookupError::Http(format!("{} {}", status, text)));
        }
        let contacts = parse_contacts(&text)?;
        Ok(find_live(contacts, contact_id.as_str()))
    }
}

/// Accepts a bare array or `{ "contacts": [...] }`.
fn parse_contacts(text: &str) -> Result<Vec<ContactResponse>, LookupError> {
    let json: serde_json::Value = serde_json::from_str(text).map_err(|e| LookupError::Decode(e.to_string()))?;
    let arr = json
        .get("contacts")
        .and_then(|v| v.as_array())
        .cloned()
        .or_else(|| json.as_array().cloned())
        .ok_or_else(|| LookupError::Decode("expected a contact list".to_string()))?;
    Ok(arr
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

fn find_live(contacts: Vec<ContactResponse>, contact_id: &str) -> Option<ContactRecord> {
    contacts
        .into_iter()
        .find(|c| c.id == contact_id && !c.is_deleted)
        .map(|c| ContactRecord {
            id: c.id,
            name: c.name,
            username: c.username,
        })
}
