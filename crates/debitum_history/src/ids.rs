//! Strongly-typed IDs with UUID validation for the backend-facing adapters.
//! The resolver itself treats ids as opaque strings; only requests to the server need UUIDs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

fn validate_uuid(s: &str) -> Result<String, String> {
    Uuid::parse_str(s).map_err(|e| format!("Invalid UUID: {}", e))?;
    Ok(s.to_string())
}

/// Wallet ID (UUID), sent as `x-wallet-id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WalletId(String);

/// Contact ID (UUID). Anything else cannot exist on the server.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContactId(String);

macro_rules! id_type {
    ($name:ident) => {
        impl $name {
            pub fn parse(s: impl AsRef<str>) -> Result<Self, String> {
                Self::from_str(s.as_ref())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
        impl FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(validate_uuid(s)?))
            }
        }
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
                ser.serialize_str(&self.0)
            }
        }
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
                let s = String::deserialize(de)?;
                Self::from_str(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
id_type!(WalletId);
id_type!(ContactId);
