//! Store payload encoding
//!
//! Payloads are protobuf `UserApps` messages:
//!
//! ```text
//! message UserApps {
//!     repeated uint32 apps = 1 [packed=true];
//!     optional double lat = 2;
//!     optional double lon = 3;
//! }
//! ```
//!
//! Consumers of the cache decode the same schema, so field tags must not change.

use prost::Message;
use thiserror::Error;

use crate::parser::AppsInstalled;

#[derive(Clone, PartialEq, Message)]
pub struct UserApps {
    #[prost(uint32, repeated, packed = "true", tag = "1")]
    pub apps: Vec<u32>,
    #[prost(double, optional, tag = "2")]
    pub lat: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub lon: Option<f64>,
}

impl From<&AppsInstalled> for UserApps {
    fn from(record: &AppsInstalled) -> Self {
        Self {
            apps: record.apps.clone(),
            lat: Some(record.lat),
            lon: Some(record.lon),
        }
    }
}

#[derive(Debug, Error)]
#[error("Failed to decode UserApps payload: {0}")]
pub struct CodecError(#[from] prost::DecodeError);

/// Key and serialized payload ready for the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRecord {
    pub key: String,
    pub data: Vec<u8>,
}

impl PackedRecord {
    pub fn pack(record: &AppsInstalled) -> Self {
        Self {
            key: record.store_key(),
            data: encode(record),
        }
    }

    /// Lowercase hex of the payload, for log lines
    pub fn data_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

pub fn encode(record: &AppsInstalled) -> Vec<u8> {
    UserApps::from(record).encode_to_vec()
}

pub fn decode(data: &[u8]) -> Result<UserApps, CodecError> {
    Ok(UserApps::decode(data)?)
}
