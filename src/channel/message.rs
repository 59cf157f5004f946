//! Broadcast message types
//!
//! Messages are JSON records. Field presence decides the variant:
//!
//! ```text
//! {"file": "out/traffic0001.png", "cat": 7}   -> Data
//! {"file": "out/traffic0001.png", "cat": "7"} -> InvalidCategory
//! {"publisher": "close"}                      -> Sentinel
//! ```
//!
//! A data record whose `cat` is not an integer still decodes; judging the
//! category is left to the receiver.
//!
//! Decoding happens once at the transport boundary; everything past the
//! subscriber works with [`BroadcastMessage`].

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

const SENTINEL_VALUE: &str = "close";

/// Output category for one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// The classified work item
    pub item: PathBuf,
    /// Category index
    pub category: u32,
}

impl ClassificationResult {
    pub fn new(item: impl Into<PathBuf>, category: u32) -> Self {
        Self {
            item: item.into(),
            category,
        }
    }

    pub fn item(&self) -> &Path {
        &self.item
    }
}

/// A message carried by the broadcast channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastMessage {
    /// One classified item
    ///
    /// The category is kept signed so that out-of-range values coming off the
    /// wire survive decoding and can be rejected by the receiver.
    Data { file: String, category: i64 },
    /// A data record whose category is not an integer
    ///
    /// `raw` holds the category as it appeared on the wire, in JSON form.
    InvalidCategory { file: String, raw: String },
    /// End of stream
    Sentinel,
}

#[derive(Serialize, Deserialize, Default)]
struct WireRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cat: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publisher: Option<String>,
}

impl BroadcastMessage {
    /// Data message for a classification result
    pub fn data(result: &ClassificationResult) -> Self {
        BroadcastMessage::Data {
            file: result.item.to_string_lossy().into_owned(),
            category: i64::from(result.category),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, BroadcastMessage::Sentinel)
    }

    /// Serialize to the JSON wire form
    pub fn encode(&self) -> Bytes {
        let record = match self {
            BroadcastMessage::Data { file, category } => WireRecord {
                file: Some(file.clone()),
                cat: Some(Value::from(*category)),
                publisher: None,
            },
            BroadcastMessage::InvalidCategory { file, raw } => WireRecord {
                file: Some(file.clone()),
                cat: Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))),
                publisher: None,
            },
            BroadcastMessage::Sentinel => WireRecord {
                publisher: Some(SENTINEL_VALUE.to_string()),
                ..Default::default()
            },
        };

        // Serializing strings and JSON values cannot fail
        Bytes::from(serde_json::to_vec(&record).unwrap_or_default())
    }

    /// Parse the JSON wire form
    pub fn decode(payload: &[u8]) -> Result<Self, TransportError> {
        let record: WireRecord = serde_json::from_slice(payload)
            .map_err(|e| TransportError::MalformedMessage(e.to_string()))?;

        if let Some(publisher) = record.publisher {
            return if publisher == SENTINEL_VALUE {
                Ok(BroadcastMessage::Sentinel)
            } else {
                Err(TransportError::MalformedMessage(format!(
                    "unknown publisher control value {:?}",
                    publisher
                )))
            };
        }

        match (record.file, record.cat) {
            (Some(file), Some(cat)) => Ok(match cat.as_i64() {
                Some(category) => BroadcastMessage::Data { file, category },
                None => BroadcastMessage::InvalidCategory {
                    file,
                    raw: cat.to_string(),
                },
            }),
            (Some(_), None) => Err(TransportError::MalformedMessage(
                "data message without \"cat\"".into(),
            )),
            _ => Err(TransportError::MalformedMessage(
                "neither \"file\" nor \"publisher\" present".into(),
            )),
        }
    }
}
