//! Cross-frame message protocol
//!
//! Inbound: `{ "type": "APPLY_VARIANT", "variant": { "elements": [...] } }`
//! Outbound on failure: `{ "type": "ERROR", "message": "..." }`

use crate::error::{Error, Result};
use crate::types::VariantDescriptor;
use serde::{Deserialize, Serialize};

pub const APPLY_VARIANT: &str = "APPLY_VARIANT";
pub const ERROR: &str = "ERROR";

/// Messages exchanged between the host page and a preview frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FrameMessage {
    #[serde(rename = "APPLY_VARIANT")]
    ApplyVariant { variant: VariantDescriptor },
    #[serde(rename = "ERROR")]
    Error { message: String },
}

impl FrameMessage {
    pub fn apply(variant: VariantDescriptor) -> Self {
        FrameMessage::ApplyVariant { variant }
    }

    pub fn error(message: impl Into<String>) -> Self {
        FrameMessage::Error {
            message: message.into(),
        }
    }

    /// Decode a message received on the frame's message channel.
    ///
    /// Anything that is not a protocol message (other libraries share the
    /// channel) yields `Ok(None)`. A protocol message with a broken payload
    /// is an error.
    pub fn decode(data: &serde_json::Value) -> Result<Option<Self>> {
        let kind = match data.get("type").and_then(|t| t.as_str()) {
            Some(kind) => kind,
            None => return Ok(None),
        };
        if kind != APPLY_VARIANT && kind != ERROR {
            return Ok(None);
        }
        serde_json::from_value(data.clone())
            .map(Some)
            .map_err(|e| Error::MalformedMessage(format!("{}: {}", kind, e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Destination for messages posted back to the parent context.
pub trait MessageSink {
    fn post(&mut self, message: FrameMessage);
}

impl MessageSink for Vec<FrameMessage> {
    fn post(&mut self, message: FrameMessage) {
        self.push(message);
    }
}
