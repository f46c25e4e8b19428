//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Client control envelope
//!
//! Control messages travel as JSON objects with a short `t` field naming the
//! message and the payload fields inline:
//! ```json
//! { "t": "switchPort", "port": 5002 }
//! { "t": "status", "data": "connected:dangunland.iptime.org:5002" }
//! ```
//!
//! Live MUD output is never wrapped in an envelope; transports deliver it as a
//! distinct data frame.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Tag key used on the wire.
pub const TAG: &str = "t";

/// Tag key accepted from clients that spell the discriminator out in full.
pub const LONG_TAG: &str = "type";

/// Status string reported when the MUD socket closes.
pub const STATUS_DISCONNECT: &str = "disconnect";

/// Errors raised while decoding or encoding a control envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload was not valid JSON or did not match the named message.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload was valid JSON but not an object.
    #[error("Envelope is not a JSON object")]
    NotAnObject,

    /// The object carried neither `t` nor `type`.
    #[error("Envelope has no message tag")]
    MissingTag,
}

/// Requests sent by a client to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Open a connection to the MUD on the given port.
    Connect { port: u16 },

    /// Replace the current connection with one on the given port.
    SwitchPort { port: u16 },

    /// Player input, sent to the MUD after legacy encoding.
    Input { data: String },

    /// Terminal dimensions, forwarded as a NAWS report.
    Resize { cols: u16, rows: u16 },

    /// Ask for a snapshot of the session log.
    SaveLog,

    /// Any tag the bridge does not recognise.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Decode a client control message from its JSON text.
    ///
    /// Unrecognised tags decode to [`ClientMessage::Unknown`]; structurally
    /// broken messages are errors.
    pub fn decode(text: &str) -> Result<Self, EnvelopeError> {
        let mut value: JsonValue = serde_json::from_str(text)?;
        let object = value.as_object_mut().ok_or(EnvelopeError::NotAnObject)?;

        if !object.contains_key(TAG) {
            let tag = object.remove(LONG_TAG).ok_or(EnvelopeError::MissingTag)?;
            object.insert(TAG.to_string(), tag);
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Encode the message as JSON text.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Notifications sent by the bridge to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Connection lifecycle: `connecting:<host>:<port>`, `connected:<host>:<port>`
    /// or `disconnect`.
    Status { data: String },

    /// Recoverable failure description.
    Error { data: String },

    /// Hex-encoded inbound chunks, oldest first.
    Log { data: Vec<String> },
}

impl ServerMessage {
    pub fn status(data: impl Into<String>) -> Self {
        Self::Status { data: data.into() }
    }

    pub fn error(data: impl Into<String>) -> Self {
        Self::Error { data: data.into() }
    }

    pub fn log(entries: Vec<String>) -> Self {
        Self::Log { data: entries }
    }

    /// `connecting:<host>:<port>`
    pub fn connecting(host: &str, port: u16) -> Self {
        Self::status(format!("connecting:{}:{}", host, port))
    }

    /// `connected:<host>:<port>`
    pub fn connected(host: &str, port: u16) -> Self {
        Self::status(format!("connected:{}:{}", host, port))
    }

    pub fn disconnect() -> Self {
        Self::status(STATUS_DISCONNECT)
    }

    /// Encode the message as JSON text.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a bridge notification from its JSON text.
    pub fn decode(text: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(text)?)
    }
}
