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


//! Client transport layer
//!
//! A [`ClientTransport`] carries the control envelope and live MUD output
//! between a [`ProxySession`](crate::session::ProxySession) and one client,
//! whatever the underlying channel is (a browser WebSocket or an in-process
//! IPC channel for desktop shells).

use async_trait::async_trait;
use mudbridge_common::{EnvelopeError, ServerMessage};
use thiserror::Error;

pub mod channel;
pub mod websocket;

pub use self::channel::{ChannelClient, ChannelFrame, ChannelTransport, channel_transport};
pub use self::websocket::WebSocketTransport;

/// Frames received from a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// A text frame, expected to hold a JSON control envelope
    Text(String),

    /// A binary frame; the bridge does not accept binary input
    Binary(Vec<u8>),

    /// The client went away
    Closed,
}

/// Client transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Transport closed")]
    Closed,

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// One client connection as seen by a proxy session
#[async_trait]
pub trait ClientTransport: Send {
    /// Short transport name for logging
    fn transport_name(&self) -> &str;

    /// Send a control message
    async fn send_message(&mut self, message: &ServerMessage) -> Result<(), TransportError>;

    /// Send decoded MUD output as a data frame
    async fn send_data(&mut self, text: &str) -> Result<(), TransportError>;

    /// Receive the next frame. Must be cancel safe.
    async fn receive(&mut self) -> Result<ClientFrame, TransportError>;

    /// Close the transport
    async fn close(&mut self) -> Result<(), TransportError>;
}
