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


//! In-process client transport
//!
//! Desktop shells run the bridge in the same process as their UI and exchange
//! envelopes over channels instead of a socket. [`channel_transport`] returns
//! the bridge side and the client side of one such connection.

use super::{ClientFrame, ClientTransport, TransportError};
use async_trait::async_trait;
use mudbridge_common::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;

/// Frames delivered to an in-process client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFrame {
    /// Control message
    Message(ServerMessage),
    /// Decoded MUD output
    Data(String),
}

/// Bridge side of an in-process connection
pub struct ChannelTransport {
    inbound: mpsc::UnboundedReceiver<ClientFrame>,
    outbound: mpsc::UnboundedSender<ChannelFrame>,
}

/// Client side of an in-process connection
pub struct ChannelClient {
    outbound: Option<mpsc::UnboundedSender<ClientFrame>>,
    inbound: mpsc::UnboundedReceiver<ChannelFrame>,
}

/// Create a connected transport and client pair.
pub fn channel_transport() -> (ChannelTransport, ChannelClient) {
    let (to_bridge, from_client) = mpsc::unbounded_channel();
    let (to_client, from_bridge) = mpsc::unbounded_channel();
    (
        ChannelTransport {
            inbound: from_client,
            outbound: to_client,
        },
        ChannelClient {
            outbound: Some(to_bridge),
            inbound: from_bridge,
        },
    )
}

#[async_trait]
impl ClientTransport for ChannelTransport {
    fn transport_name(&self) -> &str {
        "channel"
    }

    async fn send_message(&mut self, message: &ServerMessage) -> Result<(), TransportError> {
        self.outbound
            .send(ChannelFrame::Message(message.clone()))
            .map_err(|_| TransportError::Closed)
    }

    async fn send_data(&mut self, text: &str) -> Result<(), TransportError> {
        self.outbound
            .send(ChannelFrame::Data(text.to_string()))
            .map_err(|_| TransportError::Closed)
    }

    async fn receive(&mut self) -> Result<ClientFrame, TransportError> {
        Ok(self.inbound.recv().await.unwrap_or(ClientFrame::Closed))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inbound.close();
        Ok(())
    }
}

impl ChannelClient {
    /// Send a control message to the bridge.
    pub fn send(&self, message: &ClientMessage) -> Result<(), TransportError> {
        let encoded = message.encode()?;
        self.send_raw(encoded)
    }

    /// Send an arbitrary text frame, well formed or not.
    pub fn send_raw(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send_frame(ClientFrame::Text(text.into()))
    }

    pub fn send_frame(&self, frame: ClientFrame) -> Result<(), TransportError> {
        self.outbound
            .as_ref()
            .ok_or(TransportError::Closed)?
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    /// Next frame from the bridge, or `None` once the bridge hung up.
    pub async fn recv(&mut self) -> Option<ChannelFrame> {
        self.inbound.recv().await
    }

    /// Next control message, skipping data frames.
    pub async fn recv_message(&mut self) -> Option<ServerMessage> {
        loop {
            match self.recv().await? {
                ChannelFrame::Message(message) => return Some(message),
                ChannelFrame::Data(_) => continue,
            }
        }
    }

    /// Hang up, as a closing browser tab would.
    pub fn close(&mut self) {
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.send(ClientFrame::Closed);
        }
    }
}
