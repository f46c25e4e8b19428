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


//! WebSocket client transport

use super::{ClientFrame, ClientTransport, TransportError};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use mudbridge_common::ServerMessage;

/// Control messages go out as JSON text frames and MUD output as binary frames
/// holding UTF-8 text, so clients can tell them apart by frame type alone.
pub struct WebSocketTransport {
    socket: WebSocket,
    alive: bool,
}

impl WebSocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            alive: true,
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), TransportError> {
        self.socket.send(message).await.map_err(|e| {
            self.alive = false;
            TransportError::WebSocket(format!("send error: {}", e))
        })
    }
}

#[async_trait]
impl ClientTransport for WebSocketTransport {
    fn transport_name(&self) -> &str {
        "websocket"
    }

    async fn send_message(&mut self, message: &ServerMessage) -> Result<(), TransportError> {
        let encoded = message.encode()?;
        self.send(Message::Text(encoded.into())).await
    }

    async fn send_data(&mut self, text: &str) -> Result<(), TransportError> {
        self.send(Message::Binary(text.as_bytes().to_vec().into()))
            .await
    }

    async fn receive(&mut self) -> Result<ClientFrame, TransportError> {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return Ok(ClientFrame::Text(text.as_str().to_string())),
                Some(Ok(Message::Binary(data))) => return Ok(ClientFrame::Binary(data.to_vec())),
                // Pings are answered by axum
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    self.alive = false;
                    return Ok(ClientFrame::Closed);
                }
                Some(Err(e)) => {
                    self.alive = false;
                    return Err(TransportError::WebSocket(e.to_string()));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.alive {
            return Ok(());
        }
        self.alive = false;
        self.socket
            .send(Message::Close(None))
            .await
            .map_err(|e| TransportError::WebSocket(format!("close error: {}", e)))
    }
}
