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


//! Proxy session
//!
//! One [`ProxySession`] serves one client transport. It decodes the client's
//! control envelopes, owns at most one [`MudLink`] at a time and forwards the
//! link's events back to the client. Switching ports destroys the old link
//! together with its event receiver before the new link is created, so late
//! events from an abandoned connection never reach the client.

use crate::context::ServerContext;
use crate::encoding::LegacyDecoder;
use crate::link::{LinkEvent, LinkStatus, MudLink};
use crate::telnet::WindowSize;
use crate::transport::{ClientFrame, ClientTransport, TransportError};
use mudbridge_common::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Error text sent for envelopes that cannot be decoded
pub const BAD_MESSAGE: &str = "bad message";

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No live MUD connection
    Idle,

    /// TCP connect in progress
    Connecting,

    /// Connected to the MUD
    Connected,

    /// Client transport closed; terminal
    Closed,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

/// The current link with its event receiver and streaming decoder
struct ActiveLink {
    link: MudLink,
    events: mpsc::UnboundedReceiver<LinkEvent>,
    decoder: LegacyDecoder,
}

/// Per-client bridge between a transport and the MUD
pub struct ProxySession {
    session_id: Uuid,
    context: ServerContext,
    state: SessionState,
    active: Option<ActiveLink>,
    window: WindowSize,
}

impl ProxySession {
    pub fn new(context: ServerContext) -> Self {
        let window = context.settings().window;
        Self {
            session_id: Uuid::new_v4(),
            context,
            state: SessionState::Idle,
            active: None,
            window,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Window size most recently reported by the client, or the configured default.
    pub fn window_size(&self) -> WindowSize {
        self.window
    }

    /// Serve `transport` until the client goes away.
    pub async fn run<T: ClientTransport>(mut self, mut transport: T, client_addr: String) {
        self.context
            .register_session(self.session_id, client_addr)
            .await;
        tracing::info!(
            "Session {} started on {} transport",
            self.session_id,
            transport.transport_name()
        );

        loop {
            let result = tokio::select! {
                frame = transport.receive() => match frame {
                    Ok(ClientFrame::Text(text)) => self.handle_text(&text, &mut transport).await,
                    Ok(ClientFrame::Binary(data)) => {
                        tracing::debug!(
                            "Ignoring {} byte binary frame from session {}",
                            data.len(),
                            self.session_id
                        );
                        Ok(())
                    }
                    Ok(ClientFrame::Closed) => {
                        tracing::info!("Session {} client disconnected", self.session_id);
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Transport error for session {}: {}", self.session_id, e);
                        break;
                    }
                },
                Some(event) = next_link_event(&mut self.active) => {
                    self.handle_link_event(event, &mut transport).await
                }
            };

            if let Err(e) = result {
                tracing::error!(
                    "Failed to reach client of session {}: {}",
                    self.session_id,
                    e
                );
                break;
            }
        }

        self.close();
        let _ = transport.close().await;
        self.context.unregister_session(self.session_id).await;
        tracing::info!("Session {} closed", self.session_id);
    }

    /// Decode and dispatch one text frame.
    pub async fn handle_text<T: ClientTransport>(
        &mut self,
        text: &str,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        match ClientMessage::decode(text) {
            Ok(message) => self.handle_message(message, transport).await,
            Err(e) => {
                tracing::warn!("Bad message from session {}: {}", self.session_id, e);
                transport
                    .send_message(&ServerMessage::error(BAD_MESSAGE))
                    .await
            }
        }
    }

    /// Apply one client request.
    pub async fn handle_message<T: ClientTransport>(
        &mut self,
        message: ClientMessage,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        match message {
            ClientMessage::Connect { port } | ClientMessage::SwitchPort { port } => {
                self.open_link(port, transport).await
            }
            ClientMessage::Input { data } => {
                match &self.active {
                    Some(active) if active.link.is_connected() => {
                        let encoded = self.context.settings().encoding.encode(&data);
                        active.link.send(encoded);
                    }
                    _ => tracing::debug!(
                        "Dropping input for session {}: not connected",
                        self.session_id
                    ),
                }
                Ok(())
            }
            ClientMessage::Resize { cols, rows } => {
                if cols == 0 || rows == 0 {
                    tracing::debug!(
                        "Dropping resize {}x{} for session {}",
                        cols,
                        rows,
                        self.session_id
                    );
                    return Ok(());
                }
                self.window = WindowSize::new(cols, rows);
                if let Some(active) = &self.active {
                    active.link.send_resize(cols, rows);
                }
                Ok(())
            }
            ClientMessage::SaveLog => {
                let entries = self
                    .active
                    .as_ref()
                    .map(|active| active.link.session_log().snapshot())
                    .unwrap_or_default();
                transport.send_message(&ServerMessage::log(entries)).await
            }
            ClientMessage::Unknown => {
                tracing::debug!("Ignoring unknown message from session {}", self.session_id);
                Ok(())
            }
        }
    }

    /// Replace the current link with a new one connecting to `port`.
    async fn open_link<T: ClientTransport>(
        &mut self,
        port: u16,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        if self.state.is_closed() {
            return Ok(());
        }

        let settings = self.context.settings().clone();
        if !settings.allows_port(port) {
            tracing::warn!(
                "Session {} asked for disallowed port {}",
                self.session_id,
                port
            );
            return transport
                .send_message(&ServerMessage::error(format!(
                    "Invalid port: {}. Must be one of: {}",
                    port,
                    settings.port_list()
                )))
                .await;
        }

        self.detach_link();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let decoder = settings.encoding.decoder();
        let mut link = MudLink::new(settings, events_tx);
        link.set_window_size(self.window);
        link.connect(port);

        self.active = Some(ActiveLink {
            link,
            events: events_rx,
            decoder,
        });
        self.state = SessionState::Connecting;
        tracing::info!("Session {} connecting to port {}", self.session_id, port);
        Ok(())
    }

    /// Forward one event from the current link.
    async fn handle_link_event<T: ClientTransport>(
        &mut self,
        event: LinkEvent,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        match event {
            LinkEvent::Data(bytes) => {
                let Some(active) = self.active.as_mut() else {
                    return Ok(());
                };
                let text = active.decoder.decode(&bytes);
                if text.is_empty() {
                    return Ok(());
                }
                transport.send_data(&text).await
            }
            LinkEvent::Status(status) => {
                tracing::debug!("Session {} status {}", self.session_id, status);
                match &status {
                    LinkStatus::Connecting { .. } => self.state = SessionState::Connecting,
                    LinkStatus::Connected { port, .. } => {
                        self.state = SessionState::Connected;
                        self.context.set_mud_port(self.session_id, Some(*port)).await;
                    }
                    LinkStatus::Disconnect => {
                        self.state = SessionState::Idle;
                        self.context.set_mud_port(self.session_id, None).await;
                    }
                }
                transport.send_message(&status.to_message()).await
            }
            LinkEvent::Error(message) => transport.send_message(&ServerMessage::error(message)).await,
            LinkEvent::ConnectFailed { port, message } => {
                self.state = SessionState::Idle;
                transport.send_message(&ServerMessage::error(message)).await?;

                let settings = self.context.settings().clone();
                if settings.auto_fallback {
                    if let Some(next) = settings.next_port(port) {
                        tracing::info!(
                            "Session {} falling back from port {} to {}",
                            self.session_id,
                            port,
                            next
                        );
                        return self.open_link(next, transport).await;
                    }
                }
                Ok(())
            }
        }
    }

    /// Destroy the current link and stop listening to it.
    fn detach_link(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.link.close();
            active.events.close();
        }
    }

    /// Close the session permanently.
    pub fn close(&mut self) {
        self.detach_link();
        self.state = SessionState::Closed;
    }
}

/// Wait for the next event of the current link; pends forever without one.
async fn next_link_event(active: &mut Option<ActiveLink>) -> Option<LinkEvent> {
    match active {
        Some(active) => active.events.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeSettings;
    use crate::transport::{ChannelFrame, channel_transport};
    use tracing_test::traced_test;

    fn session() -> ProxySession {
        ProxySession::new(ServerContext::new(BridgeSettings::new(
            "127.0.0.1",
            vec![5002, 5003],
        )))
    }

    #[tokio::test]
    async fn test_new_session_is_idle() {
        let session = session();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.state().is_connected());
        assert!(!session.state().is_closed());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_bad_message_reply() {
        let mut session = session();
        let (mut transport, mut client) = channel_transport();

        session.handle_text("not json", &mut transport).await.unwrap();
        assert_eq!(
            client.recv().await,
            Some(ChannelFrame::Message(ServerMessage::error(BAD_MESSAGE)))
        );
        assert!(logs_contain("Bad message from session"));
    }

    #[test]
    fn test_no_link_never_yields_events() {
        let mut active = None;
        let mut next = tokio_test::task::spawn(next_link_event(&mut active));
        tokio_test::assert_pending!(next.poll());
    }

    #[tokio::test]
    async fn test_rejected_port_stays_idle() {
        let mut session = session();
        let (mut transport, mut client) = channel_transport();

        session
            .handle_message(ClientMessage::Connect { port: 23 }, &mut transport)
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            client.recv_message().await,
            Some(ServerMessage::error(
                "Invalid port: 23. Must be one of: 5002, 5003"
            ))
        );
    }

    #[tokio::test]
    async fn test_closed_session_ignores_connect() {
        let mut session = session();
        let (mut transport, _client) = channel_transport();

        session.close();
        session
            .handle_message(ClientMessage::Connect { port: 5002 }, &mut transport)
            .await
            .unwrap();
        assert!(session.state().is_closed());
        assert!(session.active.is_none());
    }

    #[tokio::test]
    async fn test_resize_is_remembered_for_next_link() {
        let mut session = session();
        let (mut transport, _client) = channel_transport();
        assert_eq!(session.window_size(), WindowSize::new(80, 24));

        session
            .handle_message(ClientMessage::Resize { cols: 132, rows: 43 }, &mut transport)
            .await
            .unwrap();
        session
            .handle_message(ClientMessage::Resize { cols: 0, rows: 10 }, &mut transport)
            .await
            .unwrap();
        assert_eq!(session.window_size(), WindowSize::new(132, 43));

        session
            .handle_message(ClientMessage::Connect { port: 5002 }, &mut transport)
            .await
            .unwrap();
        let link = &session.active.as_ref().unwrap().link;
        assert_eq!(link.window_size(), WindowSize::new(132, 43));
        session.close();
    }

    #[tokio::test]
    async fn test_connect_moves_to_connecting() {
        let mut session = session();
        let (mut transport, _client) = channel_transport();

        session
            .handle_message(ClientMessage::SwitchPort { port: 5003 }, &mut transport)
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(
            session
                .active
                .as_ref()
                .and_then(|active| active.link.requested_port()),
            Some(5003)
        );
        session.close();
    }
}
