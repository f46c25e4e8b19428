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


//! Connection to the MUD server
//!
//! A [`MudLink`] owns at most one TCP socket to the configured MUD host. The
//! socket itself lives in a spawned I/O task; the link talks to it over a
//! command channel and reports everything that happens through a stream of
//! [`LinkEvent`]s, delivered in the order they occurred.

use crate::config::BridgeSettings;
use crate::telnet::protocol::{build_naws, opening_offer};
use crate::telnet::{TelnetFilter, WindowSize};
use bytes::Bytes;
use mudbridge_common::ServerMessage;
use mudbridge_common::envelope::STATUS_DISCONNECT;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Size of the socket read buffer
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Connection lifecycle reported by a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting { host: String, port: u16 },
    Connected { host: String, port: u16 },
    Disconnect,
}

impl LinkStatus {
    pub fn to_message(&self) -> ServerMessage {
        match self {
            Self::Connecting { host, port } => ServerMessage::connecting(host, *port),
            Self::Connected { host, port } => ServerMessage::connected(host, *port),
            Self::Disconnect => ServerMessage::disconnect(),
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting { host, port } => write!(f, "connecting:{}:{}", host, port),
            Self::Connected { host, port } => write!(f, "connected:{}:{}", host, port),
            Self::Disconnect => write!(f, "{}", STATUS_DISCONNECT),
        }
    }
}

/// Events emitted by a [`MudLink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Application bytes with telnet sequences removed, still legacy encoded
    Data(Bytes),

    /// Lifecycle change
    Status(LinkStatus),

    /// Failure on an established connection, or a rejected request
    Error(String),

    /// The TCP connect itself failed
    ConnectFailed { port: u16, message: String },
}

/// Append-only record of every raw inbound chunk, hex encoded
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chunk exactly as it came off the socket.
    pub fn record(&self, chunk: &[u8]) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hex::encode(chunk));
    }

    /// Copy of the entries, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Requests from the link handle to its I/O task
#[derive(Debug)]
enum LinkCommand {
    Write(Vec<u8>),
    Resize(WindowSize),
}

#[derive(Debug)]
struct GateState {
    open: bool,
    disconnected: bool,
}

/// Event path of one socket's I/O task
///
/// Once shut, nothing the task emits reaches the link's consumer. The
/// `disconnect` claim shares the lock so it is reported once per socket.
#[derive(Debug)]
struct EventGate {
    state: Mutex<GateState>,
    events: mpsc::UnboundedSender<LinkEvent>,
}

impl EventGate {
    fn new(events: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self {
            state: Mutex::new(GateState {
                open: true,
                disconnected: false,
            }),
            events,
        }
    }

    fn emit(&self, event: LinkEvent) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.open {
            let _ = self.events.send(event);
        }
    }

    /// Report the socket closing, unless it already was.
    fn disconnect(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.disconnected {
            state.disconnected = true;
            if state.open {
                let _ = self.events.send(LinkEvent::Status(LinkStatus::Disconnect));
            }
        }
    }

    /// Stop forwarding events. Returns true if the socket had not yet been
    /// reported as disconnected.
    fn shut(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open = false;
        !std::mem::replace(&mut state.disconnected, true)
    }
}

/// Handle on the I/O task of one socket
struct Connection {
    port: u16,
    commands: mpsc::UnboundedSender<LinkCommand>,
    connected: watch::Receiver<Option<u16>>,
    gate: Arc<EventGate>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Connection {
    fn is_connected(&self) -> bool {
        self.connected.borrow().is_some()
    }
}

/// One client's connection to the MUD server
pub struct MudLink {
    settings: Arc<BridgeSettings>,
    events: mpsc::UnboundedSender<LinkEvent>,
    session_log: SessionLog,
    window: watch::Sender<WindowSize>,
    connection: Option<Connection>,
    closed: bool,
}

impl MudLink {
    /// Create an idle link that reports to `events`.
    pub fn new(settings: Arc<BridgeSettings>, events: mpsc::UnboundedSender<LinkEvent>) -> Self {
        let (window, _) = watch::channel(settings.window);
        Self {
            settings,
            events,
            session_log: SessionLog::new(),
            window,
            connection: None,
            closed: false,
        }
    }

    /// Open a connection to `port`, replacing any existing socket.
    ///
    /// Must be called from within a tokio runtime. Failures are reported as
    /// events; the link stays usable after a failed connect.
    pub fn connect(&mut self, port: u16) {
        if self.closed {
            self.emit(LinkEvent::Error("Connection is closed".to_string()));
            return;
        }

        if !self.settings.allows_port(port) {
            tracing::warn!("Rejected connect to disallowed port {}", port);
            self.emit(LinkEvent::Error(format!(
                "Invalid port: {}. Must be one of: {}",
                port,
                self.settings.port_list()
            )));
            return;
        }

        self.teardown();

        let host = self.settings.host.clone();
        self.emit(LinkEvent::Status(LinkStatus::Connecting {
            host: host.clone(),
            port,
        }));

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (connected_tx, connected_rx) = watch::channel(None);
        let gate = Arc::new(EventGate::new(self.events.clone()));
        let cancel = CancellationToken::new();

        let io = LinkTask {
            host,
            port,
            window: self.window.subscribe(),
            gate: Arc::clone(&gate),
            commands: commands_rx,
            connected: connected_tx,
            cancel: cancel.clone(),
            session_log: self.session_log.clone(),
        };

        self.connection = Some(Connection {
            port,
            commands: commands_tx,
            connected: connected_rx,
            gate,
            cancel,
            task: tokio::spawn(io.run()),
        });
    }

    /// Write bytes to the MUD verbatim. No-op unless connected.
    pub fn send(&self, bytes: Vec<u8>) {
        if let Some(connection) = self.live_connection() {
            let _ = connection.commands.send(LinkCommand::Write(bytes));
        }
    }

    /// Record the client's window size and report it through NAWS if
    /// connected. The latest size answers the server's first `DO NAWS`.
    pub fn send_resize(&self, cols: u16, rows: u16) {
        let window = WindowSize::new(cols, rows);
        self.set_window_size(window);
        if let Some(connection) = self.live_connection() {
            let _ = connection.commands.send(LinkCommand::Resize(window));
        }
    }

    /// Record the window size without writing anything to the socket.
    pub fn set_window_size(&self, window: WindowSize) {
        self.window.send_replace(window);
    }

    pub fn window_size(&self) -> WindowSize {
        *self.window.borrow()
    }

    /// Permanently close the link, dropping any socket without a graceful
    /// shutdown. Idempotent; no `disconnect` status follows.
    pub fn close(&mut self) {
        self.closed = true;
        self.teardown();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_connected(&self) -> bool {
        self.live_connection().is_some()
    }

    /// Port of the established connection, if any.
    pub fn current_port(&self) -> Option<u16> {
        self.connection
            .as_ref()
            .and_then(|connection| *connection.connected.borrow())
    }

    /// Port of the most recent connect attempt, established or not.
    pub fn requested_port(&self) -> Option<u16> {
        self.connection.as_ref().map(|connection| connection.port)
    }

    pub fn session_log(&self) -> &SessionLog {
        &self.session_log
    }

    fn live_connection(&self) -> Option<&Connection> {
        self.connection
            .as_ref()
            .filter(|connection| connection.is_connected())
    }

    /// Destroy the current socket, if any.
    fn teardown(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let first = connection.gate.shut();
        connection.cancel.cancel();
        connection.task.abort();

        if first && !self.closed {
            self.emit(LinkEvent::Status(LinkStatus::Disconnect));
        }
        tracing::debug!("Tore down connection to port {}", connection.port);
    }

    fn emit(&self, event: LinkEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for MudLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// State owned by the I/O task of one socket
struct LinkTask {
    host: String,
    port: u16,
    window: watch::Receiver<WindowSize>,
    gate: Arc<EventGate>,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
    connected: watch::Sender<Option<u16>>,
    cancel: CancellationToken,
    session_log: SessionLog,
}

impl LinkTask {
    async fn run(mut self) {
        let stream = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = TcpStream::connect((self.host.as_str(), self.port)) => result,
        };

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Failed to connect to {}:{}: {}", self.host, self.port, e);
                self.emit(LinkEvent::ConnectFailed {
                    port: self.port,
                    message: format!("Failed to connect to port {}: {}", self.port, e),
                });
                self.finish();
                return;
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Unable to set TCP_NODELAY: {}", e);
        }

        tracing::info!("Connected to {}:{}", self.host, self.port);
        let (mut reader, mut writer) = stream.into_split();
        self.connected.send_replace(Some(self.port));
        self.emit(LinkEvent::Status(LinkStatus::Connected {
            host: self.host.clone(),
            port: self.port,
        }));

        let mut filter = TelnetFilter::new(*self.window.borrow());
        if self.write(&mut writer, &opening_offer()).await {
            let mut buffer = vec![0u8; READ_BUFFER_SIZE];
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    read = reader.read(&mut buffer) => match read {
                        Ok(0) => {
                            tracing::info!("MUD closed connection on port {}", self.port);
                            break;
                        }
                        Ok(n) => {
                            let chunk = &buffer[..n];
                            tracing::debug!("Received {} bytes from port {}", n, self.port);
                            self.session_log.record(chunk);

                            filter.set_window_size(*self.window.borrow());
                            let filtered = filter.process(chunk);
                            if !filtered.replies.is_empty()
                                && !self.write(&mut writer, &filtered.replies).await
                            {
                                break;
                            }
                            if !filtered.data.is_empty() {
                                self.emit(LinkEvent::Data(filtered.data.freeze()));
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Read error on port {}: {}", self.port, e);
                            self.emit(LinkEvent::Error(e.to_string()));
                            break;
                        }
                    },
                    command = self.commands.recv() => match command {
                        Some(LinkCommand::Write(bytes)) => {
                            if !self.write(&mut writer, &bytes).await {
                                break;
                            }
                        }
                        Some(LinkCommand::Resize(window)) => {
                            filter.set_window_size(window);
                            if !self.write(&mut writer, &build_naws(window)).await {
                                break;
                            }
                        }
                        None => return,
                    },
                }
            }
        }

        self.finish();
    }

    /// Write to the socket, reporting failures. Returns false when the
    /// connection is no longer usable.
    async fn write(&self, writer: &mut OwnedWriteHalf, bytes: &[u8]) -> bool {
        match writer.write_all(bytes).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Write error on port {}: {}", self.port, e);
                self.emit(LinkEvent::Error(e.to_string()));
                false
            }
        }
    }

    /// The socket is gone; report it unless the handle already did.
    fn finish(&self) {
        self.connected.send_replace(None);
        self.gate.disconnect();
    }

    fn emit(&self, event: LinkEvent) {
        self.gate.emit(event);
    }
}
