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


//! Client-facing WebSocket listener
//!
//! Accepts WebSocket upgrades and runs one [`ProxySession`] per connection.

use crate::context::ServerContext;
use crate::session::ProxySession;
use crate::transport::WebSocketTransport;
use axum::Router;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Largest control message accepted from a client
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

pub fn router(context: &ServerContext, path: &str) -> Router {
    Router::new()
        .route(path, get(handler))
        .with_state(context.clone())
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    context: &ServerContext,
    path: &str,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        router(context, path).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

/// WebSocket upgrade handler
pub async fn handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(context): State<ServerContext>,
) -> Response {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, addr, context))
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, context: ServerContext) {
    tracing::info!("WebSocket client connected from {}", addr);
    let session = ProxySession::new(context);
    session
        .run(WebSocketTransport::new(socket), addr.to_string())
        .await;
}
