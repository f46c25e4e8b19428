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


use anyhow::Context;
use clap::Parser;
use mudbridge_gateway::config::{Arguments, BridgeSettings, Configuration};
use mudbridge_gateway::{ServerContext, server};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration from a file with environment variable substitution
    let config = Configuration::load(&arguments.config_file)
        .with_context(|| format!("Unable to load configuration file {}", arguments.config_file))?;
    debug!("Configuration loaded: {:?}", config);

    let settings = BridgeSettings::from_config(&config.bridge)
        .context("Invalid bridge configuration")?;
    info!(
        "Starting MudBridge Gateway targeting {} ports [{}] ({})",
        settings.host,
        settings.port_list(),
        settings.encoding.name()
    );

    let context = ServerContext::new(settings);

    // Get websocket config or use defaults
    let websocket_config = config.websocket.unwrap_or_default();
    let listener = tokio::net::TcpListener::bind(websocket_config.addr.to_addr())
        .await
        .context("Unable to bind to the websocket port")?;

    info!(
        "WebSocket Server listening on {} ({}:{}) at {}",
        websocket_config.addr,
        websocket_config.addr.to_ip(),
        websocket_config.addr.to_port(),
        websocket_config.path
    );

    server::serve(listener, &context, &websocket_config.path, shutdown_signal())
        .await
        .context("WebSocket server failed")?;

    info!("MudBridge Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
