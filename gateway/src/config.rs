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


use crate::encoding::{EncodingBridge, EncodingError};
use crate::telnet::WindowSize;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "gateway/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "gateway/.env"
    )]
    pub env_file: Option<String>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Open(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("At least one MUD port must be configured")]
    NoPorts,

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub bridge: BridgeConfig,

    pub websocket: Option<WebsocketConfig>,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        tracing::debug!("Loading configuration from file: {}", path);
        let file = std::fs::File::open(path)?;
        let conf = serde_yaml::from_reader(file)?;
        Ok(conf)
    }
}

/// Target MUD and protocol settings
#[derive(Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub host: EnvField<MudHost>,

    /// Allowed destination ports, in fallback order
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,

    #[serde(default)]
    pub encoding: EnvField<EncodingLabel>,

    /// Retry the next allowed port when a connect fails (default: false)
    #[serde(default)]
    pub auto_fallback: bool,

    /// Window size reported before the client sends its own
    #[serde(default)]
    pub window: WindowConfig,
}

fn default_ports() -> Vec<u16> {
    vec![5002, 5003]
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            host: Default::default(),
            ports: default_ports(),
            encoding: Default::default(),
            auto_fallback: false,
            window: WindowConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MudHost(String);

impl MudHost {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MudHost {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Default for MudHost {
    fn default() -> Self {
        Self(String::from("dangunland.iptime.org"))
    }
}

impl std::fmt::Display for MudHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EncodingLabel(String);

impl EncodingLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EncodingLabel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Default for EncodingLabel {
    fn default() -> Self {
        Self(String::from("euc-kr"))
    }
}

impl std::fmt::Display for EncodingLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_cols")]
    pub cols: u16,
    #[serde(default = "default_rows")]
    pub rows: u16,
}

fn default_cols() -> u16 {
    80
}

fn default_rows() -> u16 {
    24
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            cols: default_cols(),
            rows: default_rows(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebsocketConfig {
    #[serde(default)]
    pub addr: EnvField<WebsocketBinding>,

    /// Upgrade path for client connections
    #[serde(default = "default_websocket_path")]
    pub path: String,
}

fn default_websocket_path() -> String {
    String::from("/ws")
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            addr: Default::default(),
            path: default_websocket_path(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebsocketBinding(SocketAddr);

impl WebsocketBinding {
    pub fn to_addr(&self) -> SocketAddr {
        self.0
    }
    pub fn to_ip(&self) -> IpAddr {
        self.0.ip()
    }
    pub fn to_port(&self) -> u16 {
        self.0.port()
    }
}

impl FromStr for WebsocketBinding {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(SocketAddr::from_str(s)?))
    }
}

impl Default for WebsocketBinding {
    fn default() -> Self {
        Self(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::new(0, 0, 0, 0),
            8080,
        )))
    }
}

impl std::fmt::Display for WebsocketBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved, process-wide bridge settings shared read-only by every session
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Destination host
    pub host: String,

    /// Allowed destination ports, in fallback order
    pub ports: Vec<u16>,

    /// Legacy encoding spoken by the MUD
    pub encoding: EncodingBridge,

    /// Retry the next allowed port after a connect failure
    pub auto_fallback: bool,

    /// Window size reported before the client sends its own
    pub window: WindowSize,
}

impl BridgeSettings {
    /// Settings for `host` and `ports` with EUC-KR, no fallback and an 80x24 window.
    pub fn new(host: impl Into<String>, ports: Vec<u16>) -> Self {
        Self {
            host: host.into(),
            ports,
            encoding: EncodingBridge::default(),
            auto_fallback: false,
            window: WindowSize::default(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self, ConfigError> {
        if config.ports.is_empty() {
            return Err(ConfigError::NoPorts);
        }
        Ok(Self {
            host: config.host.as_str().to_string(),
            ports: config.ports.clone(),
            encoding: EncodingBridge::for_label(config.encoding.as_str())?,
            auto_fallback: config.auto_fallback,
            window: WindowSize::new(config.window.cols, config.window.rows),
        })
    }

    pub fn with_auto_fallback(mut self, auto_fallback: bool) -> Self {
        self.auto_fallback = auto_fallback;
        self
    }

    pub fn allows_port(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }

    /// The allowed port after `port`, if any.
    pub fn next_port(&self, port: u16) -> Option<u16> {
        let index = self.ports.iter().position(|&p| p == port)?;
        self.ports.get(index + 1).copied()
    }

    /// Allowed ports as `5002, 5003`.
    pub fn port_list(&self) -> String {
        self.ports
            .iter()
            .map(|port| port.to_string())
            .collect::<Vec<String>>()
            .join(", ")
    }
}
