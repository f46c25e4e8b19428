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


//! MudBridge Gateway Library
//!
//! This library bridges WebSocket and in-process clients to a legacy Telnet
//! MUD server, including telnet negotiation, the MUD connection lifecycle,
//! legacy character encoding and the per-client session protocol.

pub mod config;
pub mod context;
pub mod encoding;
pub mod link;
pub mod server;
pub mod session;
pub mod telnet;
pub mod transport;

// Re-export commonly used types
pub use config::BridgeSettings;
pub use context::ServerContext;
pub use encoding::EncodingBridge;
pub use link::{LinkEvent, LinkStatus, MudLink, SessionLog};
pub use session::{ProxySession, SessionState};
pub use telnet::TelnetFilter;
