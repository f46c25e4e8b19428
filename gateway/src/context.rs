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


use crate::config::BridgeSettings;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// What the gateway knows about a live proxy session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Client address as reported by the transport
    pub client_addr: String,

    /// Session creation timestamp
    pub created_at: DateTime<Utc>,

    /// MUD port of the established connection, if any
    pub mud_port: Option<u16>,
}

/// Server context containing shared resources
#[derive(Clone)]
pub struct ServerContext {
    /// Read-only bridge settings
    settings: Arc<BridgeSettings>,

    /// Live sessions by id
    sessions: Arc<RwLock<HashMap<Uuid, SessionInfo>>>,
}

impl ServerContext {
    /// Create a new server context
    pub fn new(settings: BridgeSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the bridge settings
    pub fn settings(&self) -> &Arc<BridgeSettings> {
        &self.settings
    }

    /// Register a new session
    pub async fn register_session(&self, session_id: Uuid, client_addr: String) {
        let info = SessionInfo {
            client_addr,
            created_at: Utc::now(),
            mud_port: None,
        };
        self.sessions.write().await.insert(session_id, info);
        tracing::debug!("Registered session {}", session_id);
    }

    /// Record the MUD port a session is connected to
    pub async fn set_mud_port(&self, session_id: Uuid, port: Option<u16>) {
        if let Some(info) = self.sessions.write().await.get_mut(&session_id) {
            info.mud_port = port;
        }
    }

    /// Remove a session
    pub async fn unregister_session(&self, session_id: Uuid) -> Option<SessionInfo> {
        let removed = self.sessions.write().await.remove(&session_id);
        if removed.is_some() {
            tracing::debug!("Unregistered session {}", session_id);
        }
        removed
    }

    /// Look up a session
    pub async fn session(&self, session_id: Uuid) -> Option<SessionInfo> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn session_ids(&self) -> Vec<Uuid> {
        self.sessions.read().await.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_registry() {
        let context = ServerContext::new(BridgeSettings::new("127.0.0.1", vec![5002]));
        let id = Uuid::new_v4();

        context
            .register_session(id, "127.0.0.1:50000".to_string())
            .await;
        assert_eq!(context.session_count().await, 1);

        context.set_mud_port(id, Some(5002)).await;
        let info = context.session(id).await.unwrap();
        assert_eq!(info.client_addr, "127.0.0.1:50000");
        assert_eq!(info.mud_port, Some(5002));

        assert!(context.unregister_session(id).await.is_some());
        assert!(context.unregister_session(id).await.is_none());
        assert_eq!(context.session_count().await, 0);
    }
}
