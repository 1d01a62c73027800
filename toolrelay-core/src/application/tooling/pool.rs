use super::connection::{ConnectionSettings, ServerConnection};
use super::error::ConnectionError;
use super::interface::{ServerSummary, ToolServerInterface};
use crate::config::ServerConfig;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Process-wide map of server name to its single [`ServerConnection`].
pub struct ConnectionPool {
    configs: Vec<ServerConfig>,
    settings: ConnectionSettings,
    connections: Mutex<HashMap<String, Arc<ServerConnection>>>,
}

impl ConnectionPool {
    pub fn new(configs: Vec<ServerConfig>, settings: ConnectionSettings) -> Self {
        Self {
            configs,
            settings,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.configs.iter().map(|cfg| cfg.name.as_str()).collect()
    }

    /// The connection for `server`, created on first use. Does not start the process.
    pub fn get_or_create(&self, server: &str) -> Result<Arc<ServerConnection>, ConnectionError> {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = connections.get(server) {
            return Ok(Arc::clone(existing));
        }

        let config = self
            .configs
            .iter()
            .find(|cfg| cfg.name == server)
            .cloned()
            .ok_or_else(|| ConnectionError::NotConfigured {
                server: server.to_string(),
            })?;
        let connection = Arc::new(ServerConnection::new(config, self.settings));
        connections.insert(server.to_string(), Arc::clone(&connection));
        Ok(connection)
    }

    /// Number of connections created so far.
    pub fn len(&self) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shut down every tracked connection and forget them.
    pub async fn shutdown_all(&self) {
        let drained: Vec<Arc<ServerConnection>> = {
            let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
            connections.drain().map(|(_, connection)| connection).collect()
        };
        if drained.is_empty() {
            return;
        }
        let count = drained.len();
        join_all(drained.iter().map(|connection| connection.shutdown())).await;
        info!(count, "All MCP connections shut down");
    }
}

#[async_trait]
impl ToolServerInterface for ConnectionPool {
    fn servers(&self) -> Vec<ServerSummary> {
        self.configs
            .iter()
            .map(|cfg| ServerSummary {
                name: cfg.name.clone(),
                description: cfg.description.clone(),
            })
            .collect()
    }

    async fn request(
        &self,
        server: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, ConnectionError> {
        let connection = self.get_or_create(server)?;
        connection.send_request(method, params).await
    }
}
