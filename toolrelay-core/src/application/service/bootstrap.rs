use super::inbound::ConversationService;
use super::manager::ConversationManager;
use crate::agent::{Orchestrator, OrchestratorOptions};
use crate::approval::{ApprovalGate, ApprovalError, GateSettings};
use crate::capability::CapabilityRegistry;
use crate::channel::Channel;
use crate::config::AppConfig;
use crate::model::{AnthropicClient, ModelProvider};
use crate::storage::MemoryStore;
use crate::tooling::{ConnectionPool, ConnectionSettings};
use std::sync::Arc;
use tracing::info;

/// Everything one running bridge owns, wired from configuration.
pub struct Bridge {
    pub service: Arc<ConversationService>,
    pub gate: Arc<ApprovalGate>,
    pub pool: Arc<ConnectionPool>,
    pub store: Arc<MemoryStore>,
}

impl Bridge {
    /// Wire the bridge against the configured model endpoint.
    pub fn from_config(config: &AppConfig, channel: Arc<dyn Channel>) -> Self {
        let provider = AnthropicClient::new(
            config.model.endpoint.clone(),
            Some(config.model.api_key.clone()),
        );
        Self::with_provider(config, channel, Arc::new(provider))
    }

    pub fn with_provider(
        config: &AppConfig,
        channel: Arc<dyn Channel>,
        provider: Arc<dyn ModelProvider>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let pool = Arc::new(ConnectionPool::new(
            config.servers.clone(),
            ConnectionSettings::from(&config.rpc),
        ));
        let registry = CapabilityRegistry::from_config(config, pool.clone());
        info!(
            capabilities = ?registry.names(),
            servers = config.servers.len(),
            "capabilities registered"
        );

        let gate = Arc::new(ApprovalGate::new(
            store.clone(),
            channel.clone(),
            GateSettings::from(&config.approval),
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            provider,
            Arc::new(registry),
            gate.clone(),
            store.clone(),
            channel.clone(),
            OrchestratorOptions::from_config(config),
        ));
        let service = Arc::new(ConversationService::new(
            ConversationManager::new(store.clone(), config.conversation.idle_timeout()),
            store.clone(),
            gate.clone(),
            orchestrator,
            channel,
            config.conversation.max_messages,
        ));

        Self {
            service,
            gate,
            pool,
            store,
        }
    }

    /// Expire approvals left pending by a previous run.
    pub async fn recover(&self) -> Result<usize, ApprovalError> {
        self.gate.sweep_expired().await
    }

    pub async fn shutdown(&self) {
        self.pool.shutdown_all().await;
    }
}
