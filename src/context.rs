use log::info;
use std::sync::Arc;

use crate::cluster::ClusterClient;
use crate::config::PluginConfig;
use crate::egress::{ EgressClient, EgressGuard };
use crate::error::Result;
use crate::index::{ DynamicFieldAugmenter, EmbeddingModel, IndexAdmin, IndexLifecycleManager };

/// Everything a tool needs from the core, built once at plugin start and
/// passed to each tool explicitly.
pub struct ToolContext {
    pub lifecycle: IndexLifecycleManager,
    pub fields: DynamicFieldAugmenter,
    pub egress: EgressGuard,
}

impl ToolContext {
    pub fn new(config: &PluginConfig) -> Result<Self> {
        let cluster = Arc::new(ClusterClient::new(&config.cluster)?);
        Self::with_collaborators(config, cluster.clone(), cluster)
    }

    pub fn with_collaborators(
        config: &PluginConfig,
        admin: Arc<dyn IndexAdmin>,
        embedder: Arc<dyn EmbeddingModel>
    ) -> Result<Self> {
        let egress = EgressGuard::new(&config.egress)?;
        info!("Tool context initialized for cluster {}", config.cluster.host);
        Ok(Self {
            lifecycle: IndexLifecycleManager::new(admin.clone()),
            fields: DynamicFieldAugmenter::new(admin, embedder),
            egress,
        })
    }

    pub fn egress_client(&self) -> EgressClient {
        self.egress.shared_client()
    }
}
