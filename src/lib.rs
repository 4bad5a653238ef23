pub mod cluster;
pub mod config;
pub mod context;
pub mod egress;
pub mod error;
pub mod index;
pub mod resources;
pub mod schema;
pub use config::{ ClusterConfig, EgressConfig, PluginConfig };
pub use context::ToolContext;
pub use egress::{ EgressClient, EgressGuard };
pub use error::{ Error, Result };
pub use index::{ DynamicFieldAugmenter, EmbeddingModel, IndexAdmin, IndexLifecycleManager };
pub use schema::{ IndexDescriptor, CATALOG };
