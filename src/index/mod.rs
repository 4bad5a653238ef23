pub mod lifecycle;
pub mod vector_field;
use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use serde_json::Value;

use crate::error::Result;

pub use lifecycle::IndexLifecycleManager;
pub use vector_field::DynamicFieldAugmenter;

/// Index administration calls supplied by the host cluster.
#[async_trait]
pub trait IndexAdmin: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    async fn create_index(&self, index: &str, settings: &Value, mapping: &Value) -> Result<CreateIndexOutcome>;

    /// Current mapping body of `index` (`properties`, `_meta`, ...), `None` if the index is gone.
    async fn get_mapping(&self, index: &str) -> Result<Option<Value>>;

    /// Returns whether the cluster acknowledged the update.
    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<bool>;
}

/// Result of a create-index call. `AlreadyExists` means another caller won
/// the race between the existence check and the create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateIndexOutcome {
    Acknowledged,
    NotAcknowledged,
    AlreadyExists,
}

/// Text embedding inference.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn predict(&self, model_id: &str, texts: &[&str]) -> Result<ModelTensorOutput>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelTensorOutput {
    #[serde(default)]
    pub inference_results: Vec<ModelTensors>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelTensors {
    #[serde(default)]
    pub output: Vec<ModelTensor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelTensor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
    #[serde(default)]
    pub data: Option<Vec<f32>>,
}

impl ModelTensorOutput {
    pub fn first_tensor(&self) -> Option<&ModelTensor> {
        self.inference_results.first().and_then(|r| r.output.first())
    }
}
