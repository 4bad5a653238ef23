use log::{ debug, info, warn };
use serde_json::Value;
use std::sync::Arc;

use super::{ EmbeddingModel, IndexAdmin, ModelTensorOutput };
use crate::error::{ Error, Result };
use crate::resources;

pub const VECTOR_FIELD_PREFIX: &str = "embedding_";

/// Fixed input used to discover a model's output dimension.
pub const SAMPLE_TEXT: &str = "dimension sample";

/// Adds one `knn_vector` field per embedding model to an index, on first use.
pub struct DynamicFieldAugmenter {
    admin: Arc<dyn IndexAdmin>,
    embedder: Arc<dyn EmbeddingModel>,
}

pub fn vector_field_name(model_id: &str) -> String {
    format!("{}{}", VECTOR_FIELD_PREFIX, model_id)
}

impl DynamicFieldAugmenter {
    pub fn new(admin: Arc<dyn IndexAdmin>, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self { admin, embedder }
    }

    /// Ensures `index` has the vector field for `model_id`. The dimension is
    /// measured from the model every time the field has to be added.
    pub async fn ensure_vector_field(&self, index: &str, model_id: &str) -> Result<bool> {
        validate_model_id(model_id)?;
        let field = vector_field_name(model_id);

        let mapping = self.admin.get_mapping(index).await?;
        let present = mapping
            .as_ref()
            .and_then(|m| m.get("properties"))
            .and_then(Value::as_object)
            .is_some_and(|props| props.contains_key(&field));
        if present {
            debug!("Field '{}' already present in '{}'", field, index);
            return Ok(true);
        }

        let output = self.embedder.predict(model_id, &[SAMPLE_TEXT]).await?;
        let dimension = embedding_dimension(&output).map_err(|e| {
            warn!("Dimension check for model '{}' failed: {}", model_id, e);
            e
        })?;

        let template = resources::raw(resources::VECTOR_FIELD_MAPPING)?;
        let dimension_text = dimension.to_string();
        let rendered = resources::render(
            template,
            &[
                ("model_id", model_id),
                ("dimension", dimension_text.as_str()),
            ]
        );
        let field_mapping = resources::parse(resources::VECTOR_FIELD_MAPPING, &rendered)?;

        info!("Adding field '{}' (dimension {}) to '{}'", field, dimension, index);
        self.admin.put_mapping(index, &field_mapping).await
    }
}

/// Dimension of the first tensor of the first inference result.
pub fn embedding_dimension(output: &ModelTensorOutput) -> Result<usize> {
    let tensor = output
        .first_tensor()
        .ok_or_else(|| Error::Invocation("embedding response contained no tensors".to_string()))?;

    let dimension = match (&tensor.shape, &tensor.data) {
        (Some(shape), _) if !shape.is_empty() => shape[0],
        (_, Some(data)) => data.len(),
        _ => {
            return Err(Error::Invocation("embedding tensor has neither shape nor data".to_string()));
        }
    };

    if dimension == 0 {
        return Err(Error::Invocation("embedding tensor has zero dimension".to_string()));
    }
    Ok(dimension)
}

// Model ids are spliced into a JSON template verbatim.
fn validate_model_id(model_id: &str) -> Result<()> {
    let valid =
        !model_id.is_empty() &&
        model_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("model id '{}' cannot name a mapping field", model_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::fakes::{ FakeAdmin, FakeEmbedder };
    use crate::index::{ ModelTensor, ModelTensors };
    use serde_json::json;

    const INDEX: &str = ".plugins-agent-tools-knowledge";

    fn setup(admin: FakeAdmin, embedder: FakeEmbedder) -> (Arc<FakeAdmin>, Arc<FakeEmbedder>, DynamicFieldAugmenter) {
        let admin = Arc::new(admin);
        let embedder = Arc::new(embedder);
        let augmenter = DynamicFieldAugmenter::new(admin.clone(), embedder.clone());
        (admin, embedder, augmenter)
    }

    #[tokio::test]
    async fn test_adds_field_with_measured_dimension() {
        let (admin, embedder, augmenter) = setup(
            FakeAdmin::new().with_version(INDEX, 2),
            FakeEmbedder::with_dimension(768)
        );

        assert!(augmenter.ensure_vector_field(INDEX, "model-a").await.unwrap());

        let mapping = admin.mapping(INDEX).unwrap();
        let field = &mapping["properties"]["embedding_model-a"];
        assert_eq!(field["type"], "knn_vector");
        assert_eq!(field["dimension"], 768);
        assert_eq!(embedder.calls(), 1);
        assert_eq!(*embedder.seen_inputs.lock().unwrap(), vec![SAMPLE_TEXT.to_string()]);
        assert_eq!(admin.puts(), 1);
    }

    #[tokio::test]
    async fn test_existing_field_is_noop() {
        let (admin, embedder, augmenter) = setup(
            FakeAdmin::new().with_index(
                INDEX,
                json!({ "properties": { "embedding_model-a": { "type": "knn_vector", "dimension": 4 } } })
            ),
            FakeEmbedder::with_dimension(768)
        );

        assert!(augmenter.ensure_vector_field(INDEX, "model-a").await.unwrap());
        assert_eq!(embedder.calls(), 0);
        assert_eq!(admin.puts(), 0);
    }

    #[tokio::test]
    async fn test_second_call_skips_model() {
        let (admin, embedder, augmenter) = setup(
            FakeAdmin::new().with_version(INDEX, 2),
            FakeEmbedder::with_dimension(384)
        );

        augmenter.ensure_vector_field(INDEX, "m1").await.unwrap();
        augmenter.ensure_vector_field(INDEX, "m1").await.unwrap();
        assert_eq!(embedder.calls(), 1);
        assert_eq!(admin.puts(), 1);
    }

    #[tokio::test]
    async fn test_fields_grow_per_model() {
        let (admin, embedder, augmenter) = setup(
            FakeAdmin::new().with_version(INDEX, 2),
            FakeEmbedder::with_dimension(384)
        );

        augmenter.ensure_vector_field(INDEX, "m1").await.unwrap();
        augmenter.ensure_vector_field(INDEX, "m2").await.unwrap();

        let mapping = admin.mapping(INDEX).unwrap();
        assert!(mapping["properties"].get("embedding_m1").is_some());
        assert!(mapping["properties"].get("embedding_m2").is_some());
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test]
    async fn test_recreated_index_measures_again() {
        let (admin, embedder, augmenter) = setup(
            FakeAdmin::new().with_version(INDEX, 2),
            FakeEmbedder::with_dimension(384)
        );

        augmenter.ensure_vector_field(INDEX, "m1").await.unwrap();
        admin.mappings.lock().unwrap().insert(INDEX.to_string(), json!({ "properties": {} }));
        augmenter.ensure_vector_field(INDEX, "m1").await.unwrap();
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_output_writes_nothing() {
        let (admin, _embedder, augmenter) = setup(
            FakeAdmin::new().with_version(INDEX, 2),
            FakeEmbedder::with_output(ModelTensorOutput::default())
        );

        let err = augmenter.ensure_vector_field(INDEX, "m1").await.unwrap_err();
        assert!(err.is_invocation());
        assert_eq!(admin.puts(), 0);
    }

    #[tokio::test]
    async fn test_invalid_model_id_rejected_before_remote_calls() {
        let (admin, embedder, augmenter) = setup(
            FakeAdmin::new().with_version(INDEX, 2),
            FakeEmbedder::with_dimension(8)
        );

        let err = augmenter.ensure_vector_field(INDEX, "a\",\"b").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(admin.gets(), 0);
        assert_eq!(embedder.calls(), 0);
    }

    #[test]
    fn test_embedding_dimension_prefers_shape() {
        let output = ModelTensorOutput {
            inference_results: vec![ModelTensors {
                output: vec![ModelTensor {
                    shape: Some(vec![5]),
                    data: Some(vec![0.0; 3]),
                    ..Default::default()
                }],
            }],
        };
        assert_eq!(embedding_dimension(&output).unwrap(), 5);
    }

    #[test]
    fn test_embedding_dimension_falls_back_to_data() {
        let output = ModelTensorOutput {
            inference_results: vec![ModelTensors {
                output: vec![ModelTensor {
                    data: Some(vec![0.0; 3]),
                    ..Default::default()
                }],
            }],
        };
        assert_eq!(embedding_dimension(&output).unwrap(), 3);
    }

    #[test]
    fn test_embedding_dimension_rejects_empty_tensor() {
        let output = ModelTensorOutput {
            inference_results: vec![ModelTensors {
                output: vec![ModelTensor::default()],
            }],
        };
        assert!(embedding_dimension(&output).unwrap_err().is_invocation());
    }
}
