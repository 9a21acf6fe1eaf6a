//! Model-related error types.

use thiserror::Error;

/// Errors that can occur while building, compiling or running a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model {name} not implemented")]
    UnknownModel { name: String },

    #[error("Invalid layer configuration: {message}")]
    InvalidLayerConfig { message: String },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid graph structure: {0}")]
    InvalidGraph(String),

    #[error("Tensor data error: {0}")]
    TensorData(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn invalid_layer(message: impl Into<String>) -> Self {
        Self::InvalidLayerConfig {
            message: message.into(),
        }
    }
}
