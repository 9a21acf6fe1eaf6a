//! Max pooling over the steps axis of channels-last sequences.

use burn::{
    module::Module,
    nn::pool::{MaxPool1d, MaxPool1dConfig},
    tensor::{Tensor, backend::Backend},
};

use crate::errors::ModelError;

/// Number of output steps of a max pooling window with stride equal to its
/// size and no padding.
pub fn pooled_length(steps: usize, pool_size: usize) -> Result<usize, ModelError> {
    if pool_size == 0 {
        return Err(ModelError::invalid_layer("pool size must be positive"));
    }
    if pool_size > steps {
        return Err(ModelError::invalid_layer(format!(
            "pool size {pool_size} exceeds input length {steps}"
        )));
    }
    Ok((steps - pool_size) / pool_size + 1)
}

/// Configuration for a MaxPoolLayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxPoolLayerConfig {
    /// Window size, also used as the stride.
    pub pool_size: usize,
}

impl MaxPoolLayerConfig {
    /// Creates a new MaxPoolLayerConfig.
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size }
    }

    /// Initializes the pooling layer.
    pub fn init(&self) -> MaxPoolLayer {
        let pool = MaxPool1dConfig::new(self.pool_size)
            .with_stride(self.pool_size)
            .init();

        MaxPoolLayer {
            pool,
            pool_size: self.pool_size,
        }
    }
}

/// Non-overlapping max pooling on `[batch, steps, channels]` tensors.
#[derive(Module, Clone, Debug)]
pub struct MaxPoolLayer {
    pool: MaxPool1d,
    pool_size: usize,
}

impl MaxPoolLayer {
    /// Performs the forward pass.
    pub fn forward<B: Backend>(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        self.pool.forward(input.swap_dims(1, 2)).swap_dims(1, 2)
    }

    /// Returns the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}
