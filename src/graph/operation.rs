//! Operations for the computation graph.
//!
//! Uses a simple enum instead of trait objects for clarity. Shape rules follow
//! Keras: every operation checks its input shapes when it is applied, so a
//! graph that was built successfully always compiles to matching tensors.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::errors::ModelError;
use crate::layers::{Activation, Conv1dLayerConfig, DenseConfig, Padding, pooled_length};

use super::buffer::DataBuffer;

/// Unique identifier for an operation.
pub type OpId = usize;

/// Global counter for unique operation IDs.
static OP_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Generates a new unique operation ID.
fn next_op_id() -> OpId {
    OP_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// The kind of a graph node, named after the matching Keras layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Input,
    Conv1d,
    #[serde(rename = "max_pooling1d")]
    MaxPooling1d,
    Flatten,
    Dense,
    Reshape,
    Concatenate,
    #[serde(rename = "coordinate_channel1d")]
    CoordinateChannel1d,
}

impl LayerKind {
    /// Base name used when naming layers in a summary.
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Input => "input",
            LayerKind::Conv1d => "conv1d",
            LayerKind::MaxPooling1d => "max_pooling1d",
            LayerKind::Flatten => "flatten",
            LayerKind::Dense => "dense",
            LayerKind::Reshape => "reshape",
            LayerKind::Concatenate => "concatenate",
            LayerKind::CoordinateChannel1d => "coordinate_channel1d",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A computation operation in the graph.
#[derive(Debug, Clone)]
pub enum Operation {
    /// 1-D convolution over the steps axis.
    Conv1d {
        id: OpId,
        filters: usize,
        kernel_size: usize,
        activation: Activation,
        padding: Padding,
    },
    /// Max pooling with stride equal to the pool size.
    MaxPool1d { id: OpId, pool_size: usize },
    /// Collapse the per-sample shape to one dimension.
    Flatten { id: OpId },
    /// Dense (fully connected) layer.
    Dense {
        id: OpId,
        units: usize,
        activation: Activation,
    },
    /// Reinterpret the per-sample shape, keeping element order.
    Reshape { id: OpId, shape: Vec<usize> },
    /// Concatenate buffers along the last axis.
    Concatenate { id: OpId },
    /// Append a normalized position channel.
    CoordinateChannel { id: OpId },
}

impl Operation {
    /// Creates a new Conv1d operation.
    pub fn conv1d(
        filters: usize,
        kernel_size: usize,
        activation: Activation,
        padding: Padding,
    ) -> Self {
        Self::Conv1d {
            id: next_op_id(),
            filters,
            kernel_size,
            activation,
            padding,
        }
    }

    /// Creates a new MaxPool1d operation.
    pub fn max_pool1d(pool_size: usize) -> Self {
        Self::MaxPool1d {
            id: next_op_id(),
            pool_size,
        }
    }

    /// Creates a new Flatten operation.
    pub fn flatten() -> Self {
        Self::Flatten { id: next_op_id() }
    }

    /// Creates a new Dense operation.
    pub fn dense(units: usize, activation: Activation) -> Self {
        Self::Dense {
            id: next_op_id(),
            units,
            activation,
        }
    }

    /// Creates a new Reshape operation.
    pub fn reshape(shape: Vec<usize>) -> Self {
        Self::Reshape {
            id: next_op_id(),
            shape,
        }
    }

    /// Creates a new Concatenate operation.
    pub fn concatenate() -> Self {
        Self::Concatenate { id: next_op_id() }
    }

    /// Creates a new CoordinateChannel operation.
    pub fn coordinate_channel() -> Self {
        Self::CoordinateChannel { id: next_op_id() }
    }

    /// Returns the unique ID of this operation.
    pub fn id(&self) -> OpId {
        match self {
            Self::Conv1d { id, .. } => *id,
            Self::MaxPool1d { id, .. } => *id,
            Self::Flatten { id } => *id,
            Self::Dense { id, .. } => *id,
            Self::Reshape { id, .. } => *id,
            Self::Concatenate { id } => *id,
            Self::CoordinateChannel { id } => *id,
        }
    }

    /// Returns the layer kind of this operation.
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Conv1d { .. } => LayerKind::Conv1d,
            Self::MaxPool1d { .. } => LayerKind::MaxPooling1d,
            Self::Flatten { .. } => LayerKind::Flatten,
            Self::Dense { .. } => LayerKind::Dense,
            Self::Reshape { .. } => LayerKind::Reshape,
            Self::Concatenate { .. } => LayerKind::Concatenate,
            Self::CoordinateChannel { .. } => LayerKind::CoordinateChannel1d,
        }
    }

    /// Returns the output shape for this operation given input shapes.
    pub fn output_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
        if let Self::Concatenate { .. } = self {
            return concat_shape(input_shapes);
        }

        let [shape] = input_shapes else {
            return Err(ModelError::invalid_layer(format!(
                "{} expects exactly one input, got {}",
                self.kind(),
                input_shapes.len()
            )));
        };

        match self {
            Self::Conv1d {
                filters,
                kernel_size,
                padding,
                ..
            } => {
                let [steps, _] = sequence_shape(self.kind(), shape)?;
                if *filters == 0 {
                    return Err(ModelError::invalid_layer("conv1d needs at least one filter"));
                }
                Ok(vec![padding.output_length(steps, *kernel_size)?, *filters])
            }
            Self::MaxPool1d { pool_size, .. } => {
                let [steps, channels] = sequence_shape(self.kind(), shape)?;
                Ok(vec![pooled_length(steps, *pool_size)?, channels])
            }
            Self::Flatten { .. } => {
                if shape.is_empty() {
                    return Err(ModelError::invalid_layer("flatten needs a non-empty input shape"));
                }
                Ok(vec![shape.iter().product()])
            }
            Self::Dense { units, .. } => {
                if shape.len() != 1 {
                    return Err(ModelError::invalid_layer(format!(
                        "dense expects a flat input, got shape {shape:?}"
                    )));
                }
                if *units == 0 {
                    return Err(ModelError::invalid_layer("dense needs at least one unit"));
                }
                Ok(vec![*units])
            }
            Self::Reshape { shape: target, .. } => {
                if target.is_empty() || target.len() > 2 || target.contains(&0) {
                    return Err(ModelError::invalid_layer(format!(
                        "reshape target must have one or two positive dimensions, got {target:?}"
                    )));
                }
                let wanted: usize = target.iter().product();
                let available: usize = shape.iter().product();
                if wanted != available {
                    return Err(ModelError::ShapeMismatch {
                        expected: target.clone(),
                        actual: shape.to_vec(),
                    });
                }
                Ok(target.clone())
            }
            Self::CoordinateChannel { .. } => {
                let [steps, channels] = sequence_shape(self.kind(), shape)?;
                if steps < 2 {
                    return Err(ModelError::invalid_layer(
                        "coordinate channel needs at least two steps",
                    ));
                }
                Ok(vec![steps, channels + 1])
            }
            Self::Concatenate { .. } => concat_shape(input_shapes),
        }
    }

    /// Returns the number of trainable parameters given input shapes.
    pub fn param_count(&self, input_shapes: &[&[usize]]) -> usize {
        match (self, input_shapes) {
            (
                Self::Conv1d {
                    filters,
                    kernel_size,
                    ..
                },
                [[_, channels]],
            ) => Conv1dLayerConfig::new(*channels, *filters, *kernel_size).param_count(),
            (Self::Dense { units, .. }, [[features]]) => {
                DenseConfig::new(*features, *units).param_count()
            }
            _ => 0,
        }
    }

    /// Applies this operation to an input buffer, returning a new DataBuffer.
    pub fn apply(&self, input: DataBuffer) -> Result<DataBuffer, ModelError> {
        self.apply_multi(vec![input])
    }

    /// Applies this operation to multiple input buffers.
    pub fn apply_multi(&self, inputs: Vec<DataBuffer>) -> Result<DataBuffer, ModelError> {
        let input_shapes: Vec<&[usize]> = inputs.iter().map(|b| b.shape()).collect();
        let output_shape = self.output_shape(&input_shapes)?;
        Ok(DataBuffer::new(output_shape, Some(self.clone()), inputs))
    }
}

fn sequence_shape(kind: LayerKind, shape: &[usize]) -> Result<[usize; 2], ModelError> {
    match shape {
        [steps, channels] => Ok([*steps, *channels]),
        _ => Err(ModelError::invalid_layer(format!(
            "{kind} expects a [steps, channels] input, got shape {shape:?}"
        ))),
    }
}

fn concat_shape(input_shapes: &[&[usize]]) -> Result<Vec<usize>, ModelError> {
    let Some((first, rest)) = input_shapes.split_first() else {
        return Err(ModelError::invalid_layer(
            "concatenate requires at least 1 input",
        ));
    };
    let Some((_, leading)) = first.split_last() else {
        return Err(ModelError::invalid_layer(
            "concatenate requires inputs with at least one dimension",
        ));
    };

    let mut output = first.to_vec();
    for shape in rest {
        let compatible = shape.len() == first.len() && shape[..leading.len()] == *leading;
        if !compatible {
            return Err(ModelError::ShapeMismatch {
                expected: first.to_vec(),
                actual: shape.to_vec(),
            });
        }
        output[leading.len()] += shape[leading.len()];
    }
    Ok(output)
}

/// Convenience functions for creating operations and applying them in one step.
/// These provide a Keras-like functional API.
pub mod ops {
    use super::*;

    /// Creates a Conv1d layer and applies it to the input.
    ///
    /// # Example
    /// ```
    /// use lucasnet::graph::{InputBuffer, ops};
    /// use lucasnet::layers::{Activation, Padding};
    ///
    /// let input = InputBuffer::new(vec![256, 1]);
    /// let x = ops::conv1d(32, 3, Activation::Relu, Padding::Valid, input.buffer())?;
    /// assert_eq!(x.shape(), &[254, 32]);
    /// # Ok::<(), lucasnet::ModelError>(())
    /// ```
    pub fn conv1d(
        filters: usize,
        kernel_size: usize,
        activation: Activation,
        padding: Padding,
        input: DataBuffer,
    ) -> Result<DataBuffer, ModelError> {
        Operation::conv1d(filters, kernel_size, activation, padding).apply(input)
    }

    /// Creates a MaxPool1d layer (stride equal to `pool_size`) and applies it.
    ///
    /// # Example
    /// ```
    /// use lucasnet::graph::{InputBuffer, ops};
    ///
    /// let input = InputBuffer::new(vec![254, 32]);
    /// let x = ops::max_pool1d(2, input.buffer())?;
    /// assert_eq!(x.shape(), &[127, 32]);
    /// # Ok::<(), lucasnet::ModelError>(())
    /// ```
    pub fn max_pool1d(pool_size: usize, input: DataBuffer) -> Result<DataBuffer, ModelError> {
        Operation::max_pool1d(pool_size).apply(input)
    }

    /// Flattens the input to a single dimension.
    pub fn flatten(input: DataBuffer) -> Result<DataBuffer, ModelError> {
        Operation::flatten().apply(input)
    }

    /// Creates a Dense layer and applies it to a flat input.
    ///
    /// # Example
    /// ```
    /// use lucasnet::graph::{InputBuffer, ops};
    /// use lucasnet::layers::Activation;
    ///
    /// let input = InputBuffer::new(vec![14, 64]);
    /// let x = ops::flatten(input.buffer())?;
    /// let probs = ops::dense(4, Activation::Softmax, x)?;
    /// assert_eq!(probs.shape(), &[4]);
    /// # Ok::<(), lucasnet::ModelError>(())
    /// ```
    pub fn dense(
        units: usize,
        activation: Activation,
        input: DataBuffer,
    ) -> Result<DataBuffer, ModelError> {
        Operation::dense(units, activation).apply(input)
    }

    /// Reshapes the input; the element count must be preserved.
    pub fn reshape(shape: Vec<usize>, input: DataBuffer) -> Result<DataBuffer, ModelError> {
        Operation::reshape(shape).apply(input)
    }

    /// Concatenates buffers along the last axis.
    ///
    /// # Example
    /// ```
    /// use lucasnet::graph::{InputBuffer, ops};
    ///
    /// let input = InputBuffer::new(vec![16, 64]);
    /// let raw = InputBuffer::new(vec![16, 16]);
    /// let combined = ops::concat(vec![input.buffer(), raw.buffer()])?;
    /// assert_eq!(combined.shape(), &[16, 80]);
    /// # Ok::<(), lucasnet::ModelError>(())
    /// ```
    pub fn concat(inputs: Vec<DataBuffer>) -> Result<DataBuffer, ModelError> {
        Operation::concatenate().apply_multi(inputs)
    }

    /// Appends a coordinate channel to a `[steps, channels]` input.
    pub fn coordinate_channel(input: DataBuffer) -> Result<DataBuffer, ModelError> {
        Operation::coordinate_channel().apply(input)
    }
}
