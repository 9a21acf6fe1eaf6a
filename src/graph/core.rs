//! ModelGraph - graph structure without weights.
//!
//! This module contains the non-generic ModelGraph that represents
//! the computation graph structure. Weights are only created when
//! `compile()` is called.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use burn::tensor::backend::Backend;

use super::buffer::{BufferId, DataBuffer, InputBuffer};
use super::model::CompiledModel;
use super::operation::LayerKind;
use super::summary::{GraphSummary, LayerSummary};
use crate::errors::ModelError;

/// Global counter for unique graph IDs.
static GRAPH_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique identifier for a ModelGraph.
pub type GraphId = usize;

fn next_graph_id() -> GraphId {
    GRAPH_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// ModelGraph represents the computation graph structure without weights.
///
/// A graph has exactly one input and one flat output. It is immutable once
/// built; call `compile()` to create a `CompiledModel` with actual weight
/// tensors.
///
/// # Example
///
/// ```
/// use lucasnet::graph::{InputBuffer, ModelGraph, ops};
/// use lucasnet::layers::{Activation, Padding};
/// use burn::backend::NdArray;
/// use burn::tensor::backend::Backend;
///
/// let device = <NdArray as Backend>::Device::default();
/// let input = InputBuffer::new(vec![32, 1]);
/// let x = ops::conv1d(8, 3, Activation::Relu, Padding::Valid, input.buffer())?;
/// let x = ops::flatten(x)?;
/// let output = ops::dense(4, Activation::Softmax, x)?;
/// let graph = ModelGraph::new("tiny", input, output)?;
///
/// // Compile to create weights
/// let model = graph.compile::<NdArray>(&device)?;
/// assert_eq!(model.output_shape(), &[4]);
/// # Ok::<(), lucasnet::ModelError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ModelGraph {
    id: GraphId,
    name: String,
    input: InputBuffer,
    output: DataBuffer,
}

impl ModelGraph {
    /// Creates a new ModelGraph from its input and output buffers.
    ///
    /// Fails if the output depends on a buffer other than `input`, if the
    /// input is not rank 1 or 2, or if the output is not flat.
    pub fn new(
        name: impl Into<String>,
        input: InputBuffer,
        output: DataBuffer,
    ) -> Result<Self, ModelError> {
        if !(1..=2).contains(&input.shape().len()) {
            return Err(ModelError::InvalidGraph(format!(
                "input must have shape [features] or [steps, channels], got {:?}",
                input.shape()
            )));
        }
        if output.rank() != 1 {
            return Err(ModelError::InvalidGraph(format!(
                "output must be flat, got shape {:?}",
                output.shape()
            )));
        }

        let graph = Self {
            id: next_graph_id(),
            name: name.into(),
            input,
            output,
        };

        let input_id = graph.input.id();
        let stray = graph
            .nodes()
            .into_iter()
            .find(|b| b.is_input() && b.id() != input_id)
            .map(|b| b.id());
        if let Some(stray) = stray {
            return Err(ModelError::InvalidGraph(format!(
                "buffer {stray} has no producer and is not the registered input"
            )));
        }

        Ok(graph)
    }

    /// Returns the unique ID of this graph.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the input buffer.
    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    /// Returns the output buffer.
    pub fn output(&self) -> &DataBuffer {
        &self.output
    }

    /// Returns the per-sample input shape.
    pub fn input_shape(&self) -> &[usize] {
        self.input.shape()
    }

    /// Returns the per-sample output shape.
    pub fn output_shape(&self) -> &[usize] {
        self.output.shape()
    }

    /// Returns every buffer reachable from the output, inputs before the
    /// operations that consume them.
    pub(crate) fn nodes(&self) -> Vec<&DataBuffer> {
        fn visit<'a>(
            buffer: &'a DataBuffer,
            visited: &mut HashSet<BufferId>,
            order: &mut Vec<&'a DataBuffer>,
        ) {
            if !visited.insert(buffer.id()) {
                return;
            }
            for input in buffer.inputs() {
                visit(input, visited, order);
            }
            order.push(buffer);
        }

        let mut visited = HashSet::new();
        let mut order = Vec::new();
        visit(&self.output, &mut visited, &mut order);
        order
    }

    /// Returns the layers in execution order, starting with the input.
    pub fn layers(&self) -> Vec<LayerSummary> {
        self.summary().layers
    }

    /// Counts the layers of the given kind.
    pub fn count_layers(&self, kind: LayerKind) -> usize {
        self.nodes()
            .iter()
            .filter_map(|b| b.producer())
            .filter(|op| op.kind() == kind)
            .count()
    }

    /// Total number of trainable parameters.
    pub fn count_params(&self) -> usize {
        self.summary().total_params
    }

    /// Describes the graph layer by layer.
    pub fn summary(&self) -> GraphSummary {
        GraphSummary::from_graph(self)
    }

    /// Serializes the layer description to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        self.summary().to_json()
    }

    /// Compiles this graph into a CompiledModel with initialized weights.
    ///
    /// This is where the actual weight tensors are created on the specified device.
    pub fn compile<B: Backend>(&self, device: &B::Device) -> Result<CompiledModel<B>, ModelError> {
        CompiledModel::new(self, device)
    }
}
