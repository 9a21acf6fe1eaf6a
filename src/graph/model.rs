//! CompiledModel - a graph with initialized burn layers.

use std::collections::HashMap;

use burn::module::{Ignored, Module};
use burn::tensor::{Tensor, backend::Backend};

use crate::errors::ModelError;
use crate::layers::{
    Conv1dLayer, Conv1dLayerConfig, Dense, DenseConfig, MaxPoolLayer, MaxPoolLayerConfig,
    coordinate_channel,
};

use super::buffer::{BufferId, DataBuffer};
use super::core::ModelGraph;
use super::operation::{OpId, Operation};

/// Execution step in the forward pass. Inputs and outputs are slot indices;
/// layer fields index into the model's layer lists.
#[derive(Debug, Clone)]
pub enum Step {
    Conv1d {
        layer: usize,
        input: usize,
        output: usize,
    },
    MaxPool1d {
        layer: usize,
        input: usize,
        output: usize,
    },
    Flatten {
        input: usize,
        output: usize,
    },
    Dense {
        layer: usize,
        input: usize,
        output: usize,
    },
    Reshape {
        input: usize,
        output: usize,
        shape: Vec<usize>,
    },
    Concat {
        inputs: Vec<usize>,
        output: usize,
    },
    CoordinateChannel {
        input: usize,
        output: usize,
    },
}

/// Static part of a compiled model: shapes and the ordered steps.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    name: String,
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    steps: Vec<Step>,
    num_slots: usize,
    output_slot: usize,
}

/// Intermediate value held in a slot during the forward pass.
#[derive(Debug, Clone)]
enum Value<B: Backend> {
    /// `[batch, steps, channels]`
    Sequence(Tensor<B, 3>),
    /// `[batch, features]`
    Flat(Tensor<B, 2>),
}

impl<B: Backend> Value<B> {
    fn batch_size(&self) -> usize {
        match self {
            Value::Sequence(t) => t.dims()[0],
            Value::Flat(t) => t.dims()[0],
        }
    }

    fn into_sequence(self) -> Tensor<B, 3> {
        match self {
            Value::Sequence(t) => t,
            Value::Flat(_) => unreachable!("shapes are checked when the graph is built"),
        }
    }

    fn into_flat(self) -> Tensor<B, 2> {
        match self {
            Value::Flat(t) => t,
            Value::Sequence(t) => {
                let [batch, steps, channels] = t.dims();
                t.reshape([batch, steps * channels])
            }
        }
    }

    fn reshape(self, shape: &[usize]) -> Self {
        let batch = self.batch_size();
        match (self, shape) {
            (Value::Sequence(t), [features]) => Value::Flat(t.reshape([batch, *features])),
            (Value::Flat(t), [features]) => Value::Flat(t.reshape([batch, *features])),
            (Value::Sequence(t), [steps, channels]) => {
                Value::Sequence(t.reshape([batch, *steps, *channels]))
            }
            (Value::Flat(t), [steps, channels]) => {
                Value::Sequence(t.reshape([batch, *steps, *channels]))
            }
            _ => unreachable!("reshape targets are rank 1 or 2"),
        }
    }
}

/// A compiled graph: burn layers plus the plan that wires them.
///
/// This is a regular burn `Module`, so it can be moved between devices,
/// recorded, and trained with burn's optimizers.
#[derive(Module, Debug)]
pub struct CompiledModel<B: Backend> {
    convs: Vec<Conv1dLayer<B>>,
    pools: Vec<MaxPoolLayer>,
    denses: Vec<Dense<B>>,
    plan: Ignored<ExecutionPlan>,
}

impl<B: Backend> CompiledModel<B> {
    /// Initializes every layer of the graph on the given device.
    pub fn new(graph: &ModelGraph, device: &B::Device) -> Result<Self, ModelError> {
        log::debug!("Compiling graph {}", graph.name());

        let mut builder = PlanBuilder::default();
        builder.register_input(graph.input().id());
        for buffer in graph.nodes() {
            builder.visit(buffer)?;
        }

        let output_slot = builder.slot(graph.output().id())?;

        let convs: Vec<Conv1dLayer<B>> = builder.convs.iter().map(|c| c.init(device)).collect();
        let pools: Vec<MaxPoolLayer> = builder.pools.iter().map(|p| p.init()).collect();
        let denses: Vec<Dense<B>> = builder.denses.iter().map(|d| d.init(device)).collect();

        log::debug!(
            "Graph {} compiled: {} steps, {} conv, {} pool, {} dense layers",
            graph.name(),
            builder.steps.len(),
            convs.len(),
            pools.len(),
            denses.len()
        );

        Ok(Self {
            convs,
            pools,
            denses,
            plan: Ignored(ExecutionPlan {
                name: graph.name().to_string(),
                input_shape: graph.input_shape().to_vec(),
                output_shape: graph.output_shape().to_vec(),
                steps: builder.steps,
                num_slots: builder.slot_index.len(),
                output_slot,
            }),
        })
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        &self.plan.name
    }

    /// Returns the per-sample input shape.
    pub fn input_shape(&self) -> &[usize] {
        &self.plan.input_shape
    }

    /// Returns the per-sample output shape.
    pub fn output_shape(&self) -> &[usize] {
        &self.plan.output_shape
    }

    /// Performs a forward pass on a `[batch, steps, channels]` input.
    ///
    /// The input is reshaped to the graph's per-sample input shape first, so
    /// a flat graph also accepts `[batch, 1, features]`.
    ///
    /// Returns `[batch, outputs]`.
    ///
    /// # Panics
    ///
    /// Panics if a sample does not hold exactly as many values as the graph
    /// input.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        self.run(Value::Sequence(input))
    }

    /// Performs a forward pass on a `[batch, features]` input.
    ///
    /// Sequence graphs read each row as `[steps, channels]` in row-major
    /// order.
    ///
    /// # Panics
    ///
    /// Panics if `features` differs from the graph's per-sample input size.
    pub fn forward_flat(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.run(Value::Flat(input))
    }

    fn run(&self, input: Value<B>) -> Tensor<B, 2> {
        log::trace!("Forward pass through {} (batch {})", self.plan.name, input.batch_size());

        let mut slots: Vec<Option<Value<B>>> = vec![None; self.plan.num_slots];
        slots[0] = Some(input.reshape(&self.plan.input_shape));

        let take = |slots: &[Option<Value<B>>], idx: usize| -> Value<B> {
            match &slots[idx] {
                Some(value) => value.clone(),
                None => unreachable!("steps run in topological order"),
            }
        };

        for step in &self.plan.steps {
            match step {
                Step::Conv1d {
                    layer,
                    input,
                    output,
                } => {
                    let x = take(&slots, *input).into_sequence();
                    slots[*output] = Some(Value::Sequence(self.convs[*layer].forward(x)));
                }
                Step::MaxPool1d {
                    layer,
                    input,
                    output,
                } => {
                    let x = take(&slots, *input).into_sequence();
                    slots[*output] = Some(Value::Sequence(self.pools[*layer].forward(x)));
                }
                Step::Flatten { input, output } => {
                    let x = take(&slots, *input).into_flat();
                    slots[*output] = Some(Value::Flat(x));
                }
                Step::Dense {
                    layer,
                    input,
                    output,
                } => {
                    let x = take(&slots, *input).into_flat();
                    slots[*output] = Some(Value::Flat(self.denses[*layer].forward(x)));
                }
                Step::Reshape {
                    input,
                    output,
                    shape,
                } => {
                    let x = take(&slots, *input);
                    slots[*output] = Some(x.reshape(shape));
                }
                Step::Concat { inputs, output } => {
                    let values: Vec<Value<B>> =
                        inputs.iter().map(|&idx| take(&slots, idx)).collect();
                    let joined = if matches!(values.first(), Some(Value::Sequence(_))) {
                        Value::Sequence(Tensor::cat(
                            values.into_iter().map(Value::into_sequence).collect(),
                            2,
                        ))
                    } else {
                        Value::Flat(Tensor::cat(
                            values.into_iter().map(Value::into_flat).collect(),
                            1,
                        ))
                    };
                    slots[*output] = Some(joined);
                }
                Step::CoordinateChannel { input, output } => {
                    let x = take(&slots, *input).into_sequence();
                    slots[*output] = Some(Value::Sequence(coordinate_channel(x)));
                }
            }
        }

        take(&slots, self.plan.output_slot).into_flat()
    }

    /// Runs the model on a batch of raw samples.
    ///
    /// Each sample is the row-major flattening of one input (for a
    /// `[256, 1]` input, the 256 spectrum values). Returns one output vector
    /// per sample.
    pub fn predict(
        &self,
        samples: &[Vec<f32>],
        device: &B::Device,
    ) -> Result<Vec<Vec<f32>>, ModelError> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let sample_size: usize = self.plan.input_shape.iter().product();
        if let Some(bad) = samples.iter().find(|s| s.len() != sample_size) {
            return Err(ModelError::ShapeMismatch {
                expected: self.plan.input_shape.clone(),
                actual: vec![bad.len()],
            });
        }

        let batch = samples.len();
        let data: Vec<f32> = samples.iter().flat_map(|s| s.iter().copied()).collect();
        let flat = Tensor::<B, 1>::from_floats(data.as_slice(), device);

        let output = match self.plan.input_shape.as_slice() {
            [steps, channels] => self.forward(flat.reshape([batch, *steps, *channels])),
            _ => self.forward_flat(flat.reshape([batch, sample_size])),
        };

        let output_size: usize = self.plan.output_shape.iter().product();
        let values: Vec<f32> = output
            .to_data()
            .to_vec()
            .map_err(|err| ModelError::TensorData(format!("{err:?}")))?;

        Ok(values.chunks(output_size).map(|c| c.to_vec()).collect())
    }
}

/// Builder for constructing the execution plan and layer configs.
#[derive(Default)]
struct PlanBuilder {
    slot_index: HashMap<BufferId, usize>,
    steps: Vec<Step>,
    convs: Vec<Conv1dLayerConfig>,
    pools: Vec<MaxPoolLayerConfig>,
    denses: Vec<DenseConfig>,
    layer_index: HashMap<OpId, usize>,
}

impl PlanBuilder {
    fn register_input(&mut self, id: BufferId) {
        self.slot_index.insert(id, 0);
    }

    fn slot(&self, id: BufferId) -> Result<usize, ModelError> {
        self.slot_index.get(&id).copied().ok_or_else(|| {
            ModelError::InvalidGraph(format!("buffer {id} is used before it is produced"))
        })
    }

    fn allocate(&mut self, id: BufferId) -> usize {
        let idx = self.slot_index.len();
        self.slot_index.insert(id, idx);
        idx
    }

    /// Returns the layer index for an operation, creating the layer config on
    /// first use. Re-applying an operation shares its layer, so the config
    /// must match.
    fn layer<C: PartialEq + std::fmt::Debug>(
        layer_index: &mut HashMap<OpId, usize>,
        configs: &mut Vec<C>,
        op_id: OpId,
        config: C,
    ) -> Result<usize, ModelError> {
        if let Some(&idx) = layer_index.get(&op_id) {
            if configs[idx] != config {
                return Err(ModelError::InvalidGraph(format!(
                    "operation {op_id} is shared between incompatible inputs: {:?} vs {config:?}",
                    configs[idx]
                )));
            }
            return Ok(idx);
        }
        let idx = configs.len();
        log::debug!("Initializing layer {config:?}");
        configs.push(config);
        layer_index.insert(op_id, idx);
        Ok(idx)
    }

    fn visit(&mut self, buffer: &DataBuffer) -> Result<(), ModelError> {
        if self.slot_index.contains_key(&buffer.id()) {
            return Ok(());
        }

        let Some(producer) = buffer.producer() else {
            return Err(ModelError::InvalidGraph(
                "Buffer has no producer and is not a registered input".to_string(),
            ));
        };

        let inputs: Vec<usize> = buffer
            .inputs()
            .iter()
            .map(|b| self.slot(b.id()))
            .collect::<Result<_, _>>()?;
        let input_shape = buffer.inputs()[0].shape();
        let output = self.allocate(buffer.id());

        let step = match producer {
            Operation::Conv1d {
                id,
                filters,
                kernel_size,
                activation,
                padding,
            } => {
                let config = Conv1dLayerConfig::new(input_shape[1], *filters, *kernel_size)
                    .with_activation(*activation)
                    .with_padding(*padding);
                let layer = Self::layer(&mut self.layer_index, &mut self.convs, *id, config)?;
                Step::Conv1d {
                    layer,
                    input: inputs[0],
                    output,
                }
            }
            Operation::MaxPool1d { id, pool_size } => {
                let config = MaxPoolLayerConfig::new(*pool_size);
                let layer = Self::layer(&mut self.layer_index, &mut self.pools, *id, config)?;
                Step::MaxPool1d {
                    layer,
                    input: inputs[0],
                    output,
                }
            }
            Operation::Flatten { .. } => Step::Flatten {
                input: inputs[0],
                output,
            },
            Operation::Dense {
                id,
                units,
                activation,
            } => {
                let config = DenseConfig::new(input_shape[0], *units).with_activation(*activation);
                let layer = Self::layer(&mut self.layer_index, &mut self.denses, *id, config)?;
                Step::Dense {
                    layer,
                    input: inputs[0],
                    output,
                }
            }
            Operation::Reshape { shape, .. } => Step::Reshape {
                input: inputs[0],
                output,
                shape: shape.clone(),
            },
            Operation::Concatenate { .. } => Step::Concat { inputs, output },
            Operation::CoordinateChannel { .. } => Step::CoordinateChannel {
                input: inputs[0],
                output,
            },
        };

        self.steps.push(step);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::buffer::InputBuffer;
    use crate::graph::operation::ops;
    use crate::layers::{Activation, Padding};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_simple_sequence_model() {
        let device = <TestBackend as Backend>::Device::default();

        let input = InputBuffer::new(vec![16, 1]);
        let x = ops::conv1d(4, 3, Activation::Relu, Padding::Valid, input.buffer()).unwrap();
        let x = ops::max_pool1d(2, x).unwrap();
        let x = ops::flatten(x).unwrap();
        let output = ops::dense(3, Activation::Softmax, x).unwrap();
        let graph = ModelGraph::new("simple", input, output).unwrap();

        let model = graph
            .compile::<TestBackend>(&device)
            .expect("Model creation should succeed");

        let input_tensor = Tensor::<TestBackend, 3>::ones([2, 16, 1], &device);
        let output_tensor = model.forward(input_tensor);
        assert_eq!(output_tensor.dims(), [2, 3]);

        let output_data: Vec<f32> = output_tensor.to_data().to_vec().unwrap();
        let sum: f32 = output_data[..3].iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "Softmax output should sum to 1");
    }

    #[test]
    fn test_flat_model() {
        let device = <TestBackend as Backend>::Device::default();

        let input = InputBuffer::new(vec![4]);
        let x = ops::dense(8, Activation::Relu, input.buffer()).unwrap();
        let output = ops::dense(1, Activation::Sigmoid, x).unwrap();
        let model = ModelGraph::new("flat", input, output)
            .unwrap()
            .compile::<TestBackend>(&device)
            .unwrap();

        let input_tensor = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0, 3.0, 4.0]], &device);
        let output_tensor = model.forward_flat(input_tensor);
        assert_eq!(output_tensor.dims(), [1, 1]);
    }

    #[test]
    fn test_forward_flat_on_sequence_graph() {
        let device = <TestBackend as Backend>::Device::default();

        let input = InputBuffer::new(vec![8, 1]);
        let x = ops::conv1d(2, 3, Activation::Relu, Padding::Valid, input.buffer()).unwrap();
        let x = ops::flatten(x).unwrap();
        let output = ops::dense(3, Activation::Softmax, x).unwrap();
        let model = ModelGraph::new("sequence", input, output)
            .unwrap()
            .compile::<TestBackend>(&device)
            .unwrap();

        let rows = [[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]];
        let flat: Vec<f32> = model
            .forward_flat(Tensor::<TestBackend, 2>::from_floats(rows, &device))
            .to_data()
            .to_vec()
            .unwrap();
        let sequence: Vec<f32> = model
            .forward(Tensor::<TestBackend, 2>::from_floats(rows, &device).reshape([1, 8, 1]))
            .to_data()
            .to_vec()
            .unwrap();

        assert_eq!(flat.len(), 3);
        for (a, b) in flat.iter().zip(sequence.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reshape_and_concat_residual() {
        let device = <TestBackend as Backend>::Device::default();

        let input = InputBuffer::new(vec![16, 1]);
        let x = ops::conv1d(3, 3, Activation::Relu, Padding::Same, input.buffer()).unwrap();
        let x = ops::max_pool1d(4, x).unwrap();
        let skip = ops::reshape(vec![4, 4], input.buffer()).unwrap();
        let x = ops::concat(vec![x, skip]).unwrap();
        assert_eq!(x.shape(), &[4, 7]);
        let x = ops::flatten(x).unwrap();
        let output = ops::dense(2, Activation::Softmax, x).unwrap();
        let model = ModelGraph::new("residual", input, output)
            .unwrap()
            .compile::<TestBackend>(&device)
            .unwrap();

        let output_tensor = model.forward(Tensor::<TestBackend, 3>::ones([5, 16, 1], &device));
        assert_eq!(output_tensor.dims(), [5, 2]);
    }

    #[test]
    fn test_flat_reshape_roundtrip_keeps_order() {
        let device = <TestBackend as Backend>::Device::default();

        let value = Value::Sequence(Tensor::<TestBackend, 3>::from_floats(
            [[[1.0], [2.0], [3.0], [4.0]]],
            &device,
        ));
        let reshaped = value.reshape(&[2, 2]).into_sequence();
        assert_eq!(reshaped.dims(), [1, 2, 2]);

        let values: Vec<f32> = reshaped.to_data().to_vec().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_shared_dense_weights() {
        let device = <TestBackend as Backend>::Device::default();

        let input = InputBuffer::new(vec![4]);
        let shared = Operation::dense(4, Activation::Relu);
        let a = shared.apply(input.buffer()).unwrap();
        let b = shared.apply(a.clone()).unwrap();
        let joined = ops::concat(vec![a, b]).unwrap();
        let output = ops::dense(1, Activation::Linear, joined).unwrap();
        let model = ModelGraph::new("shared", input, output)
            .unwrap()
            .compile::<TestBackend>(&device)
            .unwrap();

        // one shared 4x4 layer plus the 8x1 head
        assert_eq!(model.num_params(), (16 + 4) + (8 + 1));
    }

    #[test]
    fn test_shared_layer_param_count_matches_burn() {
        let device = <TestBackend as Backend>::Device::default();

        let input = InputBuffer::new(vec![4]);
        let shared = Operation::dense(4, Activation::Relu);
        let a = shared.apply(input.buffer()).unwrap();
        let b = shared.apply(a.clone()).unwrap();
        let joined = ops::concat(vec![a, b]).unwrap();
        let output = ops::dense(1, Activation::Linear, joined).unwrap();
        let graph = ModelGraph::new("shared", input, output).unwrap();
        let model = graph.compile::<TestBackend>(&device).unwrap();

        assert_eq!(graph.count_params(), model.num_params());
    }

    #[test]
    fn test_shared_layer_with_incompatible_inputs() {
        let device = <TestBackend as Backend>::Device::default();

        let input = InputBuffer::new(vec![4]);
        let shared = Operation::dense(2, Activation::Relu);
        let a = shared.apply(input.buffer()).unwrap();
        let b = shared.apply(a.clone()).unwrap();
        let joined = ops::concat(vec![a, b]).unwrap();
        let output = ops::dense(1, Activation::Linear, joined).unwrap();

        let result = ModelGraph::new("mismatch", input, output)
            .unwrap()
            .compile::<TestBackend>(&device);
        assert!(matches!(result, Err(ModelError::InvalidGraph(_))));
    }

    #[test]
    fn test_predict_splits_rows() {
        let device = <TestBackend as Backend>::Device::default();

        let input = InputBuffer::new(vec![8, 1]);
        let x = ops::flatten(input.buffer()).unwrap();
        let output = ops::dense(4, Activation::Softmax, x).unwrap();
        let model = ModelGraph::new("predict", input, output)
            .unwrap()
            .compile::<TestBackend>(&device)
            .unwrap();

        let samples = vec![vec![0.5; 8], vec![-1.0; 8], vec![2.0; 8]];
        let outputs = model.predict(&samples, &device).unwrap();

        assert_eq!(outputs.len(), 3);
        for row in &outputs {
            assert_eq!(row.len(), 4);
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_predict_rejects_wrong_length() {
        let device = <TestBackend as Backend>::Device::default();

        let input = InputBuffer::new(vec![8, 1]);
        let x = ops::flatten(input.buffer()).unwrap();
        let output = ops::dense(2, Activation::Softmax, x).unwrap();
        let model = ModelGraph::new("predict", input, output)
            .unwrap()
            .compile::<TestBackend>(&device)
            .unwrap();

        let result = model.predict(&[vec![0.0; 7]], &device);
        assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
        assert!(model.predict(&[], &device).unwrap().is_empty());
    }
}
