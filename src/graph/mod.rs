//! Functional graph API for building neural networks.
//!
//! Buffers are symbolic tensors with a static per-sample shape; operations
//! consume buffers and produce new ones. A `ModelGraph` captures the path from
//! an input to an output and compiles to burn layers on demand.
//!
//! # Example
//!
//! ```
//! use lucasnet::graph::{InputBuffer, ModelGraph, ops};
//! use lucasnet::layers::{Activation, Padding};
//! use burn::backend::NdArray;
//! use burn::tensor::{Tensor, backend::Backend};
//!
//! type TestBackend = NdArray;
//! let device = <TestBackend as Backend>::Device::default();
//!
//! // Create input and build graph (no device needed)
//! let input = InputBuffer::new(vec![64, 1]);
//! let x = ops::conv1d(16, 3, Activation::Relu, Padding::Same, input.buffer())?;
//! let x = ops::max_pool1d(2, x)?;
//! let skip = ops::reshape(vec![32, 2], input.buffer())?;
//! let x = ops::concat(vec![x, skip])?;
//! let x = ops::flatten(x)?;
//! let output = ops::dense(4, Activation::Softmax, x)?;
//! let graph = ModelGraph::new("example", input, output)?;
//!
//! // Compile to create weights on device
//! let model = graph.compile::<TestBackend>(&device)?;
//! let probs = model.forward(Tensor::zeros([8, 64, 1], &device));
//! assert_eq!(probs.dims(), [8, 4]);
//! # Ok::<(), lucasnet::ModelError>(())
//! ```

mod buffer;
mod core;
mod model;
mod operation;
mod summary;

pub use buffer::{BufferId, DataBuffer, InputBuffer};
pub use core::{GraphId, ModelGraph};
pub use model::CompiledModel;
pub use operation::{LayerKind, OpId, Operation, ops};
pub use summary::{GraphSummary, LayerSummary};
