//! # lucasnet
//!
//! 1-D convolutional network architectures for classifying soil spectra,
//! built on the [burn](https://burn.dev) framework.
//!
//! The crate provides five named architectures (`HuEtAl`, `LiuEtAl`,
//! `LucasCNN`, `LucasResNet`, `LucasCoordConv`) on top of a small functional
//! graph API. Graphs are pure structure: they carry shapes and layer
//! hyperparameters, and are compiled to burn modules on a chosen device.
//!
//! ## Features
//!
//! - **Burn Backend**: Uses the Burn framework with WGPU backend for GPU acceleration
//!   without external dependencies.
//! - **Keras-style graphs**: layers are applied to symbolic buffers, shapes are
//!   checked as the graph is built, and summaries name layers like Keras does.
//! - **Trainable output**: compiled models are ordinary burn modules.
//!
//! ## Example
//!
//! ```
//! use lucasnet::prelude::*;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray;
//!
//! let device = <Backend as burn::tensor::backend::Backend>::Device::default();
//!
//! let graph = get_model("LiuEtAl")?;
//! assert_eq!(graph.count_layers(LayerKind::Conv1d), 4);
//!
//! let model = graph.compile::<Backend>(&device)?;
//! let probs = model.forward(Tensor::zeros([2, 256, 1], &device));
//! assert_eq!(probs.dims(), [2, 4]);
//! # Ok::<(), lucasnet::ModelError>(())
//! ```

pub mod architectures;
pub mod errors;
pub mod graph;
pub mod layers;

// Re-exports for convenience
pub use architectures::{Architecture, get_model};
pub use errors::ModelError;
pub use graph::{CompiledModel, ModelGraph};
pub use layers::{Activation, Padding};

/// Backend type alias for WGPU with autodiff support.
pub type Backend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Backend type for inference (no autodiff).
pub type InferenceBackend = burn::backend::Wgpu;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::architectures::{Architecture, NUM_CLASSES, SEQ_LENGTH, get_model};
    pub use crate::errors::ModelError;
    pub use crate::graph::{CompiledModel, InputBuffer, LayerKind, ModelGraph, ops};
    pub use crate::layers::{Activation, Padding};
    pub use crate::{Backend, InferenceBackend};
}
