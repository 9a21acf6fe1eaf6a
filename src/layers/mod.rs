//! Neural network layer implementations.
//!
//! Building blocks used when a graph is compiled: convolution, pooling and
//! dense layers backed by burn modules, plus activation and padding modes and
//! the coordinate channel.

pub mod activation;
pub mod conv;
pub mod coord;
pub mod dense;
pub mod padding;
pub mod pool;

pub use activation::Activation;
pub use conv::{Conv1dLayer, Conv1dLayerConfig};
pub use coord::coordinate_channel;
pub use dense::{Dense, DenseConfig};
pub use padding::Padding;
pub use pool::{MaxPoolLayer, MaxPoolLayerConfig, pooled_length};
