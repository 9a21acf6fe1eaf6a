//! The named 1-D CNN architectures and the model factory.
//!
//! Every architecture takes a `[SEQ_LENGTH, 1]` spectrum and ends in a
//! `NUM_CLASSES`-way softmax.
//!
//! # Example
//!
//! ```
//! use lucasnet::architectures::{Architecture, get_model};
//!
//! let graph = get_model("LucasCNN")?;
//! assert_eq!(graph.input_shape(), &[256, 1]);
//! assert_eq!(graph.output_shape(), &[4]);
//!
//! let arch: Architecture = "LucasResNet".parse()?;
//! assert_eq!(arch.build()?.name(), "LucasResNet");
//! # Ok::<(), lucasnet::ModelError>(())
//! ```

mod hu_et_al;
mod liu_et_al;
mod lucas_cnn;
mod lucas_coord_conv;
mod lucas_res_net;

use std::fmt;
use std::str::FromStr;

use crate::errors::ModelError;
use crate::graph::{DataBuffer, ModelGraph, ops};
use crate::layers::{Activation, Padding};

pub use hu_et_al::{hu_et_al, hu_et_al_kernel_size, hu_et_al_pool_size};
pub use liu_et_al::liu_et_al;
pub use lucas_cnn::lucas_cnn;
pub use lucas_coord_conv::lucas_coord_conv;
pub use lucas_res_net::{RESIDUAL_SHAPE, lucas_res_net};

/// Number of time steps (spectral bands) per input sample.
pub const SEQ_LENGTH: usize = 256;

/// Number of output classes.
pub const NUM_CLASSES: usize = 4;

/// One of the five named model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    /// 1-D CNN by Hu et al. (2015).
    HuEtAl,
    /// 1-D CNN by Liu et al. (2018).
    LiuEtAl,
    /// Four convolution blocks with a two-layer dense head.
    LucasCnn,
    /// LucasCnn with "same" padding and a skip connection from the raw input.
    LucasResNet,
    /// LucasCnn with a coordinate channel prepended to the input.
    LucasCoordConv,
}

impl Architecture {
    /// All architectures, in factory order.
    pub const ALL: [Architecture; 5] = [
        Architecture::LucasCnn,
        Architecture::HuEtAl,
        Architecture::LiuEtAl,
        Architecture::LucasResNet,
        Architecture::LucasCoordConv,
    ];

    /// Returns the name the factory knows this architecture by.
    pub fn name(&self) -> &'static str {
        match self {
            Architecture::HuEtAl => "HuEtAl",
            Architecture::LiuEtAl => "LiuEtAl",
            Architecture::LucasCnn => "LucasCNN",
            Architecture::LucasResNet => "LucasResNet",
            Architecture::LucasCoordConv => "LucasCoordConv",
        }
    }

    /// Builds a fresh, uncompiled graph of this architecture.
    pub fn build(&self) -> Result<ModelGraph, ModelError> {
        match self {
            Architecture::HuEtAl => hu_et_al(),
            Architecture::LiuEtAl => liu_et_al(),
            Architecture::LucasCnn => lucas_cnn(),
            Architecture::LucasResNet => lucas_res_net(),
            Architecture::LucasCoordConv => lucas_coord_conv(),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Architecture {
    type Err = ModelError;

    /// Names are matched exactly (case-sensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Architecture::ALL
            .into_iter()
            .find(|arch| arch.name() == s)
            .ok_or_else(|| ModelError::UnknownModel {
                name: s.to_string(),
            })
    }
}

/// Returns the graph of the architecture called `name`.
///
/// Unknown names are logged and reported as [`ModelError::UnknownModel`].
pub fn get_model(name: &str) -> Result<ModelGraph, ModelError> {
    let arch = name.parse::<Architecture>().inspect_err(|_| {
        log::error!("Model {name} not implemented.");
    })?;
    log::debug!("Building model {arch}");
    arch.build()
}

/// Convolution followed by non-overlapping max pooling of width 2.
fn conv_block(
    filters: usize,
    activation: Activation,
    padding: Padding,
    input: DataBuffer,
) -> Result<DataBuffer, ModelError> {
    let x = ops::conv1d(filters, 3, activation, padding, input)?;
    ops::max_pool1d(2, x)
}
