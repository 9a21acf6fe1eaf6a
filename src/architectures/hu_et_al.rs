//! 1-D CNN by Wei Hu et al. (2015).

use super::{NUM_CLASSES, SEQ_LENGTH};
use crate::errors::ModelError;
use crate::graph::{InputBuffer, ModelGraph, ops};
use crate::layers::{Activation, Padding};

const FILTERS: usize = 20;
const HIDDEN_UNITS: usize = 100;

/// Convolution width k1 = SEQ_LENGTH / 9, as defined by Hu et al.
pub const fn hu_et_al_kernel_size() -> usize {
    SEQ_LENGTH / 9
}

/// Pool width k2 = floor((SEQ_LENGTH - k1 + 1) / 35), as defined by Hu et al.
pub const fn hu_et_al_pool_size() -> usize {
    (SEQ_LENGTH - hu_et_al_kernel_size() + 1) / 35
}

/// One tanh convolution, one pooling layer and a 100-unit tanh dense layer.
pub fn hu_et_al() -> Result<ModelGraph, ModelError> {
    let input = InputBuffer::new(vec![SEQ_LENGTH, 1]);

    let x = ops::conv1d(
        FILTERS,
        hu_et_al_kernel_size(),
        Activation::Tanh,
        Padding::Valid,
        input.buffer(),
    )?;
    let x = ops::max_pool1d(hu_et_al_pool_size(), x)?;

    let x = ops::flatten(x)?;
    let x = ops::dense(HIDDEN_UNITS, Activation::Tanh, x)?;
    let output = ops::dense(NUM_CLASSES, Activation::Softmax, x)?;

    ModelGraph::new("HuEtAl", input, output)
}
