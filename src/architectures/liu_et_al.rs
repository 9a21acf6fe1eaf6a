//! 1-D CNN by Lanfa Liu et al. (2018).

use super::{NUM_CLASSES, SEQ_LENGTH, conv_block};
use crate::errors::ModelError;
use crate::graph::{InputBuffer, ModelGraph, ops};
use crate::layers::{Activation, Padding};

/// Four relu convolution blocks feeding the softmax directly.
pub fn liu_et_al() -> Result<ModelGraph, ModelError> {
    let input = InputBuffer::new(vec![SEQ_LENGTH, 1]);

    let mut x = input.buffer();
    for filters in [32, 32, 64, 64] {
        x = conv_block(filters, Activation::Relu, Padding::Valid, x)?;
    }

    let x = ops::flatten(x)?;
    let output = ops::dense(NUM_CLASSES, Activation::Softmax, x)?;

    ModelGraph::new("LiuEtAl", input, output)
}
