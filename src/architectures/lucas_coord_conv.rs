use super::{NUM_CLASSES, SEQ_LENGTH, conv_block};
use crate::errors::ModelError;
use crate::graph::{InputBuffer, ModelGraph, ops};
use crate::layers::{Activation, Padding};

/// LucasCNN with a coordinate channel in front of the first convolution,
/// wider filters (32, 64, 64, 128) and a 256/128 dense head.
pub fn lucas_coord_conv() -> Result<ModelGraph, ModelError> {
    let input = InputBuffer::new(vec![SEQ_LENGTH, 1]);

    let mut x = ops::coordinate_channel(input.buffer())?;
    for filters in [32, 64, 64, 128] {
        x = conv_block(filters, Activation::Relu, Padding::Valid, x)?;
    }

    let x = ops::flatten(x)?;
    let x = ops::dense(256, Activation::Relu, x)?;
    let x = ops::dense(128, Activation::Relu, x)?;
    let output = ops::dense(NUM_CLASSES, Activation::Softmax, x)?;

    ModelGraph::new("LucasCoordConv", input, output)
}
