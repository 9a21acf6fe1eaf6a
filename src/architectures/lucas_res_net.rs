//! LucasCNN variant with a skip connection from the raw spectrum.
//!
//! "Same" padding keeps the convolution branch at 256 / 2^4 = 16 steps, so
//! the raw input reshaped to 16 x 16 can be concatenated channel-wise.

use super::{NUM_CLASSES, SEQ_LENGTH, conv_block};
use crate::errors::ModelError;
use crate::graph::{InputBuffer, ModelGraph, ops};
use crate::layers::{Activation, Padding};

/// Shape of the raw input on the skip connection.
pub const RESIDUAL_SHAPE: [usize; 2] = [16, 16];

/// Same-padded convolution blocks joined with the reshaped input, then a 150/100 dense head.
pub fn lucas_res_net() -> Result<ModelGraph, ModelError> {
    let input = InputBuffer::new(vec![SEQ_LENGTH, 1]);

    let mut x = input.buffer();
    for filters in [32, 32, 64, 64] {
        x = conv_block(filters, Activation::Relu, Padding::Same, x)?;
    }

    let skip = ops::reshape(RESIDUAL_SHAPE.to_vec(), input.buffer())?;
    let x = ops::concat(vec![x, skip])?;

    let x = ops::flatten(x)?;
    let x = ops::dense(150, Activation::Relu, x)?;
    let x = ops::dense(100, Activation::Relu, x)?;
    let output = ops::dense(NUM_CLASSES, Activation::Softmax, x)?;

    ModelGraph::new("LucasResNet", input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LayerKind;

    #[test]
    fn test_residual_reshape_is_lossless() {
        assert_eq!(RESIDUAL_SHAPE.iter().product::<usize>(), SEQ_LENGTH);

        let summary = lucas_res_net().unwrap().summary();
        let reshape = summary.layer("reshape").unwrap();
        assert_eq!(reshape.output_shape, RESIDUAL_SHAPE.to_vec());
        assert_eq!(reshape.inbound, vec!["input".to_string()]);
    }

    #[test]
    fn test_concatenation() {
        let summary = lucas_res_net().unwrap().summary();
        let concat = summary.layer("concatenate").unwrap();

        assert_eq!(concat.output_shape, vec![16, 80]);
        assert_eq!(
            concat.inbound,
            vec!["max_pooling1d_3".to_string(), "reshape".to_string()]
        );
        assert_eq!(summary.layer("flatten").unwrap().output_shape, vec![1280]);
    }

    #[test]
    fn test_layers() {
        let graph = lucas_res_net().unwrap();

        assert_eq!(graph.count_layers(LayerKind::Conv1d), 4);
        assert_eq!(graph.count_layers(LayerKind::MaxPooling1d), 4);
        assert_eq!(graph.count_layers(LayerKind::Reshape), 1);
        assert_eq!(graph.count_layers(LayerKind::Concatenate), 1);
        assert_eq!(graph.count_layers(LayerKind::Dense), 3);
    }
}
