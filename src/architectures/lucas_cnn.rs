use super::{NUM_CLASSES, SEQ_LENGTH, conv_block};
use crate::errors::ModelError;
use crate::graph::{InputBuffer, ModelGraph, ops};
use crate::layers::{Activation, Padding};

/// Four valid-padded relu convolution blocks and a 120/160 dense head.
pub fn lucas_cnn() -> Result<ModelGraph, ModelError> {
    let input = InputBuffer::new(vec![SEQ_LENGTH, 1]);

    let mut x = input.buffer();
    for filters in [32, 32, 64, 64] {
        x = conv_block(filters, Activation::Relu, Padding::Valid, x)?;
    }

    let x = ops::flatten(x)?;
    let x = ops::dense(120, Activation::Relu, x)?;
    let x = ops::dense(160, Activation::Relu, x)?;
    let output = ops::dense(NUM_CLASSES, Activation::Softmax, x)?;

    ModelGraph::new("LucasCNN", input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LayerKind;

    #[test]
    fn test_layers() {
        let graph = lucas_cnn().unwrap();

        assert_eq!(graph.count_layers(LayerKind::Conv1d), 4);
        assert_eq!(graph.count_layers(LayerKind::MaxPooling1d), 4);
        assert_eq!(graph.count_layers(LayerKind::Dense), 3);
        assert_eq!(graph.count_layers(LayerKind::Concatenate), 0);
    }

    #[test]
    fn test_dense_head() {
        let summary = lucas_cnn().unwrap().summary();

        assert_eq!(summary.layer("flatten").unwrap().output_shape, vec![896]);
        assert_eq!(summary.layer("dense").unwrap().output_shape, vec![120]);
        assert_eq!(summary.layer("dense_1").unwrap().output_shape, vec![160]);
        assert_eq!(summary.layer("dense_2").unwrap().output_shape, vec![4]);
    }
}
