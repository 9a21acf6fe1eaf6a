//! Coordinate channel for 1-D sequences (CoordConv).
//!
//! Appends one channel holding the normalized position of every step, so the
//! following convolutions can condition on where in the sequence they are.

use burn::tensor::{Tensor, backend::Backend};

/// Position values for `steps` steps, linearly spaced over `[-1, 1]`.
pub fn coordinates(steps: usize) -> Vec<f32> {
    if steps < 2 {
        return vec![-1.0; steps];
    }
    let last = (steps - 1) as f32;
    (0..steps).map(|i| 2.0 * i as f32 / last - 1.0).collect()
}

/// Concatenates the coordinate channel to a `[batch, steps, channels]` tensor.
pub fn coordinate_channel<B: Backend>(input: Tensor<B, 3>) -> Tensor<B, 3> {
    let [batch, steps, _] = input.dims();
    let coords = coordinates(steps);
    let data: Vec<f32> = (0..batch).flat_map(|_| coords.iter().copied()).collect();

    let channel =
        Tensor::<B, 1>::from_floats(data.as_slice(), &input.device()).reshape([batch, steps, 1]);
    Tensor::cat(vec![input, channel], 2)
}
