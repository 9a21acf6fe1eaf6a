//! 1-D convolution layer operating on channels-last sequences.

use crate::layers::{Activation, Padding};
use burn::{
    module::Module,
    nn::conv::{Conv1d, Conv1dConfig},
    tensor::{Tensor, backend::Backend},
};

/// Configuration for a Conv1dLayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conv1dLayerConfig {
    /// Number of input channels.
    pub channels_in: usize,
    /// Number of filters (output channels).
    pub filters: usize,
    /// Width of the convolution window.
    pub kernel_size: usize,
    /// Activation function applied after the convolution.
    pub activation: Activation,
    /// Padding mode.
    pub padding: Padding,
}

impl Conv1dLayerConfig {
    /// Creates a new Conv1dLayerConfig with valid padding and no activation.
    pub fn new(channels_in: usize, filters: usize, kernel_size: usize) -> Self {
        Self {
            channels_in,
            filters,
            kernel_size,
            activation: Activation::Linear,
            padding: Padding::Valid,
        }
    }

    /// Sets the activation function.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Sets the padding mode.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Number of trainable parameters (kernel plus bias).
    pub fn param_count(&self) -> usize {
        self.kernel_size * self.channels_in * self.filters + self.filters
    }

    /// Initializes the layer with the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Conv1dLayer<B> {
        let conv = Conv1dConfig::new(self.channels_in, self.filters, self.kernel_size)
            .with_padding(self.padding.to_burn())
            .init(device);

        Conv1dLayer {
            conv,
            channels_in: self.channels_in,
            filters: self.filters,
            kernel_size: self.kernel_size,
            activation_id: self.activation.to_id(),
            padding_id: self.padding.to_id(),
        }
    }
}

/// A 1-D convolution followed by an activation.
///
/// Inputs and outputs are channels-last (`[batch, steps, channels]`), the
/// layout the graph uses throughout; burn's convolution expects channels
/// first, so the forward pass transposes around it.
#[derive(Module, Debug)]
pub struct Conv1dLayer<B: Backend> {
    conv: Conv1d<B>,
    channels_in: usize,
    filters: usize,
    kernel_size: usize,
    activation_id: u8,
    padding_id: u8,
}

impl<B: Backend> Conv1dLayer<B> {
    /// Performs the forward pass.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let output = self.conv.forward(input.swap_dims(1, 2));
        self.activation().apply(output).swap_dims(1, 2)
    }

    /// Returns the number of input channels.
    pub fn channels_in(&self) -> usize {
        self.channels_in
    }

    /// Returns the number of filters.
    pub fn filters(&self) -> usize {
        self.filters
    }

    /// Returns the kernel width.
    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// Returns the activation function.
    pub fn activation(&self) -> Activation {
        Activation::from_id(self.activation_id)
    }

    /// Returns the padding mode.
    pub fn padding(&self) -> Padding {
        Padding::from_id(self.padding_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_conv_config_creation() {
        let config = Conv1dLayerConfig::new(1, 32, 3)
            .with_activation(Activation::Relu)
            .with_padding(Padding::Same);

        assert_eq!(config.channels_in, 1);
        assert_eq!(config.filters, 32);
        assert_eq!(config.kernel_size, 3);
        assert_eq!(config.activation, Activation::Relu);
        assert_eq!(config.padding, Padding::Same);
    }

    #[test]
    fn test_conv_param_count() {
        assert_eq!(Conv1dLayerConfig::new(1, 32, 3).param_count(), 128);
        assert_eq!(Conv1dLayerConfig::new(32, 64, 3).param_count(), 6208);
        assert_eq!(Conv1dLayerConfig::new(1, 20, 28).param_count(), 580);
    }

    #[test]
    fn test_conv_valid_forward_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let layer: Conv1dLayer<TestBackend> = Conv1dLayerConfig::new(1, 8, 3)
            .with_activation(Activation::Relu)
            .init(&device);

        let input = Tensor::<TestBackend, 3>::zeros([2, 16, 1], &device);
        let output = layer.forward(input);

        assert_eq!(output.dims(), [2, 14, 8]);
    }

    #[test]
    fn test_conv_same_forward_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let layer: Conv1dLayer<TestBackend> = Conv1dLayerConfig::new(2, 4, 3)
            .with_padding(Padding::Same)
            .init(&device);

        let input = Tensor::<TestBackend, 3>::ones([3, 10, 2], &device);
        let output = layer.forward(input);

        assert_eq!(output.dims(), [3, 10, 4]);
        assert_eq!(layer.padding(), Padding::Same);
    }

    #[test]
    fn test_conv_params_match_config() {
        let device = <TestBackend as Backend>::Device::default();
        let config = Conv1dLayerConfig::new(32, 64, 3);
        let layer: Conv1dLayer<TestBackend> = config.init(&device);

        assert_eq!(layer.num_params(), config.param_count());
    }
}
