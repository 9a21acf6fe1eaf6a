//! Padding modes for 1-D convolutions.

use burn::nn::PaddingConfig1d;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Padding mode of a 1-D convolution, with Keras semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    /// No padding; the output shrinks by `kernel_size - 1` steps.
    #[default]
    Valid,
    /// Zero padding so that the output keeps the input length.
    Same,
}

impl Padding {
    /// Returns the number of output steps for a stride-1 convolution.
    pub fn output_length(&self, steps: usize, kernel_size: usize) -> Result<usize, ModelError> {
        if kernel_size == 0 {
            return Err(ModelError::invalid_layer("kernel size must be positive"));
        }
        match self {
            Padding::Valid => {
                if kernel_size > steps {
                    return Err(ModelError::invalid_layer(format!(
                        "kernel size {kernel_size} exceeds input length {steps} with valid padding"
                    )));
                }
                Ok(steps - kernel_size + 1)
            }
            Padding::Same => {
                // burn only pads symmetrically
                if kernel_size % 2 == 0 {
                    return Err(ModelError::invalid_layer(format!(
                        "same padding requires an odd kernel size, got {kernel_size}"
                    )));
                }
                Ok(steps)
            }
        }
    }

    /// Returns the Keras name of the padding mode.
    pub fn name(&self) -> &'static str {
        match self {
            Padding::Valid => "valid",
            Padding::Same => "same",
        }
    }

    pub(crate) fn to_burn(self) -> PaddingConfig1d {
        match self {
            Padding::Valid => PaddingConfig1d::Valid,
            Padding::Same => PaddingConfig1d::Same,
        }
    }

    pub(crate) fn to_id(self) -> u8 {
        match self {
            Padding::Valid => 0,
            Padding::Same => 1,
        }
    }

    pub(crate) fn from_id(id: u8) -> Self {
        match id {
            1 => Padding::Same,
            _ => Padding::Valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_output_length() {
        assert_eq!(Padding::Valid.output_length(256, 3).unwrap(), 254);
        assert_eq!(Padding::Valid.output_length(256, 28).unwrap(), 229);
        assert_eq!(Padding::Valid.output_length(3, 3).unwrap(), 1);
    }

    #[test]
    fn test_valid_kernel_too_large() {
        let result = Padding::Valid.output_length(2, 3);
        assert!(matches!(result, Err(ModelError::InvalidLayerConfig { .. })));
    }

    #[test]
    fn test_same_output_length() {
        assert_eq!(Padding::Same.output_length(256, 3).unwrap(), 256);
        assert_eq!(Padding::Same.output_length(2, 5).unwrap(), 2);
    }

    #[test]
    fn test_same_rejects_even_kernel() {
        assert!(Padding::Same.output_length(256, 4).is_err());
    }

    #[test]
    fn test_zero_kernel_rejected() {
        assert!(Padding::Valid.output_length(256, 0).is_err());
        assert!(Padding::Same.output_length(256, 0).is_err());
    }

    #[test]
    fn test_id_roundtrip() {
        for padding in [Padding::Valid, Padding::Same] {
            assert_eq!(Padding::from_id(padding.to_id()), padding);
        }
    }
}
