//! DataBuffer and InputBuffer - core graph node types.
//!
//! A buffer is a symbolic tensor: it knows its per-sample shape (the batch
//! dimension is implicit) and the operation that produced it, but holds no
//! data.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::operation::Operation;

/// Global counter for unique buffer IDs.
static BUFFER_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique identifier for a DataBuffer.
pub type BufferId = usize;

/// DataBuffer represents a node in the computation graph.
///
/// It tracks:
/// - The per-sample shape of the data
/// - The operation that produced it (if any)
/// - The input buffers used by that operation
#[derive(Clone, Debug)]
pub struct DataBuffer {
    id: BufferId,
    shape: Vec<usize>,
    producer: Option<Operation>,
    inputs: Vec<DataBuffer>,
}

impl DataBuffer {
    /// Creates a new DataBuffer with the given shape and producer.
    pub(crate) fn new(shape: Vec<usize>, producer: Option<Operation>, inputs: Vec<DataBuffer>) -> Self {
        Self {
            id: BUFFER_ID_COUNTER.fetch_add(1, Ordering::SeqCst),
            shape,
            producer,
            inputs,
        }
    }

    /// Returns the unique ID of this buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Returns the per-sample shape of this buffer.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions, batch excluded.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the number of elements per sample.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns true if this is an input buffer (no producer).
    pub fn is_input(&self) -> bool {
        self.producer.is_none()
    }

    /// Returns the producer operation, if any.
    pub fn producer(&self) -> Option<&Operation> {
        self.producer.as_ref()
    }

    /// Returns the input buffers.
    pub fn inputs(&self) -> &[DataBuffer] {
        &self.inputs
    }
}

/// InputBuffer represents the input of the computation graph.
#[derive(Clone, Debug)]
pub struct InputBuffer {
    buffer: DataBuffer,
}

impl InputBuffer {
    /// Creates a new InputBuffer with the given per-sample shape.
    ///
    /// A `[steps, channels]` shape feeds sequence layers, a `[features]`
    /// shape feeds dense layers.
    pub fn new(shape: Vec<usize>) -> Self {
        Self {
            buffer: DataBuffer::new(shape, None, vec![]),
        }
    }

    /// Returns the DataBuffer for use in graph building.
    pub fn buffer(&self) -> DataBuffer {
        self.buffer.clone()
    }

    /// Returns the per-sample shape of this input.
    pub fn shape(&self) -> &[usize] {
        &self.buffer.shape
    }

    /// Returns the number of elements per sample.
    pub fn size(&self) -> usize {
        self.buffer.size()
    }

    /// Returns the buffer ID.
    pub fn id(&self) -> BufferId {
        self.buffer.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_buffer_creation() {
        let input = InputBuffer::new(vec![256, 1]);
        assert_eq!(input.shape(), &[256, 1]);
        assert_eq!(input.size(), 256);
        assert!(input.buffer().is_input());
        assert_eq!(input.buffer().rank(), 2);
    }

    #[test]
    fn test_buffer_ids_are_unique() {
        let input1 = InputBuffer::new(vec![4]);
        let input2 = InputBuffer::new(vec![4]);
        assert_ne!(input1.id(), input2.id());
    }

    #[test]
    fn test_data_buffer_clone() {
        let input = InputBuffer::new(vec![4]);
        let buf1 = input.buffer();
        let buf2 = input.buffer();
        assert_eq!(buf1.id(), buf2.id());
    }
}
