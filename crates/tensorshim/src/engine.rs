use std::ffi::c_void;

use thiserror::Error;

use crate::{dtype::DataType, record::StringRecord};

/// Release callback the engine invokes exactly once for a buffer it adopted.
///
/// Arguments are the buffer, its size in bytes and the auxiliary pointer given
/// to [`TensorEngine::new_tensor`].
pub type Deallocator = unsafe extern "C" fn(data: *mut c_void, len: usize, arg: *mut c_void);

/// An error reported by the engine when it refuses to build a tensor.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// The engine could not allocate the tensor storage.
    #[error("Engine failed to allocate {len} bytes")]
    AllocationFailed {
        /// Requested size in bytes.
        len: usize,
    },

    /// The tensor would exceed the engine's resource limit.
    #[error("Tensor of {len} bytes exceeds the engine limit of {limit} bytes")]
    ResourceExhausted {
        /// Requested size in bytes.
        len: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// A dimension is negative or the element count overflows.
    #[error("Invalid shape {0:?}")]
    InvalidShape(Vec<i64>),

    /// The supplied buffer does not match the shape and data type.
    #[error("Buffer of {actual} bytes does not fit a {dtype} tensor of shape {dims:?} (expected {expected} bytes)")]
    BufferSizeMismatch {
        /// The tensor data type.
        dtype: DataType,
        /// The tensor shape.
        dims: Vec<i64>,
        /// Bytes the shape requires.
        expected: usize,
        /// Bytes that were supplied.
        actual: usize,
    },

    /// A non-empty buffer was passed as a null pointer.
    #[error("Null buffer for a {len} byte tensor")]
    NullBuffer {
        /// Supplied size in bytes.
        len: usize,
    },
}

impl EngineError {
    /// Returns true if the engine failed for lack of memory.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed { .. } | Self::ResourceExhausted { .. }
        )
    }
}

/// Read access to an engine tensor.
pub trait TensorHandle {
    /// The record layout of string elements.
    type Record: StringRecord;

    /// Returns the element data type.
    fn dtype(&self) -> DataType;

    /// Returns the per-dimension sizes. Empty for a scalar.
    fn dims(&self) -> &[i64];

    /// Returns the size of the data region in bytes.
    fn byte_size(&self) -> usize;

    /// Returns the start of the data region.
    ///
    /// For string tensors the region is an array of the engine's records.
    fn data_ptr(&self) -> *mut u8;

    /// Returns the number of dimensions.
    fn num_dims(&self) -> usize {
        self.dims().len()
    }
}

/// The external engine's tensor construction interface.
///
/// The shim never frees a tensor it returns: dropping `Self::Tensor` is the
/// engine's delete operation.
pub trait TensorEngine {
    /// The owned tensor handle.
    type Tensor: TensorHandle<Record = Self::Record>;

    /// The record layout the engine expects inside string tensors.
    type Record: StringRecord;

    /// Allocates a tensor with an engine-owned data region of `len` bytes.
    ///
    /// The engine frees the region through its default release path.
    fn allocate_tensor(
        &self,
        dtype: DataType,
        dims: &[i64],
        len: usize,
    ) -> Result<Self::Tensor, EngineError>;

    /// Wraps a caller-allocated buffer in a tensor.
    ///
    /// On `Ok` the engine owns `data` and calls `deallocator(data, len, arg)` exactly
    /// once when it no longer needs it. On `Err` ownership stays with the caller and
    /// `deallocator` is never called.
    ///
    /// # Safety
    ///
    /// `data` must be valid for `len` bytes, laid out as `dtype` requires, and must
    /// stay valid until `deallocator` runs.
    unsafe fn new_tensor(
        &self,
        dtype: DataType,
        dims: &[i64],
        data: *mut c_void,
        len: usize,
        deallocator: Deallocator,
        arg: *mut c_void,
    ) -> Result<Self::Tensor, EngineError>;
}
