//! An in-process engine with the same ownership contract as the native one.
//!
//! [`HostEngine`] validates buffers the way the native engine does and owns what it
//! accepts: a [`HostTensor`] built from a caller buffer calls the caller's release
//! callback exactly once, when the tensor is dropped.

use std::{alloc::Layout, ffi::c_void, mem};

use crate::{
    allocator::{CpuAllocator, TensorAllocator},
    dtype::DataType,
    engine::{Deallocator, EngineError, TensorEngine, TensorHandle},
    record::TString,
};

/// Alignment of the data regions the engine allocates itself.
pub const TENSOR_ALIGNMENT: usize = 64;

/// Configuration of a [`HostEngine`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostEngineConfig {
    /// Largest data region, in bytes, the engine accepts. `None` means unlimited.
    pub max_tensor_bytes: Option<usize>,
}

/// The in-process engine.
#[derive(Clone, Debug, Default)]
pub struct HostEngine {
    config: HostEngineConfig,
}

impl HostEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: HostEngineConfig) -> Self {
        Self { config }
    }

    /// Creates an engine that rejects data regions larger than `max_tensor_bytes`.
    pub fn with_byte_limit(max_tensor_bytes: usize) -> Self {
        Self::new(HostEngineConfig {
            max_tensor_bytes: Some(max_tensor_bytes),
        })
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &HostEngineConfig {
        &self.config
    }

    fn check_limit(&self, len: usize) -> Result<(), EngineError> {
        match self.config.max_tensor_bytes {
            Some(limit) if len > limit => Err(EngineError::ResourceExhausted { len, limit }),
            _ => Ok(()),
        }
    }
}

/// Number of elements described by `dims`, or an error for negative or overflowing shapes.
pub(crate) fn element_count(dims: &[i64]) -> Result<usize, EngineError> {
    dims.iter()
        .try_fold(1usize, |acc, &dim| {
            let dim = usize::try_from(dim).ok()?;
            acc.checked_mul(dim)
        })
        .ok_or_else(|| EngineError::InvalidShape(dims.to_vec()))
}

enum Release {
    /// Region allocated by the engine. `None` for an empty region.
    Engine(Option<Layout>),
    /// Region adopted from the caller.
    Callback {
        deallocator: Deallocator,
        arg: *mut c_void,
    },
}

/// A tensor owned by the [`HostEngine`].
pub struct HostTensor {
    dtype: DataType,
    dims: Vec<i64>,
    data: *mut u8,
    len: usize,
    release: Release,
}

impl TensorHandle for HostTensor {
    type Record = TString;

    #[inline]
    fn dtype(&self) -> DataType {
        self.dtype
    }

    #[inline]
    fn dims(&self) -> &[i64] {
        &self.dims
    }

    #[inline]
    fn byte_size(&self) -> usize {
        self.len
    }

    #[inline]
    fn data_ptr(&self) -> *mut u8 {
        self.data
    }
}

impl Drop for HostTensor {
    fn drop(&mut self) {
        match self.release {
            Release::Engine(Some(layout)) => CpuAllocator.dealloc(self.data, layout),
            Release::Engine(None) => {}
            Release::Callback { deallocator, arg } => {
                log::trace!("releasing adopted {} buffer of {} bytes", self.dtype, self.len);
                // SAFETY: the buffer was adopted in `new_tensor` and this is its only release
                unsafe { deallocator(self.data.cast(), self.len, arg) }
            }
        }
    }
}

impl std::fmt::Debug for HostTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostTensor")
            .field("dtype", &self.dtype)
            .field("dims", &self.dims)
            .field("data", &self.data)
            .field("len", &self.len)
            .field("adopted", &matches!(self.release, Release::Callback { .. }))
            .finish()
    }
}

impl TensorEngine for HostEngine {
    type Tensor = HostTensor;
    type Record = TString;

    fn allocate_tensor(
        &self,
        dtype: DataType,
        dims: &[i64],
        len: usize,
    ) -> Result<HostTensor, EngineError> {
        element_count(dims)?;
        self.check_limit(len)?;

        let (data, layout) = if len == 0 {
            (std::ptr::NonNull::<u8>::dangling().as_ptr(), None)
        } else {
            let layout = Layout::from_size_align(len, TENSOR_ALIGNMENT)
                .map_err(|_| EngineError::AllocationFailed { len })?;
            let data = CpuAllocator
                .alloc(layout)
                .map_err(|_| EngineError::AllocationFailed { len })?;
            // SAFETY: freshly allocated region of `len` bytes
            unsafe { data.write_bytes(0, len) };
            (data, Some(layout))
        };

        Ok(HostTensor {
            dtype,
            dims: dims.to_vec(),
            data,
            len,
            release: Release::Engine(layout),
        })
    }

    unsafe fn new_tensor(
        &self,
        dtype: DataType,
        dims: &[i64],
        data: *mut c_void,
        len: usize,
        deallocator: Deallocator,
        arg: *mut c_void,
    ) -> Result<HostTensor, EngineError> {
        let elements = element_count(dims)?;
        self.check_limit(len)?;
        if data.is_null() && len != 0 {
            return Err(EngineError::NullBuffer { len });
        }

        let stride = dtype.size().unwrap_or(mem::size_of::<TString>());
        let expected = elements
            .checked_mul(stride)
            .ok_or_else(|| EngineError::InvalidShape(dims.to_vec()))?;
        // string buffers must hold exactly one record per element
        let fits = match dtype {
            DataType::String => len == expected,
            _ => len >= expected,
        };
        if !fits {
            return Err(EngineError::BufferSizeMismatch {
                dtype,
                dims: dims.to_vec(),
                expected,
                actual: len,
            });
        }

        Ok(HostTensor {
            dtype,
            dims: dims.to_vec(),
            data: data.cast(),
            len,
            release: Release::Callback { deallocator, arg },
        })
    }
}
