use std::alloc;
use std::alloc::Layout;

use thiserror::Error;

/// An error type for buffer allocator operations.
#[derive(Debug, Error, PartialEq)]
pub enum TensorAllocatorError {
    /// The requested layout could not be represented.
    #[error("Invalid buffer layout {0}")]
    LayoutError(core::alloc::LayoutError),

    /// The allocator returned a null pointer.
    #[error("Null pointer")]
    NullPointer,
}

impl TensorAllocatorError {
    /// Returns true if the allocator ran out of memory.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::NullPointer)
    }
}

/// A trait for allocating and deallocating the buffers handed to the engine.
///
/// The collective destructor recovers an allocator with [`Default`], so an
/// implementation must be able to free memory obtained from any other instance
/// of the same type.
///
/// # Methods
///
/// * `alloc` - Allocates memory with the given layout.
/// * `dealloc` - Deallocates memory previously returned by `alloc` with the same layout.
pub trait TensorAllocator: Clone + Default {
    /// Allocates memory with the given layout.
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError>;

    /// Deallocates memory with the given layout.
    fn dealloc(&self, ptr: *mut u8, layout: Layout);
}

#[derive(Clone, Debug)]
/// A buffer allocator that uses the system allocator.
pub struct CpuAllocator;

/// Implement the `Default` trait for the `CpuAllocator` struct.
impl Default for CpuAllocator {
    fn default() -> Self {
        Self
    }
}

/// Implement the `TensorAllocator` trait for the `CpuAllocator` struct.
impl TensorAllocator for CpuAllocator {
    /// Allocates memory for a buffer with the given layout.
    ///
    /// # Arguments
    ///
    /// * `layout` - The layout of the buffer. Must have a non-zero size.
    ///
    /// # Returns
    ///
    /// A non-null pointer to the allocated memory if successful, otherwise an error.
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
        let ptr = unsafe { alloc::alloc(layout) };
        if ptr.is_null() {
            Err(TensorAllocatorError::NullPointer)?
        }
        Ok(ptr)
    }

    /// Deallocates memory for a buffer with the given layout.
    ///
    /// # Arguments
    ///
    /// * `ptr` - A non-null pointer to the allocated memory.
    /// * `layout` - The layout the memory was allocated with.
    ///
    /// # Safety
    ///
    /// The pointer must come from `alloc` and the layout must be the same.
    #[allow(clippy::not_unsafe_ptr_arg_deref)]
    fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if !ptr.is_null() {
            unsafe { alloc::dealloc(ptr, layout) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_allocator() -> Result<(), TensorAllocatorError> {
        let allocator = CpuAllocator;
        let layout = Layout::from_size_align(24 * 4, 8).map_err(TensorAllocatorError::LayoutError)?;
        let ptr = allocator.alloc(layout)?;
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % 8, 0);
        allocator.dealloc(ptr, layout);
        Ok(())
    }

    #[test]
    fn test_cpu_allocator_null_dealloc_is_noop() {
        let layout = Layout::new::<u64>();
        CpuAllocator.dealloc(std::ptr::null_mut(), layout);
    }

    #[test]
    fn test_error_classification() {
        assert!(TensorAllocatorError::NullPointer.is_out_of_memory());
        let layout_err = Layout::from_size_align(8, 3).unwrap_err();
        assert!(!TensorAllocatorError::LayoutError(layout_err).is_out_of_memory());
    }
}
