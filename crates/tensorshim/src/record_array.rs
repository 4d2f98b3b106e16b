use std::{alloc::Layout, ffi::c_void, marker::PhantomData, mem, ptr::NonNull};

use crate::{
    allocator::{TensorAllocator, TensorAllocatorError},
    record::{RecordError, StringRecord},
};

/// A contiguous, fixed-stride array of string records owned by the shim.
///
/// This is the shim-owned side of the ownership hand-off. While a `RecordArray`
/// is alive, dropping it tears down every initialized slot and frees the buffer.
/// Once the engine accepts the buffer, [`RecordArray::disown`] gives up that
/// responsibility and the engine's call to [`release_record_array`] becomes the
/// only legal free point.
///
/// # Fields
///
/// * `ptr` - Start of the buffer, aligned for `R`.
/// * `capacity` - Number of record slots in the buffer.
/// * `initialized` - Number of leading slots that hold an initialized record.
/// * `alloc` - The allocator the buffer came from.
pub struct RecordArray<R: StringRecord, A: TensorAllocator> {
    ptr: NonNull<R>,
    capacity: usize,
    initialized: usize,
    alloc: A,
    _record: PhantomData<R>,
}

impl<R: StringRecord, A: TensorAllocator> RecordArray<R, A> {
    /// Allocates an uninitialized array of `capacity` record slots.
    ///
    /// A zero-capacity array performs no allocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout overflows or the allocator fails.
    pub fn new(capacity: usize, alloc: A) -> Result<Self, TensorAllocatorError> {
        let layout = Layout::array::<R>(capacity).map_err(TensorAllocatorError::LayoutError)?;
        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            NonNull::new(alloc.alloc(layout)?)
                .ok_or(TensorAllocatorError::NullPointer)?
                .cast()
        };

        Ok(Self {
            ptr,
            capacity,
            initialized: 0,
            alloc,
            _record: PhantomData,
        })
    }

    /// Initializes the next slot in place and copies `bytes` into it.
    ///
    /// The slot counts as initialized before the copy, so a failed copy still
    /// leaves a slot that rollback will deallocate.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), RecordError> {
        if self.initialized == self.capacity {
            return Err(RecordError::ArrayFull {
                capacity: self.capacity,
            });
        }

        // SAFETY: the slot is within the allocation and not yet initialized
        let slot = unsafe {
            let slot = self.ptr.as_ptr().add(self.initialized);
            slot.write(R::empty());
            &mut *slot
        };
        self.initialized += 1;
        slot.assign(bytes)
    }

    /// Returns the number of record slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of initialized slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.initialized
    }

    /// Returns true if no slot is initialized.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.initialized == 0
    }

    /// Returns true if every slot is initialized.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.initialized == self.capacity
    }

    /// Returns the size of the buffer in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.capacity * mem::size_of::<R>()
    }

    /// Returns the buffer pointer in the form the engine constructor takes.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        self.ptr.as_ptr().cast()
    }

    /// Returns the initialized records.
    pub fn as_slice(&self) -> &[R] {
        // SAFETY: the first `initialized` slots hold initialized records
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.initialized) }
    }

    /// Gives up ownership of the buffer after the engine has adopted it.
    ///
    /// Nothing is deallocated: the engine must eventually call
    /// [`release_record_array`] with the pointer and [`RecordArray::byte_len`].
    pub fn disown(self) {
        debug_assert!(self.is_complete(), "disowning a partially initialized array");
        let mut this = mem::ManuallyDrop::new(self);
        // SAFETY: `this` is never used again, the allocator is dropped exactly once
        unsafe { std::ptr::drop_in_place(&mut this.alloc) };
    }
}

impl<R: StringRecord, A: TensorAllocator> Drop for RecordArray<R, A> {
    fn drop(&mut self) {
        // SAFETY: the first `initialized` slots hold initialized records
        unsafe {
            for i in 0..self.initialized {
                (*self.ptr.as_ptr().add(i)).dealloc();
            }
        }
        if let Ok(layout) = Layout::array::<R>(self.capacity) {
            if layout.size() != 0 {
                self.alloc.dealloc(self.ptr.as_ptr().cast(), layout);
            }
        }
    }
}

impl<R: StringRecord, A: TensorAllocator> std::fmt::Debug for RecordArray<R, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordArray")
            .field("ptr", &self.ptr)
            .field("capacity", &self.capacity)
            .field("initialized", &self.initialized)
            .finish()
    }
}

/// The collective destructor handed to the engine with every string buffer.
///
/// Deallocates the `len / size_of::<R>()` records of the buffer in index order,
/// then frees the buffer with a default-constructed `A`. A null `data` or zero
/// `len` frees nothing. The auxiliary argument is unused.
///
/// # Safety
///
/// `data` and `len` must come from a [`RecordArray<R, A>`] that was complete when
/// it was disowned, and this function must be called at most once per buffer.
pub unsafe extern "C" fn release_record_array<R: StringRecord, A: TensorAllocator>(
    data: *mut c_void,
    len: usize,
    _arg: *mut c_void,
) {
    if data.is_null() {
        return;
    }
    debug_assert_eq!(len % mem::size_of::<R>().max(1), 0);

    let count = len.checked_div(mem::size_of::<R>()).unwrap_or(0);
    let records = data.cast::<R>();
    for i in 0..count {
        (*records.add(i)).dealloc();
    }
    log::debug!("released {count} string records ({len} bytes)");

    if len == 0 {
        return;
    }
    match Layout::from_size_align(len, mem::align_of::<R>()) {
        Ok(layout) => A::default().dealloc(data.cast(), layout),
        Err(e) => log::error!("cannot free string buffer of {len} bytes: {e}"),
    }
}
