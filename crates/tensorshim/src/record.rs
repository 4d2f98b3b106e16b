//! Variable-length string records.
//!
//! A record is the unit stored in every element of a string tensor. It has a fixed
//! size so that records can be packed at a constant stride, and it owns a private
//! copy of its bytes. Records are not dropped automatically: whoever owns the packed
//! array calls [`StringRecord::dealloc`] on every slot exactly once.

use std::{mem, ptr, slice};

use thiserror::Error;

/// An error raised while populating a record.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    /// The record could not allocate storage for its payload.
    #[error("Failed to allocate {len} bytes for a string record")]
    AllocationFailed {
        /// The payload length that was requested.
        len: usize,
    },

    /// Every slot of the packed array is already populated.
    #[error("Record array is full ({capacity} slots)")]
    ArrayFull {
        /// The number of slots in the array.
        capacity: usize,
    },
}

/// The record lifecycle the engine expects from a string cell.
///
/// A slot goes through `empty` (written in place), `assign` (copies the payload),
/// then `dealloc` (releases the payload). `dealloc` must be safe to call on a slot
/// that was initialized with `empty` but never successfully assigned.
pub trait StringRecord: Sized {
    /// Returns an initialized record holding zero bytes.
    fn empty() -> Self;

    /// Replaces the payload with a private copy of `bytes`.
    ///
    /// On error the record still holds a valid payload and can be deallocated.
    fn assign(&mut self, bytes: &[u8]) -> Result<(), RecordError>;

    /// Releases the payload. The record is left empty.
    fn dealloc(&mut self);

    /// Returns the payload bytes.
    fn as_bytes(&self) -> &[u8];
}

/// Number of payload bytes a [`TString`] stores without a heap allocation.
pub const INLINE_CAPACITY: usize = 16;

#[repr(C)]
#[derive(Clone, Copy)]
union Repr {
    inline: [u8; INLINE_CAPACITY],
    heap: *mut u8,
}

/// A fixed-size string record with inline storage for short payloads.
///
/// Payloads of at most [`INLINE_CAPACITY`] bytes live inside the record, longer
/// payloads in a heap block of exactly `len` bytes owned by the record. The bytes
/// are arbitrary: they need not be UTF-8 and may contain NULs.
#[repr(C)]
pub struct TString {
    len: usize,
    repr: Repr,
}

impl TString {
    /// Creates an empty record.
    pub const fn new() -> Self {
        Self {
            len: 0,
            repr: Repr {
                inline: [0; INLINE_CAPACITY],
            },
        }
    }

    /// Returns the payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the payload is stored inside the record.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.len <= INLINE_CAPACITY
    }

    fn heap_copy(bytes: &[u8]) -> Result<*mut u8, RecordError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(bytes.len())
            .map_err(|_| RecordError::AllocationFailed { len: bytes.len() })?;
        buf.extend_from_slice(bytes);
        Ok(Box::into_raw(buf.into_boxed_slice()) as *mut u8)
    }
}

impl Default for TString {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TString")
            .field("len", &self.len)
            .field("inline", &self.is_inline())
            .field("bytes", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

impl StringRecord for TString {
    fn empty() -> Self {
        Self::new()
    }

    fn assign(&mut self, bytes: &[u8]) -> Result<(), RecordError> {
        let repr = if bytes.len() <= INLINE_CAPACITY {
            let mut inline = [0; INLINE_CAPACITY];
            inline[..bytes.len()].copy_from_slice(bytes);
            Repr { inline }
        } else {
            Repr {
                heap: Self::heap_copy(bytes)?,
            }
        };
        self.dealloc();
        self.repr = repr;
        self.len = bytes.len();
        Ok(())
    }

    fn dealloc(&mut self) {
        if !self.is_inline() {
            // SAFETY: a heap payload is always a boxed slice of exactly `len` bytes
            unsafe {
                let heap = self.repr.heap;
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(heap, self.len)));
            }
        }
        *self = Self::new();
    }

    fn as_bytes(&self) -> &[u8] {
        // SAFETY: `len` selects the active union field and bounds the payload
        unsafe {
            if self.is_inline() {
                &self.repr.inline[..self.len]
            } else {
                slice::from_raw_parts(self.repr.heap, self.len)
            }
        }
    }
}

const _: () = assert!(mem::size_of::<TString>() == mem::size_of::<usize>() + INLINE_CAPACITY);
