#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `tensorshim` builds tensors owned by an external tensor engine out of raw caller
//! bytes. Numeric tensors are created by the engine and filled with a byte copy.
//! String tensors are packed into a contiguous array of fixed-size records that the
//! shim allocates itself and then hands to the engine together with a destructor.
//!
//! # Ownership
//!
//! Every string buffer has exactly one owner at any time:
//!
//! - While records are being written the buffer is a [`RecordArray`]; any failure
//!   drops it, which deallocates the initialized records and frees the buffer.
//! - Once [`TensorEngine::new_tensor`] accepts the buffer the array is disowned and
//!   the engine calls [`release_record_array`] exactly once when it is done.
//!
//! A construction call therefore either returns a tensor or leaves no allocation
//! behind.
//!
//! # Quick Start
//!
//! ```rust
//! use tensorshim::{
//!     new_scalar, new_vector_string, read_scalar, read_string_vector, CpuAllocator,
//!     DataType, HostEngine, TensorHandle,
//! };
//!
//! let engine = HostEngine::default();
//!
//! let words = new_vector_string(&engine, &["tensor", "", "shim"], CpuAllocator).unwrap();
//! assert_eq!(words.dtype(), DataType::String);
//! assert_eq!(words.dims(), &[3]);
//! assert_eq!(read_string_vector(&words).unwrap()[2], b"shim");
//!
//! let value = new_scalar(&engine, 2.5f64).unwrap();
//! assert_eq!(read_scalar::<f64, _>(&value).unwrap(), 2.5);
//! ```

/// Allocator module for the buffers handed to the engine.
///
/// This module provides the [`TensorAllocator`] trait and the default [`CpuAllocator`].
pub mod allocator;

/// Data type codes and the scalar types that map onto them.
pub mod dtype;

/// The engine interface the shim constructs tensors through.
pub mod engine;

/// Error types for tensor construction and read-back.
pub mod error;

/// An in-process engine implementation.
pub mod host;

/// Read-back helpers for inspecting engine tensors.
pub mod read;

/// String records stored in the elements of string tensors.
pub mod record;

/// The packed record array and its collective destructor.
pub mod record_array;

/// Numeric tensor constructors.
pub mod scalar;

/// String tensor constructors.
pub mod string;

pub use crate::allocator::{CpuAllocator, TensorAllocator, TensorAllocatorError};
pub use crate::dtype::{DataType, TensorScalar, UnknownDataType};
pub use crate::engine::{Deallocator, EngineError, TensorEngine, TensorHandle};
pub use crate::error::ShimError;
pub use crate::host::{HostEngine, HostEngineConfig, HostTensor};
pub use crate::read::{
    numeric_bytes, read_scalar, read_scalars, read_string_scalar, read_string_vector, shape,
    string_records,
};
pub use crate::record::{RecordError, StringRecord, TString, INLINE_CAPACITY};
pub use crate::record_array::{release_record_array, RecordArray};
pub use crate::scalar::{new_scalar, new_scalar_numeric, new_vector_numeric};
pub use crate::string::{new_scalar_string, new_vector_string, new_vector_string_raw};
