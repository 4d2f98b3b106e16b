use thiserror::Error;

use crate::{
    allocator::TensorAllocatorError, dtype::DataType, engine::EngineError, record::RecordError,
};

/// Error type for tensor construction and read-back.
///
/// Construction is all-or-nothing: whenever one of these is returned, every
/// allocation the shim made for the call has already been released.
#[derive(Error, Debug, PartialEq)]
pub enum ShimError {
    /// The buffer for the record array could not be allocated.
    ///
    /// Nothing was touched before the failed allocation.
    #[error("Allocation failure: {0}")]
    AllocationFailure(#[from] TensorAllocatorError),

    /// A record could not allocate storage for its payload.
    ///
    /// The records initialized so far were deallocated and the buffer freed.
    #[error("Record allocation failure: {0}")]
    RecordAllocation(#[from] RecordError),

    /// An argument was rejected before any allocation.
    ///
    /// # Examples
    /// - A negative element count
    /// - A string data type passed to the numeric constructor
    /// - A source buffer whose length differs from the declared length
    #[error("Invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument
        argument: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// The engine refused to build the tensor.
    ///
    /// Ownership of the buffer never transferred; the shim rolled back every
    /// record and freed the buffer before returning.
    #[error("Engine construction failure: {0}")]
    EngineConstructionFailure(#[from] EngineError),

    /// The tensor holds a different data type than requested.
    #[error("Data type mismatch: expected {expected}, got {actual}")]
    DataTypeMismatch {
        /// Data type the caller asked for
        expected: DataType,
        /// Data type of the tensor
        actual: DataType,
    },

    /// The tensor has a different rank than requested.
    #[error("Rank mismatch: expected rank {expected}, got {actual}")]
    RankMismatch {
        /// Rank the caller asked for
        expected: usize,
        /// Rank of the tensor
        actual: usize,
    },

    /// The tensor's data region is smaller than its shape requires.
    #[error("Byte size mismatch: shape requires {expected} bytes, tensor holds {actual}")]
    ByteSizeMismatch {
        /// Bytes the shape requires
        expected: usize,
        /// Bytes in the data region
        actual: usize,
    },
}

impl ShimError {
    /// Creates an InvalidArgument error with context.
    pub fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }

    /// Returns true if this error is recoverable by freeing memory.
    pub fn is_out_of_memory(&self) -> bool {
        match self {
            Self::AllocationFailure(e) => e.is_out_of_memory(),
            Self::RecordAllocation(RecordError::AllocationFailed { .. }) => true,
            Self::EngineConstructionFailure(e) => e.is_out_of_memory(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_message() {
        let err = ShimError::invalid_argument("count", "must be non-negative, got -1");
        assert_eq!(
            err.to_string(),
            "Invalid argument `count`: must be non-negative, got -1"
        );
        assert!(!err.is_out_of_memory());
    }

    #[test]
    fn test_out_of_memory_classification() {
        assert!(ShimError::from(TensorAllocatorError::NullPointer).is_out_of_memory());
        assert!(ShimError::from(RecordError::AllocationFailed { len: 64 }).is_out_of_memory());
        assert!(!ShimError::from(RecordError::ArrayFull { capacity: 1 }).is_out_of_memory());
        assert!(ShimError::from(EngineError::ResourceExhausted { len: 8, limit: 4 }).is_out_of_memory());
        assert!(!ShimError::from(EngineError::InvalidShape(vec![-2])).is_out_of_memory());
    }
}
