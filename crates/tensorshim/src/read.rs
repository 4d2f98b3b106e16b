use std::{mem, slice};

use crate::{
    dtype::{DataType, TensorScalar},
    engine::TensorHandle,
    error::ShimError,
    host::element_count,
    record::StringRecord,
};

/// Returns the per-dimension sizes of a tensor.
pub fn shape<H: TensorHandle>(tensor: &H) -> Vec<i64> {
    tensor.dims().to_vec()
}

fn expect_dtype<H: TensorHandle>(tensor: &H, expected: DataType) -> Result<(), ShimError> {
    let actual = tensor.dtype();
    if actual != expected {
        return Err(ShimError::DataTypeMismatch { expected, actual });
    }
    Ok(())
}

fn expect_rank<H: TensorHandle>(tensor: &H, expected: usize) -> Result<(), ShimError> {
    let actual = tensor.num_dims();
    if actual != expected {
        return Err(ShimError::RankMismatch { expected, actual });
    }
    Ok(())
}

/// Returns the records of a string tensor, in row-major order.
///
/// # Errors
///
/// Returns an error if the tensor is not a string tensor or its data region does
/// not hold exactly one record per element.
pub fn string_records<H: TensorHandle>(tensor: &H) -> Result<&[H::Record], ShimError> {
    expect_dtype(tensor, DataType::String)?;
    let elements = element_count(tensor.dims())?;
    let expected = elements.saturating_mul(mem::size_of::<H::Record>());
    let actual = tensor.byte_size();
    if actual != expected {
        return Err(ShimError::ByteSizeMismatch { expected, actual });
    }
    if elements == 0 {
        return Ok(&[]);
    }
    // SAFETY: the region holds `elements` initialized records for the tensor's lifetime
    Ok(unsafe { slice::from_raw_parts(tensor.data_ptr().cast::<H::Record>(), elements) })
}

/// Reads the bytes of a scalar (rank-0) string tensor.
pub fn read_string_scalar<H: TensorHandle>(tensor: &H) -> Result<&[u8], ShimError> {
    expect_rank(tensor, 0)?;
    let records = string_records(tensor)?;
    records
        .first()
        .map(StringRecord::as_bytes)
        .ok_or(ShimError::ByteSizeMismatch {
            expected: mem::size_of::<H::Record>(),
            actual: 0,
        })
}

/// Reads every element of a 1-D string tensor.
pub fn read_string_vector<H: TensorHandle>(tensor: &H) -> Result<Vec<&[u8]>, ShimError> {
    expect_rank(tensor, 1)?;
    Ok(string_records(tensor)?
        .iter()
        .map(StringRecord::as_bytes)
        .collect())
}

/// Returns the data region of a numeric tensor as bytes.
pub fn numeric_bytes<H: TensorHandle>(tensor: &H) -> Result<&[u8], ShimError> {
    if !tensor.dtype().is_numeric() {
        return Err(ShimError::invalid_argument(
            "tensor",
            format!("{} tensors have no flat byte view", tensor.dtype()),
        ));
    }
    let len = tensor.byte_size();
    if len == 0 {
        return Ok(&[]);
    }
    // SAFETY: the engine keeps `len` initialized bytes alive with the tensor
    Ok(unsafe { slice::from_raw_parts(tensor.data_ptr(), len) })
}

/// Reads the value of a scalar (rank-0) numeric tensor.
pub fn read_scalar<T: TensorScalar, H: TensorHandle>(tensor: &H) -> Result<T, ShimError> {
    expect_dtype(tensor, T::DATA_TYPE)?;
    expect_rank(tensor, 0)?;
    let size = mem::size_of::<T>();
    let bytes = numeric_bytes(tensor)?;
    bytes
        .get(..size)
        .and_then(T::from_ne_slice)
        .ok_or(ShimError::ByteSizeMismatch {
            expected: size,
            actual: bytes.len(),
        })
}

/// Copies every element of a numeric tensor of any rank, in row-major order.
pub fn read_scalars<T: TensorScalar, H: TensorHandle>(tensor: &H) -> Result<Vec<T>, ShimError> {
    expect_dtype(tensor, T::DATA_TYPE)?;
    let elements = element_count(tensor.dims())?;
    let size = mem::size_of::<T>();
    let expected = elements.saturating_mul(size);
    let bytes = numeric_bytes(tensor)?;
    if bytes.len() < expected {
        return Err(ShimError::ByteSizeMismatch {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes[..expected]
        .chunks_exact(size)
        .filter_map(T::from_ne_slice)
        .collect())
}
