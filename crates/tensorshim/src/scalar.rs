use std::{mem, ptr};

use crate::{
    dtype::{DataType, TensorScalar},
    engine::{TensorEngine, TensorHandle},
    error::ShimError,
};

/// Creates a scalar (rank-0) tensor of a numeric data type with a `len` byte data region.
///
/// If `src` is given its bytes are copied verbatim into the data region; otherwise
/// the region is left as the engine initialized it.
///
/// # Arguments
///
/// * `engine` - The engine that allocates and owns the tensor.
/// * `dtype` - A fixed-size data type.
/// * `len` - Size of the data region in bytes. May be zero.
/// * `src` - Optional source bytes, exactly `len` long.
///
/// # Errors
///
/// Returns an error if `dtype` is not numeric, if `src` has the wrong length, or if
/// the engine cannot allocate the tensor.
pub fn new_scalar_numeric<E: TensorEngine>(
    engine: &E,
    dtype: DataType,
    len: usize,
    src: Option<&[u8]>,
) -> Result<E::Tensor, ShimError> {
    if !dtype.is_numeric() {
        return Err(ShimError::invalid_argument(
            "dtype",
            format!("{dtype} is not a numeric data type"),
        ));
    }
    if let Some(src) = src {
        if src.len() != len {
            return Err(ShimError::invalid_argument(
                "src",
                format!("{} bytes supplied for a {len} byte scalar", src.len()),
            ));
        }
    }

    let tensor = engine.allocate_tensor(dtype, &[], len)?;
    if let Some(src) = src.filter(|src| !src.is_empty()) {
        // SAFETY: the engine allocated `len` bytes and `src` holds exactly `len`
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), tensor.data_ptr(), len) };
    }
    log::trace!("built {dtype} scalar ({len} bytes)");
    Ok(tensor)
}

/// Creates a scalar tensor holding `value`.
///
/// # Example
///
/// ```
/// use tensorshim::{new_scalar, read_scalar, DataType, HostEngine, TensorHandle};
///
/// let engine = HostEngine::default();
/// let tensor = new_scalar(&engine, 2.5f32).unwrap();
/// assert_eq!(tensor.dtype(), DataType::Float);
/// assert_eq!(read_scalar::<f32, _>(&tensor).unwrap(), 2.5);
/// ```
pub fn new_scalar<E: TensorEngine, T: TensorScalar>(
    engine: &E,
    value: T,
) -> Result<E::Tensor, ShimError> {
    let bytes = value.to_ne_bytes();
    let bytes = bytes.as_ref();
    new_scalar_numeric(engine, T::DATA_TYPE, bytes.len(), Some(bytes))
}

/// Creates a 1-D tensor of shape `[values.len()]` from a slice of scalars.
pub fn new_vector_numeric<E: TensorEngine, T: TensorScalar>(
    engine: &E,
    values: &[T],
) -> Result<E::Tensor, ShimError> {
    let count = values.len();
    let dims = [i64::try_from(count)
        .map_err(|_| ShimError::invalid_argument("values", format!("{count} elements")))?];
    let size = mem::size_of::<T>();
    let len = count
        .checked_mul(size)
        .ok_or_else(|| ShimError::invalid_argument("values", format!("{count} elements")))?;

    let tensor = engine.allocate_tensor(T::DATA_TYPE, &dims, len)?;
    let data = tensor.data_ptr();
    for (i, value) in values.iter().enumerate() {
        let bytes = value.to_ne_bytes();
        // SAFETY: element `i` lies within the `len` bytes the engine allocated
        unsafe { ptr::copy_nonoverlapping(bytes.as_ref().as_ptr(), data.add(i * size), size) };
    }
    log::trace!("built {} vector of {count} elements", T::DATA_TYPE);
    Ok(tensor)
}
