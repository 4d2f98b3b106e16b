use std::{ffi::c_char, ptr, slice};

use crate::{
    allocator::TensorAllocator,
    dtype::DataType,
    engine::TensorEngine,
    error::ShimError,
    record_array::{release_record_array, RecordArray},
};

/// Creates a scalar (rank-0) string tensor holding a private copy of `bytes`.
///
/// # Arguments
///
/// * `engine` - The engine that will own the tensor.
/// * `bytes` - The payload. May be empty and may contain NUL bytes.
/// * `alloc` - The allocator for the one-record buffer.
///
/// # Errors
///
/// Returns an error if the buffer or the record payload cannot be allocated, or if
/// the engine rejects the buffer. In every case the record and buffer are released
/// before returning.
///
/// # Example
///
/// ```
/// use tensorshim::{new_scalar_string, read_string_scalar, CpuAllocator, HostEngine, TensorHandle};
///
/// let engine = HostEngine::default();
/// let tensor = new_scalar_string(&engine, b"hello", CpuAllocator).unwrap();
/// assert_eq!(tensor.num_dims(), 0);
/// assert_eq!(read_string_scalar(&tensor).unwrap(), b"hello");
/// ```
pub fn new_scalar_string<E, A>(engine: &E, bytes: &[u8], alloc: A) -> Result<E::Tensor, ShimError>
where
    E: TensorEngine,
    A: TensorAllocator,
{
    pack_records(engine, &[], 1, [bytes], alloc)
}

/// Creates a 1-D string tensor of length `strings.len()`.
///
/// Element `i` holds a private copy of `strings[i]`. The input slices are only
/// borrowed for the duration of the call. An empty input yields a valid tensor of
/// shape `[0]`.
///
/// # Errors
///
/// Returns an error if the buffer or a record payload cannot be allocated, or if
/// the engine rejects the buffer. Every record initialized so far is deallocated
/// and the buffer freed before returning.
///
/// # Example
///
/// ```
/// use tensorshim::{new_vector_string, read_string_vector, CpuAllocator, HostEngine, TensorHandle};
///
/// let engine = HostEngine::default();
/// let tensor = new_vector_string(&engine, &["a", "bc", ""], CpuAllocator).unwrap();
/// assert_eq!(tensor.dims(), &[3]);
/// assert_eq!(read_string_vector(&tensor).unwrap(), vec![&b"a"[..], &b"bc"[..], &b""[..]]);
/// ```
pub fn new_vector_string<E, A, S>(
    engine: &E,
    strings: &[S],
    alloc: A,
) -> Result<E::Tensor, ShimError>
where
    E: TensorEngine,
    A: TensorAllocator,
    S: AsRef<[u8]>,
{
    let count = strings.len();
    let dims = [i64::try_from(count)
        .map_err(|_| ShimError::invalid_argument("strings", format!("{count} elements")))?];
    pack_records(
        engine,
        &dims,
        count,
        strings.iter().map(|s| s.as_ref()),
        alloc,
    )
}

/// Creates a 1-D string tensor from parallel pointer and length arrays.
///
/// This is the raw form of [`new_vector_string`]: `strings[i]` points to
/// `lens[i]` bytes, not necessarily NUL-terminated.
///
/// # Errors
///
/// A negative `count`, a null array with a positive `count`, or a null string with
/// a non-zero length is rejected before any allocation. Other errors are those of
/// [`new_vector_string`].
///
/// # Safety
///
/// For a positive `count`, `strings` and `lens` must be valid for `count` reads, and
/// each `strings[i]` must be valid for `lens[i]` bytes.
pub unsafe fn new_vector_string_raw<E, A>(
    engine: &E,
    strings: *const *const c_char,
    lens: *const usize,
    count: i32,
    alloc: A,
) -> Result<E::Tensor, ShimError>
where
    E: TensorEngine,
    A: TensorAllocator,
{
    let n = usize::try_from(count).map_err(|_| {
        ShimError::invalid_argument("count", format!("must be non-negative, got {count}"))
    })?;
    if n == 0 {
        return pack_records(engine, &[0], 0, std::iter::empty(), alloc);
    }
    if strings.is_null() || lens.is_null() {
        return Err(ShimError::invalid_argument(
            "strings",
            "null pointer or length array",
        ));
    }

    let ptrs = slice::from_raw_parts(strings, n);
    let lens = slice::from_raw_parts(lens, n);
    if let Some(i) = (0..n).find(|&i| ptrs[i].is_null() && lens[i] != 0) {
        return Err(ShimError::invalid_argument(
            "strings",
            format!("element {i} is null with length {}", lens[i]),
        ));
    }

    let spans = ptrs
        .iter()
        .zip(lens)
        .map(|(&ptr, &len)| byte_span(ptr, len));
    pack_records(engine, &[i64::from(count)], n, spans, alloc)
}

/// Borrows `len` bytes at `ptr` as a slice. A zero length never reads `ptr`.
///
/// # Safety
///
/// If `len` is non-zero, `ptr` must be non-null and valid for `len` bytes for the
/// returned lifetime.
pub unsafe fn byte_span<'a>(ptr: *const c_char, len: usize) -> &'a [u8] {
    if len == 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr.cast(), len)
    }
}

/// Packs `count` spans into a record array and hands it to the engine.
///
/// The array rolls itself back on every early return.
fn pack_records<'a, E, A, I>(
    engine: &E,
    dims: &[i64],
    count: usize,
    spans: I,
    alloc: A,
) -> Result<E::Tensor, ShimError>
where
    E: TensorEngine,
    A: TensorAllocator,
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut records = RecordArray::<E::Record, A>::new(count, alloc)?;
    for bytes in spans {
        if let Err(e) = records.push(bytes) {
            log::warn!(
                "rolling back {} of {count} string records: {e}",
                records.len()
            );
            return Err(e.into());
        }
    }
    if !records.is_complete() {
        return Err(ShimError::invalid_argument(
            "strings",
            format!("expected {count} elements, got {}", records.len()),
        ));
    }

    let len = records.byte_len();
    let data = records.as_mut_ptr();
    // SAFETY: every slot holds an initialized record and the buffer stays valid
    // until the engine calls the release callback
    let constructed = unsafe {
        engine.new_tensor(
            DataType::String,
            dims,
            data,
            len,
            release_record_array::<E::Record, A>,
            ptr::null_mut(),
        )
    };

    match constructed {
        Ok(tensor) => {
            records.disown();
            log::trace!("built string tensor of shape {dims:?} ({len} bytes)");
            Ok(tensor)
        }
        Err(e) => {
            log::warn!(
                "engine rejected string tensor of shape {dims:?}, rolling back {count} records: {e}"
            );
            drop(records);
            Err(e.into())
        }
    }
}
