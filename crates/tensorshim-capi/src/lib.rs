//! C ABI over the in-process tensor engine.
//!
//! Tensors cross the boundary as opaque `*mut HostTensor` handles. Every
//! constructor returns null on failure, after logging the reason, and every
//! non-null handle must be released with exactly one [`TSHIM_DeleteTensor`].
#![allow(non_snake_case)]

use std::ffi::{c_char, c_int, c_void};

use tensorshim::{
    new_scalar_numeric, new_scalar_string, new_vector_string_raw, string::byte_span,
    CpuAllocator, DataType, HostEngine, HostTensor, ShimError, StringRecord, TString,
    TensorHandle,
};

/// Status code meaning success.
pub const TSHIM_OK: c_int = 0;

fn into_handle(result: Result<HostTensor, ShimError>, what: &str) -> *mut HostTensor {
    match result {
        Ok(tensor) => Box::into_raw(Box::new(tensor)),
        Err(e) => {
            log::warn!("{what} failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// # Safety
/// `handle` must be null or a live handle returned by this library.
unsafe fn tensor_ref<'a>(handle: *const HostTensor) -> Option<&'a HostTensor> {
    handle.as_ref()
}

#[no_mangle]
/// Returns the status code meaning success.
pub extern "C" fn TSHIM_OK_CODE() -> c_int {
    TSHIM_OK
}

#[no_mangle]
/// Creates a scalar tensor of a numeric data type with a `len` byte data region.
///
/// If `data` is non-null its first `len` bytes are copied into the tensor.
///
/// # Safety
/// A non-null `data` must be readable for `len` bytes.
pub unsafe extern "C" fn TSHIM_NewTensorScalar(
    dtype: c_int,
    data: *const c_void,
    len: usize,
) -> *mut HostTensor {
    let dtype = match DataType::try_from(dtype) {
        Ok(dtype) => dtype,
        Err(e) => {
            log::warn!("TSHIM_NewTensorScalar: {e}");
            return std::ptr::null_mut();
        }
    };
    let src = (!data.is_null()).then(|| byte_span(data.cast(), len));
    into_handle(
        new_scalar_numeric(&HostEngine::default(), dtype, len, src),
        "TSHIM_NewTensorScalar",
    )
}

#[no_mangle]
/// Creates a scalar string tensor holding a copy of `len` bytes at `bytes`.
///
/// # Safety
/// `bytes` must be readable for `len` bytes. It may be null only when `len` is zero.
pub unsafe extern "C" fn TSHIM_NewTensorStringScalar(
    bytes: *const c_char,
    len: usize,
) -> *mut HostTensor {
    if bytes.is_null() && len != 0 {
        log::warn!("TSHIM_NewTensorStringScalar: null bytes with length {len}");
        return std::ptr::null_mut();
    }
    into_handle(
        new_scalar_string(&HostEngine::default(), byte_span(bytes, len), CpuAllocator),
        "TSHIM_NewTensorStringScalar",
    )
}

#[no_mangle]
/// Creates a 1-D string tensor of `count` elements from parallel pointer and length arrays.
///
/// # Safety
/// For a positive `count`, `strings` and `lens` must hold `count` entries and each
/// `strings[i]` must be readable for `lens[i]` bytes.
pub unsafe extern "C" fn TSHIM_NewTensorStringVector(
    strings: *const *const c_char,
    lens: *const usize,
    count: i32,
) -> *mut HostTensor {
    into_handle(
        new_vector_string_raw(&HostEngine::default(), strings, lens, count, CpuAllocator),
        "TSHIM_NewTensorStringVector",
    )
}

#[no_mangle]
/// Destroys a tensor. A null handle is ignored.
///
/// # Safety
/// `tensor` must be null or a handle from this library that was not yet deleted.
pub unsafe extern "C" fn TSHIM_DeleteTensor(tensor: *mut HostTensor) {
    if !tensor.is_null() {
        drop(Box::from_raw(tensor));
    }
}

#[no_mangle]
/// Returns the start of the data region, or null for a null handle.
///
/// # Safety
/// `tensor` must be null or a live handle.
pub unsafe extern "C" fn TSHIM_TensorData(tensor: *const HostTensor) -> *mut c_void {
    tensor_ref(tensor).map_or(std::ptr::null_mut(), |t| t.data_ptr().cast())
}

#[no_mangle]
/// Returns the size of the data region in bytes, or 0 for a null handle.
///
/// # Safety
/// `tensor` must be null or a live handle.
pub unsafe extern "C" fn TSHIM_TensorByteSize(tensor: *const HostTensor) -> usize {
    tensor_ref(tensor).map_or(0, |t| t.byte_size())
}

#[no_mangle]
/// Returns the data type code, or -1 for a null handle.
///
/// # Safety
/// `tensor` must be null or a live handle.
pub unsafe extern "C" fn TSHIM_TensorType(tensor: *const HostTensor) -> c_int {
    tensor_ref(tensor).map_or(-1, |t| t.dtype().code())
}

#[no_mangle]
/// Returns the number of dimensions, or -1 for a null handle.
///
/// # Safety
/// `tensor` must be null or a live handle.
pub unsafe extern "C" fn TSHIM_NumDims(tensor: *const HostTensor) -> c_int {
    tensor_ref(tensor)
        .and_then(|t| c_int::try_from(t.num_dims()).ok())
        .unwrap_or(-1)
}

#[no_mangle]
/// Returns the size of dimension `index`, or -1 if the handle is null or the index is
/// out of range.
///
/// # Safety
/// `tensor` must be null or a live handle.
pub unsafe extern "C" fn TSHIM_Dim(tensor: *const HostTensor, index: c_int) -> i64 {
    let Some(tensor) = tensor_ref(tensor) else {
        return -1;
    };
    usize::try_from(index)
        .ok()
        .and_then(|i| tensor.dims().get(i).copied())
        .unwrap_or(-1)
}

#[no_mangle]
/// Returns the payload length of a string record, or 0 for null.
///
/// # Safety
/// `record` must be null or point to a record inside a live string tensor.
pub unsafe extern "C" fn TSHIM_StringGetSize(record: *const TString) -> usize {
    record.as_ref().map_or(0, TString::len)
}

#[no_mangle]
/// Returns the payload of a string record, valid while its tensor lives. Null for null.
///
/// # Safety
/// `record` must be null or point to a record inside a live string tensor.
pub unsafe extern "C" fn TSHIM_StringGetDataPointer(record: *const TString) -> *const c_char {
    record
        .as_ref()
        .map_or(std::ptr::null(), |r| r.as_bytes().as_ptr().cast())
}
