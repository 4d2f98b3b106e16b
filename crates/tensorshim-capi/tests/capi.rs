use std::ffi::{c_char, c_void};

use tensorshim::{DataType, TString};
use tensorshim_capi::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

unsafe fn record_bytes<'a>(record: *const TString) -> &'a [u8] {
    let len = TSHIM_StringGetSize(record);
    if len == 0 {
        return &[];
    }
    std::slice::from_raw_parts(TSHIM_StringGetDataPointer(record).cast(), len)
}

#[test]
fn test_numeric_scalar() {
    init_logger();
    let value = 1234.5f64;
    unsafe {
        let tensor = TSHIM_NewTensorScalar(
            DataType::Double.code(),
            (&value as *const f64).cast::<c_void>(),
            8,
        );
        assert!(!tensor.is_null());
        assert_eq!(TSHIM_TensorType(tensor), DataType::Double.code());
        assert_eq!(TSHIM_NumDims(tensor), 0);
        assert_eq!(TSHIM_TensorByteSize(tensor), 8);
        assert_eq!(TSHIM_TensorData(tensor).cast::<f64>().read_unaligned(), value);
        TSHIM_DeleteTensor(tensor);
    }
}

#[test]
fn test_numeric_scalar_without_data() {
    unsafe {
        let tensor = TSHIM_NewTensorScalar(DataType::Int32.code(), std::ptr::null(), 4);
        assert!(!tensor.is_null());
        assert_eq!(TSHIM_TensorData(tensor).cast::<i32>().read_unaligned(), 0);
        TSHIM_DeleteTensor(tensor);
    }
}

#[test]
fn test_numeric_scalar_rejects_bad_dtype() {
    init_logger();
    unsafe {
        assert!(TSHIM_NewTensorScalar(8, std::ptr::null(), 4).is_null());
        assert!(TSHIM_NewTensorScalar(DataType::String.code(), std::ptr::null(), 4).is_null());
    }
}

#[test]
fn test_string_scalar() {
    let bytes = b"caf\xc3\xa9\0!";
    unsafe {
        let tensor = TSHIM_NewTensorStringScalar(bytes.as_ptr().cast(), bytes.len());
        assert!(!tensor.is_null());
        assert_eq!(TSHIM_TensorType(tensor), DataType::String.code());
        assert_eq!(TSHIM_NumDims(tensor), 0);
        assert_eq!(TSHIM_TensorByteSize(tensor), std::mem::size_of::<TString>());

        let record = TSHIM_TensorData(tensor).cast::<TString>();
        assert_eq!(record_bytes(record), bytes);
        TSHIM_DeleteTensor(tensor);
    }
}

#[test]
fn test_string_scalar_null_bytes() {
    unsafe {
        assert!(TSHIM_NewTensorStringScalar(std::ptr::null(), 3).is_null());

        let empty = TSHIM_NewTensorStringScalar(std::ptr::null(), 0);
        assert!(!empty.is_null());
        assert_eq!(TSHIM_StringGetSize(TSHIM_TensorData(empty).cast()), 0);
        TSHIM_DeleteTensor(empty);
    }
}

#[test]
fn test_string_vector() {
    let words: [&[u8]; 4] = [b"x", b"", b"a somewhat longer heap string", b"\0"];
    let ptrs: Vec<*const c_char> = words.iter().map(|w| w.as_ptr().cast()).collect();
    let lens: Vec<usize> = words.iter().map(|w| w.len()).collect();

    unsafe {
        let tensor = TSHIM_NewTensorStringVector(ptrs.as_ptr(), lens.as_ptr(), 4);
        assert!(!tensor.is_null());
        assert_eq!(TSHIM_NumDims(tensor), 1);
        assert_eq!(TSHIM_Dim(tensor, 0), 4);
        assert_eq!(TSHIM_Dim(tensor, 1), -1);
        assert_eq!(TSHIM_Dim(tensor, -1), -1);

        let records = TSHIM_TensorData(tensor).cast::<TString>();
        for (i, word) in words.iter().enumerate() {
            assert_eq!(record_bytes(records.add(i)), *word);
        }
        TSHIM_DeleteTensor(tensor);
    }
}

#[test]
fn test_string_vector_counts() {
    init_logger();
    unsafe {
        assert!(TSHIM_NewTensorStringVector(std::ptr::null(), std::ptr::null(), -1).is_null());

        let empty = TSHIM_NewTensorStringVector(std::ptr::null(), std::ptr::null(), 0);
        assert!(!empty.is_null());
        assert_eq!(TSHIM_Dim(empty, 0), 0);
        assert_eq!(TSHIM_TensorByteSize(empty), 0);
        TSHIM_DeleteTensor(empty);
    }
}
