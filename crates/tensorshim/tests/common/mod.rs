//! Instrumented allocators, records and engines shared by the integration tests.
//!
//! Every counter is thread local, and the test harness runs each test on its own
//! thread, so counts never leak between tests.

#![allow(dead_code)]

use std::{alloc::Layout, cell::Cell, ffi::c_void};

use tensorshim::{
    CpuAllocator, DataType, Deallocator, EngineError, HostEngine, HostTensor, RecordError,
    StringRecord, TString, TensorAllocator, TensorAllocatorError, TensorEngine, TensorHandle,
};

thread_local! {
    static ALLOCS: Cell<usize> = const { Cell::new(0) };
    static FREES: Cell<usize> = const { Cell::new(0) };
    static LIVE_BYTES: Cell<usize> = const { Cell::new(0) };
    static RECORD_ASSIGNS: Cell<usize> = const { Cell::new(0) };
    static RECORD_DEALLOCS: Cell<usize> = const { Cell::new(0) };
    static FAIL_ASSIGN_AFTER: Cell<Option<usize>> = const { Cell::new(None) };
}

fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>) {
    counter.with(|c| c.set(c.get() + 1));
}

/// Initializes logging once per test binary.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Snapshot of the counters on the current thread.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Counts {
    pub allocs: usize,
    pub frees: usize,
    pub live_bytes: usize,
    pub record_assigns: usize,
    pub record_deallocs: usize,
}

pub fn counts() -> Counts {
    Counts {
        allocs: ALLOCS.with(Cell::get),
        frees: FREES.with(Cell::get),
        live_bytes: LIVE_BYTES.with(Cell::get),
        record_assigns: RECORD_ASSIGNS.with(Cell::get),
        record_deallocs: RECORD_DEALLOCS.with(Cell::get),
    }
}

/// Makes every [`CountingRecord::assign`] after the first `n` fail.
pub fn fail_assign_after(n: usize) {
    FAIL_ASSIGN_AFTER.with(|f| f.set(Some(n)));
}

/// A system allocator that counts buffer allocations and frees.
#[derive(Clone, Debug, Default)]
pub struct CountingAllocator;

impl TensorAllocator for CountingAllocator {
    fn alloc(&self, layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
        let ptr = CpuAllocator.alloc(layout)?;
        bump(&ALLOCS);
        LIVE_BYTES.with(|b| b.set(b.get() + layout.size()));
        Ok(ptr)
    }

    fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        bump(&FREES);
        LIVE_BYTES.with(|b| b.set(b.get() - layout.size()));
        CpuAllocator.dealloc(ptr, layout)
    }
}

/// An allocator that is always out of memory.
#[derive(Clone, Debug, Default)]
pub struct FailingAllocator;

impl TensorAllocator for FailingAllocator {
    fn alloc(&self, _layout: Layout) -> Result<*mut u8, TensorAllocatorError> {
        bump(&ALLOCS);
        Err(TensorAllocatorError::NullPointer)
    }

    fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {
        bump(&FREES);
    }
}

/// A [`TString`] that counts its lifecycle calls and can be told to fail.
#[repr(transparent)]
#[derive(Debug, Default)]
pub struct CountingRecord(TString);

impl StringRecord for CountingRecord {
    fn empty() -> Self {
        Self(TString::empty())
    }

    fn assign(&mut self, bytes: &[u8]) -> Result<(), RecordError> {
        let done = RECORD_ASSIGNS.with(Cell::get);
        if FAIL_ASSIGN_AFTER.with(Cell::get).is_some_and(|n| done >= n) {
            return Err(RecordError::AllocationFailed { len: bytes.len() });
        }
        bump(&RECORD_ASSIGNS);
        self.0.assign(bytes)
    }

    fn dealloc(&mut self) {
        bump(&RECORD_DEALLOCS);
        self.0.dealloc()
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A host tensor whose string elements are [`CountingRecord`]s.
#[derive(Debug)]
pub struct CountingTensor(HostTensor);

impl TensorHandle for CountingTensor {
    type Record = CountingRecord;

    fn dtype(&self) -> DataType {
        self.0.dtype()
    }

    fn dims(&self) -> &[i64] {
        self.0.dims()
    }

    fn byte_size(&self) -> usize {
        self.0.byte_size()
    }

    fn data_ptr(&self) -> *mut u8 {
        self.0.data_ptr()
    }
}

/// A [`HostEngine`] storing [`CountingRecord`]s that can be told to reject every
/// adopted buffer.
#[derive(Clone, Debug, Default)]
pub struct CountingEngine {
    inner: HostEngine,
    reject: bool,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose `new_tensor` always fails without taking the buffer.
    pub fn rejecting() -> Self {
        Self {
            inner: HostEngine::default(),
            reject: true,
        }
    }
}

impl TensorEngine for CountingEngine {
    type Tensor = CountingTensor;
    type Record = CountingRecord;

    fn allocate_tensor(
        &self,
        dtype: DataType,
        dims: &[i64],
        len: usize,
    ) -> Result<CountingTensor, EngineError> {
        self.inner.allocate_tensor(dtype, dims, len).map(CountingTensor)
    }

    unsafe fn new_tensor(
        &self,
        dtype: DataType,
        dims: &[i64],
        data: *mut c_void,
        len: usize,
        deallocator: Deallocator,
        arg: *mut c_void,
    ) -> Result<CountingTensor, EngineError> {
        if self.reject {
            return Err(EngineError::ResourceExhausted { len, limit: 0 });
        }
        self.inner
            .new_tensor(dtype, dims, data, len, deallocator, arg)
            .map(CountingTensor)
    }
}
