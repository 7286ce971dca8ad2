//! C ABI for engine modules built as shared libraries.
//!
//! This module defines the exported symbol names, the function pointer
//! types a host resolves them to, and the status codes they return.
//!
//! ```text
//! tandem_engine_init() -> i32
//! tandem_engine_init_thread_pool(worker_count: usize) -> i32
//! tandem_engine_compute(variant, params_ptr, params_len, out_ptr, out_len) -> i32
//! ```
//!
//! `variant` names the build the host loaded the library as (see
//! [`variant_code`]), so one library can serve both builds without the
//! standard build picking up the accelerated pool. Parameters are
//! rkyv-encoded [`ProblemParams`](crate::params::ProblemParams). The output
//! buffer is allocated by the module with `libc::malloc` and freed by the host.

use crate::engine::EngineKind;

/// Symbol of the initialization entry point.
pub const INIT_SYMBOL: &str = "tandem_engine_init";

/// Symbol of the pool bootstrap entry point (accelerated builds).
pub const INIT_THREAD_POOL_SYMBOL: &str = "tandem_engine_init_thread_pool";

/// Symbol of the computation entry point.
pub const COMPUTE_SYMBOL: &str = "tandem_engine_compute";

/// Status code returned by every entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EngineStatus {
    /// Entry point succeeded
    Success = 0,
    /// Failed to decode or validate parameters
    BadParams = -1,
    /// Engine reported an error
    EngineError = -2,
    /// Worker pool could not be started
    PoolError = -3,
    /// Engine panicked
    Panic = -4,
}

impl EngineStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BadParams => "engine rejected the problem parameters",
            Self::EngineError => "engine returned an error",
            Self::PoolError => "engine failed to start its worker pool",
            Self::Panic => "engine panicked",
        }
    }
}

impl From<i32> for EngineStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Success,
            -1 => Self::BadParams,
            -2 => Self::EngineError,
            -3 => Self::PoolError,
            -4 => Self::Panic,
            _ => Self::EngineError, // Unknown codes treated as engine errors
        }
    }
}

/// Wire value of `kind` for the `variant` argument of `tandem_engine_compute`.
pub fn variant_code(kind: EngineKind) -> u32 {
    match kind {
        EngineKind::Standard => 0,
        EngineKind::Accelerated => 1,
    }
}

pub fn variant_from_code(code: u32) -> Option<EngineKind> {
    match code {
        0 => Some(EngineKind::Standard),
        1 => Some(EngineKind::Accelerated),
        _ => None,
    }
}

/// `tandem_engine_init`
pub type InitFn = unsafe extern "C" fn() -> i32;

/// `tandem_engine_init_thread_pool`
pub type InitThreadPoolFn = unsafe extern "C" fn(usize) -> i32;

/// `tandem_engine_compute`
pub type ComputeFn = unsafe extern "C" fn(
    u32,               // variant
    *const u8, usize,  // params
    *mut *mut u8, *mut usize,
) -> i32;

/// RAII guard for module-allocated output.
/// Ensures libc::free is called even if processing fails part way.
pub(crate) struct FfiBuffer {
    ptr: *mut u8,
}

impl FfiBuffer {
    /// # Safety
    ///
    /// `ptr` must be null or a live allocation from `libc::malloc` that no
    /// one else will free.
    pub(crate) unsafe fn new(ptr: *mut u8) -> Self {
        Self { ptr }
    }

    pub(crate) fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Copy the buffer into an owned vector.
    pub(crate) fn to_vec(&self, len: usize) -> Vec<u8> {
        if self.ptr.is_null() || len == 0 {
            return Vec::new();
        }
        // SAFETY: the module promised `len` readable bytes at `ptr`.
        unsafe { std::slice::from_raw_parts(self.ptr, len) }.to_vec()
    }
}

impl Drop for FfiBuffer {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                libc::free(self.ptr as *mut libc::c_void);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_status_from_i32() {
        assert_eq!(EngineStatus::from(0), EngineStatus::Success);
        assert_eq!(EngineStatus::from(-1), EngineStatus::BadParams);
        assert_eq!(EngineStatus::from(-2), EngineStatus::EngineError);
        assert_eq!(EngineStatus::from(-3), EngineStatus::PoolError);
        assert_eq!(EngineStatus::from(-4), EngineStatus::Panic);
        assert_eq!(EngineStatus::from(-99), EngineStatus::EngineError);
    }

    #[test]
    fn test_codes_match_discriminants() {
        for status in [
            EngineStatus::Success,
            EngineStatus::BadParams,
            EngineStatus::EngineError,
            EngineStatus::PoolError,
            EngineStatus::Panic,
        ] {
            assert_eq!(EngineStatus::from(status.code()), status);
        }
    }

    #[test]
    fn test_variant_codes() {
        for kind in EngineKind::ALL {
            assert_eq!(variant_from_code(variant_code(kind)), Some(kind));
        }
        assert_eq!(variant_from_code(7), None);
    }

    #[test]
    fn test_ffi_buffer_frees_malloc_allocation() {
        unsafe {
            let ptr = libc::malloc(8) as *mut u8;
            assert!(!ptr.is_null());
            std::ptr::copy_nonoverlapping([1u8, 2, 3, 4, 5, 6, 7, 8].as_ptr(), ptr, 8);

            let buffer = FfiBuffer::new(ptr);
            assert_eq!(buffer.to_vec(8), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        }
    }

    #[test]
    fn test_null_ffi_buffer() {
        let buffer = unsafe { FfiBuffer::new(std::ptr::null_mut()) };
        assert!(buffer.is_null());
        assert!(buffer.to_vec(16).is_empty());
    }
}
