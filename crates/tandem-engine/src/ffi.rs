//! C ABI exports for the shared-library build.
//!
//! One library serves both builds. `tandem_engine_init_thread_pool` starts a
//! process-wide pool. `tandem_engine_compute` renders on that pool only when
//! called as the accelerated build; the standard build always renders on the
//! calling thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;

use rayon::ThreadPool;
use tandem_core::module::ffi::{EngineStatus, variant_from_code};
use tandem_core::{EngineKind, ProblemParams};

use crate::{accelerated, fractal};

static POOL: OnceLock<ThreadPool> = OnceLock::new();

#[unsafe(no_mangle)]
pub extern "C" fn tandem_engine_init() -> i32 {
    EngineStatus::Success.code()
}

#[unsafe(no_mangle)]
pub extern "C" fn tandem_engine_init_thread_pool(worker_count: usize) -> i32 {
    let result = catch_unwind(|| {
        if worker_count == 0 {
            return EngineStatus::PoolError;
        }
        if POOL.get().is_some() {
            return EngineStatus::Success;
        }
        match accelerated::start_pool(worker_count) {
            // First pool set wins
            Ok(pool) => {
                let _ = POOL.set(pool);
                EngineStatus::Success
            }
            Err(_) => EngineStatus::PoolError,
        }
    });
    result.unwrap_or(EngineStatus::Panic).code()
}

/// Pool the given build renders on. `None` means the calling thread.
fn pool_for(kind: EngineKind, pool: &OnceLock<ThreadPool>) -> Result<Option<&ThreadPool>, EngineStatus> {
    match kind {
        EngineKind::Standard => Ok(None),
        EngineKind::Accelerated => pool.get().map(Some).ok_or(EngineStatus::EngineError),
    }
}

/// # Safety
///
/// `params_ptr` must point to `params_len` readable bytes. `out_ptr` and
/// `out_len` must be valid for writes. On success `*out_ptr` is a
/// `libc::malloc` allocation the caller must free.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tandem_engine_compute(
    variant: u32,
    params_ptr: *const u8,
    params_len: usize,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> i32 {
    if params_ptr.is_null() || out_ptr.is_null() || out_len.is_null() {
        return EngineStatus::BadParams.code();
    }
    let Some(kind) = variant_from_code(variant) else {
        return EngineStatus::BadParams.code();
    };

    // SAFETY: caller guarantees the params slice is readable.
    let bytes = unsafe { std::slice::from_raw_parts(params_ptr, params_len) };
    let (params, len) = match ProblemParams::decode(bytes) {
        Ok(params) if params.validate().is_ok() => match params.payload_len() {
            Some(len) => (params, len),
            None => return EngineStatus::BadParams.code(),
        },
        _ => return EngineStatus::BadParams.code(),
    };
    let pool = match pool_for(kind, &POOL) {
        Ok(pool) => pool,
        Err(status) => return status.code(),
    };

    // SAFETY: plain allocation, checked for null below.
    let ptr = unsafe { libc::malloc(len) } as *mut u8;
    if ptr.is_null() {
        return EngineStatus::EngineError.code();
    }

    // Rendered in place; the buffer handed back is the one written here.
    let rendered = catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: `ptr` is a fresh allocation of `len` bytes owned by this call.
        let buf = unsafe { std::slice::from_raw_parts_mut(ptr, len) };
        match pool {
            Some(pool) => accelerated::render_parallel_into(pool, &params, buf),
            None => fractal::render_into(&params, buf),
        }
    }));
    if rendered.is_err() {
        // SAFETY: allocated above and not yet handed out.
        unsafe { libc::free(ptr as *mut libc::c_void) };
        return EngineStatus::Panic.code();
    }

    // SAFETY: the out params are valid per the caller contract.
    unsafe {
        *out_ptr = ptr;
        *out_len = len;
    }
    EngineStatus::Success.code()
}
