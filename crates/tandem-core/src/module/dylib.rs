//! Engine modules loaded from shared libraries.

use std::path::{Path, PathBuf};

use futures::FutureExt;
use futures::future::BoxFuture;
use libloading::Library;

use crate::engine::EngineKind;
use crate::error::{LoadError, panic_message};
use crate::params::ProblemParams;

use super::ffi::{
    COMPUTE_SYMBOL, ComputeFn, EngineStatus, FfiBuffer, INIT_SYMBOL, INIT_THREAD_POOL_SYMBOL,
    InitFn, InitThreadPoolFn, variant_code,
};
use super::{EngineModule, ModuleError, ModuleSource};

/// Source that opens a shared library exporting the engine C ABI.
#[derive(Debug, Clone)]
pub struct DylibSource {
    path: PathBuf,
}

impl DylibSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModuleSource for DylibSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self, kind: EngineKind) -> BoxFuture<'_, Result<Box<dyn EngineModule>, LoadError>> {
        let path = self.path.clone();
        async move {
            let origin = path.display().to_string();
            tokio::task::spawn_blocking(move || DylibModule::open(&path, kind))
                .await
                .map_err(|e| {
                    if e.is_panic() {
                        LoadError::Panicked(panic_message(e.into_panic().as_ref()))
                    } else {
                        LoadError::Fetch {
                            origin,
                            message: e.to_string(),
                        }
                    }
                })?
                .map(|module| Box::new(module) as Box<dyn EngineModule>)
        }
        .boxed()
    }
}

/// A shared library with its entry points resolved.
///
/// The library stays mapped for as long as the module lives, which for a
/// published engine is the rest of the process.
pub struct DylibModule {
    name: String,
    kind: EngineKind,
    init: InitFn,
    init_thread_pool: Option<InitThreadPoolFn>,
    compute: ComputeFn,
    _library: Library,
}

impl DylibModule {
    /// Open the library and resolve the entry points `kind` needs.
    pub fn open(path: &Path, kind: EngineKind) -> Result<Self, LoadError> {
        let name = path.display().to_string();
        tracing::debug!("Opening {} engine library {}", kind, name);

        // Safety: loading runs the library's initializers. We only load
        // libraries named in configuration.
        let library = unsafe { Library::new(path) }.map_err(|e| LoadError::Fetch {
            origin: name.clone(),
            message: e.to_string(),
        })?;

        let missing = |symbol: &str| LoadError::MissingSymbol {
            module: name.clone(),
            symbol: symbol.to_string(),
        };

        // Safety: the signatures are fixed by the engine ABI (see `ffi`).
        let (init, compute, init_thread_pool) = unsafe {
            let init: InitFn = *library
                .get::<InitFn>(INIT_SYMBOL.as_bytes())
                .map_err(|_| missing(INIT_SYMBOL))?;
            let compute: ComputeFn = *library
                .get::<ComputeFn>(COMPUTE_SYMBOL.as_bytes())
                .map_err(|_| missing(COMPUTE_SYMBOL))?;
            let init_thread_pool = match library.get::<InitThreadPoolFn>(INIT_THREAD_POOL_SYMBOL.as_bytes()) {
                Ok(symbol) => Some(*symbol),
                Err(_) if kind.needs_pool() => return Err(missing(INIT_THREAD_POOL_SYMBOL)),
                Err(_) => None,
            };
            (init, compute, init_thread_pool)
        };

        Ok(Self {
            name,
            kind,
            init,
            init_thread_pool,
            compute,
            _library: library,
        })
    }
}

impl EngineModule for DylibModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) -> Result<(), ModuleError> {
        // Safety: resolved from the library we still hold.
        let status = EngineStatus::from(unsafe { (self.init)() });
        match status {
            EngineStatus::Success => Ok(()),
            other => Err(ModuleError::new(other.describe())),
        }
    }

    fn init_thread_pool(&mut self, worker_count: usize) -> Result<(), ModuleError> {
        let init_thread_pool = self.init_thread_pool.ok_or_else(|| {
            ModuleError::new(format!("{} does not export {}", self.name, INIT_THREAD_POOL_SYMBOL))
        })?;

        // Safety: resolved from the library we still hold. Returns once the
        // library's workers are running.
        let status = EngineStatus::from(unsafe { init_thread_pool(worker_count) });
        match status {
            EngineStatus::Success => Ok(()),
            other => Err(ModuleError::new(other.describe())),
        }
    }

    fn compute(&self, params: &ProblemParams) -> Result<Vec<u8>, ModuleError> {
        let encoded = params
            .encode()
            .map_err(|e| ModuleError::new(e.to_string()))?;

        let mut out_ptr: *mut u8 = std::ptr::null_mut();
        let mut out_len: usize = 0;

        // Safety: the params slice outlives the call; out params are valid.
        let code = unsafe {
            (self.compute)(
                variant_code(self.kind),
                encoded.as_ptr(),
                encoded.len(),
                &mut out_ptr,
                &mut out_len,
            )
        };

        // Take over the allocation before looking at the status so it is
        // freed on every path.
        let buffer = unsafe { FfiBuffer::new(out_ptr) };

        match EngineStatus::from(code) {
            EngineStatus::Success if buffer.is_null() || out_len == 0 => Err(ModuleError::new(
                format!("{} returned an empty payload", self.name),
            )),
            EngineStatus::Success => Ok(buffer.to_vec(out_len)),
            other => Err(ModuleError::new(other.describe())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::engine::{LoadedModule, ReadyEngine};
    use crate::error::InvocationFault;
    use crate::loader::EngineVariant;
    use crate::registry::Registry;

    static LAST_VARIANT: AtomicU32 = AtomicU32::new(u32::MAX);

    unsafe extern "C" fn init_ok() -> i32 {
        0
    }

    unsafe extern "C" fn init_fails() -> i32 {
        -2
    }

    unsafe extern "C" fn pool_fails(_: usize) -> i32 {
        -3
    }

    unsafe extern "C" fn compute_ok(
        variant: u32,
        _: *const u8,
        _: usize,
        out_ptr: *mut *mut u8,
        out_len: *mut usize,
    ) -> i32 {
        LAST_VARIANT.store(variant, Ordering::SeqCst);
        unsafe {
            let ptr = libc::malloc(4) as *mut u8;
            std::ptr::copy_nonoverlapping([9u8, 8, 7, 6].as_ptr(), ptr, 4);
            *out_ptr = ptr;
            *out_len = 4;
        }
        0
    }

    unsafe extern "C" fn compute_empty(_: u32, _: *const u8, _: usize, _: *mut *mut u8, _: *mut usize) -> i32 {
        0
    }

    unsafe extern "C" fn compute_engine_error(
        _: u32,
        _: *const u8,
        _: usize,
        _: *mut *mut u8,
        _: *mut usize,
    ) -> i32 {
        -2
    }

    unsafe extern "C" fn compute_panicked(_: u32, _: *const u8, _: usize, _: *mut *mut u8, _: *mut usize) -> i32 {
        -4
    }

    /// Module over in-process entry points, with the current process standing
    /// in for the library.
    #[cfg(unix)]
    fn module(kind: EngineKind, init: InitFn, compute: ComputeFn) -> DylibModule {
        DylibModule {
            name: "fake".to_string(),
            kind,
            init,
            init_thread_pool: Some(pool_fails as InitThreadPoolFn),
            compute,
            _library: libloading::os::unix::Library::this().into(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_status_codes_map_to_module_errors() {
        let mut failing = module(EngineKind::Standard, init_fails, compute_engine_error);
        let err = failing.initialize().unwrap_err();
        assert_eq!(err.message(), EngineStatus::EngineError.describe());

        let err = failing.init_thread_pool(2).unwrap_err();
        assert_eq!(err.message(), EngineStatus::PoolError.describe());

        let err = failing.compute(&ProblemParams::new(1, 1, 1)).unwrap_err();
        assert_eq!(err.message(), EngineStatus::EngineError.describe());

        let empty = module(EngineKind::Standard, init_ok, compute_empty);
        let err = empty.compute(&ProblemParams::new(1, 1, 1)).unwrap_err();
        assert!(err.message().contains("empty payload"));
    }

    #[cfg(unix)]
    #[test]
    fn test_compute_passes_variant_and_takes_output() {
        let mut accelerated = module(EngineKind::Accelerated, init_ok, compute_ok);
        accelerated.initialize().unwrap();
        let bytes = accelerated.compute(&ProblemParams::new(1, 1, 1)).unwrap();
        assert_eq!(bytes, vec![9, 8, 7, 6]);
        assert_eq!(LAST_VARIANT.load(Ordering::SeqCst), variant_code(EngineKind::Accelerated));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_status_codes_reach_invocation_faults() {
        let fails = |compute| {
            let loaded = LoadedModule::new(
                EngineKind::Standard,
                Box::new(module(EngineKind::Standard, init_ok, compute)),
            );
            Registry::from_variants([EngineVariant::Ready(ReadyEngine::standard(loaded).unwrap())])
        };
        let params = ProblemParams::new(2, 2, 4);

        let err = fails(compute_engine_error as ComputeFn)
            .invoke("standard", params)
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationFault::Engine { message, .. } if message == "engine returned an error"));

        let err = fails(compute_panicked as ComputeFn)
            .invoke("standard", params)
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationFault::Engine { message, .. } if message == "engine panicked"));
    }

    #[test]
    fn test_open_missing_library() {
        let err = DylibModule::open(Path::new("/nonexistent/libtandem_missing.so"), EngineKind::Standard)
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Fetch { origin, .. } if origin.contains("libtandem_missing")));
    }

    #[tokio::test]
    async fn test_fetch_missing_library_is_load_error() {
        let source = DylibSource::new("/nonexistent/libtandem_missing.so");
        assert_eq!(source.describe(), "/nonexistent/libtandem_missing.so");

        let result = source.fetch(EngineKind::Accelerated).await;
        assert!(matches!(result, Err(LoadError::Fetch { .. })));
    }
}
