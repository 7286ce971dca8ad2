//! Thread pool bootstrap for the accelerated engine.

use std::num::NonZeroUsize;

use crate::engine::{LoadedModule, ReadyEngine};
use crate::error::{PoolError, panic_message};

/// Hardware concurrency reported by the host right now.
///
/// Falls back to 1 when the host does not report it.
pub fn hardware_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Brings up the worker pool an accelerated module depends on.
pub struct ThreadPoolInitializer;

impl ThreadPoolInitializer {
    /// Start `worker_count` workers in the module and promote it to ready.
    ///
    /// Consumes the loaded module: on failure it is dropped, and the only
    /// path to a callable accelerated engine is a successful return here.
    pub async fn initialize(
        loaded: LoadedModule,
        worker_count: usize,
    ) -> Result<ReadyEngine, PoolError> {
        if worker_count == 0 {
            return Err(PoolError::InvalidWorkerCount(worker_count));
        }

        let (kind, mut module) = loaded.into_parts();
        let name = module.name().to_string();
        tracing::debug!("Starting {} workers for {}", worker_count, name);

        let module = tokio::task::spawn_blocking(move || {
            module
                .init_thread_pool(worker_count)
                .map(|()| module)
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                PoolError::Panicked(panic_message(e.into_panic().as_ref()))
            } else {
                PoolError::Panicked(e.to_string())
            }
        })?
        .map_err(|e| PoolError::Bootstrap {
            module: name.clone(),
            worker_count,
            message: e.message().to_string(),
        })?;

        tracing::info!("Thread pool ready for {} ({} workers)", name, worker_count);
        Ok(ReadyEngine::with_pool(kind, module, worker_count))
    }
}
