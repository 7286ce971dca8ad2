//! Multi-threaded build backed by a rayon pool.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tandem_core::{EngineModule, ModuleError, ProblemParams};

use crate::fractal;

/// Renders rows in parallel on a dedicated pool.
///
/// The pool is owned by the engine and created by `init_thread_pool`;
/// `compute` fails until then.
#[derive(Debug, Default)]
pub struct AcceleratedEngine {
    pool: Option<ThreadPool>,
}

impl AcceleratedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workers in the pool, once started.
    pub fn worker_count(&self) -> Option<usize> {
        self.pool.as_ref().map(ThreadPool::current_num_threads)
    }
}

/// Build a pool of `worker_count` named threads and wait until every worker
/// has run once.
pub(crate) fn start_pool(worker_count: usize) -> Result<ThreadPool, String> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|i| format!("tandem-engine-{}", i))
        .build()
        .map_err(|e| e.to_string())?;

    let started = pool.broadcast(|ctx| ctx.index()).len();
    if started != worker_count {
        return Err(format!("{} of {} workers started", started, worker_count));
    }
    Ok(pool)
}

/// Render rows in parallel on `pool`.
pub(crate) fn render_parallel(pool: &ThreadPool, params: &ProblemParams) -> Vec<u8> {
    let mut buf = vec![0u8; fractal::row_len(params) * params.height as usize];
    render_parallel_into(pool, params, &mut buf);
    buf
}

pub(crate) fn render_parallel_into(pool: &ThreadPool, params: &ProblemParams, buf: &mut [u8]) {
    let row_len = fractal::row_len(params);
    pool.install(|| {
        buf.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| fractal::render_row(params, y, row));
    });
}

impl EngineModule for AcceleratedEngine {
    fn name(&self) -> &str {
        "tandem-engine/accelerated"
    }

    fn init_thread_pool(&mut self, worker_count: usize) -> Result<(), ModuleError> {
        if self.pool.is_some() {
            return Err(ModuleError::new("thread pool already started"));
        }
        let pool = start_pool(worker_count).map_err(ModuleError::new)?;
        tracing::debug!("Accelerated engine pool started with {} workers", worker_count);
        self.pool = Some(pool);
        Ok(())
    }

    fn compute(&self, params: &ProblemParams) -> Result<Vec<u8>, ModuleError> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| ModuleError::new("accelerated engine used before its pool started"))?;
        params.validate().map_err(|e| ModuleError::new(e.to_string()))?;
        Ok(render_parallel(pool, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_requires_pool() {
        let engine = AcceleratedEngine::new();
        let err = engine.compute(&ProblemParams::new(4, 4, 10)).unwrap_err();
        assert!(err.message().contains("pool"));
    }

    #[test]
    fn test_pool_starts_requested_workers() {
        let mut engine = AcceleratedEngine::new();
        engine.init_thread_pool(3).unwrap();
        assert_eq!(engine.worker_count(), Some(3));
        assert!(engine.init_thread_pool(3).is_err());
    }

    #[test]
    fn test_matches_sequential_render() {
        let mut engine = AcceleratedEngine::new();
        engine.init_thread_pool(4).unwrap();

        let params = ProblemParams::new(33, 17, 80);
        assert_eq!(engine.compute(&params).unwrap(), fractal::render(&params));
    }
}
