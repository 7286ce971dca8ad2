//! The isolated execution context.
//!
//! Engines live on a dedicated thread with its own single-threaded runtime.
//! The controller never touches them directly: it receives a manifest of the
//! registry once, then sends invocation commands over a channel and gets
//! payloads back by value.
//!
//! # Module Structure
//!
//! - `protocol` - Commands and the published manifest
//! - `worker` - The isolate thread body
//! - `handle` - Controller-side handle, handlers view, remote handler

mod handle;
mod protocol;
mod worker;

use std::fmt;
use std::sync::Arc;

use crate::capability::{CapabilityProbe, HostProbe};
use crate::config::Config;
use crate::module::ModuleSources;

pub use handle::{Handlers, IsolateHandle, RemoteHandler};
pub use protocol::{HandlerInfo, RegistryManifest, UnavailableInfo};

/// Everything the isolate needs to build its registry.
#[derive(Clone)]
pub struct IsolateSetup {
    probe: Arc<dyn CapabilityProbe>,
    sources: ModuleSources,
    worker_count: Option<usize>,
}

impl IsolateSetup {
    /// Probe the host and load from `sources`.
    pub fn new(sources: ModuleSources) -> Self {
        Self {
            probe: Arc::new(HostProbe::new()),
            sources,
            worker_count: None,
        }
    }

    /// Apply configured module paths, worker count and capability override
    /// on top of `fallback` sources.
    pub fn from_config(config: &Config, fallback: ModuleSources) -> Self {
        Self {
            probe: Arc::new(HostProbe::forced(config.threads)),
            sources: fallback.with_config(config),
            worker_count: config.worker_count,
        }
    }

    pub fn with_probe(mut self, probe: impl CapabilityProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn with_worker_count(mut self, worker_count: Option<usize>) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn sources(&self) -> &ModuleSources {
        &self.sources
    }
}

impl fmt::Debug for IsolateSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolateSetup")
            .field("sources", &self.sources)
            .field("worker_count", &self.worker_count)
            .finish_non_exhaustive()
    }
}
