//! Engine module contract and the sources modules are fetched from.
//!
//! # Module Structure
//!
//! - `inprocess` - Modules linked into the current binary
//! - `dylib` - Modules loaded from a shared library via libloading
//! - `ffi` - C ABI shared by host and shared-library engines

mod dylib;
pub mod ffi;
mod inprocess;

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::config::Config;
use crate::engine::EngineKind;
use crate::error::LoadError;
use crate::params::ProblemParams;

pub use dylib::{DylibModule, DylibSource};
pub use inprocess::InProcessSource;

/// Error reported by a module entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ModuleError(String);

impl ModuleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for ModuleError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ModuleError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Entry points every engine build exports.
///
/// `initialize` and `init_thread_pool` are called once, from a blocking
/// task, before the module is published. `compute` is only reachable through
/// a [`ReadyEngine`](crate::engine::ReadyEngine).
pub trait EngineModule: Send + Sync + 'static {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Module initialization. Takes no arguments.
    fn initialize(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Bring up the module's worker pool. Accelerated builds only.
    fn init_thread_pool(&mut self, worker_count: usize) -> Result<(), ModuleError> {
        let _ = worker_count;
        Err(ModuleError::new(format!(
            "{} does not export a thread pool entry point",
            self.name()
        )))
    }

    /// Run one computation.
    fn compute(&self, params: &ProblemParams) -> Result<Vec<u8>, ModuleError>;
}

/// Where a module comes from.
pub trait ModuleSource: Send + Sync {
    /// Human-readable origin, for logs.
    fn describe(&self) -> String;

    /// Fetch an uninitialized module for the given build.
    fn fetch(&self, kind: EngineKind) -> BoxFuture<'_, Result<Box<dyn EngineModule>, LoadError>>;
}

/// One source per engine build.
#[derive(Clone)]
pub struct ModuleSources {
    standard: Arc<dyn ModuleSource>,
    accelerated: Arc<dyn ModuleSource>,
}

impl ModuleSources {
    pub fn new(
        standard: impl ModuleSource + 'static,
        accelerated: impl ModuleSource + 'static,
    ) -> Self {
        Self {
            standard: Arc::new(standard),
            accelerated: Arc::new(accelerated),
        }
    }

    pub fn get(&self, kind: EngineKind) -> &Arc<dyn ModuleSource> {
        match kind {
            EngineKind::Standard => &self.standard,
            EngineKind::Accelerated => &self.accelerated,
        }
    }

    /// Replace a build's source.
    pub fn with_source(mut self, kind: EngineKind, source: Arc<dyn ModuleSource>) -> Self {
        match kind {
            EngineKind::Standard => self.standard = source,
            EngineKind::Accelerated => self.accelerated = source,
        }
        self
    }

    /// Swap in shared-library sources for any module path set in `config`.
    pub fn with_config(self, config: &Config) -> Self {
        let mut sources = self;
        for kind in EngineKind::ALL {
            if let Some(path) = config.module_path(kind) {
                sources = sources.with_source(kind, Arc::new(DylibSource::new(path)));
            }
        }
        sources
    }
}

impl fmt::Debug for ModuleSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSources")
            .field("standard", &self.standard.describe())
            .field("accelerated", &self.accelerated.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    struct Noop;

    impl EngineModule for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn compute(&self, _: &ProblemParams) -> Result<Vec<u8>, ModuleError> {
            Ok(Vec::new())
        }
    }

    fn builtin() -> InProcessSource {
        InProcessSource::new("builtin", || Box::new(Noop))
    }

    #[test]
    fn test_default_pool_entry_point_fails() {
        let mut module = Noop;
        let err = module.init_thread_pool(4).unwrap_err();
        assert!(err.message().contains("noop"));
    }

    #[test]
    fn test_with_config_overrides_only_configured_paths() {
        let config = Config {
            accelerated_module: Some(PathBuf::from("/opt/engine/libparallel.so")),
            ..Config::default()
        };

        let sources = ModuleSources::new(builtin(), builtin()).with_config(&config);
        assert_eq!(sources.get(EngineKind::Standard).describe(), "builtin");
        assert_eq!(
            sources.get(EngineKind::Accelerated).describe(),
            "/opt/engine/libparallel.so"
        );
    }
}
