//! Engine variants and the readiness typestate.
//!
//! A fetched and initialized module is a [`LoadedModule`]; it has no
//! computation entry point. Only a [`ReadyEngine`] can compute. For the
//! standard build, readiness follows directly from loading. For the
//! accelerated build, the only way to obtain a `ReadyEngine` is through
//! [`ThreadPoolInitializer::initialize`](crate::pool::ThreadPoolInitializer::initialize).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::module::{EngineModule, ModuleError};
use crate::params::ProblemParams;
use crate::transfer::Transfer;

/// Identifier of an engine build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Single-threaded build. No host requirements.
    Standard,
    /// Multi-threaded build. Needs parallel execution and a worker pool.
    Accelerated,
}

impl EngineKind {
    pub const ALL: [EngineKind; 2] = [EngineKind::Standard, EngineKind::Accelerated];

    /// Handler (and affordance) name for this build.
    pub fn handler_name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Accelerated => "accelerated",
        }
    }

    pub fn from_handler_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::Standard),
            "accelerated" => Some(Self::Accelerated),
            _ => None,
        }
    }

    /// Whether this build needs thread pool bootstrap.
    pub fn needs_pool(self) -> bool {
        matches!(self, Self::Accelerated)
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handler_name())
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_handler_name(s).ok_or_else(|| format!("unknown engine variant: {}", s))
    }
}

/// A fetched and initialized module that is not yet callable.
pub struct LoadedModule {
    kind: EngineKind,
    module: Box<dyn EngineModule>,
}

impl LoadedModule {
    pub(crate) fn new(kind: EngineKind, module: Box<dyn EngineModule>) -> Self {
        Self { kind, module }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        self.module.name()
    }

    pub(crate) fn into_parts(self) -> (EngineKind, Box<dyn EngineModule>) {
        (self.kind, self.module)
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("kind", &self.kind)
            .field("name", &self.module.name())
            .finish()
    }
}

/// An engine whose computation entry point may be called.
pub struct ReadyEngine {
    kind: EngineKind,
    name: String,
    worker_count: Option<usize>,
    module: Arc<dyn EngineModule>,
}

impl ReadyEngine {
    /// Promote a standard module. Accelerated modules are refused here.
    pub(crate) fn standard(loaded: LoadedModule) -> Result<Self, LoadError> {
        if loaded.kind.needs_pool() {
            return Err(LoadError::PoolRequired(loaded.name().to_string()));
        }
        let (kind, module) = loaded.into_parts();
        Ok(Self::new(kind, module, None))
    }

    /// Promote a module after its pool is up. Only the pool initializer calls this.
    pub(crate) fn with_pool(
        kind: EngineKind,
        module: Box<dyn EngineModule>,
        worker_count: usize,
    ) -> Self {
        Self::new(kind, module, Some(worker_count))
    }

    fn new(kind: EngineKind, module: Box<dyn EngineModule>, worker_count: Option<usize>) -> Self {
        Self {
            kind,
            name: module.name().to_string(),
            worker_count,
            module: Arc::from(module),
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pool size for accelerated engines.
    pub fn worker_count(&self) -> Option<usize> {
        self.worker_count
    }

    /// Call the computation entry point. Blocks the current thread.
    pub fn compute(&self, params: &ProblemParams) -> Result<Transfer, ModuleError> {
        self.module.compute(params).map(Transfer::new)
    }
}

impl fmt::Debug for ReadyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyEngine")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("worker_count", &self.worker_count)
            .finish()
    }
}
