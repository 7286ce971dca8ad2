//! Loading of a single engine build.
//!
//! Every attempt ends in an [`EngineVariant`]. Errors and panics anywhere in
//! fetch, initialization or pool bootstrap fold into
//! [`EngineVariant::Unavailable`], so one build failing can never take the
//! other down with it.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::capability::CapabilityFlags;
use crate::engine::{EngineKind, LoadedModule, ReadyEngine};
use crate::error::{LoadError, Unavailable, panic_message};
use crate::module::ModuleSources;
use crate::pool::{ThreadPoolInitializer, hardware_concurrency};

/// Outcome of one load attempt.
#[derive(Debug)]
pub enum EngineVariant {
    Ready(ReadyEngine),
    Unavailable { kind: EngineKind, reason: Unavailable },
}

impl EngineVariant {
    pub fn kind(&self) -> EngineKind {
        match self {
            Self::Ready(engine) => engine.kind(),
            Self::Unavailable { kind, .. } => *kind,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Loads engine builds against a frozen capability snapshot.
///
/// A loader is spent by [`HandlerRegistry::build`](crate::registry::HandlerRegistry::build),
/// so each build is attempted once per loader.
#[derive(Debug)]
pub struct EngineLoader {
    flags: CapabilityFlags,
    sources: ModuleSources,
    worker_count: Option<usize>,
}

impl EngineLoader {
    pub fn new(flags: CapabilityFlags, sources: ModuleSources) -> Self {
        Self {
            flags,
            sources,
            worker_count: None,
        }
    }

    /// Fixed pool size instead of the host's hardware concurrency.
    pub fn with_worker_count(mut self, worker_count: Option<usize>) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.flags
    }

    /// Attempt to bring `kind` to readiness.
    pub(crate) async fn load(&self, kind: EngineKind) -> EngineVariant {
        if kind.needs_pool() && !self.flags.threads() {
            tracing::debug!("Skipping {} engine: host lacks parallel execution", kind);
            return EngineVariant::Unavailable {
                kind,
                reason: Unavailable::NotSupported,
            };
        }

        let attempt = AssertUnwindSafe(self.try_load(kind)).catch_unwind().await;
        let outcome = match attempt {
            Ok(outcome) => outcome,
            Err(payload) => Err(LoadError::Panicked(panic_message(payload.as_ref())).into()),
        };

        match outcome {
            Ok(engine) => {
                tracing::info!("{} engine ready ({})", kind, engine.name());
                EngineVariant::Ready(engine)
            }
            Err(reason) => {
                tracing::warn!("{} engine unavailable: {}", kind, reason);
                EngineVariant::Unavailable { kind, reason }
            }
        }
    }

    async fn try_load(&self, kind: EngineKind) -> Result<ReadyEngine, Unavailable> {
        let source = self.sources.get(kind);
        tracing::debug!("Fetching {} engine from {}", kind, source.describe());
        let mut module = source.fetch(kind).await?;

        let module = tokio::task::spawn_blocking(move || {
            let name = module.name().to_string();
            module
                .initialize()
                .map(|()| module)
                .map_err(|e| LoadError::Init {
                    module: name,
                    message: e.message().to_string(),
                })
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                LoadError::Panicked(panic_message(e.into_panic().as_ref()))
            } else {
                LoadError::Panicked(e.to_string())
            }
        })??;

        let loaded = LoadedModule::new(kind, module);
        if !kind.needs_pool() {
            return Ok(ReadyEngine::standard(loaded)?);
        }

        // Read at call time, never cached ahead of bootstrap
        let worker_count = self.worker_count.unwrap_or_else(hardware_concurrency);
        Ok(ThreadPoolInitializer::initialize(loaded, worker_count).await?)
    }
}
