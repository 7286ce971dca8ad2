//! The handler registry.
//!
//! Built once, after both load attempts settle, from whichever builds reached
//! readiness. The registry is immutable once built: entries are never added,
//! removed or replaced afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::engine::{EngineKind, ReadyEngine};
use crate::error::{InvocationFault, Unavailable, panic_message};
use crate::loader::{EngineLoader, EngineVariant};
use crate::params::ProblemParams;
use crate::transfer::Transfer;

/// A named binding to one ready engine.
pub struct HandlerEntry {
    name: &'static str,
    engine: Arc<ReadyEngine>,
    /// Serializes invocations of this variant.
    gate: Arc<Mutex<()>>,
    invocations: AtomicU64,
}

impl HandlerEntry {
    fn new(engine: ReadyEngine) -> Self {
        Self {
            name: engine.kind().handler_name(),
            engine: Arc::new(engine),
            gate: Arc::new(Mutex::new(())),
            invocations: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> EngineKind {
        self.engine.kind()
    }

    pub fn engine(&self) -> &ReadyEngine {
        &self.engine
    }

    /// Completed calls into the engine, successful or not.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Run the engine once.
    ///
    /// Calls on the same entry run one at a time. The gate is held by the
    /// blocking task itself, so a caller dropping this future does not let a
    /// second call start while the first is still computing. A fault rejects
    /// this call only; the entry stays callable.
    pub async fn invoke(&self, params: ProblemParams) -> Result<Transfer, InvocationFault> {
        params
            .validate()
            .map_err(|e| InvocationFault::InvalidParams(e.to_string()))?;

        let guard = self.gate.clone().lock_owned().await;
        let engine = self.engine.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            engine.compute(&params)
        })
        .await;
        self.invocations.fetch_add(1, Ordering::Relaxed);

        let fault = match result {
            Ok(Ok(transfer)) => {
                tracing::debug!("{} produced {} bytes", self.name, transfer.len());
                return Ok(transfer);
            }
            Ok(Err(e)) => InvocationFault::Engine {
                handler: self.name.to_string(),
                message: e.message().to_string(),
            },
            Err(e) if e.is_panic() => InvocationFault::Panicked {
                handler: self.name.to_string(),
                message: panic_message(e.into_panic().as_ref()),
            },
            Err(e) => InvocationFault::Panicked {
                handler: self.name.to_string(),
                message: e.to_string(),
            },
        };
        tracing::warn!("{}", fault);
        Err(fault)
    }
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("name", &self.name)
            .field("engine", &self.engine)
            .field("invocations", &self.invocations())
            .finish()
    }
}

/// Handler name to entry, plus why the missing builds are missing.
#[derive(Debug, Default)]
pub struct Registry {
    entries: FxHashMap<&'static str, HandlerEntry>,
    unavailable: Vec<(EngineKind, Unavailable)>,
}

impl Registry {
    /// Aggregate load outcomes. Only ready builds become entries.
    pub fn from_variants(variants: impl IntoIterator<Item = EngineVariant>) -> Self {
        let mut registry = Self::default();
        for variant in variants {
            match variant {
                EngineVariant::Ready(engine) => {
                    let entry = HandlerEntry::new(engine);
                    registry.entries.insert(entry.name(), entry);
                }
                EngineVariant::Unavailable { kind, reason } => {
                    registry.unavailable.push((kind, reason));
                }
            }
        }
        registry.unavailable.sort_by_key(|(kind, _)| *kind);
        registry
    }

    pub fn get(&self, name: &str) -> Option<&HandlerEntry> {
        self.entries.get(name)
    }

    /// Registered handler names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn entries(&self) -> impl Iterator<Item = &HandlerEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True exactly when the accelerated build is registered.
    pub fn supports_accelerated(&self) -> bool {
        self.entries
            .contains_key(EngineKind::Accelerated.handler_name())
    }

    /// Builds that did not become ready, in kind order.
    pub fn unavailable(&self) -> &[(EngineKind, Unavailable)] {
        &self.unavailable
    }

    /// Invoke a handler by name.
    pub async fn invoke(&self, name: &str, params: ProblemParams) -> Result<Transfer, InvocationFault> {
        match self.get(name) {
            Some(entry) => entry.invoke(params).await,
            None => Err(InvocationFault::UnknownHandler(name.to_string())),
        }
    }
}

/// Builds the registry from both load attempts.
pub struct HandlerRegistry;

impl HandlerRegistry {
    /// Load both builds concurrently and register the ready ones.
    ///
    /// Waits for both outcomes; neither attempt delays or fails the other.
    /// The loader is consumed, so a build cannot be repeated with it:
    ///
    /// ```compile_fail
    /// # use tandem_core::{CapabilityFlags, EngineLoader, HandlerRegistry, ModuleSources};
    /// # async fn twice(sources: ModuleSources) {
    /// let loader = EngineLoader::new(CapabilityFlags::assume(true), sources);
    /// let first = HandlerRegistry::build(loader).await;
    /// let second = HandlerRegistry::build(loader).await;
    /// # }
    /// ```
    pub async fn build(loader: EngineLoader) -> Registry {
        let (standard, accelerated) = futures::future::join(
            loader.load(EngineKind::Standard),
            loader.load(EngineKind::Accelerated),
        )
        .await;

        let registry = Registry::from_variants([standard, accelerated]);
        tracing::info!(
            "Registry built: handlers={:?} accelerated={}",
            registry.names(),
            registry.supports_accelerated()
        );
        registry
    }
}
