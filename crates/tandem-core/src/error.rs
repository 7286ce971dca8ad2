//! Error types for tandem-core.
//!
//! Failures are contained where they are detected. Load and pool failures
//! narrow the set of available variants ([`Unavailable`]); invocation
//! failures reject a single call ([`InvocationFault`]). Neither is fatal to
//! the process.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for tandem-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Module fetch or initialization failed.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The module could not be fetched from its source.
    #[error("failed to fetch module from {origin}: {message}")]
    Fetch { origin: String, message: String },

    /// The module does not export a required entry point.
    #[error("module {module} does not export `{symbol}`")]
    MissingSymbol { module: String, symbol: String },

    /// The module's initialization entry point failed.
    #[error("module {module} failed to initialize: {message}")]
    Init { module: String, message: String },

    /// An accelerated module was offered for use without pool bootstrap.
    #[error("module {0} requires thread pool bootstrap before use")]
    PoolRequired(String),

    /// Loading panicked.
    #[error("module load panicked: {0}")]
    Panicked(String),
}

/// Thread pool bootstrap failed after a successful accelerated load.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// Worker count must be at least one.
    #[error("invalid worker count: {0}")]
    InvalidWorkerCount(usize),

    /// The module's pool bootstrap entry point failed.
    #[error("module {module} failed to start {worker_count} workers: {message}")]
    Bootstrap {
        module: String,
        worker_count: usize,
        message: String,
    },

    /// Bootstrap panicked.
    #[error("thread pool bootstrap panicked: {0}")]
    Panicked(String),
}

/// Why an engine variant did not become ready.
#[derive(Debug, Clone, Error)]
pub enum Unavailable {
    /// Host lacks the parallel execution primitives. Expected, not a fault.
    #[error("host does not support parallel execution")]
    NotSupported,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl Unavailable {
    /// Whether this is a fault rather than a capability gap.
    pub fn is_fault(&self) -> bool {
        !matches!(self, Self::NotSupported)
    }
}

/// A single invocation was rejected.
///
/// The handler entry stays registered and callable after any of these.
#[derive(Debug, Clone, Error)]
pub enum InvocationFault {
    /// Problem parameters failed validation before reaching the engine.
    #[error("invalid problem parameters: {0}")]
    InvalidParams(String),

    /// No handler with this name is registered.
    #[error("handler `{0}` is not registered")]
    UnknownHandler(String),

    /// The engine's computation entry point returned an error.
    #[error("engine `{handler}` failed: {message}")]
    Engine { handler: String, message: String },

    /// The engine's computation entry point panicked.
    #[error("engine `{handler}` panicked: {message}")]
    Panicked { handler: String, message: String },

    /// The isolated context stopped before answering.
    #[error("isolated context is no longer running")]
    IsolateGone,
}

/// Controller-side activation errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No affordance with this id was registered with the dispatcher.
    #[error("unknown affordance: {0}")]
    UnknownAffordance(String),

    /// The affordance is disabled and cannot be activated.
    #[error("affordance `{0}` is disabled")]
    Disabled(String),

    /// The affordance already has an invocation in flight.
    #[error("affordance `{0}` is busy")]
    Busy(String),

    #[error(transparent)]
    Invocation(#[from] InvocationFault),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Errors that can occur in tandem-core.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Invocation(#[from] InvocationFault),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The isolated execution context could not be started or exited early.
    #[error("isolate error: {0}")]
    Isolate(String),
}

/// Render a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
