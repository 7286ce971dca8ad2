//! Messages exchanged between the controller and the isolate thread.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::engine::EngineKind;
use crate::error::InvocationFault;
use crate::params::ProblemParams;
use crate::registry::Registry;
use crate::transfer::Transfer;

/// Command sent from the controller to the isolate.
#[derive(Debug)]
pub(crate) enum IsolateCommand {
    /// Run a handler and send the payload back.
    Invoke {
        /// Correlates log lines on both sides.
        id: Uuid,
        handler: String,
        params: ProblemParams,
        reply: oneshot::Sender<Result<Transfer, InvocationFault>>,
    },

    /// Stop serving commands and shut the isolate runtime down.
    Shutdown,
}

/// Description of one registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerInfo {
    pub name: String,
    pub kind: EngineKind,
    /// Module the handler is bound to.
    pub engine: String,
    /// Pool size (accelerated only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_count: Option<usize>,
}

/// Why a build is missing from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableInfo {
    pub kind: EngineKind,
    pub reason: String,
    /// False when the host simply lacks support.
    pub fault: bool,
}

/// What the isolate publishes once its registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    pub handlers: Vec<HandlerInfo>,
    pub supports_accelerated: bool,
    pub unavailable: Vec<UnavailableInfo>,
}

impl RegistryManifest {
    pub(crate) fn from_registry(registry: &Registry) -> Self {
        let handlers = registry
            .names()
            .into_iter()
            .filter_map(|name| registry.get(name))
            .map(|entry| HandlerInfo {
                name: entry.name().to_string(),
                kind: entry.kind(),
                engine: entry.engine().name().to_string(),
                worker_count: entry.engine().worker_count(),
            })
            .collect();

        let unavailable = registry
            .unavailable()
            .iter()
            .map(|(kind, reason)| UnavailableInfo {
                kind: *kind,
                reason: reason.to_string(),
                fault: reason.is_fault(),
            })
            .collect();

        Self {
            handlers,
            supports_accelerated: registry.supports_accelerated(),
            unavailable,
        }
    }
}
