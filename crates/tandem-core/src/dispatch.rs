//! Controller-side binding of handlers to UI affordances.
//!
//! Each affordance moves through `Disabled -> Enabled -> Invoking -> Enabled`.
//! It starts disabled, becomes enabled only when a handler with the same name
//! was published, and always returns to enabled after an activation, however
//! the activation ends.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::engine::EngineKind;
use crate::error::DispatchError;
use crate::isolate::{Handlers, RemoteHandler};
use crate::params::ProblemParams;
use crate::transfer::InvocationResult;

/// A UI control bound to a handler of the same name.
pub trait Affordance: Send + Sync {
    /// Stable identifier, matching a handler name.
    fn id(&self) -> &str;

    /// Enable or disable the control.
    fn set_enabled(&self, enabled: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AffordanceState {
    Disabled,
    Enabled,
    Invoking,
}

struct Binding {
    affordance: Arc<dyn Affordance>,
    state: AffordanceState,
    handler: Option<RemoteHandler>,
}

/// Binds published handlers to affordances and activates them.
pub struct Dispatcher {
    handlers: Arc<Handlers>,
    bindings: Mutex<FxHashMap<String, Binding>>,
}

impl Dispatcher {
    pub fn new(handlers: Arc<Handlers>) -> Self {
        Self {
            handlers,
            bindings: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn handlers(&self) -> &Arc<Handlers> {
        &self.handlers
    }

    fn bindings(&self) -> MutexGuard<'_, FxHashMap<String, Binding>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking an affordance. It is disabled until attached.
    pub fn register(&self, affordance: Arc<dyn Affordance>) {
        affordance.set_enabled(false);
        let id = affordance.id().to_string();
        self.bindings().insert(
            id,
            Binding {
                affordance,
                state: AffordanceState::Disabled,
                handler: None,
            },
        );
    }

    /// Bind an affordance to the handler of the same name.
    ///
    /// Returns whether the affordance ended up enabled. A missing handler is
    /// not an error: the affordance just stays disabled. The accelerated
    /// affordance is only considered when the published registry reports
    /// accelerated support.
    ///
    /// The affordance is notified after the binding lock is released, so
    /// `set_enabled` may call back into the dispatcher.
    pub fn attach(&self, id: &str) -> Result<bool, DispatchError> {
        let affordance = {
            let mut bindings = self.bindings();
            let binding = bindings
                .get_mut(id)
                .ok_or_else(|| DispatchError::UnknownAffordance(id.to_string()))?;

            if binding.state != AffordanceState::Disabled {
                return Ok(true);
            }

            if EngineKind::from_handler_name(id) == Some(EngineKind::Accelerated)
                && !self.handlers.supports_accelerated()
            {
                tracing::debug!("Leaving {} disabled: accelerated build not available", id);
                return Ok(false);
            }

            let Some(handler) = self.handlers.get(id) else {
                tracing::debug!("Leaving {} disabled: no handler published", id);
                return Ok(false);
            };

            binding.handler = Some(handler.clone());
            binding.state = AffordanceState::Enabled;
            binding.affordance.clone()
        };

        affordance.set_enabled(true);
        tracing::debug!("Attached {}", id);
        Ok(true)
    }

    /// Attach `standard`, then `accelerated` if supported.
    ///
    /// Affordances that were never registered are skipped. Returns the ids
    /// that ended up enabled.
    pub fn attach_all(&self) -> Vec<&'static str> {
        let mut attached = Vec::new();
        for kind in EngineKind::ALL {
            if kind == EngineKind::Accelerated && !self.handlers.supports_accelerated() {
                continue;
            }
            let id = kind.handler_name();
            if let Ok(true) = self.attach(id) {
                attached.push(id);
            }
        }
        attached
    }

    pub fn state(&self, id: &str) -> Option<AffordanceState> {
        self.bindings().get(id).map(|b| b.state)
    }

    /// States of every registered affordance, sorted by id.
    pub fn states(&self) -> Vec<(String, AffordanceState)> {
        let mut states: Vec<_> = self
            .bindings()
            .iter()
            .map(|(id, b)| (id.clone(), b.state))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    /// Activate an enabled affordance.
    ///
    /// One activation per affordance is in flight at a time. The affordance
    /// goes back to `Enabled` when this returns or when the future is dropped.
    pub async fn activate(
        &self,
        id: &str,
        params: ProblemParams,
    ) -> Result<InvocationResult, DispatchError> {
        let handler = {
            let mut bindings = self.bindings();
            let binding = bindings
                .get_mut(id)
                .ok_or_else(|| DispatchError::UnknownAffordance(id.to_string()))?;
            match (binding.state, &binding.handler) {
                (AffordanceState::Invoking, _) => return Err(DispatchError::Busy(id.to_string())),
                (AffordanceState::Enabled, Some(handler)) => {
                    binding.state = AffordanceState::Invoking;
                    handler.clone()
                }
                _ => return Err(DispatchError::Disabled(id.to_string())),
            }
        };

        let _invoking = InvokingGuard {
            dispatcher: self,
            id,
        };
        Ok(handler.invoke(params).await?)
    }
}

/// Returns an affordance to `Enabled` however the activation ends.
struct InvokingGuard<'a> {
    dispatcher: &'a Dispatcher,
    id: &'a str,
}

impl Drop for InvokingGuard<'_> {
    fn drop(&mut self) {
        if let Some(binding) = self.dispatcher.bindings().get_mut(self.id) {
            binding.state = AffordanceState::Enabled;
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers.names())
            .field("states", &self.states())
            .finish()
    }
}
