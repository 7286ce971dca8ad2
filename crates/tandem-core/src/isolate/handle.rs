//! Controller-side view of the isolate.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, OnceCell, mpsc, oneshot};
use uuid::Uuid;

use crate::engine::EngineKind;
use crate::error::{Error, InvocationFault, Result};
use crate::params::ProblemParams;
use crate::transfer::InvocationResult;

use super::IsolateSetup;
use super::protocol::{HandlerInfo, IsolateCommand, RegistryManifest, UnavailableInfo};
use super::worker;

/// Handle to a running isolate.
///
/// Dropping the handle asks the isolate to stop but does not wait for it.
pub struct IsolateHandle {
    commands: mpsc::UnboundedSender<IsolateCommand>,
    manifest: Mutex<Option<oneshot::Receiver<RegistryManifest>>>,
    handlers: OnceCell<Arc<Handlers>>,
    thread: Option<JoinHandle<()>>,
}

impl IsolateHandle {
    /// Start the isolate thread. Registry construction begins immediately.
    pub fn spawn(setup: IsolateSetup) -> Result<Self> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (manifest_tx, manifest_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name("tandem-isolate".to_string())
            .spawn(move || worker::run(setup, command_rx, manifest_tx))
            .map_err(|e| Error::Isolate(format!("Failed to spawn isolate thread: {}", e)))?;
        tracing::info!("Isolate started");

        Ok(Self {
            commands,
            manifest: Mutex::new(Some(manifest_rx)),
            handlers: OnceCell::new(),
            thread: Some(thread),
        })
    }

    /// The published handlers.
    ///
    /// Resolves once the isolate has built its registry. Every call returns
    /// the same `Arc`.
    pub async fn handlers(&self) -> Result<Arc<Handlers>> {
        let (manifest, commands) = (&self.manifest, &self.commands);
        self.handlers
            .get_or_try_init(|| async move {
                let exited = || Error::Isolate("isolate exited before publishing its registry".to_string());

                // Held across the wait so a cancelled caller leaves the
                // receiver in place for the next one
                let mut pending = manifest.lock().await;
                let rx = pending.as_mut().ok_or_else(exited)?;
                let received = rx.await;
                *pending = None;

                let manifest = received.map_err(|_| exited())?;
                Ok(Arc::new(Handlers::new(manifest, commands)))
            })
            .await
            .cloned()
    }

    /// Whether the registry has been received.
    pub fn is_published(&self) -> bool {
        self.handlers.initialized()
    }

    /// Stop the isolate and wait for its thread to exit.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.commands.send(IsolateCommand::Shutdown);
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || thread.join())
            .await
            .map_err(|e| Error::Isolate(e.to_string()))?
            .map_err(|_| Error::Isolate("isolate thread panicked".to_string()))
    }
}

impl Drop for IsolateHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.commands.send(IsolateCommand::Shutdown);
        }
    }
}

/// Controller-side copy of the published registry.
///
/// Immutable. Holds no engine state, only the names and a channel into the
/// isolate.
#[derive(Debug)]
pub struct Handlers {
    manifest: RegistryManifest,
    entries: FxHashMap<String, RemoteHandler>,
}

impl Handlers {
    fn new(manifest: RegistryManifest, commands: &mpsc::UnboundedSender<IsolateCommand>) -> Self {
        let entries = manifest
            .handlers
            .iter()
            .map(|info| {
                let handler = RemoteHandler {
                    name: info.name.clone(),
                    kind: info.kind,
                    commands: commands.clone(),
                };
                (info.name.clone(), handler)
            })
            .collect();
        Self { manifest, entries }
    }

    pub fn get(&self, name: &str) -> Option<&RemoteHandler> {
        self.entries.get(name)
    }

    /// Registered handler names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.manifest.handlers.iter().map(|h| h.name.as_str()).collect()
    }

    pub fn info(&self) -> &[HandlerInfo] {
        &self.manifest.handlers
    }

    /// True exactly when the accelerated build is registered.
    pub fn supports_accelerated(&self) -> bool {
        self.manifest.supports_accelerated
    }

    pub fn unavailable(&self) -> &[UnavailableInfo] {
        &self.manifest.unavailable
    }

    pub fn manifest(&self) -> &RegistryManifest {
        &self.manifest
    }
}

/// A handler reached through the isolate's command channel.
#[derive(Debug, Clone)]
pub struct RemoteHandler {
    name: String,
    kind: EngineKind,
    commands: mpsc::UnboundedSender<IsolateCommand>,
}

impl RemoteHandler {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Run the handler in the isolate.
    ///
    /// Dropping the returned future abandons the call; the isolate finishes
    /// it and discards the payload.
    pub async fn invoke(&self, params: ProblemParams) -> std::result::Result<InvocationResult, InvocationFault> {
        let id = Uuid::new_v4();
        let started = Instant::now();
        let (reply, rx) = oneshot::channel();

        self.commands
            .send(IsolateCommand::Invoke {
                id,
                handler: self.name.clone(),
                params,
                reply,
            })
            .map_err(|_| InvocationFault::IsolateGone)?;

        let transfer = rx.await.map_err(|_| InvocationFault::IsolateGone)??;
        let elapsed = started.elapsed();
        tracing::debug!("[{}] {} returned {} bytes in {:?}", id, self.name, transfer.len(), elapsed);
        Ok(transfer.into_result(self.kind, elapsed))
    }
}
