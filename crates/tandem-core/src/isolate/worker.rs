//! Body of the isolate thread.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::capability::CapabilityFlags;
use crate::loader::EngineLoader;
use crate::registry::HandlerRegistry;

use super::IsolateSetup;
use super::protocol::{IsolateCommand, RegistryManifest};

/// How long in-flight engine calls get to finish once shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Build the registry, publish its manifest, then serve commands until told
/// to stop or every sender is gone.
pub(super) fn run(
    setup: IsolateSetup,
    mut commands: mpsc::UnboundedReceiver<IsolateCommand>,
    manifest_tx: oneshot::Sender<RegistryManifest>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            // Dropping the manifest sender reports the failure to the controller
            tracing::error!("Failed to start isolate runtime: {}", e);
            return;
        }
    };

    runtime.block_on(async move {
        let flags = CapabilityFlags::detect(setup.probe.as_ref()).await;
        let loader = EngineLoader::new(flags, setup.sources).with_worker_count(setup.worker_count);
        let registry = Arc::new(HandlerRegistry::build(loader).await);

        if manifest_tx
            .send(RegistryManifest::from_registry(&registry))
            .is_err()
        {
            tracing::debug!("Controller went away before the registry was published");
            return;
        }

        while let Some(command) = commands.recv().await {
            match command {
                IsolateCommand::Invoke {
                    id,
                    handler,
                    params,
                    reply,
                } => {
                    tracing::debug!("[{}] invoke {} {:?}", id, handler, params);
                    let registry = registry.clone();
                    tokio::spawn(async move {
                        let outcome = registry.invoke(&handler, params).await;
                        if reply.send(outcome).is_err() {
                            tracing::debug!("[{}] caller dropped, discarding result", id);
                        }
                    });
                }
                IsolateCommand::Shutdown => {
                    tracing::debug!("Isolate received shutdown");
                    break;
                }
            }
        }
    });

    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    tracing::info!("Isolate stopped");
}
