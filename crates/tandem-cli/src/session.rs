//! A controller session: config, isolate, and dispatcher wired together.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tandem_core::{
    Config, DispatchError, Dispatcher, EngineKind, Handlers, InvocationResult, IsolateHandle,
    IsolateSetup, ProblemParams,
};

use crate::affordance::ConsoleAffordance;

pub struct Session {
    isolate: IsolateHandle,
    dispatcher: Dispatcher,
}

impl Session {
    /// Load config, start the isolate and wait for its handlers, then attach
    /// one console affordance per engine build.
    pub async fn start(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_config(config_path)?;
        let setup = IsolateSetup::from_config(&config, tandem_engine::reference_sources());
        tracing::debug!("Starting isolate with {:?}", setup);

        let isolate = IsolateHandle::spawn(setup)?;
        let handlers = isolate.handlers().await?;

        let dispatcher = Dispatcher::new(handlers);
        for kind in EngineKind::ALL {
            dispatcher.register(Arc::new(ConsoleAffordance::new(kind.handler_name())));
        }
        let attached = dispatcher.attach_all();
        tracing::debug!("Attached {:?}", attached);

        Ok(Self {
            isolate,
            dispatcher,
        })
    }

    pub fn handlers(&self) -> &Arc<Handlers> {
        self.dispatcher.handlers()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Activate the affordance for `kind`.
    pub async fn activate(
        &self,
        kind: EngineKind,
        params: ProblemParams,
    ) -> anyhow::Result<InvocationResult> {
        match self.dispatcher.activate(kind.handler_name(), params).await {
            Ok(result) => Ok(result),
            Err(DispatchError::Disabled(_)) => {
                let reason = self
                    .handlers()
                    .unavailable()
                    .iter()
                    .find(|u| u.kind == kind)
                    .map(|u| u.reason.clone())
                    .unwrap_or_else(|| "not registered".to_string());
                anyhow::bail!("{} engine is not available: {}", kind, reason)
            }
            Err(e) => Err(e).with_context(|| format!("{} engine failed", kind)),
        }
    }

    pub async fn close(self) -> anyhow::Result<()> {
        self.isolate.shutdown().await?;
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Config::load(path).context("Failed to load configuration")
}
