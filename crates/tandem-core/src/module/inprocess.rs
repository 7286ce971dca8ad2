//! Modules linked into the current binary.

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::engine::EngineKind;
use crate::error::LoadError;

use super::{EngineModule, ModuleSource};

type Factory = dyn Fn() -> Box<dyn EngineModule> + Send + Sync;

/// Source that constructs a module with a factory function.
pub struct InProcessSource {
    label: String,
    factory: Box<Factory>,
}

impl InProcessSource {
    pub fn new(
        label: impl Into<String>,
        factory: impl Fn() -> Box<dyn EngineModule> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            factory: Box::new(factory),
        }
    }
}

impl ModuleSource for InProcessSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn fetch(&self, kind: EngineKind) -> BoxFuture<'_, Result<Box<dyn EngineModule>, LoadError>> {
        async move {
            tracing::debug!("Constructing in-process {} module from {}", kind, self.label);
            Ok((self.factory)())
        }
        .boxed()
    }
}
