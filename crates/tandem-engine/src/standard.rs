//! Single-threaded build.

use tandem_core::{EngineModule, ModuleError, ProblemParams};

use crate::fractal;

/// Renders on the calling thread. Needs nothing from the host.
#[derive(Debug, Default)]
pub struct StandardEngine {
    initialized: bool,
}

impl StandardEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EngineModule for StandardEngine {
    fn name(&self) -> &str {
        "tandem-engine/standard"
    }

    fn initialize(&mut self) -> Result<(), ModuleError> {
        self.initialized = true;
        tracing::debug!("Standard engine initialized");
        Ok(())
    }

    fn compute(&self, params: &ProblemParams) -> Result<Vec<u8>, ModuleError> {
        if !self.initialized {
            return Err(ModuleError::new("standard engine used before initialization"));
        }
        params.validate().map_err(|e| ModuleError::new(e.to_string()))?;
        Ok(fractal::render(params))
    }
}
