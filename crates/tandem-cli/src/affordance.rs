//! Console stand-in for UI controls.

use std::sync::atomic::{AtomicBool, Ordering};

use tandem_core::Affordance;

/// A command-line "button" named after a handler.
pub struct ConsoleAffordance {
    id: String,
    enabled: AtomicBool,
}

impl ConsoleAffordance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: AtomicBool::new(false),
        }
    }
}

impl Affordance for ConsoleAffordance {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            tracing::info!("{} {}", self.id, if enabled { "enabled" } else { "disabled" });
        }
    }
}
