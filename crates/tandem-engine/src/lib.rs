//! Reference computation engine for Tandem.
//!
//! Renders an escape-time fractal (`width` x `height` pixels, up to
//! `max_iterations` per pixel) into raw RGBA bytes. Ships as two builds
//! with identical output:
//!
//! - [`StandardEngine`] renders on the calling thread.
//! - [`AcceleratedEngine`] renders rows in parallel on a rayon pool that
//!   must be started through `init_thread_pool` first.
//!
//! Linked in-process through [`reference_sources`], or loaded as a shared
//! library through the C ABI in `ffi`.

mod accelerated;
mod ffi;
mod fractal;
mod standard;

pub use accelerated::AcceleratedEngine;
pub use ffi::{tandem_engine_compute, tandem_engine_init, tandem_engine_init_thread_pool};
pub use fractal::render;
pub use standard::StandardEngine;

use tandem_core::{InProcessSource, ModuleSources};

/// Module sources serving both builds from this crate.
pub fn reference_sources() -> ModuleSources {
    ModuleSources::new(
        InProcessSource::new("builtin:standard", || Box::new(StandardEngine::new())),
        InProcessSource::new("builtin:accelerated", || Box::new(AcceleratedEngine::new())),
    )
}
