//! Core of Tandem: capability-negotiated loading and dispatch of a computation engine.
//!
//! This crate provides:
//! - Host capability probing for parallel execution
//! - Concurrent, independent loading of the standard and accelerated engine builds
//! - Thread pool bootstrap gating the accelerated build
//! - A read-only handler registry built once inside an isolated execution context
//! - A controller-side dispatcher binding handlers to UI affordances
//! - An ownership-moving result convention across the isolation boundary
//!
//! # Architecture
//!
//! ```text
//! IsolateHandle (controller)                 isolate thread (own runtime)
//!     │                                          │
//!     │                                          ├── CapabilityFlags::detect
//!     │                                          ├── EngineLoader::load(Standard)  ┐ joined
//!     │                                          ├── EngineLoader::load(Accelerated)┘
//!     │                                          │       └── ThreadPoolInitializer
//!     │   ◄── RegistryManifest (published once) ─┤── HandlerRegistry::build
//!     │                                          │
//!     ├── Dispatcher::attach / activate          │
//!     │       └── IsolateCommand::Invoke ──────► ├── HandlerEntry::invoke
//!     │   ◄── Transfer (moved, never copied) ────┘
//! ```

pub mod capability;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod isolate;
pub mod loader;
pub mod module;
pub mod params;
pub mod pool;
pub mod registry;
pub mod transfer;

pub use capability::{CapabilityFlags, CapabilityProbe, HostProbe, StaticProbe};
pub use config::Config;
pub use dispatch::{Affordance, AffordanceState, Dispatcher};
pub use engine::{EngineKind, LoadedModule, ReadyEngine};
pub use error::{
    ConfigError, DispatchError, Error, InvocationFault, LoadError, PoolError, Result, Unavailable,
};
pub use isolate::{Handlers, IsolateHandle, IsolateSetup, RegistryManifest, RemoteHandler};
pub use loader::{EngineLoader, EngineVariant};
pub use module::{DylibSource, EngineModule, InProcessSource, ModuleError, ModuleSource, ModuleSources};
pub use params::{ParamsError, ProblemParams};
pub use pool::{ThreadPoolInitializer, hardware_concurrency};
pub use registry::{HandlerEntry, HandlerRegistry, Registry};
pub use transfer::{InvocationResult, Transfer};
