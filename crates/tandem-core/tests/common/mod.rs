//! Scripted engine modules, sources and affordances for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use tandem_core::{
    Affordance, EngineKind, EngineModule, InProcessSource, IsolateSetup, LoadError, ModuleError,
    ModuleSource, ModuleSources, ProblemParams, StaticProbe,
};

/// A latch that blocks callers of `wait` until `open` is called.
#[derive(Clone, Default)]
pub struct Gate(Arc<(Mutex<bool>, Condvar)>);

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let (lock, cvar) = &*self.0;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    pub fn wait(&self) {
        let (lock, cvar) = &*self.0;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
    }
}

/// What a scripted module does wrong.
#[derive(Clone, Default)]
pub enum Fault {
    #[default]
    None,
    InitError,
    InitPanic,
    PoolError,
    PoolPanic,
    /// Pool bootstrap blocks until the gate opens, then succeeds.
    PoolStall(Gate),
    /// The first compute call fails, later ones succeed.
    ComputeErrorOnce,
    /// The first compute call panics, later ones succeed.
    ComputePanicOnce,
    /// Every compute call blocks until the gate opens.
    ComputeStall(Gate),
}

/// Observations from one module source.
#[derive(Default)]
pub struct Stats {
    pub fetches: AtomicUsize,
    pub inits: AtomicUsize,
    pub pool_inits: AtomicUsize,
    pub pool_workers: AtomicUsize,
    pub computes: AtomicUsize,
    /// Address of the last buffer handed out by `compute`.
    pub last_ptr: AtomicUsize,
}

impl Stats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct ScriptedModule {
    label: &'static str,
    fault: Fault,
    stats: Arc<Stats>,
    pool_ready: AtomicBool,
}

impl EngineModule for ScriptedModule {
    fn name(&self) -> &str {
        self.label
    }

    fn initialize(&mut self) -> Result<(), ModuleError> {
        self.stats.inits.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::InitError => Err(ModuleError::new("scripted init failure")),
            Fault::InitPanic => panic!("scripted init panic"),
            _ => Ok(()),
        }
    }

    fn init_thread_pool(&mut self, worker_count: usize) -> Result<(), ModuleError> {
        self.stats.pool_inits.fetch_add(1, Ordering::SeqCst);
        match &self.fault {
            Fault::PoolError => return Err(ModuleError::new("scripted pool failure")),
            Fault::PoolPanic => panic!("scripted pool panic"),
            Fault::PoolStall(gate) => gate.wait(),
            _ => {}
        }
        self.stats.pool_workers.store(worker_count, Ordering::SeqCst);
        self.pool_ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn compute(&self, params: &ProblemParams) -> Result<Vec<u8>, ModuleError> {
        let call = self.stats.computes.fetch_add(1, Ordering::SeqCst);
        match &self.fault {
            Fault::ComputeErrorOnce if call == 0 => {
                return Err(ModuleError::new("scripted compute failure"));
            }
            Fault::ComputePanicOnce if call == 0 => panic!("scripted compute panic"),
            Fault::ComputeStall(gate) => gate.wait(),
            _ => {}
        }

        let out = render(params);
        self.stats
            .last_ptr
            .store(out.as_ptr() as usize, Ordering::SeqCst);
        Ok(out)
    }
}

impl ScriptedModule {
    pub fn pool_ready(&self) -> bool {
        self.pool_ready.load(Ordering::SeqCst)
    }
}

/// Deterministic payload both scripted builds agree on.
pub fn render(params: &ProblemParams) -> Vec<u8> {
    let len = params.payload_len().unwrap_or(0);
    (0..len)
        .map(|i| ((i as u32).wrapping_mul(31) ^ params.max_iterations) as u8)
        .collect()
}

pub fn scripted(label: &'static str, fault: Fault, stats: Arc<Stats>) -> InProcessSource {
    InProcessSource::new(label, move || {
        stats.fetches.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedModule {
            label,
            fault: fault.clone(),
            stats: stats.clone(),
            pool_ready: AtomicBool::new(false),
        })
    })
}

/// Source whose fetch always fails.
pub struct MissingSource;

impl ModuleSource for MissingSource {
    fn describe(&self) -> String {
        "missing".to_string()
    }

    fn fetch(&self, _kind: EngineKind) -> BoxFuture<'_, Result<Box<dyn EngineModule>, LoadError>> {
        futures::future::ready(Err(LoadError::Fetch {
            origin: "missing".to_string(),
            message: "not found".to_string(),
        }))
        .boxed()
    }
}

/// Scripted setup and the stats of both sources.
pub struct Harness {
    pub setup: IsolateSetup,
    pub standard: Arc<Stats>,
    pub accelerated: Arc<Stats>,
}

pub fn harness(threads: bool, standard: Fault, accelerated: Fault) -> Harness {
    let standard_stats = Arc::new(Stats::default());
    let accelerated_stats = Arc::new(Stats::default());
    let sources = ModuleSources::new(
        scripted("scripted-standard", standard, standard_stats.clone()),
        scripted("scripted-accelerated", accelerated, accelerated_stats.clone()),
    );
    Harness {
        setup: IsolateSetup::new(sources).with_probe(StaticProbe(threads)),
        standard: standard_stats,
        accelerated: accelerated_stats,
    }
}

/// Affordance that records every enable/disable call.
pub struct RecordingAffordance {
    id: String,
    history: Mutex<Vec<bool>>,
}

impl RecordingAffordance {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn enabled(&self) -> bool {
        self.history.lock().unwrap().last().copied().unwrap_or(false)
    }

    pub fn ever_enabled(&self) -> bool {
        self.history.lock().unwrap().iter().any(|e| *e)
    }
}

impl Affordance for RecordingAffordance {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_enabled(&self, enabled: bool) {
        self.history.lock().unwrap().push(enabled);
    }
}
