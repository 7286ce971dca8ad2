//! Host capability probing.
//!
//! The accelerated engine needs real parallel execution: the ability to
//! spawn OS threads that run alongside the caller. [`HostProbe`] asks the
//! host once; the answer is frozen into [`CapabilityFlags`] before any
//! accelerated load starts. An unsupported host yields `false`, never an
//! error.

use futures::FutureExt;
use futures::future::BoxFuture;

/// Asynchronous query: are parallel execution primitives available?
pub trait CapabilityProbe: Send + Sync {
    fn probe(&self) -> BoxFuture<'_, bool>;
}

/// Probe backed by the current host.
///
/// Reports `true` when the host reports its available parallelism and a
/// probe thread can be spawned and joined. A configured override replaces
/// the host query entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe {
    forced: Option<bool>,
}

impl HostProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `threads` without asking the host.
    pub fn forced(threads: Option<bool>) -> Self {
        Self { forced: threads }
    }
}

impl CapabilityProbe for HostProbe {
    fn probe(&self) -> BoxFuture<'_, bool> {
        async move {
            if let Some(threads) = self.forced {
                tracing::debug!("Thread support forced to {}", threads);
                return threads;
            }
            match tokio::task::spawn_blocking(host_supports_threads).await {
                Ok(supported) => supported,
                Err(e) => {
                    tracing::debug!("Capability probe task failed: {}", e);
                    false
                }
            }
        }
        .boxed()
    }
}

/// Read-only inspection of the host's threading support.
fn host_supports_threads() -> bool {
    if let Err(e) = std::thread::available_parallelism() {
        tracing::debug!("Host does not report available parallelism: {}", e);
        return false;
    }

    match std::thread::Builder::new()
        .name("tandem-probe".to_string())
        .spawn(|| ())
    {
        Ok(handle) => handle.join().is_ok(),
        Err(e) => {
            tracing::debug!("Host cannot spawn threads: {}", e);
            false
        }
    }
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl CapabilityProbe for StaticProbe {
    fn probe(&self) -> BoxFuture<'_, bool> {
        futures::future::ready(self.0).boxed()
    }
}

/// Snapshot of host parallel-execution support.
///
/// Computed once per process, before the accelerated loader runs, and never
/// re-probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityFlags {
    threads: bool,
}

impl CapabilityFlags {
    /// Ask `probe` once and freeze the answer.
    pub async fn detect(probe: &dyn CapabilityProbe) -> Self {
        let threads = probe.probe().await;
        tracing::info!("Parallel execution supported: {}", threads);
        Self { threads }
    }

    /// Flags with a known answer.
    pub const fn assume(threads: bool) -> Self {
        Self { threads }
    }

    /// Whether the accelerated engine may be loaded.
    pub fn threads(&self) -> bool {
        self.threads
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingProbe {
        answer: bool,
        calls: AtomicUsize,
    }

    impl CapabilityProbe for CountingProbe {
        fn probe(&self) -> BoxFuture<'_, bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(self.answer).boxed()
        }
    }

    #[tokio::test]
    async fn test_detect_queries_once() {
        let probe = CountingProbe {
            answer: true,
            calls: AtomicUsize::new(0),
        };
        let flags = CapabilityFlags::detect(&probe).await;
        assert!(flags.threads());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

        // Copies share the snapshot without asking again
        let copy = flags;
        assert_eq!(copy, flags);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forced_answers() {
        assert!(!HostProbe::forced(Some(false)).probe().await);
        assert!(HostProbe::forced(Some(true)).probe().await);
    }

    #[tokio::test]
    async fn test_host_probe_on_test_host() {
        // The test harness itself runs on spawned threads.
        assert!(HostProbe::new().probe().await);
    }

    #[tokio::test]
    async fn test_static_probe() {
        assert!(!StaticProbe(false).probe().await);
        assert!(!CapabilityFlags::assume(false).threads());
    }
}
