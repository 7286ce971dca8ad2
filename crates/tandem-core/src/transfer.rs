//! Ownership-moving result payloads.
//!
//! An engine call produces a [`Transfer`] inside the isolated context. The
//! transfer is sent to the controller by value and turned into an
//! [`InvocationResult`] there. Neither type is `Clone`, and every conversion
//! consumes its input, so once a payload has been sent the producer holds no
//! handle to it. The heap allocation itself never moves or gets copied; only
//! the owning header crosses the channel.

use std::fmt;
use std::time::Duration;

use crate::engine::EngineKind;

/// Producer-side result buffer, owned by the isolated context until sent.
pub struct Transfer {
    buf: Vec<u8>,
}

impl Transfer {
    /// Take ownership of an engine's output buffer.
    pub fn new(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Address of the underlying allocation, for identity checks.
    pub fn as_ptr(&self) -> *const u8 {
        self.buf.as_ptr()
    }

    /// Hand the payload to the receiving side.
    pub fn into_result(self, variant: EngineKind, elapsed: Duration) -> InvocationResult {
        InvocationResult {
            bytes: self.buf,
            variant,
            elapsed,
        }
    }
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer").field("len", &self.buf.len()).finish()
    }
}

/// A payload received by the controlling context.
pub struct InvocationResult {
    bytes: Vec<u8>,
    variant: EngineKind,
    elapsed: Duration,
}

impl InvocationResult {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Variant that produced the payload.
    pub fn variant(&self) -> EngineKind {
        self.variant
    }

    /// Round-trip time observed by the caller.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Take the buffer out of the result.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for InvocationResult {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for InvocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationResult")
            .field("variant", &self.variant)
            .field("len", &self.bytes.len())
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result_keeps_allocation() {
        let transfer = Transfer::new(vec![7u8; 4096]);
        let ptr = transfer.as_ptr();

        let result = transfer.into_result(EngineKind::Standard, Duration::from_millis(3));
        assert_eq!(result.bytes().as_ptr(), ptr);
        assert_eq!(result.len(), 4096);
        assert_eq!(result.variant(), EngineKind::Standard);

        let bytes = result.into_bytes();
        assert_eq!(bytes.as_ptr(), ptr);
    }

    #[tokio::test]
    async fn test_channel_send_keeps_allocation() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let transfer = Transfer::new((0..=255u8).cycle().take(1 << 20).collect());
        let ptr = transfer.as_ptr() as usize;

        std::thread::spawn(move || {
            tx.send(transfer).unwrap();
        })
        .join()
        .unwrap();

        let received = rx.await.unwrap();
        assert_eq!(received.as_ptr() as usize, ptr);
        assert_eq!(received.len(), 1 << 20);
    }

    #[test]
    fn test_debug_omits_contents() {
        let transfer = Transfer::new(vec![1, 2, 3]);
        assert_eq!(format!("{:?}", transfer), "Transfer { len: 3 }");
    }
}
