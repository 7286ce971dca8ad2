//! Problem parameters passed to an engine's computation entry point.
//!
//! The engine renders a `width` x `height` escape-time image and returns
//! raw RGBA bytes, so the payload size is `width * height * 4`.

use rkyv::util::AlignedVec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes per output pixel (RGBA).
pub const BYTES_PER_PIXEL: usize = 4;

/// Upper bound on a single payload (1 GiB).
const MAX_PAYLOAD_BYTES: usize = 1 << 30;

/// Errors produced while validating or encoding parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("image dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("max_iterations must be non-zero")]
    ZeroIterations,

    #[error("payload for {width}x{height} exceeds {MAX_PAYLOAD_BYTES} bytes")]
    TooLarge { width: u32, height: u32 },

    #[error("failed to encode parameters: {0}")]
    Encode(String),

    #[error("failed to decode parameters: {0}")]
    Decode(String),
}

/// Parameters of a single engine computation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct ProblemParams {
    pub width: u32,
    pub height: u32,
    pub max_iterations: u32,
}

impl Default for ProblemParams {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            max_iterations: 1000,
        }
    }
}

impl ProblemParams {
    pub fn new(width: u32, height: u32, max_iterations: u32) -> Self {
        Self {
            width,
            height,
            max_iterations,
        }
    }

    /// Size in bytes of the payload an engine produces for these parameters.
    pub fn payload_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(BYTES_PER_PIXEL)
    }

    /// Check the parameters before they reach an engine.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.width == 0 || self.height == 0 {
            return Err(ParamsError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        if self.max_iterations == 0 {
            return Err(ParamsError::ZeroIterations);
        }
        match self.payload_len() {
            Some(len) if len <= MAX_PAYLOAD_BYTES => Ok(()),
            _ => Err(ParamsError::TooLarge {
                width: self.width,
                height: self.height,
            }),
        }
    }

    /// Encode for the dynamic library ABI.
    pub fn encode(&self) -> Result<AlignedVec, ParamsError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self).map_err(|e| ParamsError::Encode(e.to_string()))
    }

    /// Decode bytes received over the dynamic library ABI.
    ///
    /// The input may come from an arbitrary pointer, so it is copied into an
    /// aligned buffer and validated before use.
    pub fn decode(bytes: &[u8]) -> Result<Self, ParamsError> {
        let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| ParamsError::Decode(e.to_string()))
    }
}
