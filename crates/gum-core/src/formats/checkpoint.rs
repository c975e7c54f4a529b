//! # Run-State Checkpoint
//!
//! Binary encoding of a machine's graph and step counter, so a run can be
//! resumed by a later invocation.
//!
//! Format: Header (5 bytes) + postcard-serialized [`RunState`].
//! - 4 bytes: Magic ("GUMS")
//! - 1 byte: Version
//!
//! Rules and configuration are never part of a checkpoint; they always come
//! from the genome document.
//!
//! Size and header are validated before the payload is decoded.

use crate::{GumError, SerializableGraph};
use serde::{Deserialize, Serialize};

/// Magic bytes of a run-state checkpoint.
pub const MAGIC_BYTES: &[u8; 4] = b"GUMS";

/// Current checkpoint format version.
pub const FORMAT_VERSION: u8 = 1;

/// Largest accepted checkpoint, header included.
pub const MAX_CHECKPOINT_SIZE: usize = 64 * 1024 * 1024;

const HEADER_LEN: usize = 5;

// =============================================================================
// RUN STATE
// =============================================================================

/// Everything needed to resume a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Completed steps.
    pub step: u64,
    pub graph: SerializableGraph,
}

// =============================================================================
// HEADER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl CheckpointHeader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), GumError> {
        if &self.magic != MAGIC_BYTES {
            return Err(GumError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(GumError::SerializationError(format!(
                "Unsupported checkpoint version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let [m0, m1, m2, m3] = self.magic;
        [m0, m1, m2, m3, self.version]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GumError> {
        match bytes {
            [m0, m1, m2, m3, version, ..] => Ok(Self {
                magic: [*m0, *m1, *m2, *m3],
                version: *version,
            }),
            _ => Err(GumError::SerializationError(
                "Header too short".to_string(),
            )),
        }
    }
}

impl Default for CheckpointHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode a run state (header + payload).
pub fn state_to_bytes(state: &RunState) -> Result<Vec<u8>, GumError> {
    let payload =
        postcard::to_stdvec(state).map_err(|e| GumError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&CheckpointHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a run state, validating size and header first.
pub fn state_from_bytes(bytes: &[u8]) -> Result<RunState, GumError> {
    if bytes.len() > MAX_CHECKPOINT_SIZE {
        return Err(GumError::SerializationError(format!(
            "Checkpoint size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_CHECKPOINT_SIZE
        )));
    }

    let header = CheckpointHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_LEN..).unwrap_or_default();
    postcard::from_bytes(payload).map_err(|e| {
        GumError::SerializationError(format!("Failed to decode run state: {e}"))
    })
}

/// BLAKE3 fingerprint of a graph's canonical encoding, as 64 hex chars.
///
/// Only available with the `crypto-hash` feature.
#[cfg(feature = "crypto-hash")]
pub fn graph_fingerprint(graph: &SerializableGraph) -> Result<String, GumError> {
    let data =
        postcard::to_stdvec(graph).map_err(|e| GumError::SerializationError(e.to_string()))?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
