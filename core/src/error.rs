//! Error types for TICKSCAN

use thiserror::Error;

use crate::types::{SnapshotRef, StateVersion};

/// Main error type for TICKSCAN
#[derive(Error, Debug)]
pub enum TickscanError {
    // ============ Request Errors ============
    #[error("Invalid tick spacing: {0}")]
    InvalidSpacing(i32),

    #[error("Too many steps requested: limit {limit}, requested {requested}")]
    TooManySteps { requested: u16, limit: u16 },

    #[error("Tick {tick} outside domain [{min}, {max}]")]
    TickOutOfDomain { tick: i32, min: i32, max: i32 },

    #[error("Invalid key domain: min {min} must be below max {max}")]
    InvalidDomain { min: i32, max: i32 },

    // ============ State Errors ============
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(SnapshotRef),

    #[error("Tick spacing mismatch: snapshot uses {expected}, request used {got}")]
    SpacingMismatch { expected: i32, got: i32 },

    #[error("Tick {tick} is not a multiple of spacing {spacing}")]
    TickNotAligned { tick: i32, spacing: i32 },

    #[error("State version mismatch: expected {expected}, got {got}")]
    StateVersionMismatch {
        expected: StateVersion,
        got: StateVersion,
    },

    #[error("State corruption detected: {0}")]
    StateCorruption(String),

    #[error("State provider error: {0}")]
    ProviderError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    // ============ Encoding Errors ============
    #[error("Serialization failed: {0}")]
    SerializationError(String),

    #[error("Deserialization failed: {0}")]
    DeserializationError(String),

    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ============ General Errors ============
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for TickscanError {
    fn from(err: std::io::Error) -> Self {
        TickscanError::StorageError(err.to_string())
    }
}

impl From<bincode::Error> for TickscanError {
    fn from(err: bincode::Error) -> Self {
        TickscanError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for TickscanError {
    fn from(err: serde_json::Error) -> Self {
        TickscanError::SerializationError(err.to_string())
    }
}
