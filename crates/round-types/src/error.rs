//! Error kinds shared by the store traits and the engine (spec §7).
//!
//! `StoreError` is what `AccountStore`/`BlockStore` implementations return;
//! `EngineError` is what `RoundEngine::tick`/`backward_tick` returns, wrapping
//! a store failure via `#[from]` or carrying one of the engine's own fatal
//! conditions. Nothing here is retried — §7 is explicit that there is no
//! transient class inside this engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found for filter {0:?}")]
    AccountNotFound(String),
    #[error("backing store read failed: {0}")]
    Read(String),
    #[error("backing store write failed: {0}")]
    Write(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Spec §7's error taxonomy, collapsed onto a single enum: `Store` covers
/// "StoreRead", `Invariant` covers both "InvariantViolation" and
/// "Arithmetic" (the spec treats checked-overflow as invariant-grade).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("arithmetic overflow: {0}")]
    Arithmetic(String),
}

impl EngineError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        EngineError::Invariant(msg.into())
    }

    pub fn arithmetic(msg: impl Into<String>) -> Self {
        EngineError::Arithmetic(msg.into())
    }
}
