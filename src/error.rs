use thiserror::Error;

use crate::types::LifecycleState;

/// Failures around raw key material.
#[derive(Error, Debug)]
pub enum SecretError {
    /// The OS randomness source could not deliver bytes. There is no
    /// fallback to a weaker generator.
    #[error("secure randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error("secret length must be greater than zero")]
    InvalidLength,

    /// A buffer was read or written after it had been erased.
    #[error("secret buffer used after erase")]
    UseAfterErase,

    #[error("malformed hex rendering: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Failures reported by a clipboard backend.
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("clipboard operation failed: {0}")]
    Operation(String),
}

/// Wipe verification failed even after the overwrite fallback ran.
/// Only ever logged; erasure never reports upward.
#[derive(Error, Debug)]
#[error("erase left {remaining} non-zero byte(s) in a {len}-byte buffer")]
pub struct EraseBestEffortFailure {
    pub len: usize,
    pub remaining: usize,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("key #{key}: invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        key: usize,
        from: LifecycleState,
        to: LifecycleState,
    },
}

/// Everything the controller can fail with.
#[derive(Error, Debug)]
pub enum KeygenError {
    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("display surface failed: {0}")]
    Display(#[from] std::io::Error),
}
