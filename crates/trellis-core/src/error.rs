use std::any::Any;

use thiserror::Error;

/// Misuse of a scope handle. These are programmer errors and are surfaced
/// instead of being silently swallowed, which would mask leaks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// The scope has been stopped; it can no longer run code or accept
    /// cleanups.
    #[error("scope #{id} is stopped")]
    Stopped { id: u64 },
    /// No scope is running on the current thread.
    #[error("no scope is active on this thread")]
    NoActiveScope,
}

/// One or more callbacks panicked while a scope or effect was being stopped.
///
/// Disposal never aborts early: the whole tree is walked and every failure is
/// collected here, so a single bad cleanup cannot leak the rest of the tree.
#[derive(Debug, Error)]
#[error("disposal completed with {} failed callback(s)", failures.len())]
pub struct DisposeError {
    pub failures: Vec<DisposeFailure>,
}

/// A single callback failure captured during disposal.
#[derive(Debug)]
pub struct DisposeFailure {
    /// Id of the scope or effect whose callback panicked.
    pub owner: u64,
    /// Rendered panic payload.
    pub message: String,
}

impl DisposeFailure {
    pub(crate) fn new(owner: u64, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Self { owner, message }
    }
}
