use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::error::{DisposeError, DisposeFailure, ScopeError};
use crate::scope::{current_scope, next_disposable_id, register_effect};

/// Something that can be told to stop exactly once and becomes permanently
/// inert. Implemented by [`Effect`] and [`crate::Scope`].
pub trait Disposable {
    /// Idempotent. Failures from panicking teardown callbacks are collected
    /// rather than unwinding through the caller.
    fn stop(&self) -> Result<(), DisposeError>;

    /// False once `stop` has completed.
    fn is_active(&self) -> bool;
}

/// A unit of reactive work, reduced to the one thing scopes need from it: a
/// teardown that runs at most once.
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

struct EffectInner {
    id: u64,
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Effect {
    /// Wraps `teardown` and hands the new effect to the current scope via
    /// the registration hook, so effects created under a running scope are
    /// owned by it.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        let effect = Self {
            inner: Rc::new(EffectInner {
                id: next_disposable_id(),
                teardown: RefCell::new(Some(Box::new(teardown))),
            }),
        };
        register_effect(&effect);
        effect
    }

    /// Process-unique id, for diagnostics and equality only.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn stop(&self) -> Result<(), DisposeError> {
        let Some(teardown) = self.inner.teardown.borrow_mut().take() else {
            return Ok(());
        };
        match catch_unwind(AssertUnwindSafe(|| teardown())) {
            Ok(()) => Ok(()),
            Err(payload) => Err(DisposeError {
                failures: vec![DisposeFailure::new(self.inner.id, payload)],
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.teardown.borrow().is_some()
    }
}

impl Disposable for Effect {
    fn stop(&self) -> Result<(), DisposeError> {
        Effect::stop(self)
    }

    fn is_active(&self) -> bool {
        Effect::is_active(self)
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Runs `setup` immediately and keeps the teardown it returns as a
/// scope-owned [`Effect`].
pub fn effect<F, D>(setup: F) -> Effect
where
    F: FnOnce() -> D,
    D: FnOnce() + 'static,
{
    let teardown = setup();
    Effect::new(teardown)
}

/// Registers `cb` against the scope currently running on this thread.
///
/// Errors when no scope is running; silently dropping the callback would
/// mask a leak.
pub fn on_cleanup(cb: impl FnOnce() + 'static) -> Result<(), ScopeError> {
    match current_scope() {
        Some(scope) => scope.register_cleanup(cb),
        None => Err(ScopeError::NoActiveScope),
    }
}
