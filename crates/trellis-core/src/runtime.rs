use std::cell::RefCell;

use crate::error::DisposeError;
use crate::scope::Scope;

thread_local! {
    static MOUNTED_SCOPE: RefCell<Option<Scope>> = const { RefCell::new(None) };
}

/// Binds a component instance's lifetime to a scope.
///
/// Created at instance setup, the guard owns a fresh non-detached scope and
/// publishes it through [`mounted_scope`]. Run setup code with
/// `guard.scope().run(..)` so every effect it creates is torn down with the
/// instance; opt individual sub-trees out with [`Scope::detached`].
///
/// [`MountGuard::finish`] stops the scope and reports cleanup failures.
/// Dropping the guard without finishing stops the scope too, routing any
/// failures to the log, since drop cannot return them.
pub struct MountGuard {
    scope: Scope,
}

impl MountGuard {
    pub fn begin() -> Self {
        let scope = Scope::new();
        MOUNTED_SCOPE.with(|slot| {
            *slot.borrow_mut() = Some(scope.clone());
        });
        MountGuard { scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Tears the instance down.
    pub fn finish(self) -> Result<(), DisposeError> {
        MOUNTED_SCOPE.with(|slot| {
            *slot.borrow_mut() = None;
        });
        self.scope.stop()
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        MOUNTED_SCOPE.with(|slot| {
            *slot.borrow_mut() = None;
        });
        if let Err(err) = self.scope.stop() {
            log::error!("instance scope #{} teardown: {err}", self.scope.id());
        }
    }
}

/// The scope of the instance currently being mounted on this thread, if any.
pub fn mounted_scope() -> Option<Scope> {
    MOUNTED_SCOPE.with(|slot| slot.borrow().clone())
}
