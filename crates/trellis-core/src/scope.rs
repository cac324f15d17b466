use std::cell::{Cell, RefCell};
use std::mem;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::effects::{Disposable, Effect};
use crate::error::{DisposeError, DisposeFailure, ScopeError};

thread_local! {
    static SCOPE_STACK: RefCell<Vec<Weak<ScopeInner>>> = const { RefCell::new(Vec::new()) };
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Ids are shared between scopes and effects so a scope's child list can be
/// searched by id alone.
pub(crate) fn next_disposable_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Hierarchical container owning the effects and nested scopes created while
/// it runs, plus cleanup callbacks to invoke on disposal.
pub struct Scope {
    inner: Rc<ScopeInner>,
}

pub(crate) struct ScopeInner {
    id: u64,
    active: Cell<bool>,
    detached: bool,
    parent: Option<Weak<ScopeInner>>,
    children: RefCell<SmallVec<[Owned; 4]>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
}

enum Owned {
    Effect(Effect),
    Scope(Scope),
}

impl Owned {
    fn id(&self) -> u64 {
        match self {
            Owned::Effect(e) => e.id(),
            Owned::Scope(s) => s.id(),
        }
    }

    fn stop(&self) -> Result<(), DisposeError> {
        match self {
            Owned::Effect(e) => e.stop(),
            Owned::Scope(s) => s.stop(),
        }
    }
}

/// Pops on drop, so the stack stays balanced when the bracketed closure
/// unwinds.
struct StackFrame;

impl StackFrame {
    fn push(inner: &Rc<ScopeInner>) -> Self {
        SCOPE_STACK.with(|st| st.borrow_mut().push(Rc::downgrade(inner)));
        StackFrame
    }
}

impl Drop for StackFrame {
    fn drop(&mut self) {
        SCOPE_STACK.with(|st| {
            st.borrow_mut().pop();
        });
    }
}

impl Scope {
    /// Creates a scope owned by the current scope, if one is running.
    pub fn new() -> Self {
        Self::create(false)
    }

    /// Creates a scope no ancestor will collect. It must be stopped
    /// explicitly.
    pub fn detached() -> Self {
        Self::create(true)
    }

    fn create(detached: bool) -> Self {
        let parent = if detached { None } else { current_scope() };
        let scope = Scope {
            inner: Rc::new(ScopeInner {
                id: next_disposable_id(),
                active: Cell::new(true),
                detached,
                parent: parent.as_ref().map(|p| Rc::downgrade(&p.inner)),
                children: RefCell::new(SmallVec::new()),
                cleanups: RefCell::new(Vec::new()),
            }),
        };
        if let Some(parent) = parent {
            parent
                .inner
                .children
                .borrow_mut()
                .push(Owned::Scope(scope.clone()));
        }
        scope
    }

    /// Creates a scope and immediately runs `f` inside it.
    pub fn with<R>(f: impl FnOnce(&Scope) -> R) -> (Self, R) {
        let scope = Self::new();
        let value = {
            let _frame = StackFrame::push(&scope.inner);
            f(&scope)
        };
        (scope, value)
    }

    /// Runs `f` with this scope as the capture target: every effect and
    /// non-detached scope created inside is appended to this scope's
    /// children. The handle passed to `f` is the capability for
    /// [`Scope::register_cleanup`].
    ///
    /// A still-active scope can be re-entered any number of times; each call
    /// extends the same child and cleanup lists. The previous capture target
    /// is restored when `f` returns or unwinds.
    pub fn run<R>(&self, f: impl FnOnce(&Scope) -> R) -> Result<R, ScopeError> {
        if !self.inner.active.get() {
            return Err(ScopeError::Stopped { id: self.inner.id });
        }
        let _frame = StackFrame::push(&self.inner);
        Ok(f(self))
    }

    /// Registers a callback to run once when this scope is stopped, after
    /// all of its children have been stopped.
    pub fn register_cleanup(&self, cb: impl FnOnce() + 'static) -> Result<(), ScopeError> {
        if !self.inner.active.get() {
            return Err(ScopeError::Stopped { id: self.inner.id });
        }
        self.inner.cleanups.borrow_mut().push(Box::new(cb));
        Ok(())
    }

    /// Stops every owned effect and nested scope depth-first in creation
    /// order, then runs the cleanups in registration order, then unlinks
    /// this scope from a still-active parent. Idempotent.
    ///
    /// A panicking callback does not abort the walk; every failure is
    /// collected into the returned [`DisposeError`].
    pub fn stop(&self) -> Result<(), DisposeError> {
        self.inner.stop()
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn is_detached(&self) -> bool {
        self.inner.detached
    }

    /// Process-unique id, for diagnostics and equality only.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub fn cleanup_count(&self) -> usize {
        self.inner.cleanups.borrow().len()
    }
}

impl ScopeInner {
    fn stop(&self) -> Result<(), DisposeError> {
        // Flipped before any callback runs, so re-entrant stops no-op and
        // the scope rejects new children and cleanups from here on.
        if !self.active.replace(false) {
            return Ok(());
        }
        let mut failures = Vec::new();

        let children = mem::take(&mut *self.children.borrow_mut());
        for child in children {
            if let Err(err) = child.stop() {
                failures.extend(err.failures);
            }
        }

        let cleanups = mem::take(&mut *self.cleanups.borrow_mut());
        for cleanup in cleanups {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(cleanup)) {
                failures.push(DisposeFailure::new(self.id, payload));
            }
        }

        // Unlink so the parent's book-keeping stays accurate when a child is
        // stopped independently. Skipped while the parent is mid-disposal:
        // it has already drained its child list.
        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade)
            && parent.active.get()
        {
            parent.children.borrow_mut().retain(|c| c.id() != self.id);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DisposeError { failures })
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if self.active.get()
            && let Err(err) = self.stop()
        {
            log::warn!("scope #{} dropped with failing cleanups: {err}", self.id);
        }
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Scope {}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .field("detached", &self.is_detached())
            .field("children", &self.child_count())
            .field("cleanups", &self.cleanup_count())
            .finish()
    }
}

impl Disposable for Scope {
    fn stop(&self) -> Result<(), DisposeError> {
        Scope::stop(self)
    }

    fn is_active(&self) -> bool {
        Scope::is_active(self)
    }
}

/// The innermost scope currently running on this thread, if any.
pub fn current_scope() -> Option<Scope> {
    SCOPE_STACK.with(|st| {
        st.borrow()
            .last()
            .and_then(|weak| weak.upgrade().map(|inner| Scope { inner }))
    })
}

/// Registration hook: hands `effect` to the current scope.
///
/// Every effect constructor calls this once, synchronously, before returning
/// the effect to its caller; that is the only coupling a reactive engine
/// needs with scopes. Without a current scope the effect stays uncaptured
/// and its caller manages its lifetime.
pub fn register_effect(effect: &Effect) {
    if let Some(scope) = current_scope() {
        scope
            .inner
            .children
            .borrow_mut()
            .push(Owned::Effect(effect.clone()));
    }
}

#[cfg(feature = "inspector")]
#[derive(Clone, Debug)]
pub struct ScopeSnapshot {
    pub id: u64,
    pub active: bool,
    pub detached: bool,
    pub cleanup_count: usize,
    pub entries: Vec<SnapshotEntry>,
}

#[cfg(feature = "inspector")]
#[derive(Clone, Debug)]
pub enum SnapshotEntry {
    Effect { id: u64, active: bool },
    Scope(ScopeSnapshot),
}

#[cfg(feature = "inspector")]
impl Scope {
    /// Plain-data view of this scope's tree, for inspection tooling.
    pub fn snapshot(&self) -> ScopeSnapshot {
        let entries = self
            .inner
            .children
            .borrow()
            .iter()
            .map(|child| match child {
                Owned::Effect(e) => SnapshotEntry::Effect {
                    id: e.id(),
                    active: e.is_active(),
                },
                Owned::Scope(s) => SnapshotEntry::Scope(s.snapshot()),
            })
            .collect();
        ScopeSnapshot {
            id: self.id(),
            active: self.is_active(),
            detached: self.is_detached(),
            cleanup_count: self.cleanup_count(),
            entries,
        }
    }
}
