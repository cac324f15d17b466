//! # Scopes, effects, and cleanup
//!
//! Trellis manages the lifetime of effects produced inside a reactive
//! runtime. Three main pieces:
//!
//! - `Scope` — hierarchical container that captures everything created
//!   while it runs and stops it all as a unit.
//! - `Effect` — a unit of reactive work, reduced to an at-most-once
//!   teardown.
//! - `register_cleanup` / `on_cleanup` — callbacks run on disposal.
//!
//! ## Capturing effects
//!
//! ```rust
//! use trellis_core::*;
//!
//! let clicks = signal(0);
//! let (scope, _) = Scope::with(|_| {
//!     watch(&clicks, |n| log::debug!("clicks = {n}"));
//! });
//! assert_eq!(scope.child_count(), 1);
//!
//! scope.stop().unwrap();
//! assert_eq!(clicks.subscriber_count(), 0);
//! ```
//!
//! Everything constructed while a scope runs — watchers, plain effects,
//! nested scopes — lands in that scope's child list, in creation order.
//! Stopping the scope stops the whole tree exactly once; nested scopes are
//! drained depth-first before their siblings.
//!
//! ## Re-entry
//!
//! A scope stays open until stopped, so `run` can extend it later:
//!
//! ```rust
//! use trellis_core::*;
//!
//! let scope = Scope::new();
//! scope.run(|_| { Effect::new(|| ()); }).unwrap();
//! scope.run(|_| { Effect::new(|| ()); }).unwrap();
//! assert_eq!(scope.child_count(), 2);
//! scope.stop().unwrap();
//! ```
//!
//! ## Cleanup callbacks
//!
//! ```rust
//! use trellis_core::*;
//!
//! let (scope, _) = Scope::with(|scope| {
//!     scope.register_cleanup(|| log::info!("torn down")).unwrap();
//! });
//! scope.stop().unwrap();
//! ```
//!
//! Cleanups run after all children are stopped, in registration order. A
//! panicking cleanup does not abort disposal: the rest of the tree is still
//! walked and every failure comes back in one [`DisposeError`].
//!
//! ## Detached scopes
//!
//! [`Scope::detached`] opts out of capture: no ancestor collects it, so it
//! survives the scope that created it and must be stopped by hand. Useful
//! for work started inside a component but owned elsewhere.
//!
//! ## Instance lifetimes
//!
//! A component layer brackets each instance with a [`MountGuard`]; setup
//! runs under the guard's scope, so everything the instance creates dies
//! with it.
//!
//! Capture is synchronous by design: effects created after `run` has
//! returned (e.g. from deferred work) are not captured and must be managed
//! by their creator.

pub mod effects;
pub mod error;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod tests;

pub use effects::*;
pub use error::*;
pub use runtime::*;
pub use scope::*;
pub use signal::*;
