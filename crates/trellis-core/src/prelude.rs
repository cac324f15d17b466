pub use crate::effects::{Disposable, Effect, effect, on_cleanup};
pub use crate::error::{DisposeError, DisposeFailure, ScopeError};
pub use crate::runtime::{MountGuard, mounted_scope};
pub use crate::scope::{Scope, current_scope, register_effect};
pub use crate::signal::{Signal, SubId, signal, watch};
