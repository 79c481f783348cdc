use super::types::{QueryDetails, QueryHook};
use crate::context::Context;
use crate::error::DbError;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// An ordered, append-only list of hooks.
///
/// `HookRegistry` is a handle: clones share the same underlying list. A connection facade
/// owns one and every transaction it starts holds a clone, so a hook registered through
/// any handle is seen by every query that fires afterwards, on the connection and on its
/// transactions alike.
///
/// Registration and dispatch may happen concurrently from many threads. Dispatch
/// iterates over a snapshot taken when the operation's hooks fire, so a hook registered
/// concurrently may or may not be seen by that operation, while hooks registered earlier
/// always fire exactly once.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Arc<RwLock<Vec<Arc<dyn QueryHook>>>>,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook.
    pub fn register<H: QueryHook + 'static>(&self, hook: H) {
        self.register_arc(Arc::new(hook));
    }

    /// Append a closure hook.
    ///
    /// Same as [`HookRegistry::register`], but the bound lets closure parameter types be
    /// inferred.
    pub fn register_fn<F>(&self, hook: F)
    where
        F: Fn(&Context, &QueryDetails<'_>, Option<&DbError>) + Send + Sync + 'static,
    {
        self.register_arc(Arc::new(hook));
    }

    /// Append an Arc-wrapped hook. The same hook may be registered more than once.
    pub fn register_arc(&self, hook: Arc<dyn QueryHook>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two handles refer to the same list.
    pub fn same_registry(&self, other: &HookRegistry) -> bool {
        Arc::ptr_eq(&self.hooks, &other.hooks)
    }

    /// The hooks registered right now, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn QueryHook>> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Invoke every hook, in registration order.
    ///
    /// The lock is released before any hook runs, so a hook may register further hooks.
    pub fn dispatch(&self, ctx: &Context, details: &QueryDetails<'_>, outcome: Option<&DbError>) {
        for hook in self.snapshot() {
            hook.after_query(ctx, details, outcome);
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.len())
            .finish()
    }
}
