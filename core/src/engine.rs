use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

use crate::context::{Context, ContextId};
use crate::errors::Status;
use crate::runtime::Runtime;

/// Tunables for the shared runtime. Applied when the runtime is created,
/// i.e. when the first context of an `Engine` is opened.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allocations between two automatic cycle collections.
    pub gc_threshold: usize,
    /// Maximum number of live objects; allocation past it fails with
    /// `OutOfMemory`.
    pub heap_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gc_threshold: 1024,
            heap_limit: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(source: &str) -> Result<Self, Status> {
        serde_json::from_str(source).map_err(|err| {
            tracing::warn!(%err, "rejecting engine configuration");
            Status::InvalidArgument
        })
    }
}

#[derive(Default)]
struct EngineShared {
    runtime: RefCell<Option<Rc<Runtime>>>,
    contexts: Cell<usize>,
}

/// Context ids are unique across engines so that tokens issued by one
/// context are never accepted by another.
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Owner of the shared runtime.
///
/// The runtime is created lazily with the first context and dropped as soon
/// as the last context is released. Clones of an `Engine` share the same
/// runtime.
#[derive(Clone, Default)]
pub struct Engine {
    config: EngineConfig,
    shared: Rc<EngineShared>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_gc_threshold(mut self, threshold: usize) -> Self {
        self.config.gc_threshold = threshold;
        self
    }

    pub fn with_heap_limit(mut self, limit: usize) -> Self {
        self.config.heap_limit = Some(limit);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn new_context(&self) -> Result<Context, Status> {
        let runtime = {
            let mut slot = self.shared.runtime.borrow_mut();
            match slot.as_ref() {
                Some(runtime) => Rc::clone(runtime),
                None => {
                    let runtime = Rc::new(Runtime::new(&self.config));
                    *slot = Some(Rc::clone(&runtime));
                    runtime
                }
            }
        };
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        self.shared.contexts.set(self.shared.contexts.get() + 1);
        let lease = ContextLease {
            shared: Rc::clone(&self.shared),
        };
        Context::new(id, runtime, lease)
    }

    pub fn live_contexts(&self) -> usize {
        self.shared.contexts.get()
    }

    pub fn has_runtime(&self) -> bool {
        self.shared.runtime.borrow().is_some()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("contexts", &self.shared.contexts.get())
            .field("runtime", &self.has_runtime())
            .finish()
    }
}

/// Held by every context; releasing the last lease tears the runtime down.
pub(crate) struct ContextLease {
    shared: Rc<EngineShared>,
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        let remaining = self.shared.contexts.get().saturating_sub(1);
        self.shared.contexts.set(remaining);
        if remaining == 0 {
            let runtime = self.shared.runtime.borrow_mut().take();
            tracing::debug!(released = runtime.is_some(), "last context released");
            drop(runtime);
        }
    }
}
