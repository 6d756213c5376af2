//! A handle-based embedding API over a reference-counted engine heap.
//!
//! Host code opens rooting scopes on a [`Context`], receives [`Handle`]s for
//! every value it creates or reads, and keeps values beyond a scope through
//! [`Reference`]s, which can be held strongly or weakly.

pub mod context;
pub mod embedding;
pub mod engine;
pub mod errors;
pub mod runtime;

pub use context::{Context, ContextId};
pub use embedding::{
    CallbackInfo, ClassBuilder, EscapableHandleScope, FinalizeCallback, Handle, HandleScope,
    HostData, NativeClassDef, NativeFunction, NativeFunctionBoxed, Reference, ValueType,
};
pub use engine::{Engine, EngineConfig};
pub use errors::{Result, Status};
pub use runtime::gc::{CollectStats, HeapStats};
pub use runtime::value::JsValue as Value;
