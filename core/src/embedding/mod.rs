pub mod callback;
pub mod class_builder;
mod dispatch;
pub mod external;
pub mod handle;
mod properties;
pub mod reference;
pub(crate) mod registry;
pub mod scope;
pub mod values;

pub use callback::{CallbackInfo, NativeFunction, NativeFunctionBoxed};
pub use class_builder::{ClassBuilder, NativeClassDef};
pub use external::{FinalizeCallback, HostData};
pub use handle::Handle;
pub use reference::Reference;
pub use scope::{EscapableHandleScope, HandleScope};
pub use values::ValueType;
