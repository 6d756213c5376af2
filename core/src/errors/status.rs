use miette::Diagnostic;
use thiserror::Error;

/// Outcome codes shared by every operation of the embedding API.
///
/// Errors are values: nothing in this crate throws into, or catches from,
/// the engine's own exception mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Diagnostic)]
pub enum Status {
    #[error("invalid argument")]
    #[diagnostic(help("the handle, scope or reference is stale or belongs to another context"))]
    InvalidArgument,

    #[error("out of memory")]
    OutOfMemory,

    #[error("handle scope mismatch")]
    #[diagnostic(help("handle scopes must be closed in the reverse order they were opened"))]
    ScopeMismatch,

    #[error("escape called twice on the same escapable handle scope")]
    EscapeCalledTwice,

    #[error("generic failure")]
    GenericFailure,

    #[error("an exception is pending")]
    #[diagnostic(help("call get_and_clear_last_exception before issuing further calls"))]
    PendingException,

    #[error("number expected")]
    NumberExpected,

    #[error("string expected")]
    StringExpected,

    #[error("boolean expected")]
    BooleanExpected,

    #[error("object expected")]
    ObjectExpected,

    #[error("function expected")]
    FunctionExpected,
}

pub type Result<T, E = Status> = std::result::Result<T, E>;
