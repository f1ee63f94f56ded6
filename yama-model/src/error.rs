use thiserror::Error;

use crate::ids::ConstIndex;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while building or querying a [`crate::module::Module`].
///
/// These are internal to `yama-model`; `yama-core` maps the ones that can
/// surface to callers onto its own closed `Signal` enum.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("name already used in module: {0}")]
    NameAlreadyUsed(String),
    #[error("no such item in module: {0}")]
    NoSuchItem(String),
    #[error("item {0} has no such descriptor")]
    MissingDescriptor(String),
    #[error("item {0} already has bound bytecode")]
    BcodeAlreadyBound(String),
    #[error("bind_bcode target {0} has no call_desc")]
    NotCallable(String),
    #[error("constant table index out of bounds: {0:?}")]
    ConstIndexOutOfBounds(ConstIndex),
    #[error("constant at index {0:?} is not an object constant")]
    NotAnObjectConst(ConstIndex),
    #[error("constant at index {0:?} is not a type constant")]
    NotATypeConst(ConstIndex),
    #[error("malformed fully-qualified name: {0}")]
    MalformedFullyQualifiedName(String),
}
