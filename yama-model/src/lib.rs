//! The module/type-info data model for the Yama runtime.
//!
//! `yama-model` defines items (primitives, functions, methods, structs),
//! their orthogonal descriptors, constant tables, call signatures, and
//! bytecode buffers — the data the importer produces, the loader links,
//! and the verifier checks. It has no knowledge of parcels, installs,
//! domains, or concurrency; those live in `yama-core`.

pub mod bytecode;
pub mod consts;
pub mod descriptors;
pub mod error;
pub mod ids;
pub mod module;
pub mod names;

pub use bytecode::{Bytecode, Op, RegOperand, SourceLocation};
pub use consts::{CallSig, Const, ConstTable, ObjectConst, TypeConst, TypeConstKind};
pub use descriptors::{
    BcodeDesc, CallDesc, CallFn, ItemDesc, ItemKind, MemberDesc, OwnerDesc, PrimDesc,
    PrimitiveKind,
};
pub use error::{ModelError, Result};
pub use ids::{ConstIndex, ItemId};
pub use module::{Descriptor, DescriptorSet, Module};
pub use names::{parse_fq_name, FullyQualifiedName, ImportPath, UnqualifiedName, SELF_DEP_NAME};
