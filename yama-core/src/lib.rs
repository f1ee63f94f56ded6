//! Parcel/install registry, importer, loader, and the `Domain` facade tying
//! the Yama runtime's core together.
//!
//! `yama-core` depends on `yama-model` (the data it produces and links) and
//! `yama-verifier` (invoked on every freshly produced module before it is
//! memoised). The concrete parser/compiler, interpreter, CLI, and MAS are
//! external collaborators reached only through the traits in
//! [`parcel`]/[`compiler`]/[`sink`].

pub mod builtin;
pub mod compiler;
pub mod domain;
pub mod importer;
pub mod install;
pub mod item_ref;
pub mod loader;
pub mod parcel;
pub mod signal;
pub mod sink;

pub use builtin::{BuiltinParcel, BUILTIN_INSTALL_NAME};
pub use compiler::{CompileServices, Compiler};
pub use domain::{load_str, Domain};
pub use install::{Environment, InstallBatch, InstallRegistry};
pub use item_ref::ItemRef;
pub use parcel::{ImportOutcome, Parcel, ParcelMetadata};
pub use signal::{Result, Signal};
pub use sink::{Category, DebugSink, NullSink, TracingSink};

// Re-exported so downstream crates never need a direct `yama-model`
// dependency just to name a fully-qualified path when calling into
// `Domain`.
pub use yama_model::{parse_fq_name, FullyQualifiedName, ImportPath, UnqualifiedName};
