//! The bytecode static verifier: per-basic-block symbolic execution over
//! register types, rejecting any module whose bytecode could misbehave at
//! runtime before it is ever loaded or run.
//!
//! This crate depends on `yama-model` only. It has no notion of parcels,
//! installs, or cross-module linking — type identity here is purely
//! structural (fully-qualified name equality), since the verifier runs
//! before the loader ever produces a linked handle.

pub mod block;
pub mod env;
pub mod signal;
pub mod types;
pub mod verify;

pub use env::Env;
pub use signal::VerifierSignal;
pub use types::{builtin, VType};
pub use verify::{verify_item, verify_module};
