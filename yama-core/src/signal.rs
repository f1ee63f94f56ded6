use thiserror::Error;

use yama_verifier::VerifierSignal;

/// The closed, top-level signal taxonomy: every failure surfaced by
/// install/import/load, plus the verifier's own closed catalogue folded in
/// as one variant family. `thiserror`-derived so a `match` over it is a
/// compile-time-checked exhaustiveness test — the signal taxonomy is a
/// machine-checkable contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Signal {
    #[error("parcel '{0}' has self-inconsistent metadata")]
    InstallInvalidParcel(String),
    #[error("install-name '{0}' is already in use")]
    InstallInstallNameConflict(String),
    #[error("parcel '{0}' has no dep-mapping for dep-name '{1}'")]
    InstallMissingDepMapping(String, String),
    #[error("parcel '{0}'s dep-mapping for '{1}' names a parcel that isn't installed")]
    InstallInvalidDepMapping(String, String),
    #[error("install batch would introduce a dependency cycle")]
    InstallDepGraphCycle,

    #[error("module not found: {0}")]
    ImportModuleNotFound(String),
    #[error("module failed verification: {0}")]
    ImportInvalidModule(#[source] VerifierSignal),

    #[error("type not found: {0}")]
    LoadTypeNotFound(String),
    #[error("loaded type '{0}' kind mismatch")]
    LoadKindMismatch(String),
    #[error("loaded type '{0}' callsig mismatch")]
    LoadCallsigMismatch(String),
}

pub type Result<T> = std::result::Result<T, Signal>;
