use thiserror::Error;

use yama_model::ConstIndex;

/// The closed verifier signal catalogue (the `verif_*` family).
///
/// Exhaustive and `thiserror`-derived so that a `match` over it is a
/// compile-time check that every signal is handled — the "machine-checkable
/// contract" property tested in `yama-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifierSignal {
    #[error("bytecode body is empty")]
    BinaryIsEmpty,
    #[error("register RA={0} is out of bounds")]
    RAOutOfBounds(u16),
    #[error("register RB={0} is out of bounds")]
    RBOutOfBounds(u16),
    #[error("constant index KoB={0:?} is out of bounds")]
    KoBOutOfBounds(ConstIndex),
    #[error("constant KoB={0:?} is not an object constant")]
    KoBNotObjectConst(ConstIndex),
    #[error("constant index KtB={0:?} is out of bounds")]
    KtBOutOfBounds(ConstIndex),
    #[error("constant KtB={0:?} is not a type constant")]
    KtBNotTypeConst(ConstIndex),
    #[error("register RA has the wrong type")]
    RAWrongType,
    #[error("RA and RB types differ")]
    RAAndRBTypesDiffer,
    #[error("RA and KoB types differ")]
    RAAndKoBTypesDiffer,
    #[error("RA and KtB types differ")]
    RAAndKtBTypesDiffer,
    #[error("RA and ArgB types differ")]
    RAAndArgBTypesDiffer,
    #[error("RB and KtC types differ")]
    RBAndKtCTypesDiffer,
    #[error("argument index ArgB={0} is out of bounds")]
    ArgBOutOfBounds(u16),
    #[error("ArgsA={0} registers are out of bounds")]
    ArgRsOutOfBounds(u16),
    #[error("ArgsA must name at least the call object")]
    ArgRsZeroObjects,
    #[error("call object register does not denote a callable type")]
    ArgRsIllegalCallobj,
    #[error("argument count does not match the callee's parameter count")]
    ParamArgRsWrongNumber,
    #[error("argument types do not match the callee's parameter types")]
    ParamArgRsWrongTypes,
    #[error("pushing a new register would overflow max_locals")]
    PushingOverflows,
    #[error("branch target PC is out of bounds")]
    PutsPCOutOfBounds,
    #[error("fallthrough PC is out of bounds")]
    FallthroughPutsPCOutOfBounds,
    #[error("block-entry register environments do not agree")]
    ViolatesRegisterCoherence,
    #[error("top-of-stack register does not exist")]
    RTopDoesNotExist,
    #[error("top-of-stack register has the wrong type")]
    RTopWrongType,
}
