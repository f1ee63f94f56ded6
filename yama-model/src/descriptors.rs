use crate::bytecode::Bytecode;
use crate::consts::{CallSig, ConstTable};
use crate::ids::ItemId;

/// The four item kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Primitive,
    Function,
    Method,
    Struct,
}

impl ItemKind {
    pub fn name(self) -> &'static str {
        match self {
            ItemKind::Primitive => "primitive",
            ItemKind::Function => "function",
            ItemKind::Method => "method",
            ItemKind::Struct => "struct",
        }
    }

    pub fn is_callable(self) -> bool {
        matches!(self, ItemKind::Function | ItemKind::Method)
    }
}

/// The six primitive-kind tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    None,
    Int,
    UInt,
    Float,
    Bool,
    Char,
    Type,
}

/// Opaque token identifying the callable implementation behind a
/// `call_desc`. The only token the verifier/loader ever interpret is
/// [`CallFn::Bcode`] (which unlocks a `bcode_desc`); any other token is a
/// native/external implementation the core treats as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallFn {
    Bcode,
    Native(u64),
}

/// Always-present per-item facet: identity, kind, and constant table.
#[derive(Debug, Clone)]
pub struct ItemDesc {
    pub name: String,
    pub kind: ItemKind,
    pub consts: ConstTable,
}

/// Present on owners of methods (structs/primitives that declare members).
#[derive(Debug, Clone, Default)]
pub struct OwnerDesc {
    pub members: Vec<ItemId>,
}

/// Present on methods: the owner item id.
#[derive(Debug, Clone, Copy)]
pub struct MemberDesc {
    pub owner: ItemId,
}

/// Present on primitives.
#[derive(Debug, Clone, Copy)]
pub struct PrimDesc {
    pub ptype: PrimitiveKind,
}

/// Present on functions/methods.
#[derive(Debug, Clone)]
pub struct CallDesc {
    pub callsig: CallSig,
    pub max_locals: u16,
    pub call_fn: CallFn,
}

/// Present on callables whose `call_fn` is [`CallFn::Bcode`], once bound.
#[derive(Debug, Clone)]
pub struct BcodeDesc {
    pub bcode: Bytecode,
}
