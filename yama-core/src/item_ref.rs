use std::sync::{Arc, OnceLock};

use yama_model::{CallSig, ConstTable, ItemKind, PrimitiveKind};

/// An immutable, shared handle to a fully-linked type (`item_ref`). Two
/// [`ItemRef`]s are equal iff they share the same [`Arc`] allocation, i.e.
/// they refer to the same loaded type instance — structurally identical
/// but independently-imported types are distinct, so `ItemRef`
/// intentionally does not derive `PartialEq` from its fields.
#[derive(Clone)]
pub struct ItemRef(pub(crate) Arc<ItemRefInner>);

impl ItemRef {
    pub fn fq_name(&self) -> &str {
        &self.0.fq_name
    }

    pub fn kind(&self) -> ItemKind {
        self.0.kind
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        self.0.primitive_kind
    }

    pub fn callsig(&self) -> Option<&CallSig> {
        self.0.callsig.as_ref()
    }

    pub fn consts(&self) -> &ConstTable {
        &self.0.consts
    }
}

impl PartialEq for ItemRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for ItemRef {}

impl std::fmt::Debug for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemRef").field("fq_name", &self.0.fq_name).finish()
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.fq_name)
    }
}

/// One slot of a loaded type's constant table: either a plain object
/// constant, or a resolved reference to another loaded type (the published
/// counterpart of `yama_model::Const::Type`, its stub constant becoming
/// linked).
#[derive(Debug, Clone)]
pub enum LinkedConst {
    Object(yama_model::ObjectConst),
    /// The target may still be an in-progress stub when read *during*
    /// linking (self-loops/cycles); callers that only ever observe
    /// published handles always see it resolved.
    Type(ItemRef),
}

/// The heap allocation behind an [`ItemRef`].
///
/// Constructed in two phases: `stub` creates an empty, unlinked shell so
/// cyclic references have something to point at; `publish` fills in the
/// resolved fields exactly once. Readers that only ever see an
/// `Arc<ItemRefInner>` obtained from the domain's published memo table
/// always observe a filled `OnceLock`; readers participating in an
/// in-progress link (the loader's own DFS) may observe an empty one and
/// must tolerate it — it denotes "currently being resolved, values not yet
/// known"; the loader never reads a stub's fields, only passes the handle
/// around.
pub(crate) struct ItemRefInner {
    pub fq_name: String,
    pub kind: ItemKind,
    pub primitive_kind: Option<PrimitiveKind>,
    pub callsig: Option<CallSig>,
    pub consts: ConstTable,
    /// Set exactly once, after every transitively-referenced type-constant
    /// in `consts` has itself been resolved.
    pub(crate) linked_consts: OnceLock<Vec<LinkedConst>>,
}

impl ItemRefInner {
    pub fn linked_const(&self, index: yama_model::ConstIndex) -> Option<&LinkedConst> {
        self.linked_consts.get().and_then(|v| v.get(index.index()))
    }
}
