use std::collections::{BTreeMap, HashMap};

use crate::bytecode::{Bytecode, SourceLocation};
use crate::consts::{CallSig, ConstTable};
use crate::descriptors::{
    BcodeDesc, CallDesc, CallFn, ItemDesc, ItemKind, MemberDesc, OwnerDesc, PrimDesc, PrimitiveKind,
};
use crate::error::{ModelError, Result};
use crate::ids::ItemId;

/// A marker trait implemented by each descriptor type, giving generic code
/// access to the sparse map that backs it inside a [`Module`].
///
/// This is the facet-table design called for by spec §4.1/§9: a new
/// descriptor is added by implementing this trait for a new type and adding
/// one field to [`Module`] — no existing code path is touched.
pub trait Descriptor: Sized + 'static {
    fn map(module: &Module) -> &HashMap<ItemId, Self>;
}

impl Descriptor for ItemDesc {
    fn map(module: &Module) -> &HashMap<ItemId, Self> {
        &module.item_descs
    }
}

impl Descriptor for OwnerDesc {
    fn map(module: &Module) -> &HashMap<ItemId, Self> {
        &module.owner_descs
    }
}

impl Descriptor for MemberDesc {
    fn map(module: &Module) -> &HashMap<ItemId, Self> {
        &module.member_descs
    }
}

impl Descriptor for PrimDesc {
    fn map(module: &Module) -> &HashMap<ItemId, Self> {
        &module.prim_descs
    }
}

impl Descriptor for CallDesc {
    fn map(module: &Module) -> &HashMap<ItemId, Self> {
        &module.call_descs
    }
}

impl Descriptor for BcodeDesc {
    fn map(module: &Module) -> &HashMap<ItemId, Self> {
        &module.bcode_descs
    }
}

/// A set of descriptor types queryable together. Implemented for single
/// descriptors and for tuples up to arity 4, backing the module's
/// `all_of<Descs>`/`any_of<Descs>`/`none_of<Descs>`/`get<Descs>` surface,
/// where `Descs` is conceptually a list of descriptor types.
pub trait DescriptorSet<'a> {
    type Output;

    fn all_present(module: &'a Module, id: ItemId) -> bool;
    fn any_present(module: &'a Module, id: ItemId) -> bool;
    fn try_fetch(module: &'a Module, id: ItemId) -> Option<Self::Output>;
}

macro_rules! impl_descriptor_set {
    ($($name:ident),+) => {
        impl<'a, $($name: Descriptor),+> DescriptorSet<'a> for ($($name,)+) {
            type Output = ($(&'a $name,)+);

            fn all_present(module: &'a Module, id: ItemId) -> bool {
                $($name::map(module).contains_key(&id))&&+
            }

            fn any_present(module: &'a Module, id: ItemId) -> bool {
                $($name::map(module).contains_key(&id))||+
            }

            fn try_fetch(module: &'a Module, id: ItemId) -> Option<Self::Output> {
                Some(($($name::map(module).get(&id)?,)+))
            }
        }
    };
}

impl<'a, D: Descriptor> DescriptorSet<'a> for D {
    type Output = &'a D;

    fn all_present(module: &'a Module, id: ItemId) -> bool {
        D::map(module).contains_key(&id)
    }

    fn any_present(module: &'a Module, id: ItemId) -> bool {
        D::map(module).contains_key(&id)
    }

    fn try_fetch(module: &'a Module, id: ItemId) -> Option<Self::Output> {
        D::map(module).get(&id)
    }
}

impl_descriptor_set!(A, B);
impl_descriptor_set!(A, B, C);
impl_descriptor_set!(A, B, C, D);

/// A module: a bag of items produced by importing a parcel's path.
///
/// Internally a struct-of-sparse-maps keyed by [`ItemId`] — item identity
/// (`ItemId`), item existence (`item_descs`), and every other descriptor are
/// kept in separate maps so that adding a descriptor never requires
/// touching unrelated code.
#[derive(Debug, Clone, Default)]
pub struct Module {
    next_id: u32,
    names: HashMap<String, ItemId>,
    ids: HashMap<ItemId, String>,
    item_descs: HashMap<ItemId, ItemDesc>,
    owner_descs: HashMap<ItemId, OwnerDesc>,
    member_descs: HashMap<ItemId, MemberDesc>,
    prim_descs: HashMap<ItemId, PrimDesc>,
    call_descs: HashMap<ItemId, CallDesc>,
    bcode_descs: HashMap<ItemId, BcodeDesc>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates or reuses the id for a name about to receive an `item_desc`.
    ///
    /// A name may already be registered with no `item_desc` yet if it was
    /// previously only referenced as a method's owner (adding a method with
    /// owner `A` before `A` itself is allowed); in that case the reserved id
    /// is reused. A name that already has an `item_desc` is a true
    /// collision.
    fn begin_item(&mut self, name: &str) -> Result<ItemId> {
        if let Some(&id) = self.names.get(name) {
            if self.item_descs.contains_key(&id) {
                return Err(ModelError::NameAlreadyUsed(name.to_string()));
            }
            return Ok(id);
        }
        let id = ItemId::new(self.next_id);
        self.next_id += 1;
        self.names.insert(name.to_string(), id);
        self.ids.insert(id, name.to_string());
        Ok(id)
    }

    /// Allocates or reuses the id for a method's owner, regardless of
    /// whether the owner has an `item_desc` yet.
    fn owner_placeholder(&mut self, name: &str) -> ItemId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = ItemId::new(self.next_id);
        self.next_id += 1;
        self.names.insert(name.to_string(), id);
        self.ids.insert(id, name.to_string());
        id
    }

    pub fn add_primitive(
        &mut self,
        name: impl Into<String>,
        consts: ConstTable,
        ptype: PrimitiveKind,
    ) -> Result<ItemId> {
        let name = name.into();
        let id = self.begin_item(&name)?;
        self.item_descs.insert(
            id,
            ItemDesc {
                name: name.clone(),
                kind: ItemKind::Primitive,
                consts,
            },
        );
        self.prim_descs.insert(id, PrimDesc { ptype });
        Ok(id)
    }

    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        consts: ConstTable,
        callsig: CallSig,
        max_locals: u16,
        call_fn: CallFn,
    ) -> Result<ItemId> {
        let name = name.into();
        let id = self.begin_item(&name)?;
        self.item_descs.insert(
            id,
            ItemDesc {
                name: name.clone(),
                kind: ItemKind::Function,
                consts,
            },
        );
        self.call_descs.insert(
            id,
            CallDesc {
                callsig,
                max_locals,
                call_fn,
            },
        );
        Ok(id)
    }

    /// Adds a method. `owner` need not already exist in the module — the
    /// owner↔member cross-link is established lazily here and finalised
    /// (owner's `OwnerDesc::members` populated) as each method is added, so
    /// a method may be declared before its owner.
    pub fn add_method(
        &mut self,
        owner: impl Into<String>,
        member: impl Into<String>,
        consts: ConstTable,
        callsig: CallSig,
        max_locals: u16,
        call_fn: CallFn,
    ) -> Result<ItemId> {
        let owner = owner.into();
        let member = member.into();
        let full_name = format!("{owner}::{member}");
        let id = self.begin_item(&full_name)?;
        self.item_descs.insert(
            id,
            ItemDesc {
                name: full_name.clone(),
                kind: ItemKind::Method,
                consts,
            },
        );
        self.call_descs.insert(
            id,
            CallDesc {
                callsig,
                max_locals,
                call_fn,
            },
        );

        let owner_id = self.owner_placeholder(&owner);
        self.member_descs.insert(id, MemberDesc { owner: owner_id });
        self.owner_descs.entry(owner_id).or_default().members.push(id);

        Ok(id)
    }

    pub fn add_struct(&mut self, name: impl Into<String>, consts: ConstTable) -> Result<ItemId> {
        let name = name.into();
        let id = self.begin_item(&name)?;
        self.item_descs.insert(
            id,
            ItemDesc {
                name: name.clone(),
                kind: ItemKind::Struct,
                consts,
            },
        );
        Ok(id)
    }

    /// Attaches a `bcode_desc` to an existing callable. `syms`, if given,
    /// overlays a debug symbol table (instruction index → source location)
    /// onto `bcode`'s own, taking precedence entry-by-entry — the split
    /// lets a caller attach compiler-produced debug info separately from
    /// the bytecode a pre-built `Bytecode` value may already carry.
    pub fn bind_bcode(
        &mut self,
        name: &str,
        mut bcode: Bytecode,
        syms: Option<BTreeMap<usize, SourceLocation>>,
    ) -> Result<()> {
        let id = self
            .names
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::NoSuchItem(name.to_string()))?;
        if !self.call_descs.contains_key(&id) {
            return Err(ModelError::NotCallable(name.to_string()));
        }
        if self.bcode_descs.contains_key(&id) {
            return Err(ModelError::BcodeAlreadyBound(name.to_string()));
        }
        if let Some(syms) = syms {
            bcode.merge_symbols(syms);
        }
        self.bcode_descs.insert(id, BcodeDesc { bcode });
        Ok(())
    }

    pub fn exists(&self, id: ItemId) -> bool {
        self.item_descs.contains_key(&id)
    }

    pub fn id_of(&self, name: &str) -> Option<ItemId> {
        self.names.get(name).copied()
    }

    pub fn name_of(&self, id: ItemId) -> Option<&str> {
        self.ids.get(&id).map(String::as_str)
    }

    pub fn all_of<'a, S: DescriptorSet<'a>>(&'a self, id: ItemId) -> bool {
        S::all_present(self, id)
    }

    pub fn any_of<'a, S: DescriptorSet<'a>>(&'a self, id: ItemId) -> bool {
        S::any_present(self, id)
    }

    pub fn none_of<'a, S: DescriptorSet<'a>>(&'a self, id: ItemId) -> bool {
        !S::any_present(self, id)
    }

    pub fn get<'a, S: DescriptorSet<'a>>(&'a self, id: ItemId) -> Result<S::Output> {
        S::try_fetch(self, id).ok_or_else(|| {
            let label = self.name_of(id).unwrap_or("<unknown>").to_string();
            ModelError::MissingDescriptor(label)
        })
    }

    pub fn try_get<'a, S: DescriptorSet<'a>>(&'a self, id: ItemId) -> Option<S::Output> {
        S::try_fetch(self, id)
    }

    /// Iterates every item bearing all descriptors in `S`.
    pub fn view<'a, S: DescriptorSet<'a>>(&'a self) -> impl Iterator<Item = ItemId> + 'a {
        self.item_descs
            .keys()
            .copied()
            .filter(move |&id| S::all_present(self, id))
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.item_descs.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{CallSig, ConstTable};

    #[test]
    fn rejects_duplicate_names() {
        let mut m = Module::new();
        m.add_struct("A", ConstTable::new()).unwrap();
        let err = m.add_struct("A", ConstTable::new()).unwrap_err();
        assert!(matches!(err, ModelError::NameAlreadyUsed(_)));
    }

    #[test]
    fn method_before_owner_is_allowed_and_cross_linked() {
        let mut m = Module::new();
        let method_id = m
            .add_method(
                "A",
                "m",
                ConstTable::new(),
                CallSig::new(vec![], 0.into()),
                0,
                CallFn::Bcode,
            )
            .unwrap();
        let owner_id = m.id_of("A").unwrap();
        assert!(!m.exists(owner_id));

        // Declaring the owner afterwards reuses the reserved id.
        let declared_owner_id = m.add_struct("A", ConstTable::new()).unwrap();
        assert_eq!(declared_owner_id, owner_id);
        assert!(m.exists(owner_id));

        let member: MemberDesc = *m.get::<MemberDesc>(method_id).unwrap();
        assert_eq!(member.owner, owner_id);
        let owner: &OwnerDesc = m.get::<OwnerDesc>(owner_id).unwrap();
        assert_eq!(owner.members, vec![method_id]);

        // A second declaration of the now-fully-declared owner is a true
        // collision.
        assert!(matches!(
            m.add_struct("A", ConstTable::new()).unwrap_err(),
            ModelError::NameAlreadyUsed(_)
        ));
    }

    #[test]
    fn view_and_all_of_combine_descriptors() {
        let mut m = Module::new();
        let f = m
            .add_function(
                "f",
                ConstTable::new(),
                CallSig::new(vec![], 0.into()),
                1,
                CallFn::Bcode,
            )
            .unwrap();
        let s = m.add_struct("S", ConstTable::new()).unwrap();

        assert!(m.all_of::<(ItemDesc, CallDesc)>(f));
        assert!(!m.all_of::<(ItemDesc, CallDesc)>(s));
        assert!(m.none_of::<CallDesc>(s));

        let callables: Vec<_> = m.view::<(ItemDesc, CallDesc)>().collect();
        assert_eq!(callables, vec![f]);
    }

    #[test]
    fn try_get_is_none_for_missing_descriptor() {
        let mut m = Module::new();
        let s = m.add_struct("S", ConstTable::new()).unwrap();
        assert!(m.try_get::<CallDesc>(s).is_none());
        assert!(m.try_get::<ItemDesc>(s).is_some());
    }

    #[test]
    fn bind_bcode_rejects_double_bind_and_non_callable() {
        use crate::bytecode::Bytecode;

        let mut m = Module::new();
        m.add_struct("S", ConstTable::new()).unwrap();
        assert!(matches!(
            m.bind_bcode("S", Bytecode::new(vec![]), None).unwrap_err(),
            ModelError::NotCallable(_)
        ));

        m.add_function(
            "f",
            ConstTable::new(),
            CallSig::new(vec![], 0.into()),
            1,
            CallFn::Bcode,
        )
        .unwrap();
        m.bind_bcode("f", Bytecode::new(vec![]), None).unwrap();
        assert!(matches!(
            m.bind_bcode("f", Bytecode::new(vec![]), None)
                .unwrap_err(),
            ModelError::BcodeAlreadyBound(_)
        ));
    }
}
