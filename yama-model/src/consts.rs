use crate::error::{ModelError, Result};
use crate::ids::ConstIndex;

/// The five scalar ("object") constant kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectConst {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Char(char),
}

impl ObjectConst {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ObjectConst::Int(_) => "int",
            ObjectConst::UInt(_) => "uint",
            ObjectConst::Float(_) => "float",
            ObjectConst::Bool(_) => "bool",
            ObjectConst::Char(_) => "char",
        }
    }
}

impl std::fmt::Display for ObjectConst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectConst::Int(v) => write!(f, "{v}"),
            ObjectConst::UInt(v) => write!(f, "{v}"),
            ObjectConst::Float(v) => write!(f, "{v}"),
            ObjectConst::Bool(v) => write!(f, "{v}"),
            ObjectConst::Char(v) => write!(f, "{v:?}"),
        }
    }
}

/// Which of the four type-constant kinds a [`TypeConst`] denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeConstKind {
    Primitive,
    Function,
    Method,
    Struct,
}

impl TypeConstKind {
    pub fn name(self) -> &'static str {
        match self {
            TypeConstKind::Primitive => "primitive",
            TypeConstKind::Function => "function",
            TypeConstKind::Method => "method",
            TypeConstKind::Struct => "struct",
        }
    }

    pub fn is_callable(self) -> bool {
        matches!(self, TypeConstKind::Function | TypeConstKind::Method)
    }
}

/// A call signature: parameter type-constant indices plus a return
/// type-constant index, all indexing into the *same* constant table that
/// contains the [`TypeConst`] this signature belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSig {
    params: Vec<ConstIndex>,
    return_ty: ConstIndex,
}

impl CallSig {
    pub fn new(params: Vec<ConstIndex>, return_ty: ConstIndex) -> Self {
        Self { params, return_ty }
    }

    pub fn params(&self) -> &[ConstIndex] {
        &self.params
    }

    pub fn return_ty(&self) -> ConstIndex {
        self.return_ty
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

/// A type-constant: a stub reference (by fully-qualified name) to another
/// item, plus (for callable kinds) the advertised call signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConst {
    kind: TypeConstKind,
    fq_name: String,
    callsig: Option<CallSig>,
}

impl TypeConst {
    pub fn new(kind: TypeConstKind, fq_name: impl Into<String>, callsig: Option<CallSig>) -> Self {
        debug_assert_eq!(
            kind.is_callable(),
            callsig.is_some(),
            "callsig must be present iff the type-constant kind is callable"
        );
        Self {
            kind,
            fq_name: fq_name.into(),
            callsig,
        }
    }

    pub fn kind(&self) -> TypeConstKind {
        self.kind
    }

    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn callsig(&self) -> Option<&CallSig> {
        self.callsig.as_ref()
    }
}

/// One slot of a [`ConstTable`]: either a scalar object constant or a
/// type-constant (a stub reference to another item).
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Object(ObjectConst),
    Type(TypeConst),
}

impl Const {
    pub fn as_object(&self) -> Option<&ObjectConst> {
        match self {
            Const::Object(o) => Some(o),
            Const::Type(_) => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeConst> {
        match self {
            Const::Type(t) => Some(t),
            Const::Object(_) => None,
        }
    }
}

/// An ordered sequence of constants belonging to a single item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstTable {
    entries: Vec<Const>,
}

impl ConstTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: Const) -> ConstIndex {
        let idx = ConstIndex::from(self.entries.len());
        self.entries.push(c);
        idx
    }

    pub fn push_object(&mut self, c: ObjectConst) -> ConstIndex {
        self.push(Const::Object(c))
    }

    pub fn push_type(&mut self, c: TypeConst) -> ConstIndex {
        self.push(Const::Type(c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: ConstIndex) -> Result<&Const> {
        self.entries
            .get(index.index())
            .ok_or(ModelError::ConstIndexOutOfBounds(index))
    }

    pub fn get_object(&self, index: ConstIndex) -> Result<&ObjectConst> {
        match self.get(index)? {
            Const::Object(o) => Ok(o),
            Const::Type(_) => Err(ModelError::NotAnObjectConst(index)),
        }
    }

    pub fn get_type(&self, index: ConstIndex) -> Result<&TypeConst> {
        match self.get(index)? {
            Const::Type(t) => Ok(t),
            Const::Object(_) => Err(ModelError::NotATypeConst(index)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Const> {
        self.entries.iter()
    }
}
