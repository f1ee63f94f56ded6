use yama_model::ObjectConst;

/// Well-known fully-qualified names of the built-in primitives, as installed
/// by the fixed-name built-in parcel in `yama-core` (`"yama:None"`,
/// `"yama:Int"`, ...). The verifier never loads types, so it treats a
/// register's type as just this name — two registers agree iff their names
/// are equal, mirroring the reference implementation's `type_k` query key,
/// which is keyed purely on a type's fully-qualified name (see
/// `original_source/yamalib/yama/core/type_k.h`).
pub mod builtin {
    pub const PARCEL: &str = "yama";
    pub const NONE: &str = "yama:None";
    pub const INT: &str = "yama:Int";
    pub const UINT: &str = "yama:UInt";
    pub const FLOAT: &str = "yama:Float";
    pub const BOOL: &str = "yama:Bool";
    pub const CHAR: &str = "yama:Char";
    pub const TYPE: &str = "yama:Type";
}

/// A register's symbolic type: the fully-qualified name of the type it
/// holds a value of. Equality is the verifier's only notion of "same type".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VType(String);

impl VType {
    pub fn named(fq_name: impl Into<String>) -> Self {
        Self(fq_name.into())
    }

    pub fn none() -> Self {
        Self::named(builtin::NONE)
    }

    pub fn type_type() -> Self {
        Self::named(builtin::TYPE)
    }

    pub fn from_object_const(c: &ObjectConst) -> Self {
        let name = match c {
            ObjectConst::Int(_) => builtin::INT,
            ObjectConst::UInt(_) => builtin::UINT,
            ObjectConst::Float(_) => builtin::FLOAT,
            ObjectConst::Bool(_) => builtin::BOOL,
            ObjectConst::Char(_) => builtin::CHAR,
        };
        Self::named(name)
    }

    pub fn is_bool(&self) -> bool {
        self.0 == builtin::BOOL
    }

    pub fn fq_name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
