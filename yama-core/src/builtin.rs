use yama_model::{ConstTable, Module, PrimitiveKind};

use crate::parcel::{ImportOutcome, Parcel, ParcelMetadata};

/// The fixed install-name every domain pre-installs the built-in parcel
/// under. Every user parcel must map some dep-name to this name in order
/// to reference primitives.
pub const BUILTIN_INSTALL_NAME: &str = "yama";

/// Hosts the six primitive types plus `Type` itself — the catalogue every
/// domain loads by default (the allocator that actually produces values is
/// out of scope here; only the primitive catalogue it assumes is in
/// scope).
pub struct BuiltinParcel;

impl BuiltinParcel {
    fn root_module() -> Module {
        let mut m = Module::new();
        for (name, kind) in [
            ("None", PrimitiveKind::None),
            ("Int", PrimitiveKind::Int),
            ("UInt", PrimitiveKind::UInt),
            ("Float", PrimitiveKind::Float),
            ("Bool", PrimitiveKind::Bool),
            ("Char", PrimitiveKind::Char),
            ("Type", PrimitiveKind::Type),
        ] {
            m.add_primitive(name, ConstTable::new(), kind)
                .expect("built-in primitive names are distinct by construction");
        }
        m
    }
}

impl Parcel for BuiltinParcel {
    fn metadata(&self) -> ParcelMetadata {
        ParcelMetadata::new(BUILTIN_INSTALL_NAME, vec![])
    }

    fn import(&self, relative_path: &str) -> ImportOutcome {
        if relative_path.is_empty() {
            ImportOutcome::Ready(Self::root_module())
        } else {
            ImportOutcome::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_module_hosts_all_seven_primitives() {
        let module = match (BuiltinParcel).import("") {
            ImportOutcome::Ready(m) => m,
            _ => panic!("expected a ready module"),
        };
        for name in ["None", "Int", "UInt", "Float", "Bool", "Char", "Type"] {
            assert!(module.id_of(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn nested_path_is_not_found() {
        assert!(matches!(
            (BuiltinParcel).import("nested"),
            ImportOutcome::NotFound
        ));
    }
}
