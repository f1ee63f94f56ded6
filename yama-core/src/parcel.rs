use yama_model::Module;

/// A parcel's stable identity: its own name and the dep-names it expects an
/// install batch to map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParcelMetadata {
    self_name: String,
    dep_names: Vec<String>,
}

impl ParcelMetadata {
    pub fn new(self_name: impl Into<String>, dep_names: Vec<String>) -> Self {
        Self {
            self_name: self_name.into(),
            dep_names,
        }
    }

    pub fn self_name(&self) -> &str {
        &self.self_name
    }

    pub fn dep_names(&self) -> &[String] {
        &self.dep_names
    }

    /// Invariant: self-name is not among dep-names.
    pub fn is_self_consistent(&self) -> bool {
        !self.dep_names.iter().any(|d| d == &self.self_name)
    }
}

/// What a parcel's `import(relative_path)` can produce.
pub enum ImportOutcome {
    NotFound,
    /// A fully-formed module, bypassing compilation entirely.
    Ready(Module),
    /// Source text for the injected compiler to turn into a module.
    Source(String),
}

/// A named, externally-supplied container of modules. Parcels are arbitrary
/// collaborators — a filesystem-backed parcel, an in-memory test fixture,
/// the built-in primitive parcel (`crate::builtin`) — the registry only
/// ever talks to this trait.
pub trait Parcel: Send + Sync {
    /// Stable across calls.
    fn metadata(&self) -> ParcelMetadata;

    /// The empty relative path denotes the parcel's root module.
    fn import(&self, relative_path: &str) -> ImportOutcome;
}
