use std::fmt;

use crate::error::ModelError;

/// An unqualified item name, optionally of the form `Owner::member` for methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnqualifiedName(String);

impl UnqualifiedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// If this name is of the form `Owner::member`, returns `(Owner, member)`.
    pub fn split_member(&self) -> Option<(&str, &str)> {
        self.0.split_once("::")
    }
}

impl fmt::Display for UnqualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnqualifiedName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UnqualifiedName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A `.`-separated path whose head is a dependency/self name or (once
/// resolved) an install-name, and whose tail is parcel-relative.
///
/// The same shape is used both before resolution (head is a dep-name or
/// `"self"`, meaningful only relative to some [`crate::module::Module`]'s
/// owning parcel environment) and after resolution (head is an
/// install-name, globally meaningful within a domain). Call sites document
/// which state a given `ImportPath` is in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportPath {
    head: String,
    tail: Vec<String>,
}

pub const SELF_DEP_NAME: &str = "self";

impl ImportPath {
    pub fn new(head: impl Into<String>, tail: Vec<String>) -> Self {
        Self {
            head: head.into(),
            tail,
        }
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn tail(&self) -> &[String] {
        &self.tail
    }

    /// The parcel-relative path, e.g. `"a.b.c"` for tail `["a", "b", "c"]`.
    pub fn relative_path(&self) -> String {
        self.tail.join(".")
    }

    pub fn is_self(&self) -> bool {
        self.head == SELF_DEP_NAME
    }

    /// Returns a copy of this path with a different head, keeping the tail.
    pub fn with_head(&self, head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            tail: self.tail.clone(),
        }
    }
}

impl fmt::Display for ImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for seg in &self.tail {
            write!(f, ".{seg}")?;
        }
        Ok(())
    }
}

/// A fully-qualified name: an [`ImportPath`] (already resolved to an
/// install-name) plus an [`UnqualifiedName`].
///
/// Wire grammar: `<install-name>[.segment]*:unqualified[::member]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullyQualifiedName {
    path: ImportPath,
    name: UnqualifiedName,
}

impl FullyQualifiedName {
    pub fn new(path: ImportPath, name: UnqualifiedName) -> Self {
        Self { path, name }
    }

    pub fn path(&self) -> &ImportPath {
        &self.path
    }

    pub fn name(&self) -> &UnqualifiedName {
        &self.name
    }
}

impl fmt::Display for FullyQualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.name)
    }
}

/// Parses the wire grammar for a fully-qualified name:
/// `head(.identifier)*:unqualified(::member)?`.
///
/// Parsing is total: any input that doesn't fit the grammar is reported via
/// [`ModelError::MalformedFullyQualifiedName`], which callers in `yama-core`
/// map onto `Signal::ImportModuleNotFound`.
pub fn parse_fq_name(input: &str) -> Result<FullyQualifiedName, ModelError> {
    let (path_part, name_part) = input
        .split_once(':')
        .ok_or_else(|| ModelError::MalformedFullyQualifiedName(input.to_string()))?;

    if path_part.is_empty() || name_part.is_empty() {
        return Err(ModelError::MalformedFullyQualifiedName(input.to_string()));
    }

    let mut segments = path_part.split('.');
    let head = segments.next().unwrap();
    if !is_identifier(head) {
        return Err(ModelError::MalformedFullyQualifiedName(input.to_string()));
    }
    let mut tail = Vec::new();
    for seg in segments {
        if !is_identifier(seg) {
            return Err(ModelError::MalformedFullyQualifiedName(input.to_string()));
        }
        tail.push(seg.to_string());
    }

    if name_part.contains(':') {
        // At most one `::member` suffix is permitted; a bare `:` inside the
        // name part (beyond the head separator already consumed) is malformed.
        let mut member_parts = name_part.splitn(2, "::");
        let owner = member_parts.next().unwrap();
        let member = member_parts
            .next()
            .ok_or_else(|| ModelError::MalformedFullyQualifiedName(input.to_string()))?;
        if !is_identifier(owner) || !is_identifier(member) || member.contains(':') {
            return Err(ModelError::MalformedFullyQualifiedName(input.to_string()));
        }
    } else if !is_identifier(name_part) {
        return Err(ModelError::MalformedFullyQualifiedName(input.to_string()));
    }

    Ok(FullyQualifiedName::new(
        ImportPath::new(head, tail),
        UnqualifiedName::new(name_part),
    ))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_fq_name() {
        let fq = parse_fq_name("a:f").unwrap();
        assert_eq!(fq.path().head(), "a");
        assert!(fq.path().tail().is_empty());
        assert_eq!(fq.name().as_str(), "f");
    }

    #[test]
    fn parses_dotted_path_and_member() {
        let fq = parse_fq_name("yama.std.collections:Vector::push").unwrap();
        assert_eq!(fq.path().head(), "yama");
        assert_eq!(fq.path().tail(), &["std", "collections"]);
        assert_eq!(fq.name().as_str(), "Vector::push");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_fq_name("").is_err());
        assert!(parse_fq_name("noname").is_err());
        assert!(parse_fq_name(":f").is_err());
        assert!(parse_fq_name("a:").is_err());
        assert!(parse_fq_name("1abc:f").is_err());
        assert!(parse_fq_name("a..b:f").is_err());
    }

    #[test]
    fn format_round_trips_through_display() {
        let fq = parse_fq_name("a.b:Owner::member").unwrap();
        let formatted = fq.to_string();
        let reparsed = parse_fq_name(&formatted).unwrap();
        assert_eq!(fq, reparsed);
    }
}
