//! Parsed signature rules and their owner patterns.

use super::glob::ClassGlob;
use crate::classfile::descriptor::pretty_params;
use std::fmt;

/// What a signature forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    /// The type itself, wherever it is referenced.
    Class,
    /// One exact method or constructor overload.
    Method,
    /// A field, or every method overload of that name.
    Field,
    /// Any element carrying the annotation.
    Annotated,
}

/// The owner side of a signature: an exact binary name or a glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerPattern {
    /// Exact dotted binary name.
    Exact(String),
    /// Wildcard pattern, evaluated lazily at match time.
    Glob(ClassGlob),
}

impl OwnerPattern {
    /// Builds a pattern, choosing glob form when wildcards are present.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        if ClassGlob::is_glob(pattern) {
            Self::Glob(ClassGlob::new(pattern))
        } else {
            Self::Exact(pattern.to_string())
        }
    }

    /// Tests a dotted class name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == name,
            Self::Glob(glob) => glob.matches(name),
        }
    }

    /// The pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(exact) => exact,
            Self::Glob(glob) => glob.as_str(),
        }
    }

    /// Whether this is a wildcard pattern.
    #[must_use]
    pub fn is_glob(&self) -> bool {
        matches!(self, Self::Glob(_))
    }
}

/// One forbidden-API rule. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    kind: SignatureKind,
    owner: OwnerPattern,
    member: Option<String>,
    params: Option<String>,
    reason: String,
}

impl Signature {
    /// Forbids a type.
    #[must_use]
    pub fn class(owner: &str, reason: impl Into<String>) -> Self {
        Self {
            kind: SignatureKind::Class,
            owner: OwnerPattern::new(owner),
            member: None,
            params: None,
            reason: reason.into(),
        }
    }

    /// Forbids one overload. `params` is the parameter part of a
    /// descriptor, e.g. `(I)` or `([Ljava/lang/String;)`.
    #[must_use]
    pub fn method(
        owner: &str,
        name: impl Into<String>,
        params: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: SignatureKind::Method,
            owner: OwnerPattern::new(owner),
            member: Some(name.into()),
            params: Some(params.into()),
            reason: reason.into(),
        }
    }

    /// Forbids a field or all overloads of a method name.
    #[must_use]
    pub fn field(owner: &str, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: SignatureKind::Field,
            owner: OwnerPattern::new(owner),
            member: Some(name.into()),
            params: None,
            reason: reason.into(),
        }
    }

    /// Forbids elements carrying an annotation.
    #[must_use]
    pub fn annotated(annotation: &str, reason: impl Into<String>) -> Self {
        Self {
            kind: SignatureKind::Annotated,
            owner: OwnerPattern::new(annotation),
            member: None,
            params: None,
            reason: reason.into(),
        }
    }

    /// Rule kind.
    #[must_use]
    pub fn kind(&self) -> SignatureKind {
        self.kind
    }

    /// Owner pattern (the annotation type for [`SignatureKind::Annotated`]).
    #[must_use]
    pub fn owner(&self) -> &OwnerPattern {
        &self.owner
    }

    /// Member name, absent for class and annotation rules.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// Parameter descriptor part, present only for method rules.
    #[must_use]
    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }

    /// Free-text reason; may be empty.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Normalized identity used for de-duplication. Parameter types are
    /// in descriptor form so spelling differences collapse.
    #[must_use]
    pub fn key(&self) -> String {
        let owner = self.owner.as_str();
        match (self.kind, &self.member, &self.params) {
            (SignatureKind::Annotated, ..) => format!("@{owner}"),
            (_, Some(member), Some(params)) => format!("{owner}#{member}{params}"),
            (_, Some(member), None) => format!("{owner}#{member}"),
            (_, None, _) => owner.to_string(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = self.owner.as_str();
        match (self.kind, &self.member, &self.params) {
            (SignatureKind::Annotated, ..) => write!(f, "@{owner}"),
            (_, Some(member), Some(params)) => {
                write!(f, "{owner}#{member}({})", pretty_params(&format!("{params}V")))
            }
            (_, Some(member), None) => write!(f, "{owner}#{member}"),
            (_, None, _) => f.write_str(owner),
        }
    }
}
