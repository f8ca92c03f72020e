//! # forbidden-apis-signatures
//!
//! Built-in signature catalogs shipped with forbidden-apis.
//!
//! A catalog is either version-independent (one text block) or
//! version-sensitive: a list of fragments, each tagged with the runtime
//! version that introduced the APIs it lists. Selecting a versioned catalog
//! yields the union of every fragment whose `since` is at or below the
//! requested version.
//!
//! ```
//! use forbidden_apis_signatures::resolve;
//!
//! let catalog = resolve("jdk-unsafe-1.8", None).unwrap();
//! assert_eq!(catalog.version, Some(8));
//! assert!(catalog.text.contains("java.lang.String#toLowerCase()"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use thiserror::Error;

/// Errors raised while selecting a bundled catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundledError {
    /// No catalog with this name exists.
    #[error("unknown bundled signatures: {name}")]
    UnknownCatalog {
        /// Requested name.
        name: String,
    },

    /// The catalog is version-sensitive and no version was available.
    #[error("bundled signatures '{name}' require a target runtime version")]
    MissingVersion {
        /// Requested name.
        name: String,
    },

    /// A version string could not be parsed.
    #[error("invalid runtime version '{version}'")]
    InvalidVersion {
        /// The offending version text.
        version: String,
    },
}

/// A slice of a catalog that applies from `since` onwards.
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    /// First runtime version the fragment applies to.
    pub since: u32,
    /// Signature text in the regular line grammar.
    pub text: &'static str,
}

/// A named, built-in signature catalog.
#[derive(Debug, Clone, Copy)]
pub struct BundledCatalog {
    /// Catalog name, e.g. `jdk-unsafe`.
    pub name: &'static str,
    /// One-line description for listings.
    pub description: &'static str,
    /// Whether selection needs a runtime version.
    pub versioned: bool,
    fragments: &'static [Fragment],
}

impl BundledCatalog {
    /// Returns the raw fragments of this catalog.
    #[must_use]
    pub fn fragments(&self) -> &'static [Fragment] {
        self.fragments
    }

    /// Renders the signature text for a runtime version.
    ///
    /// Version-independent catalogs ignore `version`.
    ///
    /// # Errors
    ///
    /// Returns [`BundledError::MissingVersion`] when the catalog is
    /// versioned and `version` is `None`.
    pub fn text_for(&self, version: Option<u32>) -> Result<String, BundledError> {
        let limit = match (self.versioned, version) {
            (false, _) => u32::MAX,
            (true, Some(v)) => v,
            (true, None) => {
                return Err(BundledError::MissingVersion {
                    name: self.name.to_string(),
                })
            }
        };

        let mut text = String::new();
        for fragment in self.fragments.iter().filter(|f| f.since <= limit) {
            text.push_str(fragment.text);
            if !text.ends_with('\n') {
                text.push('\n');
            }
        }
        Ok(text)
    }
}

/// A catalog selected by name, ready to be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCatalog {
    /// Canonical catalog name plus version suffix, used as source identity.
    pub name: String,
    /// The runtime version applied, if the catalog is versioned.
    pub version: Option<u32>,
    /// Signature text.
    pub text: String,
}

const CATALOGS: &[BundledCatalog] = &[
    BundledCatalog {
        name: "jdk-unsafe",
        description: "Methods depending on the default locale, time zone or charset",
        versioned: true,
        fragments: &[
            Fragment {
                since: 1,
                text: include_str!("../signatures/jdk-unsafe.txt"),
            },
            Fragment {
                since: 5,
                text: include_str!("../signatures/jdk-unsafe-5.txt"),
            },
        ],
    },
    BundledCatalog {
        name: "jdk-deprecated",
        description: "Deprecated runtime APIs",
        versioned: true,
        fragments: &[
            Fragment {
                since: 1,
                text: include_str!("../signatures/jdk-deprecated.txt"),
            },
            Fragment {
                since: 9,
                text: include_str!("../signatures/jdk-deprecated-9.txt"),
            },
            Fragment {
                since: 18,
                text: include_str!("../signatures/jdk-deprecated-18.txt"),
            },
        ],
    },
    BundledCatalog {
        name: "jdk-system-out",
        description: "Console output via System.out, System.err and printStackTrace",
        versioned: false,
        fragments: &[Fragment {
            since: 1,
            text: include_str!("../signatures/jdk-system-out.txt"),
        }],
    },
    BundledCatalog {
        name: "jdk-reflection",
        description: "Reflection that suppresses access checks",
        versioned: false,
        fragments: &[Fragment {
            since: 1,
            text: include_str!("../signatures/jdk-reflection.txt"),
        }],
    },
    BundledCatalog {
        name: "jdk-non-portable",
        description: "Vendor-specific runtime packages (sun.*, jdk.internal.*, ...)",
        versioned: false,
        fragments: &[Fragment {
            since: 1,
            text: include_str!("../signatures/jdk-non-portable.txt"),
        }],
    },
    BundledCatalog {
        name: "jdk-exec",
        description: "Spawning external processes",
        versioned: false,
        fragments: &[Fragment {
            since: 1,
            text: include_str!("../signatures/jdk-exec.txt"),
        }],
    },
];

/// Returns every bundled catalog.
#[must_use]
pub fn all_catalogs() -> &'static [BundledCatalog] {
    CATALOGS
}

/// Looks up a catalog by its exact name (without version suffix).
#[must_use]
pub fn find(name: &str) -> Option<&'static BundledCatalog> {
    CATALOGS.iter().find(|c| c.name == name)
}

/// Parses a runtime version in either `1.N` or `N` spelling.
///
/// # Errors
///
/// Returns [`BundledError::InvalidVersion`] for anything else.
pub fn parse_version(version: &str) -> Result<u32, BundledError> {
    let invalid = || BundledError::InvalidVersion {
        version: version.to_string(),
    };
    let trimmed = version.trim();
    let number = match trimmed.strip_prefix("1.") {
        Some(rest) => rest,
        None => trimmed,
    };
    let parsed: u32 = number.parse().map_err(|_| invalid())?;
    if parsed == 0 {
        return Err(invalid());
    }
    Ok(parsed)
}

/// Selects a catalog by name, applying a version.
///
/// A version embedded in the name (`jdk-unsafe-1.8`, `jdk-deprecated-11`)
/// takes precedence over `target`. Version-independent catalogs accept and
/// ignore either.
///
/// # Errors
///
/// Fails for unknown names, unparsable versions, or a versioned catalog
/// with no version available.
pub fn resolve(name: &str, target: Option<&str>) -> Result<ResolvedCatalog, BundledError> {
    let (catalog, embedded) = split_name(name)?;

    let version = match embedded {
        Some(v) => Some(v),
        None => target.map(parse_version).transpose()?,
    };

    let text = catalog.text_for(version)?;
    let version = if catalog.versioned { version } else { None };
    let name = match version {
        Some(v) => format!("{}-{v}", catalog.name),
        None => catalog.name.to_string(),
    };

    Ok(ResolvedCatalog {
        name,
        version,
        text,
    })
}

fn split_name(name: &str) -> Result<(&'static BundledCatalog, Option<u32>), BundledError> {
    if let Some(catalog) = find(name) {
        return Ok((catalog, None));
    }

    let unknown = || BundledError::UnknownCatalog {
        name: name.to_string(),
    };

    // `jdk-unsafe-1.8` -> (`jdk-unsafe`, `1.8`)
    let (base, suffix) = name.rsplit_once('-').ok_or_else(unknown)?;
    let catalog = find(base).ok_or_else(unknown)?;
    let version = parse_version(suffix)?;
    Ok((catalog, Some(version)))
}
