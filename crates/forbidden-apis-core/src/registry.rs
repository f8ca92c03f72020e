//! Signature registry: collects rules from text, files and bundled
//! catalogs, then binds them to a classpath.

use crate::classpath::{ClasspathError, ClasspathResolver, MemberQuery, MemberResolution};
use crate::signature::{parse_signatures, Entry, Signature, SignatureKind, SignatureParseError};

use forbidden_apis_signatures::BundledError;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while loading or freezing signatures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed signature text.
    #[error(transparent)]
    Parse(#[from] SignatureParseError),

    /// Unknown bundled catalog or missing version.
    #[error("{origin}: {source}")]
    Bundled {
        /// Where the catalog was requested from.
        origin: String,
        /// Underlying error.
        source: BundledError,
    },

    /// A signatures file could not be read.
    #[error("Failed to read signatures file {path}: {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An exact-owner rule does not resolve on the classpath.
    #[error("{origin}:{line}: signature '{signature}' cannot be resolved: {reason}")]
    Unresolvable {
        /// Source identity.
        origin: String,
        /// 1-based line number.
        line: usize,
        /// The rule in Java syntax.
        signature: String,
        /// What was missing.
        reason: String,
    },

    /// The classpath failed while validating rules.
    #[error(transparent)]
    Classpath(#[from] ClasspathError),
}

#[derive(Debug, Clone)]
struct PendingRule {
    signature: Signature,
    ignore_unresolvable: bool,
    origin: String,
    line: usize,
}

/// Accumulates raw signatures until [`SignatureRegistry::freeze`].
#[derive(Debug, Default)]
pub struct SignatureRegistry {
    rules: Vec<PendingRule>,
    keys: HashSet<String>,
    target_version: Option<String>,
    bundled: HashSet<String>,
}

impl SignatureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime version used for `@includeBundled` and
    /// [`SignatureRegistry::parse_bundled`] without an explicit version.
    pub fn set_target_version(&mut self, version: Option<String>) {
        self.target_version = version;
    }

    /// The configured target runtime version.
    #[must_use]
    pub fn target_version(&self) -> Option<&str> {
        self.target_version.as_deref()
    }

    /// Parses signature text. Returns the number of new rules.
    ///
    /// # Errors
    ///
    /// The first malformed line, or a failing `@includeBundled`, aborts the
    /// whole source; no rule from it is kept.
    pub fn parse_text(&mut self, origin: &str, text: &str) -> Result<usize, RegistryError> {
        let entries = parse_signatures(origin, text)?;
        self.add_entries(origin, entries, false)
    }

    /// Reads and parses a signatures file.
    ///
    /// # Errors
    ///
    /// I/O failures and everything [`SignatureRegistry::parse_text`] rejects.
    pub fn parse_file(&mut self, path: &Path) -> Result<usize, RegistryError> {
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_text(&path.display().to_string(), &text)
    }

    /// Merges a bundled catalog. `target` overrides the registry's target
    /// version; a version embedded in `name` overrides both.
    ///
    /// Bundled rules never fail on unresolvable owners: the runtime they
    /// describe may not be on the classpath.
    ///
    /// # Errors
    ///
    /// Unknown catalogs, invalid or missing versions.
    pub fn parse_bundled(&mut self, name: &str, target: Option<&str>) -> Result<usize, RegistryError> {
        let target = target.or(self.target_version.as_deref()).map(str::to_string);
        self.include_bundled("bundled", name, target.as_deref())
    }

    fn include_bundled(
        &mut self,
        origin: &str,
        name: &str,
        target: Option<&str>,
    ) -> Result<usize, RegistryError> {
        let catalog = forbidden_apis_signatures::resolve(name, target).map_err(|source| {
            RegistryError::Bundled {
                origin: origin.to_string(),
                source,
            }
        })?;
        if !self.bundled.insert(catalog.name.clone()) {
            debug!("Bundled signatures {} already loaded", catalog.name);
            return Ok(0);
        }
        let entries = parse_signatures(&catalog.name, &catalog.text)?;
        let added = self.add_entries(&catalog.name, entries, true)?;
        info!("Loaded {added} signatures from bundled catalog {}", catalog.name);
        Ok(added)
    }

    fn add_entries(
        &mut self,
        origin: &str,
        entries: Vec<Entry>,
        lenient: bool,
    ) -> Result<usize, RegistryError> {
        // Stage first so a failing include leaves no partial source behind.
        let mut staged = Vec::new();
        let mut includes = Vec::new();
        for entry in entries {
            match entry {
                Entry::Rule {
                    signature,
                    ignore_unresolvable,
                    line,
                } => staged.push(PendingRule {
                    signature,
                    ignore_unresolvable: ignore_unresolvable || lenient,
                    origin: origin.to_string(),
                    line,
                }),
                Entry::IncludeBundled { name, line, .. } => includes.push((name, line)),
            }
        }

        let target = self.target_version.clone();
        for (name, line) in &includes {
            forbidden_apis_signatures::resolve(name, target.as_deref()).map_err(|source| {
                RegistryError::Bundled {
                    origin: format!("{origin}:{line}"),
                    source,
                }
            })?;
        }

        let mut added = 0;
        for rule in staged {
            if self.keys.insert(rule.signature.key()) {
                self.rules.push(rule);
                added += 1;
            } else {
                debug!("Duplicate signature ignored: {}", rule.signature);
            }
        }
        for (name, line) in includes {
            added += self.include_bundled(&format!("{origin}:{line}"), &name, target.as_deref())?;
        }
        Ok(added)
    }

    /// Number of distinct rules collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Binds the rules to a classpath snapshot.
    ///
    /// Exact owners must load and, for member rules, declare the member
    /// somewhere in their lineage. Failing rules are an error when
    /// `fail_on_unresolvable` is set and the rule was not marked
    /// `@ignoreUnresolvable`; otherwise they are dropped with a warning.
    /// Glob and annotation rules are kept as-is.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unresolvable`] in strict mode, or classpath failures.
    pub fn freeze(
        &self,
        resolver: &ClasspathResolver,
        fail_on_unresolvable: bool,
    ) -> Result<ResolvedSignatureSet, RegistryError> {
        let mut set = ResolvedSignatureSet::default();

        for rule in &self.rules {
            let signature = &rule.signature;
            if signature.kind() == SignatureKind::Annotated {
                set.annotations.push(signature.clone());
                continue;
            }
            if signature.owner().is_glob() {
                set.globs.push(signature.clone());
                continue;
            }

            match unresolvable_reason(signature, resolver)? {
                None => {
                    set.exact.insert(signature.key(), signature.clone());
                }
                Some(reason) if fail_on_unresolvable && !rule.ignore_unresolvable => {
                    return Err(RegistryError::Unresolvable {
                        origin: rule.origin.clone(),
                        line: rule.line,
                        signature: signature.to_string(),
                        reason,
                    });
                }
                Some(reason) => {
                    warn!(
                        "{}:{}: dropping signature '{signature}': {reason}",
                        rule.origin, rule.line
                    );
                    set.unresolved.push(signature.to_string());
                }
            }
        }

        info!(
            "Resolved {} signatures ({} dropped)",
            set.len(),
            set.unresolved.len()
        );
        Ok(set)
    }
}

fn unresolvable_reason(
    signature: &Signature,
    resolver: &ClasspathResolver,
) -> Result<Option<String>, ClasspathError> {
    let owner = signature.owner().as_str();
    let query = match (signature.kind(), signature.member(), signature.params()) {
        (SignatureKind::Method, Some(name), Some(params)) => MemberQuery::MethodParams { name, params },
        (SignatureKind::Field, Some(name), _) => MemberQuery::AnyNamed { name },
        _ => {
            return Ok(resolver
                .load(owner)?
                .is_none()
                .then(|| format!("class {owner} not found")));
        }
    };

    Ok(match resolver.resolve_member(owner, query)? {
        MemberResolution::Resolved {
            declarer: Some(_), ..
        } => None,
        MemberResolution::Resolved {
            declarer: None,
            missing,
            ..
        } if !missing.is_empty() => Some(format!("class {} not found", missing.join(", "))),
        MemberResolution::Resolved { declarer: None, .. } => Some(format!(
            "member '{}' not found in {owner} or its supertypes",
            signature.member().unwrap_or_default()
        )),
        MemberResolution::Unresolvable { class } => Some(format!("class {class} not found")),
    })
}

/// Rules bound to a classpath snapshot, ready for matching.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSignatureSet {
    exact: HashMap<String, Signature>,
    globs: Vec<Signature>,
    annotations: Vec<Signature>,
    unresolved: Vec<String>,
}

impl ResolvedSignatureSet {
    /// Exact overload rule `owner#name(params)`.
    #[must_use]
    pub fn method_rule(&self, owner: &str, name: &str, params: &str) -> Option<&Signature> {
        self.exact.get(&format!("{owner}#{name}{params}"))
    }

    /// Field or any-overload rule `owner#name`.
    #[must_use]
    pub fn member_rule(&self, owner: &str, name: &str) -> Option<&Signature> {
        self.exact.get(&format!("{owner}#{name}"))
    }

    /// Type rule on `owner`.
    #[must_use]
    pub fn class_rule(&self, owner: &str) -> Option<&Signature> {
        self.exact.get(owner)
    }

    /// Wildcard-owner rules in registration order.
    #[must_use]
    pub fn glob_rules(&self) -> &[Signature] {
        &self.globs
    }

    /// First annotation rule (in registration order) matching any of
    /// `annotations`.
    #[must_use]
    pub fn annotation_rule(&self, annotations: &[String]) -> Option<&Signature> {
        self.annotations
            .iter()
            .find(|rule| annotations.iter().any(|a| rule.owner().matches(a)))
    }

    /// Rules dropped during freeze, in Java syntax.
    #[must_use]
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// Number of matchable rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.globs.len() + self.annotations.len()
    }

    /// Whether no rule survived freezing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every matchable rule key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .exact
            .keys()
            .cloned()
            .chain(self.globs.iter().map(Signature::key))
            .chain(self.annotations.iter().map(Signature::key))
            .collect();
        keys.sort();
        keys
    }
}
