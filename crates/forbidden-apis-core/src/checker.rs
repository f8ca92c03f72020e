//! Checker orchestrator: run lifecycle, parallel scan and failure policy.

use crate::classfile::{parse_class, ClassMetadata, ClassParseError, ParseMode};
use crate::classpath::{Classpath, ClasspathError, ClasspathResolver};
use crate::registry::{RegistryError, ResolvedSignatureSet, SignatureRegistry};
use crate::scanner::Scanner;
use crate::signature::SignatureParseError;
use crate::suppression::SuppressionSet;
use crate::types::CheckReport;

use forbidden_apis_signatures::BundledError;
use miette::Diagnostic;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Switches fixed for the lifetime of a [`Checker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerOptions {
    /// Report any use of non-public runtime classes (`sun.*`, `jdk.internal.*`, ...).
    pub forbid_internal_runtime: bool,
    /// Fail the run when referenced classes are missing from the classpath.
    pub fail_on_missing_classes: bool,
    /// Fail when an exact-owner signature does not resolve.
    pub fail_on_unresolvable_signatures: bool,
    /// Fail the run when violations were found.
    pub fail_on_violation: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            forbid_internal_runtime: false,
            fail_on_missing_classes: true,
            fail_on_unresolvable_signatures: true,
            fail_on_violation: true,
        }
    }
}

/// Lifecycle of a [`Checker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerState {
    /// Accepting options and signatures.
    Configured,
    /// Signatures frozen against the classpath.
    SignaturesLoaded,
    /// At least one class queued.
    ClassesQueued,
    /// [`Checker::run`] was called.
    Ran,
}

impl fmt::Display for CheckerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configured => "configured",
            Self::SignaturesLoaded => "signatures loaded",
            Self::ClassesQueued => "classes queued",
            Self::Ran => "ran",
        };
        f.write_str(name)
    }
}

/// Everything a checker run can fail with.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckerError {
    /// Malformed signature text.
    #[error(transparent)]
    #[diagnostic(code(forbidden_apis::parse))]
    Parse(#[from] SignatureParseError),

    /// Unknown bundled catalog or unusable version.
    #[error("{origin}: {source}")]
    #[diagnostic(
        code(forbidden_apis::parse),
        help("run `forbidden-apis list-bundled` to see the available catalogs")
    )]
    Bundled {
        /// Where the catalog was requested.
        origin: String,
        /// Underlying error.
        source: BundledError,
    },

    /// An exact-owner signature does not resolve in strict mode.
    #[error("{origin}:{line}: signature '{signature}' cannot be resolved: {reason}")]
    #[diagnostic(
        code(forbidden_apis::resolution),
        help("add the missing library to the classpath, mark the source with @ignoreUnresolvable, or disable fail_on_unresolvable_signatures")
    )]
    UnresolvableSignature {
        /// Source identity.
        origin: String,
        /// 1-based line.
        line: usize,
        /// The rule in Java syntax.
        signature: String,
        /// What was missing.
        reason: String,
    },

    /// Classes referenced by checked code were not found.
    #[error(
        "Check for forbidden API calls failed: {count} referenced class(es) not found on the classpath: {}",
        .classes.join(", ")
    )]
    #[diagnostic(
        code(forbidden_apis::resolution),
        help("complete the classpath or disable fail_on_missing_classes")
    )]
    MissingClasses {
        /// Number of missing classes.
        count: usize,
        /// Sorted class names.
        classes: Vec<String>,
    },

    /// The run found forbidden API uses.
    #[error("Check for forbidden API calls failed: {violations} forbidden API invocation(s) found")]
    #[diagnostic(code(forbidden_apis::policy))]
    Policy {
        /// Number of violations.
        violations: usize,
    },

    /// A class file is newer than this checker understands.
    #[error("{path}: class file major version {major} is not supported by this checker")]
    #[diagnostic(
        code(forbidden_apis::environment),
        help("upgrade forbidden-apis or compile for an older target")
    )]
    UnsupportedClassFormat {
        /// File or class that carried the version.
        path: String,
        /// Major version found.
        major: u16,
    },

    /// A class queued for checking is corrupt.
    #[error("{path}: invalid class file: {source}")]
    #[diagnostic(code(forbidden_apis::io))]
    ClassFormat {
        /// File or origin of the bytes.
        path: String,
        /// Decoder error.
        source: ClassParseError,
    },

    /// A file could not be read.
    #[error("Failed to read {path}: {source}")]
    #[diagnostic(code(forbidden_apis::io))]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A classpath container failed.
    #[error(transparent)]
    #[diagnostic(code(forbidden_apis::io))]
    Classpath(ClasspathError),

    /// An operation was called out of lifecycle order.
    #[error("{operation} is not allowed once the checker is in state '{state}'")]
    #[diagnostic(code(forbidden_apis::state))]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// State at the time of the call.
        state: CheckerState,
    },
}

impl From<ClasspathError> for CheckerError {
    fn from(error: ClasspathError) -> Self {
        match error {
            ClasspathError::ClassFile {
                origin,
                source: ClassParseError::UnsupportedVersion { major, .. },
            } => Self::UnsupportedClassFormat { path: origin, major },
            other => Self::Classpath(other),
        }
    }
}

impl From<RegistryError> for CheckerError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::Parse(e) => Self::Parse(e),
            RegistryError::Bundled { origin, source } => Self::Bundled { origin, source },
            RegistryError::Io { path, source } => Self::Io { path, source },
            RegistryError::Unresolvable {
                origin,
                line,
                signature,
                reason,
            } => Self::UnresolvableSignature {
                origin,
                line,
                signature,
                reason,
            },
            RegistryError::Classpath(e) => e.into(),
        }
    }
}

/// Drives one check: load signatures, queue classes, run.
///
/// ```text
/// Configured --freeze--> SignaturesLoaded --add class--> ClassesQueued --run--> Ran
/// ```
///
/// Freezing happens on [`Checker::has_no_signatures`], on the first queued
/// class, or at the latest in [`Checker::run`].
pub struct Checker {
    options: CheckerOptions,
    resolver: ClasspathResolver,
    registry: SignatureRegistry,
    suppression: SuppressionSet,
    rules: Option<ResolvedSignatureSet>,
    queue: Vec<Arc<ClassMetadata>>,
    queued: HashSet<String>,
    state: CheckerState,
    report: CheckReport,
}

impl Checker {
    /// Opens the classpath and creates a checker.
    ///
    /// # Errors
    ///
    /// Classpath entries that exist but cannot be opened.
    pub fn new(classpath: &Classpath, options: CheckerOptions) -> Result<Self, CheckerError> {
        let resolver = ClasspathResolver::open(classpath)?;
        debug!("Checker options: {options:?}");
        Ok(Self {
            options,
            resolver,
            registry: SignatureRegistry::new(),
            suppression: SuppressionSet::new(),
            rules: None,
            queue: Vec::new(),
            queued: HashSet::new(),
            state: CheckerState::Configured,
            report: CheckReport::new(),
        })
    }

    /// The options this checker was created with.
    #[must_use]
    pub fn options(&self) -> CheckerOptions {
        self.options
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CheckerState {
        self.state
    }

    fn require(&self, operation: &'static str, allowed: &[CheckerState]) -> Result<(), CheckerError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CheckerError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Adds a suppression annotation name or glob, e.g. `**.SuppressForbidden`.
    ///
    /// # Errors
    ///
    /// [`CheckerError::InvalidState`] after [`Checker::run`].
    pub fn add_suppress_annotation(&mut self, pattern: &str) -> Result<(), CheckerError> {
        self.require(
            "add_suppress_annotation",
            &[
                CheckerState::Configured,
                CheckerState::SignaturesLoaded,
                CheckerState::ClassesQueued,
            ],
        )?;
        self.suppression.add(pattern);
        Ok(())
    }

    /// Sets the target runtime version for version-sensitive catalogs.
    ///
    /// # Errors
    ///
    /// [`CheckerError::InvalidState`] once signatures are frozen.
    pub fn set_target_version(&mut self, version: impl Into<String>) -> Result<(), CheckerError> {
        self.require("set_target_version", &[CheckerState::Configured])?;
        self.registry.set_target_version(Some(version.into()));
        Ok(())
    }

    /// Parses inline signature text.
    ///
    /// # Errors
    ///
    /// Parse failures, failing `@includeBundled`, or a frozen registry.
    pub fn parse_signatures_string(&mut self, text: &str) -> Result<usize, CheckerError> {
        self.require("parse_signatures_string", &[CheckerState::Configured])?;
        Ok(self.registry.parse_text("inline signatures", text)?)
    }

    /// Reads and parses a signatures file.
    ///
    /// # Errors
    ///
    /// I/O and parse failures, or a frozen registry.
    pub fn parse_signatures_file(&mut self, path: impl AsRef<Path>) -> Result<usize, CheckerError> {
        self.require("parse_signatures_file", &[CheckerState::Configured])?;
        let path = path.as_ref();
        info!("Reading API signatures: {}", path.display());
        Ok(self.registry.parse_file(path)?)
    }

    /// Merges a bundled catalog. `target` overrides the version set by
    /// [`Checker::set_target_version`].
    ///
    /// # Errors
    ///
    /// Unknown catalog, missing or invalid version, or a frozen registry.
    pub fn parse_bundled_signatures(
        &mut self,
        name: &str,
        target: Option<&str>,
    ) -> Result<usize, CheckerError> {
        self.require("parse_bundled_signatures", &[CheckerState::Configured])?;
        info!("Reading bundled API signatures: {name}");
        Ok(self.registry.parse_bundled(name, target)?)
    }

    fn freeze(&mut self) -> Result<(), CheckerError> {
        if self.state != CheckerState::Configured {
            return Ok(());
        }
        let rules = self
            .registry
            .freeze(&self.resolver, self.options.fail_on_unresolvable_signatures)?;
        self.rules = Some(rules);
        self.state = CheckerState::SignaturesLoaded;
        Ok(())
    }

    /// Freezes the signatures and reports whether nothing could ever match:
    /// no rule survived and internal-runtime checking is off.
    ///
    /// # Errors
    ///
    /// Unresolvable signatures in strict mode.
    pub fn has_no_signatures(&mut self) -> Result<bool, CheckerError> {
        self.freeze()?;
        let empty = self.rules.as_ref().map_or(true, ResolvedSignatureSet::is_empty);
        Ok(empty && !self.options.forbid_internal_runtime)
    }

    /// The frozen rule set, once available.
    #[must_use]
    pub fn signatures(&self) -> Option<&ResolvedSignatureSet> {
        self.rules.as_ref()
    }

    /// Queues a `.class` file.
    ///
    /// # Errors
    ///
    /// I/O failures, corrupt or unsupported class files, strict freeze
    /// failures, or a checker that already ran.
    pub fn add_class_to_check(&mut self, path: impl AsRef<Path>) -> Result<(), CheckerError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| CheckerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.add_class_bytes(&path.display().to_string(), &bytes)
    }

    /// Queues an in-memory class file; `origin` names it in errors.
    ///
    /// # Errors
    ///
    /// Same as [`Checker::add_class_to_check`] minus I/O.
    pub fn add_class_bytes(&mut self, origin: &str, bytes: &[u8]) -> Result<(), CheckerError> {
        self.require(
            "add_class_to_check",
            &[
                CheckerState::Configured,
                CheckerState::SignaturesLoaded,
                CheckerState::ClassesQueued,
            ],
        )?;
        self.freeze()?;

        let class = parse_class(bytes, ParseMode::Full).map_err(|source| match source {
            ClassParseError::UnsupportedVersion { major, .. } => CheckerError::UnsupportedClassFormat {
                path: origin.to_string(),
                major,
            },
            source => CheckerError::ClassFormat {
                path: origin.to_string(),
                source,
            },
        })?;

        if !self.queued.insert(class.name.clone()) {
            warn!("{origin}: class {} is already queued, skipping", class.name);
            return Ok(());
        }
        debug!("Queued {} from {origin}", class.name);
        let class = Arc::new(class);
        self.resolver.add_overlay(Arc::clone(&class));
        self.queue.push(class);
        self.state = CheckerState::ClassesQueued;
        Ok(())
    }

    /// Number of queued classes.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Scans every queued class and applies the failure policy.
    ///
    /// All classes are scanned before any policy failure is raised; the
    /// complete result stays available through [`Checker::report`].
    ///
    /// # Errors
    ///
    /// - [`CheckerError::MissingClasses`] when `fail_on_missing_classes` is set
    /// - [`CheckerError::Policy`] when `fail_on_violation` is set
    /// - classpath failures met while scanning
    /// - [`CheckerError::InvalidState`] on a second call
    pub fn run(&mut self) -> Result<&CheckReport, CheckerError> {
        self.require(
            "run",
            &[
                CheckerState::Configured,
                CheckerState::SignaturesLoaded,
                CheckerState::ClassesQueued,
            ],
        )?;
        self.freeze()?;
        self.state = CheckerState::Ran;

        let Some(rules) = self.rules.as_ref() else {
            return Err(CheckerError::InvalidState {
                operation: "run",
                state: self.state,
            });
        };
        let scanner = Scanner::new(
            rules,
            &self.resolver,
            &self.suppression,
            self.options.forbid_internal_runtime,
        );

        info!(
            "Scanning {} class(es) for API signatures and dependencies",
            self.queue.len()
        );
        let scans: Vec<_> = self
            .queue
            .par_iter()
            .map(|class| {
                debug!("Checking class {}", class.name);
                scanner.scan(class)
            })
            .collect();

        let mut report = CheckReport::new();
        let mut missing = BTreeSet::new();
        for scan in scans {
            let scan = scan?;
            report.violations.extend(scan.violations);
            missing.extend(scan.missing_classes);
        }
        report.classes_checked = self.queue.len();
        report.missing_classes = missing.into_iter().collect();
        report.unresolved_signatures = rules.unresolved().to_vec();
        debug!("{} classes cached after scan", self.resolver.cached_len());

        info!(
            "Scanned {} class(es), found {} forbidden API invocation(s)",
            report.classes_checked,
            report.violations.len()
        );
        if !report.missing_classes.is_empty() {
            warn!(
                "{} referenced class(es) not found on the classpath",
                report.missing_classes.len()
            );
        }
        self.report = report;

        if self.options.fail_on_missing_classes && !self.report.missing_classes.is_empty() {
            return Err(CheckerError::MissingClasses {
                count: self.report.missing_classes.len(),
                classes: self.report.missing_classes.clone(),
            });
        }
        if self.options.fail_on_violation && !self.report.violations.is_empty() {
            return Err(CheckerError::Policy {
                violations: self.report.violations.len(),
            });
        }
        Ok(&self.report)
    }

    /// Result of the last [`Checker::run`]; empty before.
    #[must_use]
    pub fn report(&self) -> &CheckReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forbidden_apis_test_util::{write_runtime_stubs, ClassBuilder};
    use tempfile::TempDir;

    fn stubs() -> (TempDir, Classpath) {
        let dir = TempDir::new().unwrap();
        write_runtime_stubs(dir.path());
        let classpath = Classpath::from_paths([dir.path()]);
        (dir, classpath)
    }

    fn exit_caller() -> Vec<u8> {
        ClassBuilder::new("com.example.Main")
            .source_file("Main.java")
            .method("main", "([Ljava/lang/String;)V", |code| {
                code.line(10)
                    .iconst(1)
                    .invokestatic("java.lang.System", "exit", "(I)V")
                    .line(11)
                    .return_void();
            })
            .build()
    }

    #[test]
    fn default_options_are_strict() {
        let options = CheckerOptions::default();
        assert!(!options.forbid_internal_runtime);
        assert!(options.fail_on_missing_classes);
        assert!(options.fail_on_unresolvable_signatures);
        assert!(options.fail_on_violation);
    }

    #[test]
    fn policy_failure_keeps_report() {
        let (_dir, classpath) = stubs();
        let mut checker = Checker::new(&classpath, CheckerOptions::default()).unwrap();
        checker
            .parse_signatures_string("java.lang.System#exit(int) do not exit the JVM")
            .unwrap();
        checker.add_class_bytes("Main.class", &exit_caller()).unwrap();

        let err = checker.run().unwrap_err();
        assert!(matches!(err, CheckerError::Policy { violations: 1 }));
        let report = checker.report();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].line, 10);
        assert_eq!(report.violations[0].description, "do not exit the JVM");
        assert_eq!(checker.state(), CheckerState::Ran);
    }

    #[test]
    fn lenient_violation_policy_returns_report() {
        let (_dir, classpath) = stubs();
        let options = CheckerOptions {
            fail_on_violation: false,
            ..CheckerOptions::default()
        };
        let mut checker = Checker::new(&classpath, options).unwrap();
        checker
            .parse_signatures_string("java.lang.System#exit(int)")
            .unwrap();
        checker.add_class_bytes("Main.class", &exit_caller()).unwrap();
        let report = checker.run().unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.classes_checked, 1);
    }

    #[test]
    fn operations_out_of_order_are_rejected() {
        let (_dir, classpath) = stubs();
        let mut checker = Checker::new(&classpath, CheckerOptions::default()).unwrap();
        checker.parse_signatures_string("java.lang.System#exit(int)").unwrap();
        assert!(!checker.has_no_signatures().unwrap());
        assert_eq!(checker.state(), CheckerState::SignaturesLoaded);

        let err = checker.parse_signatures_string("java.lang.String").unwrap_err();
        assert!(matches!(err, CheckerError::InvalidState { operation: "parse_signatures_string", .. }));
        assert!(checker.set_target_version("11").is_err());

        checker.run().unwrap();
        assert!(matches!(checker.run().unwrap_err(), CheckerError::InvalidState { operation: "run", .. }));
        assert!(checker.add_class_bytes("Main.class", &exit_caller()).is_err());
    }

    #[test]
    fn empty_registry_has_no_signatures_unless_internal_runtime() {
        let (_dir, classpath) = stubs();
        let mut checker = Checker::new(&classpath, CheckerOptions::default()).unwrap();
        assert!(checker.has_no_signatures().unwrap());

        let options = CheckerOptions {
            forbid_internal_runtime: true,
            ..CheckerOptions::default()
        };
        let mut checker = Checker::new(&classpath, options).unwrap();
        assert!(!checker.has_no_signatures().unwrap());
    }

    #[test]
    fn unsupported_version_is_an_environment_error() {
        let (_dir, classpath) = stubs();
        let mut checker = Checker::new(&classpath, CheckerOptions::default()).unwrap();
        let bytes = ClassBuilder::new("com.example.Future").version(99).build();
        let err = checker.add_class_bytes("Future.class", &bytes).unwrap_err();
        assert!(matches!(err, CheckerError::UnsupportedClassFormat { major: 99, .. }));
        assert_eq!(
            miette::Diagnostic::code(&err).map(|c| c.to_string()).as_deref(),
            Some("forbidden_apis::environment")
        );
    }

    #[test]
    fn corrupt_class_is_fatal() {
        let (_dir, classpath) = stubs();
        let mut checker = Checker::new(&classpath, CheckerOptions::default()).unwrap();
        let err = checker.add_class_bytes("Bad.class", b"not a class").unwrap_err();
        assert!(matches!(err, CheckerError::ClassFormat { .. }));
    }

    #[test]
    fn duplicate_classes_are_queued_once() {
        let (_dir, classpath) = stubs();
        let mut checker = Checker::new(&classpath, CheckerOptions::default()).unwrap();
        checker.add_class_bytes("a/Main.class", &exit_caller()).unwrap();
        checker.add_class_bytes("b/Main.class", &exit_caller()).unwrap();
        assert_eq!(checker.queued_len(), 1);
    }

    #[test]
    fn missing_classes_fail_after_full_scan() {
        let (_dir, classpath) = stubs();
        let mut checker = Checker::new(&classpath, CheckerOptions::default()).unwrap();
        checker.parse_signatures_string("java.lang.System#exit(int)").unwrap();
        let bytes = ClassBuilder::new("com.example.Uses")
            .method("run", "()V", |code| {
                code.new_object("com.example.Gone")
                    .pop()
                    .iconst(0)
                    .invokestatic("java.lang.System", "exit", "(I)V")
                    .return_void();
            })
            .build();
        checker.add_class_bytes("Uses.class", &bytes).unwrap();

        let err = checker.run().unwrap_err();
        assert!(matches!(err, CheckerError::MissingClasses { count: 1, .. }));
        assert_eq!(checker.report().missing_classes, vec!["com.example.Gone"]);
        assert_eq!(checker.report().violations.len(), 1);
    }
}
