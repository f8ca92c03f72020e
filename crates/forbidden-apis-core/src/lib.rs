//! # forbidden-apis-core
//!
//! Checks compiled JVM class files against a set of forbidden API
//! signatures.
//!
//! The crate is organised leaf-first:
//!
//! - [`classfile`] decodes class files into [`ClassMetadata`]
//! - [`signature`] holds the rule model and the signature text grammar
//! - [`Classpath`] / [`ClasspathResolver`] load metadata on demand
//! - [`SignatureRegistry`] collects rules and freezes them into a
//!   [`ResolvedSignatureSet`]
//! - [`Scanner`] matches every reference of a class against the rules
//! - [`Checker`] drives the whole run and applies the failure policy
//!
//! ## Example
//!
//! ```ignore
//! use forbidden_apis_core::{Checker, CheckerOptions, Classpath};
//!
//! let classpath = Classpath::from_paths(["target/classes", "lib/dep.jar"]);
//! let mut checker = Checker::new(&classpath, CheckerOptions::default())?;
//! checker.parse_signatures_string("java.lang.System#exit(int) do not exit the JVM")?;
//! checker.add_class_to_check("target/classes/com/example/Main.class")?;
//! let report = checker.run()?;
//! print!("{}", report.format_report());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classfile;
mod checker;
mod classpath;
mod config;
mod registry;
mod scanner;
pub mod signature;
mod suppression;
mod types;

pub use checker::{Checker, CheckerError, CheckerOptions, CheckerState};
pub use classfile::{ClassMetadata, ClassParseError};
pub use classpath::{
    split_path_list, Ancestors, Classpath, ClasspathEntry, ClasspathError, ClasspathResolver,
    Lineage, MemberQuery, MemberResolution,
};
pub use config::{CheckConfig, Config, ConfigError, OptionsConfig};
pub use registry::{RegistryError, ResolvedSignatureSet, SignatureRegistry};
pub use scanner::{ClassScan, Scanner};
pub use suppression::SuppressionSet;
pub use types::{CheckReport, Violation};
