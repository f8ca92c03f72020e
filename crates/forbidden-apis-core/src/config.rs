//! Configuration file model (`forbidden-apis.toml`).

use crate::checker::CheckerOptions;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// What to check and against which signatures.
    #[serde(default)]
    pub check: CheckConfig,

    /// Failure policy switches.
    #[serde(default)]
    pub options: OptionsConfig,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Resolves relative paths in `check` against `base`, usually the
    /// directory holding the config file.
    #[must_use]
    pub fn relative_to(mut self, base: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(classes) = self.check.classes.as_mut() {
            join(classes);
        }
        if let Some(java_home) = self.check.java_home.as_mut() {
            join(java_home);
        }
        self.check.classpath.iter_mut().for_each(join);
        self.check.signatures_files.iter_mut().for_each(join);
        self
    }
}

/// The `[check]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Directory with the compiled classes to check.
    #[serde(default)]
    pub classes: Option<PathBuf>,

    /// Classpath entries (directories, jars, jmods) in lookup order.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,

    /// JDK whose runtime classes are appended to the classpath.
    #[serde(default)]
    pub java_home: Option<PathBuf>,

    /// Inline signature lines.
    #[serde(default)]
    pub signatures: Vec<String>,

    /// Signature files.
    #[serde(default)]
    pub signatures_files: Vec<PathBuf>,

    /// Bundled catalog names, e.g. `jdk-unsafe` or `jdk-deprecated-11`.
    #[serde(default)]
    pub bundled: Vec<String>,

    /// Target runtime version for version-sensitive catalogs.
    #[serde(default)]
    pub target: Option<String>,

    /// Suppression annotation names or globs.
    #[serde(default)]
    pub suppress: Vec<String>,

    /// Glob patterns (relative to `classes`) selecting class files.
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns (relative to `classes`) excluding class files.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// The `[options]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct OptionsConfig {
    /// See [`CheckerOptions::forbid_internal_runtime`].
    #[serde(default)]
    pub forbid_internal_runtime: bool,

    /// See [`CheckerOptions::fail_on_missing_classes`].
    #[serde(default = "default_true")]
    pub fail_on_missing_classes: bool,

    /// See [`CheckerOptions::fail_on_unresolvable_signatures`].
    #[serde(default = "default_true")]
    pub fail_on_unresolvable_signatures: bool,

    /// See [`CheckerOptions::fail_on_violation`].
    #[serde(default = "default_true")]
    pub fail_on_violation: bool,

    /// Treat class files newer than the checker supports as an error
    /// instead of skipping the run.
    #[serde(default)]
    pub fail_on_unsupported_format: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            forbid_internal_runtime: false,
            fail_on_missing_classes: true,
            fail_on_unresolvable_signatures: true,
            fail_on_violation: true,
            fail_on_unsupported_format: false,
        }
    }
}

impl From<OptionsConfig> for CheckerOptions {
    fn from(options: OptionsConfig) -> Self {
        Self {
            forbid_internal_runtime: options.forbid_internal_runtime,
            fail_on_missing_classes: options.fail_on_missing_classes,
            fail_on_unresolvable_signatures: options.fail_on_unresolvable_signatures,
            fail_on_violation: options.fail_on_violation,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_checker_defaults() {
        let config = Config::default();
        assert!(config.check.signatures.is_empty());
        assert_eq!(CheckerOptions::from(config.options), CheckerOptions::default());
        assert!(!config.options.fail_on_unsupported_format);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[check]
classes = "target/classes"
classpath = ["lib/guava.jar", "lib/commons.jar"]
signatures = ["java.lang.System#exit(int) @ use Runtime hooks instead"]
signatures_files = ["config/forbidden.txt"]
bundled = ["jdk-unsafe", "jdk-deprecated"]
target = "11"
suppress = ["**.SuppressForbidden"]
exclude = ["**/generated/**"]

[options]
forbid_internal_runtime = true
fail_on_missing_classes = false
"#;

        let config = Config::parse(toml).expect("Failed to parse");
        assert_eq!(config.check.classes, Some(PathBuf::from("target/classes")));
        assert_eq!(config.check.classpath.len(), 2);
        assert_eq!(config.check.target.as_deref(), Some("11"));
        assert_eq!(config.check.bundled, vec!["jdk-unsafe", "jdk-deprecated"]);

        let options = CheckerOptions::from(config.options);
        assert!(options.forbid_internal_runtime);
        assert!(!options.fail_on_missing_classes);
        assert!(options.fail_on_unresolvable_signatures);
        assert!(options.fail_on_violation);
    }

    #[test]
    fn unknown_types_are_parse_errors() {
        let err = Config::parse("[options]\nfail_on_violation = \"yes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn relative_paths_join_the_base() {
        let config = Config::parse(
            "[check]\nclasses = \"build/classes\"\nclasspath = [\"/abs/lib.jar\", \"lib/a.jar\"]\n",
        )
        .unwrap()
        .relative_to(Path::new("/project"));
        assert_eq!(config.check.classes, Some(PathBuf::from("/project/build/classes")));
        assert_eq!(config.check.classpath[0], PathBuf::from("/abs/lib.jar"));
        assert_eq!(config.check.classpath[1], PathBuf::from("/project/lib/a.jar"));
    }
}
