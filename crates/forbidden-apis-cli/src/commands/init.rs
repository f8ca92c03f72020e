//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# forbidden-apis configuration

[check]
# Directory with the compiled classes to check
classes = "target/classes"

# Libraries the classes were compiled against (directories, jars, jmods)
classpath = []

# JDK whose runtime classes are added to the classpath
# java_home = "/usr/lib/jvm/java-17"

# Target runtime version for version-sensitive bundled catalogs
target = "17"

# Bundled catalogs (see `forbidden-apis list-bundled`)
bundled = ["jdk-unsafe", "jdk-deprecated", "jdk-non-portable"]

# Inline signatures; text after the rule is the message
signatures = [
    "java.lang.System#exit(int) @ use the application shutdown hook",
]

# Signature files
# signatures_files = ["config/forbidden-signatures.txt"]

# Annotations that exempt a class, method or field
suppress = ["**.SuppressForbidden"]

# Glob patterns relative to `classes`
exclude = ["**/generated/**"]

[options]
forbid_internal_runtime = true
fail_on_missing_classes = true
fail_on_unresolvable_signatures = true
fail_on_violation = true
fail_on_unsupported_format = false
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("forbidden-apis.toml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;

    println!("Created forbidden-apis.toml");
    println!("\nNext steps:");
    println!("  1. Point [check] classes and classpath at your build output");
    println!("  2. Run: forbidden-apis check");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forbidden_apis_core::{CheckerOptions, Config};

    #[test]
    fn default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.check.suppress, vec!["**.SuppressForbidden"]);
        assert_eq!(config.check.target.as_deref(), Some("17"));
        assert!(CheckerOptions::from(config.options).forbid_internal_runtime);
    }

    #[test]
    fn default_bundled_catalogs_exist() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        for name in &config.check.bundled {
            assert!(
                forbidden_apis_signatures::resolve(name, config.check.target.as_deref()).is_ok(),
                "{name}"
            );
        }
    }
}
