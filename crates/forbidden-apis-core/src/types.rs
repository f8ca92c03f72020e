//! Violations and run results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One forbidden reference found in a checked class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Binary name of the class containing the reference.
    pub class_name: String,
    /// `SourceFile` attribute of that class, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Source line, or 0 when unknown.
    pub line: u32,
    /// Rule reason or a synthesized default.
    pub description: String,
    /// Enclosing element, e.g. `com.example.Main#main(java.lang.String[])`.
    pub location: String,
    /// The matched rule in Java syntax.
    pub signature: String,
}

impl Violation {
    /// `Main.java:10`, `Main.java`, or the class name when nothing better
    /// is known.
    #[must_use]
    pub fn position(&self) -> String {
        match (&self.source_file, self.line) {
            (Some(file), 0) => file.clone(),
            (Some(file), line) => format!("{file}:{line}"),
            (None, 0) => self.class_name.clone(),
            (None, line) => format!("{}:{line}", self.class_name),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Forbidden API use: {} [{}] in {} ({})",
            self.signature,
            self.description,
            self.location,
            self.position()
        )
    }
}

/// Outcome of a checker run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Violations in class-queue order, then instruction order.
    pub violations: Vec<Violation>,
    /// Number of classes scanned.
    pub classes_checked: usize,
    /// Referenced classes that could not be loaded, sorted.
    pub missing_classes: Vec<String>,
    /// Signatures dropped because their owner or member is not on the
    /// classpath.
    pub unresolved_signatures: Vec<String>,
}

impl CheckReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no violation was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Groups violations into contiguous runs per class, keeping order.
    #[must_use]
    pub fn by_class(&self) -> Vec<(&str, Option<&str>, Vec<&Violation>)> {
        let mut groups: Vec<(&str, Option<&str>, Vec<&Violation>)> = Vec::new();
        for violation in &self.violations {
            if let Some((name, _, list)) = groups.last_mut() {
                if *name == violation.class_name {
                    list.push(violation);
                    continue;
                }
            }
            groups.push((
                &violation.class_name,
                violation.source_file.as_deref(),
                vec![violation],
            ));
        }
        groups
    }

    /// Formats the report for terminal or test-failure output.
    #[must_use]
    pub fn format_report(&self) -> String {
        use std::fmt::Write;

        let mut report = String::new();
        for v in &self.violations {
            let _ = writeln!(report, "{v}");
        }
        if !self.missing_classes.is_empty() {
            let _ = writeln!(
                report,
                "Missing classes ({}): {}",
                self.missing_classes.len(),
                self.missing_classes.join(", ")
            );
        }
        if !self.unresolved_signatures.is_empty() {
            let _ = writeln!(
                report,
                "Unresolvable signatures ({}): {}",
                self.unresolved_signatures.len(),
                self.unresolved_signatures.join(", ")
            );
        }
        let _ = writeln!(
            report,
            "Scanned {} class(es), found {} forbidden API invocation(s)",
            self.classes_checked,
            self.violations.len()
        );
        report
    }
}
