//! XML report writer.

use anyhow::{Context, Result};
use forbidden_apis_core::CheckReport;
use std::fmt::Write as _;
use std::path::Path;

/// Serializes violations as
/// `<forbidden-apis><class><violation/></class></forbidden-apis>`, one
/// `<class>` per contiguous run of violations.
#[must_use]
pub fn to_xml(report: &CheckReport) -> String {
    let mut xml = String::from("<forbidden-apis>\n");
    for (class, file, violations) in report.by_class() {
        let _ = writeln!(
            xml,
            "  <class name=\"{}\" file=\"{}\">",
            escape(class),
            escape(file.unwrap_or_default())
        );
        for v in violations {
            let _ = writeln!(
                xml,
                "    <violation line=\"{}\" description=\"{}\" location=\"{}\" />",
                v.line,
                escape(&v.description),
                escape(&v.location)
            );
        }
        xml.push_str("  </class>\n");
    }
    xml.push_str("</forbidden-apis>\n");
    xml
}

/// Writes [`to_xml`] to `path`, creating parent directories.
pub fn write(path: &Path, report: &CheckReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, to_xml(report))
        .with_context(|| format!("Failed to write report {}", path.display()))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use forbidden_apis_core::Violation;

    fn violation(class: &str, file: Option<&str>, line: u32, description: &str) -> Violation {
        Violation {
            class_name: class.to_string(),
            source_file: file.map(str::to_string),
            line,
            description: description.to_string(),
            location: format!("{class}#main(java.lang.String[])"),
            signature: "java.lang.System#exit(int)".to_string(),
        }
    }

    #[test]
    fn report_groups_contiguous_runs() {
        let report = CheckReport {
            violations: vec![
                violation("com.example.Main", Some("Main.java"), 10, "do not exit the JVM"),
                violation("com.example.Main", Some("Main.java"), 14, "do not exit the JVM"),
                violation("com.example.Tool", None, 0, "use <Runtime> & \"hooks\""),
            ],
            classes_checked: 2,
            ..CheckReport::default()
        };

        insta::assert_snapshot!(to_xml(&report).trim_end(), @r#"
        <forbidden-apis>
          <class name="com.example.Main" file="Main.java">
            <violation line="10" description="do not exit the JVM" location="com.example.Main#main(java.lang.String[])" />
            <violation line="14" description="do not exit the JVM" location="com.example.Main#main(java.lang.String[])" />
          </class>
          <class name="com.example.Tool" file="">
            <violation line="0" description="use &lt;Runtime&gt; &amp; &quot;hooks&quot;" location="com.example.Tool#main(java.lang.String[])" />
          </class>
        </forbidden-apis>
        "#);
    }

    #[test]
    fn empty_report_is_an_empty_root() {
        assert_eq!(to_xml(&CheckReport::default()), "<forbidden-apis>\n</forbidden-apis>\n");
    }

    #[test]
    fn write_creates_parent_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("reports/forbidden-apis-report.xml");
        write(&path, &CheckReport::default()).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().starts_with("<forbidden-apis>"));
    }
}
