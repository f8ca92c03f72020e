//! Shared output formatting for check results.

use anyhow::Result;
use forbidden_apis_core::CheckReport;

use crate::OutputFormat;

/// Print check results in the specified format.
pub fn print(report: &CheckReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(report),
        OutputFormat::Json => return print_json(report),
        OutputFormat::Compact => print_compact(report),
        OutputFormat::Xml => print!("{}", super::report::to_xml(report)),
    }
    Ok(())
}

fn print_text(report: &CheckReport) {
    for (class, _, violations) in report.by_class() {
        println!("\x1b[1m{class}\x1b[0m");
        for violation in violations {
            println!(
                "  \x1b[31merror\x1b[0m {} [{}]",
                violation.signature, violation.description
            );
            println!("    --> {} in {}", violation.position(), violation.location);
        }
        println!();
    }

    if !report.missing_classes.is_empty() {
        println!(
            "\x1b[33mwarning\x1b[0m {} referenced class(es) not found: {}",
            report.missing_classes.len(),
            report.missing_classes.join(", ")
        );
    }
    if !report.unresolved_signatures.is_empty() {
        println!(
            "\x1b[33mwarning\x1b[0m {} signature(s) could not be resolved: {}",
            report.unresolved_signatures.len(),
            report.unresolved_signatures.join(", ")
        );
    }

    let summary_color = if report.is_clean() {
        "\x1b[32m"
    } else {
        "\x1b[31m"
    };
    println!(
        "{}Scanned {} class(es), found {} forbidden API invocation(s)\x1b[0m",
        summary_color,
        report.classes_checked,
        report.violations.len()
    );
}

fn print_json(report: &CheckReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

fn print_compact(report: &CheckReport) {
    for violation in &report.violations {
        println!(
            "{}: {}: {} [{}]",
            violation.position(),
            violation.class_name,
            violation.signature,
            violation.description,
        );
    }
}
