//! List bundled catalogs command implementation.

use forbidden_apis_signatures::all_catalogs;

/// Runs the list-bundled command.
pub fn run() {
    println!("Bundled signature catalogs:\n");
    println!("{:<20} {:<12} Description", "Name", "Versions");
    println!("{}", "-".repeat(80));

    for catalog in all_catalogs() {
        let versions = if catalog.versioned {
            let since: Vec<String> = catalog
                .fragments()
                .iter()
                .map(|f| f.since.to_string())
                .collect();
            format!("{}+", since.join(","))
        } else {
            "any".to_string()
        };
        println!("{:<20} {:<12} {}", catalog.name, versions, catalog.description);
    }

    println!("\nVersioned catalogs need a target version, e.g.:");
    println!("  forbidden-apis check --bundled jdk-unsafe --target 11");
    println!("  forbidden-apis check --bundled jdk-deprecated-1.8");
}
