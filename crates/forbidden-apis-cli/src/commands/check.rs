//! Check command implementation.

use anyhow::{bail, Context, Result};
use forbidden_apis_core::{split_path_list, Checker, CheckerError, Classpath, Config};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Default file name for `--report` without a value.
const DEFAULT_REPORT_NAME: &str = "forbidden-apis-report.xml";

/// Arguments of `forbidden-apis check`. Flags extend or override the
/// configuration file.
#[derive(Debug, clap::Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct CheckArgs {
    /// Directory with compiled classes (default: `[check] classes`, else current directory)
    pub path: Option<PathBuf>,

    /// Classpath entries; repeatable, each may be a path list
    #[arg(short = 'p', long = "classpath")]
    pub classpath: Vec<String>,

    /// Inline signature line (repeatable)
    #[arg(short, long = "signatures")]
    pub signatures: Vec<String>,

    /// Signatures file (repeatable)
    #[arg(long = "signatures-file")]
    pub signatures_files: Vec<PathBuf>,

    /// Bundled catalog name (repeatable), e.g. `jdk-unsafe`
    #[arg(short, long)]
    pub bundled: Vec<String>,

    /// Target runtime version for version-sensitive catalogs, e.g. `11` or `1.8`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Suppression annotation name or glob (repeatable)
    #[arg(long)]
    pub suppress: Vec<String>,

    /// Include glob relative to the classes directory (repeatable)
    #[arg(short, long)]
    pub include: Vec<String>,

    /// Exclude glob relative to the classes directory (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Also write the XML report to this file
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_REPORT_NAME)]
    pub report: Option<PathBuf>,

    /// JDK whose runtime classes are appended to the classpath
    #[arg(long)]
    pub java_home: Option<PathBuf>,

    /// Forbid non-public runtime classes such as `sun.misc.*`
    #[arg(long)]
    pub internal_runtime_forbidden: bool,

    /// Do not fail when referenced classes are missing
    #[arg(long)]
    pub allow_missing_classes: bool,

    /// Drop signatures that do not resolve instead of failing
    #[arg(long)]
    pub allow_unresolvable_signatures: bool,

    /// Report violations without failing
    #[arg(long)]
    pub no_fail_on_violation: bool,

    /// Fail when a class file is newer than this tool supports
    #[arg(long)]
    pub fail_on_unsupported_format: bool,
}

/// Runs the check command.
pub fn run(args: CheckArgs, source: &ConfigSource) -> Result<()> {
    let config = load_config(source)?;
    let check = config.check;

    let classes_dir = args
        .path
        .or(check.classes)
        .unwrap_or_else(|| PathBuf::from("."));
    if !classes_dir.is_dir() {
        bail!(
            "Classes directory {} does not exist; pass it as PATH or set [check] classes",
            classes_dir.display()
        );
    }

    let mut options = config.options;
    options.forbid_internal_runtime |= args.internal_runtime_forbidden;
    options.fail_on_missing_classes &= !args.allow_missing_classes;
    options.fail_on_unresolvable_signatures &= !args.allow_unresolvable_signatures;
    options.fail_on_violation &= !args.no_fail_on_violation;
    options.fail_on_unsupported_format |= args.fail_on_unsupported_format;

    let mut classpath = Classpath::new();
    for entry in &check.classpath {
        classpath.push(entry);
    }
    for list in &args.classpath {
        for entry in split_path_list(list) {
            classpath.push(entry);
        }
    }
    if let Some(java_home) = args.java_home.or(check.java_home) {
        let added = classpath
            .add_java_home(&java_home)
            .with_context(|| format!("Invalid java home {}", java_home.display()))?;
        tracing::info!("Added {added} runtime container(s) from {}", java_home.display());
    }
    classpath.push(&classes_dir);

    let mut checker = Checker::new(&classpath, options.into()).map_err(diagnostic)?;

    for pattern in check.suppress.iter().chain(&args.suppress) {
        checker.add_suppress_annotation(pattern).map_err(diagnostic)?;
    }
    let target = args.target.or(check.target);
    let bundled: Vec<String> = check.bundled.into_iter().chain(args.bundled).collect();
    match &target {
        Some(version) => checker.set_target_version(version.as_str()).map_err(diagnostic)?,
        None if !bundled.is_empty() => tracing::warn!(
            "No target version set; version-sensitive bundled catalogs need the version in their name"
        ),
        None => {}
    }

    let inline: Vec<String> = check.signatures.into_iter().chain(args.signatures).collect();
    if !inline.is_empty() {
        tracing::info!("Reading inline API signatures...");
        checker
            .parse_signatures_string(&inline.join("\n"))
            .map_err(diagnostic)?;
    }
    for name in &bundled {
        checker
            .parse_bundled_signatures(name, None)
            .map_err(diagnostic)?;
    }
    for file in check.signatures_files.iter().chain(&args.signatures_files) {
        checker.parse_signatures_file(file).map_err(diagnostic)?;
    }

    if checker.has_no_signatures().map_err(diagnostic)? {
        if options.fail_on_unresolvable_signatures {
            bail!("No API signatures found; use --signatures, --signatures-file and/or --bundled to define them");
        }
        tracing::info!("Skipping execution because no API signatures are available.");
        return Ok(());
    }

    let include: Vec<String> = check.include.into_iter().chain(args.include).collect();
    let exclude: Vec<String> = check.exclude.into_iter().chain(args.exclude).collect();
    let files = collect_class_files(&classes_dir, &include, &exclude)?;
    tracing::info!("Loading {} class(es) to check...", files.len());
    for file in &files {
        match checker.add_class_to_check(file) {
            Ok(()) => {}
            Err(err @ CheckerError::UnsupportedClassFormat { .. }) if !options.fail_on_unsupported_format => {
                tracing::warn!("{err}; skipping the check");
                return Ok(());
            }
            Err(err) => return Err(diagnostic(err)),
        }
    }

    let outcome = checker.run().map(|_| ());
    let report = checker.report();

    super::output::print(report, args.format)?;
    if let Some(path) = &args.report {
        super::report::write(path, report)?;
        tracing::info!("Wrote XML report to {}", path.display());
    }

    match outcome {
        Ok(()) => Ok(()),
        Err(err @ (CheckerError::Policy { .. } | CheckerError::MissingClasses { .. })) => {
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(1);
        }
        Err(err) => Err(diagnostic(err)),
    }
}

fn load_config(source: &ConfigSource) -> Result<Config> {
    let Some(path) = source.path() else {
        return Ok(Config::default());
    };
    if source.is_global() {
        tracing::info!("Using global config: {}", path.display());
    }
    let config = Config::from_file(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.relative_to(base))
}

/// Renders a checker error with its diagnostic code and help.
fn diagnostic(err: CheckerError) -> anyhow::Error {
    anyhow::anyhow!("{:?}", miette::Report::new(err))
}

/// Finds `*.class` files under `root`, filtered by globs relative to it.
/// An empty `include` selects every class file. Results are sorted.
fn collect_class_files(root: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let compile = |patterns: &[String]| -> Result<Vec<Pattern>> {
        patterns
            .iter()
            .map(|p| Pattern::new(p).with_context(|| format!("Invalid glob pattern: {p}")))
            .collect()
    };
    let include = compile(include)?;
    let exclude = compile(exclude)?;
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "class") {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative = relative.to_string_lossy().replace('\\', "/");
        let included = include.is_empty() || include.iter().any(|p| p.matches_with(&relative, options));
        if !included || exclude.iter().any(|p| p.matches_with(&relative, options)) {
            tracing::debug!("Excluding: {relative}");
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}
