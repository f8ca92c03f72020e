//! Integration test: the `forbidden-apis` binary end-to-end.

use forbidden_apis_test_util::{write_class, write_runtime_stubs, ClassBuilder};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// `classes/` with one class calling `System.exit(1)` at line 10 and
    /// `runtime/` with the runtime stubs.
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        write_runtime_stubs(&dir.path().join("runtime"));
        let main = ClassBuilder::new("com.example.Main")
            .source_file("Main.java")
            .method("main", "([Ljava/lang/String;)V", |code| {
                code.line(10)
                    .iconst(1)
                    .invokestatic("java.lang.System", "exit", "(I)V")
                    .return_void();
            })
            .build();
        write_class(&dir.path().join("classes"), "com.example.Main", &main);
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_forbidden-apis"))
            .args(args)
            .current_dir(self.path())
            .env("FORBIDDEN_APIS_CONFIG_DIR", self.path().join("no-global-config"))
            .output()
            .expect("binary should start")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn violation_fails_with_exit_code_one_after_printing() {
    let ws = Workspace::new();
    let output = ws.run(&[
        "check",
        "classes",
        "--classpath",
        "runtime",
        "--signatures",
        "java.lang.System#exit(int) do not exit the JVM",
        "--format",
        "compact",
        "--report",
        "build/report.xml",
    ]);

    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains(
        "Main.java:10: com.example.Main: java.lang.System#exit(int) [do not exit the JVM]"
    ));
    let xml = std::fs::read_to_string(ws.path().join("build/report.xml")).unwrap();
    assert!(xml.contains(r#"<class name="com.example.Main" file="Main.java">"#));
    assert!(xml.contains(r#"<violation line="10" description="do not exit the JVM""#));
}

#[test]
fn no_fail_on_violation_succeeds_with_json_output() {
    let ws = Workspace::new();
    let output = ws.run(&[
        "check",
        "classes",
        "-p",
        "runtime",
        "-s",
        "java.lang.System#exit(int)",
        "--no-fail-on-violation",
        "--format",
        "json",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["classes_checked"], 1);
    assert_eq!(json["violations"][0]["line"], 10);
    assert_eq!(json["violations"][0]["class_name"], "com.example.Main");
}

#[test]
fn missing_signatures_fail_in_strict_mode_and_skip_otherwise() {
    let ws = Workspace::new();
    let strict = ws.run(&["check", "classes", "-p", "runtime"]);
    assert!(!strict.status.success());
    assert!(stderr(&strict).contains("No API signatures found"));

    let lenient = ws.run(&[
        "check",
        "classes",
        "-p",
        "runtime",
        "--allow-unresolvable-signatures",
    ]);
    assert!(lenient.status.success(), "stderr: {}", stderr(&lenient));
    assert!(stdout(&lenient).is_empty());
}

#[test]
fn missing_classes_directory_is_a_usage_error() {
    let ws = Workspace::new();
    let output = ws.run(&["check", "does-not-exist", "-s", "java.lang.System#exit(int)"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("does not exist"));
}

#[test]
fn project_config_file_is_picked_up() {
    let ws = Workspace::new();
    std::fs::write(
        ws.path().join("forbidden-apis.toml"),
        r#"
[check]
classes = "classes"
classpath = ["runtime"]
signatures = ["java.lang.System#exit(int) @ configured reason"]

[options]
fail_on_violation = false
"#,
    )
    .unwrap();

    let output = ws.run(&["check", "--format", "compact"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("[configured reason]"));
}

#[test]
fn unresolvable_signature_is_reported_with_its_source_line() {
    let ws = Workspace::new();
    let output = ws.run(&[
        "check",
        "classes",
        "-p",
        "runtime",
        "-s",
        "com.nowhere.Gone#vanish()",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("com.nowhere.Gone#vanish()"));
}

#[test]
fn list_bundled_prints_every_catalog() {
    let ws = Workspace::new();
    let output = ws.run(&["list-bundled"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for catalog in forbidden_apis_signatures::all_catalogs() {
        assert!(text.contains(catalog.name), "{}", catalog.name);
    }
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let ws = Workspace::new();
    assert!(ws.run(&["init"]).status.success());
    assert!(ws.path().join("forbidden-apis.toml").exists());
    assert!(!ws.run(&["init"]).status.success());
    assert!(ws.run(&["init", "--force"]).status.success());
}
