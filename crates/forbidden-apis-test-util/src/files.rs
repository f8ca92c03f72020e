//! Writes assembled classes to directories and jars, plus runtime stubs.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::ZipWriter;

use crate::{internal, ClassBuilder};

/// Writes `bytes` as `<dir>/<internal name>.class`, creating parent
/// directories.
pub fn write_class(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(format!("{}.class", internal(name)));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create {}: {e}", parent.display()));
    }
    fs::write(&path, bytes).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
    path
}

/// Writes a zip archive with one `<prefix><internal name>.class` entry per
/// class. Use prefix `classes/` for a jmod-style layout.
pub fn write_jar(path: &Path, prefix: &str, classes: &[(&str, Vec<u8>)]) {
    let file = File::create(path).unwrap_or_else(|e| panic!("create {}: {e}", path.display()));
    let mut zip = ZipWriter::new(file);
    for (name, bytes) in classes {
        let entry = format!("{prefix}{}.class", internal(name));
        zip.start_file(entry.as_str(), FileOptions::default())
            .unwrap_or_else(|e| panic!("start {entry}: {e}"));
        zip.write_all(bytes)
            .unwrap_or_else(|e| panic!("write {entry}: {e}"));
    }
    zip.finish()
        .unwrap_or_else(|e| panic!("finish {}: {e}", path.display()));
}

/// Minimal runtime classes used by most checks: `Object`, `String`,
/// `System` (with `out` and `exit`), `PrintStream`, `Runnable` and
/// `LambdaMetafactory`.
#[must_use]
pub fn runtime_stubs() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        (
            "java.lang.Object",
            ClassBuilder::new("java.lang.Object")
                .no_super()
                .method("toString", "()Ljava/lang/String;", |code| {
                    code.aconst_null().areturn();
                })
                .build(),
        ),
        (
            "java.lang.String",
            ClassBuilder::new("java.lang.String")
                .method("length", "()I", |code| {
                    code.iconst(0).ireturn();
                })
                .build(),
        ),
        (
            "java.lang.System",
            ClassBuilder::new("java.lang.System")
                .field("out", "Ljava/io/PrintStream;")
                .method("exit", "(I)V", |code| {
                    code.return_void();
                })
                .method("currentTimeMillis", "()J", |code| {
                    code.lconst_0().lreturn();
                })
                .build(),
        ),
        (
            "java.io.PrintStream",
            ClassBuilder::new("java.io.PrintStream")
                .method("println", "(Ljava/lang/String;)V", |code| {
                    code.return_void();
                })
                .build(),
        ),
        (
            "java.lang.Runnable",
            ClassBuilder::new("java.lang.Runnable")
                .as_interface()
                .abstract_method("run", "()V")
                .build(),
        ),
        (
            "java.lang.invoke.LambdaMetafactory",
            ClassBuilder::new("java.lang.invoke.LambdaMetafactory").build(),
        ),
    ]
}

/// Writes [`runtime_stubs`] under `dir`.
pub fn write_runtime_stubs(dir: &Path) {
    for (name, bytes) in runtime_stubs() {
        write_class(dir, name, &bytes);
    }
}
