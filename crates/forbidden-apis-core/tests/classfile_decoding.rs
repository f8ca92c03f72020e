//! Integration test: decoding assembled class files.

use forbidden_apis_core::classfile::{parse_class, ParseMode, ReferenceKind};
use forbidden_apis_core::ClassParseError;
use forbidden_apis_test_util::{ClassBuilder, MethodSpec};

fn type_ref(name: &str) -> ReferenceKind {
    ReferenceKind::Type(name.to_string())
}

#[test]
fn instruction_stream_with_switches_and_wide_operands() {
    let bytes = ClassBuilder::new("demo.Busy")
        .source_file("Busy.java")
        .method("work", "()V", |code| {
            code.line(1)
                .iconst(1)
                .tableswitch(0, 2)
                .wide_iload(300)
                .wide_iinc(300, -2)
                .ldc_class("java.lang.String")
                .ldc_method_type("(Ljava/util/List;)V")
                .ldc2_long(5)
                .ldc_string("text")
                .line(4)
                .iconst(2)
                .iconst(3)
                .multianewarray("[[Ljava/lang/Thread;", 2)
                .invokevirtual_array("[Ljava/lang/Object;", "clone", "()Ljava/lang/Object;")
                .iconst(200)
                .newarray(10)
                .lookupswitch(&[1, 5, 9])
                .line(7)
                .instanceof("java.lang.Runnable")
                .catch_here("java.io.IOException")
                .athrow();
        })
        .build();

    let class = parse_class(&bytes, ParseMode::Full).expect("class should parse");
    assert_eq!(class.source_file.as_deref(), Some("Busy.java"));
    let code = class.methods[0].code.as_ref().expect("full mode decodes code");

    let kinds: Vec<ReferenceKind> = code.references.iter().map(|r| r.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            type_ref("java.lang.String"),
            type_ref("java.util.List"),
            type_ref("java.lang.Thread"),
            type_ref("java.lang.Object"),
            type_ref("java.lang.Runnable"),
            type_ref("java.io.IOException"),
        ]
    );

    let lines: Vec<Option<u32>> = code
        .references
        .iter()
        .map(|r| code.line_for_offset(r.offset))
        .collect();
    assert_eq!(
        lines,
        vec![Some(1), Some(1), Some(4), Some(4), Some(7), Some(7)]
    );
    assert_eq!(code.first_line(), Some(1));
}

#[test]
fn member_references_keep_symbolic_owner() {
    let bytes = ClassBuilder::new("demo.Calls")
        .method("call", "()V", |code| {
            code.getstatic("java.lang.System", "out", "Ljava/io/PrintStream;")
                .ldc_string("hi")
                .invokevirtual("java.io.PrintStream", "println", "(Ljava/lang/String;)V")
                .aconst_null()
                .invokeinterface("java.lang.Runnable", "run", "()V")
                .return_void();
        })
        .build();

    let class = parse_class(&bytes, ParseMode::Full).unwrap();
    let refs = &class.methods[0].code.as_ref().unwrap().references;
    assert_eq!(refs.len(), 3);
    assert!(matches!(
        &refs[0].kind,
        ReferenceKind::Field { owner, name, .. } if owner == "java.lang.System" && name == "out"
    ));
    assert!(matches!(
        &refs[1].kind,
        ReferenceKind::Method { owner, interface: false, .. } if owner == "java.io.PrintStream"
    ));
    assert!(matches!(
        &refs[2].kind,
        ReferenceKind::Method { owner, interface: true, .. } if owner == "java.lang.Runnable"
    ));
}

#[test]
fn method_reference_exposes_bootstrap_and_target() {
    let bytes = ClassBuilder::new("demo.Lambda")
        .method("hook", "()Ljava/lang/Runnable;", |code| {
            code.method_reference("demo.Target", "fire", "()V").areturn();
        })
        .build();

    let class = parse_class(&bytes, ParseMode::Full).unwrap();
    let refs = &class.methods[0].code.as_ref().unwrap().references;
    let owners: Vec<String> = refs
        .iter()
        .filter_map(|r| match &r.kind {
            ReferenceKind::Method { owner, name, .. } => Some(format!("{owner}#{name}")),
            _ => None,
        })
        .collect();
    assert_eq!(
        owners,
        vec![
            "java.lang.invoke.LambdaMetafactory#metafactory",
            "demo.Target#fire"
        ]
    );
}

#[test]
fn structure_mode_skips_bodies() {
    let bytes = ClassBuilder::new("demo.Plain")
        .method("m", "()V", |code| {
            code.line(3).return_void();
        })
        .build();
    let class = parse_class(&bytes, ParseMode::Structure).unwrap();
    assert!(class.methods[0].code.is_none());
    assert_eq!(class.first_line(), None);
}

#[test]
fn annotations_exceptions_and_hierarchy() {
    let bytes = ClassBuilder::new("demo.Annotated")
        .super_class("demo.Base")
        .interface("java.lang.Runnable")
        .interface("java.io.Closeable")
        .annotation("demo.Visible")
        .invisible_annotation("demo.Invisible")
        .annotation_with_element("demo.SuppressForbidden", "reason", "legacy")
        .field_with("state", "I", &["demo.Guarded"])
        .method_with(
            MethodSpec::new("close", "()V")
                .access(0x0001)
                .throws("java.io.IOException")
                .annotation("java.lang.Override"),
            |code| {
                code.return_void();
            },
        )
        .abstract_method("run", "()V")
        .build();

    let class = parse_class(&bytes, ParseMode::Full).unwrap();
    assert_eq!(class.super_class.as_deref(), Some("demo.Base"));
    assert_eq!(class.interfaces, vec!["java.lang.Runnable", "java.io.Closeable"]);
    assert_eq!(
        class.annotations,
        vec!["demo.Visible", "demo.SuppressForbidden", "demo.Invisible"]
    );
    assert_eq!(class.fields[0].annotations, vec!["demo.Guarded"]);

    let close = &class.methods[0];
    assert_eq!(close.exceptions, vec!["java.io.IOException"]);
    assert_eq!(close.annotations, vec!["java.lang.Override"]);
    assert!(class.methods[1].code.is_none());
}

#[test]
fn modified_utf8_names_round_trip() {
    let bytes = ClassBuilder::new("demo.Unicode")
        .field("caf\u{e9}", "I")
        .field("smile\u{1F600}", "I")
        .field("nul\0byte", "I")
        .build();
    let class = parse_class(&bytes, ParseMode::Structure).unwrap();
    let names: Vec<&str> = class.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["caf\u{e9}", "smile\u{1F600}", "nul\0byte"]);
}

#[test]
fn version_range_is_enforced() {
    for major in [45, 52, 69] {
        let bytes = ClassBuilder::new("demo.V").version(major).build();
        assert!(parse_class(&bytes, ParseMode::Structure).is_ok(), "major {major}");
    }
    let bytes = ClassBuilder::new("demo.V").version(70).build();
    assert!(matches!(
        parse_class(&bytes, ParseMode::Structure),
        Err(ClassParseError::UnsupportedVersion { major: 70, .. })
    ));
}

#[test]
fn interface_flag_is_decoded() {
    let bytes = ClassBuilder::new("demo.Api").as_interface().build();
    let class = parse_class(&bytes, ParseMode::Structure).unwrap();
    assert!(class.is_interface());
}
