//! Matches the references of one class against a [`ResolvedSignatureSet`].
//!
//! A class is visited in a fixed order: header (superclass, interfaces,
//! annotations), fields, then methods with their bodies in instruction
//! order. Every reference yields at most one violation.

use crate::classfile::descriptor::{params_part, referenced_classes};
use crate::classfile::{ClassMetadata, MethodInfo, ReferenceKind};
use crate::classpath::{ClasspathError, ClasspathResolver, MemberQuery, MemberResolution};
use crate::registry::ResolvedSignatureSet;
use crate::signature::{Signature, SignatureKind};
use crate::suppression::SuppressionSet;
use crate::types::Violation;

use std::collections::BTreeSet;
use std::iter;
use tracing::debug;

/// Runtime packages that are not part of the public platform API.
const INTERNAL_RUNTIME_PREFIXES: &[&str] = &["sun.", "com.sun.", "jdk.internal.", "com.oracle."];

/// Exported `com.sun` packages carved out of [`INTERNAL_RUNTIME_PREFIXES`].
const PUBLIC_RUNTIME_PREFIXES: &[&str] = &[
    "com.sun.management.",
    "com.sun.net.httpserver.",
    "com.sun.jdi.",
    "com.sun.source.",
    "com.sun.tools.attach.",
    "com.sun.nio.sctp.",
    "com.sun.security.auth.",
    "com.sun.security.jgss.",
    "com.sun.jarsigner.",
    "com.sun.javadoc.",
];

/// Whether `name` lives in a non-public runtime package.
#[must_use]
pub fn is_internal_runtime_class(name: &str) -> bool {
    INTERNAL_RUNTIME_PREFIXES.iter().any(|p| name.starts_with(p))
        && !PUBLIC_RUNTIME_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Result of scanning one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassScan {
    /// Violations in discovery order.
    pub violations: Vec<Violation>,
    /// Referenced classes that could not be loaded.
    pub missing_classes: BTreeSet<String>,
}

enum Hit<'r> {
    Rule {
        rule: &'r Signature,
        class: String,
        on_method: bool,
    },
    InternalRuntime {
        class: String,
    },
}

impl<'r> Hit<'r> {
    fn rule(rule: &'r Signature, class: &str, on_method: bool) -> Self {
        Self::Rule {
            rule,
            class: class.to_string(),
            on_method,
        }
    }

    /// `(description, signature)`.
    fn describe(&self) -> (String, String) {
        match self {
            Self::Rule {
                rule,
                class,
                on_method,
            } => {
                let description = if rule.reason().is_empty() {
                    match rule.kind() {
                        SignatureKind::Class => format!("Forbidden class/interface use: {class}"),
                        SignatureKind::Method => format!("Forbidden method invocation: {rule}"),
                        SignatureKind::Field if *on_method => {
                            format!("Forbidden method invocation: {rule}")
                        }
                        SignatureKind::Field => format!("Forbidden field access: {rule}"),
                        SignatureKind::Annotated => {
                            format!("Forbidden use of element annotated with {rule}")
                        }
                    }
                } else {
                    rule.reason().to_string()
                };
                (description, rule.to_string())
            }
            Self::InternalRuntime { class } => (
                format!("Forbidden class/interface use: {class} [non-public internal runtime class]"),
                class.clone(),
            ),
        }
    }
}

/// Scans classes against a frozen rule set.
///
/// Holds only shared references, so one scanner can serve many threads.
pub struct Scanner<'a> {
    rules: &'a ResolvedSignatureSet,
    resolver: &'a ClasspathResolver,
    suppression: &'a SuppressionSet,
    forbid_internal_runtime: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner.
    #[must_use]
    pub fn new(
        rules: &'a ResolvedSignatureSet,
        resolver: &'a ClasspathResolver,
        suppression: &'a SuppressionSet,
        forbid_internal_runtime: bool,
    ) -> Self {
        Self {
            rules,
            resolver,
            suppression,
            forbid_internal_runtime,
        }
    }

    /// Scans one class parsed in full mode.
    ///
    /// # Errors
    ///
    /// Classpath I/O failures and malformed classes met while resolving.
    pub fn scan(&self, class: &ClassMetadata) -> Result<ClassScan, ClasspathError> {
        let mut visit = ClassVisit {
            scanner: self,
            class,
            class_line: class.first_line().unwrap_or(0),
            out: ClassScan::default(),
        };
        if self.suppression.is_suppressed(&class.annotations) {
            debug!("Skipping suppressed class {}", class.name);
            return Ok(visit.out);
        }

        visit.scan_header()?;
        visit.scan_fields()?;
        visit.scan_methods()?;
        debug!(
            "Scanned {}: {} violation(s)",
            class.name,
            visit.out.violations.len()
        );
        Ok(visit.out)
    }

    fn class_rule(&self, name: &str) -> Option<&'a Signature> {
        self.rules.class_rule(name).or_else(|| {
            self.rules
                .glob_rules()
                .iter()
                .find(|r| r.kind() == SignatureKind::Class && r.owner().matches(name))
        })
    }

    fn internal_runtime(&self, name: &str) -> Option<Hit<'a>> {
        (self.forbid_internal_runtime && is_internal_runtime_class(name)).then(|| {
            Hit::InternalRuntime {
                class: name.to_string(),
            }
        })
    }

    fn match_type(
        &self,
        name: &str,
        missing: &mut BTreeSet<String>,
    ) -> Result<Option<Hit<'a>>, ClasspathError> {
        let Some(class) = self.resolver.load(name)? else {
            missing.insert(name.to_string());
            return Ok(None);
        };
        if let Some(rule) = self.class_rule(name) {
            return Ok(Some(Hit::rule(rule, name, false)));
        }
        if let Some(rule) = self.rules.annotation_rule(&class.annotations) {
            return Ok(Some(Hit::rule(rule, name, false)));
        }
        Ok(self.internal_runtime(name))
    }

    /// Exact or glob FIELD rule naming `owner#name`.
    fn field_rule(&self, owner: &str, name: &str) -> Option<&'a Signature> {
        self.rules
            .member_rule(owner, name)
            .filter(|r| r.kind() == SignatureKind::Field)
            .or_else(|| {
                self.rules.glob_rules().iter().find(|r| {
                    r.kind() == SignatureKind::Field
                        && r.member() == Some(name)
                        && r.owner().matches(owner)
                })
            })
    }

    /// `descriptor` is `Some` for methods and `None` for fields.
    fn match_member(
        &self,
        owner: &str,
        name: &str,
        descriptor: Option<&str>,
        missing: &mut BTreeSet<String>,
    ) -> Result<Option<Hit<'a>>, ClasspathError> {
        let query = match descriptor {
            Some(descriptor) => MemberQuery::Method { name, descriptor },
            None => MemberQuery::Field { name },
        };
        let (lineage, declarer) = match self.resolver.resolve_member(owner, query)? {
            MemberResolution::Resolved {
                lineage,
                declarer,
                missing: absent,
            } => {
                missing.extend(absent);
                (lineage, declarer)
            }
            MemberResolution::Unresolvable { class } => {
                missing.insert(class);
                return Ok(None);
            }
        };
        let on_method = descriptor.is_some();
        let params = descriptor.map(params_part);
        let rules = self.rules;
        let hit = |rule: &'a Signature, class: &str| -> Result<Option<Hit<'a>>, ClasspathError> {
            Ok(Some(Hit::rule(rule, class, on_method)))
        };

        if let Some(params) = params {
            for class in &lineage {
                if let Some(rule) = rules.method_rule(&class.name, name, params) {
                    return hit(rule, &class.name);
                }
            }
        }
        for class in &lineage {
            if let Some(rule) = rules.member_rule(&class.name, name) {
                return hit(rule, &class.name);
            }
        }

        let declarer = declarer.and_then(|i| lineage.get(i));
        let owners = || iter::once(owner).chain(declarer.map(|c| c.name.as_str()));
        for candidate in owners() {
            if let Some(rule) = rules.class_rule(candidate) {
                return hit(rule, candidate);
            }
        }

        for rule in rules.glob_rules() {
            let matched = match rule.kind() {
                SignatureKind::Class => owners().find(|n| rule.owner().matches(n)),
                SignatureKind::Method
                    if rule.member() == Some(name) && params.is_some() && rule.params() == params =>
                {
                    lineage
                        .iter()
                        .map(|c| c.name.as_str())
                        .find(|n| rule.owner().matches(n))
                }
                SignatureKind::Field if rule.member() == Some(name) => lineage
                    .iter()
                    .map(|c| c.name.as_str())
                    .find(|n| rule.owner().matches(n)),
                _ => None,
            };
            if let Some(class) = matched {
                return hit(rule, class);
            }
        }

        let Some(holder) = declarer.or_else(|| lineage.first()) else {
            return Ok(None);
        };
        let member_annotations = declarer.and_then(|c| match descriptor {
            Some(descriptor) => c.method(name, descriptor).map(|m| &m.annotations),
            None => c.field(name).map(|f| &f.annotations),
        });
        let annotated = member_annotations
            .and_then(|a| rules.annotation_rule(a))
            .or_else(|| rules.annotation_rule(&holder.annotations));
        if let Some(rule) = annotated {
            return hit(rule, &holder.name);
        }

        Ok(self.internal_runtime(&holder.name))
    }
}

struct ClassVisit<'s, 'a> {
    scanner: &'s Scanner<'a>,
    class: &'s ClassMetadata,
    class_line: u32,
    out: ClassScan,
}

impl ClassVisit<'_, '_> {
    fn report(&mut self, hit: &Hit<'_>, location: &str, line: u32) {
        let (description, signature) = hit.describe();
        self.out.violations.push(Violation {
            class_name: self.class.name.clone(),
            source_file: self.class.source_file.clone(),
            line,
            description,
            location: location.to_string(),
            signature,
        });
    }

    fn check_type(&mut self, name: &str, location: &str, line: u32) -> Result<(), ClasspathError> {
        if let Some(hit) = self.scanner.match_type(name, &mut self.out.missing_classes)? {
            self.report(&hit, location, line);
        }
        Ok(())
    }

    fn check_descriptor(
        &mut self,
        descriptor: &str,
        location: &str,
        line: u32,
    ) -> Result<(), ClasspathError> {
        let types = referenced_classes(descriptor).map_err(|source| ClasspathError::ClassFile {
            origin: self.class.name.clone(),
            source,
        })?;
        for name in &types {
            self.check_type(name, location, line)?;
        }
        Ok(())
    }

    fn scan_header(&mut self) -> Result<(), ClasspathError> {
        let class = self.class;
        let line = self.class_line;
        let names = class
            .super_class
            .iter()
            .chain(&class.interfaces)
            .chain(&class.annotations);
        for name in names {
            self.check_type(name, &class.name, line)?;
        }
        Ok(())
    }

    fn scan_fields(&mut self) -> Result<(), ClasspathError> {
        let class = self.class;
        let line = self.class_line;
        for field in &class.fields {
            if self.scanner.suppression.is_suppressed(&field.annotations) {
                debug!("Skipping suppressed field {}#{}", class.name, field.name);
                continue;
            }
            let location = format!("{}#{}", class.name, field.name);
            if let Some(rule) = self.scanner.field_rule(&class.name, &field.name) {
                self.report(&Hit::rule(rule, &class.name, false), &location, line);
            }
            self.check_descriptor(&field.descriptor, &location, line)?;
            for annotation in &field.annotations {
                self.check_type(annotation, &location, line)?;
            }
        }
        Ok(())
    }

    fn scan_methods(&mut self) -> Result<(), ClasspathError> {
        let class = self.class;
        for method in &class.methods {
            if self.scanner.suppression.is_suppressed(&method.annotations) {
                debug!(
                    "Skipping suppressed method {}#{}",
                    class.name,
                    method.display_signature()
                );
                continue;
            }
            self.scan_method(method)?;
        }
        Ok(())
    }

    fn scan_method(&mut self, method: &MethodInfo) -> Result<(), ClasspathError> {
        let location = format!("{}#{}", self.class.name, method.display_signature());
        let method_line = method.first_line().unwrap_or(self.class_line);

        self.check_descriptor(&method.descriptor, &location, method_line)?;
        for name in method.exceptions.iter().chain(&method.annotations) {
            self.check_type(name, &location, method_line)?;
        }

        let Some(code) = &method.code else {
            return Ok(());
        };
        for reference in &code.references {
            let line = code.line_for_offset(reference.offset).unwrap_or(0);
            let missing = &mut self.out.missing_classes;
            let hit = match &reference.kind {
                ReferenceKind::Type(name) => self.scanner.match_type(name, missing)?,
                ReferenceKind::Field { owner, name, .. } => {
                    self.scanner.match_member(owner, name, None, missing)?
                }
                ReferenceKind::Method {
                    owner,
                    name,
                    descriptor,
                    ..
                } => self
                    .scanner
                    .match_member(owner, name, Some(descriptor), missing)?,
            };
            if let Some(hit) = hit {
                self.report(&hit, &location, line);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{parse_class, ParseMode};
    use crate::classpath::Classpath;
    use crate::registry::SignatureRegistry;
    use forbidden_apis_test_util::{write_class, ClassBuilder, MethodSpec};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        resolver: ClasspathResolver,
    }

    impl Fixture {
        fn new(classes: &[Vec<u8>]) -> Self {
            let dir = TempDir::new().unwrap();
            write_class(
                dir.path(),
                "java.lang.Object",
                &ClassBuilder::new("java.lang.Object").no_super().build(),
            );
            for bytes in classes {
                let name = parse_class(bytes, ParseMode::Structure).unwrap().name;
                write_class(dir.path(), &name, bytes);
            }
            let resolver = ClasspathResolver::open(&Classpath::from_paths([dir.path()])).unwrap();
            Self {
                _dir: dir,
                resolver,
            }
        }

        fn scan(&self, signatures: &str, class: &[u8], internal: bool) -> ClassScan {
            self.scan_with(signatures, class, internal, &SuppressionSet::new())
        }

        fn scan_with(
            &self,
            signatures: &str,
            class: &[u8],
            internal: bool,
            suppression: &SuppressionSet,
        ) -> ClassScan {
            let mut registry = SignatureRegistry::new();
            registry.parse_text("test", signatures).unwrap();
            let rules = registry.freeze(&self.resolver, true).unwrap();
            let class = parse_class(class, ParseMode::Full).unwrap();
            Scanner::new(&rules, &self.resolver, suppression, internal)
                .scan(&class)
                .unwrap()
        }
    }

    fn banned() -> Vec<u8> {
        ClassBuilder::new("bad.Banned")
            .method("<init>", "()V", |code| {
                code.return_void();
            })
            .build()
    }

    #[test]
    fn class_rule_matches_every_type_position() {
        let fixture = Fixture::new(&[banned()]);
        let cases: Vec<(&str, Vec<u8>)> = vec![
            (
                "field type",
                ClassBuilder::new("app.A").field("f", "Lbad/Banned;").build(),
            ),
            (
                "return type",
                ClassBuilder::new("app.A")
                    .method("get", "()Lbad/Banned;", |code| {
                        code.aconst_null().areturn();
                    })
                    .build(),
            ),
            (
                "parameter type",
                ClassBuilder::new("app.A")
                    .method("take", "(Lbad/Banned;)V", |code| {
                        code.return_void();
                    })
                    .build(),
            ),
            (
                "cast target",
                ClassBuilder::new("app.A")
                    .method("cast", "(Ljava/lang/Object;)V", |code| {
                        code.line(7).aload(1).checkcast("bad.Banned").pop().return_void();
                    })
                    .build(),
            ),
            (
                "new target",
                ClassBuilder::new("app.A")
                    .method("make", "()V", |code| {
                        code.line(9).new_object("bad.Banned").pop().return_void();
                    })
                    .build(),
            ),
        ];

        for (case, bytes) in cases {
            let scan = fixture.scan("bad.Banned", &bytes, false);
            assert_eq!(scan.violations.len(), 1, "{case}: {:?}", scan.violations);
            assert_eq!(
                scan.violations[0].description,
                "Forbidden class/interface use: bad.Banned",
                "{case}"
            );
        }
    }

    #[test]
    fn instruction_line_is_reported() {
        let fixture = Fixture::new(&[banned()]);
        let class = ClassBuilder::new("app.A")
            .source_file("A.java")
            .method("make", "()V", |code| {
                code.line(3)
                    .iconst(0)
                    .pop()
                    .line(9)
                    .new_object("bad.Banned")
                    .pop()
                    .return_void();
            })
            .build();
        let scan = fixture.scan("bad.Banned", &class, false);
        let v = &scan.violations[0];
        assert_eq!(v.line, 9);
        assert_eq!(v.location, "app.A#make()");
        assert_eq!(v.source_file.as_deref(), Some("A.java"));
    }

    #[test]
    fn one_violation_per_reference_exact_rule_wins() {
        let fixture = Fixture::new(&[ClassBuilder::new("bad.Api")
            .method("run", "(I)V", |code| {
                code.return_void();
            })
            .build()]);
        let class = ClassBuilder::new("app.A")
            .method("go", "()V", |code| {
                code.iconst(1)
                    .invokestatic("bad.Api", "run", "(I)V")
                    .return_void();
            })
            .build();
        let scan = fixture.scan("bad.Api class reason\nbad.Api#run(int) method reason\n", &class, false);
        assert_eq!(scan.violations.len(), 1);
        assert_eq!(scan.violations[0].description, "method reason");
        assert_eq!(scan.violations[0].signature, "bad.Api#run(int)");
    }

    #[test]
    fn default_descriptions() {
        let fixture = Fixture::new(&[ClassBuilder::new("bad.Api")
            .field("counter", "I")
            .method("run", "()V", |code| {
                code.return_void();
            })
            .build()]);
        let class = ClassBuilder::new("app.A")
            .method("go", "()V", |code| {
                code.invokestatic("bad.Api", "run", "()V")
                    .getstatic("bad.Api", "counter", "I")
                    .pop()
                    .return_void();
            })
            .build();
        let scan = fixture.scan("bad.Api#run()\nbad.Api#counter\n", &class, false);
        let descriptions: Vec<_> = scan.violations.iter().map(|v| v.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "Forbidden method invocation: bad.Api#run()",
                "Forbidden field access: bad.Api#counter"
            ]
        );
    }

    #[test]
    fn field_declaration_matches_field_rules() {
        let declaring = ClassBuilder::new("app.A")
            .source_file("A.java")
            .field("secret", "I")
            .field("open", "I")
            .method("go", "()V", |code| {
                code.line(12).return_void();
            })
            .build();
        let fixture = Fixture::new(&[declaring.clone()]);

        let scan = fixture.scan("app.A#secret keep it private", &declaring, false);
        assert_eq!(scan.violations.len(), 1);
        let v = &scan.violations[0];
        assert_eq!(v.location, "app.A#secret");
        assert_eq!(v.description, "keep it private");
        assert_eq!(v.line, 12);

        let scan = fixture.scan("app.*#secret", &declaring, false);
        assert_eq!(scan.violations.len(), 1);
        assert_eq!(scan.violations[0].description, "Forbidden field access: app.*#secret");
    }

    #[test]
    fn missing_interface_does_not_hide_declared_members() {
        let fixture = Fixture::new(&[ClassBuilder::new("lib.Api")
            .interface("other.MissingIface")
            .method("run", "()V", |code| {
                code.return_void();
            })
            .build()]);
        let class = ClassBuilder::new("app.Main")
            .method("go", "()V", |code| {
                code.line(7).invokestatic("lib.Api", "run", "()V").return_void();
            })
            .build();

        let scan = fixture.scan("lib.Api#run() banned", &class, false);
        assert_eq!(scan.violations.len(), 1);
        assert_eq!(scan.violations[0].line, 7);
        assert!(scan.missing_classes.is_empty());
    }

    #[test]
    fn any_overload_rule_matches_methods() {
        let fixture = Fixture::new(&[ClassBuilder::new("bad.Api")
            .method("run", "()V", |code| {
                code.return_void();
            })
            .method("run", "(I)V", |code| {
                code.return_void();
            })
            .build()]);
        let class = ClassBuilder::new("app.A")
            .method("go", "()V", |code| {
                code.invokestatic("bad.Api", "run", "()V")
                    .iconst(2)
                    .invokestatic("bad.Api", "run", "(I)V")
                    .return_void();
            })
            .build();
        let scan = fixture.scan("bad.Api#run\n", &class, false);
        assert_eq!(scan.violations.len(), 2);
        assert_eq!(
            scan.violations[0].description,
            "Forbidden method invocation: bad.Api#run"
        );
    }

    #[test]
    fn annotated_members_are_forbidden() {
        let fixture = Fixture::new(&[
            ClassBuilder::new("lib.Internal").as_annotation().build(),
            ClassBuilder::new("lib.Api")
                .method_with(
                    MethodSpec::new("hidden", "()V").annotation("lib.Internal"),
                    |code| {
                        code.return_void();
                    },
                )
                .method("open", "()V", |code| {
                    code.return_void();
                })
                .build(),
        ]);
        let class = ClassBuilder::new("app.A")
            .method("go", "()V", |code| {
                code.invokestatic("lib.Api", "open", "()V")
                    .invokestatic("lib.Api", "hidden", "()V")
                    .return_void();
            })
            .build();
        let scan = fixture.scan("@lib.Internal\n", &class, false);
        assert_eq!(scan.violations.len(), 1);
        assert_eq!(
            scan.violations[0].description,
            "Forbidden use of element annotated with @lib.Internal"
        );
    }

    #[test]
    fn internal_runtime_classes_need_the_flag() {
        let fixture = Fixture::new(&[
            ClassBuilder::new("sun.misc.Unsafe")
                .method("getInt", "(J)I", |code| {
                    code.iconst(0).ireturn();
                })
                .build(),
            ClassBuilder::new("com.sun.net.httpserver.HttpServer").build(),
        ]);
        let class = ClassBuilder::new("app.A")
            .method("go", "()V", |code| {
                code.line(4)
                    .lconst_0()
                    .invokestatic("sun.misc.Unsafe", "getInt", "(J)I")
                    .pop()
                    .line(5)
                    .new_object("com.sun.net.httpserver.HttpServer")
                    .pop()
                    .return_void();
            })
            .build();

        assert!(fixture.scan("", &class, false).violations.is_empty());
        let scan = fixture.scan("", &class, true);
        assert_eq!(scan.violations.len(), 1);
        assert_eq!(
            scan.violations[0].description,
            "Forbidden class/interface use: sun.misc.Unsafe [non-public internal runtime class]"
        );
        assert_eq!(scan.violations[0].line, 4);
    }

    #[test]
    fn missing_classes_are_collected_not_reported() {
        let fixture = Fixture::new(&[]);
        let class = ClassBuilder::new("app.A")
            .method("go", "()V", |code| {
                code.invokestatic("gone.Api", "run", "()V")
                    .new_object("gone.Thing")
                    .pop()
                    .return_void();
            })
            .build();
        let scan = fixture.scan("", &class, true);
        assert!(scan.violations.is_empty());
        assert_eq!(
            scan.missing_classes.into_iter().collect::<Vec<_>>(),
            vec!["gone.Api", "gone.Thing"]
        );
    }

    #[test]
    fn suppressed_class_and_members_are_skipped() {
        let fixture = Fixture::new(&[
            banned(),
            ClassBuilder::new("app.Suppress").as_annotation().build(),
        ]);
        let suppression: SuppressionSet = ["**.Suppress"].into_iter().collect();

        let whole = ClassBuilder::new("app.A")
            .annotation("app.Suppress")
            .field("f", "Lbad/Banned;")
            .build();
        assert!(fixture
            .scan_with("bad.Banned", &whole, false, &suppression)
            .violations
            .is_empty());

        let members = ClassBuilder::new("app.B")
            .field("plain", "Lbad/Banned;")
            .field_with("quiet", "Lbad/Banned;", &["app.Suppress"])
            .build();
        let scan = fixture.scan_with("bad.Banned", &members, false, &suppression);
        assert_eq!(scan.violations.len(), 1);
        assert_eq!(scan.violations[0].location, "app.B#plain");
    }

    #[test]
    fn array_creation_checks_the_element_type() {
        let fixture = Fixture::new(&[banned()]);
        let class = ClassBuilder::new("app.A")
            .method("go", "()V", |code| {
                code.iconst(1).anewarray("bad.Banned").pop().return_void();
            })
            .build();
        assert_eq!(fixture.scan("bad.Banned", &class, false).violations.len(), 1);
    }

    #[test]
    fn internal_prefixes() {
        assert!(is_internal_runtime_class("sun.misc.Unsafe"));
        assert!(is_internal_runtime_class("com.sun.crypto.provider.SunJCE"));
        assert!(is_internal_runtime_class("jdk.internal.misc.Unsafe"));
        assert!(!is_internal_runtime_class("com.sun.management.OperatingSystemMXBean"));
        assert!(!is_internal_runtime_class("java.lang.String"));
        assert!(!is_internal_runtime_class("sunny.Day"));
    }

    #[test]
    fn overlay_classes_resolve_self_references() {
        let dir = TempDir::new().unwrap();
        write_class(
            dir.path(),
            "java.lang.Object",
            &ClassBuilder::new("java.lang.Object").no_super().build(),
        );
        let mut resolver = ClasspathResolver::open(&Classpath::from_paths([dir.path()])).unwrap();
        let bytes = ClassBuilder::new("app.Self")
            .method("a", "()V", |code| {
                code.invokestatic("app.Self", "b", "()V").return_void();
            })
            .method("b", "()V", |code| {
                code.return_void();
            })
            .build();
        let class = parse_class(&bytes, ParseMode::Full).unwrap();
        resolver.add_overlay(Arc::new(class.clone()));

        let rules = SignatureRegistry::new().freeze(&resolver, true).unwrap();
        let suppression = SuppressionSet::new();
        let scan = Scanner::new(&rules, &resolver, &suppression, false)
            .scan(&class)
            .unwrap();
        assert!(scan.missing_classes.is_empty());
    }
}
