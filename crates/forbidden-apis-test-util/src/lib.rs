//! # forbidden-apis-test-util
//!
//! Assembles JVM class files in memory so tests never need `javac`.
//!
//! ```
//! use forbidden_apis_test_util::ClassBuilder;
//!
//! let bytes = ClassBuilder::new("com.example.Main")
//!     .source_file("Main.java")
//!     .method("main", "([Ljava/lang/String;)V", |code| {
//!         code.line(10)
//!             .iconst(1)
//!             .invokestatic("java.lang.System", "exit", "(I)V")
//!             .return_void();
//!     })
//!     .build();
//! assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! ```
//!
//! Helpers in this crate panic on I/O errors; they are meant for tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_panics_doc)]

mod code;
mod files;
mod pool;

pub use code::CodeBuilder;
pub use files::{runtime_stubs, write_class, write_jar, write_runtime_stubs};

use code::{Bootstrap, Code};
use pool::ConstantPool;

const ACC_PUBLIC: u16 = 0x0001;
const ACC_STATIC: u16 = 0x0008;
const ACC_SUPER: u16 = 0x0020;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;
const ACC_ANNOTATION: u16 = 0x2000;

/// Default class-file major version (Java 8).
pub const DEFAULT_MAJOR_VERSION: u16 = 52;

fn internal(name: &str) -> String {
    name.replace('.', "/")
}

/// Header and attributes of a method; the body is passed separately.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    name: String,
    descriptor: String,
    access_flags: u16,
    annotations: Vec<String>,
    invisible_annotations: Vec<String>,
    exceptions: Vec<String>,
}

impl MethodSpec {
    /// A `public static` method.
    #[must_use]
    pub fn new(name: &str, descriptor: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access_flags: ACC_PUBLIC | ACC_STATIC,
            annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    /// Replaces the access flags.
    #[must_use]
    pub fn access(mut self, flags: u16) -> Self {
        self.access_flags = flags;
        self
    }

    /// Adds a runtime-visible annotation.
    #[must_use]
    pub fn annotation(mut self, name: &str) -> Self {
        self.annotations.push(name.to_string());
        self
    }

    /// Adds a class-retention (invisible) annotation.
    #[must_use]
    pub fn invisible_annotation(mut self, name: &str) -> Self {
        self.invisible_annotations.push(name.to_string());
        self
    }

    /// Adds an `Exceptions` entry.
    #[must_use]
    pub fn throws(mut self, class: &str) -> Self {
        self.exceptions.push(class.to_string());
        self
    }
}

#[derive(Debug, Clone)]
struct Annotation {
    name: String,
    visible: bool,
    string_element: Option<(String, String)>,
}

#[derive(Debug)]
struct Member {
    access_flags: u16,
    name: u16,
    descriptor: u16,
    attributes: Vec<u8>,
    attribute_count: u16,
}

/// Builds one class file.
#[derive(Debug)]
pub struct ClassBuilder {
    name: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    access_flags: u16,
    major_version: u16,
    source_file: Option<String>,
    annotations: Vec<Annotation>,
    fields: Vec<Member>,
    methods: Vec<Member>,
    pool: ConstantPool,
    bootstrap: Vec<Bootstrap>,
}

impl ClassBuilder {
    /// A public class extending `java.lang.Object`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            super_class: Some("java.lang.Object".to_string()),
            interfaces: Vec::new(),
            access_flags: ACC_PUBLIC | ACC_SUPER,
            major_version: DEFAULT_MAJOR_VERSION,
            source_file: None,
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            pool: ConstantPool::new(),
            bootstrap: Vec::new(),
        }
    }

    /// Binary name of the class being built.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the superclass.
    #[must_use]
    pub fn super_class(mut self, name: &str) -> Self {
        self.super_class = Some(name.to_string());
        self
    }

    /// Removes the superclass, as for `java.lang.Object`.
    #[must_use]
    pub fn no_super(mut self) -> Self {
        self.super_class = None;
        self
    }

    /// Adds an implemented (or extended) interface.
    #[must_use]
    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    /// Marks the class as an interface.
    #[must_use]
    pub fn as_interface(mut self) -> Self {
        self.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
        self
    }

    /// Marks the class as an annotation type.
    #[must_use]
    pub fn as_annotation(mut self) -> Self {
        self.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION;
        self
    }

    /// Sets the class-file major version.
    #[must_use]
    pub fn version(mut self, major: u16) -> Self {
        self.major_version = major;
        self
    }

    /// Sets the `SourceFile` attribute.
    #[must_use]
    pub fn source_file(mut self, file: &str) -> Self {
        self.source_file = Some(file.to_string());
        self
    }

    /// Adds a runtime-visible class annotation.
    #[must_use]
    pub fn annotation(mut self, name: &str) -> Self {
        self.annotations.push(Annotation {
            name: name.to_string(),
            visible: true,
            string_element: None,
        });
        self
    }

    /// Adds a class-retention class annotation.
    #[must_use]
    pub fn invisible_annotation(mut self, name: &str) -> Self {
        self.annotations.push(Annotation {
            name: name.to_string(),
            visible: false,
            string_element: None,
        });
        self
    }

    /// Adds a runtime-visible class annotation with one string element,
    /// e.g. `@SuppressForbidden(reason = "...")`.
    #[must_use]
    pub fn annotation_with_element(mut self, name: &str, element: &str, value: &str) -> Self {
        self.annotations.push(Annotation {
            name: name.to_string(),
            visible: true,
            string_element: Some((element.to_string(), value.to_string())),
        });
        self
    }

    /// Adds a public field.
    #[must_use]
    pub fn field(self, name: &str, descriptor: &str) -> Self {
        self.field_with(name, descriptor, &[])
    }

    /// Adds a public field carrying runtime-visible annotations.
    #[must_use]
    pub fn field_with(mut self, name: &str, descriptor: &str, annotations: &[&str]) -> Self {
        let annotations: Vec<Annotation> = annotations
            .iter()
            .map(|a| Annotation {
                name: (*a).to_string(),
                visible: true,
                string_element: None,
            })
            .collect();
        let mut attributes = Vec::new();
        let attribute_count = self.write_annotation_attributes(&annotations, &mut attributes);
        let member = Member {
            access_flags: ACC_PUBLIC,
            name: self.pool.utf8(name),
            descriptor: self.pool.utf8(descriptor),
            attributes,
            attribute_count,
        };
        self.fields.push(member);
        self
    }

    /// Adds a `public static` method with a body.
    #[must_use]
    pub fn method(self, name: &str, descriptor: &str, body: impl FnOnce(&mut CodeBuilder<'_>)) -> Self {
        self.method_with(MethodSpec::new(name, descriptor), body)
    }

    /// Adds a method described by `spec` with a body.
    #[must_use]
    pub fn method_with(mut self, spec: MethodSpec, body: impl FnOnce(&mut CodeBuilder<'_>)) -> Self {
        let mut builder = CodeBuilder::new(&mut self.pool, &mut self.bootstrap);
        body(&mut builder);
        let code = builder.finish();
        self.push_method(&spec, Some(&code));
        self
    }

    /// Adds a method without a `Code` attribute.
    #[must_use]
    pub fn abstract_method(mut self, name: &str, descriptor: &str) -> Self {
        let spec = MethodSpec::new(name, descriptor).access(ACC_PUBLIC | ACC_ABSTRACT);
        self.push_method(&spec, None);
        self
    }

    fn push_method(&mut self, spec: &MethodSpec, code: Option<&Code>) {
        let mut attributes = Vec::new();
        let mut attribute_count = 0;

        if let Some(code) = code {
            self.write_code_attribute(code, &mut attributes);
            attribute_count += 1;
        }
        if !spec.exceptions.is_empty() {
            let mut data = u16_len(spec.exceptions.len()).to_be_bytes().to_vec();
            for exception in &spec.exceptions {
                data.extend_from_slice(&self.pool.class(&internal(exception)).to_be_bytes());
            }
            self.write_attribute("Exceptions", &data, &mut attributes);
            attribute_count += 1;
        }
        let annotations: Vec<Annotation> = spec
            .annotations
            .iter()
            .map(|name| (name, true))
            .chain(spec.invisible_annotations.iter().map(|name| (name, false)))
            .map(|(name, visible)| Annotation {
                name: name.clone(),
                visible,
                string_element: None,
            })
            .collect();
        attribute_count += self.write_annotation_attributes(&annotations, &mut attributes);

        let member = Member {
            access_flags: spec.access_flags,
            name: self.pool.utf8(&spec.name),
            descriptor: self.pool.utf8(&spec.descriptor),
            attributes,
            attribute_count,
        };
        self.methods.push(member);
    }

    fn write_attribute(&mut self, name: &str, data: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(&self.pool.utf8(name).to_be_bytes());
        out.extend_from_slice(&u32_len(data.len()).to_be_bytes());
        out.extend_from_slice(data);
    }

    fn write_code_attribute(&mut self, code: &Code, out: &mut Vec<u8>) {
        let mut data = Vec::new();
        data.extend_from_slice(&16u16.to_be_bytes()); // max_stack
        data.extend_from_slice(&16u16.to_be_bytes()); // max_locals
        data.extend_from_slice(&u32_len(code.bytes.len()).to_be_bytes());
        data.extend_from_slice(&code.bytes);
        data.extend_from_slice(&u16_len(code.catches.len()).to_be_bytes());
        for entry in &code.catches {
            for value in entry {
                data.extend_from_slice(&value.to_be_bytes());
            }
        }
        if code.lines.is_empty() {
            data.extend_from_slice(&0u16.to_be_bytes());
        } else {
            data.extend_from_slice(&1u16.to_be_bytes());
            let mut table = u16_len(code.lines.len()).to_be_bytes().to_vec();
            for (pc, line) in &code.lines {
                table.extend_from_slice(&pc.to_be_bytes());
                table.extend_from_slice(&line.to_be_bytes());
            }
            self.write_attribute("LineNumberTable", &table, &mut data);
        }
        self.write_attribute("Code", &data, out);
    }

    /// Writes up to two annotation attributes; returns how many.
    fn write_annotation_attributes(&mut self, annotations: &[Annotation], out: &mut Vec<u8>) -> u16 {
        let mut count = 0;
        for (visible, attribute) in [
            (true, "RuntimeVisibleAnnotations"),
            (false, "RuntimeInvisibleAnnotations"),
        ] {
            let selected: Vec<&Annotation> =
                annotations.iter().filter(|a| a.visible == visible).collect();
            if selected.is_empty() {
                continue;
            }
            let mut data = u16_len(selected.len()).to_be_bytes().to_vec();
            for annotation in selected {
                let type_index = self.pool.utf8(&format!("L{};", internal(&annotation.name)));
                data.extend_from_slice(&type_index.to_be_bytes());
                match &annotation.string_element {
                    None => data.extend_from_slice(&0u16.to_be_bytes()),
                    Some((element, value)) => {
                        data.extend_from_slice(&1u16.to_be_bytes());
                        data.extend_from_slice(&self.pool.utf8(element).to_be_bytes());
                        data.push(b's');
                        data.extend_from_slice(&self.pool.utf8(value).to_be_bytes());
                    }
                }
            }
            self.write_attribute(attribute, &data, out);
            count += 1;
        }
        count
    }

    /// Serializes the class file.
    #[must_use]
    pub fn build(mut self) -> Vec<u8> {
        let this_class = self.pool.class(&internal(&self.name));
        let super_class = match self.super_class.clone() {
            Some(name) => self.pool.class(&internal(&name)),
            None => 0,
        };
        let interfaces: Vec<u16> = self
            .interfaces
            .clone()
            .iter()
            .map(|name| self.pool.class(&internal(name)))
            .collect();

        let mut attributes = Vec::new();
        let mut attribute_count = 0u16;
        if let Some(file) = self.source_file.clone() {
            let index = self.pool.utf8(&file);
            self.write_attribute("SourceFile", &index.to_be_bytes(), &mut attributes);
            attribute_count += 1;
        }
        let annotations = self.annotations.clone();
        attribute_count += self.write_annotation_attributes(&annotations, &mut attributes);
        if !self.bootstrap.is_empty() {
            let mut data = u16_len(self.bootstrap.len()).to_be_bytes().to_vec();
            for (handle, arguments) in &self.bootstrap {
                data.extend_from_slice(&handle.to_be_bytes());
                data.extend_from_slice(&u16_len(arguments.len()).to_be_bytes());
                for argument in arguments {
                    data.extend_from_slice(&argument.to_be_bytes());
                }
            }
            self.write_attribute("BootstrapMethods", &data, &mut attributes);
            attribute_count += 1;
        }

        let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00];
        out.extend_from_slice(&self.major_version.to_be_bytes());
        self.pool.write(&mut out);
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&this_class.to_be_bytes());
        out.extend_from_slice(&super_class.to_be_bytes());
        out.extend_from_slice(&u16_len(interfaces.len()).to_be_bytes());
        for interface in interfaces {
            out.extend_from_slice(&interface.to_be_bytes());
        }
        for members in [&self.fields, &self.methods] {
            out.extend_from_slice(&u16_len(members.len()).to_be_bytes());
            for member in members {
                out.extend_from_slice(&member.access_flags.to_be_bytes());
                out.extend_from_slice(&member.name.to_be_bytes());
                out.extend_from_slice(&member.descriptor.to_be_bytes());
                out.extend_from_slice(&member.attribute_count.to_be_bytes());
                out.extend_from_slice(&member.attributes);
            }
        }
        out.extend_from_slice(&attribute_count.to_be_bytes());
        out.extend_from_slice(&attributes);
        out
    }
}

fn u16_len(len: usize) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}

fn u32_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_class_layout() {
        let bytes = ClassBuilder::new("a.B").build();
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(u16::from_be_bytes([bytes[6], bytes[7]]), DEFAULT_MAJOR_VERSION);
        // utf8 a/B, class, utf8 java/lang/Object, class => count 5
        assert_eq!(u16::from_be_bytes([bytes[8], bytes[9]]), 5);
    }

    #[test]
    fn version_is_configurable() {
        let bytes = ClassBuilder::new("a.B").version(61).build();
        assert_eq!(u16::from_be_bytes([bytes[6], bytes[7]]), 61);
    }

    #[test]
    fn code_offsets_and_switch_padding() {
        let mut pool = ConstantPool::new();
        let mut bootstrap = Vec::new();
        let mut code = CodeBuilder::new(&mut pool, &mut bootstrap);
        code.iconst(1).tableswitch(0, 1);
        let finished = code.finish();
        // iconst_1 at 0, tableswitch at 1, pad to 4, then 3 + 2 ints.
        assert_eq!(finished.bytes.len(), 4 + 5 * 4);
    }
}
