//! Structural metadata extracted from a class file.

use super::descriptor::{params_part, pretty_params};

/// Access flag marking an interface.
pub const ACC_INTERFACE: u16 = 0x0200;

/// Structural view of one compiled class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMetadata {
    /// Binary name in dotted form, e.g. `com.example.Main$Inner`.
    pub name: String,
    /// Raw access flags.
    pub access_flags: u16,
    /// Class-file major version.
    pub major_version: u16,
    /// Value of the `SourceFile` attribute.
    pub source_file: Option<String>,
    /// Superclass; `None` only for `java.lang.Object` and `module-info`.
    pub super_class: Option<String>,
    /// Directly implemented interfaces, in declaration order.
    pub interfaces: Vec<String>,
    /// Annotation types on the class (visible and invisible).
    pub annotations: Vec<String>,
    /// Declared fields.
    pub fields: Vec<FieldInfo>,
    /// Declared methods, including constructors and synthetic members.
    pub methods: Vec<MethodInfo>,
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name.
    pub name: String,
    /// Field descriptor, e.g. `Ljava/lang/String;`.
    pub descriptor: String,
    /// Raw access flags.
    pub access_flags: u16,
    /// Annotation types on the field.
    pub annotations: Vec<String>,
}

/// A declared method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Method name; constructors are `<init>`.
    pub name: String,
    /// Method descriptor, e.g. `(I)V`.
    pub descriptor: String,
    /// Raw access flags.
    pub access_flags: u16,
    /// Annotation types on the method.
    pub annotations: Vec<String>,
    /// Classes listed in the `Exceptions` attribute.
    pub exceptions: Vec<String>,
    /// Decoded body; only present in [`ParseMode::Full`](super::ParseMode::Full).
    pub code: Option<CodeInfo>,
}

/// References and line markers decoded from a `Code` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeInfo {
    /// Every symbolic reference, in instruction order.
    pub references: Vec<Reference>,
    /// Raw `LineNumberTable` entries as stored.
    pub line_numbers: Vec<LineNumber>,
}

/// One `LineNumberTable` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    /// First bytecode offset covered.
    pub start_pc: u32,
    /// Source line.
    pub line: u32,
}

/// A symbolic reference found at a bytecode offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Bytecode offset of the referencing instruction.
    pub offset: u32,
    /// What is referenced.
    pub kind: ReferenceKind,
}

/// The referenced entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A bare type (`new`, casts, class literals, catch types).
    Type(String),
    /// A field access.
    Field {
        /// Symbolic owner.
        owner: String,
        /// Field name.
        name: String,
        /// Field descriptor.
        descriptor: String,
    },
    /// A method or constructor invocation, or a method handle.
    Method {
        /// Symbolic owner.
        owner: String,
        /// Method name.
        name: String,
        /// Method descriptor.
        descriptor: String,
        /// Whether the owner was referenced as an interface.
        interface: bool,
    },
}

impl CodeInfo {
    /// Line of the closest table entry at or before `offset`.
    #[must_use]
    pub fn line_for_offset(&self, offset: u32) -> Option<u32> {
        self.line_numbers
            .iter()
            .filter(|entry| entry.start_pc <= offset)
            .max_by_key(|entry| entry.start_pc)
            .map(|entry| entry.line)
    }

    /// Smallest line number in the table.
    #[must_use]
    pub fn first_line(&self) -> Option<u32> {
        self.line_numbers.iter().map(|entry| entry.line).min()
    }
}

impl MethodInfo {
    /// `name(params)` in Java syntax.
    #[must_use]
    pub fn display_signature(&self) -> String {
        format!("{}({})", self.name, pretty_params(&self.descriptor))
    }

    /// Smallest source line of the body, if any.
    #[must_use]
    pub fn first_line(&self) -> Option<u32> {
        self.code.as_ref().and_then(CodeInfo::first_line)
    }
}

impl ClassMetadata {
    /// Whether this type is an interface.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }

    /// Smallest source line across all method bodies.
    #[must_use]
    pub fn first_line(&self) -> Option<u32> {
        self.methods.iter().filter_map(MethodInfo::first_line).min()
    }

    /// Finds a declared field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Finds a declared method by exact name and descriptor.
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Finds a declared method by name and parameter part only, ignoring
    /// the return type.
    #[must_use]
    pub fn method_by_params(&self, name: &str, params: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && params_part(&m.descriptor) == params)
    }

    /// Whether any field or method carries `name`.
    #[must_use]
    pub fn declares_member_named(&self, name: &str) -> bool {
        self.field(name).is_some() || self.methods.iter().any(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(lines: &[(u32, u32)]) -> CodeInfo {
        CodeInfo {
            references: Vec::new(),
            line_numbers: lines
                .iter()
                .map(|&(start_pc, line)| LineNumber { start_pc, line })
                .collect(),
        }
    }

    #[test]
    fn line_lookup_uses_closest_preceding_entry() {
        // Tables are not required to be sorted.
        let info = code(&[(10, 12), (0, 10), (4, 11)]);
        assert_eq!(info.line_for_offset(0), Some(10));
        assert_eq!(info.line_for_offset(3), Some(10));
        assert_eq!(info.line_for_offset(4), Some(11));
        assert_eq!(info.line_for_offset(99), Some(12));
        assert_eq!(info.first_line(), Some(10));
    }

    #[test]
    fn line_lookup_without_entries() {
        let info = code(&[(5, 20)]);
        assert_eq!(info.line_for_offset(2), None);
        assert_eq!(code(&[]).line_for_offset(0), None);
    }

    #[test]
    fn method_display_signature() {
        let method = MethodInfo {
            name: "main".into(),
            descriptor: "([Ljava/lang/String;)V".into(),
            access_flags: 0x0009,
            annotations: Vec::new(),
            exceptions: Vec::new(),
            code: None,
        };
        assert_eq!(method.display_signature(), "main(java.lang.String[])");
    }
}
