//! Field and method descriptor helpers.
//!
//! Names handed out of this module are binary names in dotted form
//! (`java.util.Map$Entry`), which is how signatures are written.

use super::ClassParseError;

/// One parsed field type from a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldType<'a> {
    pub dims: usize,
    pub base: BaseType<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BaseType<'a> {
    Primitive(u8),
    /// Internal-form class name.
    Object(&'a str),
}

struct DescriptorParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), ClassParseError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.invalid())
        }
    }

    fn invalid(&self) -> ClassParseError {
        ClassParseError::InvalidDescriptor(self.text.to_string())
    }

    fn parse_type(&mut self) -> Result<FieldType<'a>, ClassParseError> {
        let mut dims = 0;
        while self.peek() == Some(b'[') {
            dims += 1;
            self.pos += 1;
        }
        let tag = self.peek().ok_or_else(|| self.invalid())?;
        self.pos += 1;
        let base = match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => BaseType::Primitive(tag),
            b'L' => {
                let rest = &self.text[self.pos..];
                let end = rest.find(';').ok_or_else(|| self.invalid())?;
                if end == 0 {
                    return Err(self.invalid());
                }
                self.pos += end + 1;
                BaseType::Object(&rest[..end])
            }
            _ => return Err(self.invalid()),
        };
        Ok(FieldType { dims, base })
    }

    fn parse_return(&mut self) -> Result<Option<FieldType<'a>>, ClassParseError> {
        if self.peek() == Some(b'V') {
            self.pos += 1;
            return Ok(None);
        }
        self.parse_type().map(Some)
    }

    fn finish(&self) -> Result<(), ClassParseError> {
        if self.pos == self.text.len() {
            Ok(())
        } else {
            Err(self.invalid())
        }
    }
}

/// Parses a field descriptor such as `[Ljava/lang/String;`.
pub(crate) fn parse_field(descriptor: &str) -> Result<FieldType<'_>, ClassParseError> {
    let mut parser = DescriptorParser::new(descriptor);
    let ty = parser.parse_type()?;
    parser.finish()?;
    Ok(ty)
}

/// Parses a method descriptor into parameter types and return type.
pub(crate) fn parse_method(
    descriptor: &str,
) -> Result<(Vec<FieldType<'_>>, Option<FieldType<'_>>), ClassParseError> {
    let mut parser = DescriptorParser::new(descriptor);
    parser.expect(b'(')?;
    let mut params = Vec::new();
    while parser.peek() != Some(b')') {
        if parser.peek().is_none() {
            return Err(parser.invalid());
        }
        params.push(parser.parse_type()?);
    }
    parser.expect(b')')?;
    let ret = parser.parse_return()?;
    parser.finish()?;
    Ok((params, ret))
}

/// Converts `java/lang/String` to `java.lang.String`.
#[must_use]
pub fn binary_name(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Converts `java.lang.String` to `java/lang/String`.
#[must_use]
pub fn internal_name(binary: &str) -> String {
    binary.replace('.', "/")
}

/// Classes mentioned by a field or method descriptor, arrays stripped,
/// primitives skipped, in order of appearance.
///
/// # Errors
///
/// Returns [`ClassParseError::InvalidDescriptor`] for malformed input.
pub fn referenced_classes(descriptor: &str) -> Result<Vec<String>, ClassParseError> {
    let types = if descriptor.starts_with('(') {
        let (mut params, ret) = parse_method(descriptor)?;
        params.extend(ret);
        params
    } else {
        vec![parse_field(descriptor)?]
    };
    Ok(types
        .into_iter()
        .filter_map(|t| match t.base {
            BaseType::Object(name) => Some(binary_name(name)),
            BaseType::Primitive(_) => None,
        })
        .collect())
}

/// Element class of a `CONSTANT_Class` name, which may be an array
/// descriptor. Returns `None` for primitive arrays.
pub(crate) fn class_ref_type(internal: &str) -> Result<Option<String>, ClassParseError> {
    if !internal.starts_with('[') {
        return Ok(Some(binary_name(internal)));
    }
    Ok(match parse_field(internal)?.base {
        BaseType::Object(name) => Some(binary_name(name)),
        BaseType::Primitive(_) => None,
    })
}

/// The parameter part of a method descriptor: `(I)V` becomes `(I)`.
#[must_use]
pub fn params_part(descriptor: &str) -> &str {
    match descriptor.find(')') {
        Some(end) => &descriptor[..=end],
        None => descriptor,
    }
}

fn pretty(ty: &FieldType<'_>) -> String {
    let mut out = match ty.base {
        BaseType::Primitive(tag) => primitive_name(tag).to_string(),
        BaseType::Object(name) => binary_name(name),
    };
    for _ in 0..ty.dims {
        out.push_str("[]");
    }
    out
}

fn primitive_name(tag: u8) -> &'static str {
    match tag {
        b'B' => "byte",
        b'C' => "char",
        b'D' => "double",
        b'F' => "float",
        b'I' => "int",
        b'J' => "long",
        b'S' => "short",
        _ => "boolean",
    }
}

/// Renders the parameter list of a method descriptor in Java syntax:
/// `([Ljava/lang/String;I)V` becomes `java.lang.String[],int`.
///
/// Malformed descriptors are returned verbatim.
#[must_use]
pub fn pretty_params(descriptor: &str) -> String {
    match parse_method(descriptor) {
        Ok((params, _)) => params.iter().map(pretty).collect::<Vec<_>>().join(","),
        Err(_) => descriptor.to_string(),
    }
}

/// Converts a Java source type (`int`, `java.lang.String[]`,
/// `java.lang.Object...`) to a field descriptor.
#[must_use]
pub fn java_type_to_descriptor(java: &str) -> Option<String> {
    let mut name = java.trim();
    let mut dims = 0;
    if let Some(stripped) = name.strip_suffix("...") {
        dims += 1;
        name = stripped.trim_end();
    }
    while let Some(stripped) = name.strip_suffix("[]") {
        dims += 1;
        name = stripped.trim_end();
    }
    if name.is_empty() {
        return None;
    }

    let base = match name {
        "byte" => "B".to_string(),
        "char" => "C".to_string(),
        "double" => "D".to_string(),
        "float" => "F".to_string(),
        "int" => "I".to_string(),
        "long" => "J".to_string(),
        "short" => "S".to_string(),
        "boolean" => "Z".to_string(),
        "void" => return None,
        class => {
            let valid = class.split('.').all(|part| {
                !part.is_empty()
                    && part
                        .chars()
                        .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
            });
            if !valid {
                return None;
            }
            format!("L{};", internal_name(class))
        }
    };
    Some(format!("{}{base}", "[".repeat(dims)))
}
