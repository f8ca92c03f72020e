//! Class-file parser producing [`ClassMetadata`](super::ClassMetadata).
//!
//! Structure mode stops at member signatures and annotations; full mode
//! also decodes method bodies into references and line tables.

use super::constant_pool::{Constant, ConstantPool, MemberRef};
use super::descriptor::{
    binary_name, class_ref_type, parse_field, parse_method, referenced_classes, BaseType,
};
use super::metadata::{
    ClassMetadata, CodeInfo, FieldInfo, LineNumber, MethodInfo, Reference, ReferenceKind,
};
use super::opcodes::{
    instruction_length, ANEWARRAY, CHECKCAST, GETFIELD, GETSTATIC, INSTANCEOF, INVOKEDYNAMIC,
    INVOKEINTERFACE, INVOKESPECIAL, INVOKESTATIC, INVOKEVIRTUAL, LDC, LDC_W, MULTIANEWARRAY, NEW,
    PUTFIELD, PUTSTATIC,
};
use super::reader::{u2_at, ClassReader};
use super::{ClassParseError, ParseMode, MAX_MAJOR_VERSION, MIN_MAJOR_VERSION};

struct BootstrapMethod {
    method_handle: u16,
    arguments: Vec<u16>,
}

struct RawCode<'a> {
    code: &'a [u8],
    catch_types: Vec<(u32, u16)>,
    line_numbers: Vec<LineNumber>,
}

/// Parses a class file.
///
/// # Errors
///
/// Returns a [`ClassParseError`] if the bytes are not a well-formed class
/// file of a supported version.
pub fn parse_class(bytes: &[u8], mode: ParseMode) -> Result<ClassMetadata, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let minor = reader.read_u2()?;
    let major = reader.read_u2()?;
    if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major) {
        return Err(ClassParseError::UnsupportedVersion { major, minor });
    }
    let pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_index = reader.read_u2()?;
    let name = binary_name(pool.class_name(this_class)?);
    let super_class = if super_index == 0 {
        None
    } else {
        Some(binary_name(pool.class_name(super_index)?))
    };

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(binary_name(pool.class_name(reader.read_u2()?)?));
    }

    let fields_count = reader.read_u2()?;
    let mut fields = Vec::with_capacity(fields_count as usize);
    for _ in 0..fields_count {
        let access_flags = reader.read_u2()?;
        let name = pool.utf8(reader.read_u2()?)?.to_string();
        let descriptor = pool.utf8(reader.read_u2()?)?.to_string();
        parse_field(&descriptor)?;
        let mut annotations = Vec::new();
        let attributes_count = reader.read_u2()?;
        for _ in 0..attributes_count {
            let (attr_name, data) = read_attribute(&mut reader, &pool)?;
            if is_annotations_attribute(attr_name) {
                read_annotations(data, &pool, &mut annotations)?;
            }
        }
        fields.push(FieldInfo {
            name,
            descriptor,
            access_flags,
            annotations,
        });
    }

    let methods_count = reader.read_u2()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    let mut bodies: Vec<Option<RawCode<'_>>> = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        let access_flags = reader.read_u2()?;
        let name = pool.utf8(reader.read_u2()?)?.to_string();
        let descriptor = pool.utf8(reader.read_u2()?)?.to_string();
        parse_method(&descriptor)?;
        let mut annotations = Vec::new();
        let mut exceptions = Vec::new();
        let mut body = None;
        let attributes_count = reader.read_u2()?;
        for _ in 0..attributes_count {
            let (attr_name, data) = read_attribute(&mut reader, &pool)?;
            match attr_name {
                "Code" if mode == ParseMode::Full => body = Some(read_code(data, &pool)?),
                "Exceptions" => {
                    let mut sub = ClassReader::new(data);
                    let count = sub.read_u2()?;
                    for _ in 0..count {
                        exceptions.push(binary_name(pool.class_name(sub.read_u2()?)?));
                    }
                }
                other if is_annotations_attribute(other) => {
                    read_annotations(data, &pool, &mut annotations)?;
                }
                _ => {}
            }
        }
        methods.push(MethodInfo {
            name,
            descriptor,
            access_flags,
            annotations,
            exceptions,
            code: None,
        });
        bodies.push(body);
    }

    let mut source_file = None;
    let mut annotations = Vec::new();
    let mut bootstrap_methods = Vec::new();
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let (attr_name, data) = read_attribute(&mut reader, &pool)?;
        match attr_name {
            "SourceFile" => {
                let mut sub = ClassReader::new(data);
                source_file = Some(pool.utf8(sub.read_u2()?)?.to_string());
            }
            "BootstrapMethods" if mode == ParseMode::Full => {
                bootstrap_methods = read_bootstrap_methods(data)?;
            }
            other if is_annotations_attribute(other) => {
                read_annotations(data, &pool, &mut annotations)?;
            }
            _ => {}
        }
    }

    // Bodies are decoded last: invokedynamic needs the class-level
    // BootstrapMethods table.
    for (method, body) in methods.iter_mut().zip(bodies) {
        if let Some(raw) = body {
            method.code = Some(decode_code(&raw, &pool, &bootstrap_methods)?);
        }
    }

    Ok(ClassMetadata {
        name,
        access_flags,
        major_version: major,
        source_file,
        super_class,
        interfaces,
        annotations,
        fields,
        methods,
    })
}

fn read_attribute<'a, 'p>(
    reader: &mut ClassReader<'a>,
    pool: &'p ConstantPool,
) -> Result<(&'p str, &'a [u8]), ClassParseError> {
    let name = pool.utf8(reader.read_u2()?)?;
    let length = reader.read_u4()? as usize;
    let data = reader.read_slice(length)?;
    Ok((name, data))
}

fn is_annotations_attribute(name: &str) -> bool {
    name == "RuntimeVisibleAnnotations" || name == "RuntimeInvisibleAnnotations"
}

fn read_annotations(
    data: &[u8],
    pool: &ConstantPool,
    out: &mut Vec<String>,
) -> Result<(), ClassParseError> {
    let mut reader = ClassReader::new(data);
    let count = reader.read_u2()?;
    for _ in 0..count {
        let type_descriptor = pool.utf8(reader.read_u2()?)?;
        let ty = parse_field(type_descriptor)?;
        match ty.base {
            BaseType::Object(name) if ty.dims == 0 => out.push(binary_name(name)),
            _ => {
                return Err(ClassParseError::InvalidDescriptor(
                    type_descriptor.to_string(),
                ))
            }
        }
        skip_annotation_body(&mut reader)?;
    }
    Ok(())
}

fn skip_annotation_body(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    let pairs = reader.read_u2()?;
    for _ in 0..pairs {
        reader.read_u2()?; // element_name_index
        skip_element_value(reader)?;
    }
    Ok(())
}

fn skip_element_value(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    let tag = reader.read_u1()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => {
            reader.read_u2()?;
        }
        b'e' => {
            reader.read_u2()?; // type_name_index
            reader.read_u2()?; // const_name_index
        }
        b'@' => {
            reader.read_u2()?; // nested annotation type
            skip_annotation_body(reader)?;
        }
        b'[' => {
            let count = reader.read_u2()?;
            for _ in 0..count {
                skip_element_value(reader)?;
            }
        }
        other => {
            return Err(ClassParseError::InvalidAnnotation {
                tag: char::from(other),
            })
        }
    }
    Ok(())
}

fn read_bootstrap_methods(data: &[u8]) -> Result<Vec<BootstrapMethod>, ClassParseError> {
    let mut reader = ClassReader::new(data);
    let count = reader.read_u2()?;
    let mut methods = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let method_handle = reader.read_u2()?;
        let argument_count = reader.read_u2()?;
        let mut arguments = Vec::with_capacity(argument_count as usize);
        for _ in 0..argument_count {
            arguments.push(reader.read_u2()?);
        }
        methods.push(BootstrapMethod {
            method_handle,
            arguments,
        });
    }
    Ok(methods)
}

fn read_code<'a>(data: &'a [u8], pool: &ConstantPool) -> Result<RawCode<'a>, ClassParseError> {
    let mut reader = ClassReader::new(data);
    reader.read_u2()?; // max_stack
    reader.read_u2()?; // max_locals
    let code_length = reader.read_u4()? as usize;
    let code = reader.read_slice(code_length)?;

    let exception_table_length = reader.read_u2()?;
    let mut catch_types = Vec::new();
    for _ in 0..exception_table_length {
        reader.read_u2()?; // start_pc
        reader.read_u2()?; // end_pc
        let handler_pc = reader.read_u2()?;
        let catch_type = reader.read_u2()?;
        if catch_type != 0 {
            catch_types.push((u32::from(handler_pc), catch_type));
        }
    }

    let mut line_numbers = Vec::new();
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let (name, attr) = read_attribute(&mut reader, pool)?;
        if name == "LineNumberTable" {
            let mut sub = ClassReader::new(attr);
            let count = sub.read_u2()?;
            for _ in 0..count {
                let start_pc = u32::from(sub.read_u2()?);
                let line = u32::from(sub.read_u2()?);
                line_numbers.push(LineNumber { start_pc, line });
            }
        }
    }

    Ok(RawCode {
        code,
        catch_types,
        line_numbers,
    })
}

fn decode_code(
    raw: &RawCode<'_>,
    pool: &ConstantPool,
    bootstrap_methods: &[BootstrapMethod],
) -> Result<CodeInfo, ClassParseError> {
    let code = raw.code;
    let mut references = Vec::new();

    let mut pc = 0;
    while pc < code.len() {
        let opcode = code[pc];
        let length = instruction_length(code, pc)?;
        let offset = u32::try_from(pc).map_err(|_| ClassParseError::TruncatedCode { offset: pc })?;
        let mut push = |kind: ReferenceKind| references.push(Reference { offset, kind });

        match opcode {
            NEW | ANEWARRAY | CHECKCAST | INSTANCEOF | MULTIANEWARRAY => {
                let index = u2_at(code, pc + 1)?;
                if let Some(name) = class_ref_type(pool.class_name(index)?)? {
                    push(ReferenceKind::Type(name));
                }
            }
            GETSTATIC | PUTSTATIC | GETFIELD | PUTFIELD | INVOKEVIRTUAL | INVOKESPECIAL
            | INVOKESTATIC | INVOKEINTERFACE => {
                let index = u2_at(code, pc + 1)?;
                if let Some(kind) = member_reference(pool.member_ref(index)?)? {
                    push(kind);
                }
            }
            LDC => {
                let index = u16::from(code[pc + 1]);
                loadable_references(pool, index, &mut push)?;
            }
            LDC_W => {
                let index = u2_at(code, pc + 1)?;
                loadable_references(pool, index, &mut push)?;
            }
            INVOKEDYNAMIC => {
                let index = u2_at(code, pc + 1)?;
                let bootstrap_index = match pool.get(index)? {
                    Constant::InvokeDynamic { bootstrap_index } => *bootstrap_index,
                    _ => return Err(ClassParseError::InvalidConstantIndex { index }),
                };
                let bootstrap = bootstrap_methods
                    .get(bootstrap_index as usize)
                    .ok_or(ClassParseError::InvalidBootstrapIndex {
                        index: bootstrap_index,
                    })?;
                loadable_references(pool, bootstrap.method_handle, &mut push)?;
                for argument in &bootstrap.arguments {
                    loadable_references(pool, *argument, &mut push)?;
                }
            }
            _ => {}
        }

        pc += length;
    }

    for (handler_pc, index) in &raw.catch_types {
        if let Some(name) = class_ref_type(pool.class_name(*index)?)? {
            references.push(Reference {
                offset: *handler_pc,
                kind: ReferenceKind::Type(name),
            });
        }
    }
    references.sort_by_key(|r| r.offset);

    Ok(CodeInfo {
        references,
        line_numbers: raw.line_numbers.clone(),
    })
}

/// References carried by a loadable constant (`ldc` operand or bootstrap
/// argument). Strings and numbers carry none.
fn loadable_references(
    pool: &ConstantPool,
    index: u16,
    push: &mut impl FnMut(ReferenceKind),
) -> Result<(), ClassParseError> {
    match pool.get(index)? {
        Constant::Class { .. } => {
            if let Some(name) = class_ref_type(pool.class_name(index)?)? {
                push(ReferenceKind::Type(name));
            }
        }
        Constant::MethodType { descriptor_index } => {
            for name in referenced_classes(pool.utf8(*descriptor_index)?)? {
                push(ReferenceKind::Type(name));
            }
        }
        Constant::MethodHandle {
            reference_index, ..
        } => {
            if let Some(kind) = member_reference(pool.member_ref(*reference_index)?)? {
                push(kind);
            }
        }
        _ => {}
    }
    Ok(())
}

fn member_reference(member: MemberRef) -> Result<Option<ReferenceKind>, ClassParseError> {
    // Calls on array types (`clone()` on `[Ljava/lang/Object;`) only expose
    // the element type.
    if member.owner.starts_with('[') {
        return Ok(class_ref_type(&member.owner)?.map(ReferenceKind::Type));
    }
    let owner = binary_name(&member.owner);
    Ok(Some(if member.is_field {
        ReferenceKind::Field {
            owner,
            name: member.name,
            descriptor: member.descriptor,
        }
    } else {
        ReferenceKind::Method {
            owner,
            name: member.name,
            descriptor: member.descriptor,
            interface: member.interface,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_new_versions() {
        let bytes = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 70];
        assert!(matches!(
            parse_class(&bytes, ParseMode::Structure),
            Err(ClassParseError::UnsupportedVersion { major: 70, .. })
        ));
    }

    #[test]
    fn rejects_too_old_versions() {
        let bytes = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 44];
        assert!(matches!(
            parse_class(&bytes, ParseMode::Structure),
            Err(ClassParseError::UnsupportedVersion { major: 44, .. })
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 52, 0x00];
        assert!(matches!(
            parse_class(&bytes, ParseMode::Full),
            Err(ClassParseError::UnexpectedEof)
        ));
        assert!(matches!(
            parse_class(b"not a class", ParseMode::Full),
            Err(ClassParseError::InvalidMagic)
        ));
    }

    #[test]
    fn element_values_are_skipped_recursively() {
        // 1 pair: name=1, value = array[ 's' 2, '@' (type 3, 1 pair: name 1, 'e' 4 5) ]
        let data = [
            0x00, 0x01, // num pairs
            0x00, 0x01, b'[', 0x00, 0x02, // array of 2
            b's', 0x00, 0x02, // string
            b'@', 0x00, 0x03, 0x00, 0x01, 0x00, 0x01, b'e', 0x00, 0x04, 0x00, 0x05,
        ];
        let mut reader = ClassReader::new(&data);
        skip_annotation_body(&mut reader).unwrap();
        assert!(reader.is_empty());
    }

    #[test]
    fn unknown_element_tag_is_an_error() {
        let data = [0x00, 0x01, 0x00, 0x01, b'x', 0x00, 0x00];
        let mut reader = ClassReader::new(&data);
        assert!(matches!(
            skip_annotation_body(&mut reader),
            Err(ClassParseError::InvalidAnnotation { tag: 'x' })
        ));
    }
}
