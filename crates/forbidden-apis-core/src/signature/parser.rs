//! Line-oriented signature text parser.
//!
//! ```text
//! # comment
//! @defaultMessage Use the Charset-taking overloads
//! java.lang.String#getBytes()
//! java.lang.System#exit(int) do not exit the JVM
//! java.lang.Thread @ use an executor
//! sun.misc.**
//! @com.example.Internal only for internal callers
//! @includeBundled jdk-unsafe
//! @ignoreUnresolvable
//! ```

use super::model::Signature;
use crate::classfile::descriptor::java_type_to_descriptor;
use thiserror::Error;

/// A malformed line, with the source identity and 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{origin}:{line}: {kind}")]
pub struct SignatureParseError {
    /// File path, `inline`, or bundled catalog name.
    pub origin: String,
    /// 1-based line number.
    pub line: usize,
    /// What was wrong.
    pub kind: ParseErrorKind,
}

/// The specific syntax problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The class part is not a dotted binary name or glob.
    #[error("invalid class name '{0}' (expected a dotted binary name such as java.lang.String)")]
    InvalidClassName(String),
    /// Nothing after `#`.
    #[error("missing member name in '{0}'")]
    EmptyMember(String),
    /// The member part is not an identifier.
    #[error("invalid member name '{0}'")]
    InvalidMember(String),
    /// Parameter list is not closed, or closed twice.
    #[error("unbalanced parentheses in '{0}'")]
    UnbalancedParens(String),
    /// A parameter is not a Java type.
    #[error("invalid parameter type '{0}'")]
    InvalidParameter(String),
    /// More than one `#`.
    #[error("more than one '#' in '{0}'")]
    MultipleMemberSeparators(String),
    /// An `@word` that is neither a directive nor an annotation name.
    #[error("unknown directive '{0}'")]
    UnknownDirective(String),
    /// `@includeBundled` without a name.
    #[error("@includeBundled requires a catalog name")]
    MissingBundledName,
}

/// One meaningful line of a signature source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A forbidden-API rule.
    Rule {
        /// The parsed rule.
        signature: Signature,
        /// Set when an earlier `@ignoreUnresolvable` applies.
        ignore_unresolvable: bool,
        /// 1-based line number.
        line: usize,
    },
    /// `@includeBundled <name>`.
    IncludeBundled {
        /// Catalog name, possibly with a version suffix.
        name: String,
        /// Set when an earlier `@ignoreUnresolvable` applies.
        ignore_unresolvable: bool,
        /// 1-based line number.
        line: usize,
    },
}

/// Parses a complete source. Any malformed line fails the whole source.
///
/// # Errors
///
/// Returns the first [`SignatureParseError`] encountered.
pub fn parse_signatures(origin: &str, text: &str) -> Result<Vec<Entry>, SignatureParseError> {
    let mut default_message = String::new();
    let mut ignore_unresolvable = false;
    let mut entries = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fail = |kind| SignatureParseError {
            origin: origin.to_string(),
            line,
            kind,
        };

        if let Some(directive) = trimmed.strip_prefix('@') {
            let (word, rest) = split_word(directive);
            match word {
                "defaultMessage" => default_message = rest.to_string(),
                "ignoreUnresolvable" => ignore_unresolvable = true,
                "includeBundled" => {
                    if rest.is_empty() {
                        return Err(fail(ParseErrorKind::MissingBundledName));
                    }
                    entries.push(Entry::IncludeBundled {
                        name: rest.to_string(),
                        ignore_unresolvable,
                        line,
                    });
                }
                annotation if annotation.contains('.') => {
                    validate_class_pattern(annotation).map_err(fail)?;
                    let reason = reason_or_default(rest, &default_message);
                    entries.push(Entry::Rule {
                        signature: Signature::annotated(annotation, reason),
                        ignore_unresolvable,
                        line,
                    });
                }
                other => {
                    return Err(fail(ParseErrorKind::UnknownDirective(format!("@{other}"))));
                }
            }
            continue;
        }

        let (token, rest) = split_rule(trimmed);
        let reason = reason_or_default(rest, &default_message);
        let signature = parse_rule(token, reason).map_err(fail)?;
        entries.push(Entry::Rule {
            signature,
            ignore_unresolvable,
            line,
        });
    }

    Ok(entries)
}

fn split_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim()),
        None => (text, ""),
    }
}

/// Splits at the first whitespace outside a parameter list.
fn split_rule(line: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (i, c) in line.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => return (&line[..i], &line[i..]),
            _ => {}
        }
    }
    (line, "")
}

fn reason_or_default(rest: &str, default_message: &str) -> String {
    let rest = rest.trim();
    let rest = rest.strip_prefix('@').map_or(rest, str::trim);
    if rest.is_empty() {
        default_message.to_string()
    } else {
        rest.to_string()
    }
}

fn parse_rule(token: &str, reason: String) -> Result<Signature, ParseErrorKind> {
    let Some((owner, member)) = token.split_once('#') else {
        validate_class_pattern(token)?;
        return Ok(Signature::class(token, reason));
    };
    validate_class_pattern(owner)?;
    if member.contains('#') {
        return Err(ParseErrorKind::MultipleMemberSeparators(token.to_string()));
    }

    let Some(open) = member.find('(') else {
        validate_member(member, token)?;
        return Ok(Signature::field(owner, member, reason));
    };

    let name = &member[..open];
    validate_member(name, token)?;
    let inner = member[open + 1..]
        .strip_suffix(')')
        .filter(|inner| !inner.contains('(') && !inner.contains(')'))
        .ok_or_else(|| ParseErrorKind::UnbalancedParens(token.to_string()))?;

    let mut params = String::from("(");
    if !inner.trim().is_empty() {
        for param in inner.split(',') {
            let descriptor = java_type_to_descriptor(param)
                .ok_or_else(|| ParseErrorKind::InvalidParameter(param.trim().to_string()))?;
            params.push_str(&descriptor);
        }
    }
    params.push(')');
    Ok(Signature::method(owner, name, params, reason))
}

fn validate_class_pattern(pattern: &str) -> Result<(), ParseErrorKind> {
    let valid = pattern.split('.').all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '*')
    });
    if valid {
        Ok(())
    } else {
        Err(ParseErrorKind::InvalidClassName(pattern.to_string()))
    }
}

fn validate_member(name: &str, token: &str) -> Result<(), ParseErrorKind> {
    if name.is_empty() {
        return Err(ParseErrorKind::EmptyMember(token.to_string()));
    }
    if name == "<init>" || name == "<clinit>" {
        return Ok(());
    }
    if name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    {
        Ok(())
    } else {
        Err(ParseErrorKind::InvalidMember(name.to_string()))
    }
}
