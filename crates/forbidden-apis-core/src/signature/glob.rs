//! Wildcard patterns over dotted class names.
//!
//! - `*` matches any run of characters except `.`
//! - `**` matches any run of characters including `.`
//!
//! So `**.Unsafe` matches `sun.misc.Unsafe` but not `com.foo.UnsafeHolder`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(Vec<u8>),
    Star,
    DoubleStar,
}

/// A compiled class-name glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassGlob {
    raw: String,
    tokens: Vec<Token>,
}

impl ClassGlob {
    /// Compiles a pattern. Every pattern is valid.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let bytes = pattern.as_bytes();
        let mut tokens = Vec::new();
        let mut literal = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'*' {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                if bytes.get(i + 1) == Some(&b'*') {
                    i += 2;
                    // `***` collapses to `**`
                    while bytes.get(i) == Some(&b'*') {
                        i += 1;
                    }
                    tokens.push(Token::DoubleStar);
                } else {
                    i += 1;
                    tokens.push(Token::Star);
                }
            } else {
                literal.push(bytes[i]);
                i += 1;
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        Self {
            raw: pattern.to_string(),
            tokens,
        }
    }

    /// Whether `pattern` contains wildcards at all.
    #[must_use]
    pub fn is_glob(pattern: &str) -> bool {
        pattern.contains('*')
    }

    /// Tests a dotted class name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match_tokens(&self.tokens, name.as_bytes())
    }

    /// The source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ClassGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn match_tokens(tokens: &[Token], name: &[u8]) -> bool {
    let Some((first, rest)) = tokens.split_first() else {
        return name.is_empty();
    };

    match first {
        Token::Literal(lit) => name
            .strip_prefix(lit.as_slice())
            .is_some_and(|tail| match_tokens(rest, tail)),
        Token::DoubleStar => (0..=name.len()).any(|i| match_tokens(rest, &name[i..])),
        Token::Star => {
            let limit = name.iter().position(|b| *b == b'.').unwrap_or(name.len());
            (0..=limit).any(|i| match_tokens(rest, &name[i..]))
        }
    }
}
