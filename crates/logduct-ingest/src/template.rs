//! Log format template compiler
//!
//! Turns an nginx-style `log_format` string such as
//! `$remote_addr - $remote_user [$time_local] "$request"` into a matcher that
//! recovers the value of every `$name` placeholder from a log line.
//!
//! # Matching rules
//!
//! - Literal text must appear verbatim.
//! - A placeholder followed by literal text captures everything up to the first
//!   occurrence of that literal's first character.
//! - A placeholder at the end of the format captures up to the next space.
//! - The line must match from its start; text after the last field is ignored.

use regex::Regex;
use std::collections::HashSet;

use crate::error::TemplateError;
use crate::reader::RawEntry;

/// nginx `combined` format extended with proxy and timing fields
pub const DEFAULT_LOG_FORMAT: &str = r#"$http_x_forwarded_for $host - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent" $remote_addr $request_time $upstream_response_time"#;

/// One piece of a compiled format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Field(String),
}

/// A named placeholder and its index in [`LogFormatTemplate::tokens`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub position: usize,
}

/// Compiled log format
#[derive(Debug, Clone)]
pub struct LogFormatTemplate {
    source: String,
    tokens: Vec<Token>,
    fields: Vec<FieldDescriptor>,
    pattern: Regex,
}

impl LogFormatTemplate {
    /// Compile a format string
    ///
    /// Fails on an empty format, a `$` without a name, two placeholders with no
    /// literal text between them, or a field name used twice.
    pub fn compile(format: &str) -> Result<Self, TemplateError> {
        if format.is_empty() {
            return Err(TemplateError::Empty);
        }

        let tokens = tokenize(format)?;

        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for (position, token) in tokens.iter().enumerate() {
            if let Token::Field(name) = token {
                if !seen.insert(name.as_str()) {
                    return Err(TemplateError::DuplicateField { name: name.clone() });
                }
                fields.push(FieldDescriptor {
                    name: name.clone(),
                    position,
                });
            }
        }

        let pattern = Regex::new(&build_pattern(&tokens)?)?;

        Ok(Self {
            source: format.to_string(),
            tokens,
            fields,
            pattern,
        })
    }

    /// The format string this template was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Placeholders in format order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Match one line (without its terminator) against the template
    ///
    /// Returns `None` when the line does not have the template's shape.
    pub fn match_line(&self, line: &str) -> Option<RawEntry> {
        let captures = self.pattern.captures(line)?;

        let mut entry = RawEntry::with_capacity(self.fields.len());
        for (group, field) in self.fields.iter().enumerate() {
            // Every group participates in a successful match
            let value = captures.get(group + 1).map_or("", |m| m.as_str());
            entry.insert(field.name.clone(), value.to_string());
        }

        Some(entry)
    }
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

fn tokenize(format: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = format.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }

        let mut name = String::new();
        while let Some(&(_, next)) = chars.peek() {
            let accepted = if name.is_empty() {
                is_name_start(next)
            } else {
                is_name_char(next)
            };
            if !accepted {
                break;
            }
            name.push(next);
            chars.next();
        }

        if name.is_empty() {
            return Err(TemplateError::MalformedPlaceholder { position });
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        tokens.push(Token::Field(name));
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    Ok(tokens)
}

fn build_pattern(tokens: &[Token]) -> Result<String, TemplateError> {
    let mut pattern = String::from("^");

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Literal(text) => pattern.push_str(&regex::escape(text)),
            Token::Field(name) => match tokens.get(i + 1) {
                Some(Token::Literal(next)) => {
                    // Literal tokens are never empty
                    let stop = next.chars().next().map(String::from).unwrap_or_default();
                    pattern.push_str("([^");
                    pattern.push_str(&regex::escape(&stop));
                    pattern.push_str("]*)");
                },
                Some(Token::Field(second)) => {
                    return Err(TemplateError::AdjacentPlaceholders {
                        first: name.clone(),
                        second: second.clone(),
                    });
                },
                None => pattern.push_str("([^ ]*)"),
            },
        }
    }

    Ok(pattern)
}
