//! Decoding of console input lines into method calls.
//!
//! A line is a whitespace-separated sequence of values. Each value is read as
//! JSON; a token that does not start a JSON string, array or object and does
//! not decode as JSON is taken verbatim as a bare string, so `echo hi` and
//! `"echo" "hi"` are the same call. A line holding a single JSON array is read
//! as the element list itself, so `["echo","hi"]` is that call too.

use serde_json::{Deserializer, Value};
use thiserror::Error;

/// Errors raised while decoding a line.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A JSON value on the line could not be decoded.
    #[error("parse error at column {column}: {source}")]
    Malformed {
        /// One-based character column where the offending value starts.
        column: usize,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The first element was not a string.
    #[error("method name must be a string, found {found}")]
    MethodNotString {
        /// JSON rendering of the offending element.
        found: String,
    },
}

/// A decoded method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    elements: Vec<Value>,
}

impl Call {
    /// Method name (element 0).
    #[must_use]
    pub fn method(&self) -> &str {
        self.elements
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Positional arguments (elements 1..n).
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        self.elements.get(1..).unwrap_or_default()
    }

    /// Every element including the method name, as handed to formatters.
    #[must_use]
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }
}

/// Decodes `line`, returning `None` when it holds no values.
///
/// # Errors
///
/// Returns [`ParseError`] when a value is malformed or the method name is not
/// a string.
pub fn parse_line(line: &str) -> Result<Option<Call>, ParseError> {
    let mut elements = decode_values(line)?;
    if let [Value::Array(_)] = elements.as_slice()
        && let Some(Value::Array(inner)) = elements.pop()
    {
        elements = inner;
    }

    match elements.first() {
        None => Ok(None),
        Some(Value::String(_)) => Ok(Some(Call { elements })),
        Some(other) => Err(ParseError::MethodNotString {
            found: other.to_string(),
        }),
    }
}

fn decode_values(line: &str) -> Result<Vec<Value>, ParseError> {
    let mut values = Vec::new();
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        let (value, consumed) = decode_value(line, rest)?;
        values.push(value);
        rest = rest.get(consumed..).unwrap_or_default().trim_start();
    }

    Ok(values)
}

/// Decodes the value at the start of `rest`, returning it with its byte length.
fn decode_value(line: &str, rest: &str) -> Result<(Value, usize), ParseError> {
    let mut stream = Deserializer::from_str(rest).into_iter::<Value>();
    let decoded = stream.next();
    let consumed = stream.byte_offset();

    match decoded {
        Some(Ok(value)) if ends_at_boundary(rest, consumed) => Ok((value, consumed)),
        Some(Err(source)) if starts_structured(rest) => Err(ParseError::Malformed {
            column: column_of(line, rest),
            source,
        }),
        _ => Ok(bare_word(rest)),
    }
}

fn starts_structured(text: &str) -> bool {
    text.starts_with(['"', '[', '{'])
}

/// Structured values may abut the next token; scalars must end at whitespace.
fn ends_at_boundary(text: &str, consumed: usize) -> bool {
    if starts_structured(text) {
        return true;
    }
    text.get(consumed..)
        .and_then(|tail| tail.chars().next())
        .is_none_or(char::is_whitespace)
}

fn bare_word(text: &str) -> (Value, usize) {
    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    let word = text.get(..end).unwrap_or(text);
    (Value::String(word.to_owned()), end)
}

fn column_of(line: &str, rest: &str) -> usize {
    let offset = line.len() - rest.len();
    line.get(..offset).map_or(1, |prefix| prefix.chars().count() + 1)
}
