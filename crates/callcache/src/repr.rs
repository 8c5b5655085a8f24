//! Rendering of call arguments and results into history log entries.
//!
//! Inputs are logged as the literal text of the positional-argument tuple,
//! e.g. `('foo',)` or `(42, 'x')`. Outputs are logged as raw bytes in the
//! same wire form the store uses for values. Replay relies on both shapes.

use bytes::Bytes;
use callcache_store::{float_text, StoredValue};
use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

use crate::error::SerializationError;
use crate::key::CacheKey;

/// Literal text of a single argument.
pub trait LogRepr {
    fn log_repr(&self) -> Result<String, SerializationError>;
}

/// The positional-argument tuple of a call.
pub trait CallArgs {
    fn render_args(&self) -> Result<String, SerializationError>;
}

/// A call result that can be pushed onto an outputs log.
pub trait LogOutput {
    fn log_output(&self) -> Result<Bytes, SerializationError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────────────

/// Whether `c` is written as-is inside a quoted literal.
///
/// Separators and the "other" categories (controls, format characters,
/// private use, unassigned) are escaped; the plain space is the exception.
fn is_printable(c: char) -> bool {
    c == ' '
        || !matches!(
            c.general_category_group(),
            GeneralCategoryGroup::Other | GeneralCategoryGroup::Separator
        )
}

fn push_escaped(out: &mut String, c: char) {
    let code = c as u32;
    let escaped = if code < 0x100 {
        format!("\\x{:02x}", code)
    } else if code < 0x10000 {
        format!("\\u{:04x}", code)
    } else {
        format!("\\U{:08x}", code)
    };
    out.push_str(&escaped);
}

/// Quote text, preferring single quotes unless the text contains one and
/// no double quote.
///
/// Non-printable characters are escaped as `\xNN`, `\uNNNN` or
/// `\UNNNNNNNN` depending on their code point.
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if !is_printable(c) => push_escaped(&mut out, c),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Render a byte sequence as a literal.
///
/// Valid UTF-8 renders exactly like text, so `b"bar"` and `"bar"` log the
/// same. Anything else renders as `b'...'` with `\xNN` escapes.
pub fn quote_bytes(b: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(b) {
        return quote_str(s);
    }

    let mut out = String::with_capacity(b.len() + 3);
    out.push_str("b'");
    for &byte in b {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    out.push('\'');
    out
}

fn finite(f: f64) -> Result<f64, SerializationError> {
    if f.is_finite() {
        Ok(f)
    } else {
        Err(SerializationError::NonFiniteFloat(f))
    }
}

impl LogRepr for StoredValue {
    fn log_repr(&self) -> Result<String, SerializationError> {
        match self {
            StoredValue::Str(s) => Ok(quote_str(s)),
            StoredValue::Bytes(b) => Ok(quote_bytes(b)),
            StoredValue::Int(i) => Ok(i.to_string()),
            StoredValue::Float(f) => finite(*f).map(float_text),
        }
    }
}

impl LogRepr for str {
    fn log_repr(&self) -> Result<String, SerializationError> {
        Ok(quote_str(self))
    }
}

impl LogRepr for String {
    fn log_repr(&self) -> Result<String, SerializationError> {
        Ok(quote_str(self))
    }
}

impl LogRepr for CacheKey {
    fn log_repr(&self) -> Result<String, SerializationError> {
        Ok(quote_str(self.as_str()))
    }
}

impl LogRepr for i64 {
    fn log_repr(&self) -> Result<String, SerializationError> {
        Ok(self.to_string())
    }
}

impl LogRepr for f64 {
    fn log_repr(&self) -> Result<String, SerializationError> {
        finite(*self).map(float_text)
    }
}

impl LogRepr for bool {
    fn log_repr(&self) -> Result<String, SerializationError> {
        Ok(if *self { "True" } else { "False" }.to_owned())
    }
}

impl<T: LogRepr + ?Sized> LogRepr for &T {
    fn log_repr(&self) -> Result<String, SerializationError> {
        (**self).log_repr()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument tuples
// ─────────────────────────────────────────────────────────────────────────────

impl CallArgs for () {
    fn render_args(&self) -> Result<String, SerializationError> {
        Ok("()".to_owned())
    }
}

impl<A: LogRepr> CallArgs for (A,) {
    fn render_args(&self) -> Result<String, SerializationError> {
        Ok(format!("({},)", self.0.log_repr()?))
    }
}

impl<A: LogRepr, B: LogRepr> CallArgs for (A, B) {
    fn render_args(&self) -> Result<String, SerializationError> {
        Ok(format!("({}, {})", self.0.log_repr()?, self.1.log_repr()?))
    }
}

impl<A: LogRepr, B: LogRepr, C: LogRepr> CallArgs for (A, B, C) {
    fn render_args(&self) -> Result<String, SerializationError> {
        Ok(format!(
            "({}, {}, {})",
            self.0.log_repr()?,
            self.1.log_repr()?,
            self.2.log_repr()?
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

impl LogOutput for CacheKey {
    fn log_output(&self) -> Result<Bytes, SerializationError> {
        Ok(Bytes::copy_from_slice(self.as_str().as_bytes()))
    }
}

impl LogOutput for String {
    fn log_output(&self) -> Result<Bytes, SerializationError> {
        Ok(Bytes::copy_from_slice(self.as_bytes()))
    }
}

impl LogOutput for Bytes {
    fn log_output(&self) -> Result<Bytes, SerializationError> {
        Ok(self.clone())
    }
}

impl LogOutput for i64 {
    fn log_output(&self) -> Result<Bytes, SerializationError> {
        Ok(Bytes::from(self.to_string()))
    }
}

impl LogOutput for StoredValue {
    fn log_output(&self) -> Result<Bytes, SerializationError> {
        if let StoredValue::Float(f) = self {
            finite(*f)?;
        }
        Ok(self.to_bytes())
    }
}
