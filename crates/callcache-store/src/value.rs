//! Values accepted by the store.

use bytes::Bytes;

/// A primitive value that can be written under a key.
///
/// The store keeps every value in its textual wire form: strings as UTF-8,
/// byte sequences verbatim, integers and floats as decimal text. Reading a
/// value back therefore always yields bytes; the caller decides how to
/// decode them.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Str(String),
    Bytes(Bytes),
    Int(i64),
    Float(f64),
}

impl StoredValue {
    /// Short name of the value kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoredValue::Str(_) => "string",
            StoredValue::Bytes(_) => "bytes",
            StoredValue::Int(_) => "integer",
            StoredValue::Float(_) => "float",
        }
    }

    /// The bytes persisted for this value.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            StoredValue::Str(s) => Bytes::copy_from_slice(s.as_bytes()),
            StoredValue::Bytes(b) => b.clone(),
            StoredValue::Int(i) => Bytes::from(i.to_string()),
            StoredValue::Float(f) => Bytes::from(float_text(*f)),
        }
    }
}

/// Decimal text for a float, in the shortest form that reads back exactly.
///
/// Values with a decimal exponent in `-4..16` are written positionally and
/// keep a trailing `.0` when integral (`1.0`, not `1`). Anything else uses
/// scientific notation with a signed, two-digit minimum exponent (`1e+20`,
/// `1.5e-07`). Non-finite values are `inf`, `-inf` and `nan`.
pub fn float_text(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_owned();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. `-1.5e-7`.
    let sci = format!("{:e}", f);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if !(-4..16).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exp.unsigned_abs());
    }

    let (neg, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let body = if exp < 0 {
        format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
    } else {
        let point = exp as usize + 1;
        if digits.len() <= point {
            format!("{}{}.0", digits, "0".repeat(point - digits.len()))
        } else {
            format!("{}.{}", &digits[..point], &digits[point..])
        }
    };
    format!("{}{}", neg, body)
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        StoredValue::Str(s.to_owned())
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        StoredValue::Str(s)
    }
}

impl From<&[u8]> for StoredValue {
    fn from(b: &[u8]) -> Self {
        StoredValue::Bytes(Bytes::copy_from_slice(b))
    }
}

impl<const N: usize> From<&[u8; N]> for StoredValue {
    fn from(b: &[u8; N]) -> Self {
        StoredValue::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(b: Vec<u8>) -> Self {
        StoredValue::Bytes(Bytes::from(b))
    }
}

impl From<Bytes> for StoredValue {
    fn from(b: Bytes) -> Self {
        StoredValue::Bytes(b)
    }
}

impl From<i64> for StoredValue {
    fn from(i: i64) -> Self {
        StoredValue::Int(i)
    }
}

impl From<i32> for StoredValue {
    fn from(i: i32) -> Self {
        StoredValue::Int(i64::from(i))
    }
}

impl From<f64> for StoredValue {
    fn from(f: f64) -> Self {
        StoredValue::Float(f)
    }
}
