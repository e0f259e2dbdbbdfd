//! Parsing of TYPE and VALUE tokens for command-line calls
//!
//! # Token forms
//!
//! ```text
//! i32 | int | int32          32-bit signed integer
//! u64 | uint64               64-bit unsigned integer
//! f32 | float | float32      32-bit float
//! f64 | double | float64     64-bit float
//! usize | size_t             pointer-sized unsigned integer
//! cstr | str | string        NUL-terminated string
//! ptr | pointer              raw address (null/NULL/nil/0 for NULL)
//! out:KIND                   out-parameter, no value token
//! out:cstr                   string out-parameter, no value token
//! arr:KIND VALUES            input array, value is a comma list (or null)
//! out_arr:KIND:N             out-array of N elements, no value token
//! void                       return type only
//! ```
//!
//! Callback arguments are not expressible as tokens; they exist only in
//! the library API.

use crate::bridge::{CStrOwnership, ParamKind, Value};

/// Token-level parse failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownType(String),
    /// `void` used where an argument is required
    VoidArgument,
    MissingValue { type_token: String },
    InvalidValue { token: String, expected: &'static str },
    InvalidOutArrayLen(String),
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownType(t) => write!(f, "unknown type: {}", t),
            Self::VoidArgument => write!(f, "void cannot be used as an argument type"),
            Self::MissingValue { type_token } => {
                write!(f, "missing value for argument of type {}", type_token)
            }
            Self::InvalidValue { token, expected } => {
                write!(f, "invalid {} value: {}", expected, token)
            }
            Self::InvalidOutArrayLen(t) => write!(f, "invalid out-array length in: {}", t),
        }
    }
}

impl std::error::Error for ParseError {}

/// Scalar kind for a bare type token
fn scalar_kind(tok: &str) -> Option<ParamKind> {
    match tok {
        "i32" | "int" | "int32" => Some(ParamKind::I32),
        "u64" | "uint64" => Some(ParamKind::U64),
        "f32" | "float" | "float32" => Some(ParamKind::F32),
        "f64" | "double" | "float64" => Some(ParamKind::F64),
        "usize" | "size_t" => Some(ParamKind::USize),
        _ => None,
    }
}

/// Parse a return type token; empty or absent means void.
pub fn parse_return_type(tok: &str) -> Result<ParamKind, ParseError> {
    if tok.is_empty() || tok == "void" {
        return Ok(ParamKind::Void);
    }
    if let Some(kind) = scalar_kind(tok) {
        return Ok(kind);
    }
    match tok {
        "cstr" | "str" | "string" => Ok(ParamKind::CStr(CStrOwnership::Borrowed)),
        "ptr" | "pointer" => Ok(ParamKind::Ptr),
        other => Err(ParseError::UnknownType(other.to_string())),
    }
}

/// Parse TYPE VALUE argument tokens into kinds and host values.
///
/// Out-parameter and out-array tokens consume no value token; everything
/// else consumes exactly one.
pub fn parse_args(tokens: &[String]) -> Result<Vec<(ParamKind, Value)>, ParseError> {
    let mut pairs = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let type_tok = tokens[i].as_str();
        i += 1;

        if type_tok == "void" {
            return Err(ParseError::VoidArgument);
        }

        // Output forms take no value token
        if let Some(inner) = type_tok.strip_prefix("out_arr:") {
            pairs.push((parse_out_array(type_tok, inner)?, Value::Unit));
            continue;
        }
        if let Some(inner) = type_tok.strip_prefix("out:") {
            pairs.push((parse_out(inner)?, Value::Unit));
            continue;
        }

        if i >= tokens.len() {
            return Err(ParseError::MissingValue {
                type_token: type_tok.to_string(),
            });
        }
        let value_tok = tokens[i].as_str();
        i += 1;

        pairs.push(parse_pair(type_tok, value_tok)?);
    }

    Ok(pairs)
}

fn parse_out(inner: &str) -> Result<ParamKind, ParseError> {
    if matches!(inner, "cstr" | "str" | "string") {
        return Ok(ParamKind::OutCStr);
    }
    match scalar_kind(inner) {
        Some(kind) => Ok(ParamKind::OutParam(Box::new(kind))),
        None if matches!(inner, "ptr" | "pointer") => {
            Ok(ParamKind::OutParam(Box::new(ParamKind::Ptr)))
        }
        None => Err(ParseError::UnknownType(format!("out:{inner}"))),
    }
}

fn parse_out_array(full: &str, inner: &str) -> Result<ParamKind, ParseError> {
    let (elem_tok, len_tok) = inner
        .split_once(':')
        .ok_or_else(|| ParseError::InvalidOutArrayLen(full.to_string()))?;
    let elem =
        scalar_kind(elem_tok).ok_or_else(|| ParseError::UnknownType(elem_tok.to_string()))?;
    let len: usize = len_tok
        .parse()
        .map_err(|_| ParseError::InvalidOutArrayLen(full.to_string()))?;
    Ok(ParamKind::OutArray(Box::new(elem), len))
}

fn parse_pair(type_tok: &str, value_tok: &str) -> Result<(ParamKind, Value), ParseError> {
    if let Some(elem_tok) = type_tok.strip_prefix("arr:") {
        let elem =
            scalar_kind(elem_tok).ok_or_else(|| ParseError::UnknownType(elem_tok.to_string()))?;
        if is_null_token(value_tok) {
            // Length is still part of the declared kind; null arrays keep 0
            return Ok((ParamKind::Array(Box::new(elem), 0), Value::Null));
        }
        let items: Result<Vec<Value>, ParseError> = value_tok
            .split(',')
            .map(|t| coerce_scalar(&elem, t.trim()))
            .collect();
        let items = items?;
        return Ok((ParamKind::Array(Box::new(elem), items.len()), Value::Array(items)));
    }

    if let Some(kind) = scalar_kind(type_tok) {
        let value = coerce_scalar(&kind, value_tok)?;
        return Ok((kind, value));
    }

    match type_tok {
        "cstr" | "str" | "string" => {
            let value = if is_null_token(value_tok) {
                Value::Null
            } else {
                Value::Str(strip_quotes(value_tok).to_string())
            };
            Ok((ParamKind::CStr(CStrOwnership::Borrowed), value))
        }
        "ptr" | "pointer" => {
            let value = if is_null_token(value_tok) {
                Value::Null
            } else {
                let addr: usize = value_tok.parse().map_err(|_| ParseError::InvalidValue {
                    token: value_tok.to_string(),
                    expected: "pointer",
                })?;
                Value::Ptr(addr)
            };
            Ok((ParamKind::Ptr, value))
        }
        other => Err(ParseError::UnknownType(other.to_string())),
    }
}

fn coerce_scalar(kind: &ParamKind, tok: &str) -> Result<Value, ParseError> {
    let invalid = |expected: &'static str| ParseError::InvalidValue {
        token: tok.to_string(),
        expected,
    };
    match kind {
        ParamKind::I32 => tok.parse().map(Value::I32).map_err(|_| invalid("i32")),
        ParamKind::U64 => tok.parse().map(Value::U64).map_err(|_| invalid("u64")),
        ParamKind::F32 => tok.parse().map(Value::F32).map_err(|_| invalid("f32")),
        ParamKind::F64 => tok.parse().map(Value::F64).map_err(|_| invalid("f64")),
        ParamKind::USize => tok.parse().map(Value::USize).map_err(|_| invalid("usize")),
        other => unreachable!("non-scalar kind {other:?} in scalar coercion"),
    }
}

fn is_null_token(tok: &str) -> bool {
    matches!(tok, "null" | "NULL" | "nil" | "0x0")
}

fn strip_quotes(tok: &str) -> &str {
    let b = tok.as_bytes();
    if b.len() >= 2
        && ((b[0] == b'"' && b[b.len() - 1] == b'"') || (b[0] == b'\'' && b[b.len() - 1] == b'\''))
    {
        &tok[1..tok.len() - 1]
    } else {
        tok
    }
}
