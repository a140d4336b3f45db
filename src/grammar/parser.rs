//! Recursive-descent parser for type strings (spec.md §4.C).
//!
//! The splitter is depth-counting and quote-aware: parentheses nest, commas
//! and top-level whitespace are significant only at depth 0, and anything
//! inside a single-quoted string (with `\\`, `\'`, `\t`, `\n`, `\xHH` escapes)
//! never affects depth.

use crate::error::{CodecError, CodecResult};
use crate::grammar::types::{
    DecimalWidth, EnumMember, EnumWidth, JsonPath, ScalarType, TupleElement, TypeExpr,
};

pub fn parse_type(input: &str) -> CodecResult<TypeExpr> {
    let s = input.trim();
    if s.is_empty() {
        return Err(CodecError::grammar(input, "empty type string"));
    }

    let (name, args) = split_name_and_args(s)?;

    match name {
        "Int8" => scalar(ScalarType::Int8, args, input),
        "Int16" => scalar(ScalarType::Int16, args, input),
        "Int32" => scalar(ScalarType::Int32, args, input),
        "Int64" => scalar(ScalarType::Int64, args, input),
        "Int128" => scalar(ScalarType::Int128, args, input),
        "Int256" => scalar(ScalarType::Int256, args, input),
        "UInt8" => scalar(ScalarType::UInt8, args, input),
        "UInt16" => scalar(ScalarType::UInt16, args, input),
        "UInt32" => scalar(ScalarType::UInt32, args, input),
        "UInt64" => scalar(ScalarType::UInt64, args, input),
        "UInt128" => scalar(ScalarType::UInt128, args, input),
        "UInt256" => scalar(ScalarType::UInt256, args, input),
        "Float32" => scalar(ScalarType::Float32, args, input),
        "Float64" => scalar(ScalarType::Float64, args, input),
        "Bool" | "Boolean" => scalar(ScalarType::Bool, args, input),
        "String" => scalar(ScalarType::String, args, input),
        "Date" => scalar(ScalarType::Date, args, input),
        "Date32" => scalar(ScalarType::Date32, args, input),
        "DateTime" => scalar(ScalarType::DateTime, args, input),
        "UUID" => scalar(ScalarType::Uuid, args, input),
        "IPv4" => scalar(ScalarType::IPv4, args, input),
        "IPv6" => scalar(ScalarType::IPv6, args, input),

        "FixedString" => {
            let args = require_args(args, input)?;
            let parts = split_top_level(args, b',');
            if parts.len() != 1 {
                return Err(CodecError::grammar(input, "FixedString takes exactly one argument"));
            }
            let n: u32 = parts[0].trim().parse().map_err(|_| {
                CodecError::grammar(input, "FixedString length must be a positive integer")
            })?;
            if n < 1 {
                return Err(CodecError::grammar(input, "FixedString(N) requires N >= 1"));
            }
            Ok(TypeExpr::Scalar(ScalarType::FixedString(n)))
        }

        "DateTime64" => {
            let args = require_args(args, input)?;
            let parts = split_top_level(args, b',');
            if parts.is_empty() || parts.len() > 2 {
                return Err(CodecError::grammar(input, "DateTime64 takes 1 or 2 arguments"));
            }
            let precision: u8 = parts[0].trim().parse().map_err(|_| {
                CodecError::grammar(input, "DateTime64 precision must be an integer")
            })?;
            if precision > 9 {
                return Err(CodecError::grammar(input, "DateTime64 precision must be 0..=9"));
            }
            let tz = if parts.len() == 2 {
                Some(parse_quoted_string(parts[1].trim(), input)?)
            } else {
                None
            };
            Ok(TypeExpr::Scalar(ScalarType::DateTime64 { precision, tz }))
        }

        "Decimal" | "Decimal32" | "Decimal64" | "Decimal128" | "Decimal256" => {
            let args = require_args(args, input)?;
            let parts = split_top_level(args, b',');
            if parts.len() != 2 {
                return Err(CodecError::grammar(input, "Decimal takes exactly (precision, scale)"));
            }
            let precision: u16 = parts[0].trim().parse().map_err(|_| {
                CodecError::grammar(input, "Decimal precision must be an integer")
            })?;
            let scale: u16 = parts[1].trim().parse().map_err(|_| {
                CodecError::grammar(input, "Decimal scale must be an integer")
            })?;
            let width = match name {
                "Decimal32" => DecimalWidth::Bits32,
                "Decimal64" => DecimalWidth::Bits64,
                "Decimal128" => DecimalWidth::Bits128,
                "Decimal256" => DecimalWidth::Bits256,
                _ => DecimalWidth::for_precision(precision),
            };
            Ok(TypeExpr::Scalar(ScalarType::Decimal { precision, scale, width }))
        }

        "Enum8" | "Enum16" => {
            let args = require_args(args, input)?;
            let width = if name == "Enum8" { EnumWidth::Bits8 } else { EnumWidth::Bits16 };
            let (lo, hi) = match width {
                EnumWidth::Bits8 => (-128i32, 127i32),
                EnumWidth::Bits16 => (-32768i32, 32767i32),
            };
            let parts = split_top_level(args, b',');
            if parts.is_empty() {
                return Err(CodecError::grammar(input, "empty Enum definition is rejected"));
            }
            let mut members = Vec::with_capacity(parts.len());
            let mut seen_names = std::collections::HashSet::new();
            let mut seen_values = std::collections::HashSet::new();
            for part in parts {
                let eq = find_top_level_byte(part, b'=')
                    .ok_or_else(|| CodecError::grammar(input, "enum member missing '='"))?;
                let name_str = parse_quoted_string(part[..eq].trim(), input)?;
                let value: i32 = part[eq + 1..].trim().parse().map_err(|_| {
                    CodecError::grammar(input, "enum value must be a signed integer")
                })?;
                if value < lo || value > hi {
                    return Err(CodecError::grammar(
                        input,
                        format!("enum value {value} out of range [{lo}, {hi}]"),
                    ));
                }
                if !seen_names.insert(name_str.clone()) {
                    return Err(CodecError::grammar(input, "duplicate enum name"));
                }
                if !seen_values.insert(value) {
                    return Err(CodecError::grammar(input, "duplicate enum value"));
                }
                members.push(EnumMember { name: name_str, value });
            }
            Ok(TypeExpr::Scalar(ScalarType::Enum { width, members }))
        }

        "Array" => {
            let args = require_args(args, input)?;
            Ok(TypeExpr::Array(Box::new(parse_type(args)?)))
        }

        "Nullable" => {
            let args = require_args(args, input)?;
            Ok(TypeExpr::Nullable(Box::new(parse_type(args)?)))
        }

        "LowCardinality" => {
            let args = require_args(args, input)?;
            Ok(TypeExpr::LowCardinality(Box::new(parse_type(args)?)))
        }

        "Map" => {
            let args = require_args(args, input)?;
            let parts = split_top_level(args, b',');
            if parts.len() != 2 {
                return Err(CodecError::grammar(input, "Map takes exactly two type arguments"));
            }
            let k = parse_type(parts[0])?;
            let v = parse_type(parts[1])?;
            Ok(TypeExpr::Map(Box::new(k), Box::new(v)))
        }

        "Tuple" => {
            let args = require_args(args, input)?;
            let elems = parse_elements(args, input)?;
            Ok(TypeExpr::Tuple(elems))
        }

        "Nested" => {
            let args = require_args(args, input)?;
            let elems = parse_elements(args, input)?;
            for e in &elems {
                if e.name.is_none() {
                    return Err(CodecError::grammar(input, "Nested(...) elements must be named"));
                }
            }
            Ok(TypeExpr::Nested(elems))
        }

        "Variant" => {
            let args = require_args(args, input)?;
            let parts = split_top_level(args, b',');
            if parts.is_empty() {
                return Err(CodecError::grammar(input, "Variant requires at least one type"));
            }
            let types = parts
                .into_iter()
                .map(parse_type)
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(TypeExpr::Variant(types))
        }

        "Dynamic" => {
            let max_types = match args {
                None => None,
                Some(args) => {
                    let parts = split_top_level(args, b',');
                    let mut max_types = None;
                    for part in parts {
                        if let Some((k, v)) = split_setting(part) {
                            if k == "max_types" {
                                max_types = Some(v.parse().map_err(|_| {
                                    CodecError::grammar(input, "max_types must be an integer")
                                })?);
                            }
                        }
                    }
                    max_types
                }
            };
            Ok(TypeExpr::Dynamic { max_types })
        }

        "JSON" => {
            let mut paths = Vec::new();
            let mut max_dynamic_paths = None;
            if let Some(args) = args {
                for part in split_top_level(args, b',') {
                    if let Some((k, v)) = split_setting(part) {
                        if k == "max_dynamic_paths" {
                            max_dynamic_paths = Some(v.parse().map_err(|_| {
                                CodecError::grammar(input, "max_dynamic_paths must be an integer")
                            })?);
                        }
                        // unknown settings are ignored per spec.md §4.C
                        continue;
                    }
                    let space = first_top_level_space(part).ok_or_else(|| {
                        CodecError::grammar(input, "JSON path entry must be 'path Type'")
                    })?;
                    let path = part[..space].trim().to_string();
                    let ty = parse_type(part[space + 1..].trim())?;
                    paths.push(JsonPath { path, ty });
                }
            }
            Ok(TypeExpr::Json { paths, max_dynamic_paths })
        }

        // Unknown type string: falls back to the alternate row-oriented
        // encoder rather than failing the whole parse (spec.md §4.F).
        _ => Ok(TypeExpr::Scalar(ScalarType::Unknown(s.to_string()))),
    }
}

fn scalar(ty: ScalarType, args: Option<&str>, input: &str) -> CodecResult<TypeExpr> {
    if args.is_some() {
        return Err(CodecError::grammar(input, format!("{ty} takes no arguments")));
    }
    Ok(TypeExpr::Scalar(ty))
}

fn require_args<'a>(args: Option<&'a str>, input: &str) -> CodecResult<&'a str> {
    args.ok_or_else(|| CodecError::grammar(input, "missing required argument list"))
}

fn split_setting(part: &str) -> Option<(&str, &str)> {
    let eq = find_top_level_byte(part, b'=')?;
    let key = part[..eq].trim();
    if key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') && !key.is_empty() {
        Some((key, part[eq + 1..].trim()))
    } else {
        None
    }
}

fn parse_elements(args: &str, input: &str) -> CodecResult<Vec<TupleElement>> {
    let parts = split_top_level(args, b',');
    if parts.is_empty() {
        return Err(CodecError::grammar(input, "element list requires at least one entry"));
    }
    let mut elems = Vec::with_capacity(parts.len());
    let mut named: Option<bool> = None;
    for part in parts {
        let part = part.trim();
        let (name, ty_str) = match first_top_level_space(part) {
            Some(idx) => (Some(part[..idx].trim().to_string()), part[idx + 1..].trim()),
            None => (None, part),
        };
        let is_named = name.is_some();
        match named {
            None => named = Some(is_named),
            Some(prev) if prev != is_named => {
                return Err(CodecError::grammar(input, "mixed named/unnamed elements"));
            }
            _ => {}
        }
        elems.push(TupleElement { name, ty: parse_type(ty_str)? });
    }
    Ok(elems)
}

/// Splits `Name(args)` into `("Name", Some("args"))`, or `("Name", None)` for
/// a bare name with no parentheses. The whole input must be consumed: a
/// trailing `)` must land exactly at the end of `s`.
fn split_name_and_args(s: &str) -> CodecResult<(&str, Option<&str>)> {
    match s.find('(') {
        None => Ok((s, None)),
        Some(open) => {
            let close = matching_paren(s.as_bytes(), open)
                .ok_or_else(|| CodecError::grammar(s, "unbalanced parentheses"))?;
            if close != s.len() - 1 {
                return Err(CodecError::grammar(s, "trailing characters after type"));
            }
            let name = s[..open].trim();
            let args = &s[open + 1..close];
            Ok((name, Some(args)))
        }
    }
}

/// Index of the `)` matching the `(` at `open`, skipping over quoted regions.
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if in_quote {
            if b == b'\\' {
                i += 1; // skip escaped char
            } else if b == b'\'' {
                in_quote = false;
            }
        } else {
            match b {
                b'\'' => in_quote = true,
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Splits `s` on `sep` at paren-depth 0, outside quoted regions.
fn split_top_level(s: &str, sep: u8) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0usize;
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if in_quote {
            if b == b'\\' {
                i += 1;
            } else if b == b'\'' {
                in_quote = false;
            }
        } else {
            match b {
                b'\'' => in_quote = true,
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ if b == sep && depth == 0 => {
                    out.push(s[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
        i += 1;
    }
    out.push(s[start..].trim());
    out
}

fn find_top_level_byte(s: &str, target: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if in_quote {
            if b == b'\\' {
                i += 1;
            } else if b == b'\'' {
                in_quote = false;
            }
        } else {
            match b {
                b'\'' => in_quote = true,
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ if b == target && depth == 0 => return Some(i),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

fn first_top_level_space(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if in_quote {
            if b == b'\\' {
                i += 1;
            } else if b == b'\'' {
                in_quote = false;
            }
        } else {
            match b {
                b'\'' => in_quote = true,
                b'(' => depth += 1,
                b')' => depth -= 1,
                b' ' if depth == 0 => return Some(i),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Unescapes a single-quoted string literal: `\\`, `\'`, `\t`, `\n`, `\xHH`.
fn parse_quoted_string(s: &str, input: &str) -> CodecResult<String> {
    let s = s.trim();
    if s.len() < 2 || !s.starts_with('\'') || !s.ends_with('\'') {
        return Err(CodecError::grammar(input, "expected a single-quoted string"));
    }
    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let bytes = inner.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            match bytes[i + 1] {
                b'\\' => {
                    out.push('\\');
                    i += 2;
                }
                b'\'' => {
                    out.push('\'');
                    i += 2;
                }
                b't' => {
                    out.push('\t');
                    i += 2;
                }
                b'n' => {
                    out.push('\n');
                    i += 2;
                }
                b'x' if i + 3 < bytes.len() => {
                    let hex = std::str::from_utf8(&bytes[i + 2..i + 4])
                        .map_err(|_| CodecError::grammar(input, "invalid \\xHH escape"))?;
                    let byte = u8::from_str_radix(hex, 16)
                        .map_err(|_| CodecError::grammar(input, "invalid \\xHH escape"))?;
                    out.push(byte as char);
                    i += 4;
                }
                other => {
                    out.push(other as char);
                    i += 2;
                }
            }
        } else {
            let ch = inner[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_parametric_types() {
        let ty = parse_type("Array(Nullable(LowCardinality(String)))").unwrap();
        assert_eq!(ty.to_string(), "Array(Nullable(LowCardinality(String)))");
    }

    #[test]
    fn parses_map_of_tuple() {
        let ty = parse_type("Map(String, Tuple(k UInt64, v Array(Int32)))").unwrap();
        match ty {
            TypeExpr::Map(k, v) => {
                assert_eq!(*k, TypeExpr::Scalar(ScalarType::String));
                assert_eq!(v.to_string(), "Tuple(k UInt64, v Array(Int32))");
            }
            _ => panic!("expected Map"),
        }
    }

    #[test]
    fn rejects_mixed_named_tuple() {
        let err = parse_type("Tuple(a UInt8, UInt8)").unwrap_err();
        assert!(matches!(err, CodecError::GrammarError { .. }));
    }

    #[test]
    fn enum_parses_escapes_and_rejects_duplicates() {
        let ty = parse_type("Enum8('a\\'b' = 1, 'c' = 2)").unwrap();
        match ty {
            TypeExpr::Scalar(ScalarType::Enum { members, .. }) => {
                assert_eq!(members[0].name, "a'b");
                assert_eq!(members[1].value, 2);
            }
            _ => panic!("expected Enum8"),
        }
        assert!(parse_type("Enum8('a' = 1, 'a' = 2)").is_err());
        assert!(parse_type("Enum8()").is_err());
    }

    #[test]
    fn datetime64_precision_and_timezone() {
        let ty = parse_type("DateTime64(3, 'UTC')").unwrap();
        assert_eq!(ty.to_string(), "DateTime64(3, 'UTC')");
        assert!(parse_type("DateTime64(10)").is_err());
    }

    #[test]
    fn decimal_width_selected_by_precision() {
        let ty = parse_type("Decimal(20, 4)").unwrap();
        match ty {
            TypeExpr::Scalar(ScalarType::Decimal { width, .. }) => {
                assert_eq!(width, DecimalWidth::Bits128)
            }
            _ => panic!("expected Decimal"),
        }
    }

    #[test]
    fn unknown_type_falls_back() {
        let ty = parse_type("SomeExoticType(1, 2)").unwrap();
        assert!(matches!(ty, TypeExpr::Scalar(ScalarType::Unknown(_))));
    }

    #[test]
    fn json_with_typed_paths_and_settings() {
        let ty = parse_type("JSON(a.b UInt64, max_dynamic_paths=10, unknown_setting=1)").unwrap();
        match ty {
            TypeExpr::Json { paths, max_dynamic_paths } => {
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0].path, "a.b");
                assert_eq!(max_dynamic_paths, Some(10));
            }
            _ => panic!("expected JSON"),
        }
    }
}
