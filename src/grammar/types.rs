//! The type-expression tree (spec.md §3, §4.C).

use std::fmt;

/// Bit width used to store an `Enum8`/`Enum16` column (spec.md §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumWidth {
    Bits8,
    Bits16,
}

/// One `name = value` pair of an `Enum8`/`Enum16` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: i32,
}

/// Precision-selected storage width for `Decimal(P, S)` (spec.md §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalWidth {
    Bits32,
    Bits64,
    Bits128,
    Bits256,
}

impl DecimalWidth {
    pub fn for_precision(precision: u16) -> Self {
        match precision {
            0..=9 => DecimalWidth::Bits32,
            10..=18 => DecimalWidth::Bits64,
            19..=38 => DecimalWidth::Bits128,
            _ => DecimalWidth::Bits256,
        }
    }

    pub fn byte_width(self) -> usize {
        match self {
            DecimalWidth::Bits32 => 4,
            DecimalWidth::Bits64 => 8,
            DecimalWidth::Bits128 => 16,
            DecimalWidth::Bits256 => 32,
        }
    }
}

/// Leaf scalar types, parameterized where the grammar calls for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Float32,
    Float64,
    Bool,
    String,
    FixedString(u32),
    Date,
    Date32,
    DateTime,
    DateTime64 {
        precision: u8,
        tz: Option<String>,
    },
    Uuid,
    IPv4,
    IPv6,
    Decimal {
        precision: u16,
        scale: u16,
        width: DecimalWidth,
    },
    Enum {
        width: EnumWidth,
        members: Vec<EnumMember>,
    },
    /// A type string the grammar does not recognize natively; encoded via
    /// the per-row alternate encoder fallback of spec.md §4.F.
    Unknown(String),
}

/// One element of a `Tuple`/`Nested` element list: either unnamed (`Type`) or
/// named (`ident Type`). Mixed naming within one list is rejected by the
/// parser (spec.md §4.C).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleElement {
    pub name: Option<String>,
    pub ty: TypeExpr,
}

/// One typed path of a `JSON(...)` type's optional explicit-path list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    pub path: String,
    pub ty: TypeExpr,
}

/// The recursive type-expression tree (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Scalar(ScalarType),
    Array(Box<TypeExpr>),
    Nullable(Box<TypeExpr>),
    LowCardinality(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Tuple(Vec<TupleElement>),
    /// Desugars to `Array(Tuple(...))` at the codec layer (spec.md §4.C) but
    /// keeps its own spelling for type-string round-tripping.
    Nested(Vec<TupleElement>),
    Variant(Vec<TypeExpr>),
    Dynamic {
        max_types: Option<u64>,
    },
    Json {
        paths: Vec<JsonPath>,
        max_dynamic_paths: Option<u64>,
    },
}

impl TypeExpr {
    /// `Nested(e...)` is exactly `Array(Tuple(e...))` for encode/decode
    /// purposes; callers that only care about wire shape should match on
    /// this instead of `Nested` directly.
    pub fn desugared(&self) -> TypeExpr {
        match self {
            TypeExpr::Nested(elems) => {
                TypeExpr::Array(Box::new(TypeExpr::Tuple(elems.clone())))
            }
            other => other.clone(),
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, TypeExpr::Nullable(_))
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Int8 => write!(f, "Int8"),
            ScalarType::Int16 => write!(f, "Int16"),
            ScalarType::Int32 => write!(f, "Int32"),
            ScalarType::Int64 => write!(f, "Int64"),
            ScalarType::Int128 => write!(f, "Int128"),
            ScalarType::Int256 => write!(f, "Int256"),
            ScalarType::UInt8 => write!(f, "UInt8"),
            ScalarType::UInt16 => write!(f, "UInt16"),
            ScalarType::UInt32 => write!(f, "UInt32"),
            ScalarType::UInt64 => write!(f, "UInt64"),
            ScalarType::UInt128 => write!(f, "UInt128"),
            ScalarType::UInt256 => write!(f, "UInt256"),
            ScalarType::Float32 => write!(f, "Float32"),
            ScalarType::Float64 => write!(f, "Float64"),
            ScalarType::Bool => write!(f, "Bool"),
            ScalarType::String => write!(f, "String"),
            ScalarType::FixedString(n) => write!(f, "FixedString({n})"),
            ScalarType::Date => write!(f, "Date"),
            ScalarType::Date32 => write!(f, "Date32"),
            ScalarType::DateTime => write!(f, "DateTime"),
            ScalarType::DateTime64 { precision, tz } => match tz {
                Some(tz) => write!(f, "DateTime64({precision}, '{tz}')"),
                None => write!(f, "DateTime64({precision})"),
            },
            ScalarType::Uuid => write!(f, "UUID"),
            ScalarType::IPv4 => write!(f, "IPv4"),
            ScalarType::IPv6 => write!(f, "IPv6"),
            ScalarType::Decimal { precision, scale, .. } => {
                write!(f, "Decimal({precision}, {scale})")
            }
            ScalarType::Enum { width, members } => {
                let name = match width {
                    EnumWidth::Bits8 => "Enum8",
                    EnumWidth::Bits16 => "Enum16",
                };
                write!(f, "{name}(")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}' = {}", escape_enum_name(&m.name), m.value)?;
                }
                write!(f, ")")
            }
            ScalarType::Unknown(s) => write!(f, "{s}"),
        }
    }
}

fn escape_enum_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for TupleElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} {}", self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Scalar(s) => write!(f, "{s}"),
            TypeExpr::Array(inner) => write!(f, "Array({inner})"),
            TypeExpr::Nullable(inner) => write!(f, "Nullable({inner})"),
            TypeExpr::LowCardinality(inner) => write!(f, "LowCardinality({inner})"),
            TypeExpr::Map(k, v) => write!(f, "Map({k}, {v})"),
            TypeExpr::Tuple(elems) => {
                write!(f, "Tuple(")?;
                write_elems(f, elems)?;
                write!(f, ")")
            }
            TypeExpr::Nested(elems) => {
                write!(f, "Nested(")?;
                write_elems(f, elems)?;
                write!(f, ")")
            }
            TypeExpr::Variant(types) => {
                write!(f, "Variant(")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
            TypeExpr::Dynamic { max_types } => match max_types {
                Some(n) => write!(f, "Dynamic(max_types={n})"),
                None => write!(f, "Dynamic"),
            },
            TypeExpr::Json { paths, max_dynamic_paths } => {
                if paths.is_empty() && max_dynamic_paths.is_none() {
                    return write!(f, "JSON");
                }
                write!(f, "JSON(")?;
                let mut first = true;
                for p in paths {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{} {}", p.path, p.ty)?;
                }
                if let Some(n) = max_dynamic_paths {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "max_dynamic_paths={n}")?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_elems(f: &mut fmt::Formatter<'_>, elems: &[TupleElement]) -> fmt::Result {
    for (i, e) in elems.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{e}")?;
    }
    Ok(())
}
