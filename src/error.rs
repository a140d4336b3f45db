//! Error taxonomy for the codec core (spec.md §7).

use thiserror::Error;

/// Context attached to most fatal errors: which type/column/row was being
/// processed when the failure occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub type_name: Option<String>,
    pub column_name: Option<String>,
    pub byte_offset: Option<u64>,
    pub row_index: Option<u64>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_column(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.byte_offset = Some(offset);
        self
    }

    pub fn with_row(mut self, row: u64) -> Self {
        self.row_index = Some(row);
        self
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(t) = &self.type_name {
            parts.push(format!("type={t}"));
        }
        if let Some(c) = &self.column_name {
            parts.push(format!("column={c}"));
        }
        if let Some(o) = self.byte_offset {
            parts.push(format!("offset={o}"));
        }
        if let Some(r) = self.row_index {
            parts.push(format!("row={r}"));
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    /// A read attempted to consume more bytes than were available. The only
    /// recoverable variant; recovery is the streaming driver's job (§4.I).
    #[error("buffer underflow: needed {needed} more byte(s) ({ctx})")]
    BufferUnderflow { needed: usize, ctx: ErrorContext },

    #[error("invalid wire format: {reason} ({ctx})")]
    InvalidWireFormat { reason: String, ctx: ErrorContext },

    #[error("value out of range: {reason} ({ctx})")]
    RangeError { reason: String, ctx: ErrorContext },

    #[error("cannot coerce value to target type: {reason} ({ctx})")]
    CoercionError { reason: String, ctx: ErrorContext },

    #[error("malformed type string {type_string:?}: {reason}")]
    GrammarError { type_string: String, reason: String },

    #[error("enum violation: {reason} ({ctx})")]
    EnumViolation { reason: String, ctx: ErrorContext },
}

impl CodecError {
    pub fn underflow(needed: usize, ctx: ErrorContext) -> Self {
        Self::BufferUnderflow { needed, ctx }
    }

    pub fn invalid(reason: impl Into<String>, ctx: ErrorContext) -> Self {
        Self::InvalidWireFormat {
            reason: reason.into(),
            ctx,
        }
    }

    pub fn range(reason: impl Into<String>, ctx: ErrorContext) -> Self {
        Self::RangeError {
            reason: reason.into(),
            ctx,
        }
    }

    pub fn coercion(reason: impl Into<String>, ctx: ErrorContext) -> Self {
        Self::CoercionError {
            reason: reason.into(),
            ctx,
        }
    }

    pub fn grammar(type_string: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GrammarError {
            type_string: type_string.into(),
            reason: reason.into(),
        }
    }

    pub fn enum_violation(reason: impl Into<String>, ctx: ErrorContext) -> Self {
        Self::EnumViolation {
            reason: reason.into(),
            ctx,
        }
    }

    /// `true` for the single recoverable variant (spec.md §7 recovery policy).
    pub fn is_underflow(&self) -> bool {
        matches!(self, CodecError::BufferUnderflow { .. })
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
