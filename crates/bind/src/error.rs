use thiserror::Error;

/// A present, non-empty source value that could not be converted into the type of its field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("binding error for field {field} with error: {message}")]
pub struct FieldError {
    field: String,
    value: String,
    message: String,
}

impl FieldError {
    pub fn new<F: Into<String>, V: Into<String>, M: Into<String>>(field: F, value: V, message: M) -> Self {
        Self { field: field.into(), value: value.into(), message: message.into() }
    }

    /// The logical key the value was looked up with, e.g. `count` for `header = "count"`.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The raw string that failed to parse.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Error, Debug)]
pub enum BindError {
    #[error("decoder: unsupported type {type_name}")]
    UnsupportedType { type_name: &'static str },

    #[error("decoder: value is not a {expected}")]
    TypeMismatch { expected: &'static str },

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("{} fields failed to bind", .0.len())]
    Fields(Vec<FieldError>),
}

impl BindError {
    pub fn unsupported_type(type_name: &'static str) -> Self {
        Self::UnsupportedType { type_name }
    }

    pub fn type_mismatch(expected: &'static str) -> Self {
        Self::TypeMismatch { expected }
    }

    /// Returns true for per-value failures, false for schema errors.
    pub fn is_field_error(&self) -> bool {
        matches!(self, Self::Field(_) | Self::Fields(_))
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Field(error) => std::slice::from_ref(error),
            Self::Fields(errors) => errors,
            Self::UnsupportedType { .. } | Self::TypeMismatch { .. } => &[],
        }
    }

    pub fn into_field_errors(self) -> Vec<FieldError> {
        match self {
            Self::Field(error) => vec![error],
            Self::Fields(errors) => errors,
            Self::UnsupportedType { .. } | Self::TypeMismatch { .. } => Vec::new(),
        }
    }
}

/// Error returned by [`TextDecode`](crate::TextDecode) implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct TextDecodeError {
    reason: String,
}

impl TextDecodeError {
    pub fn new<S: ToString>(reason: S) -> Self {
        Self { reason: reason.to_string() }
    }
}
