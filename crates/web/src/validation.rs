//! Validation results of bound request values.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    field: String,
    message: String,
    validator: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    condition_params: Vec<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, validator: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into(), validator: validator.into(), condition_params: Vec::new() }
    }

    /// Adds a parameter of the failed rule, e.g. `3` for `min_length(3)`.
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.condition_params.push(param.into());
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn validator(&self) -> &str {
        &self.validator
    }

    pub fn condition_params(&self) -> &[String] {
        &self.condition_params
    }
}

/// Every failed rule of a value, grouped by field in field name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<ValidationError>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.entry(error.field.clone()).or_default().push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failed rules, over all fields.
    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn field(&self, field: &str) -> &[ValidationError] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.values().flatten()
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (index, error) in self.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{}", error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Implemented by request types that check themselves after binding.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct SignUp {
        name: String,
        age: u8,
    }

    impl Validate for SignUp {
        fn validate(&self) -> Result<(), ValidationErrors> {
            let mut errors = ValidationErrors::new();
            if self.name.len() < 3 {
                errors.add(ValidationError::new("name", "name is too short", "min_length").with_param("3"));
            }
            if self.age < 18 {
                errors.add(ValidationError::new("age", "age must be at least 18", "min").with_param("18"));
            }
            errors.into_result()
        }
    }

    #[test]
    fn collects_by_field() {
        let errors = SignUp { name: "al".to_owned(), age: 7 }.validate().unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.field("name")[0].validator(), "min_length");
        assert_eq!(errors.field("age")[0].condition_params(), ["18"]);
        assert!(errors.field("email").is_empty());
        assert_eq!(errors.to_string(), "validation failed: age must be at least 18; name is too short");
    }

    #[test]
    fn serializes_as_map() {
        let errors = SignUp { name: "al".to_owned(), age: 30 }.validate().unwrap_err();
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({
                "name": [{
                    "field": "name",
                    "message": "name is too short",
                    "validator": "min_length",
                    "condition_params": ["3"]
                }]
            })
        );
    }

    #[test]
    fn valid_value_passes() {
        assert!(SignUp { name: "alice".to_owned(), age: 30 }.validate().is_ok());
    }
}
