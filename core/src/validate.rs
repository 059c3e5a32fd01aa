//! Record type validation.
//!
//! Catches structural problems in a [`RecordType`] such as empty names,
//! duplicate attributes, names that would break dotted destination paths,
//! and declared defaults that do not satisfy their attribute's type.
//!
//! # Examples
//!
//! ```
//! use schema_args_core::*;
//!
//! let record = RecordType::new("Config")
//!     .with_attribute(Attribute::new("port", AttrType::Int).with_default(8080));
//! assert!(validate_record(&record).is_empty());
//!
//! // Invalid: the default is not an int
//! let bad = RecordType::new("Config")
//!     .with_attribute(Attribute::new("port", AttrType::Int).with_default("eighty"));
//! assert!(!validate_record(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{AttrType, DefaultValue, RecordType};

/// Record validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Record name is empty or whitespace-only.
    #[error("record name cannot be empty")]
    EmptyRecordName,
    /// Attribute name is empty or whitespace-only.
    #[error("attribute name cannot be empty")]
    EmptyAttributeName,
    /// Attribute name contains characters that cannot appear in a
    /// destination path or option string.
    #[error("invalid attribute name: {0}")]
    InvalidAttributeName(String),
    /// Two attributes share a name.
    #[error("duplicate attribute: {0}")]
    DuplicateAttribute(String),
    /// A choice type has no choices.
    #[error("attribute '{0}' has an empty choice list")]
    EmptyChoices(String),
    /// A fixed default does not satisfy the attribute's declared type.
    #[error("default of attribute '{attribute}' is not a valid {expected}")]
    InvalidDefault { attribute: String, expected: String },
}

/// Validates a record type.
///
/// Returns the first problem found, or an empty list. Default factories are
/// not evaluated.
pub fn validate_record(record: &RecordType) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if record.name.trim().is_empty() {
        errors.push(ValidationError::EmptyRecordName);
        return errors;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for attr in &record.attributes {
        let name = attr.name.as_str();
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyAttributeName);
            return errors;
        }
        if name.starts_with('-') || name.chars().any(|c| c == '.' || c.is_whitespace()) {
            errors.push(ValidationError::InvalidAttributeName(name.to_string()));
            return errors;
        }
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateAttribute(name.to_string()));
            return errors;
        }
        if has_empty_choices(&attr.ty) {
            errors.push(ValidationError::EmptyChoices(name.to_string()));
            return errors;
        }
        if let Some(DefaultValue::Value(value)) = &attr.default {
            if !attr.ty.accepts(value) {
                errors.push(ValidationError::InvalidDefault {
                    attribute: name.to_string(),
                    expected: attr.ty.type_name(),
                });
                return errors;
            }
        }
    }

    errors
}

fn has_empty_choices(ty: &AttrType) -> bool {
    match ty {
        AttrType::Choice(names) => names.is_empty(),
        AttrType::List(inner) | AttrType::Optional(inner) => has_empty_choices(inner),
        _ => false,
    }
}
