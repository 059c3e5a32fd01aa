//! Leaf field descriptors and their parsing options.
//!
//! A [`FieldDescriptor`] wraps one non-nested [`Attribute`] and knows how to
//! present it to a flag-parsing engine: the coercion to apply to raw strings,
//! its effective default, whether it is required, and how many values it
//! takes.

use serde_json::{Number, Value};

use crate::error::CoercionError;
use crate::{AttrType, Attribute};

/// How many command-line values a flag consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    /// Exactly one value.
    One,
    /// Zero or one value (`?`); a bare flag yields the missing value.
    Optional,
    /// Any number of values (`*`).
    ZeroOrMore,
    /// At least one value (`+`).
    OneOrMore,
}

impl Nargs {
    /// Returns `true` if the parsed result is a list of values.
    pub fn takes_many(self) -> bool {
        matches!(self, Self::ZeroOrMore | Self::OneOrMore)
    }
}

/// Coercion from one raw command-line token to a value.
///
/// # Examples
///
/// ```
/// use schema_args_core::ValueKind;
/// use serde_json::json;
///
/// assert_eq!(ValueKind::Bool.coerce("yes").unwrap(), json!(true));
/// assert_eq!(ValueKind::Int.coerce("42").unwrap(), json!(42));
///
/// let lists = ValueKind::ListPerToken(Box::new(ValueKind::Int));
/// assert_eq!(lists.coerce("[1,2,3]").unwrap(), json!([1, 2, 3]));
/// assert_eq!(lists.coerce("4 5").unwrap(), json!([4, 5]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    Choice(Vec<String>),
    /// List field: each token is one item.
    List(Box<ValueKind>),
    /// List field under repetition: each token is a whole list.
    ListPerToken(Box<ValueKind>),
}

impl ValueKind {
    /// Maps a declared type to its coercion. Records have none.
    pub fn from_type(ty: &AttrType) -> Option<Self> {
        match ty {
            AttrType::Bool => Some(Self::Bool),
            AttrType::Int => Some(Self::Int),
            AttrType::Float => Some(Self::Float),
            AttrType::Str => Some(Self::Str),
            AttrType::Choice(names) => Some(Self::Choice(names.clone())),
            AttrType::Optional(inner) => Self::from_type(inner),
            AttrType::List(item) => Some(Self::List(Box::new(Self::item_kind(item)?))),
            AttrType::Record(_) => None,
        }
    }

    fn item_kind(item: &AttrType) -> Option<Self> {
        match item {
            AttrType::List(inner) => Some(Self::ListPerToken(Box::new(Self::item_kind(inner)?))),
            other => Self::from_type(other),
        }
    }

    /// Coerces one raw token.
    pub fn coerce(&self, raw: &str) -> Result<Value, CoercionError> {
        match self {
            Self::Bool => parse_bool(raw).map(Value::Bool),
            Self::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| CoercionError::new(format!("invalid int value: '{raw}'"))),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| CoercionError::new(format!("invalid float value: '{raw}'"))),
            Self::Str => Ok(Value::String(raw.to_string())),
            Self::Choice(names) => {
                if names.iter().any(|n| n == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(CoercionError::new(format!(
                        "invalid choice: '{raw}' (choose from {})",
                        names.join(", ")
                    )))
                }
            }
            Self::List(item) => item.coerce(raw),
            Self::ListPerToken(item) => split_list(raw)
                .into_iter()
                .map(|part| item.coerce(part))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    /// Placeholder shown for the value in help output.
    pub fn metavar(&self) -> String {
        match self {
            Self::Bool => "bool".to_string(),
            Self::Int => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Str => "str".to_string(),
            Self::Choice(_) => "choice".to_string(),
            Self::List(item) => item.metavar(),
            Self::ListPerToken(item) => format!("[{}]", item.metavar()),
        }
    }
}

/// Parses the usual spellings of a boolean.
pub fn parse_bool(raw: &str) -> Result<bool, CoercionError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        _ => Err(CoercionError::new(format!(
            "boolean value expected, received '{raw}'"
        ))),
    }
}

/// Splits `"[1,2,3]"`, `"1,2,3"` or `"1 2 3"` into items.
fn split_list(raw: &str) -> Vec<&str> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    if inner.trim().is_empty() {
        return Vec::new();
    }
    if inner.contains(',') {
        inner.split(',').map(str::trim).collect()
    } else {
        inner.split_whitespace().collect()
    }
}

/// Everything a flag-parsing engine needs to register one leaf field.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsingOptions {
    /// Coercion applied to each raw token.
    pub kind: ValueKind,
    /// Value used when the flag is absent.
    pub default: Option<Value>,
    /// Value used when the flag is present without a value.
    pub missing_value: Option<Value>,
    /// Whether the flag must be supplied.
    pub required: bool,
    /// Multiplicity.
    pub nargs: Nargs,
    /// Allowed values, if restricted.
    pub choices: Option<Vec<String>>,
    /// Help text.
    pub help: Option<String>,
}

/// One leaf field of a schema node.
///
/// # Examples
///
/// ```
/// use schema_args_core::{Attribute, AttrType, FieldDescriptor, Nargs};
/// use serde_json::json;
///
/// let mut field = FieldDescriptor::new(Attribute::new("y", AttrType::Int).with_default(2));
/// assert!(!field.required());
///
/// field.set_default(json!(7));
/// let options = field.parsing_options().unwrap();
/// assert_eq!(options.default, Some(json!(7)));
/// assert_eq!(options.nargs, Nargs::One);
/// ```
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    attribute: Attribute,
    default_override: Option<Value>,
    required_override: Option<bool>,
    parent_required: bool,
    multiple: bool,
    help_override: Option<String>,
}

impl FieldDescriptor {
    /// Wraps an attribute.
    pub fn new(attribute: Attribute) -> Self {
        Self {
            attribute,
            default_override: None,
            required_override: None,
            parent_required: false,
            multiple: false,
            help_override: None,
        }
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.attribute.name
    }

    /// Declared type.
    pub fn declared_type(&self) -> &AttrType {
        &self.attribute.ty
    }

    /// The wrapped attribute.
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Effective default: an override, else the declared default, else
    /// `null` for optional types.
    pub fn default(&self) -> Option<Value> {
        self.default_override
            .clone()
            .or_else(|| self.attribute.default_value())
            .or_else(|| matches!(self.attribute.ty, AttrType::Optional(_)).then_some(Value::Null))
    }

    /// Overrides the default value.
    pub fn set_default(&mut self, value: Value) {
        self.default_override = Some(value);
    }

    /// Whether the field must be supplied on the command line.
    ///
    /// An explicit setting wins; otherwise the field is required when its
    /// node is required or when it has no default.
    pub fn required(&self) -> bool {
        if let Some(required) = self.required_override {
            return required;
        }
        self.parent_required || self.default().is_none()
    }

    /// Forces the required flag.
    pub fn set_required(&mut self, required: bool) {
        self.required_override = Some(required);
    }

    pub(crate) fn set_parent_required(&mut self, required: bool) {
        self.parent_required = required;
    }

    /// Whether the field collects one value per repetition.
    pub fn multiple(&self) -> bool {
        self.multiple
    }

    /// Marks the field as collecting one value per repetition.
    pub fn set_multiple(&mut self, multiple: bool) {
        self.multiple = multiple;
    }

    /// Help text: an override, else the attribute's documentation.
    pub fn help(&self) -> Option<String> {
        self.help_override
            .clone()
            .or_else(|| self.attribute.docs.preferred().map(str::to_string))
    }

    /// Overrides the help text.
    pub fn set_help(&mut self, help: &str) {
        self.help_override = Some(help.to_string());
    }

    /// Options for registering this field, or `None` when the field is
    /// excluded from the command line.
    pub fn parsing_options(&self) -> Option<ParsingOptions> {
        if !self.attribute.init {
            return None;
        }
        let mut kind = ValueKind::from_type(&self.attribute.ty)?;
        let mut default = self.default();
        let required = self.required();

        let choices = match &kind {
            ValueKind::Choice(names) => Some(names.clone()),
            ValueKind::List(item) => match item.as_ref() {
                ValueKind::Choice(names) => Some(names.clone()),
                _ => None,
            },
            _ => None,
        };

        let mut missing_value = None;
        let mut nargs = match &kind {
            ValueKind::List(_) => Nargs::ZeroOrMore,
            ValueKind::Bool => match default.as_ref().and_then(Value::as_bool) {
                Some(flag) => {
                    missing_value = Some(Value::Bool(!flag));
                    Nargs::Optional
                }
                None => Nargs::One,
            },
            _ => Nargs::One,
        };

        let mut choices = choices;
        if self.multiple {
            if let ValueKind::List(item) = kind {
                kind = ValueKind::ListPerToken(item);
                choices = None;
            }
            if required {
                nargs = Nargs::OneOrMore;
            } else {
                nargs = Nargs::ZeroOrMore;
                default = default.map(|value| Value::Array(vec![value]));
            }
        }

        Some(ParsingOptions {
            kind,
            default,
            missing_value,
            required,
            nargs,
            choices,
            help: self.help(),
        })
    }
}
