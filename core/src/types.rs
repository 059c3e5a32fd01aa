//! Record type definitions for schema modeling.
//!
//! A [`RecordType`] is a named type with a fixed, ordered set of named, typed
//! [`Attribute`]s. Attributes whose type is itself a record become nested
//! schema nodes; everything else becomes a leaf field on the command line.
//! Instances of record types are plain [`serde_json::Value`] objects keyed by
//! attribute name, so they convert to and from typed Rust structs through
//! [`serde`].

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Produces a fresh default value each time it is called.
pub type DefaultFactory = fn() -> Value;

/// Declared default of an attribute.
///
/// # Examples
///
/// ```
/// use schema_args_core::DefaultValue;
/// use serde_json::json;
///
/// let fixed = DefaultValue::Value(json!(32));
/// assert_eq!(fixed.resolve(), json!(32));
///
/// let factory = DefaultValue::Factory(|| json!([128, 128]));
/// assert_eq!(factory.resolve(), json!([128, 128]));
/// ```
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value.
    Value(Value),
    /// A factory evaluated on demand.
    Factory(DefaultFactory),
}

impl DefaultValue {
    /// Returns the default, evaluating the factory if needed.
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Reference to a nested record type.
///
/// `Deferred` references are only resolved when the schema tree is built,
/// which is what allows a record to name itself (directly or through other
/// records) without recursing forever while the type is being described.
#[derive(Clone)]
pub enum RecordRef {
    /// An already-built record type.
    Shared(Arc<RecordType>),
    /// A record type produced on demand.
    Deferred(fn() -> RecordType),
}

impl RecordRef {
    /// Resolves the reference to a record type.
    pub fn resolve(&self) -> Arc<RecordType> {
        match self {
            Self::Shared(record) => Arc::clone(record),
            Self::Deferred(build) => Arc::new(build()),
        }
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(record) => f.debug_tuple("Shared").field(&record.name).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Declared type of an attribute.
///
/// # Examples
///
/// ```
/// use schema_args_core::AttrType;
/// use serde_json::json;
///
/// let ty = AttrType::list(AttrType::Int);
/// assert!(ty.accepts(&json!([1, 2, 3])));
/// assert!(!ty.accepts(&json!(["a"])));
/// assert_eq!(ty.type_name(), "list<int>");
/// ```
#[derive(Debug, Clone)]
pub enum AttrType {
    /// Boolean value.
    Bool,
    /// Integer value.
    Int,
    /// Floating point value.
    Float,
    /// String value.
    Str,
    /// One of a fixed set of names (enum-like).
    Choice(Vec<String>),
    /// Homogeneous list.
    List(Box<AttrType>),
    /// Value that may be `null`.
    Optional(Box<AttrType>),
    /// Nested record.
    Record(RecordRef),
}

impl AttrType {
    /// Creates a list type.
    pub fn list(item: AttrType) -> Self {
        Self::List(Box::new(item))
    }

    /// Creates an optional type.
    pub fn optional(inner: AttrType) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Creates a choice type from the given names.
    pub fn choice<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choice(names.into_iter().map(Into::into).collect())
    }

    /// Creates a nested record type described by `T`.
    pub fn record<T: Record>() -> Self {
        Self::Record(RecordRef::Deferred(T::record_type))
    }

    /// Creates a nested record type from a shared definition.
    pub fn shared(record: Arc<RecordType>) -> Self {
        Self::Record(RecordRef::Shared(record))
    }

    /// Returns `true` if this type is a nested record.
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    /// Returns `true` if this type is a container holding a record at any
    /// depth (e.g. `list<Record>` or `optional<list<Record>>`).
    pub fn contains_record(&self) -> bool {
        match self {
            Self::List(inner) | Self::Optional(inner) => {
                inner.is_record() || inner.contains_record()
            }
            _ => false,
        }
    }

    /// Checks whether `value` satisfies this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Str => value.is_string(),
            Self::Choice(names) => value
                .as_str()
                .is_some_and(|name| names.iter().any(|n| n == name)),
            Self::List(item) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| item.accepts(v))),
            Self::Optional(inner) => value.is_null() || inner.accepts(value),
            Self::Record(record) => {
                let Some(object) = value.as_object() else {
                    return false;
                };
                let record = record.resolve();
                object.iter().all(|(key, v)| {
                    record
                        .attribute(key)
                        .is_some_and(|attr| attr.ty.accepts(v))
                })
            }
        }
    }

    /// Human-readable name of the type, used in errors and help text.
    pub fn type_name(&self) -> String {
        match self {
            Self::Bool => "bool".to_string(),
            Self::Int => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Str => "str".to_string(),
            Self::Choice(names) => format!("choice({})", names.join("|")),
            Self::List(item) => format!("list<{}>", item.type_name()),
            Self::Optional(inner) => format!("optional<{}>", inner.type_name()),
            Self::Record(RecordRef::Shared(record)) => record.name.clone(),
            Self::Record(RecordRef::Deferred(build)) => build().name,
        }
    }
}

/// Documentation attached to an attribute.
///
/// Sources are consulted in priority order: a docstring placed below the
/// attribute, then a comment above it, then an inline trailing comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeDocs {
    pub docstring_below: Option<String>,
    pub comment_above: Option<String>,
    pub comment_inline: Option<String>,
}

impl AttributeDocs {
    /// Returns the highest-priority documentation string, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_args_core::AttributeDocs;
    ///
    /// let docs = AttributeDocs {
    ///     docstring_below: None,
    ///     comment_above: Some("above".into()),
    ///     comment_inline: Some("inline".into()),
    /// };
    /// assert_eq!(docs.preferred(), Some("above"));
    /// ```
    pub fn preferred(&self) -> Option<&str> {
        self.docstring_below
            .as_deref()
            .or(self.comment_above.as_deref())
            .or(self.comment_inline.as_deref())
    }
}

/// A named, typed attribute of a record type.
///
/// # Examples
///
/// ```
/// use schema_args_core::{Attribute, AttrType};
///
/// let attr = Attribute::new("batch_size", AttrType::Int)
///     .with_default(32)
///     .with_comment_above("Number of examples per batch");
/// assert_eq!(attr.default_value(), Some(serde_json::json!(32)));
/// assert!(attr.init);
/// ```
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Attribute name as it appears on the record.
    pub name: String,
    /// Declared type.
    pub ty: AttrType,
    /// Declared default value or factory.
    pub default: Option<DefaultValue>,
    /// Attached documentation.
    pub docs: AttributeDocs,
    /// Whether the attribute is a constructor parameter. Attributes with
    /// `init == false` never reach the command line.
    pub init: bool,
}

impl Attribute {
    /// Creates an attribute without a default.
    pub fn new(name: &str, ty: AttrType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: None,
            docs: AttributeDocs::default(),
            init: true,
        }
    }

    /// Sets a fixed default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Sets a default factory.
    pub fn with_default_factory(mut self, factory: DefaultFactory) -> Self {
        self.default = Some(DefaultValue::Factory(factory));
        self
    }

    /// Sets the docstring found below the attribute.
    pub fn with_doc(mut self, doc: &str) -> Self {
        self.docs.docstring_below = Some(doc.to_string());
        self
    }

    /// Sets the comment found above the attribute.
    pub fn with_comment_above(mut self, comment: &str) -> Self {
        self.docs.comment_above = Some(comment.to_string());
        self
    }

    /// Sets the inline trailing comment.
    pub fn with_comment_inline(mut self, comment: &str) -> Self {
        self.docs.comment_inline = Some(comment.to_string());
        self
    }

    /// Excludes the attribute from the constructor and the command line.
    pub fn excluded(mut self) -> Self {
        self.init = false;
        self
    }

    /// Returns the declared default, evaluating a factory if needed.
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(DefaultValue::resolve)
    }
}

/// A record type: a named type with ordered, typed attributes.
///
/// # Examples
///
/// ```
/// use schema_args_core::{Attribute, AttrType, RecordType};
///
/// let record = RecordType::new("HParams")
///     .with_doc("Model hyper-parameters")
///     .with_attribute(Attribute::new("batch_size", AttrType::Int).with_default(32))
///     .with_attribute(Attribute::new("optimizer", AttrType::Str).with_default("ADAM"));
///
/// assert_eq!(record.attributes.len(), 2);
/// assert!(record.attribute("optimizer").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct RecordType {
    /// Qualified name of the type.
    pub name: String,
    /// The type's own documentation.
    pub doc: Option<String>,
    /// Attributes in declaration order.
    pub attributes: Vec<Attribute>,
}

impl RecordType {
    /// Creates an empty record type.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            doc: None,
            attributes: Vec::new(),
        }
    }

    /// Sets the type documentation.
    pub fn with_doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    /// Appends an attribute.
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Finds an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// A Rust type that describes itself as a record type.
///
/// Reconstructed instances deserialize back into the implementing type.
///
/// # Examples
///
/// ```
/// use schema_args_core::{Attribute, AttrType, Record, RecordType};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Inner {
///     y: i64,
/// }
///
/// impl Record for Inner {
///     fn record_type() -> RecordType {
///         RecordType::new("Inner")
///             .with_attribute(Attribute::new("y", AttrType::Int).with_default(2))
///     }
/// }
///
/// assert_eq!(Inner::record_type().name, "Inner");
/// assert_eq!(AttrType::record::<Inner>().type_name(), "Inner");
/// ```
pub trait Record: DeserializeOwned {
    /// Returns the record type describing `Self`.
    fn record_type() -> RecordType;
}

/// Returns a short name for the JSON kind of `value`.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "record",
    }
}
