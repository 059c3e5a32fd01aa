//! Record schemas loaded from YAML or JSON files.
//!
//! ```yaml
//! root: Config
//! records:
//!   - name: Optimizer
//!     attributes:
//!       - { name: lr, type: float, default: 0.001 }
//!   - name: Config
//!     doc: Training configuration
//!     attributes:
//!       - { name: optimizer, type: Optimizer }
//!       - { name: epochs, type: int, default: 10, help: Number of passes }
//!       - { name: tags, type: "list<str>", default: [] }
//!       - { name: mode, type: "choice(fast|slow)", default: fast }
//! ```
//!
//! Attribute types are `bool`, `int`, `float`, `str`, `list<T>`,
//! `optional<T>`, `choice(a|b|...)` or the name of another record in the
//! file.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use schema_args_core::{AttrType, Attribute, RecordType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or resolving a schema file.
#[derive(Debug, Error)]
pub enum SchemaFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A record name is referenced but never defined.
    #[error("unknown record type '{0}'")]
    UnknownRecord(String),

    /// Two records share a name.
    #[error("record '{0}' is defined more than once")]
    DuplicateRecord(String),

    /// A type string could not be parsed.
    #[error("invalid type '{ty}' for attribute '{attribute}'")]
    InvalidType { attribute: String, ty: String },

    /// Records reference each other in a loop.
    #[error("record cycle detected: {0}")]
    RecordCycle(String),

    /// Neither `--root` nor the file's `root` names a record.
    #[error("no root record: pass --root or set 'root' in the schema file")]
    NoRoot,
}

pub type Result<T> = std::result::Result<T, SchemaFileError>;

/// A schema file: record definitions plus an optional root record name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub root: Option<String>,
    pub records: Vec<RecordDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDef {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default = "default_init")]
    pub init: bool,
}

fn default_init() -> bool {
    true
}

impl SchemaFile {
    /// Loads a schema file; `.json` files are read as JSON, anything else
    /// as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let schema = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        Ok(schema)
    }

    /// Resolves `name` into a record type, following references to other
    /// records in the file.
    pub fn resolve(&self, name: &str) -> Result<Arc<RecordType>> {
        let mut defs = HashMap::new();
        for def in &self.records {
            if defs.insert(def.name.as_str(), def).is_some() {
                return Err(SchemaFileError::DuplicateRecord(def.name.clone()));
            }
        }
        let mut resolver = Resolver {
            defs,
            resolved: HashMap::new(),
            stack: Vec::new(),
        };
        resolver.record(name)
    }
}

/// Loads a defaults file (YAML or JSON by extension) as a JSON value.
pub fn load_value(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let value = if is_json(path) {
        serde_json::from_reader(reader)?
    } else {
        serde_yaml::from_reader(reader)?
    };
    Ok(value)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

struct Resolver<'a> {
    defs: HashMap<&'a str, &'a RecordDef>,
    resolved: HashMap<String, Arc<RecordType>>,
    stack: Vec<String>,
}

impl Resolver<'_> {
    fn record(&mut self, name: &str) -> Result<Arc<RecordType>> {
        if let Some(record) = self.resolved.get(name) {
            return Ok(Arc::clone(record));
        }
        if self.stack.iter().any(|n| n == name) {
            let mut path = self.stack.clone();
            path.push(name.to_string());
            return Err(SchemaFileError::RecordCycle(path.join(" -> ")));
        }
        let def = *self
            .defs
            .get(name)
            .ok_or_else(|| SchemaFileError::UnknownRecord(name.to_string()))?;

        self.stack.push(name.to_string());
        let mut record = RecordType::new(&def.name);
        if let Some(doc) = &def.doc {
            record = record.with_doc(doc);
        }
        for attr in &def.attributes {
            let ty = self.parse_type(&attr.name, &attr.ty)?;
            let mut attribute = Attribute::new(&attr.name, ty);
            if let Some(default) = &attr.default {
                attribute = attribute.with_default(default.clone());
            }
            if let Some(help) = &attr.help {
                attribute = attribute.with_doc(help);
            }
            if !attr.init {
                attribute = attribute.excluded();
            }
            record = record.with_attribute(attribute);
        }
        self.stack.pop();

        debug!(record = name, attributes = record.attributes.len(), "Resolved record");
        let record = Arc::new(record);
        self.resolved.insert(name.to_string(), Arc::clone(&record));
        Ok(record)
    }

    fn parse_type(&mut self, attribute: &str, raw: &str) -> Result<AttrType> {
        let invalid = || SchemaFileError::InvalidType {
            attribute: attribute.to_string(),
            ty: raw.to_string(),
        };
        let raw = raw.trim();

        match raw.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => return Ok(AttrType::Bool),
            "int" | "integer" => return Ok(AttrType::Int),
            "float" | "number" => return Ok(AttrType::Float),
            "str" | "string" => return Ok(AttrType::Str),
            _ => {}
        }
        if let Some(inner) = strip_wrapper(raw, "list<", '>') {
            return Ok(AttrType::list(self.parse_type(attribute, inner)?));
        }
        if let Some(inner) = strip_wrapper(raw, "optional<", '>') {
            return Ok(AttrType::optional(self.parse_type(attribute, inner)?));
        }
        if let Some(inner) = strip_wrapper(raw, "choice(", ')') {
            let names: Vec<&str> = inner.split('|').map(str::trim).collect();
            if names.iter().any(|n| n.is_empty()) {
                return Err(invalid());
            }
            return Ok(AttrType::choice(names));
        }
        if raw.is_empty() || !raw.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            return Err(invalid());
        }
        Ok(AttrType::shared(self.record(raw)?))
    }
}

fn strip_wrapper<'a>(raw: &'a str, open: &str, close: char) -> Option<&'a str> {
    raw.strip_prefix(open)?.strip_suffix(close)
}
