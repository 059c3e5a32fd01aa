//! Schema trees that map nested record types onto command-line arguments.
//!
//! This crate defines the building blocks for turning a structured, possibly
//! nested, record type into a flat set of command-line flags and back:
//!
//! - [`RecordType`] / [`Attribute`] / [`AttrType`]: the schema model. Typed
//!   Rust structs describe themselves through the [`Record`] trait.
//! - [`FieldDescriptor`]: one leaf attribute and its [`ParsingOptions`]
//!   (coercion, default, required, multiplicity).
//! - [`SchemaTree`]: the nested record tree with destinations, prefixes and
//!   required/repeated flags propagated to every descendant.
//! - [`FlagRegistry`]: the seam through which a tree registers its groups and
//!   flags with a flag-parsing engine.
//!
//! Merging ([`SchemaTree::merge`]) combines trees of the same record type into
//! one repeated tree. Reconstruction ([`SchemaTree::reconstruct`]) rebuilds
//! nested instances from a flat destination → value map.
//!
//! # Example
//!
//! ```
//! use schema_args_core::*;
//! use serde_json::json;
//!
//! let inner = RecordType::new("Inner")
//!     .with_attribute(Attribute::new("y", AttrType::Int).with_default(2));
//! let outer = RecordType::new("Outer")
//!     .with_attribute(Attribute::new("inner", AttrType::shared(inner.into())))
//!     .with_attribute(Attribute::new("x", AttrType::Int));
//!
//! let tree = SchemaTree::build(outer.into(), "config").unwrap();
//! assert_eq!(tree.field_dest(tree.children(SchemaTree::ROOT)[0], "y"), "config.inner.y");
//!
//! let mut flat = FlatValues::new();
//! flat.insert("config.inner.y".into(), json!(9));
//! flat.insert("config.x".into(), json!(3));
//! let instances = tree.reconstruct(&flat).unwrap();
//! assert_eq!(instances["config"], json!({"inner": {"y": 9}, "x": 3}));
//! ```

mod error;
mod field;
mod instantiate;
mod merge;
mod register;
mod tree;
mod types;
mod validate;

pub use error::{CoercionError, ConstructionError, SchemaError, ShapeMismatchError};
pub use field::{FieldDescriptor, Nargs, ParsingOptions, ValueKind, parse_bool};
pub use instantiate::{FlatValues, distribute};
pub use register::{FlagRegistry, FlagSpec, GroupId, OptionNamer, PrefixedNamer};
pub use tree::{MAX_NESTING_DEPTH, NodeId, SchemaNode, SchemaTree};
pub use types::*;
pub use validate::{ValidationError, validate_record};
