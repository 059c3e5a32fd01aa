//! Command-line parsing into nested record instances.
//!
//! This crate wires [`schema_args_core`] schema trees to `clap`:
//!
//! - [`ArgumentParser`]: register record types at destinations, parse argv,
//!   get record instances back.
//! - [`ConflictResolution`]: what to do when two fields want the same option
//!   string.
//! - [`ClapEngine`]: the [`FlagRegistry`](schema_args_core::FlagRegistry)
//!   implementation that turns schema fields into clap arguments.
//! - [`ParsedArgs`]: the parsed instances, as JSON values or typed structs.
//!
//! # Quick start
//!
//! ```
//! use schema_args::{ArgumentParser, ConflictResolution};
//! use schema_args_core::{AttrType, Attribute, RecordType};
//! use serde_json::json;
//!
//! let optimizer = RecordType::new("Optimizer")
//!     .with_attribute(Attribute::new("lr", AttrType::Float).with_default(0.001));
//! let config = RecordType::new("Config")
//!     .with_attribute(Attribute::new("optimizer", AttrType::shared(optimizer.into())))
//!     .with_attribute(Attribute::new("epochs", AttrType::Int).with_default(10));
//!
//! let mut parser = ArgumentParser::new("train").with_conflict_resolution(ConflictResolution::Explicit);
//! parser.add_arguments(config, "config").unwrap();
//!
//! let parsed = parser
//!     .parse_from(["train", "--config.optimizer.lr", "0.01"])
//!     .unwrap();
//! assert_eq!(
//!     parsed.get_value("config"),
//!     Some(&json!({"optimizer": {"lr": 0.01}, "epochs": 10}))
//! );
//! ```

mod conflict;
mod engine;
mod error;
mod namespace;
mod parser;

pub use conflict::ConflictResolution;
pub use engine::{ClapEngine, FieldValueParser, RegisteredFlag};
pub use error::{ParseError, Result};
pub use namespace::ParsedArgs;
pub use parser::ArgumentParser;
