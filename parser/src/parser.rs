//! The argument parser: record types in, record instances out.

use std::ffi::OsString;
use std::sync::Arc;

use schema_args_core::{FlatValues, Record, RecordType, SchemaTree, distribute};
use serde_json::Value;
use tracing::{debug, warn};

use crate::conflict::{ConflictResolution, merge_same_records, namer, option_names};
use crate::engine::ClapEngine;
use crate::error::{ParseError, Result};
use crate::namespace::ParsedArgs;

/// Parses command-line arguments into instances of registered record types.
///
/// Each record type is added at a destination. Adding the same record type
/// at several destinations merges them: the flags are shared and take one
/// value per destination.
///
/// # Examples
///
/// ```
/// use schema_args::ArgumentParser;
/// use schema_args_core::{AttrType, Attribute, RecordType};
/// use serde_json::json;
///
/// let hparams = RecordType::new("HParams")
///     .with_attribute(Attribute::new("lr", AttrType::Float).with_default(0.1))
///     .with_attribute(Attribute::new("layers", AttrType::Int).with_default(2));
///
/// let mut parser = ArgumentParser::new("train");
/// parser.add_arguments(hparams, "hparams").unwrap();
///
/// let parsed = parser.parse_from(["train", "--layers", "4"]).unwrap();
/// assert_eq!(parsed.get_value("hparams"), Some(&json!({"lr": 0.1, "layers": 4})));
/// ```
#[derive(Debug, Clone)]
pub struct ArgumentParser {
    name: String,
    about: Option<String>,
    conflict_resolution: ConflictResolution,
    trees: Vec<SchemaTree>,
}

impl ArgumentParser {
    /// Creates a parser for a program named `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            about: None,
            conflict_resolution: ConflictResolution::default(),
            trees: Vec::new(),
        }
    }

    /// Sets the description shown in help output.
    pub fn with_about(mut self, about: &str) -> Self {
        self.about = Some(about.to_string());
        self
    }

    /// Sets how option-string conflicts are handled.
    pub fn with_conflict_resolution(mut self, mode: ConflictResolution) -> Self {
        self.conflict_resolution = mode;
        self
    }

    pub fn conflict_resolution(&self) -> ConflictResolution {
        self.conflict_resolution
    }

    /// Registered schema trees.
    pub fn trees(&self) -> &[SchemaTree] {
        &self.trees
    }

    /// Adds the arguments of `record`, to be parsed into `dest`.
    ///
    /// # Errors
    ///
    /// Schema errors surface here, before anything is parsed.
    /// [`ParseError::DuplicateDestination`] if `dest` is taken.
    pub fn add_arguments(&mut self, record: impl Into<Arc<RecordType>>, dest: &str) -> Result<()> {
        self.check_destination(dest)?;
        let tree = SchemaTree::build(record.into(), dest)?;
        self.add_tree(tree)
    }

    /// Adds the arguments of `record` with a default instance that overrides
    /// the declared defaults.
    pub fn add_arguments_with_default(
        &mut self,
        record: impl Into<Arc<RecordType>>,
        dest: &str,
        default: Value,
    ) -> Result<()> {
        self.check_destination(dest)?;
        let tree = SchemaTree::build_with_default(record.into(), dest, default)?;
        self.add_tree(tree)
    }

    /// Adds the arguments of `record` with every option string prefixed.
    pub fn add_prefixed(
        &mut self,
        record: impl Into<Arc<RecordType>>,
        dest: &str,
        prefix: &str,
    ) -> Result<()> {
        self.check_destination(dest)?;
        let mut tree = SchemaTree::build(record.into(), dest)?;
        tree.set_prefix(SchemaTree::ROOT, prefix);
        self.add_tree(tree)
    }

    /// Adds the arguments of a typed [`Record`].
    pub fn add_record<T: Record>(&mut self, dest: &str) -> Result<()> {
        self.add_arguments(T::record_type(), dest)
    }

    /// Adds an already built tree. A tree whose root record type is already
    /// registered is merged into the existing tree.
    pub fn add_tree(&mut self, tree: SchemaTree) -> Result<()> {
        for dest in tree.destinations(SchemaTree::ROOT) {
            self.check_destination(dest)?;
        }
        let name = &tree.root().record_type().name;
        if let Some(existing) = self
            .trees
            .iter_mut()
            .find(|t| t.root().record_type().name == *name)
        {
            let root = SchemaTree::ROOT;
            if existing.default(root) != tree.default(root) {
                warn!(
                    record = %name,
                    dest = ?tree.destinations(root),
                    "Default of repeated record ignored, keeping the first one"
                );
            }
            if existing.root().prefix() != tree.root().prefix() {
                warn!(
                    record = %name,
                    prefix = tree.root().prefix(),
                    kept = existing.root().prefix(),
                    "Prefix of repeated record ignored"
                );
            }
            existing.merge(&tree)?;
            debug!(
                record = %name,
                destinations = ?existing.destinations(SchemaTree::ROOT),
                "Merged repeated record"
            );
            return Ok(());
        }
        debug!(record = %name, dest = ?tree.destinations(SchemaTree::ROOT), "Added record");
        self.trees.push(tree);
        Ok(())
    }

    fn check_destination(&self, dest: &str) -> Result<()> {
        let taken = self
            .trees
            .iter()
            .any(|tree| tree.destinations(SchemaTree::ROOT).iter().any(|d| d == dest));
        if taken {
            return Err(ParseError::DuplicateDestination(dest.to_string()));
        }
        Ok(())
    }

    /// Parses `args` (program name first, as with [`std::env::args_os`]).
    ///
    /// # Errors
    ///
    /// [`ParseError::Clap`] for command-line errors (including `--help`),
    /// [`ParseError::Conflict`] for clashing option strings and
    /// [`ParseError::Construction`] when the parsed values do not make valid
    /// instances.
    pub fn parse_from<I, T>(&self, args: I) -> Result<ParsedArgs>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let (trees, engine) = self.prepare()?;
        let matches = engine
            .command(&self.name, self.about.as_deref())
            .try_get_matches_from(args)?;

        let mut flat = FlatValues::new();
        let collected = engine.collect(&matches);
        for (dest, value) in collected {
            let Some((targets, multiple)) = targets_of(&trees, &dest) else {
                flat.insert(dest, value);
                continue;
            };
            if multiple {
                let parts = distribute(&dest, value, targets.len())?;
                flat.extend(targets.into_iter().zip(parts));
            } else {
                flat.insert(dest, value);
            }
        }
        debug!(values = flat.len(), "Collected flat values");

        let mut parsed = ParsedArgs::default();
        for tree in &trees {
            parsed.extend(tree.reconstruct(&flat)?);
        }
        Ok(parsed)
    }

    /// Parses the process arguments.
    pub fn parse(&self) -> Result<ParsedArgs> {
        self.parse_from(std::env::args_os())
    }

    /// Renders the help text.
    pub fn help(&self) -> Result<String> {
        let (_, engine) = self.prepare()?;
        Ok(engine
            .command(&self.name, self.about.as_deref())
            .render_help()
            .to_string())
    }

    /// Applies the conflict mode to copies of the trees and registers them
    /// with a fresh engine.
    fn prepare(&self) -> Result<(Vec<SchemaTree>, ClapEngine)> {
        let mut trees = self.trees.clone();
        if self.conflict_resolution == ConflictResolution::AlwaysMerge {
            for tree in &mut trees {
                merge_same_records(tree)?;
            }
        }

        let names = option_names(&trees, self.conflict_resolution);
        let namer = namer(&names);
        let mut engine = ClapEngine::new();
        for tree in &mut trees {
            tree.register_with(&mut engine, &namer)?;
        }
        debug!(flags = engine.flags().len(), "Registered flags");
        Ok((trees, engine))
    }
}

/// Finds the leaf field registered under `dest` and returns all of its
/// destination keys and whether it is repeated.
fn targets_of(trees: &[SchemaTree], dest: &str) -> Option<(Vec<String>, bool)> {
    for tree in trees {
        for id in tree.preorder() {
            for field in tree.node(id).leaf_fields() {
                if tree.field_dest(id, field.name()) == dest {
                    return Some((tree.field_destinations(id, field.name()), field.multiple()));
                }
            }
        }
    }
    None
}
