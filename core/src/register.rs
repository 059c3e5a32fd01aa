//! Registration of schema trees with a flag-parsing engine.
//!
//! The core crate does not depend on any particular argument parser. An
//! engine implements [`FlagRegistry`]; [`SchemaTree::register`] walks the
//! tree in preorder, opens one group per node and adds one flag per leaf
//! field that has parsing options.

use tracing::{debug, trace};

use crate::{FieldDescriptor, NodeId, ParsingOptions, SchemaTree};

/// Handle for an argument group opened on a [`FlagRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub usize);

/// One flag to register.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSpec {
    /// Option string, e.g. `--train.batch_size`.
    pub option: String,
    /// Flat destination key the parsed value is stored under.
    pub dest: String,
    /// How to parse the flag.
    pub options: ParsingOptions,
}

/// A flag-parsing engine that can receive groups and flags.
pub trait FlagRegistry {
    type Error;

    /// Opens a titled group and returns its handle.
    fn add_group(&mut self, title: &str, description: Option<&str>) -> GroupId;

    /// Adds a flag to a group.
    fn add_flag(&mut self, group: GroupId, flag: FlagSpec) -> Result<(), Self::Error>;
}

/// Computes the option string for a leaf field.
pub trait OptionNamer {
    fn option_name(&self, tree: &SchemaTree, node: NodeId, field: &FieldDescriptor) -> String;
}

impl<F> OptionNamer for F
where
    F: Fn(&SchemaTree, NodeId, &FieldDescriptor) -> String,
{
    fn option_name(&self, tree: &SchemaTree, node: NodeId, field: &FieldDescriptor) -> String {
        self(tree, node, field)
    }
}

/// Default naming: `--{prefix}{field}`.
///
/// # Examples
///
/// ```
/// use schema_args_core::*;
///
/// let record = RecordType::new("Config")
///     .with_attribute(Attribute::new("lr", AttrType::Float).with_default(0.1));
/// let mut tree = SchemaTree::build(record.into(), "config").unwrap();
/// tree.set_prefix(SchemaTree::ROOT, "train.");
///
/// let field = &tree.root().leaf_fields()[0];
/// assert_eq!(PrefixedNamer.option_name(&tree, SchemaTree::ROOT, field), "--train.lr");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixedNamer;

impl OptionNamer for PrefixedNamer {
    fn option_name(&self, tree: &SchemaTree, node: NodeId, field: &FieldDescriptor) -> String {
        format!("--{}{}", tree.node(node).prefix(), field.name())
    }
}

impl SchemaTree {
    /// Registers every node and leaf with `registry` using [`PrefixedNamer`].
    pub fn register<R: FlagRegistry>(&mut self, registry: &mut R) -> Result<(), R::Error> {
        self.register_with(registry, &PrefixedNamer)
    }

    /// Registers every node and leaf with `registry`, naming options with
    /// `namer`.
    ///
    /// Block defaults are pushed onto the leaf fields first. Leaves without
    /// parsing options (excluded attributes) are skipped.
    pub fn register_with<R, N>(&mut self, registry: &mut R, namer: &N) -> Result<(), R::Error>
    where
        R: FlagRegistry,
        N: OptionNamer + ?Sized,
    {
        self.apply_defaults();

        for id in self.preorder() {
            let title = self.title(id);
            let description = self.description(id);
            let group = registry.add_group(&title, description.as_deref());
            debug!(group = %title, "Registering schema node");

            for field in self.node(id).leaf_fields() {
                let Some(options) = field.parsing_options() else {
                    trace!(field = field.name(), "Skipping field without parsing options");
                    continue;
                };
                let flag = FlagSpec {
                    option: namer.option_name(self, id, field),
                    dest: self.field_dest(id, field.name()),
                    options,
                };
                trace!(option = %flag.option, dest = %flag.dest, "Adding flag");
                registry.add_flag(group, flag)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{AttrType, Attribute, RecordRef, RecordType};

    #[derive(Default)]
    struct Recorder {
        groups: Vec<String>,
        flags: Vec<(GroupId, FlagSpec)>,
    }

    impl FlagRegistry for Recorder {
        type Error = String;

        fn add_group(&mut self, title: &str, _description: Option<&str>) -> GroupId {
            self.groups.push(title.to_string());
            GroupId(self.groups.len() - 1)
        }

        fn add_flag(&mut self, group: GroupId, flag: FlagSpec) -> Result<(), String> {
            self.flags.push((group, flag));
            Ok(())
        }
    }

    fn inner() -> RecordType {
        RecordType::new("Inner")
            .with_attribute(Attribute::new("y", AttrType::Int).with_default(2))
            .with_attribute(Attribute::new("cache", AttrType::Str).excluded())
    }

    fn outer() -> RecordType {
        RecordType::new("Outer")
            .with_attribute(Attribute::new("inner", AttrType::Record(RecordRef::Deferred(inner))))
            .with_attribute(Attribute::new("x", AttrType::Int))
    }

    #[test]
    fn test_register_opens_group_per_node() {
        let mut tree = SchemaTree::build(outer().into(), "outer").unwrap();
        let mut recorder = Recorder::default();
        tree.register(&mut recorder).unwrap();

        assert_eq!(
            recorder.groups,
            vec!["Outer ['outer']".to_string(), "Inner ['outer.inner']".to_string()]
        );
    }

    #[test]
    fn test_register_skips_excluded_fields() {
        let mut tree = SchemaTree::build(outer().into(), "outer").unwrap();
        let mut recorder = Recorder::default();
        tree.register(&mut recorder).unwrap();

        let dests: Vec<&str> = recorder.flags.iter().map(|(_, f)| f.dest.as_str()).collect();
        assert_eq!(dests, vec!["outer.x", "outer.inner.y"]);
        assert_eq!(recorder.flags[1].0, GroupId(1));
    }

    #[test]
    fn test_register_advertises_block_default() {
        let mut tree =
            SchemaTree::build_with_default(outer().into(), "outer", json!({"inner": {"y": 7}}))
                .unwrap();
        let mut recorder = Recorder::default();
        tree.register(&mut recorder).unwrap();

        let (_, flag) = &recorder.flags[1];
        assert_eq!(flag.option, "--y");
        assert_eq!(flag.options.default, Some(json!(7)));
    }

    #[test]
    fn test_register_with_closure_namer() {
        let mut tree = SchemaTree::build(outer().into(), "outer").unwrap();
        let mut recorder = Recorder::default();
        let namer = |tree: &SchemaTree, id: NodeId, field: &FieldDescriptor| {
            format!("--{}", tree.field_dest(id, field.name()))
        };
        tree.register_with(&mut recorder, &namer).unwrap();

        let options: Vec<&str> = recorder.flags.iter().map(|(_, f)| f.option.as_str()).collect();
        assert_eq!(options, vec!["--outer.x", "--outer.inner.y"]);
    }
}
