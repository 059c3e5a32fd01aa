//! Option-string conflict resolution.
//!
//! Every leaf field is offered to the command line as `--{prefix}{field}` by
//! default. When several fields share a name, a [`ConflictResolution`] mode
//! decides what happens.

use std::collections::HashMap;

use schema_args_core::{FieldDescriptor, NodeId, SchemaTree, ShapeMismatchError};
use tracing::debug;

/// How to handle two fields that would get the same option string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Report a [`ParseError::Conflict`](crate::ParseError::Conflict).
    #[default]
    Error,
    /// Disambiguate only the conflicting options, using the shortest
    /// dotted suffix of their destination that is unique.
    Auto,
    /// Name every option by its full destination.
    Explicit,
    /// Merge nested positions of the same record type into one repeated
    /// node, then disambiguate like [`Auto`](Self::Auto).
    AlwaysMerge,
}

impl ConflictResolution {
    /// Parses a mode name (`error`, `auto`, `explicit`, `always_merge`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "error" => Some(Self::Error),
            "auto" => Some(Self::Auto),
            "explicit" => Some(Self::Explicit),
            "always_merge" | "merge" => Some(Self::AlwaysMerge),
            _ => None,
        }
    }
}

struct Entry {
    dest: String,
    prefix: String,
    field: String,
}

/// Computes the option string of every registrable leaf field, keyed by the
/// field's flat destination.
pub(crate) fn option_names(
    trees: &[SchemaTree],
    mode: ConflictResolution,
) -> HashMap<String, String> {
    let mut entries = Vec::new();
    for tree in trees {
        for id in tree.preorder() {
            let node = tree.node(id);
            for field in node.leaf_fields() {
                if field.parsing_options().is_none() {
                    continue;
                }
                entries.push(Entry {
                    dest: tree.field_dest(id, field.name()),
                    prefix: node.prefix().to_string(),
                    field: field.name().to_string(),
                });
            }
        }
    }

    let base = |entry: &Entry| format!("--{}{}", entry.prefix, entry.field);
    let mut names = HashMap::with_capacity(entries.len());
    match mode {
        ConflictResolution::Error => {
            for entry in &entries {
                names.insert(entry.dest.clone(), base(entry));
            }
        }
        ConflictResolution::Explicit => {
            for entry in &entries {
                names.insert(entry.dest.clone(), format!("--{}{}", entry.prefix, entry.dest));
            }
        }
        ConflictResolution::Auto | ConflictResolution::AlwaysMerge => {
            let mut by_option: HashMap<String, Vec<&Entry>> = HashMap::new();
            for entry in &entries {
                by_option.entry(base(entry)).or_default().push(entry);
            }
            for entry in &entries {
                let option = base(entry);
                let group = &by_option[&option];
                if group.len() == 1 {
                    names.insert(entry.dest.clone(), option);
                    continue;
                }
                let others: Vec<&str> = group
                    .iter()
                    .filter(|other| other.dest != entry.dest)
                    .map(|other| other.dest.as_str())
                    .collect();
                let suffix = unique_suffix(&entry.dest, &others);
                debug!(dest = %entry.dest, option = %suffix, "Disambiguated conflicting option");
                names.insert(entry.dest.clone(), format!("--{}{suffix}", entry.prefix));
            }
        }
    }
    names
}

/// Shortest dotted suffix of `dest` that is not also the same-length
/// suffix of any of `others`.
fn unique_suffix(dest: &str, others: &[&str]) -> String {
    let parts: Vec<&str> = dest.split('.').collect();
    for k in 1..=parts.len() {
        let candidate = parts[parts.len() - k..].join(".");
        let clash = others.iter().any(|other| {
            let other_parts: Vec<&str> = other.split('.').collect();
            let start = other_parts.len().saturating_sub(k);
            other_parts[start..].join(".") == candidate
        });
        if !clash {
            return candidate;
        }
    }
    dest.to_string()
}

/// Names options from a precomputed map, falling back to the default
/// `--{prefix}{field}` form.
pub(crate) fn namer(
    names: &HashMap<String, String>,
) -> impl Fn(&SchemaTree, NodeId, &FieldDescriptor) -> String + '_ {
    move |tree: &SchemaTree, id: NodeId, field: &FieldDescriptor| {
        names
            .get(&tree.field_dest(id, field.name()))
            .cloned()
            .unwrap_or_else(|| format!("--{}{}", tree.node(id).prefix(), field.name()))
    }
}

/// Merges every pair of non-root nodes of the same record type within a
/// tree, until no two remain.
pub(crate) fn merge_same_records(tree: &mut SchemaTree) -> Result<(), ShapeMismatchError> {
    while let Some((target, source)) = find_same_record_pair(tree) {
        debug!(
            record = %tree.node(target).record_type().name,
            target = ?tree.destinations(target),
            source = ?tree.destinations(source),
            "Merging nested record positions"
        );
        let detached = tree.detach(source);
        tree.merge_subtree(target, &detached)?;
    }
    Ok(())
}

fn find_same_record_pair(tree: &SchemaTree) -> Option<(NodeId, NodeId)> {
    let nodes = tree.descendants(SchemaTree::ROOT);
    for (i, &a) in nodes.iter().enumerate() {
        let name = &tree.node(a).record_type().name;
        if let Some(&b) = nodes[i + 1..]
            .iter()
            .find(|&&b| tree.node(b).record_type().name == *name)
        {
            return Some((a, b));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use schema_args_core::{AttrType, Attribute, RecordRef, RecordType};

    use super::*;

    fn leaf() -> RecordType {
        RecordType::new("Leaf").with_attribute(Attribute::new("n", AttrType::Int).with_default(1))
    }

    fn pair() -> RecordType {
        RecordType::new("Pair")
            .with_attribute(Attribute::new("left", AttrType::Record(RecordRef::Deferred(leaf))))
            .with_attribute(Attribute::new("right", AttrType::Record(RecordRef::Deferred(leaf))))
    }

    #[test]
    fn test_unique_suffix_is_shortest() {
        assert_eq!(unique_suffix("a.left.n", &["a.right.n"]), "left.n");
        assert_eq!(unique_suffix("x.n", &["y.x.n"]), "x.n");
        assert_eq!(unique_suffix("y.x.n", &["x.n"]), "y.x.n");
    }

    #[test]
    fn test_auto_only_renames_conflicts() {
        let tree = SchemaTree::build(pair().into(), "pair").unwrap();
        let names = option_names(&[tree], ConflictResolution::Auto);
        assert_eq!(names["pair.left.n"], "--left.n");
        assert_eq!(names["pair.right.n"], "--right.n");
    }

    #[test]
    fn test_explicit_uses_full_destination() {
        let tree = SchemaTree::build(pair().into(), "pair").unwrap();
        let names = option_names(&[tree], ConflictResolution::Explicit);
        assert_eq!(names["pair.left.n"], "--pair.left.n");
    }

    #[test]
    fn test_error_mode_keeps_plain_names() {
        let tree = SchemaTree::build(pair().into(), "pair").unwrap();
        let names = option_names(&[tree], ConflictResolution::Error);
        assert_eq!(names["pair.left.n"], "--n");
        assert_eq!(names["pair.right.n"], "--n");
    }

    #[test]
    fn test_merge_same_records_absorbs_sibling() {
        let mut tree = SchemaTree::build(pair().into(), "pair").unwrap();
        merge_same_records(&mut tree).unwrap();

        let children = tree.children(SchemaTree::ROOT);
        assert_eq!(children.len(), 1);
        assert_eq!(tree.destinations(children[0]), ["pair.left", "pair.right"]);
        assert!(tree.node(children[0]).multiple());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(ConflictResolution::from_name("auto"), Some(ConflictResolution::Auto));
        assert_eq!(
            ConflictResolution::from_name("always-merge"),
            Some(ConflictResolution::AlwaysMerge)
        );
        assert_eq!(ConflictResolution::from_name("nope"), None);
    }
}
