//! Merging structurally identical schema trees.
//!
//! When the same record type is requested at several destinations, the trees
//! are merged into one: the command line gets a single set of flags, each
//! taking one value per destination, and every node remembers all of the
//! destinations its values are written to.
//!
//! # Example
//!
//! ```
//! use schema_args_core::*;
//!
//! let record = RecordType::new("HParams")
//!     .with_attribute(Attribute::new("lr", AttrType::Float).with_default(0.1));
//! let mut train = SchemaTree::build(record.clone().into(), "train").unwrap();
//! let valid = SchemaTree::build(record.into(), "valid").unwrap();
//!
//! train.merge(&valid).unwrap();
//! assert_eq!(train.destinations(SchemaTree::ROOT), ["train", "valid"]);
//! assert!(train.root().multiple());
//! ```

use tracing::debug;

use crate::error::ShapeMismatchError;
use crate::{NodeId, SchemaNode, SchemaTree};

impl SchemaTree {
    /// Merges a tree of the same shape into this one.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeMismatchError`] without modifying `self` when the trees
    /// differ in record type, attribute names or child counts at any
    /// preorder position.
    pub fn merge(&mut self, other: &SchemaTree) -> Result<(), ShapeMismatchError> {
        self.merge_subtree(Self::ROOT, other)
    }

    /// Merges a standalone tree into the subtree rooted at `target`.
    pub fn merge_subtree(
        &mut self,
        target: NodeId,
        other: &SchemaTree,
    ) -> Result<(), ShapeMismatchError> {
        let ours = self.subtree(target);
        let theirs = other.preorder();
        self.check_shape(&ours, other, &theirs)?;

        for (&a, &b) in ours.iter().zip(&theirs) {
            let extra = other.nodes[b.0].destinations.clone();
            self.nodes[a.0].destinations.extend(extra);
        }
        self.set_multiple(target, true);

        debug!(
            record = %self.nodes[target.0].record_type().name,
            destinations = ?self.nodes[target.0].destinations,
            "Merged schema trees"
        );
        Ok(())
    }

    /// Removes the subtree rooted at `id` from its parent and returns it as a
    /// standalone tree. Destinations, prefix and flags are preserved.
    pub fn detach(&mut self, id: NodeId) -> SchemaTree {
        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }

        let ids = self.subtree(id);
        let mut nodes: Vec<SchemaNode> = ids.iter().map(|old| self.nodes[old.0].clone()).collect();
        let remap = |old: NodeId| {
            ids.iter()
                .position(|candidate| *candidate == old)
                .map(NodeId)
        };
        for node in &mut nodes {
            node.parent = node.parent.and_then(remap);
            node.children = node.children.iter().filter_map(|c| remap(*c)).collect();
        }

        debug!(
            record = %nodes[0].record_type().name,
            "Detached schema subtree"
        );
        SchemaTree { nodes }
    }

    fn check_shape(
        &self,
        ours: &[NodeId],
        other: &SchemaTree,
        theirs: &[NodeId],
    ) -> Result<(), ShapeMismatchError> {
        for (position, pair) in ours.iter().zip(theirs).enumerate() {
            let expected = self.shape(*pair.0);
            let found = other.shape(*pair.1);
            if expected != found {
                return Err(ShapeMismatchError {
                    position,
                    expected,
                    found,
                });
            }
        }
        if ours.len() != theirs.len() {
            let position = ours.len().min(theirs.len());
            let describe = |tree: &SchemaTree, ids: &[NodeId]| {
                ids.get(position)
                    .map(|id| tree.shape(*id))
                    .unwrap_or_else(|| "missing".to_string())
            };
            return Err(ShapeMismatchError {
                position,
                expected: describe(self, ours),
                found: describe(other, theirs),
            });
        }
        Ok(())
    }

    /// Structural signature of a node: record name, attribute names and child
    /// count.
    fn shape(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        let record = node.record_type();
        let attributes = record
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{}({attributes}) with {} children",
            record.name,
            node.children.len()
        )
    }
}
