//! Schema trees built from nested record types.
//!
//! A [`SchemaTree`] is an arena of [`SchemaNode`]s addressed by [`NodeId`].
//! Nodes are allocated in preorder while the tree is built, so the root is
//! always [`SchemaTree::ROOT`] and two trees built from the same record type
//! line up node for node. Children are owned through the `children` list;
//! the `parent` link is only used for lookups.
//!
//! Derived properties (destinations, resolved defaults) are computed while
//! the tree is built and refreshed by the explicit mutation methods, so they
//! are never stale.
//!
//! # Example
//!
//! ```
//! use schema_args_core::*;
//!
//! let inner = RecordType::new("Inner")
//!     .with_attribute(Attribute::new("y", AttrType::Int).with_default(2));
//! let outer = RecordType::new("Outer")
//!     .with_attribute(Attribute::new("inner", AttrType::shared(inner.into())))
//!     .with_attribute(Attribute::new("x", AttrType::Int));
//!
//! let tree = SchemaTree::build(outer.into(), "outer").unwrap();
//! let inner_id = tree.children(SchemaTree::ROOT)[0];
//! assert_eq!(tree.destinations(inner_id), ["outer.inner"]);
//! assert_eq!(tree.dest(inner_id), "outer.inner");
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::SchemaError;
use crate::{AttrType, Attribute, FieldDescriptor, Record, RecordType, validate_record};

/// Maximum depth of nested records followed while building a tree.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Index of a node inside a [`SchemaTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Preorder position of the node at build time.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One record type's position within a nested schema.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub(crate) record_type: Arc<RecordType>,
    pub(crate) attribute_name: String,
    pub(crate) attribute: Option<Attribute>,
    pub(crate) leaf_fields: Vec<FieldDescriptor>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) prefix: String,
    pub(crate) required: bool,
    pub(crate) multiple: bool,
    pub(crate) explicit: bool,
    pub(crate) destinations: Vec<String>,
    pub(crate) default_override: Option<Value>,
    pub(crate) default: Option<Value>,
}

impl SchemaNode {
    /// The record type described by this node.
    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// Name of the attribute this node sits under (empty for an unnamed root).
    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    /// The declaring attribute on the parent's record type (`None` for the root).
    pub fn attribute(&self) -> Option<&Attribute> {
        self.attribute.as_ref()
    }

    /// Leaf fields in declaration order.
    pub fn leaf_fields(&self) -> &[FieldDescriptor] {
        &self.leaf_fields
    }

    /// Mutable access to the leaf fields.
    pub fn leaf_fields_mut(&mut self) -> &mut [FieldDescriptor] {
        &mut self.leaf_fields
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn multiple(&self) -> bool {
        self.multiple
    }

    /// Whether the node was chosen explicitly rather than auto-discovered.
    /// Presentation only.
    pub fn explicit(&self) -> bool {
        self.explicit
    }
}

/// Tree of schema nodes for one root record type.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    pub(crate) nodes: Vec<SchemaNode>,
}

impl SchemaTree {
    /// Id of the root node.
    pub const ROOT: NodeId = NodeId(0);

    /// Builds the tree for `record`, placed under `attribute_name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnsupportedSchema`] for containers of nested
    /// records, [`SchemaError::RecursiveRecord`] when a record contains
    /// itself, [`SchemaError::TooDeep`] past [`MAX_NESTING_DEPTH`], and
    /// [`SchemaError::InvalidRecord`] when a record fails validation.
    pub fn build(record: Arc<RecordType>, attribute_name: &str) -> Result<Self, SchemaError> {
        let mut tree = Self { nodes: Vec::new() };
        let mut lineage = Vec::new();
        tree.add_node(record, attribute_name, None, None, &mut lineage)?;
        debug!(
            record = %tree.nodes[0].record_type.name,
            dest = attribute_name,
            nodes = tree.nodes.len(),
            "Built schema tree"
        );
        Ok(tree)
    }

    /// Builds the tree with an externally supplied default instance for
    /// the root.
    pub fn build_with_default(
        record: Arc<RecordType>,
        attribute_name: &str,
        default: Value,
    ) -> Result<Self, SchemaError> {
        let mut tree = Self::build(record, attribute_name)?;
        tree.set_default(Self::ROOT, default);
        Ok(tree)
    }

    /// Builds the tree for a [`Record`] type.
    pub fn build_record<T: Record>(attribute_name: &str) -> Result<Self, SchemaError> {
        Self::build(Arc::new(T::record_type()), attribute_name)
    }

    fn add_node(
        &mut self,
        record: Arc<RecordType>,
        attribute_name: &str,
        attribute: Option<Attribute>,
        parent: Option<NodeId>,
        lineage: &mut Vec<String>,
    ) -> Result<NodeId, SchemaError> {
        if lineage.iter().any(|name| *name == record.name) {
            let path = lineage
                .iter()
                .cloned()
                .chain(std::iter::once(record.name.clone()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(SchemaError::RecursiveRecord {
                record: record.name.clone(),
                path,
            });
        }
        if lineage.len() >= MAX_NESTING_DEPTH {
            return Err(SchemaError::TooDeep {
                path: lineage.join(" -> "),
                max: MAX_NESTING_DEPTH,
            });
        }
        if let Some(source) = validate_record(&record).into_iter().next() {
            return Err(SchemaError::InvalidRecord {
                record: record.name.clone(),
                source,
            });
        }

        let id = NodeId(self.nodes.len());
        let (prefix, required, destinations) = match parent {
            Some(parent) => {
                let parent = &self.nodes[parent.0];
                let destinations = parent
                    .destinations
                    .iter()
                    .map(|d| join_path(d, attribute_name))
                    .collect();
                (parent.prefix.clone(), parent.required, destinations)
            }
            None => (String::new(), false, vec![attribute_name.to_string()]),
        };

        self.nodes.push(SchemaNode {
            record_type: Arc::clone(&record),
            attribute_name: attribute_name.to_string(),
            attribute,
            leaf_fields: Vec::new(),
            children: Vec::new(),
            parent,
            prefix,
            required,
            multiple: false,
            explicit: false,
            destinations,
            default_override: None,
            default: None,
        });
        self.nodes[id.0].default = self.resolve_default(id);

        lineage.push(record.name.clone());
        for attr in &record.attributes {
            match &attr.ty {
                AttrType::Record(nested) => {
                    trace!(record = %record.name, attribute = %attr.name, "Nesting record");
                    let child =
                        self.add_node(nested.resolve(), &attr.name, Some(attr.clone()), Some(id), lineage)?;
                    self.nodes[id.0].children.push(child);
                }
                ty if ty.contains_record() => {
                    return Err(SchemaError::UnsupportedSchema {
                        record: record.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
                _ => {
                    let mut field = FieldDescriptor::new(attr.clone());
                    field.set_parent_required(required);
                    self.nodes[id.0].leaf_fields.push(field);
                }
            }
        }
        lineage.pop();

        Ok(id)
    }

    /// Returns the node with the given id.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Returns the node with the given id, mutably.
    pub fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    /// Root node.
    pub fn root(&self) -> &SchemaNode {
        self.node(Self::ROOT)
    }

    /// Child ids of a node, in declaration order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Reachable node ids in preorder, starting at `id`.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    /// All reachable node ids in preorder.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.subtree(Self::ROOT)
    }

    /// Reachable descendants of `id` in preorder, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut nodes = self.subtree(id);
        nodes.remove(0);
        nodes
    }

    /// Dotted attribute path from the root to this node.
    ///
    /// Empty components (an unnamed root) are skipped.
    pub fn dest(&self, id: NodeId) -> String {
        let mut lineage = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            lineage.push(self.nodes[node.0].attribute_name.as_str());
            current = self.nodes[node.0].parent;
        }
        lineage.reverse();
        lineage
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Destination paths where this node's reconstructed values are
    /// written. More than one after a merge.
    pub fn destinations(&self, id: NodeId) -> &[String] {
        &self.nodes[id.0].destinations
    }

    /// Destination keys of a leaf field, one per node destination.
    pub fn field_destinations(&self, id: NodeId, field: &str) -> Vec<String> {
        self.nodes[id.0]
            .destinations
            .iter()
            .map(|d| join_path(d, field))
            .collect()
    }

    /// Key under which a leaf field is registered with the flag-parsing
    /// engine: the field under the node's first destination.
    pub fn field_dest(&self, id: NodeId, field: &str) -> String {
        let first = self.nodes[id.0]
            .destinations
            .first()
            .map(String::as_str)
            .unwrap_or_default();
        join_path(first, field)
    }

    /// Resolved default instance of a node.
    ///
    /// An override set with [`set_default`](Self::set_default) wins, then
    /// the value carried for this attribute by the parent's resolved
    /// default, then the declaring attribute's own default.
    pub fn default(&self, id: NodeId) -> Option<&Value> {
        self.nodes[id.0].default.as_ref()
    }

    fn resolve_default(&self, id: NodeId) -> Option<Value> {
        let node = &self.nodes[id.0];
        if let Some(value) = &node.default_override {
            return Some(value.clone());
        }
        let from_parent = node
            .parent
            .and_then(|parent| self.nodes[parent.0].default.as_ref())
            .and_then(|parent_default| parent_default.get(&node.attribute_name))
            .filter(|value| !value.is_null())
            .cloned();
        from_parent.or_else(|| node.attribute.as_ref().and_then(Attribute::default_value))
    }

    /// Sets an override default instance on a node and refreshes the
    /// resolved defaults of its subtree.
    pub fn set_default(&mut self, id: NodeId, value: Value) {
        self.nodes[id.0].default_override = Some(value);
        for node in self.subtree(id) {
            self.nodes[node.0].default = self.resolve_default(node);
        }
    }

    /// Pushes each node's resolved default instance down onto its leaf
    /// fields, so a default given for a whole block wins over the
    /// individually declared field defaults.
    pub fn apply_defaults(&mut self) {
        for id in self.preorder() {
            let node = &mut self.nodes[id.0];
            let Some(Value::Object(instance)) = &node.default else {
                continue;
            };
            for field in &mut node.leaf_fields {
                let Some(value) = instance.get(field.name()) else {
                    continue;
                };
                if value.is_null() && !matches!(field.declared_type(), AttrType::Optional(_)) {
                    continue;
                }
                trace!(
                    record = %node.record_type.name,
                    field = field.name(),
                    default = %value,
                    "Applying block default"
                );
                field.set_default(value.clone());
            }
        }
    }

    /// Group description: the declaring attribute's documentation, else the
    /// record type's own documentation.
    pub fn description(&self, id: NodeId) -> Option<String> {
        let node = &self.nodes[id.0];
        node.attribute
            .as_ref()
            .and_then(|attr| attr.docs.preferred())
            .or(node.record_type.doc.as_deref())
            .map(str::to_string)
    }

    /// Group heading: the record name annotated with its destinations.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_args_core::*;
    ///
    /// let record = RecordType::new("Config")
    ///     .with_attribute(Attribute::new("a", AttrType::Int).with_default(1));
    /// let tree = SchemaTree::build(record.into(), "config").unwrap();
    /// assert_eq!(tree.title(SchemaTree::ROOT), "Config ['config']");
    /// ```
    pub fn title(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        let names = node
            .destinations
            .iter()
            .map(|d| format!("'{d}'"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} [{names}]", node.record_type.name)
    }

    /// Sets the option prefix on a node and every descendant.
    pub fn set_prefix(&mut self, id: NodeId, prefix: &str) {
        for node in self.subtree(id) {
            self.nodes[node.0].prefix = prefix.to_string();
        }
    }

    /// Sets the required flag on a node and every descendant, and on their
    /// leaf fields.
    pub fn set_required(&mut self, id: NodeId, required: bool) {
        for node in self.subtree(id) {
            let node = &mut self.nodes[node.0];
            node.required = required;
            for field in &mut node.leaf_fields {
                field.set_parent_required(required);
            }
        }
    }

    /// Sets the repeated flag on a node, every descendant and their leaf
    /// fields.
    pub fn set_multiple(&mut self, id: NodeId, multiple: bool) {
        for node in self.subtree(id) {
            let node = &mut self.nodes[node.0];
            node.multiple = multiple;
            for field in &mut node.leaf_fields {
                field.set_multiple(multiple);
            }
        }
    }

    /// Marks a node as explicitly chosen.
    pub fn set_explicit(&mut self, id: NodeId, explicit: bool) {
        self.nodes[id.0].explicit = explicit;
    }
}

/// Joins two destination components, skipping empty ones.
pub(crate) fn join_path(parent: &str, name: &str) -> String {
    match (parent.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{parent}.{name}"),
    }
}
