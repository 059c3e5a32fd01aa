//! Reconstruction of record instances from flat parsed values.
//!
//! After parsing, every leaf value sits in a flat map keyed by its dotted
//! destination (`train.optimizer.lr`). [`SchemaTree::reconstruct`] folds that
//! map back into nested instances, innermost records first, so each parent
//! is built from already-built children.
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
//! let tree = SchemaTree::build(outer.into(), "").unwrap();
//!
//! let mut flat = FlatValues::new();
//! flat.insert("inner.y".to_string(), json!(9));
//! flat.insert("x".to_string(), json!(3));
//!
//! let instances = tree.reconstruct(&flat).unwrap();
//! assert_eq!(instances[""], json!({"inner": {"y": 9}, "x": 3}));
//! ```

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::ConstructionError;
use crate::tree::join_path;
use crate::types::value_kind;
use crate::{AttrType, NodeId, SchemaTree};

/// Parsed leaf values keyed by destination.
pub type FlatValues = IndexMap<String, Value>;

impl SchemaTree {
    /// Constructs an instance of the node's record type from named
    /// arguments.
    ///
    /// Omitted attributes take their declared default (`null` for optional
    /// types). Attributes excluded from the constructor always take their
    /// default.
    ///
    /// # Errors
    ///
    /// - [`ConstructionError::MissingParameter`] when an attribute without
    ///   a default is omitted
    /// - [`ConstructionError::TypeMismatch`] when a value does not satisfy
    ///   the declared type
    /// - [`ConstructionError::UnexpectedParameter`] for unknown names and
    ///   excluded attributes
    pub fn instantiate(
        &self,
        id: NodeId,
        mut args: Map<String, Value>,
    ) -> Result<Value, ConstructionError> {
        let record = self.node(id).record_type();
        let mut instance = Map::new();

        for attr in &record.attributes {
            if !attr.init {
                if args.contains_key(&attr.name) {
                    return Err(ConstructionError::UnexpectedParameter {
                        record: record.name.clone(),
                        parameter: attr.name.clone(),
                    });
                }
                if let Some(value) = attr.default_value() {
                    instance.insert(attr.name.clone(), value);
                }
                continue;
            }

            let value = match args.remove(&attr.name) {
                Some(value) => {
                    if !attr.ty.accepts(&value) {
                        return Err(ConstructionError::TypeMismatch {
                            record: record.name.clone(),
                            parameter: attr.name.clone(),
                            expected: attr.ty.type_name(),
                            found: value_kind(&value).to_string(),
                        });
                    }
                    value
                }
                None => match (attr.default_value(), &attr.ty) {
                    (Some(value), _) => value,
                    (None, AttrType::Optional(_)) => Value::Null,
                    (None, _) => {
                        return Err(ConstructionError::MissingParameter {
                            record: record.name.clone(),
                            parameter: attr.name.clone(),
                        });
                    }
                },
            };
            instance.insert(attr.name.clone(), value);
        }

        if let Some(parameter) = args.keys().next() {
            return Err(ConstructionError::UnexpectedParameter {
                record: record.name.clone(),
                parameter: parameter.clone(),
            });
        }

        Ok(Value::Object(instance))
    }

    /// Rebuilds the instances at the root destinations from a flat map of
    /// leaf values.
    ///
    /// Leaf values are read at `"{destination}.{field}"` for every
    /// destination of every node; nested instances are built first and
    /// handed to their parent under the attribute name. The result holds one
    /// instance per root destination, in order.
    pub fn reconstruct(&self, flat: &FlatValues) -> Result<IndexMap<String, Value>, ConstructionError> {
        let mut pending: Vec<(&str, NodeId)> = Vec::new();
        for id in self.preorder() {
            for dest in self.destinations(id) {
                pending.push((dest.as_str(), id));
            }
        }
        // Deepest destinations first; merged nodes may sit at several depths.
        pending.sort_by_key(|(dest, _)| std::cmp::Reverse(depth(dest)));

        let mut built: IndexMap<String, Value> = IndexMap::new();
        for (dest, id) in pending {
            let node = self.node(id);
            let mut args = Map::new();

            for field in node.leaf_fields() {
                if !field.attribute().init {
                    continue;
                }
                if let Some(value) = flat.get(&join_path(dest, field.name())) {
                    args.insert(field.name().to_string(), value.clone());
                }
            }
            for attr in &node.record_type().attributes {
                if !attr.ty.is_record() {
                    continue;
                }
                if let Some(child) = built.shift_remove(&join_path(dest, &attr.name)) {
                    args.insert(attr.name.clone(), child);
                }
            }

            trace!(dest, record = %node.record_type().name, "Instantiating record");
            let instance = self.instantiate(id, args)?;
            built.insert(dest.to_string(), instance);
        }

        let mut instances = IndexMap::new();
        for dest in self.destinations(Self::ROOT) {
            if let Some(instance) = built.shift_remove(dest) {
                instances.insert(dest.clone(), instance);
            }
        }
        debug!(
            record = %self.root().record_type().name,
            instances = instances.len(),
            "Reconstructed instances"
        );
        Ok(instances)
    }
}

fn depth(dest: &str) -> usize {
    if dest.is_empty() {
        0
    } else {
        dest.split('.').count()
    }
}

/// Splits the parsed value of a repeated field across `n` destinations.
///
/// A list of exactly `n` values is split one per destination, a single value
/// (or a one-element list) is duplicated.
///
/// # Errors
///
/// Returns [`ConstructionError::InconsistentArguments`] for a list of any
/// other length.
///
/// # Examples
///
/// ```
/// use schema_args_core::distribute;
/// use serde_json::json;
///
/// assert_eq!(distribute("lr", json!([0.1, 0.2]), 2).unwrap(), vec![json!(0.1), json!(0.2)]);
/// assert_eq!(distribute("lr", json!([0.1]), 2).unwrap(), vec![json!(0.1), json!(0.1)]);
/// assert!(distribute("lr", json!([0.1, 0.2, 0.3]), 2).is_err());
/// ```
pub fn distribute(field: &str, value: Value, n: usize) -> Result<Vec<Value>, ConstructionError> {
    match value {
        Value::Array(items) if items.len() == n => Ok(items),
        Value::Array(mut items) if items.len() == 1 => {
            let item = items.remove(0);
            Ok(vec![item; n])
        }
        Value::Array(items) => Err(ConstructionError::InconsistentArguments {
            field: field.to_string(),
            found: items.len(),
            expected: n,
        }),
        other => Ok(vec![other; n]),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{Attribute, RecordRef, RecordType};

    fn inner() -> RecordType {
        RecordType::new("Inner").with_attribute(Attribute::new("y", AttrType::Int).with_default(2))
    }

    fn outer() -> RecordType {
        RecordType::new("Outer")
            .with_attribute(Attribute::new("inner", AttrType::Record(RecordRef::Deferred(inner))))
            .with_attribute(Attribute::new("x", AttrType::Int))
    }

    fn flat(entries: &[(&str, Value)]) -> FlatValues {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_instantiate_fills_defaults() {
        let tree = SchemaTree::build(inner().into(), "inner").unwrap();
        let instance = tree.instantiate(SchemaTree::ROOT, Map::new()).unwrap();
        assert_eq!(instance, json!({"y": 2}));
    }

    #[test]
    fn test_instantiate_reports_missing_parameter() {
        let tree = SchemaTree::build(outer().into(), "outer").unwrap();
        let mut args = Map::new();
        args.insert("inner".to_string(), json!({"y": 1}));

        let err = tree.instantiate(SchemaTree::ROOT, args).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::MissingParameter {
                record: "Outer".to_string(),
                parameter: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_instantiate_reports_unexpected_parameter() {
        let tree = SchemaTree::build(inner().into(), "inner").unwrap();
        let mut args = Map::new();
        args.insert("z".to_string(), json!(1));

        let err = tree.instantiate(SchemaTree::ROOT, args).unwrap_err();
        assert!(matches!(err, ConstructionError::UnexpectedParameter { parameter, .. } if parameter == "z"));
    }

    #[test]
    fn test_instantiate_reports_type_mismatch() {
        let tree = SchemaTree::build(inner().into(), "inner").unwrap();
        let mut args = Map::new();
        args.insert("y".to_string(), json!("nine"));

        let err = tree.instantiate(SchemaTree::ROOT, args).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::TypeMismatch {
                record: "Inner".to_string(),
                parameter: "y".to_string(),
                expected: "int".to_string(),
                found: "str".to_string(),
            }
        );
    }

    #[test]
    fn test_instantiate_keeps_excluded_attribute_default() {
        let record = RecordType::new("Run")
            .with_attribute(Attribute::new("name", AttrType::Str))
            .with_attribute(Attribute::new("log_dir", AttrType::Str).with_default("logs").excluded());
        let tree = SchemaTree::build(record.into(), "run").unwrap();
        let mut args = Map::new();
        args.insert("name".to_string(), json!("a"));

        let instance = tree.instantiate(SchemaTree::ROOT, args).unwrap();
        assert_eq!(instance, json!({"name": "a", "log_dir": "logs"}));
    }

    #[test]
    fn test_reconstruct_nested_under_named_root() {
        let tree = SchemaTree::build(outer().into(), "outer").unwrap();
        let values = flat(&[("outer.inner.y", json!(9)), ("outer.x", json!(3))]);

        let instances = tree.reconstruct(&values).unwrap();
        assert_eq!(instances["outer"], json!({"inner": {"y": 9}, "x": 3}));
    }

    #[test]
    fn test_reconstruct_merged_tree_yields_one_instance_per_destination() {
        let mut tree = SchemaTree::build(outer().into(), "a").unwrap();
        tree.merge(&SchemaTree::build(outer().into(), "b").unwrap()).unwrap();
        let values = flat(&[
            ("a.inner.y", json!(1)),
            ("a.x", json!(10)),
            ("b.inner.y", json!(2)),
            ("b.x", json!(20)),
        ]);

        let instances = tree.reconstruct(&values).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances["a"], json!({"inner": {"y": 1}, "x": 10}));
        assert_eq!(instances["b"], json!({"inner": {"y": 2}, "x": 20}));
    }

    #[test]
    fn test_reconstruct_absorbed_sibling() {
        let pair = RecordType::new("Pair")
            .with_attribute(Attribute::new("left", AttrType::Record(RecordRef::Deferred(inner))))
            .with_attribute(Attribute::new("right", AttrType::Record(RecordRef::Deferred(inner))));
        let mut tree = SchemaTree::build(pair.into(), "pair").unwrap();
        let left = tree.children(SchemaTree::ROOT)[0];
        let right = tree.children(SchemaTree::ROOT)[1];
        let detached = tree.detach(right);
        tree.merge_subtree(left, &detached).unwrap();

        let values = flat(&[("pair.left.y", json!(4)), ("pair.right.y", json!(5))]);
        let instances = tree.reconstruct(&values).unwrap();
        assert_eq!(instances["pair"], json!({"left": {"y": 4}, "right": {"y": 5}}));
    }

    #[test]
    fn test_distribute_rejects_inconsistent_lengths() {
        let err = distribute("y", json!([1, 2, 3]), 2).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::InconsistentArguments {
                field: "y".to_string(),
                found: 3,
                expected: 2,
            }
        );
        assert_eq!(distribute("y", json!(7), 3).unwrap(), vec![json!(7); 3]);
    }
}
