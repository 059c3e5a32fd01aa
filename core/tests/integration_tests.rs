use std::sync::Arc;

use schema_args_core::{
    AttrType, Attribute, ConstructionError, FlagRegistry, FlagSpec, FlatValues, GroupId, Nargs,
    Record, RecordType, SchemaError, SchemaTree, MAX_NESTING_DEPTH,
};
use serde::Deserialize;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Registry double that records everything it is given.
#[derive(Debug, Default)]
struct RecordingRegistry {
    groups: Vec<(String, Option<String>)>,
    flags: Vec<(GroupId, FlagSpec)>,
}

impl RecordingRegistry {
    fn flag(&self, dest: &str) -> &FlagSpec {
        self.flags
            .iter()
            .map(|(_, flag)| flag)
            .find(|flag| flag.dest == dest)
            .unwrap_or_else(|| panic!("no flag registered for {dest}"))
    }
}

impl FlagRegistry for RecordingRegistry {
    type Error = std::convert::Infallible;

    fn add_group(&mut self, title: &str, description: Option<&str>) -> GroupId {
        self.groups
            .push((title.to_string(), description.map(String::from)));
        GroupId(self.groups.len() - 1)
    }

    fn add_flag(&mut self, group: GroupId, flag: FlagSpec) -> Result<(), Self::Error> {
        self.flags.push((group, flag));
        Ok(())
    }
}

#[derive(Debug, PartialEq, Deserialize)]
struct Inner {
    y: i64,
}

impl Record for Inner {
    fn record_type() -> RecordType {
        RecordType::new("Inner")
            .with_doc("Inner settings")
            .with_attribute(Attribute::new("y", AttrType::Int).with_default(2))
    }
}

#[derive(Debug, PartialEq, Deserialize)]
struct Outer {
    inner: Inner,
    x: i64,
}

impl Record for Outer {
    fn record_type() -> RecordType {
        RecordType::new("Outer")
            .with_attribute(
                Attribute::new("inner", AttrType::record::<Inner>()).with_doc("Nested block"),
            )
            .with_attribute(Attribute::new("x", AttrType::Int))
    }
}

fn flat_record() -> RecordType {
    RecordType::new("Flat")
        .with_attribute(Attribute::new("a", AttrType::Int).with_default(1))
        .with_attribute(Attribute::new("b", AttrType::Str))
}

fn flat(entries: &[(&str, Value)]) -> FlatValues {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

#[test]
fn test_scalar_only_record_has_one_leaf_per_attribute() {
    let tree = SchemaTree::build(flat_record().into(), "flat").unwrap();
    assert!(tree.children(SchemaTree::ROOT).is_empty());
    assert_eq!(tree.root().leaf_fields().len(), 2);
    assert_eq!(tree.preorder().len(), 1);
}

#[test]
fn test_child_destination_is_parent_plus_attribute() {
    let tree = SchemaTree::build_record::<Outer>("config").unwrap();
    for id in tree.descendants(SchemaTree::ROOT) {
        let parent = tree.node(id).parent().unwrap();
        let expected: Vec<String> = tree
            .destinations(parent)
            .iter()
            .map(|d| format!("{d}.{}", tree.node(id).attribute_name()))
            .collect();
        assert_eq!(tree.destinations(id), expected.as_slice());
    }
}

#[test]
fn test_container_of_records_fails_before_registration() {
    let record = RecordType::new("Stack")
        .with_attribute(Attribute::new("layers", AttrType::list(AttrType::record::<Inner>())));

    let err = SchemaTree::build(record.into(), "stack").unwrap_err();
    assert!(matches!(err, SchemaError::UnsupportedSchema { attribute, .. } if attribute == "layers"));
}

#[test]
fn test_optional_record_is_unsupported() {
    let record = RecordType::new("Maybe")
        .with_attribute(Attribute::new("inner", AttrType::optional(AttrType::record::<Inner>())));

    assert!(matches!(
        SchemaTree::build(record.into(), "maybe"),
        Err(SchemaError::UnsupportedSchema { .. })
    ));
}

#[test]
fn test_nesting_deeper_than_limit_is_rejected() {
    let mut record = RecordType::new("R0").with_attribute(Attribute::new("v", AttrType::Int));
    for i in 1..=MAX_NESTING_DEPTH + 4 {
        record = RecordType::new(&format!("R{i}"))
            .with_attribute(Attribute::new("next", AttrType::shared(Arc::new(record))));
    }

    let err = SchemaTree::build(record.into(), "deep").unwrap_err();
    assert!(matches!(err, SchemaError::TooDeep { max, .. } if max == MAX_NESTING_DEPTH));
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

#[test]
fn test_prefix_propagation_is_idempotent() {
    let mut tree = SchemaTree::build_record::<Outer>("config").unwrap();
    tree.set_prefix(SchemaTree::ROOT, "p.");
    let once: Vec<String> = tree
        .preorder()
        .into_iter()
        .map(|id| tree.node(id).prefix().to_string())
        .collect();
    tree.set_prefix(SchemaTree::ROOT, "p.");
    let twice: Vec<String> = tree
        .preorder()
        .into_iter()
        .map(|id| tree.node(id).prefix().to_string())
        .collect();

    assert_eq!(once, twice);
    assert!(once.iter().all(|p| p == "p."));
}

#[test]
fn test_prefix_only_changes_option_strings() {
    let mut tree = SchemaTree::build_record::<Outer>("config").unwrap();
    tree.set_prefix(SchemaTree::ROOT, "p.");
    let mut registry = RecordingRegistry::default();
    tree.register(&mut registry).unwrap();

    let flag = registry.flag("config.inner.y");
    assert_eq!(flag.option, "--p.y");
}

#[test]
fn test_default_propagation_advertises_block_default() {
    let mut tree =
        SchemaTree::build_with_default(Outer::record_type().into(), "config", json!({"inner": {"y": 7}, "x": 1}))
            .unwrap();
    let mut registry = RecordingRegistry::default();
    tree.register(&mut registry).unwrap();

    assert_eq!(registry.flag("config.inner.y").options.default, Some(json!(7)));
    assert_eq!(registry.flag("config.x").options.default, Some(json!(1)));
    assert!(!registry.flag("config.x").options.required);
}

#[test]
fn test_groups_carry_titles_and_descriptions() {
    let mut tree = SchemaTree::build_record::<Outer>("config").unwrap();
    let mut registry = RecordingRegistry::default();
    tree.register(&mut registry).unwrap();

    assert_eq!(
        registry.groups,
        vec![
            ("Outer ['config']".to_string(), None),
            (
                "Inner ['config.inner']".to_string(),
                Some("Nested block".to_string())
            ),
        ]
    );
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

#[test]
fn test_merging_structural_copy_doubles_destinations() {
    let mut tree = SchemaTree::build_record::<Outer>("a").unwrap();
    let copy = SchemaTree::build_record::<Outer>("b").unwrap();
    let before: Vec<usize> = tree
        .preorder()
        .into_iter()
        .map(|id| tree.destinations(id).len())
        .collect();

    tree.merge(&copy).unwrap();

    for (id, count) in tree.preorder().into_iter().zip(before) {
        assert_eq!(tree.destinations(id).len(), count * 2);
        assert!(tree.node(id).multiple());
    }
}

#[test]
fn test_merged_tree_registers_repeated_flags() {
    let mut tree = SchemaTree::build_record::<Outer>("a").unwrap();
    tree.merge(&SchemaTree::build_record::<Outer>("b").unwrap())
        .unwrap();
    let mut registry = RecordingRegistry::default();
    tree.register(&mut registry).unwrap();

    let y = registry.flag("a.inner.y");
    assert_eq!(y.options.nargs, Nargs::ZeroOrMore);
    assert_eq!(y.options.default, Some(json!([2])));

    let x = registry.flag("a.x");
    assert_eq!(x.options.nargs, Nargs::OneOrMore);
    assert!(x.options.required);
    assert_eq!(registry.groups[0].0, "Outer ['a', 'b']");
}

// ---------------------------------------------------------------------------
// Reconstruction
// ---------------------------------------------------------------------------

#[test]
fn test_flat_round_trip() {
    let tree = SchemaTree::build(flat_record().into(), "").unwrap();
    let values = flat(&[("a", json!(5)), ("b", json!("x"))]);

    let instances = tree.reconstruct(&values).unwrap();
    assert_eq!(instances[""], json!({"a": 5, "b": "x"}));
}

#[test]
fn test_nested_round_trip_into_typed_struct() {
    let tree = SchemaTree::build_record::<Outer>("").unwrap();
    let values = flat(&[("inner.y", json!(9)), ("x", json!(3))]);

    let instances = tree.reconstruct(&values).unwrap();
    let outer: Outer = serde_json::from_value(instances[""].clone()).unwrap();
    assert_eq!(
        outer,
        Outer {
            inner: Inner { y: 9 },
            x: 3
        }
    );
}

#[test]
fn test_missing_required_leaf_is_construction_error() {
    let tree = SchemaTree::build(flat_record().into(), "flat").unwrap();
    let values = flat(&[("flat.a", json!(5))]);

    let err = tree.reconstruct(&values).unwrap_err();
    assert_eq!(
        err,
        ConstructionError::MissingParameter {
            record: "Flat".to_string(),
            parameter: "b".to_string(),
        }
    );
}

#[test]
fn test_absent_defaulted_leaf_takes_declared_default() {
    let tree = SchemaTree::build(flat_record().into(), "flat").unwrap();
    let values = flat(&[("flat.b", json!("x"))]);

    let instances = tree.reconstruct(&values).unwrap();
    assert_eq!(instances["flat"], json!({"a": 1, "b": "x"}));
}

#[test]
fn test_merged_round_trip_yields_instance_per_destination() {
    let mut tree = SchemaTree::build_record::<Outer>("a").unwrap();
    tree.merge(&SchemaTree::build_record::<Outer>("b").unwrap())
        .unwrap();
    let values = flat(&[
        ("a.inner.y", json!(1)),
        ("b.inner.y", json!(2)),
        ("a.x", json!(10)),
        ("b.x", json!(20)),
    ]);

    let instances = tree.reconstruct(&values).unwrap();
    let keys: Vec<&str> = instances.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["a", "b"]);
    let b: Outer = serde_json::from_value(instances["b"].clone()).unwrap();
    assert_eq!(b.inner.y, 2);
    assert_eq!(b.x, 20);
}
