//! Filter Dispatch Tests
//!
//! End-to-end behavior of filter documents against the in-memory executor:
//! - Lookups dispatch by field type, first registered operator wins
//! - Structural rules (unknown/unindexed fields, nesting caps)
//! - Nested `_is` subqueries against other classes

use std::sync::Arc;

use serde_json::{json, Value};
use tenantdb::catalog::{Class, ClassCatalog, FieldSchema, Instance};
use tenantdb::config::QueryConfig;
use tenantdb::executor::{Flow, MemoryExecutor, Row, RowExecutor};
use tenantdb::fields::{FieldType, FieldValue, GeoPoint};
use tenantdb::filter::{
    register_builtin, FilterError, FilterOperator, OperatorRegistry, QueryValidator, RegistryBuilder,
    Shape, TypeScope, ValueKind,
};
use tenantdb::query::{CmpOp, Predicate, SelectQuery};

// =============================================================================
// Helper Functions
// =============================================================================

struct Store {
    instance: Instance,
    executor: MemoryExecutor,
    shops: Arc<Class>,
}

fn setup_store() -> Store {
    let mut instance = Instance::new("acme");
    let profiles = instance.add_class(Class::user_profile(
        10,
        vec![FieldSchema::new("nick", FieldType::String).filtered()],
    ));
    let shops = instance.add_class(Class::new(
        11,
        "shop",
        vec![
            FieldSchema::new("name", FieldType::String).filtered().ordered(),
            FieldSchema::new("rating", FieldType::Float).filtered(),
            FieldSchema::new("open", FieldType::Boolean).filtered(),
            FieldSchema::new("location", FieldType::Geopoint).filtered(),
            FieldSchema::new("owner", FieldType::Reference)
                .filtered()
                .with_target("user_profile"),
            FieldSchema::new("notes", FieldType::Text),
        ],
    ));

    let mut executor = MemoryExecutor::new();
    for (id, owner, nick) in [(1, 100, "ann"), (2, 200, "bob")] {
        executor.insert(
            &profiles,
            Row::new(id)
                .with("owner_id", FieldValue::Int(owner))
                .with("nick", FieldValue::Text(nick.into())),
        );
    }

    let berlin = GeoPoint::new(13.405, 52.52);
    let munich = GeoPoint::new(11.582, 48.1351);
    let rows = [
        (1, "Bakery", 4.5, true, berlin, 100),
        (2, "Books", 3.0, false, munich, 200),
        (3, "Bikes", 4.9, true, munich, 100),
    ];
    for (id, name, rating, open, point, owner) in rows {
        executor.insert(
            &shops,
            Row::new(id)
                .with("name", FieldValue::Text(name.into()))
                .with("rating", FieldValue::Float(rating))
                .with("open", FieldValue::Bool(open))
                .with("location", FieldValue::Point(point))
                .with("owner", FieldValue::Int(owner)),
        );
    }
    executor.insert(&shops, Row::new(4).with("name", FieldValue::Text("Empty".into())));

    Store {
        instance,
        executor,
        shops,
    }
}

fn matching_ids(store: &Store, registry: &OperatorRegistry, document: Value) -> Result<Vec<i64>, FilterError> {
    let config = QueryConfig::default();
    let validator = QueryValidator::new(registry, &config);
    let query = validator.parse(&store.instance, &document, SelectQuery::new(Arc::clone(&store.shops)))?;

    let mut ids = Vec::new();
    store
        .executor
        .stream(&query, &mut |row| {
            ids.push(row.id);
            Flow::Continue
        })
        .unwrap();
    Ok(ids)
}

// =============================================================================
// Dispatch Tests
// =============================================================================

/// Comparisons and text lookups select the expected rows.
#[test]
fn test_builtin_lookups_filter_rows() {
    let store = setup_store();
    let registry = OperatorRegistry::builtin();

    assert_eq!(matching_ids(&store, &registry, json!({"rating": {"_gte": 4.5}})).unwrap(), vec![1, 3]);
    assert_eq!(matching_ids(&store, &registry, json!({"name": {"_istartswith": "b"}})).unwrap(), vec![1, 2, 3]);
    assert_eq!(
        matching_ids(&store, &registry, json!({"name": {"_in": ["Books", "Empty"]}})).unwrap(),
        vec![2, 4]
    );
    assert_eq!(matching_ids(&store, &registry, json!({"rating": {"_exists": false}})).unwrap(), vec![4]);
    assert_eq!(
        matching_ids(&store, &registry, json!({"open": {"_eq": true}, "rating": {"_lt": 4.6}})).unwrap(),
        vec![1]
    );
}

/// A comparison against a null column never matches.
#[test]
fn test_null_rows_never_compare() {
    let store = setup_store();
    let registry = OperatorRegistry::builtin();
    assert_eq!(matching_ids(&store, &registry, json!({"rating": {"_neq": 3.0}})).unwrap(), vec![1, 3]);
}

/// Distance filter uses the great-circle distance around the given point.
#[test]
fn test_near_filter() {
    let store = setup_store();
    let registry = OperatorRegistry::builtin();
    let near_munich = json!({"location": {"_near": {
        "longitude": 11.58, "latitude": 48.14, "distance_in_kilometers": 10
    }}});
    assert_eq!(matching_ids(&store, &registry, near_munich).unwrap(), vec![2, 3]);
}

/// Two operators under one suffix with disjoint scopes route by type only.
#[test]
fn test_custom_operator_dispatch_by_type() {
    let store = setup_store();
    let registry = register_builtin(RegistryBuilder::new())
        .register(FilterOperator::new(
            "_good",
            TypeScope::Only(&[FieldType::Float]),
            Shape::Scalar(ValueKind::Bool),
            |field, _| Ok(Predicate::compare(field, CmpOp::Gte, FieldValue::Float(4.0))),
        ))
        .register(FilterOperator::new(
            "_good",
            TypeScope::Only(&[FieldType::Boolean]),
            Shape::Scalar(ValueKind::Bool),
            |field, _| Ok(Predicate::compare(field, CmpOp::Eq, FieldValue::Bool(true))),
        ))
        .build();

    assert_eq!(matching_ids(&store, &registry, json!({"rating": {"_good": true}})).unwrap(), vec![1, 3]);
    assert_eq!(matching_ids(&store, &registry, json!({"open": {"_good": true}})).unwrap(), vec![1, 3]);
    assert_eq!(
        matching_ids(&store, &registry, json!({"name": {"_good": true}})).unwrap_err(),
        FilterError::UnsupportedLookup {
            field: "name".into(),
            lookup: "_good".into(),
            field_type: FieldType::String,
        }
    );
}

// =============================================================================
// Structural Tests
// =============================================================================

/// Unindexed fields are reported as such, not as unknown.
#[test]
fn test_unindexed_and_unknown_fields() {
    let store = setup_store();
    let registry = OperatorRegistry::builtin();
    assert_eq!(
        matching_ids(&store, &registry, json!({"notes": {"_eq": "x"}})).unwrap_err(),
        FilterError::FieldNotFilterable("notes".into())
    );
    assert_eq!(
        matching_ids(&store, &registry, json!({"color": {"_eq": "x"}})).unwrap_err(),
        FilterError::UnknownField("color".into())
    );
}

/// Built-in columns are filterable on every class.
#[test]
fn test_builtin_columns() {
    let store = setup_store();
    let registry = OperatorRegistry::builtin();
    assert_eq!(matching_ids(&store, &registry, json!({"id": {"_gt": 2}})).unwrap(), vec![3, 4]);
}

// =============================================================================
// Nested Query Tests
// =============================================================================

/// `_is` on a reference selects rows whose target matches the subquery.
#[test]
fn test_nested_reference_query() {
    let store = setup_store();
    let registry = OperatorRegistry::builtin();
    let document = json!({"owner": {"_is": {"nick": {"_eq": "ann"}}}});
    assert_eq!(matching_ids(&store, &registry, document).unwrap(), vec![1, 3]);
}

/// An `_is` inside an `_is` is always rejected.
#[test]
fn test_double_nesting_rejected() {
    let store = setup_store();
    let registry = OperatorRegistry::builtin();
    let document = json!({"owner": {"_is": {"owner_id": {"_is": {"nick": {"_eq": "ann"}}}}}});
    assert!(matching_ids(&store, &registry, document).is_err());
}

/// The validator resolves classes only through the instance it is given.
#[test]
fn test_target_resolution_is_per_instance() {
    let store = setup_store();
    let other = Instance::new("other");
    assert!(other.class("user_profile").is_none());

    let registry = OperatorRegistry::builtin();
    let config = QueryConfig::default();
    let validator = QueryValidator::new(&registry, &config);
    let err = validator
        .parse(
            &other,
            &json!({"owner": {"_is": {"nick": {"_eq": "ann"}}}}),
            SelectQuery::new(Arc::clone(&store.shops)),
        )
        .unwrap_err();
    assert!(matches!(err, FilterError::UnknownClass { .. }));
}
