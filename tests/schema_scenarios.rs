//! End-to-end scenarios: multi-level inheritance, optional-attribute
//! existence rules, and invariant checking over complete schemas.

use entity_model_core::{
    check_all, EntitySpec, ModelError, RuleStatus, Schema, SchemaBuilder, Value,
};
use pretty_assertions::assert_eq;

fn shapes_schema() -> Schema {
    SchemaBuilder::new("shapes")
        .defined_type("label", "string")
        .unwrap()
        .defined_type("length_measure", "real")
        .unwrap()
        .entity(
            EntitySpec::new("shape")
                .attribute("item_name", "label")
                .attribute("number_of_sides", "integer"),
        )
        .entity(
            EntitySpec::new("subshape")
                .supertype("shape")
                .attribute("cost", "real"),
        )
        .entity(
            EntitySpec::new("rectangle")
                .supertype("subshape")
                .attribute("width", "length_measure")
                .attribute("height", "length_measure"),
        )
        .finish()
        .unwrap()
}

#[test]
fn three_level_inheritance_constructs_positionally() {
    let schema = shapes_schema();
    let rect = schema
        .construct(
            "rectangle",
            vec![
                Value::from("my_rectangle"),
                Value::Integer(4),
                Value::Real(12.5),
                Value::Real(3.0),
                Value::Real(2.0),
            ],
        )
        .unwrap();

    // Inherited attributes are reachable by name and carry their subtype
    // identity through the chain.
    assert_eq!(rect.get("item_name").unwrap().type_tag(), Some("label"));
    assert_eq!(rect.get("item_name").unwrap().base(), &Value::from("my_rectangle"));
    assert_eq!(rect.get("number_of_sides").unwrap(), &Value::Integer(4));
    assert_eq!(rect.get("cost").unwrap(), &Value::Real(12.5));
    assert_eq!(rect.get("width").unwrap().type_tag(), Some("length_measure"));
    assert_eq!(rect.get("height").unwrap().base(), &Value::Real(2.0));
}

#[test]
fn missing_mandatory_inherited_value_fails_whole_construction() {
    let schema = shapes_schema();
    let err = schema
        .construct(
            "rectangle",
            vec![
                Value::from("my_rectangle"),
                Value::Integer(4),
                Value::Real(12.5),
                Value::Unset,
                Value::Real(2.0),
            ],
        )
        .unwrap_err();
    assert_eq!(err, ModelError::MissingMandatoryAttribute("width".into()));
}

#[test]
fn intermediate_level_may_declare_nothing() {
    // The middle level only relays its supertype's attributes.
    let schema = SchemaBuilder::new("shapes")
        .defined_type("label", "string")
        .unwrap()
        .defined_type("length_measure", "real")
        .unwrap()
        .entity(
            EntitySpec::new("shape")
                .attribute("item_name", "label")
                .attribute("number_of_sides", "integer"),
        )
        .entity(EntitySpec::new("subshape").supertype("shape"))
        .entity(
            EntitySpec::new("rectangle")
                .supertype("subshape")
                .attribute("height", "length_measure")
                .attribute("width", "length_measure"),
        )
        .finish()
        .unwrap();

    let rect = schema
        .construct(
            "rectangle",
            vec![
                Value::from("my_rectangle"),
                Value::Integer(4),
                Value::Real(1.0),
                Value::Real(2.0),
            ],
        )
        .unwrap();
    assert_eq!(rect.get("height").unwrap().base(), &Value::Real(1.0));

    let err = schema
        .construct(
            "rectangle",
            vec![
                Value::from("my_rectangle"),
                Value::Integer(4),
                Value::Real(1.0),
                Value::Unset,
            ],
        )
        .unwrap_err();
    assert_eq!(err, ModelError::MissingMandatoryAttribute("width".into()));
}

#[test]
fn arity_counts_the_flattened_chain() {
    let schema = shapes_schema();
    let err = schema
        .construct("rectangle", vec![Value::from("r"), Value::Integer(4)])
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::ArityMismatch {
            entity: "rectangle".into(),
            expected: 5,
            got: 2,
        }
    );
}

#[test]
fn unit_vector_rule_passes_and_fails() {
    let schema = SchemaBuilder::new("geometry")
        .entity(
            EntitySpec::new("unit_vector")
                .attribute("a", "real")
                .attribute("b", "real")
                .attribute("c", "real")
                .rule("length_1", "a ** 2 + b ** 2 + c ** 2 = 1"),
        )
        .finish()
        .unwrap();

    let ok = schema
        .construct("unit_vector", vec![1.0.into(), 0.0.into(), 0.0.into()])
        .unwrap();
    assert!(check_all(&ok).all_passed());

    // Construction succeeds regardless; the violation is reported data.
    let bad = schema
        .construct("unit_vector", vec![1.0.into(), 1.0.into(), 0.0.into()])
        .unwrap();
    let report = check_all(&bad);
    assert!(!report.all_passed());
    let violated: Vec<_> = report.violations().collect();
    assert_eq!(violated.len(), 1);
    assert_eq!(violated[0].rule, "length_1");
    assert_eq!(violated[0].entity, "unit_vector");
}

fn address_schema() -> Schema {
    SchemaBuilder::new("postal")
        .defined_type("label", "string")
        .unwrap()
        .entity(
            EntitySpec::new("address")
                .optional("internal_location", "label")
                .optional("street_number", "label")
                .optional("street", "label")
                .optional("postal_box", "label")
                .optional("town", "label")
                .optional("region", "label")
                .optional("postal_code", "label")
                .optional("country", "label")
                .optional("facsimile_number", "label")
                .optional("telephone_number", "label")
                .optional("electronic_mail_address", "label")
                .optional("telex_number", "label")
                .rule(
                    "wr1",
                    "EXISTS(internal_location) OR EXISTS(street_number) OR \
                     EXISTS(street) OR EXISTS(postal_box) OR EXISTS(town) OR \
                     EXISTS(region) OR EXISTS(postal_code) OR EXISTS(country) OR \
                     EXISTS(facsimile_number) OR EXISTS(telephone_number) OR \
                     EXISTS(electronic_mail_address) OR EXISTS(telex_number)",
                ),
        )
        .finish()
        .unwrap()
}

#[test]
fn address_rule_requires_at_least_one_field() {
    let schema = address_schema();

    let empty = schema
        .construct("address", vec![Value::Unset; 12])
        .unwrap();
    let report = check_all(&empty);
    assert!(!report.all_passed());
    assert_eq!(report.violations().count(), 1);

    let mut values = vec![Value::Unset; 12];
    values[4] = Value::from("paris");
    let with_town = schema.construct("address", values).unwrap();
    assert!(check_all(&with_town).all_passed());
}

#[test]
fn exists_stays_current_after_set_and_unset() {
    let schema = address_schema();
    let mut addr = schema
        .construct("address", vec![Value::Unset; 12])
        .unwrap();
    assert!(!check_all(&addr).all_passed());

    addr.set("country", &Value::from("france")).unwrap();
    assert!(check_all(&addr).all_passed());

    addr.unset("country").unwrap();
    assert!(!check_all(&addr).all_passed());
}

#[test]
fn inherited_rules_apply_to_subtype_instances() {
    let schema = SchemaBuilder::new("measures")
        .entity(
            EntitySpec::new("positive_measure")
                .attribute("magnitude", "real")
                .rule("wr1", "magnitude > 0"),
        )
        .entity(
            EntitySpec::new("bounded_measure")
                .supertype("positive_measure")
                .attribute("bound", "real")
                .rule("wr1", "magnitude <= bound"),
        )
        .finish()
        .unwrap();

    // Both levels' rules run; both reported, supertype first.
    let bad = schema
        .construct("bounded_measure", vec![(-1.0).into(), 5.0.into()])
        .unwrap();
    let report = check_all(&bad);
    let names: Vec<(String, RuleStatus)> = report
        .results
        .iter()
        .map(|r| (r.declared_by.clone(), r.status.clone()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("positive_measure".to_string(), RuleStatus::Violated),
            ("bounded_measure".to_string(), RuleStatus::Passed),
        ]
    );

    let good = schema
        .construct("bounded_measure", vec![2.0.into(), 5.0.into()])
        .unwrap();
    assert!(check_all(&good).all_passed());
}

#[test]
fn every_rule_is_checked_even_after_a_violation() {
    let schema = SchemaBuilder::new("s")
        .entity(
            EntitySpec::new("triple")
                .attribute("a", "real")
                .rule("first", "a > 100")
                .rule("second", "a > 200")
                .rule("third", "a > 0"),
        )
        .finish()
        .unwrap();

    let inst = schema.construct("triple", vec![1.0.into()]).unwrap();
    let report = check_all(&inst);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.violations().count(), 2);
    assert_eq!(report.results[2].status, RuleStatus::Passed);
}

#[test]
fn defined_types_coerce_at_every_level() {
    let schema = shapes_schema();
    // Plain reals and a pre-tagged width both bind; the tag is never doubled.
    let rect = schema
        .construct(
            "rectangle",
            vec![
                Value::from("r"),
                Value::from("4"),
                Value::Integer(10),
                Value::Tagged {
                    type_name: "length_measure".into(),
                    value: Box::new(Value::Real(3.0)),
                },
                Value::Real(2.0),
            ],
        )
        .unwrap();
    assert_eq!(rect.get("number_of_sides").unwrap(), &Value::Integer(4));
    assert_eq!(rect.get("cost").unwrap(), &Value::Real(10.0));
    let width = rect.get("width").unwrap();
    assert_eq!(width.type_tag(), Some("length_measure"));
    assert_eq!(width.base(), &Value::Real(3.0));
}

#[test]
fn schema_from_json_document() {
    let doc = r#"
    [
        {
            "name": "vector",
            "attributes": [
                {"name": "x", "type_name": "real"},
                {"name": "y", "type_name": "real"}
            ],
            "rules": [
                {"name": "nonzero", "expression": "x <> 0 OR y <> 0"}
            ]
        },
        {
            "name": "labelled_vector",
            "supertypes": ["vector"],
            "attributes": [
                {"name": "tag", "type_name": "string", "optional": true}
            ]
        }
    ]
    "#;
    let specs: Vec<EntitySpec> = serde_json::from_str(doc).unwrap();
    let schema = specs
        .into_iter()
        .fold(SchemaBuilder::new("from_json"), SchemaBuilder::entity)
        .finish()
        .unwrap();

    let lv = schema
        .construct(
            "labelled_vector",
            vec![0.0.into(), 0.0.into(), Value::Unset],
        )
        .unwrap();
    let report = check_all(&lv);
    assert_eq!(report.violations().count(), 1);
    assert_eq!(report.violations().next().unwrap().declared_by, "vector");
}
