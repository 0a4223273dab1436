//! End-to-end tests over the schema graph: forward and self references,
//! backref bookkeeping, inheritance, and pointer-record serialization.

use bson::Bson;

use docmodel_core::{
    backref::BackrefError,
    document::Document,
    error::FieldError,
    field::FieldSpec,
    reference::PointerRecord,
    schema::{SchemaBuilder, SchemaRegistry},
    value::Value,
};

#[test]
fn gardener_end_to_end() {
    let registry = SchemaRegistry::new();
    let gardener = SchemaBuilder::new("Gardener")
        .field("name", FieldSpec::string().required())
        .field("instructor", FieldSpec::reference("self"))
        .register(&registry)
        .unwrap();

    let mut jones = Document::new(gardener.clone());
    jones.set("name", "Mr. Jones").unwrap();
    // Fix the identity before handing jones out; the copy stored in jim
    // carries it along.
    let jones_id = match jones.pk().unwrap() {
        Value::Uuid(id) => id,
        other => panic!("expected a uuid identity, got {other:?}"),
    };

    let mut jim = Document::new(gardener.clone());
    jim.set("name", "Jim").unwrap();
    jim.set("instructor", jones).unwrap();

    jim.validate().unwrap();
    let storage = jim.to_storage().unwrap();

    // The instructor entry is a pointer record naming jones's identity,
    // not an inlined copy.
    let instructor = storage.get("instructor").unwrap().as_document().unwrap();
    assert_eq!(
        instructor.get("$ref"),
        Some(&Bson::String("Gardener".to_string()))
    );
    assert_eq!(instructor.get("$id"), Some(&Bson::from(jones_id)));
    assert!(instructor.get("name").is_none());

    // Serializing twice points at the same identity.
    let again = jim.to_storage().unwrap();
    assert_eq!(again.get("instructor").unwrap().as_document(), Some(instructor));
}

#[test]
fn forward_reference_resolves_on_access() {
    let registry = SchemaRegistry::new();
    let garden = SchemaBuilder::new("Garden")
        .field("acres", FieldSpec::float())
        .field("gardener", FieldSpec::reference("Gardener"))
        .register(&registry)
        .unwrap();

    let reference = garden.field("gardener").unwrap().type_ref().unwrap();
    assert!(!reference.is_resolved());

    // A pointer placeholder is accepted and validates while the target
    // type is still undeclared.
    let mut plot = Document::new(garden.clone());
    plot.set("acres", 0.25).unwrap();
    plot.set(
        "gardener",
        Value::Pointer(PointerRecord::new(
            "Gardener",
            Bson::from(bson::Uuid::new()),
            "",
        )),
    )
    .unwrap();
    plot.validate().unwrap();
    assert!(!reference.is_resolved());
    assert!(registry.backrefs("Gardener").is_empty());

    // Declaring the target makes the next validate resolve it and record
    // the backref entry.
    SchemaBuilder::new("Gardener")
        .field("name", FieldSpec::string().required())
        .register(&registry)
        .unwrap();

    plot.validate().unwrap();
    assert!(reference.is_resolved());
    assert_eq!(
        registry.backrefs("Gardener"),
        vec![("Garden".to_string(), "gardener".to_string())]
    );
}

#[test]
fn unresolved_reference_fails_only_when_exercised() {
    // The target lives in a different registry, so it never resolves here.
    let elsewhere = SchemaRegistry::new();
    let gardener = SchemaBuilder::new("Gardener")
        .field("name", FieldSpec::string())
        .register(&elsewhere)
        .unwrap();

    let registry = SchemaRegistry::new();
    let garden = SchemaBuilder::new("Garden")
        .field("gardener", FieldSpec::reference("Gardener"))
        .register(&registry)
        .unwrap();

    // An empty reference field is fine.
    let mut empty = Document::new(garden.clone());
    empty.validate().unwrap();

    // Setting an instance is accepted provisionally, but validating the
    // exercised field reports the unresolved binding.
    let mut plot = Document::new(garden);
    let mut jones = Document::new(gardener);
    jones.set("name", "Mr. Jones").unwrap();
    jones.pk().unwrap();
    plot.set("gardener", jones).unwrap();

    let errors = plot.validate().unwrap_err();
    assert_eq!(
        errors.field("gardener"),
        Some(
            &[FieldError::Unresolved {
                symbol: "Gardener".to_string()
            }][..]
        )
    );
}

#[test]
fn clearing_a_resolved_reference_removes_exactly_one_backref() {
    let registry = SchemaRegistry::new();
    let gardener = SchemaBuilder::new("Gardener")
        .field("name", FieldSpec::string())
        .register(&registry)
        .unwrap();
    let garden = SchemaBuilder::new("Garden")
        .field("gardener", FieldSpec::reference("Gardener"))
        .register(&registry)
        .unwrap();

    let mut jones = Document::new(gardener);
    jones.set("name", "Mr. Jones").unwrap();
    jones.pk().unwrap();

    let mut plot = Document::new(garden);
    plot.set("gardener", jones).unwrap();
    assert_eq!(registry.backrefs("Gardener").len(), 1);

    let removed = plot.clear("gardener").unwrap();
    assert!(matches!(removed, Some(Value::Document(_))));
    assert!(registry.backrefs("Gardener").is_empty());

    // Deleting twice is reported, not silently accepted.
    let err = plot.clear("gardener").unwrap_err();
    assert_eq!(
        err,
        BackrefError::MissingEntry {
            target: "Gardener".to_string(),
            owner: "Garden".to_string(),
            field: "gardener".to_string(),
        }
    );
}

#[test]
fn inherited_references_keep_their_targets() {
    let registry = SchemaRegistry::new();
    let gardener = SchemaBuilder::new("Gardener")
        .field("name", FieldSpec::string().required())
        .field("instructor", FieldSpec::reference("self"))
        .register(&registry)
        .unwrap();
    let stomper_schema = SchemaBuilder::new("BugStomper")
        .parent(&gardener)
        .field("stomper", FieldSpec::reference("Gardener"))
        .field("number_squashed", FieldSpec::integer())
        .register(&registry)
        .unwrap();

    // The inherited self-reference still points at Gardener, and carried
    // its backref entry over to the subclass at build time.
    let mut backrefs = registry.backrefs("Gardener");
    backrefs.sort();
    assert_eq!(
        backrefs,
        vec![
            ("BugStomper".to_string(), "instructor".to_string()),
            ("Gardener".to_string(), "instructor".to_string()),
        ]
    );

    let mut jones = Document::new(gardener.clone());
    jones.set("name", "Mr. Jones").unwrap();
    jones.pk().unwrap();

    let mut stomper = Document::new(stomper_schema.clone());
    stomper.set("name", "Jim").unwrap();
    stomper.set("number_squashed", 0).unwrap();
    // First exercised access resolves the subclass's own reference.
    stomper.set("stomper", jones.clone()).unwrap();
    stomper.validate().unwrap();
    assert!(
        registry.backrefs("Gardener")
            .contains(&("BugStomper".to_string(), "stomper".to_string()))
    );

    // A subclass instance is assignable where the parent is expected.
    let garden = SchemaBuilder::new("Garden")
        .field("gardener", FieldSpec::reference("Gardener"))
        .register(&registry)
        .unwrap();
    let mut plot = Document::new(garden);
    plot.set("gardener", stomper).unwrap();
    plot.validate().unwrap();

    // The reverse direction is a type mismatch.
    let mut impostor = Document::new(stomper_schema);
    impostor.set("name", "Weevil").unwrap();
    let err = impostor.set("stomper", Value::from(Document::new(
        SchemaBuilder::new("Scarecrow").register(&registry).unwrap(),
    )));
    assert_eq!(
        err,
        Err(FieldError::TypeMismatch {
            actual: "Scarecrow".to_string(),
            expected: "Gardener".to_string(),
        })
    );
}

#[test]
fn container_of_references_serializes_to_pointers() {
    let registry = SchemaRegistry::new();
    let flower = SchemaBuilder::new("Flower")
        .field("species", FieldSpec::string().default_value("Snarling Fly Eater"))
        .register(&registry)
        .unwrap();
    let garden = SchemaBuilder::new("Garden")
        .field("flowers", FieldSpec::list(FieldSpec::reference("Flower")))
        .register(&registry)
        .unwrap();

    let mut rose = Document::new(flower.clone());
    rose.set("species", "Rose").unwrap();
    let mut daisy = Document::new(flower.clone());
    daisy.set("species", "Daisy").unwrap();

    let mut plot = Document::new(garden.clone());
    plot.set(
        "flowers",
        Value::List(vec![Value::from(rose), Value::from(daisy)]),
    )
    .unwrap();
    plot.validate().unwrap();

    // Element references register under the container field's name.
    assert_eq!(
        registry.backrefs("Flower"),
        vec![("Garden".to_string(), "flowers".to_string())]
    );

    let storage = plot.to_storage().unwrap();
    let flowers = storage.get("flowers").unwrap().as_array().unwrap();
    assert_eq!(flowers.len(), 2);
    for entry in flowers {
        let pointer = PointerRecord::from_storage(entry.as_document().unwrap()).unwrap();
        assert_eq!(pointer.type_name, "Flower");
    }

    // Order survives the round trip.
    let restored = Document::from_storage(&garden, &storage).unwrap();
    match restored.get("flowers") {
        Some(Value::List(items)) => assert_eq!(items.len(), 2),
        other => panic!("expected a list of pointers, got {other:?}"),
    }
}

#[test]
fn embedded_references_inline_the_document() {
    let registry = SchemaRegistry::new();
    let petal = SchemaBuilder::new("Petal")
        .field("color", FieldSpec::string().required())
        .register(&registry)
        .unwrap();
    let flower = SchemaBuilder::new("Flower")
        .field("species", FieldSpec::string())
        .field("crown", FieldSpec::embedded("Petal"))
        .register(&registry)
        .unwrap();

    let mut crown = Document::new(petal);
    crown.set("color", "red").unwrap();

    let mut rose = Document::new(flower.clone());
    rose.set("species", "Rose").unwrap();
    rose.set("crown", crown).unwrap();

    let storage = rose.to_storage().unwrap();
    let inlined = storage.get("crown").unwrap().as_document().unwrap();
    assert_eq!(inlined.get("color"), Some(&Bson::String("red".to_string())));
    assert!(inlined.get("$ref").is_none());

    let restored = Document::from_storage(&flower, &storage).unwrap();
    match restored.get("crown") {
        Some(Value::Document(doc)) => {
            assert_eq!(doc.get("color"), Some(Value::from("red")));
        }
        other => panic!("expected an inlined document, got {other:?}"),
    }
}

#[test]
fn container_element_failure_is_attributed_to_the_container() {
    let registry = SchemaRegistry::new();
    let phoo = SchemaBuilder::new("Phoo")
        .field("hell", FieldSpec::list(FieldSpec::string()))
        .register(&registry)
        .unwrap();

    let mut doc = Document::new(phoo);
    let err = doc
        .set("hell", Value::List(vec![Value::Int(1)]))
        .unwrap_err();
    match err {
        FieldError::Elements(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].0, "0");
            assert!(matches!(errors[0].1, FieldError::TypeMismatch { .. }));
        }
        other => panic!("expected element errors, got {other:?}"),
    }
}
