//! End-to-end persistence through the in-memory store client.

use bson::{Bson, doc};

use docmodel::{memory::MemoryStore, prelude::*};

fn gardener_types(registry: &SchemaRegistry) -> std::sync::Arc<ModelSchema> {
    SchemaBuilder::new("Gardener")
        .field("name", FieldSpec::string().required())
        .field("instructor", FieldSpec::reference("self"))
        .register(registry)
        .unwrap()
}

#[tokio::test]
async fn save_find_get_round_trip() {
    let registry = SchemaRegistry::new();
    let gardener = gardener_types(&registry);
    let store = DocumentStore::new(MemoryStore::new());
    let gardeners = store.collection(&gardener);

    let mut jones = Document::new(gardener.clone());
    jones.set("name", "Mr. Jones").unwrap();
    let jones_id = gardeners.save(&mut jones).await.unwrap();

    let mut jim = Document::new(gardener.clone());
    jim.set("name", "Jim").unwrap();
    jim.set("instructor", jones).unwrap();
    gardeners.save(&mut jim).await.unwrap();

    let everyone = gardeners.find(doc! {}).await.unwrap();
    assert_eq!(everyone.len(), 2);

    let found = gardeners.get(doc! { "name": "Jim" }).await.unwrap();
    assert_eq!(found.get("name"), Some(Value::from("Jim")));

    // The stored relationship comes back as a lazy pointer naming jones.
    let pointer = match found.get("instructor") {
        Some(Value::Pointer(pointer)) => pointer,
        other => panic!("expected a pointer handle, got {other:?}"),
    };
    assert_eq!(pointer.type_name, "Gardener");
    assert_eq!(pointer.id, jones_id);

    // Eager dereferencing brings the instructor back.
    let instructor = gardeners.dereference(&pointer).await.unwrap();
    assert_eq!(instructor.get("name"), Some(Value::from("Mr. Jones")));
}

#[tokio::test]
async fn get_reports_zero_and_many_matches() {
    let registry = SchemaRegistry::new();
    let gardener = gardener_types(&registry);
    let store = DocumentStore::new(MemoryStore::new());
    let gardeners = store.collection(&gardener);

    match gardeners.get(doc! { "name": "Nobody" }).await {
        Err(StoreError::NotFound(collection)) => assert_eq!(collection, "Gardener"),
        other => panic!("expected not-found, got {other:?}"),
    }

    for _ in 0..2 {
        let mut twin = Document::new(gardener.clone());
        twin.set("name", "Jim").unwrap();
        gardeners.save(&mut twin).await.unwrap();
    }
    match gardeners.get(doc! { "name": "Jim" }).await {
        Err(StoreError::Ambiguous { matches, .. }) => assert_eq!(matches, 2),
        other => panic!("expected an ambiguous match, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_documents_never_reach_the_store() {
    let registry = SchemaRegistry::new();
    let gardener = gardener_types(&registry);
    let store = DocumentStore::new(MemoryStore::new());
    let gardeners = store.collection(&gardener);

    let mut nameless = Document::new(gardener);
    match gardeners.save(&mut nameless).await {
        Err(StoreError::Codec(CodecError::Validation(errors))) => {
            assert!(errors.field("name").is_some());
        }
        other => panic!("expected a validation failure, got {other:?}"),
    }
    assert!(store.client().is_empty("Gardener").await);
}

#[tokio::test]
async fn find_rewrites_the_primary_key_field_name() {
    let registry = SchemaRegistry::new();
    let tag = SchemaBuilder::new("Tag")
        .field("slug", FieldSpec::string().primary_key())
        .field("label", FieldSpec::string())
        .register(&registry)
        .unwrap();
    let store = DocumentStore::new(MemoryStore::new());
    let tags = store.collection(&tag);

    let mut perennial = Document::new(tag.clone());
    perennial.set("slug", "perennial").unwrap();
    perennial.set("label", "Comes back every year").unwrap();
    let id = tags.save(&mut perennial).await.unwrap();
    assert_eq!(id, Bson::String("perennial".to_string()));

    // Filtering by the declared field name hits the `_id` storage key.
    let found = tags.get(doc! { "slug": "perennial" }).await.unwrap();
    assert_eq!(found.get("label"), Some(Value::from("Comes back every year")));
}

#[tokio::test]
async fn delete_requires_and_uses_the_primary_key() {
    let registry = SchemaRegistry::new();
    let gardener = gardener_types(&registry);
    let store = DocumentStore::new(MemoryStore::new());
    let gardeners = store.collection(&gardener);

    let mut jones = Document::new(gardener.clone());
    jones.set("name", "Mr. Jones").unwrap();
    gardeners.save(&mut jones).await.unwrap();
    assert_eq!(store.client().len("Gardener").await, 1);

    gardeners.delete(&mut jones).await.unwrap();
    assert!(store.client().is_empty("Gardener").await);
}
