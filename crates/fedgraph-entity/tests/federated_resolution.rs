//! End-to-end reference resolution over the speakers/sessions/schedule
//! subgraphs: SDL fragments composed into a context, collections loaded from
//! data files, references routed to their owning subgraph.

use fedgraph_entity::{
    Entity, EntityCollection, FederationContext, ReferenceObject, Resolution, ResolverRegistry,
    RequestContext, Subgraph, TYPENAME_FIELD, composed_keys, load_entities, project_key,
};
use fedgraph_kernel::{SchemaFragment, TypeName};
use fedgraph_sdl::parse_fragment;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn sdl_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../fedgraph-sdl/tests/fixtures")
        .join(format!("{name}.graphql"));
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

fn data_fixture(file: &str) -> Vec<Entity> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(file);
    load_entities(&path).unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display()))
}

struct SubgraphInput {
    name: &'static str,
    sdl: String,
    data: Vec<Entity>,
    resolvers: &'static [&'static str],
}

fn inputs() -> Vec<SubgraphInput> {
    vec![
        SubgraphInput {
            name: "speakers",
            sdl: sdl_fixture("speakers"),
            data: data_fixture("speakers.json"),
            resolvers: &["Speaker"],
        },
        SubgraphInput {
            name: "sessions",
            sdl: sdl_fixture("sessions"),
            data: data_fixture("sessions.jsonl"),
            resolvers: &["Talk"],
        },
        SubgraphInput {
            name: "schedule",
            sdl: sdl_fixture("schedule"),
            data: data_fixture("schedule.json"),
            resolvers: &[],
        },
    ]
}

fn subgraphs(inputs: Vec<SubgraphInput>) -> Vec<Subgraph> {
    let fragments: Vec<SchemaFragment> = inputs
        .iter()
        .map(|input| {
            let mut fragment = parse_fragment(input.name, &input.sdl).expect("fixture SDL parses");
            fragment
                .resolvers
                .extend(input.resolvers.iter().map(|t| TypeName::new(*t)));
            fragment
        })
        .collect();
    let keys = composed_keys(&fragments).expect("fixtures compose");

    inputs
        .into_iter()
        .zip(fragments)
        .map(|(input, fragment)| {
            let collection =
                Arc::new(EntityCollection::load(input.data, &keys).expect("fixture data loads"));
            let types: Vec<TypeName> = input.resolvers.iter().map(|t| TypeName::new(*t)).collect();
            let mut registry = ResolverRegistry::new(input.name);
            let unkeyed = registry.register_collection(&types, &keys, collection);
            assert!(unkeyed.is_empty(), "unkeyed resolver types: {unkeyed:?}");
            Subgraph::new(fragment, registry)
        })
        .collect()
}

fn context() -> FederationContext {
    FederationContext::compose(subgraphs(inputs())).expect("fixtures compose")
}

fn request() -> RequestContext {
    RequestContext::new().with_timeout(Duration::from_secs(5))
}

fn code(result: &Result<Resolution, fedgraph_entity::ResolveError>) -> &'static str {
    match result {
        Ok(Resolution::Found(_)) => "found",
        Ok(Resolution::NotFound) => "not_found",
        Err(e) => e.code(),
    }
}

#[tokio::test]
async fn speaker_reference_resolves_to_full_record() {
    let ctx = context();
    let results = ctx
        .resolve(
            vec![json!({"__typename": "Speaker", "link": {"href": "https://speakers.example/ada"}})],
            &request(),
        )
        .await;

    let entity = results[0].as_ref().expect("resolves").entity().expect("found");
    assert_eq!(entity.typename.as_str(), "Speaker");
    assert_eq!(entity.get("firstName"), Some(&json!("Ada")));
    assert_eq!(entity.get("lastName"), Some(&json!("Lovelace")));
}

#[tokio::test]
async fn empty_collection_reports_not_found() {
    let mut inputs = inputs();
    inputs[0].data.clear();
    let ctx = FederationContext::compose(subgraphs(inputs)).expect("compose");

    let results = ctx
        .resolve(
            vec![json!({"__typename": "Speaker", "link": {"href": "x"}})],
            &request(),
        )
        .await;
    assert_eq!(results, vec![Ok(Resolution::NotFound)]);
}

#[tokio::test]
async fn references_route_to_their_owner_and_fail_in_isolation() {
    let ctx = context();
    let results = ctx
        .resolve(
            vec![
                json!({"__typename": "Talk", "id": "t2"}),
                json!({"__typename": "Speaker", "link": {"href": "https://speakers.example/grace"}, "firstName": "Grace"}),
                json!({"__typename": "Speaker", "link": "https://speakers.example/grace"}),
                json!({"__typename": "Slot", "roomId": "r1"}),
                json!({"__typename": "Query"}),
                json!({"__typename": "Talk", "id": "missing"}),
                json!({"__typename": "Speaker", "link": {"href": "https://speakers.example/edsger"}}),
            ],
            &request(),
        )
        .await;

    let codes: Vec<&str> = results.iter().map(code).collect();
    assert_eq!(
        codes,
        vec![
            "found",
            "invalid_reference",
            "invalid_reference",
            "not_an_entity",
            "not_an_entity",
            "not_found",
            "found",
        ]
    );
    let talk = results[0].as_ref().unwrap().entity().unwrap();
    assert_eq!(talk.get("title"), Some(&json!("Compilers for Everyone")));
}

#[tokio::test]
async fn every_record_resolves_from_its_own_key() {
    let ctx = context();
    let inputs = inputs();
    let keys = fedgraph_entity::entity_keys(ctx.schema());

    let mut representations = Vec::new();
    let mut expected = Vec::new();
    for input in &inputs {
        for record in &input.data {
            let Some(key) = keys.get(&record.typename) else {
                continue;
            };
            let Value::Object(fields) = project_key(&record.fields, key).unwrap() else {
                panic!("projected key is not an object");
            };
            let reference = ReferenceObject::new(record.typename.as_str(), fields);
            representations.push(reference.to_representation());
            expected.push(record.clone());
        }
    }
    assert_eq!(representations.len(), 6);
    assert!(
        representations
            .iter()
            .all(|r| r.get(TYPENAME_FIELD).is_some())
    );

    let results = ctx.resolve(representations, &request()).await;
    let resolved: Vec<Entity> = results
        .into_iter()
        .map(|r| r.unwrap().into_entity().unwrap())
        .collect();
    assert_eq!(resolved, expected);
}

#[test]
fn reload_reports_whether_the_schema_changed() {
    let ctx = context();

    let same = ctx.reload(subgraphs(inputs())).expect("reload");
    assert!(!same.changed);
    assert_eq!(same.context.fingerprint(), ctx.fingerprint());

    let mut inputs = inputs();
    inputs[1].sdl = inputs[1]
        .sdl
        .replace("title: String", "title: String\n  abstract: String");
    let changed = ctx.reload(subgraphs(inputs)).expect("reload");
    assert!(changed.changed);
    assert!(
        changed
            .context
            .schema()
            .get(&TypeName::new("Talk"))
            .and_then(|t| t.field("abstract"))
            .is_some()
    );
}

#[tokio::test]
async fn failed_reload_leaves_the_current_context_usable() {
    let ctx = context();

    let mut inputs = inputs();
    inputs.push(SubgraphInput {
        name: "rooms",
        sdl: sdl_fixture("rooms"),
        data: Vec::new(),
        resolvers: &[],
    });
    let next: Vec<Subgraph> = inputs
        .iter()
        .map(|input| {
            let fragment = parse_fragment(input.name, &input.sdl).unwrap();
            Subgraph::new(fragment, ResolverRegistry::new(input.name))
        })
        .collect();
    let err = ctx
        .reload(next)
        .err()
        .expect("rooms and schedule both own Slot");
    assert!(err.has("duplicate_owner"));

    let results = ctx
        .resolve(vec![json!({"__typename": "Talk", "id": "t1"})], &request())
        .await;
    assert_eq!(code(&results[0]), "found");
}
