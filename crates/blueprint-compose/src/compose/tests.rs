use blueprint_ast::ast::{AggregateKind, EndpointKind, GlobalAtom, HttpMethod, RepeaterKind};
use blueprint_ast::build::*;
use blueprint_ast::spec::{RefIdent, Specification};
use blueprint_ast::{AtomKind, Ref, Type};

use super::{ComposeOptions, ComposeSession, compose};
use crate::definition::{
    ActionDef, Definition, EndpointDef, FieldSetterDef, JoinCardinality, PathStepKind,
    QueryCardinality, QueryRootDef,
};
use crate::error::ComposeError;
use crate::path::build_join_path;

fn spec_of(globals: Vec<GlobalAtom>) -> Specification {
    let program = blueprint_resolve::resolve(program(globals)).expect("resolves");
    blueprint_resolve::lower(&program).expect("lowers")
}

fn compose_program(globals: Vec<GlobalAtom>) -> Definition {
    compose(&spec_of(globals), &ComposeOptions::default()).expect("composes")
}

fn org_repo_models() -> Vec<GlobalAtom> {
    vec![
        model(
            "Org",
            vec![
                field("name", "string").into(),
                field("slug", "string").unique().into(),
                relation("repos", "Repo", "org").into(),
                query("back_to_org", vec![from("repos.org", None)]).into(),
                query(
                    "repo_count",
                    vec![from("repos", None), aggregate(AggregateKind::Count)],
                )
                .into(),
            ],
        )
        .into(),
        model(
            "Repo",
            vec![
                field("name", "string").into(),
                field("description", "string").nullable().into(),
                field("stars", "integer").with_default(int(0)).into(),
                reference("org", "Org").into(),
            ],
        )
        .into(),
    ]
}

fn with_api(mut globals: Vec<GlobalAtom>, entrypoints: Vec<blueprint_ast::ast::Entrypoint>) -> Vec<GlobalAtom> {
    globals.push(api(None, entrypoints).into());
    globals
}

fn endpoints(definition: &Definition) -> Vec<&EndpointDef> {
    definition.apis[0].endpoints()
}

fn model_action(action: &ActionDef) -> &crate::definition::ModelActionDef {
    match action {
        ActionDef::CreateOne(action) | ActionDef::UpdateOne(action) => action,
        other => panic!("expected a create or update, got {other:?}"),
    }
}

#[test]
fn test_back_to_org_join_path() {
    let definition = compose_program(org_repo_models());
    let query = definition.query("Org.back_to_org").unwrap();

    assert_eq!(query.root, QueryRootDef::Owner { model_ref_key: "Org".into() });
    let steps: Vec<_> = query
        .path
        .iter()
        .map(|step| (step.kind, step.name.as_str(), step.cardinality, step.target_model_ref_key.as_str()))
        .collect();
    assert_eq!(
        steps,
        vec![
            (PathStepKind::Relation, "repos", JoinCardinality::Many, "Repo"),
            (PathStepKind::Reference, "org", JoinCardinality::One, "Org"),
        ]
    );
    assert_eq!(query.ret_cardinality, QueryCardinality::Many);
    assert_eq!(query.ret_type, "Org");
}

#[test]
fn test_count_aggregate_is_integer() {
    let definition = compose_program(org_repo_models());
    let query = definition.query("Org.repo_count").unwrap();
    assert_eq!(query.ty, Type::integer());
    assert_eq!(query.ret_cardinality, QueryCardinality::One);
    assert_eq!(query.ret_type, "Repo");
}

#[test]
fn test_public_path_builder_matches_composer() {
    let definition = compose_program(org_repo_models());
    let path = build_join_path(&definition, "Org", &["repos", "org"]).unwrap();
    assert_eq!(path.steps, definition.query("Org.back_to_org").unwrap().path);
    assert_eq!(path.ret_cardinality, QueryCardinality::Many);

    let single = build_join_path(&definition, "Repo", &["org"]).unwrap();
    assert_eq!(single.ret_cardinality, QueryCardinality::One);

    let err = build_join_path(&definition, "Repo", &["name"]).unwrap_err();
    assert!(matches!(err, ComposeError::InvalidPathSegment { .. }));
}

#[test]
fn test_unique_and_nullable_relations() {
    let definition = compose_program(vec![
        model(
            "User",
            vec![
                relation("profile", "Profile", "user").into(),
                relation("posts", "Post", "author").into(),
            ],
        )
        .into(),
        model("Profile", vec![reference("user", "User").unique().nullable().into()]).into(),
        model("Post", vec![reference("author", "User").nullable().into()]).into(),
    ]);
    let user = definition.model("User").unwrap();

    let profile = user.relation("profile").unwrap();
    assert!(profile.unique);
    assert!(profile.nullable);
    let posts = user.relation("posts").unwrap();
    assert!(!posts.unique);
    assert!(!posts.nullable);

    let path = build_join_path(&definition, "User", &["profile"]).unwrap();
    assert_eq!(path.ret_cardinality, QueryCardinality::Nullable);
}

#[test]
fn test_reference_cycle_composes() {
    let spec = spec_of(vec![
        model("A", vec![reference("b", "B").nullable().into()]).into(),
        model("B", vec![reference("a", "A").nullable().into()]).into(),
    ]);
    let definition = compose(&spec, &ComposeOptions::default()).unwrap();
    assert_eq!(definition.model("A").unwrap().reference("b").unwrap().to_model_ref_key, "B");
    assert_eq!(definition.model("B").unwrap().reference("a").unwrap().to_model_ref_key, "A");
}

#[test]
fn test_forward_relation_needs_a_second_pass() {
    let spec = spec_of(org_repo_models());
    let mut session = ComposeSession::new(&spec, ComposeOptions::default());
    session.compose_models().unwrap();
    assert!(session.passes() >= 2);
}

#[test]
fn test_non_progress_is_an_infinite_loop() {
    let mut spec = spec_of(vec![
        model(
            "A",
            vec![
                reference("parent", "A").nullable().into(),
                query("x", vec![from("parent", None)]).into(),
                query("y", vec![from("parent", None)]).into(),
            ],
        )
        .into(),
    ]);
    // Point the queries at each other, which resolution would never allow.
    let swap = |query: &str| RefIdent {
        text: query.to_string(),
        ref_: Ref::atom(AtomKind::Query, "A", query, false),
        ty: Type::Unknown,
    };
    spec.models[0].queries[0].from = vec![swap("y")];
    spec.models[0].queries[1].from = vec![swap("x")];

    let err = compose(&spec, &ComposeOptions::default()).unwrap_err();
    assert_eq!(
        err,
        ComposeError::InfiniteLoop {
            pending: vec!["A.x".into(), "A.y".into()]
        }
    );
}

#[test]
fn test_ancestor_select_is_minimal() {
    let definition = compose_program(with_api(
        org_repo_models(),
        vec![entrypoint("Org").entrypoint(
            entrypoint("repos")
                .endpoint(
                    endpoint(EndpointKind::Create)
                        .action(create(None, None, vec![set("org_id", var("org.id"))])),
                )
                .endpoint(
                    endpoint(EndpointKind::Update)
                        .action(update(None, None, vec![set("name", var("org.name"))])),
                ),
        )],
    ));
    let all = endpoints(&definition);

    let create = all[0];
    assert_eq!(create.parent_context.len(), 1);
    assert_eq!(create.parent_context[0].target.alias, "org");
    assert_eq!(create.parent_context[0].select.aliases(), vec!["id"]);

    let update = all[1];
    assert_eq!(update.parent_context[0].select.aliases(), vec!["id", "name"]);
    assert_eq!(update.target.select.aliases(), vec!["id"]);
}

#[test]
fn test_nested_create_links_parent_and_derives_fieldset() {
    let definition = compose_program(with_api(
        org_repo_models(),
        vec![entrypoint("Org").entrypoint(
            entrypoint("repos")
                .endpoint(endpoint(EndpointKind::Create))
                .endpoint(endpoint(EndpointKind::Update)),
        )],
    ));
    let all = endpoints(&definition);

    let create = all[0];
    assert_eq!(create.method, HttpMethod::Post);
    assert_eq!(create.path, "/org/{org_id}/repos");
    let primary = model_action(create.primary_action().unwrap());
    assert_eq!(
        primary.operation("org_id").unwrap().setter,
        FieldSetterDef::ReferenceValue {
            target: vec!["org".into(), "id".into()]
        }
    );
    assert!(matches!(
        primary.operation("stars").unwrap().setter,
        FieldSetterDef::Function { ref name, .. } if name == "coalesce"
    ));

    let fieldset = create.fieldset.as_ref().unwrap();
    assert!(fieldset.get(&["name"]).unwrap().as_field().unwrap().required);
    assert!(!fieldset.get(&["description"]).unwrap().as_field().unwrap().required);
    assert!(!fieldset.get(&["stars"]).unwrap().as_field().unwrap().required);
    assert!(fieldset.get(&["org_id"]).is_none());
    assert!(fieldset.get(&["id"]).is_none());

    let update = all[1];
    assert_eq!(update.method, HttpMethod::Patch);
    assert_eq!(update.path, "/org/{org_id}/repos/{repos_id}");
    let fieldset = update.fieldset.as_ref().unwrap();
    assert!(!fieldset.get(&["name"]).unwrap().as_field().unwrap().required);
    assert!(!fieldset.get(&["org_id"]).unwrap().as_field().unwrap().required);
}

#[test]
fn test_explicit_atoms_lower_in_order() {
    let definition = compose_program(with_api(
        org_repo_models(),
        vec![entrypoint("Repo").endpoint(endpoint(EndpointKind::Create).action(create(
            None,
            None,
            vec![
                inputs(vec![input_field("name").with_default(string("untitled"))]),
                reference_through("org", "slug"),
                deny(&["description"]),
                set("name", string("ignored")),
            ],
        )))],
    ));
    let create = endpoints(&definition)[0];
    let primary = model_action(create.primary_action().unwrap());

    let names: Vec<_> = primary.changeset.iter().map(|op| op.name.as_str()).collect();
    assert_eq!(names, vec!["name", "org_id", "stars"]);
    assert!(matches!(
        primary.operation("name").unwrap().setter,
        FieldSetterDef::Function { .. }
    ));
    assert_eq!(
        primary.operation("org_id").unwrap().setter,
        FieldSetterDef::FieldsetReferenceInput {
            fieldset_access: vec!["org_slug".into()],
            through_ref_key: "Org.slug".into(),
            to_model_ref_key: "Org".into(),
        }
    );

    let fieldset = create.fieldset.as_ref().unwrap();
    assert!(fieldset.get(&["org_slug"]).unwrap().as_field().unwrap().required);
    assert!(!fieldset.get(&["name"]).unwrap().as_field().unwrap().required);
    assert!(fieldset.get(&["description"]).is_none());
}

#[test]
fn test_authorize_chain_and_auth_select() {
    let mut globals = org_repo_models();
    globals.push(auth("Org").into());
    let definition = compose_program(with_api(
        globals,
        vec![entrypoint("Org")
            .authorize(binary(
                blueprint_ast::ast::BinaryOp::IsNot,
                var("@auth.id"),
                null(),
            ))
            .endpoint(endpoint(EndpointKind::Get).authorize(binary(
                blueprint_ast::ast::BinaryOp::Is,
                var("@auth.slug"),
                var("org.slug"),
            )))
            .endpoint(endpoint(EndpointKind::List).pageable())],
    ));
    let all = endpoints(&definition);

    let get = all[0];
    assert_eq!(get.path, "/org/{org_id}");
    assert!(matches!(
        get.authorize,
        Some(blueprint_ast::spec::TypedExpr::Binary {
            op: blueprint_ast::ast::BinaryOp::And,
            ..
        })
    ));
    assert_eq!(get.auth_select.as_ref().unwrap().aliases(), vec!["id", "slug"]);
    assert_eq!(get.target.select.aliases(), vec!["id", "slug"]);

    let list = all[1];
    assert_eq!(list.path, "/org");
    assert_eq!(list.page_size, Some(20));
    assert_eq!(list.auth_select.as_ref().unwrap().aliases(), vec!["id"]);
    assert_eq!(
        definition.authenticator.as_ref().unwrap().auth_user_model_ref_key,
        "Org"
    );
}

#[test]
fn test_response_defaults_follow_options() {
    let spec = spec_of(with_api(
        org_repo_models(),
        vec![entrypoint("Org")
            .response(select(vec![select_item("name")]))
            .endpoint(endpoint(EndpointKind::Get))
            .entrypoint(entrypoint("repos").endpoint(endpoint(EndpointKind::List)))],
    ));

    let definition = compose(&spec, &ComposeOptions::default()).unwrap();
    let all = endpoints(&definition);
    assert_eq!(all[0].response.as_ref().unwrap().aliases(), vec!["name"]);
    assert_eq!(
        all[1].response.as_ref().unwrap().aliases(),
        vec!["id", "name", "description", "stars", "org_id"]
    );

    let options = ComposeOptions {
        emit_default_response: false,
        ..ComposeOptions::default()
    };
    let definition = compose(&spec, &options).unwrap();
    assert!(endpoints(&definition)[1].response.is_none());
}

#[test]
fn test_populator_links_nested_rows() {
    let mut globals = org_repo_models();
    globals.push(runtime("node").into());
    globals.push(
        populator(
            "seed",
            vec![populate("Org", None)
                .repeat(Some("i"), RepeaterKind::Fixed(3))
                .atom(set("name", call("stringify", vec![var("i.current")])))
                .atom(set("slug", string("org")))
                .populate(populate("repos", None).atom(set("name", string("first"))))],
        )
        .into(),
    );
    let definition = compose_program(globals);

    let root = &definition.populators[0].populates[0];
    assert_eq!(root.repeater.count(), 3);
    assert!(matches!(
        root.action.operation("name").unwrap().setter,
        FieldSetterDef::Expression { .. }
    ));
    assert_eq!(
        root.action.operation("slug").unwrap().setter,
        FieldSetterDef::Literal {
            value: blueprint_ast::ast::Literal::String("org".into())
        }
    );

    let nested = &root.populates[0];
    assert_eq!(nested.target.name_path, vec!["Org".to_string(), "repos".to_string()]);
    assert_eq!(
        nested.action.operation("org_id").unwrap().setter,
        FieldSetterDef::ReferenceValue {
            target: vec!["org".into(), "id".into()]
        }
    );

    assert!(definition.runtimes[0].default);
}
