//! Model and query composition through the whole pipeline.

use blueprint_ast::ast::{AggregateKind, BinaryOp, GlobalAtom};
use blueprint_ast::build::*;
use blueprint_ast::{AtomKind, Type};
use blueprint_compose::definition::{JoinCardinality, PathStepKind, QueryCardinality};
use blueprint_resolve::ErrorKind;
use blueprint_tests::{TestHarness, has_error, resolve_errors};

fn org_repo(org_queries: Vec<blueprint_ast::ast::ModelAtom>) -> Vec<GlobalAtom> {
    let mut org_atoms = vec![
        field("name", "string").into(),
        relation("repos", "Repo", "org").into(),
    ];
    org_atoms.extend(org_queries);
    vec![
        model("Org", org_atoms).into(),
        model(
            "Repo",
            vec![
                field("name", "string").into(),
                reference("org", "Org").into(),
            ],
        )
        .into(),
    ]
}

#[test]
fn test_back_to_org_scenario() {
    let harness = TestHarness::compile(org_repo(vec![
        query("back_to_org", vec![from("repos.org", None)]).into(),
    ]));
    let query = harness.query("Org.back_to_org");

    assert_eq!(query.path.len(), 2);
    assert_eq!(query.path[0].kind, PathStepKind::Relation);
    assert_eq!(query.path[0].name, "repos");
    assert_eq!(query.path[0].cardinality, JoinCardinality::Many);
    assert_eq!(query.path[0].target_model_ref_key, "Repo");
    assert_eq!(query.path[1].kind, PathStepKind::Reference);
    assert_eq!(query.path[1].name, "org");
    assert_eq!(query.path[1].cardinality, JoinCardinality::One);
    assert_eq!(query.path[1].target_model_ref_key, "Org");

    assert_eq!(query.ret_cardinality, QueryCardinality::Many);
    assert_eq!(query.ret_type, "Org");
    assert_eq!(query.select.model_ref_key, "Org");
    assert_eq!(query.select.aliases(), vec!["id", "name"]);
}

#[test]
fn test_count_overrides_type_and_cardinality() {
    let harness = TestHarness::compile(org_repo(vec![
        query(
            "org_count",
            vec![from("repos.org", None), aggregate(AggregateKind::Count)],
        )
        .into(),
    ]));
    let query = harness.query("Org.org_count");
    assert_eq!(query.ty, Type::integer());
    assert_eq!(query.ret_cardinality, QueryCardinality::One);
}

#[test]
fn test_any_many_step_makes_the_result_many() {
    let harness = TestHarness::compile(org_repo(vec![
        query("siblings", vec![from("repos.org.repos", None)]).into(),
    ]));
    let query = harness.query("Org.siblings");
    assert_eq!(query.path.len(), 3);
    assert_eq!(query.ret_cardinality, QueryCardinality::Many);
    assert_eq!(query.ret_type, "Repo");

    let single = TestHarness::compile(org_repo(vec![]));
    let path = blueprint_compose::build_join_path(single.definition(), "Repo", &["org"]).unwrap();
    assert_eq!(path.ret_cardinality, QueryCardinality::One);
}

#[test]
fn test_mutual_references_compose() {
    let harness = TestHarness::compile(vec![
        model("A", vec![reference("b", "B").nullable().into()]).into(),
        model("B", vec![reference("a", "A").nullable().into()]).into(),
    ]);

    let a = harness.model("A");
    assert_eq!(a.reference("b").unwrap().to_model_ref_key, "B");
    assert_eq!(a.field("b_id").unwrap().dbname, "b_id");
    assert!(a.field("b_id").unwrap().nullable);
    assert_eq!(harness.model("B").reference("a").unwrap().to_model_ref_key, "A");
}

#[test]
fn test_circular_computed_is_rejected() {
    let errors = resolve_errors(vec![
        model(
            "A",
            vec![
                computed("x", binary(BinaryOp::Add, var("y"), int(1))).into(),
                computed("y", binary(BinaryOp::Add, var("x"), int(1))).into(),
            ],
        )
        .into(),
    ]);
    assert!(has_error(&errors, ErrorKind::CircularMember));
}

#[test]
fn test_members_keep_declaration_order() {
    let harness = TestHarness::compile(vec![
        model(
            "User",
            vec![
                field("email", "string").unique().into(),
                field("age", "integer").into(),
                computed("next_age", binary(BinaryOp::Add, var("age"), int(1))).into(),
            ],
        )
        .into(),
    ]);
    let user = harness.model("User");

    let names: Vec<_> = user.fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, ["id", "email", "age"]);
    assert!(user.field("id").unwrap().primary);
    assert!(user.field("email").unwrap().unique);
    assert_eq!(user.dbname, "user");

    let computed = user.computed("next_age").unwrap();
    assert_eq!(computed.ref_key, "User.next_age");
    assert_eq!(computed.ty, Type::integer());
    assert_eq!(
        user.member("next_age").map(|member| member.kind()),
        Some(AtomKind::Computed)
    );
}
