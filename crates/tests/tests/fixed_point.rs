//! The model composition loop on specifications resolution would reject.

use blueprint_ast::build::*;
use blueprint_ast::spec::{RefIdent, Specification};
use blueprint_ast::{AtomKind, Ref, Type};
use blueprint_compose::{ComposeError, ComposeOptions, ComposeSession, compose};

fn lowered(globals: Vec<blueprint_ast::ast::GlobalAtom>) -> Specification {
    blueprint_tests::init_tracing();
    let program = blueprint_resolve::resolve(program(globals)).unwrap();
    blueprint_resolve::lower(&program).unwrap()
}

fn query_ref(model: &str, name: &str) -> RefIdent {
    RefIdent {
        text: name.to_string(),
        ref_: Ref::atom(AtomKind::Query, model, name, false),
        ty: Type::Unknown,
    }
}

#[test]
fn test_queries_waiting_on_each_other_abort() {
    let mut spec = lowered(vec![
        model(
            "Node",
            vec![
                reference("parent", "Node").nullable().into(),
                query("up", vec![from("parent", None)]).into(),
                query("down", vec![from("parent", None)]).into(),
                query("fine", vec![from("parent.parent", None)]).into(),
            ],
        )
        .into(),
    ]);
    let node = &mut spec.models[0];
    node.queries[0].from = vec![query_ref("Node", "down")];
    node.queries[1].from = vec![query_ref("Node", "up")];

    let err = compose(&spec, &ComposeOptions::default()).unwrap_err();
    assert_eq!(
        err,
        ComposeError::InfiniteLoop {
            pending: vec!["Node.up".to_string(), "Node.down".to_string()],
        }
    );
    assert!(err.to_string().contains("Node.up"));
}

#[test]
fn test_forward_members_settle_in_later_passes() {
    let spec = lowered(vec![
        model(
            "Org",
            vec![
                relation("repos", "Repo", "org").into(),
                query("stars", vec![from("repos.org", None)]).into(),
            ],
        )
        .into(),
        model("Repo", vec![reference("org", "Org").into()]).into(),
    ]);

    let mut session = ComposeSession::new(&spec, ComposeOptions::default());
    session.compose_models().unwrap();
    assert!(session.passes() > 1);

    let definition = session.compose().unwrap();
    assert_eq!(definition.query("Org.stars").unwrap().path.len(), 2);
}

#[test]
fn test_unknown_reference_target_is_fatal() {
    let mut spec = lowered(vec![
        model("A", vec![reference("b", "B").into()]).into(),
        model("B", vec![]).into(),
    ]);
    spec.models[0].references[0].to_model = "Gone".to_string();

    let err = compose(&spec, &ComposeOptions::default()).unwrap_err();
    assert_eq!(err, ComposeError::UnknownModel("Gone".to_string()));
}
