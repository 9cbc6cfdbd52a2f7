use blueprint_ast::ast::{
    Action, ActionAtom, AggregateKind, BinaryOp, EndpointKind, Expr, ExprKind, GlobalAtom,
    ModelAtom, Program, SetValue,
};
use blueprint_ast::build::*;
use blueprint_ast::{AtomKind, ContextKind, Ref, Type, TypeModifier, add_type_modifier};

use super::resolve;
use crate::error::{CompileError, ErrorKind};

fn errors_of(program: Program) -> Vec<CompileError> {
    match resolve(program) {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    }
}

fn has_error(errors: &[CompileError], kind: ErrorKind) -> bool {
    errors.iter().any(|error| error.kind == kind)
}

fn org_repo_models() -> Vec<GlobalAtom> {
    vec![
        model(
            "Org",
            vec![
                field("name", "string").into(),
                relation("repos", "Repo", "org").into(),
            ],
        )
        .into(),
        model(
            "Repo",
            vec![
                field("name", "string").into(),
                field("description", "string").nullable().into(),
                reference("org", "Org").into(),
            ],
        )
        .into(),
    ]
}

fn first_model_atom<'a>(program: &'a Program, model: &str, member: &str) -> &'a ModelAtom {
    program
        .models()
        .find(|m| m.name.text == model)
        .and_then(|m| m.atom(member))
        .expect("member exists")
}

fn nullable(ty: Type) -> Type {
    add_type_modifier(ty, TypeModifier::Nullable)
}

#[test]
fn test_query_path_through_relation_and_reference() {
    let mut globals = org_repo_models();
    if let GlobalAtom::Model(org) = &mut globals[0] {
        org.atoms
            .push(query("back_to_org", vec![from("repos.org", None)]).into());
        org.atoms.push(
            query(
                "repo_count",
                vec![from("repos", None), aggregate(AggregateKind::Count)],
            )
            .into(),
        );
    }
    let program = resolve(program(globals)).expect("resolves");

    let ModelAtom::Query(back) = first_model_atom(&program, "Org", "back_to_org") else {
        panic!("expected query");
    };
    assert_eq!(back.ty, add_type_modifier(Type::model("Org"), TypeModifier::Collection));

    let ModelAtom::Query(count) = first_model_atom(&program, "Org", "repo_count") else {
        panic!("expected query");
    };
    assert_eq!(count.ty, Type::integer());
}

#[test]
fn test_relation_through_resolves_to_reference() {
    let program = resolve(program(vec![
        model(
            "User",
            vec![
                relation("profile", "Profile", "user").into(),
                relation("posts", "Post", "author").into(),
            ],
        )
        .into(),
        model("Profile", vec![reference("user", "User").unique().into()]).into(),
        model("Post", vec![reference("author", "User").into()]).into(),
    ]))
    .expect("resolves");

    let ModelAtom::Relation(profile) = first_model_atom(&program, "User", "profile") else {
        panic!("expected relation");
    };
    assert_eq!(
        profile.through.ref_,
        Ref::atom(AtomKind::Reference, "Profile", "user", true)
    );
}

#[test]
fn test_guard_narrows_auth_id() {
    let narrowed = and(
        binary(BinaryOp::IsNot, var("@auth.id"), null()),
        binary(BinaryOp::Gt, var("@auth.id"), int(0)),
    );
    let plain = binary(BinaryOp::Gt, var("@auth.id"), int(0));

    let mut globals = org_repo_models();
    globals.push(auth("Org").into());
    globals.push(
        api(
            None,
            vec![
                entrypoint("Org")
                    .endpoint(endpoint(EndpointKind::Get).authorize(narrowed))
                    .endpoint(endpoint(EndpointKind::List).authorize(plain)),
            ],
        )
        .into(),
    );
    let program = resolve(program(globals)).expect("resolves");
    let api = program.apis().next().expect("api");
    let endpoints = &api.entrypoints[0].endpoints;

    let gt_lhs_type = |expr: &Expr| -> Type {
        let ExprKind::Binary { op: BinaryOp::Gt, lhs, .. } = &expr.kind else {
            panic!("expected comparison");
        };
        lhs.ty.clone()
    };

    let Some(authorize) = &endpoints[0].authorize else {
        panic!("authorize");
    };
    let ExprKind::Binary { op: BinaryOp::And, rhs, .. } = &authorize.kind else {
        panic!("expected and");
    };
    assert_eq!(gt_lhs_type(rhs), Type::integer());

    let Some(plain) = &endpoints[1].authorize else {
        panic!("authorize");
    };
    assert_eq!(gt_lhs_type(plain), nullable(Type::integer()));
}

#[test]
fn test_auth_requires_auth_block() {
    let errors = errors_of(program(vec![
        model("User", vec![computed("me", var("@auth.id")).into()]).into(),
    ]));
    assert!(has_error(&errors, ErrorKind::MissingBlock));
}

#[test]
fn test_circular_computed_is_rejected() {
    let errors = errors_of(program(vec![
        model(
            "A",
            vec![
                computed("x", binary(BinaryOp::Add, var("y"), int(1))).into(),
                computed("y", binary(BinaryOp::Add, var("x"), int(1))).into(),
            ],
        )
        .into(),
    ]));
    assert_eq!(
        errors.iter().filter(|e| e.kind == ErrorKind::CircularMember).count(),
        1
    );
}

#[test]
fn test_forward_references_resolve_in_any_order() {
    let program = resolve(program(vec![
        model(
            "A",
            vec![
                computed("total", binary(BinaryOp::Mul, var("half"), int(2))).into(),
                computed("half", binary(BinaryOp::Div, var("base"), int(2))).into(),
                field("base", "integer").into(),
            ],
        )
        .into(),
    ]))
    .expect("resolves");
    let ModelAtom::Computed(total) = first_model_atom(&program, "A", "total") else {
        panic!("expected computed");
    };
    assert_eq!(total.expr.ty, Type::float());
}

#[test]
fn test_duplicate_models_and_members() {
    let errors = errors_of(program(vec![
        model("A", vec![field("x", "string").into(), field("x", "integer").into()]).into(),
        model("A", vec![]).into(),
    ]));
    assert_eq!(
        errors.iter().filter(|e| e.kind == ErrorKind::DuplicateName).count(),
        2
    );
}

#[test]
fn test_field_checks() {
    let errors = errors_of(program(vec![
        model(
            "A",
            vec![
                field("age", "integer").with_default(string("old")).into(),
                field("other", "B").into(),
                computed("lowered", call("shout", vec![])).into(),
            ],
        )
        .into(),
    ]));
    assert!(has_error(&errors, ErrorKind::TypeMismatch));
    assert!(has_error(&errors, ErrorKind::NonPrimitiveType));
    assert!(has_error(&errors, ErrorKind::UndefinedName));
}

#[test]
fn test_primitive_has_no_members() {
    let errors = errors_of(program(vec![
        model(
            "A",
            vec![
                field("name", "string").into(),
                computed("bad", var("name.length")).into(),
            ],
        )
        .into(),
    ]));
    assert!(has_error(&errors, ErrorKind::NoMembers));
}

#[test]
fn test_query_aggregate_misuse() {
    let errors = errors_of(program(vec![
        model(
            "A",
            vec![
                field("n", "integer").into(),
                relation("children", "B", "parent").into(),
                query(
                    "q",
                    vec![
                        from("children", None),
                        order_by(&[("n", Default::default())]),
                        aggregate(AggregateKind::One),
                    ],
                )
                .into(),
            ],
        )
        .into(),
        model(
            "B",
            vec![field("n", "integer").into(), reference("parent", "A").into()],
        )
        .into(),
    ]));
    assert!(has_error(&errors, ErrorKind::AggregateMisuse));
}

#[test]
fn test_nested_create_resolves_parent_alias() {
    let mut globals = org_repo_models();
    globals.push(
        api(
            None,
            vec![
                entrypoint("Org").entrypoint(
                    entrypoint("repos").endpoint(
                        endpoint(EndpointKind::Create)
                            .action(create(
                                Some("org.repos"),
                                None,
                                vec![input(&["name"]), set("org_id", var("org.id"))],
                            ))
                            .action(respond(var("repos.name"), None)),
                    ),
                ),
            ],
        )
        .into(),
    );
    let program = resolve(program(globals)).expect("resolves");
    let api = program.apis().next().expect("api");
    let nested = &api.entrypoints[0].entrypoints[0];
    assert_eq!(nested.target.ref_.atom_kind(), Some(AtomKind::Relation));

    let Action::Create(create) = &nested.endpoints[0].actions[0] else {
        panic!("expected create");
    };
    let ActionAtom::Set { target, value: SetValue::Expr(value), .. } = &create.atoms[1] else {
        panic!("expected set");
    };
    assert_eq!(target.ref_, Ref::atom(AtomKind::Field, "Repo", "org_id", false));
    let path = value.as_path().expect("path");
    assert_eq!(path[0].ref_, Ref::context(ContextKind::Target));
    assert_eq!(path[1].ty, Type::integer());
}

#[test]
fn test_mismatched_default_action_override() {
    let mut globals = org_repo_models();
    globals.push(
        api(
            None,
            vec![entrypoint("Org").endpoint(
                endpoint(EndpointKind::Create).action(update(None, None, vec![])),
            )],
        )
        .into(),
    );
    assert!(has_error(&errors_of(program(globals)), ErrorKind::ActionMismatch));
}

#[test]
fn test_set_id_and_list_only_blocks() {
    let mut globals = org_repo_models();
    globals.push(
        api(
            None,
            vec![entrypoint("Org")
                .endpoint(
                    endpoint(EndpointKind::Update).action(update(
                        None,
                        None,
                        vec![set("id", int(3))],
                    )),
                )
                .endpoint(endpoint(EndpointKind::Get).pageable())],
        )
        .into(),
    );
    let errors = errors_of(program(globals));
    assert!(has_error(&errors, ErrorKind::UnexpectedMemberKind));
    assert!(has_error(&errors, ErrorKind::MissingBlock));
}

#[test]
fn test_repeater_alias_is_a_struct() {
    let mut globals = org_repo_models();
    globals.push(
        populator(
            "seed",
            vec![populate("Org", None)
                .repeat(Some("i"), blueprint_ast::ast::RepeaterKind::Fixed(3))
                .atom(set("name", call("stringify", vec![var("i.current")])))
                .populate(populate("repos", None).atom(set("name", string("first"))))],
        )
        .into(),
    );
    assert!(resolve(program(globals)).is_ok());
}

#[test]
fn test_hook_needs_a_runtime() {
    let errors = errors_of(program(vec![
        model("A", vec![model_hook("h", inline_hook("return 1")).into()]).into(),
    ]));
    assert!(has_error(&errors, ErrorKind::MissingBlock));

    let ok = resolve(program(vec![
        runtime("node").into(),
        model("A", vec![model_hook("h", inline_hook("return 1")).into()]).into(),
    ]));
    assert!(ok.is_ok());
}
