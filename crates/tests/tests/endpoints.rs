//! Entrypoints, endpoints and the data each one prefetches.

use blueprint_ast::ast::{BinaryOp, EndpointKind, Entrypoint, GlobalAtom, HttpMethod, Literal};
use blueprint_ast::build::*;
use blueprint_ast::spec::TypedExpr;
use blueprint_ast::{Type, TypeModifier, add_type_modifier};
use blueprint_compose::definition::{ActionDef, FieldSetterDef, FieldsetDef, ModelActionDef};
use blueprint_tests::TestHarness;

fn models() -> Vec<GlobalAtom> {
    vec![
        model(
            "Org",
            vec![
                field("name", "string").into(),
                field("plan", "string").with_default(string("free")).into(),
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
        auth("Org").into(),
    ]
}

fn compile(entrypoints: Vec<Entrypoint>) -> TestHarness {
    let mut globals = models();
    globals.push(api(None, entrypoints).into());
    TestHarness::compile(globals)
}

fn primary(action: Option<&ActionDef>) -> &ModelActionDef {
    match action {
        Some(ActionDef::CreateOne(action) | ActionDef::UpdateOne(action)) => action,
        other => panic!("expected a primary create or update, got {other:?}"),
    }
}

fn required(fieldset: &FieldsetDef, name: &str) -> Option<bool> {
    fieldset
        .get(&[name])
        .and_then(FieldsetDef::as_field)
        .map(|field| field.required)
}

#[test]
fn test_ancestor_select_holds_only_used_fields() {
    let harness = compile(vec![entrypoint("Org").entrypoint(
        entrypoint("repos")
            .endpoint(
                endpoint(EndpointKind::Create)
                    .action(create(None, None, vec![set("org_id", var("org.id"))])),
            )
            .endpoint(endpoint(EndpointKind::Update).action(update(
                None,
                None,
                vec![set("description", var("org.name"))],
            ))),
    )]);

    let create = harness.endpoint(HttpMethod::Post, "/org/{org_id}/repos");
    assert_eq!(create.parent_context.len(), 1);
    assert_eq!(create.parent_context[0].target.name, "Org");
    assert_eq!(create.parent_context[0].select.aliases(), vec!["id"]);

    let update = harness.endpoint(HttpMethod::Patch, "/org/{org_id}/repos/{repos_id}");
    assert_eq!(update.parent_context[0].select.aliases(), vec!["id", "name"]);
}

#[test]
fn test_fieldset_policy_differs_for_create_and_update() {
    let harness = compile(vec![
        entrypoint("Org")
            .endpoint(endpoint(EndpointKind::Create))
            .endpoint(endpoint(EndpointKind::Update)),
    ]);

    let create = harness.endpoint(HttpMethod::Post, "/org");
    let fieldset = create.fieldset.as_ref().unwrap();
    assert_eq!(required(fieldset, "name"), Some(true));
    assert_eq!(required(fieldset, "plan"), Some(false));
    assert!(fieldset.get(&["id"]).is_none());

    let update = harness.endpoint(HttpMethod::Patch, "/org/{org_id}");
    let fieldset = update.fieldset.as_ref().unwrap();
    assert_eq!(required(fieldset, "name"), Some(false));
    assert_eq!(required(fieldset, "plan"), Some(false));

    let action = primary(create.primary_action());
    assert_eq!(
        action.operation("name").map(|op| &op.setter),
        Some(&FieldSetterDef::FieldsetInput {
            fieldset_access: vec!["name".into()],
            ty: blueprint_ast::PrimitiveType::String,
            required: true,
        })
    );
}

#[test]
fn test_explicit_input_keeps_the_field_default() {
    let harness = compile(vec![entrypoint("Org").endpoint(
        endpoint(EndpointKind::Create).action(create(None, None, vec![input(&["plan"])])),
    )]);

    let create = harness.endpoint(HttpMethod::Post, "/org");
    assert_eq!(required(create.fieldset.as_ref().unwrap(), "plan"), Some(false));
    let action = primary(create.primary_action());
    assert_eq!(
        action.operation("plan").map(|op| &op.setter),
        Some(&FieldSetterDef::Function {
            name: "coalesce".to_string(),
            args: vec![
                FieldSetterDef::FieldsetInput {
                    fieldset_access: vec!["plan".into()],
                    ty: blueprint_ast::PrimitiveType::String,
                    required: false,
                },
                FieldSetterDef::Literal {
                    value: Literal::String("free".to_string()),
                },
            ],
        })
    );
}

#[test]
fn test_shadowed_input_stays_out_of_the_fieldset() {
    let harness = compile(vec![entrypoint("Org").endpoint(
        endpoint(EndpointKind::Create).action(create(
            None,
            None,
            vec![set("name", string("fixed")), input(&["name"])],
        )),
    )]);

    let create = harness.endpoint(HttpMethod::Post, "/org");
    let fieldset = create.fieldset.as_ref().unwrap();
    assert!(fieldset.get(&["name"]).is_none());
    assert_eq!(required(fieldset, "plan"), Some(false));

    let action = primary(create.primary_action());
    assert_eq!(
        action.operation("name").map(|op| &op.setter),
        Some(&FieldSetterDef::Literal {
            value: Literal::String("fixed".to_string()),
        })
    );
}

#[test]
fn test_routes_follow_the_entrypoint_tree() {
    let harness = compile(vec![
        entrypoint("Org")
            .endpoint(endpoint(EndpointKind::List))
            .endpoint(endpoint(EndpointKind::Get))
            .endpoint(endpoint(EndpointKind::Delete))
            .entrypoint(
                entrypoint("repos")
                    .endpoint(endpoint(EndpointKind::List))
                    .endpoint(endpoint(EndpointKind::Delete)),
            ),
    ]);
    let mut routes: Vec<_> = harness
        .endpoints()
        .iter()
        .map(|endpoint| format!("{:?} {}", endpoint.method, endpoint.path))
        .collect();
    routes.sort();
    assert_eq!(
        routes,
        vec![
            "Delete /org/{org_id}",
            "Delete /org/{org_id}/repos/{repos_id}",
            "Get /org",
            "Get /org/{org_id}",
            "Get /org/{org_id}/repos",
        ]
    );

    let delete = harness.endpoint(HttpMethod::Delete, "/org/{org_id}");
    assert!(delete.response.is_none());
    assert!(delete.fieldset.is_none());
    let list = harness.endpoint(HttpMethod::Get, "/org/{org_id}/repos");
    assert_eq!(list.target.target.identify_with.as_ref().unwrap().param_name, "repos_id");
}

#[test]
fn test_guard_narrows_within_one_authorize() {
    let narrowed = and(
        binary(BinaryOp::IsNot, var("@auth.id"), null()),
        binary(BinaryOp::Gt, var("@auth.id"), int(0)),
    );
    let plain = binary(BinaryOp::Gt, var("@auth.id"), int(0));
    let harness = compile(vec![
        entrypoint("Org")
            .endpoint(endpoint(EndpointKind::Get).authorize(narrowed))
            .endpoint(endpoint(EndpointKind::List).authorize(plain)),
    ]);

    fn compared(expr: &TypedExpr) -> Type {
        match expr {
            TypedExpr::Binary {
                op: BinaryOp::And,
                rhs,
                ..
            } => compared(rhs),
            TypedExpr::Binary {
                op: BinaryOp::Gt,
                lhs,
                ..
            } => lhs.ty().clone(),
            other => panic!("unexpected authorize {other:?}"),
        }
    }

    let get = harness.endpoint(HttpMethod::Get, "/org/{org_id}");
    assert_eq!(compared(get.authorize.as_ref().unwrap()), Type::integer());
    assert_eq!(get.auth_select.as_ref().unwrap().aliases(), vec!["id"]);

    let list = harness.endpoint(HttpMethod::Get, "/org");
    assert_eq!(
        compared(list.authorize.as_ref().unwrap()),
        add_type_modifier(Type::integer(), TypeModifier::Nullable)
    );
}
