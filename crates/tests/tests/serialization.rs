//! Definition hand-off: MessagePack encoding and config-driven compilation.

use std::io::Write;

use blueprint_ast::Span;
use blueprint_ast::ast::{
    AggregateKind, BinaryOp, EndpointKind, Generator, GlobalAtom, RepeaterKind, SortOrder,
};
use blueprint_ast::build::*;
use blueprint_compiler::{
    CompilerConfig, OutputFormat, deserialize_definition, emit, serialize_definition,
};
use blueprint_compose::definition::{FieldSetterDef, GeneratorDef, ValidatorAssertDef};
use blueprint_tests::TestHarness;

fn shop() -> Vec<GlobalAtom> {
    vec![
        runtime("node").source_path("./hooks").into(),
        validator(
            "positive",
            &[("value", "integer")],
            binary(BinaryOp::Gt, var("value"), int(0)),
            "NOT_POSITIVE",
        )
        .into(),
        model(
            "Org",
            vec![
                field("name", "string")
                    .validate(validator_call("minLength", vec![int(3)]))
                    .into(),
                field("slug", "string").unique().into(),
                relation("repos", "Repo", "org").into(),
                query(
                    "top_repos",
                    vec![
                        from("repos", Some("r")),
                        filter(binary(BinaryOp::Gt, var("r.stars"), int(10))),
                        order_by(&[("r.stars", SortOrder::Desc)]),
                        limit(5),
                    ],
                )
                .into(),
                query("repo_count", vec![from("repos", None), aggregate(AggregateKind::Count)])
                    .into(),
                computed("label", call("concat", vec![var("name"), string("/"), var("slug")]))
                    .into(),
                model_hook("audit", inline_hook("return true").arg("slug", var("slug"))).into(),
            ],
        )
        .into(),
        model(
            "Repo",
            vec![
                field("name", "string").into(),
                field("stars", "integer")
                    .with_default(int(1))
                    .validate(validator_call("positive", vec![]))
                    .into(),
                reference("org", "Org").into(),
            ],
        )
        .into(),
        auth("Org").into(),
        api(
            None,
            vec![entrypoint("Org")
                .identify_through("slug")
                .authorize(binary(BinaryOp::IsNot, var("@auth.id"), null()))
                .endpoint(endpoint(EndpointKind::List).pageable())
                .endpoint(endpoint(EndpointKind::Get))
                .endpoint(endpoint(EndpointKind::Update).action(update(
                    None,
                    None,
                    vec![input(&["name"]), deny_all()],
                )))
                .entrypoint(
                    entrypoint("repos")
                        .endpoint(endpoint(EndpointKind::Create).action(create(
                            None,
                            None,
                            vec![
                                virtual_input("note", "string").into(),
                                set("name", var("note")),
                            ],
                        )))
                        .endpoint(endpoint(EndpointKind::Delete)),
                )],
        )
        .into(),
        populator(
            "seed",
            vec![populate("Org", None)
                .repeat(Some("i"), RepeaterKind::Range { start: 1, end: 4 })
                .atom(set("name", call("stringify", vec![var("i.current")])))
                .atom(set("slug", call("stringify", vec![var("i.current")])))
                .populate(populate("repos", None).atom(set("name", string("first"))))],
        )
        .into(),
        GlobalAtom::Generator(Generator::ApiDocs {
            base_path: Some("/docs".to_string()),
            span: Span::synthetic(),
        }),
    ]
}

#[test]
fn test_full_definition_round_trips() {
    let definition = TestHarness::compile(shop()).into_definition();

    let bytes = serialize_definition(&definition).unwrap();
    let decoded = deserialize_definition(&bytes).unwrap();
    assert_eq!(decoded, definition);
}

#[test]
fn test_globals_reach_the_definition() {
    let harness = TestHarness::compile(shop());
    let definition = harness.definition();

    assert_eq!(definition.runtimes.len(), 1);
    assert!(definition.runtimes[0].default);
    assert_eq!(
        definition.generators,
        vec![GeneratorDef::ApiDocs {
            base_path: Some("/docs".to_string())
        }]
    );

    let positive = &definition.validators[0];
    assert_eq!(positive.error_code, "NOT_POSITIVE");
    assert!(matches!(positive.assert, ValidatorAssertDef::Expr(_)));

    let org = harness.model("Org");
    assert_eq!(org.field("name").unwrap().validators[0].name, "minLength");
    assert!(org.field("name").unwrap().validators[0].builtin);
    assert_eq!(org.hook("audit").unwrap().hook.args[0].name, "slug");

    let top = harness.query("Org.top_repos");
    assert_eq!(top.limit, Some(5));
    assert_eq!(top.order_by.len(), 1);
    assert!(top.filter.is_some());

    let seed = &definition.populators[0];
    assert_eq!(seed.populates[0].repeater.count(), 4);
    assert!(matches!(
        seed.populates[0].populates[0].action.operation("org_id").unwrap().setter,
        FieldSetterDef::ReferenceValue { .. }
    ));
}

#[test]
fn test_config_file_drives_compilation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "apiVersion: blueprint/v1\nkind: CompilerConfig\nmetadata:\n  name: shop\n\
         composer:\n  defaultPageSize: 3\n  emitDefaultResponse: false\noutput:\n  format: messagepack\n"
    )
    .unwrap();
    let config = CompilerConfig::load(file.path()).unwrap();

    let harness = TestHarness::compile_with(shop(), &config);
    let list = harness
        .endpoints()
        .into_iter()
        .find(|endpoint| endpoint.page_size.is_some())
        .unwrap();
    assert_eq!(list.page_size, Some(3));
    assert!(list.response.is_none());

    let bytes = emit(harness.definition(), &config).unwrap().unwrap();
    assert_eq!(&deserialize_definition(&bytes).unwrap(), harness.definition());

    let quiet = config.with_output(OutputFormat::None);
    assert!(emit(harness.definition(), &quiet).unwrap().is_none());
}
