use std::path::PathBuf;

use blueprint_ast::ast::{EndpointKind, GlobalAtom};
use blueprint_ast::build::*;
use blueprint_ast::{SourceMap, Span};
use blueprint_resolve::{CompileError, ErrorKind};

use super::*;

fn org_repo() -> Vec<GlobalAtom> {
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
                reference("org", "Org").into(),
            ],
        )
        .into(),
        api(
            None,
            vec![entrypoint("Org")
                .endpoint(endpoint(EndpointKind::List).pageable())
                .entrypoint(entrypoint("repos").endpoint(endpoint(EndpointKind::Create)))],
        )
        .into(),
    ]
}

#[test]
fn test_compile_runs_every_stage() {
    let config = CompilerConfig::new("test").with_page_size(7);
    let definition = compile(program(org_repo()), &config).unwrap();

    assert_eq!(definition.models.len(), 2);
    let endpoints = definition.apis[0].endpoints();
    assert_eq!(endpoints.len(), 2);
    assert_eq!(endpoints[0].page_size, Some(7));
    assert_eq!(endpoints[1].path, "/org/{org_id}/repos");
}

#[test]
fn test_resolve_errors_are_capped() {
    let globals = vec![
        model(
            "A",
            vec![
                reference("b", "Missing1").into(),
                reference("c", "Missing2").into(),
                reference("d", "Missing3").into(),
            ],
        )
        .into(),
    ];

    let err = compile(program(globals.clone()), &CompilerConfig::default()).unwrap_err();
    let all = err.diagnostics().len();
    assert!(all >= 3);

    let err = compile(program(globals), &CompilerConfig::default().with_max_errors(2)).unwrap_err();
    assert!(matches!(err, CompilerError::Resolve(_)));
    assert_eq!(err.diagnostics().len(), 2);
}

#[test]
fn test_definition_survives_messagepack() {
    let config = CompilerConfig::default();
    let definition = compile(program(org_repo()), &config).unwrap();

    let bytes = emit(&definition, &config).unwrap().unwrap();
    let decoded = deserialize_definition(&bytes).unwrap();
    assert_eq!(decoded, definition);

    let none = emit(&definition, &config.clone().with_output(OutputFormat::None)).unwrap();
    assert!(none.is_none());
}

#[test]
fn test_garbage_bytes_fail_to_decode() {
    assert!(deserialize_definition(&[0xc1, 0x00]).is_err());
}

#[test]
fn test_format_errors_points_at_source() {
    let mut sources = SourceMap::new();
    let file = sources.add_file(
        PathBuf::from("app.bp"),
        "model Org {\n  field name { type strin }\n}".to_string(),
    );
    let error = CompileError::new(
        ErrorKind::UndefinedName,
        Span::new(file, 32, 37),
        "unknown type 'strin'".to_string(),
    );

    let text = format_errors(&[error], &sources);
    assert!(text.contains("unknown type 'strin'"));
    assert!(text.contains("app.bp:2:"));
    assert!(text.contains("^^^^^"));
}
