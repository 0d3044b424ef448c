use metapath_cli::OutputFormat;
use metapath_cli::commands::eval::{EvalArgs, ResultKind, run};
use rstest::{fixture, rstest};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CATALOG: &str = r#"{
  "catalog": {
    "@uuid": "c-1",
    "title": "Controls",
    "group": [
      {"@id": "ac", "title": "Access Control", "control": [{"@id": "ac-1"}, {"@id": "ac-2"}]},
      {"@id": "au", "title": "Audit", "control": {"@id": "au-1", "weight": 2.5}}
    ]
  }
}"#;

const PROFILE: &str = r#"{"profile": {"import": {"@href": "catalog.json"}, "title": "Baseline"}}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("catalog.json"), CATALOG).expect("catalog");
    fs::write(dir.path().join("profile.json"), PROFILE).expect("profile");
    Workspace { dir }
}

fn args(expression: &str, document: Option<PathBuf>) -> EvalArgs {
    EvalArgs {
        expression: expression.into(),
        document,
        base_uri: None,
        result: ResultKind::Sequence,
        variables: vec![],
        namespaces: vec![],
        no_predicates: false,
        format: OutputFormat::Json,
    }
}

fn values(output: &str) -> Vec<String> {
    let json: serde_json::Value = serde_json::from_str(output).expect("json");
    json["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["value"].as_str().unwrap_or_default().to_owned())
        .collect()
}

#[rstest]
fn the_document_is_the_context_item(workspace: Workspace) {
    let output = run(&args("//control/@id", Some(workspace.path("catalog.json")))).unwrap();
    assert_eq!(values(&output), ["ac-1", "ac-2", "au-1"]);

    let output = run(&args("/catalog/group[2]/control/weight + 1", Some(workspace.path("catalog.json")))).unwrap();
    assert_eq!(values(&output), ["3.5"]);

    // members keep their document order
    let output = run(&args("name(/catalog/*[1]), path(//group[2]/title)", Some(workspace.path("catalog.json")))).unwrap();
    assert_eq!(values(&output), ["title", "/catalog[1]/group[2]/title[1]"]);
}

#[rstest]
fn relative_documents_resolve_next_to_the_focus(workspace: Workspace) {
    let output =
        run(&args("doc(/profile/import/@href)/catalog/title", Some(workspace.path("profile.json")))).unwrap();
    assert_eq!(values(&output), ["Controls"]);

    // the focus document comes from the same cache as fn:doc
    let output = run(&args("count(doc('profile.json') | /)", Some(workspace.path("profile.json")))).unwrap();
    assert_eq!(values(&output), ["1"]);
}

#[rstest]
fn explicit_base_uri_without_a_document(workspace: Workspace) {
    let mut request = args("doc('catalog.json')/catalog/@uuid", None);
    request.base_uri = Some(workspace.dir.path().display().to_string());
    assert_eq!(values(&run(&request).unwrap()), ["c-1"]);
}

#[rstest]
#[case("/catalog/title", ResultKind::Boolean, r#"{"type":"Boolean","value":true}"#)]
#[case("/catalog/title", ResultKind::String, r#"{"type":"String","value":"Controls"}"#)]
#[case("count(//control)", ResultKind::Number, r#"{"type":"Number","value":"3"}"#)]
#[case("//nothing", ResultKind::Number, r#"{"type":"Number","value":null}"#)]
#[case("//nothing", ResultKind::Node, r#"{"type":"Node","node":null}"#)]
fn result_kinds(workspace: Workspace, #[case] expression: &str, #[case] kind: ResultKind, #[case] expected: &str) {
    let mut request = args(expression, Some(workspace.path("catalog.json")));
    request.result = kind;
    let actual: serde_json::Value = serde_json::from_str(&run(&request).unwrap()).unwrap();
    let expected: serde_json::Value = serde_json::from_str(expected).unwrap();
    assert_eq!(actual, expected);
}

#[rstest]
fn conversion_failures(workspace: Workspace) {
    let mut request = args("/catalog/title", Some(workspace.path("catalog.json")));
    request.result = ResultKind::Number;
    assert!(run(&request).is_err());
    request.expression = "//control".into();
    request.result = ResultKind::Node;
    assert!(run(&request).is_err());
}

#[rstest]
fn variables_and_disabled_predicates(workspace: Workspace) {
    let mut request = args("//control[@id = $wanted]/@id", Some(workspace.path("catalog.json")));
    request.variables = vec![("wanted".into(), "ac-2".into())];
    assert_eq!(values(&run(&request).unwrap()), ["ac-2"]);

    request.no_predicates = true;
    assert_eq!(values(&run(&request).unwrap()), ["ac-1", "ac-2", "au-1"]);
}

#[rstest]
fn failures_are_reported(workspace: Workspace) {
    assert!(run(&args("doc('missing.json')", Some(workspace.path("catalog.json")))).is_err());
    assert!(run(&args("1 +", None)).is_err());
    assert!(run(&args("/", Some(workspace.path("nope.json")))).is_err());
    let err = run(&args("$undefined", None)).unwrap_err();
    assert!(err.to_string().contains("MPDY0002"), "{err}");
}
