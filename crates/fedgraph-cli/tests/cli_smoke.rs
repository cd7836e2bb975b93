use serde_json::{Value, json};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "fedgraph-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_fedgraph<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_fedgraph");
    Command::new(bin)
        .args(args)
        .env_remove("FEDGRAPH_LOG")
        .env_remove("RUST_LOG")
        .output()
        .expect("fedgraph command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

const SPEAKERS_SDL: &str = r#"
type Speaker @key(fields: "link { href }") {
  firstName: String
  link: Link
}

type Link {
  href: String
}

type Query {
  speakers: [Speaker]
}
"#;

const SESSIONS_SDL: &str = r#"
extend type Speaker @key(fields: "link { href }") {
  link: Link @external
  talks: [Talk]
}

type Talk @key(fields: "id") {
  id: ID!
  title: String
}
"#;

const SPEAKERS_DATA: &str = r#"{
  "Speaker": [
    { "firstName": "Ada", "link": { "href": "https://speakers.example/ada" } },
    { "firstName": "Grace", "link": { "href": "https://speakers.example/grace" } }
  ]
}"#;

const SESSIONS_DATA: &str = r#"{"__typename": "Talk", "id": "t1", "title": "Engines"}
"#;

fn write_gateway(dir: &Path, extra: &str) -> PathBuf {
    fs::write(dir.join("speakers.graphql"), SPEAKERS_SDL).expect("write speakers schema");
    fs::write(dir.join("sessions.graphql"), SESSIONS_SDL).expect("write sessions schema");
    fs::write(dir.join("speakers.json"), SPEAKERS_DATA).expect("write speakers data");
    fs::write(dir.join("sessions.jsonl"), SESSIONS_DATA).expect("write sessions data");

    let config = format!(
        r#"[gateway]
resolution_timeout_ms = 2000

[[subgraphs]]
name = "speakers"
schema = "speakers.graphql"
data = "speakers.json"
resolvers = ["Speaker"]

[[subgraphs]]
name = "sessions"
schema = "sessions.graphql"
data = "sessions.jsonl"
resolvers = ["Talk"]
{extra}"#
    );
    let path = dir.join("fedgraph.toml");
    fs::write(&path, config).expect("write config");
    path
}

#[test]
fn compose_prints_supergraph() {
    let tmp = TempDirGuard::new("compose");
    let config = write_gateway(tmp.path(), "");

    let output = run_fedgraph(["compose", "--config", config.to_str().unwrap()]);
    assert_success(&output);

    let sdl = stdout_text(&output);
    assert!(sdl.contains(r#"type Speaker @join__type(graph: "speakers", key: "link { href }")"#));
    assert!(sdl.contains(r#"@join__type(graph: "sessions", key: "link { href }")"#));
    assert!(sdl.contains(r#"talks: [Talk] @join__field(graph: "sessions")"#));
}

#[test]
fn compose_writes_out_file_and_json_report() {
    let tmp = TempDirGuard::new("compose-out");
    let config = write_gateway(tmp.path(), "");
    let out = tmp.path().join("supergraph.graphql");

    let output = run_fedgraph([
        "compose",
        "--config",
        config.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--json",
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["report"]["result"], json!("accepted"));
    assert_eq!(payload["report"]["entityCount"], json!(2));
    assert!(payload["supergraph"].is_null());
    let written = fs::read_to_string(&out).expect("supergraph written");
    assert!(written.contains("type Talk"));
}

#[test]
fn validate_accepts_and_rejects() {
    let tmp = TempDirGuard::new("validate");
    let config = write_gateway(tmp.path(), "");

    let ok = run_fedgraph(["validate", "--config", config.to_str().unwrap(), "--json"]);
    assert_success(&ok);
    let report = parse_json_stdout(&ok);
    assert_eq!(report["result"], json!("accepted"));
    assert!(report["fingerprint"].is_string());

    // A second owner of Talk without a resolver.
    fs::write(
        tmp.path().join("talks.graphql"),
        "type Talk @key(fields: \"id\") {\n  id: ID!\n}\n",
    )
    .unwrap();
    let config = write_gateway(
        tmp.path(),
        "\n[[subgraphs]]\nname = \"talks\"\nschema = \"talks.graphql\"\n",
    );
    let bad = run_fedgraph(["validate", "--config", config.to_str().unwrap(), "--json"]);
    assert_failure(&bad);
    let report = parse_json_stdout(&bad);
    assert_eq!(report["result"], json!("rejected"));
    let codes: Vec<&str> = report["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["code"].as_str().unwrap())
        .collect();
    assert!(codes.contains(&"duplicate_owner"), "codes: {codes:?}");
}

#[test]
fn resolve_returns_results_in_order() {
    let tmp = TempDirGuard::new("resolve");
    let config = write_gateway(tmp.path(), "");
    let refs = tmp.path().join("refs.json");
    fs::write(
        &refs,
        serde_json::to_string(&json!([
            {"__typename": "Speaker", "link": {"href": "https://speakers.example/grace"}},
            {"__typename": "Talk", "id": "nope"},
            {"__typename": "Speaker", "href": "https://speakers.example/grace"},
            {"__typename": "Talk", "id": "t1"}
        ]))
        .unwrap(),
    )
    .unwrap();

    let output = run_fedgraph([
        "resolve",
        refs.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert_success(&output);

    let results = parse_json_stdout(&output);
    let statuses: Vec<&str> = results
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["found", "not_found", "error", "found"]);
    assert_eq!(results[0]["entity"]["firstName"], json!("Grace"));
    assert_eq!(results[0]["entity"]["__typename"], json!("Speaker"));
    assert_eq!(results[2]["code"], json!("invalid_reference"));
    assert_eq!(results[3]["entity"]["title"], json!("Engines"));
}

#[test]
fn invalid_config_reports_error() {
    let tmp = TempDirGuard::new("bad-config");
    let config = tmp.path().join("fedgraph.toml");
    fs::write(
        &config,
        "[[subgraphs]]\nname = \"Not Valid\"\nschema = \"x.graphql\"\n",
    )
    .unwrap();

    let output = run_fedgraph(["validate", "--config", config.to_str().unwrap()]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("error: invalid subgraph name `Not Valid`"));
}

#[test]
fn sdl_errors_name_the_subgraph() {
    let tmp = TempDirGuard::new("bad-sdl");
    let config = write_gateway(tmp.path(), "");
    fs::write(tmp.path().join("sessions.graphql"), "interface Node { id: ID! }\n").unwrap();

    let output = run_fedgraph(["compose", "--config", config.to_str().unwrap()]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("invalid schema for subgraph `sessions`"));
}
