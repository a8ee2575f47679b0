//! Sessions using rules and server identity from a config file

use std::fs;

use quill_config::QuillConfig;
use quill_lsp::{Dispatcher, DocumentStore};

use crate::common::{URI, code_action, did_open, frames, initialize, run_session};

const CONFIG: &str = r#"
[server]
name = "quill-test"
version = "2.0.0"

[[rules]]
term = "TODO"
severity = "hint"
source = "tasks"
message = "Unfinished work"

[code_action]
term = "TODO"
replacement = "DONE"
redacted = "T**O"
"#;

fn dispatcher_from(config: &QuillConfig) -> Dispatcher {
    Dispatcher::new(
        DocumentStore::new(config.diagnostic_engine()),
        config.server_info(),
    )
}

#[tokio::test]
async fn configured_rules_drive_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, CONFIG).unwrap();
    let config = QuillConfig::load_from(&path).unwrap().unwrap();

    let input = frames(&[
        initialize(1),
        did_open(URI, 1, "VS Code\n- TODO: TODO"),
        code_action(2, URI),
    ]);
    let (_, replies) = run_session(dispatcher_from(&config), &input).await;

    assert_eq!(replies.len(), 3);
    assert_eq!(
        replies[0]["result"]["serverInfo"],
        serde_json::json!({ "name": "quill-test", "version": "2.0.0" })
    );

    let diagnostics = replies[1]["params"]["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 2);
    for (diagnostic, start) in diagnostics.iter().zip([2, 8]) {
        assert_eq!(diagnostic["severity"], 4);
        assert_eq!(diagnostic["source"], "tasks");
        assert_eq!(diagnostic["range"]["start"]["line"], 1);
        assert_eq!(diagnostic["range"]["start"]["character"], start);
    }

    let titles: Vec<&str> = replies[2]["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|action| action["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        [
            "Replace TODO with DONE",
            "Censor T**O",
            "Replace TODO with DONE",
            "Censor T**O"
        ]
    );
}

#[test]
fn invalid_config_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[[rules]]\nterm = \"x\"\n").unwrap();

    let err = QuillConfig::load_from(&path).unwrap_err();
    assert_eq!(err.path(), path.as_path());
}
