//! Full client sessions driven through the serve loop

use quill_lsp::{Dispatcher, ServeOutcome};
use serde_json::json;

use crate::common::{
    URI, code_action, did_change, did_open, exit, frames, initialize, initialized,
    position_request, run_session, shutdown,
};

#[tokio::test]
async fn initialize_reports_capabilities_and_server_info() {
    let input = frames(&[initialize(1)]);
    let (outcome, replies) = run_session(Dispatcher::default(), &input).await;

    assert_eq!(outcome, ServeOutcome::InputClosed);
    assert_eq!(replies.len(), 1);
    let version = env!("CARGO_PKG_VERSION");
    assert_eq!(
        replies[0],
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "capabilities": {
                    "textDocumentSync": 1,
                    "hoverProvider": true,
                    "definitionProvider": true,
                    "codeActionProvider": true,
                    "completionProvider": {}
                },
                "serverInfo": { "name": "quill", "version": version }
            }
        })
    );
}

#[tokio::test]
async fn full_editing_session() {
    let input = frames(&[
        initialize(1),
        initialized(),
        did_open(URI, 1, "Use VS Code"),
        position_request(2, "textDocument/hover", URI, 0, 5),
        code_action(3, URI),
        position_request(4, "textDocument/completion", URI, 0, 0),
        did_change(URI, 2, &["Neovim\nnothing else"]),
        position_request(5, "textDocument/definition", URI, 1, 3),
        shutdown(6),
        exit(),
    ]);
    let (outcome, replies) = run_session(Dispatcher::default(), &input).await;

    assert_eq!(outcome, ServeOutcome::Exited);
    assert_eq!(replies.len(), 8);

    // initialize
    assert_eq!(replies[0]["id"], 1);

    // didOpen pushes diagnostics for the opened text
    let published = &replies[1];
    assert_eq!(published["method"], "textDocument/publishDiagnostics");
    assert_eq!(published["params"]["uri"], URI);
    assert_eq!(published["params"]["version"], 1);
    insta::assert_snapshot!(
        serde_json::to_string(&published["params"]["diagnostics"]).unwrap(),
        @r#"[{"message":"Please make sure we use a good language","range":{"end":{"character":11,"line":0},"start":{"character":4,"line":0}},"severity":2,"source":"Common Sense"}]"#
    );

    // hover
    assert_eq!(replies[2]["id"], 2);
    assert_eq!(
        replies[2]["result"]["contents"],
        format!("File: {URI}, Characters: 11")
    );

    // codeAction: replace then redact
    assert_eq!(replies[3]["id"], 3);
    let actions = replies[3]["result"].as_array().unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(
        actions[0]["title"],
        "Replace VS C*de with a superior editor"
    );
    assert_eq!(actions[0]["edit"]["changes"][URI][0]["newText"], "Neovim");
    assert_eq!(actions[1]["title"], "Censor VS C*de");
    assert_eq!(actions[1]["edit"]["changes"][URI][0]["newText"], "VS C*de");
    assert_eq!(
        actions[1]["edit"]["changes"][URI][0]["range"],
        json!({
            "start": { "line": 0, "character": 4 },
            "end": { "line": 0, "character": 11 }
        })
    );

    // completion
    assert_eq!(replies[4]["id"], 4);
    assert_eq!(
        replies[4]["result"],
        json!([{
            "label": "Neovim (BTW)",
            "detail": "Very cool editor",
            "documentation": "Way better than VS C*ode"
        }])
    );

    // didChange republishes against the new text
    let republished = &replies[5];
    assert_eq!(republished["params"]["version"], 2);
    let diagnostics = republished["params"]["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["message"], "Great choice :)");

    // definition points one line up, column 0
    assert_eq!(replies[6]["id"], 5);
    assert_eq!(
        replies[6]["result"],
        json!({
            "uri": URI,
            "range": {
                "start": { "line": 0, "character": 0 },
                "end": { "line": 0, "character": 0 }
            }
        })
    );

    // shutdown
    assert_eq!(replies[7], json!({ "jsonrpc": "2.0", "id": 6, "result": null }));
}

#[tokio::test]
async fn string_request_ids_are_echoed() {
    let mut request = shutdown(0);
    request["id"] = json!("abc-1");
    let (_, replies) = run_session(Dispatcher::default(), &frames(&[request])).await;
    assert_eq!(replies[0]["id"], "abc-1");
}

#[tokio::test]
async fn change_for_unopened_document_is_tracked() {
    let input = frames(&[
        did_change(URI, 3, &["VS Code"]),
        position_request(1, "textDocument/hover", URI, 0, 0),
    ]);
    let (_, replies) = run_session(Dispatcher::default(), &input).await;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["params"]["diagnostics"].as_array().unwrap().len(), 1);
    assert_eq!(
        replies[1]["result"]["contents"],
        format!("File: {URI}, Characters: 7")
    );
}

#[tokio::test]
async fn unknown_methods_get_no_reply() {
    let input = frames(&[
        json!({ "jsonrpc": "2.0", "id": 1, "method": "workspace/symbol", "params": {} }),
        json!({ "jsonrpc": "2.0", "method": "$/cancelRequest", "params": { "id": 1 } }),
        shutdown(2),
    ]);
    let (_, replies) = run_session(Dispatcher::default(), &input).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], 2);
}

#[tokio::test]
async fn request_with_bad_params_gets_invalid_params_error() {
    let input = frames(&[
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "textDocument/hover",
            "params": { "position": "nowhere" }
        }),
        shutdown(8),
    ]);
    let (_, replies) = run_session(Dispatcher::default(), &input).await;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["id"], 7);
    assert_eq!(replies[0]["error"]["code"], -32602);
    assert_eq!(replies[1]["id"], 8);
}

#[tokio::test]
async fn hover_on_unknown_document_counts_zero() {
    let input = frames(&[position_request(
        1,
        "textDocument/hover",
        "file:///never-opened.txt",
        0,
        0,
    )]);
    let (_, replies) = run_session(Dispatcher::default(), &input).await;
    assert_eq!(
        replies[0]["result"]["contents"],
        "File: file:///never-opened.txt, Characters: 0"
    );
}
