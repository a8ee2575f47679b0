//! Shared test utilities and fixtures
//!
//! Helpers for driving a whole server session over in-memory streams.

#![allow(dead_code)]

use quill_lsp::{Dispatcher, LspServer, ServeOutcome, codec};
use serde_json::{Value, json};

pub const URI: &str = "file:///workspace/notes.txt";

/// Encode each message as a Content-Length frame and concatenate them.
pub fn frames(messages: &[Value]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for message in messages {
        bytes.extend(codec::encode(message).unwrap().into_bytes());
    }
    bytes
}

/// Split everything the server wrote back into decoded JSON bodies.
pub fn read_replies(output: &[u8]) -> Vec<Value> {
    let mut replies = Vec::new();
    let mut rest = std::str::from_utf8(output).unwrap();
    while !rest.is_empty() {
        let (header, after) = rest.split_once("\r\n\r\n").unwrap();
        let len: usize = header
            .strip_prefix("Content-Length: ")
            .unwrap()
            .parse()
            .unwrap();
        replies.push(serde_json::from_str(&after[..len]).unwrap());
        rest = &after[len..];
    }
    replies
}

/// Feed `input` to a server built around `dispatcher` and collect its output.
pub async fn run_session(dispatcher: Dispatcher, input: &[u8]) -> (ServeOutcome, Vec<Value>) {
    let mut output = Vec::new();
    let mut server = LspServer::new(dispatcher);
    let outcome = server.serve(input, &mut output).await.unwrap();
    (outcome, read_replies(&output))
}

pub fn initialize(id: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "processId": null,
            "clientInfo": { "name": "test-editor", "version": "0.1" },
            "capabilities": {}
        }
    })
}

pub fn initialized() -> Value {
    json!({ "jsonrpc": "2.0", "method": "initialized", "params": {} })
}

pub fn did_open(uri: &str, version: i32, text: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didOpen",
        "params": {
            "textDocument": { "uri": uri, "languageId": "plaintext", "version": version, "text": text }
        }
    })
}

pub fn did_change(uri: &str, version: i32, texts: &[&str]) -> Value {
    let changes: Vec<Value> = texts.iter().map(|text| json!({ "text": text })).collect();
    json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didChange",
        "params": {
            "textDocument": { "uri": uri, "version": version },
            "contentChanges": changes
        }
    })
}

pub fn position_request(id: i64, method: &str, uri: &str, line: u32, character: u32) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": {
            "textDocument": { "uri": uri },
            "position": { "line": line, "character": character }
        }
    })
}

pub fn code_action(id: i64, uri: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "textDocument/codeAction",
        "params": {
            "textDocument": { "uri": uri },
            "range": {
                "start": { "line": 0, "character": 0 },
                "end": { "line": 0, "character": 0 }
            },
            "context": { "diagnostics": [] }
        }
    })
}

pub fn shutdown(id: i64) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": "shutdown" })
}

pub fn exit() -> Value {
    json!({ "jsonrpc": "2.0", "method": "exit" })
}
