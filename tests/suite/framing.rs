//! Byte-stream framing behavior as seen by a client

use quill_lsp::{Dispatcher, LspServer, ServeOutcome};

use crate::common::{URI, did_open, exit, frames, read_replies, run_session, shutdown};

#[tokio::test]
async fn malformed_frames_are_skipped() {
    let mut input = Vec::new();
    // Header without Content-Length.
    input.extend(b"Content-Type: application/json\r\n\r\n");
    // Body that is not JSON.
    input.extend(b"Content-Length: 9\r\n\r\nnot json!");
    // Header that is not UTF-8.
    input.extend(b"X-Junk: \xff\xfe\r\n\r\n");
    // JSON without a method.
    input.extend(b"Content-Length: 2\r\n\r\n{}");
    input.extend(frames(&[shutdown(1), exit()]));

    let (outcome, replies) = run_session(Dispatcher::default(), &input).await;

    assert_eq!(outcome, ServeOutcome::Exited);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], 1);
}

#[tokio::test]
async fn multibyte_text_uses_byte_lengths_and_utf16_columns() {
    let input = frames(&[did_open(URI, 1, "😀 VS Code é")]);
    let (_, replies) = run_session(Dispatcher::default(), &input).await;

    let range = &replies[0]["params"]["diagnostics"][0]["range"];
    assert_eq!(range["start"]["character"], 3);
    assert_eq!(range["end"]["character"], 10);
}

#[tokio::test]
async fn frames_split_across_reads_are_reassembled() {
    let input = frames(&[did_open(URI, 1, "VS Code"), shutdown(2)]);
    let (client, server_end) = tokio::io::duplex(7);

    let feeder = tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;

        let mut client = client;
        for chunk in input.chunks(5) {
            client.write_all(chunk).await.unwrap();
        }
        client.shutdown().await.unwrap();
        client
    });

    let mut output = Vec::new();
    let mut server = LspServer::new(Dispatcher::default());
    let outcome = server.serve(server_end, &mut output).await.unwrap();
    drop(feeder.await.unwrap());

    assert_eq!(outcome, ServeOutcome::InputClosed);
    let replies = read_replies(&output);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["method"], "textDocument/publishDiagnostics");
    assert_eq!(replies[1]["id"], 2);
}

#[tokio::test]
async fn truncated_stream_is_an_error() {
    let input = frames(&[shutdown(1)]);
    let truncated = &input[..input.len() - 3];

    let mut output = Vec::new();
    let mut server = LspServer::new(Dispatcher::default());
    assert!(server.serve(truncated, &mut output).await.is_err());
}
