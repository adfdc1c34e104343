//! Spark client tests against a local mock WebSocket server

use futures_util::{SinkExt, StreamExt};
use polyask_application::{ChatProvider, ProviderError};
use polyask_domain::Provider;
use polyask_infrastructure::{SparkClient, SparkConfig};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

enum ServerEnd {
    /// Stop sending and wait for the client to close
    AwaitClientClose,
    /// Close the connection from the server side
    CloseEarly,
}

/// Serve one WebSocket connection: read the request frame, send the
/// scripted frames, then finish per `end`. Returns the ws:// URL.
async fn spawn_mock_spark(frames: Vec<&'static str>, end: ServerEnd) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        // The client speaks first with its request frame
        let request = ws.next().await.unwrap().unwrap();
        assert!(request.is_text());

        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }

        match end {
            ServerEnd::AwaitClientClose => {
                while let Some(Ok(message)) = ws.next().await {
                    if message.is_close() {
                        break;
                    }
                }
            }
            ServerEnd::CloseEarly => {
                ws.close(None).await.unwrap();
            }
        }
    });

    format!("ws://{}/v4.0/chat", addr)
}

fn client_for(ws_url: String) -> SparkClient {
    SparkClient::new(SparkConfig {
        app_id: "test-app".to_string(),
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
        ws_url,
        domain: "4.0Ultra".to_string(),
        temperature: 0.5,
        max_tokens: 4096,
    })
}

#[tokio::test]
async fn terminal_frame_yields_answer_and_client_closes() {
    let url = spawn_mock_spark(
        vec![
            r#"{"header":{"code":0},"payload":{"choices":{"status":2,"text":[{"content":"done"}]}}}"#,
        ],
        ServerEnd::AwaitClientClose,
    )
    .await;

    let client = client_for(url);
    assert_eq!(client.provider(), Provider::Spark);
    let answer = client.ask("ping").await.unwrap();
    assert_eq!(answer, "done");
}

#[tokio::test]
async fn streamed_chunks_accumulate_in_order() {
    let url = spawn_mock_spark(
        vec![
            r#"{"header":{"code":0},"payload":{"choices":{"status":0,"text":[{"content":"Hel"}]}}}"#,
            r#"{"header":{"code":0},"payload":{"choices":{"status":1,"text":[{"content":"lo"}]}}}"#,
            r#"{"header":{"code":0},"payload":{"choices":{"status":2,"text":[{"content":"!"}]}}}"#,
        ],
        ServerEnd::AwaitClientClose,
    )
    .await;

    let answer = client_for(url).ask("ping").await.unwrap();
    assert_eq!(answer, "Hello!");
}

#[tokio::test]
async fn error_code_frame_surfaces_protocol_error() {
    let url = spawn_mock_spark(
        vec![r#"{"header":{"code":10163,"message":"invalid parameter"}}"#],
        ServerEnd::AwaitClientClose,
    )
    .await;

    let err = client_for(url).ask("ping").await.unwrap_err();
    match err {
        ProviderError::Protocol { code, message } => {
            assert_eq!(code, 10163);
            assert_eq!(message, "invalid parameter");
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn close_before_terminal_returns_partial_answer() {
    let url = spawn_mock_spark(
        vec![
            r#"{"header":{"code":0},"payload":{"choices":{"status":1,"text":[{"content":"partial"}]}}}"#,
        ],
        ServerEnd::CloseEarly,
    )
    .await;

    let answer = client_for(url).ask("ping").await.unwrap();
    assert_eq!(answer, "partial");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Port from an immediately dropped listener: nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(format!("ws://{}/v4.0/chat", addr))
        .ask("ping")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
}
