//! Bearer-HTTP client tests against a local mock endpoint

use polyask_application::{ChatProvider, ProviderError};
use polyask_domain::Provider;
use polyask_infrastructure::{OpenAiCompatClient, OpenAiCompatConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve exactly one HTTP request with a canned response. Reads the full
/// request (headers plus content-length body) before answering so the
/// client never sees a broken pipe.
async fn spawn_mock_endpoint(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
        let content_length: usize = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);
        while request.len() < header_end + content_length {
            let n = stream.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
    });

    format!("http://{}/v1/chat/completions", addr)
}

fn client_for(provider: Provider, api_url: String) -> OpenAiCompatClient {
    OpenAiCompatClient::new(
        provider,
        OpenAiCompatConfig {
            api_key: "test-key".to_string(),
            api_url,
            model: "test-model".to_string(),
        },
        reqwest::Client::new(),
    )
}

#[tokio::test]
async fn well_formed_response_yields_exact_content() {
    let url = spawn_mock_endpoint(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#,
    )
    .await;

    let answer = client_for(Provider::Qianfan, url).ask("hello").await.unwrap();
    assert_eq!(answer, "hi");
}

#[tokio::test]
async fn server_error_becomes_descriptive_protocol_error() {
    let url = spawn_mock_endpoint("500 Internal Server Error", r#"{"error":"boom"}"#).await;

    let err = client_for(Provider::Doubao, url).ask("hello").await.unwrap_err();
    match err {
        ProviderError::Protocol { code, message } => {
            assert_eq!(code, 500);
            assert!(message.contains("boom"));
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_choices_is_an_unexpected_format_error() {
    let url = spawn_mock_endpoint("200 OK", r#"{"id":"resp-1"}"#).await;

    let err = client_for(Provider::Qianfan, url).ask("hello").await.unwrap_err();
    assert!(matches!(err, ProviderError::UnexpectedFormat(_)));
}

#[tokio::test]
async fn non_json_body_is_an_unexpected_format_error() {
    let url = spawn_mock_endpoint("200 OK", "<html>gateway error</html>").await;

    let err = client_for(Provider::Doubao, url).ask("hello").await.unwrap_err();
    assert!(matches!(err, ProviderError::UnexpectedFormat(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(Provider::Qianfan, format!("http://{}/v1/chat", addr))
        .ask("hello")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
}
