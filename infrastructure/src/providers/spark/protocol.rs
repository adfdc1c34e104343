//! Spark wire protocol types
//!
//! One request frame opens the exchange; the answer arrives as a stream
//! of response frames, each carrying a status and a text increment. A
//! status of [`STATUS_FINAL`] marks the last frame. The server never
//! closes the connection itself.

use serde::{Deserialize, Serialize};

/// Conversation marker sent with every request frame. Spark requires a
/// uid but does not correlate requests across connections with it.
const SESSION_UID: &str = "1234";

/// Choices status value marking the final frame of an answer
pub const STATUS_FINAL: i32 = 2;

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub header: RequestHeader,
    pub parameter: Parameter,
    pub payload: RequestPayload,
}

#[derive(Debug, Serialize)]
pub struct RequestHeader {
    pub app_id: String,
    pub uid: String,
}

#[derive(Debug, Serialize)]
pub struct Parameter {
    pub chat: ChatParameter,
}

#[derive(Debug, Serialize)]
pub struct ChatParameter {
    pub domain: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct RequestPayload {
    pub message: MessageBlock,
}

#[derive(Debug, Serialize)]
pub struct MessageBlock {
    pub text: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl ChatRequest {
    /// Build the single-turn request frame for one question
    pub fn single_turn(
        app_id: &str,
        domain: &str,
        temperature: f64,
        max_tokens: u32,
        query: &str,
    ) -> Self {
        Self {
            header: RequestHeader {
                app_id: app_id.to_string(),
                uid: SESSION_UID.to_string(),
            },
            parameter: Parameter {
                chat: ChatParameter {
                    domain: domain.to_string(),
                    temperature,
                    max_tokens,
                },
            },
            payload: RequestPayload {
                message: MessageBlock {
                    text: vec![Turn {
                        role: "user".to_string(),
                        content: query.to_string(),
                    }],
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub header: ResponseHeader,
    #[serde(default)]
    pub payload: Option<ResponsePayload>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseHeader {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePayload {
    pub choices: Choices,
}

#[derive(Debug, Deserialize)]
pub struct Choices {
    pub status: i32,
    #[serde(default)]
    pub text: Vec<TextChunk>,
}

#[derive(Debug, Deserialize)]
pub struct TextChunk {
    #[serde(default)]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame_shape() {
        let request = ChatRequest::single_turn("app-1", "general-v4", 0.5, 4096, "hello");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["header"]["app_id"], "app-1");
        assert_eq!(json["parameter"]["chat"]["domain"], "general-v4");
        assert_eq!(json["parameter"]["chat"]["max_tokens"], 4096);
        assert_eq!(json["payload"]["message"]["text"][0]["role"], "user");
        assert_eq!(json["payload"]["message"]["text"][0]["content"], "hello");
    }

    #[test]
    fn test_streaming_frame_parses() {
        let frame = r#"{
            "header": {"code": 0, "message": "Success"},
            "payload": {"choices": {"status": 1, "text": [{"content": "Hel"}, {"content": "lo"}]}}
        }"#;
        let response: ChatResponse = serde_json::from_str(frame).unwrap();
        assert_eq!(response.header.code, 0);
        let choices = response.payload.unwrap().choices;
        assert_eq!(choices.status, 1);
        assert_eq!(choices.text.len(), 2);
    }

    #[test]
    fn test_error_frame_parses_without_payload() {
        let frame = r#"{"header": {"code": 10163, "message": "invalid parameter"}}"#;
        let response: ChatResponse = serde_json::from_str(frame).unwrap();
        assert_eq!(response.header.code, 10163);
        assert!(response.payload.is_none());
    }
}
