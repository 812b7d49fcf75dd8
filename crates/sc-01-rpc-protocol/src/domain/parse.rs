//! # Defensive Response Parsing
//!
//! Inbound frames are untrusted. [`parse_response`] never panics and never
//! returns `Err`: every failure is reported as data with `is_valid == false`.
//!
//! Validation order:
//! 1. JSON text is parsed (`"Message parsing failed"` on failure).
//! 2. `response` must be a 4-element array. This is checked before `sessionId`
//!    is read.
//! 3. `[requestId, method, payload, timestamp]` must be number, string,
//!    array, number. Partially extracted fields are still returned.
//! 4. `error` responses must carry `[{"error": string}]`; `data` is then the
//!    inner object.

use serde::Serialize;
use serde_json::Value;
use shared_types::{RequestId, SessionId, Timestamp};

pub const ERR_PARSE_FAILED: &str = "Message parsing failed";
pub const ERR_INVALID_STRUCTURE: &str = "Invalid message structure: Missing or invalid 'res' array.";
pub const ERR_INVALID_PAYLOAD: &str = "Invalid 'res' payload structure or types.";
pub const ERR_MALFORMED_ERROR: &str = "Malformed error response payload.";

/// Result of [`parse_response`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl ParsedResponse {
    fn invalid(error: &str) -> Self {
        Self {
            is_valid: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// The broker's error string, for valid `error` responses.
    pub fn error_message(&self) -> Option<&str> {
        if !self.is_error {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| d.get("error"))
            .and_then(Value::as_str)
    }

    /// True for a valid, non-error response with the given method.
    pub fn is_method(&self, method: &str) -> bool {
        self.is_valid && self.method.as_deref() == Some(method)
    }
}

/// Raw inbound message: text straight off the socket, or an already decoded value.
#[derive(Debug, Clone, Copy)]
pub enum RawMessage<'a> {
    Text(&'a str),
    Json(&'a Value),
}

impl<'a> From<&'a str> for RawMessage<'a> {
    fn from(text: &'a str) -> Self {
        RawMessage::Text(text)
    }
}

impl<'a> From<&'a String> for RawMessage<'a> {
    fn from(text: &'a String) -> Self {
        RawMessage::Text(text.as_str())
    }
}

impl<'a> From<&'a Value> for RawMessage<'a> {
    fn from(value: &'a Value) -> Self {
        RawMessage::Json(value)
    }
}

/// Parse and validate an inbound response envelope.
pub fn parse_response<'a>(raw: impl Into<RawMessage<'a>>) -> ParsedResponse {
    match raw.into() {
        RawMessage::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => parse_value(&value),
            Err(_) => ParsedResponse::invalid(ERR_PARSE_FAILED),
        },
        RawMessage::Json(value) => parse_value(value),
    }
}

fn parse_value(value: &Value) -> ParsedResponse {
    let tuple = match value.get("response").and_then(Value::as_array) {
        Some(tuple) if tuple.len() == 4 => tuple,
        _ => return ParsedResponse::invalid(ERR_INVALID_STRUCTURE),
    };

    let request_id = tuple[0].as_u64();
    let method = tuple[1].as_str().map(str::to_string);
    let payload = tuple[2].as_array();
    let timestamp = tuple[3].as_u64();
    let session_id = value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string);

    let partial = ParsedResponse {
        is_valid: false,
        request_id,
        method: method.clone(),
        session_id,
        timestamp,
        ..Default::default()
    };

    let (Some(_), Some(method), Some(payload), Some(_)) = (request_id, method, payload, timestamp)
    else {
        return ParsedResponse {
            error: Some(ERR_INVALID_PAYLOAD.to_string()),
            ..partial
        };
    };

    if method == "error" {
        let detail = match payload.as_slice() {
            [detail] if detail.get("error").map(Value::is_string).unwrap_or(false) => detail,
            _ => {
                return ParsedResponse {
                    error: Some(ERR_MALFORMED_ERROR.to_string()),
                    ..partial
                }
            }
        };
        return ParsedResponse {
            is_valid: true,
            is_error: true,
            data: Some(detail.clone()),
            ..partial
        };
    }

    ParsedResponse {
        is_valid: true,
        data: Some(Value::Array(payload.clone())),
        ..partial
    }
}
