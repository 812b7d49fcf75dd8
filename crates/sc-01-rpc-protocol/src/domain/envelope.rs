//! # Envelope Codec
//!
//! The unit of wire transmission. Exactly one of:
//!
//! ```text
//! Request:  {"request":[id, method, params, ts], "signatures":[sig, ...]}
//! Response: {"response":[id, method, payload, ts], "signatures"?:[...], "sessionId"?:hex}
//! ```
//!
//! The payload tuple, never the whole envelope, is what gets signed, so the
//! `signatures` field is never part of its own signing input.

use super::errors::{ProtocolError, ProtocolResult};
use super::ids::{generate_request_id, now_ms};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use shared_types::{RequestId, SessionId, Timestamp};

// =============================================================================
// PAYLOAD TUPLES
// =============================================================================

/// The `[requestId, method, params, timestamp]` tuple of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcPayload {
    pub request_id: RequestId,
    pub method: String,
    pub params: Vec<Value>,
    pub timestamp: Timestamp,
}

impl Serialize for RpcPayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.request_id, &self.method, &self.params, self.timestamp).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RpcPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (request_id, method, params, timestamp) =
            <(RequestId, String, Vec<Value>, Timestamp)>::deserialize(deserializer)?;
        Ok(Self {
            request_id,
            method,
            params,
            timestamp,
        })
    }
}

/// The `[requestId, method, resultOrError, timestamp]` tuple of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePayload {
    pub request_id: RequestId,
    pub method: String,
    pub result: Value,
    pub timestamp: Timestamp,
}

impl Serialize for ResponsePayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.request_id, &self.method, &self.result, self.timestamp).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResponsePayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (request_id, method, result, timestamp) =
            <(RequestId, String, Value, Timestamp)>::deserialize(deserializer)?;
        Ok(Self {
            request_id,
            method,
            result,
            timestamp,
        })
    }
}

// =============================================================================
// ENVELOPES
// =============================================================================

/// Outbound request envelope.
///
/// `signatures` is omitted from the wire while empty; once signed it is only
/// ever appended to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub request: RpcPayload,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<String>,
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl RequestEnvelope {
    /// Request ID of the payload tuple.
    pub fn request_id(&self) -> RequestId {
        self.request.request_id
    }

    /// Method name of the payload tuple.
    pub fn method(&self) -> &str {
        &self.request.method
    }

    /// The signable payload as a JSON value.
    pub fn payload_value(&self) -> ProtocolResult<Value> {
        Ok(serde_json::to_value(&self.request)?)
    }

    /// Serialize for transmission.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound (or mock-broker outbound) response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub response: ResponsePayload,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<String>,
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl ResponseEnvelope {
    /// Successful response carrying `result` as its payload.
    pub fn new(
        request_id: RequestId,
        method: impl Into<String>,
        result: Value,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            response: ResponsePayload {
                request_id,
                method: method.into(),
                result,
                timestamp,
            },
            signatures: Vec::new(),
            session_id: None,
        }
    }

    /// `error` response in the `[{"error": message}]` shape.
    pub fn error(request_id: RequestId, message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(
            request_id,
            "error",
            Value::Array(vec![serde_json::json!({ "error": message.into() })]),
            timestamp,
        )
    }

    /// Stamp the session/topic identifier.
    pub fn with_session(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// The signable payload as a JSON value.
    pub fn payload_value(&self) -> ProtocolResult<Value> {
        Ok(serde_json::to_value(&self.response)?)
    }

    /// Serialize for transmission.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Either kind of envelope, decoded with the exactly-one-payload rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Request(RequestEnvelope),
    Response(ResponseEnvelope),
}

impl Envelope {
    /// Decode from a JSON value, rejecting envelopes with zero or two payloads.
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        let has_request = value.get("request").is_some();
        let has_response = value.get("response").is_some();
        match (has_request, has_response) {
            (true, true) => Err(ProtocolError::AmbiguousEnvelope),
            (false, false) => Err(ProtocolError::MissingPayload),
            (true, false) => Ok(Envelope::Request(serde_json::from_value(value)?)),
            (false, true) => Ok(Envelope::Response(serde_json::from_value(value)?)),
        }
    }

    /// Decode from JSON text.
    pub fn from_json(text: &str) -> ProtocolResult<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// The signable payload tuple (request if present, else response).
    pub fn payload_value(&self) -> ProtocolResult<Value> {
        match self {
            Envelope::Request(req) => req.payload_value(),
            Envelope::Response(res) => res.payload_value(),
        }
    }

    pub fn signatures(&self) -> &[String] {
        match self {
            Envelope::Request(req) => &req.signatures,
            Envelope::Response(res) => &res.signatures,
        }
    }
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

/// Build a request envelope, defaulting the ID to a fresh one and the
/// timestamp to the current time.
pub fn create_request(
    request_id: Option<RequestId>,
    method: impl Into<String>,
    params: Vec<Value>,
    timestamp: Option<Timestamp>,
) -> RequestEnvelope {
    RequestEnvelope {
        request: RpcPayload {
            request_id: request_id.unwrap_or_else(generate_request_id),
            method: method.into(),
            params,
            timestamp: timestamp.unwrap_or_else(now_ms),
        },
        signatures: Vec::new(),
        session_id: None,
    }
}

/// Like [`create_request`], stamped with a session/topic identifier.
pub fn create_session_request(
    request_id: Option<RequestId>,
    method: impl Into<String>,
    params: Vec<Value>,
    timestamp: Option<Timestamp>,
    session_id: impl Into<SessionId>,
) -> RequestEnvelope {
    let mut envelope = create_request(request_id, method, params, timestamp);
    envelope.session_id = Some(session_id.into());
    envelope
}

/// Extract the signable payload from a raw envelope: the `request` tuple if
/// present, else the `response` tuple.
pub fn signable_payload(envelope: &Value) -> ProtocolResult<&Value> {
    envelope
        .get("request")
        .or_else(|| envelope.get("response"))
        .ok_or(ProtocolError::MissingPayload)
}
