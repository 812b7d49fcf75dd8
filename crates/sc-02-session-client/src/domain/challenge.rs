//! Decoding of the `auth_challenge` payload.
//!
//! Brokers have shipped four shapes, each either bare or as the first
//! element of an array:
//!
//! ```text
//! "c"                          ["c"]
//! {"challenge": "c"}           [{"challenge": "c"}]
//! {"challenge_message": "c"}   [{"challenge_message": "c"}]
//! ```

use super::error::ClientError;
use serde_json::{Map, Value};

/// One candidate element: the payload itself or its first array item.
enum ChallengeElement<'a> {
    Bare(&'a str),
    Object(&'a Map<String, Value>),
    Other,
}

impl<'a> ChallengeElement<'a> {
    fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(s) => ChallengeElement::Bare(s),
            Value::Object(map) => ChallengeElement::Object(map),
            _ => ChallengeElement::Other,
        }
    }

    /// `challenge` wins over `challenge_message`; non-strings and `""` count as absent.
    fn challenge(&self) -> Option<&'a str> {
        let non_empty = |s: &'a str| Some(s).filter(|s| !s.is_empty());
        match self {
            ChallengeElement::Bare(s) => non_empty(s),
            ChallengeElement::Object(map) => ["challenge", "challenge_message"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str).and_then(non_empty)),
            ChallengeElement::Other => None,
        }
    }
}

/// Extract the challenge string from an `auth_challenge` payload.
pub fn decode_challenge(payload: &Value) -> Result<String, ClientError> {
    let element = match payload {
        Value::Array(items) => items
            .first()
            .map_or(ChallengeElement::Other, ChallengeElement::classify),
        other => ChallengeElement::classify(other),
    };

    element
        .challenge()
        .map(str::to_string)
        .ok_or(ClientError::ChallengeNotFound)
}
