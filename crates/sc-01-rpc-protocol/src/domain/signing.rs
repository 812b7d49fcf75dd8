//! # Signing & Verification
//!
//! Signing attaches exactly one signature over the payload tuple. Verification
//! fails closed: any verifier error becomes `false` and is logged, never
//! propagated.

use super::envelope::{Envelope, RequestEnvelope, ResponseEnvelope};
use super::errors::{ProtocolError, ProtocolResult};
use crate::ports::outbound::{MessageSigner, MessageVerifier};
use serde_json::Value;
use shared_types::Address;
use tracing::{debug, warn};

/// Anything carrying a signable payload tuple and a signature list.
pub trait SignedEnvelope {
    /// The `request` tuple if present, else the `response` tuple.
    fn signable_payload(&self) -> Option<Value>;

    /// The signatures, or `None` when the field is absent or not a list of strings.
    fn signature_list(&self) -> Option<Vec<String>>;
}

impl SignedEnvelope for RequestEnvelope {
    fn signable_payload(&self) -> Option<Value> {
        self.payload_value().ok()
    }

    fn signature_list(&self) -> Option<Vec<String>> {
        (!self.signatures.is_empty()).then(|| self.signatures.clone())
    }
}

impl SignedEnvelope for ResponseEnvelope {
    fn signable_payload(&self) -> Option<Value> {
        self.payload_value().ok()
    }

    fn signature_list(&self) -> Option<Vec<String>> {
        (!self.signatures.is_empty()).then(|| self.signatures.clone())
    }
}

impl SignedEnvelope for Envelope {
    fn signable_payload(&self) -> Option<Value> {
        self.payload_value().ok()
    }

    fn signature_list(&self) -> Option<Vec<String>> {
        let signatures = self.signatures();
        (!signatures.is_empty()).then(|| signatures.to_vec())
    }
}

impl SignedEnvelope for Value {
    fn signable_payload(&self) -> Option<Value> {
        super::envelope::signable_payload(self).ok().cloned()
    }

    fn signature_list(&self) -> Option<Vec<String>> {
        self.get("signatures")?
            .as_array()?
            .iter()
            .map(|s| s.as_str().map(str::to_string))
            .collect()
    }
}

// =============================================================================
// SIGNING
// =============================================================================

/// Sign a request envelope, replacing its signatures with the single new one.
///
/// Takes the envelope by value and hands the same envelope back signed, so no
/// half-signed alias can be observed by the caller.
pub async fn sign_request(
    mut envelope: RequestEnvelope,
    signer: &dyn MessageSigner,
) -> ProtocolResult<RequestEnvelope> {
    let payload = envelope.payload_value()?;
    let signature = signer.sign_payload(&payload).await?;
    envelope.signatures = vec![signature];
    debug!(
        request_id = envelope.request_id(),
        method = envelope.method(),
        "request signed"
    );
    Ok(envelope)
}

/// Sign a decoded envelope. Responses are rejected.
pub async fn sign_envelope(
    envelope: Envelope,
    signer: &dyn MessageSigner,
) -> ProtocolResult<RequestEnvelope> {
    match envelope {
        Envelope::Request(request) => sign_request(request, signer).await,
        Envelope::Response(_) => Err(ProtocolError::NotARequest),
    }
}

/// Sign a raw JSON envelope in place of its `signatures` field.
pub async fn sign_raw(mut envelope: Value, signer: &dyn MessageSigner) -> ProtocolResult<Value> {
    let payload = envelope
        .get("request")
        .cloned()
        .ok_or(ProtocolError::NotARequest)?;
    let signature = signer.sign_payload(&payload).await?;
    match envelope.as_object_mut() {
        Some(object) => {
            object.insert("signatures".to_string(), Value::from(vec![signature]));
            Ok(envelope)
        }
        None => Err(ProtocolError::NotARequest),
    }
}

// =============================================================================
// VERIFICATION
// =============================================================================

/// Verify the first signature of `envelope` against `expected`.
///
/// When more than one signature is present only the first is checked, and a
/// warning is logged.
pub fn verify_single<E>(envelope: &E, expected: &Address, verifier: &dyn MessageVerifier) -> bool
where
    E: SignedEnvelope + ?Sized,
{
    let Some(signatures) = envelope.signature_list() else {
        return false;
    };
    let Some(first) = signatures.first() else {
        return false;
    };
    if signatures.len() > 1 {
        warn!(
            count = signatures.len(),
            "multiple signatures present, verifying only the first"
        );
    }
    let Some(payload) = envelope.signable_payload() else {
        warn!("envelope has no signable payload");
        return false;
    };

    match verifier.verify(&payload, first, expected) {
        Ok(valid) => valid,
        Err(e) => {
            warn!(error = %e, signer = %expected, "signature verification error");
            false
        }
    }
}

/// Verify the full signature set against the full expected-signer set.
///
/// Quorum semantics belong to `verifier`.
pub fn verify_multiple<E>(
    envelope: &E,
    expected: &[Address],
    verifier: &dyn MessageVerifier,
) -> bool
where
    E: SignedEnvelope + ?Sized,
{
    let Some(signatures) = envelope.signature_list() else {
        return false;
    };
    let Some(payload) = envelope.signable_payload() else {
        warn!("envelope has no signable payload");
        return false;
    };

    match verifier.verify_multiple(&payload, &signatures, expected) {
        Ok(valid) => valid,
        Err(e) => {
            warn!(error = %e, signers = expected.len(), "multi-signature verification error");
            false
        }
    }
}

/// Check the broker's signature on an inbound response.
pub fn verify_response_signer(
    envelope: &ResponseEnvelope,
    broker: &Address,
    verifier: &dyn MessageVerifier,
) -> bool {
    verify_single(envelope, broker, verifier)
}
