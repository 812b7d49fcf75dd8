//! # Protocol Flows
//!
//! The codec, builders and verifiers composed the way a broker-side peer
//! would use them: build and sign with the local key adapter, parse the wire
//! text back, verify single and quorum signatures.

#[cfg(test)]
mod tests {
    use sc_01_rpc_protocol::{
        parse_response, sign_request, verify_multiple, verify_single, EcdsaKeySigner,
        EcdsaVerifier, Envelope, MessageSigner, QuorumPolicy, QuorumVerifier, RequestOptions,
        ResponseEnvelope, RpcBuilders,
    };
    use serde_json::{json, Value};
    use shared_types::{Address, AuthRequestParams, CloseAppSessionRequest};
    use std::sync::Arc;

    fn builders(identity: &EcdsaKeySigner, session_key: &EcdsaKeySigner) -> RpcBuilders {
        RpcBuilders::new(
            Arc::new(identity.clone()),
            Arc::new(session_key.clone()),
            AuthRequestParams {
                wallet: identity.address(),
                participant: session_key.address(),
                app_name: "protocol-flows".to_string(),
                allowances: vec![],
                expire: None,
                scope: None,
                application: None,
            },
        )
    }

    #[tokio::test]
    async fn test_built_request_verifies_against_session_key() {
        let identity = EcdsaKeySigner::random();
        let session_key = EcdsaKeySigner::random();
        let rpc = builders(&identity, &session_key);

        let text = rpc
            .ledger
            .get_ledger_balances(&identity.address(), RequestOptions::with_id(7))
            .await
            .unwrap();
        let envelope = Envelope::from_json(&text).unwrap();

        let verifier = EcdsaVerifier::new();
        assert!(verify_single(&envelope, &session_key.address(), &verifier));
        assert!(!verify_single(&envelope, &identity.address(), &verifier));
    }

    #[tokio::test]
    async fn test_tampered_payload_fails_closed() {
        let session_key = EcdsaKeySigner::random();
        let text = builders(&EcdsaKeySigner::random(), &session_key)
            .ledger
            .ping(RequestOptions::with_id(1).at(2))
            .await
            .unwrap();

        let mut raw: Value = serde_json::from_str(&text).unwrap();
        raw["request"][0] = json!(999);
        assert!(!verify_single(&raw, &session_key.address(), &EcdsaVerifier::new()));

        raw["signatures"] = json!(["0xnot-a-signature"]);
        assert!(!verify_single(&raw, &session_key.address(), &EcdsaVerifier::new()));
    }

    #[tokio::test]
    async fn test_close_gathers_quorum_externally() {
        let (alice, bob) = (EcdsaKeySigner::random(), EcdsaKeySigner::random());
        let text = builders(&EcdsaKeySigner::random(), &alice)
            .app_session
            .close_app_session(
                &CloseAppSessionRequest {
                    app_session_id: "0xabc".to_string(),
                    allocations: vec![],
                },
                RequestOptions::with_id(11).at(12),
            )
            .await
            .unwrap();
        let mut raw: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw["signatures"].as_array().unwrap().len(), 1);

        let policy =
            QuorumPolicy::new(vec![alice.address(), bob.address()], vec![50, 50], 100, false)
                .unwrap();
        let verifier = QuorumVerifier::new(policy);
        assert!(!verify_multiple(&raw, &[], &verifier));

        // The counterparty co-signs the same payload tuple.
        let bob_sig = bob.sign_payload(&raw["request"]).await.unwrap();
        raw["signatures"].as_array_mut().unwrap().push(json!(bob_sig));
        assert!(verify_multiple(&raw, &[], &verifier));
    }

    #[tokio::test]
    async fn test_broker_signed_response() {
        let broker = EcdsaKeySigner::random();
        let mut response = ResponseEnvelope::new(5, "get_config", json!([{"network": 1}]), 6);
        let payload = response.payload_value().unwrap();
        response.signatures = vec![broker.sign_payload(&payload).await.unwrap()];

        let text = response.to_json().unwrap();
        let parsed = parse_response(text.as_str());
        assert!(parsed.is_method("get_config"));
        assert_eq!(parsed.request_id, Some(5));

        let verifier = EcdsaVerifier::new();
        assert!(sc_01_rpc_protocol::verify_response_signer(
            &response,
            &broker.address(),
            &verifier
        ));
        assert!(!sc_01_rpc_protocol::verify_response_signer(
            &response,
            &Address::ZERO,
            &verifier
        ));
    }

    #[tokio::test]
    async fn test_resigned_envelope_carries_one_signature() {
        let a = EcdsaKeySigner::random();
        let b = EcdsaKeySigner::random();
        let envelope = sc_01_rpc_protocol::create_request(Some(1), "ping", vec![], Some(1));
        let envelope = sign_request(envelope, &a).await.unwrap();
        let envelope = sign_request(envelope, &b).await.unwrap();
        assert_eq!(envelope.signatures.len(), 1);
        assert!(verify_single(&envelope, &b.address(), &EcdsaVerifier::new()));
    }
}
