//! # Session Client Flows
//!
//! End-to-end behaviour of `SessionClient` against the mock broker:
//!
//! 1. **Handshake**: auth_request -> auth_challenge -> EIP-712 auth_verify
//! 2. **Correlation**: signed requests matched to responses by request ID
//! 3. **Notifications**: unsolicited frames routed to subscribers
//! 4. **Resilience**: bounded reconnect backoff, JWT resumption, clean close

#[cfg(test)]
mod tests {
    use crate::integration::mock_broker::{BrokerBehavior, MockBroker};
    use sc_01_rpc_protocol::{EcdsaKeySigner, RpcMethod};
    use sc_02_session_client::{
        AuthState, ClientConfig, ClientError, ClientEvent, MemoryTransport, SessionApi,
        SessionClient,
    };
    use serde_json::{json, Value};
    use shared_types::{
        Address, AppAllocation, AppDefinition, CloseAppSessionRequest, CreateAppSessionRequest,
        GetChannelsRequest,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use tokio::time::timeout;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    struct Harness {
        client: SessionClient,
        broker: MockBroker,
        transport: MemoryTransport,
        wallet: Address,
        participant: Address,
    }

    fn harness(behavior: BrokerBehavior, configure: impl FnOnce(&mut ClientConfig)) -> Harness {
        let identity = EcdsaKeySigner::random();
        let session_key = EcdsaKeySigner::random();
        let wallet = identity.address();
        let participant = session_key.address();

        let mut config = ClientConfig::default();
        config.broker_url = "memory://clearnode".to_string();
        config.auth.app_name = "flow-tests".to_string();
        config.auth.wallet = wallet;
        config.auth.participant = participant;
        configure(&mut config);

        let (broker, transport) = MockBroker::start(behavior);
        let client = SessionClient::new(
            config,
            Arc::new(identity),
            Arc::new(session_key),
            Arc::new(transport.clone()),
        )
        .unwrap();

        Harness {
            client,
            broker,
            transport,
            wallet,
            participant,
        }
    }

    /// Next event matching `pred`, skipping the rest.
    async fn wait_for(
        events: &mut broadcast::Receiver<ClientEvent>,
        pred: impl Fn(&ClientEvent) -> bool,
    ) -> ClientEvent {
        timeout(Duration::from_secs(600), async {
            loop {
                match events.recv().await {
                    Ok(event) if pred(&event) => return event,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("event not observed")
    }

    fn authenticated(event: &ClientEvent) -> bool {
        matches!(event, ClientEvent::Authenticated { .. })
    }

    // =========================================================================
    // HANDSHAKE
    // =========================================================================

    #[tokio::test]
    async fn test_handshake_verifies_typed_signature() {
        let h = harness(BrokerBehavior::default(), |_| {});
        let mut events = h.client.events();

        h.client.connect().await.unwrap();

        assert_eq!(h.client.state().await.unwrap(), AuthState::Authenticated);
        let log = h.broker.log();
        assert_eq!(log.verified_wallets, vec![h.wallet]);

        let auth_request = &log.frames[0];
        assert_eq!(auth_request["request"][1], "auth_request");
        assert_eq!(auth_request["signatures"], json!([""]));
        assert_eq!(auth_request["request"][2][2], "flow-tests");

        let event = wait_for(&mut events, authenticated).await;
        assert_eq!(
            event,
            ClientEvent::Authenticated {
                wallet: h.wallet,
                resumed: false
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_connect_sends_one_auth_request() {
        let h = harness(BrokerBehavior::default(), |_| {});
        let (a, b, c) = tokio::join!(h.client.connect(), h.client.connect(), h.client.connect());
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let log = h.broker.log();
        assert_eq!(log.count_method("auth_request"), 1);
        assert_eq!(log.connections, 1);
        assert_eq!(h.transport.open_attempts(), 1);
    }

    #[tokio::test]
    async fn test_every_challenge_shape_is_answered() {
        let shapes: [fn(&str) -> Value; 4] = [
            |c| json!(c),
            |c| json!({ "challenge": c }),
            |c| json!([c]),
            |c| json!([{ "challenge": c }]),
        ];
        for shape in shapes {
            let h = harness(
                BrokerBehavior {
                    challenge_payload: shape,
                    ..Default::default()
                },
                |_| {},
            );
            h.client.connect().await.unwrap();
            assert_eq!(h.broker.log().verified_wallets, vec![h.wallet]);
        }
    }

    #[tokio::test]
    async fn test_auth_rejection_is_terminal() {
        let h = harness(
            BrokerBehavior {
                reject_auth: Some("unknown application".to_string()),
                ..Default::default()
            },
            |_| {},
        );
        let mut events = h.client.events();

        let err = h.client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::AuthFailed(ref m) if m == "unknown application"));
        assert_eq!(h.client.state().await.unwrap(), AuthState::Failed);

        let event = wait_for(&mut events, |e| matches!(e, ClientEvent::AuthFailed { .. })).await;
        assert!(matches!(
            event,
            ClientEvent::AuthFailed { ref reason } if reason.contains("unknown application")
        ));
        assert_eq!(h.transport.open_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_broker_times_out_auth() {
        let h = harness(
            BrokerBehavior {
                silent_auth: true,
                ..Default::default()
            },
            |_| {},
        );

        let err = h.client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::AuthTimeout(d) if d == Duration::from_secs(15)));
        assert_eq!(h.client.state().await.unwrap(), AuthState::Failed);

        // A failed handshake schedules no reconnect.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.transport.open_attempts(), 1);
    }

    // =========================================================================
    // REQUESTS
    // =========================================================================

    #[tokio::test]
    async fn test_requests_signed_and_correlated() {
        let h = harness(BrokerBehavior::default(), |_| {});
        h.client.connect().await.unwrap();

        assert_eq!(h.client.ping().await.unwrap(), json!([{ "echo": [] }]));
        assert_eq!(
            h.client.get_ledger_balances(&h.wallet).await.unwrap(),
            json!([{ "echo": [{ "participant": h.wallet }] }])
        );
        assert_eq!(
            h.client
                .request(RpcMethod::GetChannels, vec![json!({"status": "open"})], None)
                .await
                .unwrap(),
            json!([{ "echo": [{ "status": "open" }] }])
        );

        let log = h.broker.log();
        assert_eq!(log.bad_signatures, 0);
        assert_eq!(log.count_method("ping"), 1);

        let stats = h.client.stats().await.unwrap();
        assert_eq!(stats.registered, 3);
        assert_eq!(stats.completed, 3);
    }

    #[tokio::test]
    async fn test_broker_error_surfaces_message() {
        let mut behavior = BrokerBehavior::default();
        behavior.fail_methods.insert("get_config".to_string());
        let h = harness(behavior, |_| {});
        h.client.connect().await.unwrap();

        let err = h.client.get_config().await.unwrap_err();
        assert_eq!(err.to_string(), "get_config failed: Something went wrong");
        // The session survives a failed request.
        assert!(h.client.ping().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_request_times_out() {
        let mut behavior = BrokerBehavior::default();
        behavior.ignore_methods.insert("get_channels".to_string());
        let h = harness(behavior, |c| c.requests.timeout = Duration::from_secs(2));
        h.client.connect().await.unwrap();

        let err = h
            .client
            .get_channels(&GetChannelsRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::RequestTimeout { ref method, .. } if method == "get_channels"
        ));
        assert_eq!(h.client.stats().await.unwrap().timed_out, 1);
    }

    #[tokio::test]
    async fn test_app_session_lifecycle() {
        let h = harness(BrokerBehavior::default(), |_| {});
        h.client.connect().await.unwrap();

        let counterparty = Address([0x42; 20]);
        let create = CreateAppSessionRequest {
            definition: AppDefinition {
                protocol: "nitroliterpc".to_string(),
                participants: vec![h.wallet, counterparty],
                weights: vec![100, 0],
                quorum: 100,
                challenge: 86400,
                nonce: 1,
            },
            allocations: vec![AppAllocation {
                participant: h.wallet,
                asset: "usdc".to_string(),
                amount: "10".to_string(),
            }],
        };
        h.client.create_app_session(&create).await.unwrap();

        let reply = h
            .client
            .send_app_message("0xsession".to_string(), json!({"move": "up"}))
            .await
            .unwrap();
        assert_eq!(reply, json!([{ "echo": [{ "move": "up" }] }]));

        let close = CloseAppSessionRequest {
            app_session_id: "0xsession".to_string(),
            allocations: vec![],
        };
        h.client.close_app_session(&close).await.unwrap();

        let log = h.broker.log();
        let message = log
            .frames
            .iter()
            .find(|f| f["request"][1] == "message")
            .unwrap();
        assert_eq!(message["sessionId"], "0xsession");
        let close_frame = log
            .frames
            .iter()
            .find(|f| f["request"][1] == "close_app_session")
            .unwrap();
        // Singly signed; counterparty signatures are gathered elsewhere.
        assert_eq!(close_frame["signatures"].as_array().unwrap().len(), 1);
        assert_eq!(log.bad_signatures, 0);
        assert_ne!(h.participant, h.wallet);
    }

    // =========================================================================
    // NOTIFICATIONS
    // =========================================================================

    #[tokio::test]
    async fn test_notifications_reach_subscribers() {
        let h = harness(BrokerBehavior::default(), |_| {});
        h.client.connect().await.unwrap();

        let mut balance_updates = h.client.subscribe("bu").await.unwrap();
        // Round trip so the subscription is registered before the push.
        h.client.state().await.unwrap();

        h.broker.push("bu", json!([{ "asset": "usdc", "amount": "5" }]));
        h.broker.push("cu", json!([{ "channel_id": "0x01" }]));

        let update = timeout(Duration::from_secs(5), balance_updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(update.is_method("bu"));
        assert_eq!(update.data, Some(json!([{ "asset": "usdc", "amount": "5" }])));
    }

    // =========================================================================
    // RESILIENCE
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_unclean_close() {
        let h = harness(BrokerBehavior::default(), |_| {});
        let mut events = h.client.events();
        h.client.connect().await.unwrap();
        wait_for(&mut events, authenticated).await;

        h.broker.drop_connection(1006);

        let event = wait_for(&mut events, |e| matches!(e, ClientEvent::Disconnected { .. })).await;
        assert!(matches!(event, ClientEvent::Disconnected { clean: false, .. }));
        let event =
            wait_for(&mut events, |e| matches!(e, ClientEvent::ReconnectScheduled { .. })).await;
        assert_eq!(
            event,
            ClientEvent::ReconnectScheduled {
                attempt: 1,
                delay: Duration::from_secs(1)
            }
        );

        wait_for(&mut events, authenticated).await;
        assert_eq!(h.broker.log().connections, 2);
        assert!(h.client.ping().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_gives_up_with_connection_lost() {
        let h = harness(BrokerBehavior::default(), |c| c.reconnect.max_attempts = 2);
        let mut events = h.client.events();
        h.client.connect().await.unwrap();

        h.transport.refuse_next(10);
        h.broker.drop_connection(1006);
        wait_for(&mut events, |e| matches!(e, ClientEvent::ReconnectScheduled { .. })).await;

        // Joins the reconnect in flight and shares its terminal outcome.
        let err = h.client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::ConnectionLost { attempts: 2 }));

        let event =
            wait_for(&mut events, |e| matches!(e, ClientEvent::ConnectionLost { .. })).await;
        assert_eq!(event, ClientEvent::ConnectionLost { attempts: 2 });
        assert_eq!(h.transport.open_attempts(), 3);
        assert_eq!(h.client.state().await.unwrap(), AuthState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_grow_by_factor() {
        let h = harness(BrokerBehavior::default(), |c| c.reconnect.max_attempts = 3);
        let mut events = h.client.events();
        h.client.connect().await.unwrap();

        h.transport.refuse_next(10);
        h.broker.drop_connection(1006);

        let mut delays = Vec::new();
        for _ in 0..3 {
            if let ClientEvent::ReconnectScheduled { delay, .. } =
                wait_for(&mut events, |e| matches!(e, ClientEvent::ReconnectScheduled { .. })).await
            {
                delays.push(delay);
            }
        }
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(1500),
                Duration::from_millis(2250)
            ]
        );
        wait_for(&mut events, |e| matches!(e, ClientEvent::ConnectionLost { .. })).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_jwt_resumes_session_on_reconnect() {
        let h = harness(
            BrokerBehavior {
                issue_jwt: Some("jwt-1".to_string()),
                ..Default::default()
            },
            |_| {},
        );
        let mut events = h.client.events();
        h.client.connect().await.unwrap();
        wait_for(&mut events, authenticated).await;

        h.broker.drop_connection(1001);
        let event = wait_for(&mut events, authenticated).await;
        assert_eq!(
            event,
            ClientEvent::Authenticated {
                wallet: h.wallet,
                resumed: true
            }
        );

        let log = h.broker.log();
        assert_eq!(log.jwt_resumes, 1);
        assert_eq!(log.count_method("auth_request"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_jwt_falls_back_to_challenge() {
        let h = harness(
            BrokerBehavior {
                issue_jwt: Some("jwt-1".to_string()),
                ..Default::default()
            },
            |_| {},
        );
        let mut events = h.client.events();
        h.client.connect().await.unwrap();
        wait_for(&mut events, authenticated).await;

        h.broker.update(|b| b.accept_jwt = false);
        h.broker.drop_connection(1001);
        let event = wait_for(&mut events, authenticated).await;
        assert_eq!(
            event,
            ClientEvent::Authenticated {
                wallet: h.wallet,
                resumed: false
            }
        );

        let log = h.broker.log();
        assert_eq!(log.connections, 2);
        assert_eq!(log.count_method("auth_request"), 2);
        assert_eq!(log.verified_wallets.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_disconnect_does_not_reconnect() {
        let h = harness(BrokerBehavior::default(), |_| {});
        let mut events = h.client.events();
        h.client.connect().await.unwrap();

        h.client.disconnect("user logout").await.unwrap();
        let event = wait_for(&mut events, |e| matches!(e, ClientEvent::Disconnected { .. })).await;
        assert_eq!(
            event,
            ClientEvent::Disconnected {
                reason: "user logout".to_string(),
                clean: true
            }
        );

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(h.broker.log().connections, 1);
        assert_eq!(h.client.state().await.unwrap(), AuthState::Disconnected);
        assert!(matches!(
            h.client.ping().await,
            Err(ClientError::NotAuthenticated)
        ));

        // An explicit connect starts over.
        h.client.connect().await.unwrap();
        assert_eq!(h.broker.log().connections, 2);
    }
}
