//! # Mock Broker
//!
//! Speaks the broker side of the wire protocol over [`MemoryTransport`]:
//! runs the challenge handshake (checking the EIP-712 signature against the
//! declared wallet), checks session-key signatures on requests, answers them
//! by echoing, and can push notifications or drop the socket on demand.

use sc_01_rpc_protocol::{auth_typed_data, EcdsaVerifier};
use sc_02_session_client::{BrokerConnection, MemoryListener, MemoryTransport, TransportEvent};
use serde_json::{json, Value};
use shared_types::{Address, Allowance, AuthRequestParams};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// How the broker answers. Changeable between connections.
#[derive(Clone)]
pub struct BrokerBehavior {
    /// Answer `auth_request` with this error instead of a challenge.
    pub reject_auth: Option<String>,
    /// Never answer `auth_request`.
    pub silent_auth: bool,
    /// Shape of the `auth_challenge` payload.
    pub challenge_payload: fn(&str) -> Value,
    /// Issue this JWT on a successful challenge handshake.
    pub issue_jwt: Option<String>,
    /// Accept a JWT presented in `auth_verify`.
    pub accept_jwt: bool,
    /// Methods answered with an `error` response.
    pub fail_methods: HashSet<String>,
    /// Methods never answered.
    pub ignore_methods: HashSet<String>,
}

impl Default for BrokerBehavior {
    fn default() -> Self {
        Self {
            reject_auth: None,
            silent_auth: false,
            challenge_payload: |c| json!([{ "challenge_message": c }]),
            issue_jwt: None,
            accept_jwt: true,
            fail_methods: HashSet::new(),
            ignore_methods: HashSet::new(),
        }
    }
}

/// What the broker observed.
#[derive(Debug, Default, Clone)]
pub struct BrokerLog {
    /// Every frame the client sent, across connections.
    pub frames: Vec<Value>,
    pub connections: u32,
    /// Wallets whose challenge signature checked out.
    pub verified_wallets: Vec<Address>,
    /// Requests whose session-key signature did not recover to the participant.
    pub bad_signatures: u32,
    /// Handshakes completed with a JWT.
    pub jwt_resumes: u32,
}

impl BrokerLog {
    pub fn count_method(&self, method: &str) -> usize {
        self.frames
            .iter()
            .filter(|f| f["request"][1] == method)
            .count()
    }
}

enum Control {
    Push(String),
    Close { code: u16, reason: String },
}

pub struct MockBroker {
    behavior: Arc<Mutex<BrokerBehavior>>,
    log: Arc<Mutex<BrokerLog>>,
    current: Arc<Mutex<Option<mpsc::UnboundedSender<Control>>>>,
}

impl MockBroker {
    /// Start accepting on a fresh in-memory transport.
    pub fn start(behavior: BrokerBehavior) -> (Self, MemoryTransport) {
        let (transport, listener) = MemoryTransport::new();
        let broker = Self {
            behavior: Arc::new(Mutex::new(behavior)),
            log: Arc::new(Mutex::new(BrokerLog::default())),
            current: Arc::new(Mutex::new(None)),
        };
        tokio::spawn(accept_loop(
            listener,
            Arc::clone(&broker.behavior),
            Arc::clone(&broker.log),
            Arc::clone(&broker.current),
        ));
        (broker, transport)
    }

    pub fn log(&self) -> BrokerLog {
        self.log.lock().unwrap().clone()
    }

    pub fn update(&self, change: impl FnOnce(&mut BrokerBehavior)) {
        change(&mut self.behavior.lock().unwrap());
    }

    /// Push an unsolicited response frame on the live connection.
    pub fn push(&self, method: &str, payload: Value) {
        let frame = json!({ "response": [0, method, payload, 1] }).to_string();
        self.control(Control::Push(frame));
    }

    /// Drop the live connection with `code`, as a network failure would.
    pub fn drop_connection(&self, code: u16) {
        self.control(Control::Close {
            code,
            reason: "broker dropped connection".to_string(),
        });
    }

    fn control(&self, control: Control) {
        if let Some(current) = self.current.lock().unwrap().as_ref() {
            let _ = current.send(control);
        }
    }
}

async fn accept_loop(
    listener: MemoryListener,
    behavior: Arc<Mutex<BrokerBehavior>>,
    log: Arc<Mutex<BrokerLog>>,
    current: Arc<Mutex<Option<mpsc::UnboundedSender<Control>>>>,
) {
    while let Some(conn) = listener.accept().await {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        *current.lock().unwrap() = Some(control_tx);
        let connection_no = {
            let mut log = log.lock().unwrap();
            log.connections += 1;
            log.connections
        };
        tokio::spawn(serve_connection(
            conn,
            control_rx,
            connection_no,
            Arc::clone(&behavior),
            Arc::clone(&log),
        ));
    }
}

/// Per-connection handshake state.
#[derive(Default)]
struct Session {
    params: Option<AuthRequestParams>,
    challenge: Option<String>,
    authenticated: bool,
}

async fn serve_connection(
    mut conn: BrokerConnection,
    mut control: mpsc::UnboundedReceiver<Control>,
    connection_no: u32,
    behavior: Arc<Mutex<BrokerBehavior>>,
    log: Arc<Mutex<BrokerLog>>,
) {
    let mut session = Session::default();
    loop {
        tokio::select! {
            text = conn.recv_text() => {
                let Some(text) = text else { break };
                let Ok(frame) = serde_json::from_str::<Value>(&text) else { continue };
                log.lock().unwrap().frames.push(frame.clone());
                let behavior = behavior.lock().unwrap().clone();
                let reply = handle_frame(&frame, &mut session, connection_no, &behavior, &log);
                if let Some(reply) = reply {
                    if conn.send_text(reply.to_string()).await.is_err() {
                        break;
                    }
                }
            }
            command = control.recv() => match command {
                Some(Control::Push(frame)) => {
                    let _ = conn.send_text(frame).await;
                }
                Some(Control::Close { code, reason }) => {
                    let _ = conn
                        .to_client
                        .send(TransportEvent::Closed { code: Some(code), reason })
                        .await;
                    break;
                }
                None => break,
            }
        }
    }
    debug!(connection_no, "mock broker connection closed");
}

fn handle_frame(
    frame: &Value,
    session: &mut Session,
    connection_no: u32,
    behavior: &BrokerBehavior,
    log: &Mutex<BrokerLog>,
) -> Option<Value> {
    let id = frame["request"][0].clone();
    let method = frame["request"][1].as_str().unwrap_or_default().to_string();
    let params = frame["request"][2].clone();

    match method.as_str() {
        "auth_request" => {
            if behavior.silent_auth {
                return None;
            }
            if let Some(message) = &behavior.reject_auth {
                return Some(error_frame(&id, message));
            }
            session.params = parse_auth_request(&params);
            let challenge = format!("challenge-{connection_no}");
            session.challenge = Some(challenge.clone());
            Some(response(&id, "auth_challenge", (behavior.challenge_payload)(&challenge)))
        }
        "auth_verify" => {
            if let Some(jwt) = params[0]["jwt"].as_str() {
                let accepted =
                    behavior.accept_jwt && behavior.issue_jwt.as_deref() == Some(jwt);
                if !accepted {
                    return Some(error_frame(&id, "invalid jwt"));
                }
                session.authenticated = true;
                log.lock().unwrap().jwt_resumes += 1;
                return Some(response(&id, "auth_verify", json!([{ "success": true }])));
            }

            let (Some(params_decl), Some(challenge)) = (&session.params, &session.challenge) else {
                return Some(error_frame(&id, "no challenge issued"));
            };
            if params[0]["challenge"].as_str() != Some(challenge.as_str()) {
                return Some(error_frame(&id, "challenge mismatch"));
            }
            let signature = frame["signatures"][0].as_str().unwrap_or_default();
            let recovered = EcdsaVerifier::new()
                .recover_typed_data(&auth_typed_data(params_decl, challenge), signature);
            match recovered {
                Ok(address) if address == params_decl.wallet => {
                    session.authenticated = true;
                    log.lock().unwrap().verified_wallets.push(address);
                    let mut result = json!({ "address": address, "success": true });
                    if let Some(jwt) = &behavior.issue_jwt {
                        result["jwt_token"] = json!(jwt);
                    }
                    Some(response(&id, "auth_verify", json!([result])))
                }
                _ => Some(error_frame(&id, "invalid signature")),
            }
        }
        _ => {
            if !session.authenticated {
                return Some(error_frame(&id, "authentication required"));
            }
            check_session_signature(frame, session, log);
            if behavior.ignore_methods.contains(&method) {
                return None;
            }
            if behavior.fail_methods.contains(&method) {
                return Some(error_frame(&id, "Something went wrong"));
            }
            let reply_method = if method == "ping" { "pong" } else { method.as_str() };
            Some(response(&id, reply_method, json!([{ "echo": params }])))
        }
    }
}

fn check_session_signature(frame: &Value, session: &Session, log: &Mutex<BrokerLog>) {
    let Some(participant) = session.params.as_ref().map(|p| p.participant) else {
        // Resumed sessions carry no declared participant.
        return;
    };
    let signatures = frame["signatures"].as_array().cloned().unwrap_or_default();
    let valid = match signatures.as_slice() {
        [signature] => signature
            .as_str()
            .and_then(|sig| EcdsaVerifier::new().recover_payload(&frame["request"], sig).ok())
            .is_some_and(|signer| signer == participant),
        _ => false,
    };
    if !valid {
        log.lock().unwrap().bad_signatures += 1;
    }
}

fn parse_auth_request(params: &Value) -> Option<AuthRequestParams> {
    let address = |v: &Value| v.as_str().and_then(|s| s.parse::<Address>().ok());
    let optional = |v: &Value| {
        v.as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Some(AuthRequestParams {
        wallet: address(&params[0])?,
        participant: address(&params[1])?,
        app_name: params[2].as_str()?.to_string(),
        allowances: serde_json::from_value::<Vec<Allowance>>(params[3].clone()).ok()?,
        expire: optional(&params[4]),
        scope: optional(&params[5]),
        application: address(&params[6]),
    })
}

fn response(id: &Value, method: &str, payload: Value) -> Value {
    json!({ "response": [id, method, payload, 1_700_000_000_000u64] })
}

fn error_frame(id: &Value, message: &str) -> Value {
    response(id, "error", json!([{ "error": message }]))
}
