//! # Session Client Service
//!
//! [`SessionClient`] is a cheap, cloneable handle. All connection, auth and
//! correlation state lives in one [`SessionActor`] task that owns it
//! exclusively; handles talk to it over a command channel.
//!
//! ## Actor loop
//!
//! The actor waits on five sources at once:
//! - commands from handles (connect, disconnect, send, subscribe, queries)
//! - events from the open transport link
//! - the auth deadline of the handshake in flight
//! - the earliest pending-request deadline
//! - the scheduled reconnect
//!
//! Timers are plain deadlines held in actor fields, so clearing a field is
//! enough to cancel one.

use crate::adapters::pending::{PendingRequestStore, PendingStats, RpcOutcome};
use crate::adapters::ws_transport::WsTransport;
use crate::domain::auth_state::{AuthEvent, AuthState};
use crate::domain::backoff::{ReconnectDecision, ReconnectPolicy};
use crate::domain::challenge::decode_challenge;
use crate::domain::config::ClientConfig;
use crate::domain::error::{ClientError, ClientResult};
use crate::domain::events::ClientEvent;
use crate::ports::inbound::SessionApi;
use crate::ports::outbound::{
    OutboundFrame, Transport, TransportError, TransportEvent, TransportLink,
};
use sc_01_rpc_protocol::{
    create_request, create_session_request, generate_request_id, parse_response, sign_request,
    MessageSigner, ParsedResponse, ProtocolError, RequestOptions, RpcBuilders, RpcMethod,
    SigningMode,
};
use serde_json::Value;
use shared_types::{
    Address, CloseAppSessionRequest, CloseChannelRequest, CreateAppSessionRequest,
    GetChannelsRequest, RequestId, ResizeChannelRequest, SessionId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Capacity of the lifecycle event channel.
const EVENT_CAPACITY: usize = 64;

/// Error text when the broker rejects auth without a usable message.
const AUTH_REJECTED: &str = "authentication rejected by broker";

enum Command {
    Connect {
        reply: oneshot::Sender<ClientResult<()>>,
    },
    Disconnect {
        reason: String,
        reply: oneshot::Sender<()>,
    },
    Send {
        request_id: RequestId,
        method: RpcMethod,
        json: String,
        reply: oneshot::Sender<RpcOutcome>,
    },
    Subscribe {
        method: String,
        sender: mpsc::Sender<ParsedResponse>,
    },
    State {
        reply: oneshot::Sender<AuthState>,
    },
    Stats {
        reply: oneshot::Sender<PendingStats>,
    },
}

/// Handle to an authenticated broker session.
#[derive(Clone)]
pub struct SessionClient {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<ClientEvent>,
    rpc: Arc<RpcBuilders>,
    session_key: Arc<dyn MessageSigner>,
    channel_capacity: usize,
}

impl SessionClient {
    /// Validate `config` and spawn the session task. Must be called within a
    /// Tokio runtime. Nothing is opened until [`SessionApi::connect`].
    ///
    /// `identity` answers the auth challenge; `session_key` signs every
    /// other request.
    pub fn new(
        config: ClientConfig,
        identity: Arc<dyn MessageSigner>,
        session_key: Arc<dyn MessageSigner>,
        transport: Arc<dyn Transport>,
    ) -> ClientResult<Self> {
        config.validate()?;

        let rpc = Arc::new(RpcBuilders::new(
            identity,
            Arc::clone(&session_key),
            config.auth_params(),
        ));
        let channel_capacity = config.requests.channel_capacity;
        let (commands, command_rx) = mpsc::channel(channel_capacity);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let actor = SessionActor::new(config, Arc::clone(&rpc), transport, events.clone());
        tokio::spawn(actor.run(command_rx));

        Ok(Self {
            commands,
            events,
            rpc,
            session_key,
            channel_capacity,
        })
    }

    /// Like [`SessionClient::new`] over a WebSocket.
    pub fn with_websocket(
        config: ClientConfig,
        identity: Arc<dyn MessageSigner>,
        session_key: Arc<dyn MessageSigner>,
    ) -> ClientResult<Self> {
        let transport = Arc::new(WsTransport::with_capacity(config.requests.channel_capacity));
        Self::new(config, identity, session_key, transport)
    }

    /// The builders this client signs with.
    pub fn builders(&self) -> &RpcBuilders {
        &self.rpc
    }

    pub async fn ping(&self) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self.rpc.ledger.ping(RequestOptions::with_id(id)).await?;
        self.dispatch(id, RpcMethod::Ping, json).await
    }

    pub async fn get_config(&self) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self.rpc.ledger.get_config(RequestOptions::with_id(id)).await?;
        self.dispatch(id, RpcMethod::GetConfig, json).await
    }

    pub async fn get_ledger_balances(&self, participant: &Address) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self
            .rpc
            .ledger
            .get_ledger_balances(participant, RequestOptions::with_id(id))
            .await?;
        self.dispatch(id, RpcMethod::GetLedgerBalances, json).await
    }

    pub async fn get_app_definition(&self, app_session_id: &str) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self
            .rpc
            .app_session
            .get_app_definition(app_session_id, RequestOptions::with_id(id))
            .await?;
        self.dispatch(id, RpcMethod::GetAppDefinition, json).await
    }

    pub async fn create_app_session(
        &self,
        request: &CreateAppSessionRequest,
    ) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self
            .rpc
            .app_session
            .create_app_session(request, RequestOptions::with_id(id))
            .await?;
        self.dispatch(id, RpcMethod::CreateAppSession, json).await
    }

    /// Send this client's signature only. Gathering the counterparties'
    /// signatures happens elsewhere.
    pub async fn close_app_session(&self, request: &CloseAppSessionRequest) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self
            .rpc
            .app_session
            .close_app_session(request, RequestOptions::with_id(id))
            .await?;
        self.dispatch(id, RpcMethod::CloseAppSession, json).await
    }

    /// In-session `message` carrying an opaque application payload.
    pub async fn send_app_message(
        &self,
        app_session_id: SessionId,
        payload: Value,
    ) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self
            .rpc
            .app_session
            .message(app_session_id, payload, RequestOptions::with_id(id))
            .await?;
        self.dispatch(id, RpcMethod::Message, json).await
    }

    pub async fn close_channel(&self, request: &CloseChannelRequest) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self
            .rpc
            .channel
            .close_channel(request, RequestOptions::with_id(id))
            .await?;
        self.dispatch(id, RpcMethod::CloseChannel, json).await
    }

    pub async fn resize_channel(&self, request: &ResizeChannelRequest) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self
            .rpc
            .channel
            .resize_channel(request, RequestOptions::with_id(id))
            .await?;
        self.dispatch(id, RpcMethod::ResizeChannel, json).await
    }

    pub async fn get_channels(&self, filter: &GetChannelsRequest) -> ClientResult<Value> {
        let id = generate_request_id();
        let json = self
            .rpc
            .channel
            .get_channels(filter, RequestOptions::with_id(id))
            .await?;
        self.dispatch(id, RpcMethod::GetChannels, json).await
    }

    /// Register `request_id`, transmit `json` and wait for the correlated response.
    async fn dispatch(
        &self,
        request_id: RequestId,
        method: RpcMethod,
        json: String,
    ) -> ClientResult<Value> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Send {
            request_id,
            method,
            json,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ClientError::ShuttingDown)?
    }

    async fn command(&self, command: Command) -> ClientResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::ShuttingDown)
    }

    async fn query<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> ClientResult<T> {
        let (reply, rx) = oneshot::channel();
        self.command(build(reply)).await?;
        rx.await.map_err(|_| ClientError::ShuttingDown)
    }
}

#[async_trait::async_trait]
impl SessionApi for SessionClient {
    async fn connect(&self) -> ClientResult<()> {
        self.query(|reply| Command::Connect { reply }).await?
    }

    async fn disconnect(&self, reason: &str) -> ClientResult<()> {
        let reason = reason.to_string();
        self.query(|reply| Command::Disconnect { reason, reply })
            .await
    }

    async fn request(
        &self,
        method: RpcMethod,
        params: Vec<Value>,
        session_id: Option<SessionId>,
    ) -> ClientResult<Value> {
        if method.info().signing != SigningMode::SessionKey {
            return Err(ProtocolError::UnexpectedMethod {
                expected: "a session-key signed method".to_string(),
                actual: method.as_str().to_string(),
            }
            .into());
        }

        let id = generate_request_id();
        let envelope = match session_id {
            Some(session_id) => {
                create_session_request(Some(id), method.as_str(), params, None, session_id)
            }
            None => create_request(Some(id), method.as_str(), params, None),
        };
        let json = sign_request(envelope, self.session_key.as_ref())
            .await?
            .to_json()?;
        self.dispatch(id, method, json).await
    }

    async fn subscribe(&self, method: &str) -> ClientResult<mpsc::Receiver<ParsedResponse>> {
        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        self.command(Command::Subscribe {
            method: method.to_string(),
            sender,
        })
        .await?;
        Ok(receiver)
    }

    fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    async fn state(&self) -> ClientResult<AuthState> {
        self.query(|reply| Command::State { reply }).await
    }

    async fn stats(&self) -> ClientResult<PendingStats> {
        self.query(|reply| Command::Stats { reply }).await
    }
}

// =============================================================================
// ACTOR
// =============================================================================

/// Exclusive owner of the session state.
struct SessionActor {
    config: ClientConfig,
    rpc: Arc<RpcBuilders>,
    transport: Arc<dyn Transport>,
    events: broadcast::Sender<ClientEvent>,
    policy: ReconnectPolicy,

    state: AuthState,
    link: Option<TransportLink>,
    pending: PendingRequestStore,
    /// Callers of `connect()` waiting on the attempt in flight.
    waiters: Vec<oneshot::Sender<ClientResult<()>>>,
    subscribers: HashMap<String, Vec<mpsc::Sender<ParsedResponse>>>,

    auth_deadline: Option<Instant>,
    reconnect_at: Option<Instant>,
    /// Reconnects made since the last successful auth.
    reconnect_attempts: u32,

    jwt: Option<String>,
    /// The handshake in flight presented a stored JWT.
    resuming: bool,
}

impl SessionActor {
    fn new(
        config: ClientConfig,
        rpc: Arc<RpcBuilders>,
        transport: Arc<dyn Transport>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            policy: ReconnectPolicy::from(&config.reconnect),
            pending: PendingRequestStore::new(config.requests.timeout),
            config,
            rpc,
            transport,
            events,
            state: AuthState::Disconnected,
            link: None,
            waiters: Vec::new(),
            subscribers: HashMap::new(),
            auth_deadline: None,
            reconnect_at: None,
            reconnect_attempts: 0,
            jwt: None,
            resuming: false,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!(url = %self.config.broker_url, "session task started");
        loop {
            let request_deadline = self.pending.next_deadline();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
                event = recv_link(&mut self.link) => self.on_transport_event(event).await,
                _ = sleep_until_opt(self.auth_deadline) => self.on_auth_timeout().await,
                _ = sleep_until_opt(request_deadline) => {
                    self.pending.expire_due(Instant::now());
                }
                _ = sleep_until_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.start_connect().await;
                }
            }
        }

        // Every handle is gone.
        self.close_link("client dropped");
        self.pending.reject_all("client dropped");
        debug!("session task stopped");
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect { reply } => self.on_connect(reply).await,
            Command::Disconnect { reason, reply } => {
                self.on_disconnect(&reason).await;
                let _ = reply.send(());
            }
            Command::Send {
                request_id,
                method,
                json,
                reply,
            } => self.on_send(request_id, method, json, reply).await,
            Command::Subscribe { method, sender } => {
                debug!(method, "subscriber registered");
                self.subscribers.entry(method).or_default().push(sender);
            }
            Command::State { reply } => {
                let _ = reply.send(self.state);
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.pending.stats());
            }
        }
    }

    // -------------------------------------------------------------------------
    // Connection lifecycle
    // -------------------------------------------------------------------------

    async fn on_connect(&mut self, reply: oneshot::Sender<ClientResult<()>>) {
        if self.state.is_authenticated() {
            let _ = reply.send(Ok(()));
            return;
        }

        self.waiters.push(reply);
        if self.state.is_in_flight() || self.reconnect_at.is_some() {
            debug!(state = %self.state, waiters = self.waiters.len(), "joining connect in flight");
            return;
        }

        self.reconnect_attempts = 0;
        self.start_connect().await;
    }

    #[instrument(skip(self))]
    async fn start_connect(&mut self) {
        if !self.transition(AuthEvent::ConnectStarted) {
            return;
        }
        let window = self.config.auth.timeout;
        self.auth_deadline = Some(Instant::now() + window);

        let url = self.config.broker_url.clone();
        match timeout(window, self.transport.open(&url)).await {
            Ok(Ok(link)) => {
                self.link = Some(link);
                self.begin_handshake().await;
            }
            Ok(Err(e)) => self.on_connection_lost(e.to_string()).await,
            Err(_) => self.on_connection_lost(format!("connect timed out after {window:?}")).await,
        }
    }

    /// Socket open: resume with a stored JWT, or start the challenge handshake.
    async fn begin_handshake(&mut self) {
        if self.config.auth.resume_with_jwt {
            if let Some(jwt) = self.jwt.clone() {
                let sent = match self
                    .rpc
                    .auth
                    .auth_verify_with_jwt(&jwt, RequestOptions::default())
                {
                    Ok(json) => self.send_text(json),
                    Err(e) => Err(e.into()),
                };
                match sent {
                    Ok(()) => {
                        debug!("resuming session with stored JWT");
                        self.resuming = true;
                        self.transition(AuthEvent::ResumeSent);
                    }
                    Err(e) => self.on_handshake_send_failed(e).await,
                }
                return;
            }
        }

        match self.send_auth_request().await {
            Ok(()) => {
                self.transition(AuthEvent::AuthRequestSent);
            }
            Err(e) => self.on_handshake_send_failed(e).await,
        }
    }

    async fn send_auth_request(&mut self) -> ClientResult<()> {
        let json = self.rpc.auth.auth_request(RequestOptions::default())?;
        self.send_text(json)?;
        debug!(app = %self.rpc.auth.params().app_name, "auth_request sent");
        Ok(())
    }

    async fn on_handshake_send_failed(&mut self, error: ClientError) {
        match error {
            ClientError::Transport(e) => self.on_connection_lost(e.to_string()).await,
            other => {
                let reason = other.to_string();
                self.fail_auth(AuthEvent::Rejected, move || ClientError::AuthFailed(reason.clone()))
                    .await
            }
        }
    }

    async fn on_disconnect(&mut self, reason: &str) {
        info!(reason, "disconnecting");
        self.reconnect_at = None;
        self.auth_deadline = None;
        self.reconnect_attempts = 0;
        self.resuming = false;
        self.jwt = None;

        self.close_link(reason);
        self.pending.reject_all(reason);
        self.fail_waiters(|| ClientError::Disconnected(reason.to_string()));

        self.transition(AuthEvent::Closed);
        self.emit(ClientEvent::Disconnected {
            reason: reason.to_string(),
            clean: true,
        });
    }

    async fn on_transport_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Message(text)) => self.on_message(&text).await,
            Some(TransportEvent::Closed { code, reason }) => {
                let reason = match code {
                    Some(code) => format!("closed with code {code}: {reason}"),
                    None => format!("closed: {reason}"),
                };
                self.on_connection_lost(reason).await;
            }
            Some(TransportEvent::Error(e)) => self.on_connection_lost(e).await,
            None => self.on_connection_lost("transport ended".to_string()).await,
        }
    }

    /// Unclean close or failed open: drop the link and decide on a reconnect.
    async fn on_connection_lost(&mut self, reason: String) {
        self.link = None;
        self.auth_deadline = None;
        self.resuming = false;
        let rejected = self.pending.reject_all(&reason);
        warn!(reason, rejected, state = %self.state, "connection lost");

        self.transition(AuthEvent::Closed);
        self.emit(ClientEvent::Disconnected {
            reason,
            clean: false,
        });

        match self.policy.decide(self.reconnect_attempts) {
            ReconnectDecision::Retry { attempt, delay } => {
                self.reconnect_attempts = attempt;
                self.reconnect_at = Some(Instant::now() + delay);
                info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
                self.emit(ClientEvent::ReconnectScheduled { attempt, delay });
            }
            ReconnectDecision::GiveUp { attempts } => {
                error!(attempts, "giving up on reconnection");
                self.fail_waiters(|| ClientError::ConnectionLost { attempts });
                self.emit(ClientEvent::ConnectionLost { attempts });
            }
        }
    }

    // -------------------------------------------------------------------------
    // Inbound frames
    // -------------------------------------------------------------------------

    async fn on_message(&mut self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "dropping non-JSON frame");
                return;
            }
        };
        let parsed = parse_response(&value);

        if let Some(request_id) = parsed.request_id {
            if parsed.is_valid && self.pending.is_pending(request_id) {
                self.resolve_pending(request_id, parsed);
                return;
            }
        }

        if self.state.is_in_flight() && self.on_handshake_frame(&value, &parsed).await {
            return;
        }

        if !parsed.is_valid {
            warn!(
                error = parsed.error.as_deref().unwrap_or_default(),
                "dropping invalid frame"
            );
            return;
        }

        let method = parsed.method.clone().unwrap_or_default();
        match method.parse::<RpcMethod>() {
            Ok(RpcMethod::AuthChallenge | RpcMethod::AuthVerify) => {
                warn!(method, state = %self.state, "ignoring out-of-order handshake frame");
            }
            _ => self.notify(&method, parsed),
        }
    }

    fn resolve_pending(&mut self, request_id: RequestId, parsed: ParsedResponse) {
        let outcome = if parsed.is_error {
            Err(ClientError::Rpc {
                method: self
                    .pending
                    .method_of(request_id)
                    .unwrap_or_default()
                    .to_string(),
                message: parsed.error_message().unwrap_or_default().to_string(),
            })
        } else {
            Ok(parsed.data.unwrap_or(Value::Null))
        };
        self.pending.complete(request_id, outcome);
    }

    /// Handle a frame while a handshake is in flight. Returns false when the
    /// frame is not part of the current handshake step.
    async fn on_handshake_frame(&mut self, value: &Value, parsed: &ParsedResponse) -> bool {
        let method = parsed.method.as_deref().and_then(|m| m.parse::<RpcMethod>().ok());

        // A malformed error payload still fails the handshake.
        if method == Some(RpcMethod::Error) {
            let message = parsed.error_message().unwrap_or(AUTH_REJECTED).to_string();
            self.on_auth_rejected(message).await;
            return true;
        }

        match (method, self.state) {
            (Some(RpcMethod::AuthChallenge), AuthState::AwaitingChallenge) => {
                // Challenge payloads are not always arrays, so read the raw tuple.
                let payload = value
                    .get("response")
                    .and_then(|tuple| tuple.get(2))
                    .cloned()
                    .unwrap_or(Value::Null);
                self.on_challenge(payload).await;
                true
            }
            (Some(RpcMethod::AuthVerify), AuthState::AwaitingVerifyResult) if parsed.is_valid => {
                self.on_verify_result(parsed).await;
                true
            }
            _ => false,
        }
    }

    async fn on_challenge(&mut self, payload: Value) {
        let challenge = match decode_challenge(&payload) {
            Ok(challenge) => challenge,
            Err(e) => {
                warn!(error = %e, "unusable auth_challenge");
                self.fail_auth(AuthEvent::Rejected, || ClientError::ChallengeNotFound)
                    .await;
                return;
            }
        };

        let sent = match self
            .rpc
            .auth
            .auth_verify_from_challenge(&challenge, RequestOptions::default())
            .await
        {
            Ok(json) => self.send_text(json),
            Err(e) => Err(e.into()),
        };
        match sent {
            Ok(()) => {
                debug!("challenge answered");
                self.transition(AuthEvent::ChallengeAnswered);
            }
            Err(e) => self.on_handshake_send_failed(e).await,
        }
    }

    async fn on_verify_result(&mut self, parsed: &ParsedResponse) {
        let result = parsed
            .data
            .as_ref()
            .and_then(|d| d.get(0))
            .cloned()
            .unwrap_or(Value::Null);

        if result.get("success").and_then(Value::as_bool) == Some(false) {
            self.on_auth_rejected(AUTH_REJECTED.to_string()).await;
            return;
        }

        if let Some(jwt) = result.get("jwt_token").and_then(Value::as_str) {
            self.jwt = Some(jwt.to_string());
        }

        let resumed = self.resuming;
        self.resuming = false;
        self.auth_deadline = None;
        self.reconnect_attempts = 0;
        self.transition(AuthEvent::Verified);

        let wallet = self.rpc.auth.params().wallet;
        info!(%wallet, resumed, "authenticated");
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(Ok(()));
        }
        self.emit(ClientEvent::Authenticated { wallet, resumed });
    }

    async fn on_auth_rejected(&mut self, message: String) {
        if self.resuming {
            // Stale token: run the full handshake on the same socket.
            warn!(message, "stored JWT rejected, falling back to challenge");
            self.resuming = false;
            self.jwt = None;
            match self.send_auth_request().await {
                Ok(()) => {
                    self.transition(AuthEvent::ResumeRejected);
                }
                Err(e) => self.on_handshake_send_failed(e).await,
            }
            return;
        }

        self.fail_auth(AuthEvent::Rejected, move || ClientError::AuthFailed(message.clone()))
            .await;
    }

    async fn on_auth_timeout(&mut self) {
        self.auth_deadline = None;
        if !self.state.is_in_flight() {
            return;
        }
        let window = self.config.auth.timeout;
        self.fail_auth(AuthEvent::TimedOut, move || ClientError::AuthTimeout(window))
            .await;
    }

    /// Terminal auth failure: `Failed`, socket closed, no reconnect.
    async fn fail_auth(&mut self, event: AuthEvent, error: impl Fn() -> ClientError) {
        let reason = error().to_string();
        error!(reason, state = %self.state, "authentication failed");

        self.auth_deadline = None;
        self.resuming = false;
        self.transition(event);
        self.close_link(&reason);
        self.fail_waiters(error);
        self.emit(ClientEvent::AuthFailed { reason });
    }

    fn notify(&mut self, method: &str, parsed: ParsedResponse) {
        let Some(senders) = self.subscribers.get_mut(method) else {
            debug!(method, request_id = ?parsed.request_id, "no subscriber for frame");
            return;
        };

        senders.retain(|sender| match sender.try_send(parsed.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(method, "subscriber lagging, notification dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        if senders.is_empty() {
            self.subscribers.remove(method);
        }
    }

    // -------------------------------------------------------------------------
    // Outbound
    // -------------------------------------------------------------------------

    async fn on_send(
        &mut self,
        request_id: RequestId,
        method: RpcMethod,
        json: String,
        reply: oneshot::Sender<RpcOutcome>,
    ) {
        if !self.state.is_authenticated() {
            let _ = reply.send(Err(ClientError::NotAuthenticated));
            return;
        }
        if let Err(reply) = self.pending.register(request_id, method.as_str(), None, reply) {
            let _ = reply.send(Err(ClientError::DuplicateRequestId(request_id)));
            return;
        }
        if let Err(e) = self.send_text(json) {
            self.pending.complete(request_id, Err(e));
        }
    }

    /// Queue a frame without waiting. A full queue fails the frame rather
    /// than stalling the actor.
    fn send_text(&self, json: String) -> ClientResult<()> {
        let link = self.link.as_ref().ok_or(TransportError::Closed)?;
        link.outbound
            .try_send(OutboundFrame::Text(json))
            .map_err(|e| {
                let error = match e {
                    mpsc::error::TrySendError::Full(_) => {
                        TransportError::Send("outbound queue full".to_string())
                    }
                    mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
                };
                ClientError::Transport(error)
            })
    }

    /// Drop the link, asking for a close frame first. If the queue is full
    /// the dropped sender still closes the socket.
    fn close_link(&mut self, reason: &str) {
        if let Some(link) = self.link.take() {
            let _ = link.outbound.try_send(OutboundFrame::Close {
                reason: reason.to_string(),
            });
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Apply `event` to the auth state. Returns false when it does not apply.
    fn transition(&mut self, event: AuthEvent) -> bool {
        let Some(next) = self.state.on(event) else {
            debug!(state = %self.state, ?event, "auth event ignored");
            return false;
        };
        if next != self.state {
            debug!(from = %self.state, to = %next, "auth state changed");
            self.emit(ClientEvent::StateChanged {
                from: self.state,
                to: next,
            });
            self.state = next;
        }
        true
    }

    fn fail_waiters(&mut self, error: impl Fn() -> ClientError) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(Err(error()));
        }
    }

    fn emit(&self, event: ClientEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

async fn recv_link(link: &mut Option<TransportLink>) -> Option<TransportEvent> {
    match link {
        Some(link) => link.inbound.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
