//! Stream client and connection supervisor
//!
//! One supervisor task owns the socket. It receives and dispatches frames
//! strictly in order, writes queued outbound frames, sends keep-alives, and
//! reconnects after failures. Callers talk to it through [`OkexStream`].

use crate::channel::{self, Frame, LoginAck, TableKind, PING};
use crate::config::StreamConfig;
use crate::contract::{self, ContractResolver, ContractTable};
use crate::decode;
use crate::error::{StreamError, StreamResult};
use crate::events::{ConnectionEvent, DisconnectReason, StreamEvent};
use crate::handlers::HandlerRegistry;
use crate::login::{AuthState, AuthStatus, LoginSlot};
use crate::subscription::{subscribe_request, PendingSubscription, SubscriptionRegistry, Topic};
use crate::transport::{Transport, TransportError, TransportFactory, WsTransport};

use okex_types::{
    AccountUpdate, Category, ContractType, CurrencyPair, Depth, Kline, KlinePeriod, Market,
    OrderUpdate, PositionUpdate, Ticker, Trade,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Connection attempt in progress
    Connecting,
    /// Connected, login in progress
    Authenticating,
    /// Connected (and logged in if credentials are configured)
    Ready,
    /// Closed by the caller or by the reconnect policy
    Closed,
}

impl ConnectionState {
    /// Check if a physical connection is up
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Authenticating | Self::Ready)
    }

    /// Check if the stream accepts outbound frames
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

struct Outbound {
    text: String,
    ack: Option<oneshot::Sender<Result<(), TransportError>>>,
}

struct Inner {
    config: StreamConfig,
    factory: TransportFactory,
    resolver: Arc<dyn ContractResolver>,
    handlers: HandlerRegistry,
    subscriptions: RwLock<SubscriptionRegistry>,
    login_slot: LoginSlot,
    login_lock: tokio::sync::Mutex<()>,
    auth: RwLock<AuthStatus>,
    state_tx: watch::Sender<ConnectionState>,
    generation: AtomicU64,
    last_activity: Mutex<Option<Instant>>,
    outbound_tx: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    closed: AtomicBool,
    event_tx: mpsc::UnboundedSender<StreamEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<StreamEvent>>>,
}

/// Streaming client for the OKEx v3 WebSocket API
///
/// The connection is created lazily by the first [`connect`](Self::connect),
/// [`subscribe`](Self::subscribe) or [`send`](Self::send) and lives until
/// [`close`](Self::close) or until the reconnect policy gives up.
///
/// # Example
///
/// ```no_run
/// use okex_ws::{OkexStream, StreamConfig};
/// use okex_types::{ContractType, CurrencyPair};
///
/// # async fn example() -> Result<(), okex_ws::StreamError> {
/// let stream = OkexStream::new(StreamConfig::default());
/// stream.on_depth(|depth| println!("{:?}", depth.best_ask()));
///
/// let btc = CurrencyPair::new("BTC", "USD");
/// stream.subscribe_depth(&btc, ContractType::Swap).await?;
/// # Ok(())
/// # }
/// ```
pub struct OkexStream {
    inner: Arc<Inner>,
}

impl OkexStream {
    /// Create a stream with an empty contract table (swaps only)
    pub fn new(config: StreamConfig) -> Self {
        Self::with_resolver(config, Arc::new(ContractTable::new()))
    }

    /// Create a stream with default configuration
    pub fn with_defaults() -> Self {
        Self::new(StreamConfig::default())
    }

    /// Create a stream resolving dated futures through `resolver`
    pub fn with_resolver(config: StreamConfig, resolver: Arc<dyn ContractResolver>) -> Self {
        let url = config.endpoint.url().to_string();
        let connect_timeout = config.connect_timeout;
        let decompress = config.decompress;
        let factory: TransportFactory = Arc::new(move || {
            Box::new(
                WsTransport::new(url.clone())
                    .with_timeout(connect_timeout)
                    .with_decompression(decompress),
            )
        });
        Self::with_transport(config, resolver, factory)
    }

    /// Create a stream with a custom transport factory
    ///
    /// The factory is called once per physical connection.
    pub fn with_transport(
        config: StreamConfig,
        resolver: Arc<dyn ContractResolver>,
        factory: TransportFactory,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                config,
                factory,
                resolver,
                handlers: HandlerRegistry::new(),
                subscriptions: RwLock::new(SubscriptionRegistry::new()),
                login_slot: LoginSlot::new(),
                login_lock: tokio::sync::Mutex::new(()),
                auth: RwLock::new(AuthStatus::default()),
                state_tx,
                generation: AtomicU64::new(0),
                last_activity: Mutex::new(None),
                outbound_tx: Mutex::new(None),
                supervisor: Mutex::new(None),
                shutdown_tx,
                closed: AtomicBool::new(false),
                event_tx,
                event_rx: Mutex::new(Some(event_rx)),
            }),
        }
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Check if the stream accepts outbound frames
    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Watch connection state changes
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Number of physical connections made so far
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Authentication state of the current connection
    pub fn auth_state(&self) -> AuthState {
        let status = self.inner.auth.read().clone();
        if status.generation == self.generation() {
            status.state
        } else {
            AuthState::NotAuthenticated
        }
    }

    /// Time of the last inbound frame on the current connection
    pub fn last_activity(&self) -> Option<Instant> {
        *self.inner.last_activity.lock()
    }

    /// Recorded subscriptions, oldest first
    pub fn subscriptions(&self) -> Vec<Topic> {
        self.inner.subscriptions.read().topics().to_vec()
    }

    /// Take the event receiver (can only be called once)
    ///
    /// Events are only queued once the receiver has been taken; anything
    /// reported before that is dropped. The channel is unbounded, so a taken
    /// receiver has to be drained.
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<StreamEvent>> {
        self.inner.event_rx.lock().take()
    }

    /// Handler registry
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    /// Register the ticker handler
    pub fn on_ticker(&self, handler: impl Fn(Ticker) + Send + Sync + 'static) {
        self.inner.handlers.on_ticker(handler);
    }

    /// Register the depth handler
    pub fn on_depth(&self, handler: impl Fn(Depth) + Send + Sync + 'static) {
        self.inner.handlers.on_depth(handler);
    }

    /// Register the trade handler
    pub fn on_trade(&self, handler: impl Fn(Trade) + Send + Sync + 'static) {
        self.inner.handlers.on_trade(handler);
    }

    /// Register the candle handler
    pub fn on_kline(&self, handler: impl Fn(Kline) + Send + Sync + 'static) {
        self.inner.handlers.on_kline(handler);
    }

    /// Register the order handler
    pub fn on_order(&self, handler: impl Fn(OrderUpdate) + Send + Sync + 'static) {
        self.inner.handlers.on_order(handler);
    }

    /// Register the account handler
    pub fn on_account(&self, handler: impl Fn(AccountUpdate) + Send + Sync + 'static) {
        self.inner.handlers.on_account(handler);
    }

    /// Register the position handler
    pub fn on_position(&self, handler: impl Fn(PositionUpdate) + Send + Sync + 'static) {
        self.inner.handlers.on_position(handler);
    }

    /// Connect and wait until the stream is ready
    ///
    /// Idempotent: on a ready stream this returns immediately without a new
    /// handshake. With credentials configured, readiness includes a
    /// successful login; a rejected login is returned as
    /// [`StreamError::LoginRejected`].
    pub async fn connect(&self) -> StreamResult<ConnectionState> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(StreamError::Closed);
        }
        if self.state().is_ready() {
            return Ok(ConnectionState::Ready);
        }

        self.ensure_supervisor()?;

        let ready_timeout = self.inner.config.ready_timeout;
        let mut state_rx = self.inner.state_tx.subscribe();
        let state = {
            let reached = timeout(
                ready_timeout,
                state_rx.wait_for(|s| {
                    matches!(
                        s,
                        ConnectionState::Authenticating
                            | ConnectionState::Ready
                            | ConnectionState::Closed
                    )
                }),
            )
            .await
            .map_err(|_| StreamError::Timeout {
                what: "connection",
                timeout: ready_timeout,
            })?
            .map_err(|_| StreamError::Closed)?;
            *reached
        };

        match state {
            ConnectionState::Closed if self.inner.closed.load(Ordering::SeqCst) => {
                Err(StreamError::Closed)
            }
            ConnectionState::Closed => Err(StreamError::ReconnectExhausted {
                failures: self.inner.config.reconnect.max_failures.unwrap_or(0),
            }),
            ConnectionState::Authenticating => {
                self.inner.login(false).await?;
                Ok(self.state())
            }
            other => Ok(other),
        }
    }

    /// Log in on the current connection
    ///
    /// Concurrent calls are serialized; once one succeeds, later calls on
    /// the same connection return immediately without another request.
    pub async fn login(&self) -> StreamResult<()> {
        if !self.inner.config.has_credentials() {
            return Err(StreamError::NoCredentials);
        }
        if !self.inner.is_running() {
            self.connect().await?;
            return Ok(());
        }
        self.inner.login(true).await
    }

    /// Send a raw text frame
    ///
    /// Resolves once the frame was written to the socket. Fails with
    /// [`StreamError::NotReady`] unless the stream is ready.
    pub async fn send(&self, frame: impl Into<String>) -> StreamResult<()> {
        if !self.inner.is_running() {
            self.connect().await?;
        }
        self.inner.enqueue(frame.into(), ConnectionState::is_ready).await
    }

    /// Subscribe to a topic
    ///
    /// Fails with [`StreamError::NoHandler`] if no handler is registered for
    /// the topic's category. Connects lazily. The topic is recorded for
    /// replay once the subscribe frame has been written; a failed or
    /// cancelled call leaves the registry unchanged.
    pub async fn subscribe(&self, topic: Topic) -> StreamResult<()> {
        self.require_handler(topic.category)?;
        if topic.category.is_private() && !self.inner.config.has_credentials() {
            return Err(StreamError::NoCredentials);
        }

        self.connect().await?;

        let pending = PendingSubscription::insert(&self.inner.subscriptions, &topic);
        debug!("Subscribing to {}", topic);
        self.inner
            .enqueue(subscribe_request([&topic]).to_string(), ConnectionState::is_ready)
            .await?;
        pending.commit();
        Ok(())
    }

    /// Subscribe to tickers
    pub async fn subscribe_ticker(
        &self,
        pair: &CurrencyPair,
        contract_type: ContractType,
    ) -> StreamResult<()> {
        self.subscribe_instrument(Category::Ticker, pair, contract_type)
            .await
    }

    /// Subscribe to five-level depth
    pub async fn subscribe_depth(
        &self,
        pair: &CurrencyPair,
        contract_type: ContractType,
    ) -> StreamResult<()> {
        self.subscribe_instrument(Category::Depth, pair, contract_type)
            .await
    }

    /// Subscribe to public trades
    pub async fn subscribe_trade(
        &self,
        pair: &CurrencyPair,
        contract_type: ContractType,
    ) -> StreamResult<()> {
        self.subscribe_instrument(Category::Trade, pair, contract_type)
            .await
    }

    /// Subscribe to candles of the given period
    pub async fn subscribe_kline(
        &self,
        pair: &CurrencyPair,
        contract_type: ContractType,
        period: KlinePeriod,
    ) -> StreamResult<()> {
        self.require_handler(Category::Candle)?;
        let instrument = self.instrument_id(pair, contract_type)?;
        self.subscribe(Topic::kline(contract_type.market(), instrument, period))
            .await
    }

    /// Subscribe to order updates (requires credentials)
    pub async fn subscribe_order(
        &self,
        pair: &CurrencyPair,
        contract_type: ContractType,
    ) -> StreamResult<()> {
        self.subscribe_instrument(Category::Order, pair, contract_type)
            .await
    }

    /// Subscribe to position updates (requires credentials)
    pub async fn subscribe_position(
        &self,
        pair: &CurrencyPair,
        contract_type: ContractType,
    ) -> StreamResult<()> {
        self.subscribe_instrument(Category::Position, pair, contract_type)
            .await
    }

    /// Subscribe to swap account updates (requires credentials)
    ///
    /// Coin-margined accounts are keyed by currency (`BTC`), USDT-margined
    /// ones by `BTC-USDT`.
    pub async fn subscribe_account(&self, currency: &str, usdt_margined: bool) -> StreamResult<()> {
        let currency = currency.to_uppercase();
        let instrument = if usdt_margined {
            format!("{}-USDT", currency)
        } else {
            currency
        };
        self.subscribe(Topic::new(Market::Swap, Category::Account, instrument))
            .await
    }

    /// Close the stream and stop the supervisor
    ///
    /// Pending sends fail; later calls return [`StreamError::Closed`].
    pub async fn close(&self) {
        info!("Closing stream");
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.shutdown_tx.send_replace(true);

        let handle = self.inner.supervisor.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Supervisor task failed: {}", e);
            }
        }
        self.inner.set_state(ConnectionState::Closed);
    }

    async fn subscribe_instrument(
        &self,
        category: Category,
        pair: &CurrencyPair,
        contract_type: ContractType,
    ) -> StreamResult<()> {
        self.require_handler(category)?;
        let instrument = self.instrument_id(pair, contract_type)?;
        self.subscribe(Topic::new(contract_type.market(), category, instrument))
            .await
    }

    fn require_handler(&self, category: Category) -> StreamResult<()> {
        if self.inner.handlers.contains(category) {
            Ok(())
        } else {
            Err(StreamError::NoHandler(category))
        }
    }

    fn instrument_id(&self, pair: &CurrencyPair, contract_type: ContractType) -> StreamResult<String> {
        contract::instrument_id(self.inner.resolver.as_ref(), pair, contract_type).ok_or_else(|| {
            StreamError::UnknownContract {
                pair: pair.clone(),
                contract_type,
            }
        })
    }

    fn ensure_supervisor(&self) -> StreamResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(StreamError::Closed);
        }

        let mut supervisor = self.inner.supervisor.lock();
        if matches!(supervisor.as_ref(), Some(handle) if !handle.is_finished()) {
            return Ok(());
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        *self.inner.outbound_tx.lock() = Some(outbound_tx);
        self.inner.set_state(ConnectionState::Connecting);

        let shutdown_rx = self.inner.shutdown_tx.subscribe();
        let inner = Arc::clone(&self.inner);
        *supervisor = Some(tokio::spawn(inner.supervise(outbound_rx, shutdown_rx)));
        debug!("Supervisor started");
        Ok(())
    }
}

impl Drop for OkexStream {
    fn drop(&mut self) {
        self.inner.shutdown_tx.send_replace(true);
    }
}

impl Inner {
    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("State {:?} -> {:?}", previous, state);
        }
    }

    fn is_running(&self) -> bool {
        matches!(self.supervisor.lock().as_ref(), Some(handle) if !handle.is_finished())
    }

    /// Report an event; dropped while nobody has taken the receiver
    fn emit(&self, event: impl Into<StreamEvent>) {
        let event = event.into();
        if self.event_rx.lock().is_some() {
            trace!("Event receiver not taken, dropping {:?}", event);
            return;
        }
        let _ = self.event_tx.send(event);
    }

    fn set_auth(&self, generation: u64, state: AuthState) {
        *self.auth.write() = AuthStatus { generation, state };
    }

    /// Queue a frame and wait for it to be written
    async fn enqueue(&self, text: String, allowed: fn(ConnectionState) -> bool) -> StreamResult<()> {
        let state = self.state();
        if !allowed(state) {
            return Err(StreamError::NotReady { state });
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        if !self.push(Outbound {
            text,
            ack: Some(ack_tx),
        }) {
            return Err(StreamError::NotReady { state });
        }

        match ack_rx.await {
            Ok(result) => result.map_err(StreamError::from),
            Err(_) => Err(StreamError::NotReady {
                state: self.state(),
            }),
        }
    }

    fn push(&self, outbound: Outbound) -> bool {
        let tx = self.outbound_tx.lock().clone();
        match tx {
            Some(tx) => tx.send(outbound).is_ok(),
            None => false,
        }
    }

    /// Log in on the current connection
    ///
    /// An attempt that already failed on this connection is only repeated
    /// when `retry_failed` is set.
    async fn login(&self, retry_failed: bool) -> StreamResult<()> {
        let credentials = self
            .config
            .credentials
            .as_ref()
            .ok_or(StreamError::NoCredentials)?;

        let _serialized = self.login_lock.lock().await;

        let generation = self.generation.load(Ordering::SeqCst);
        let status = self.auth.read().clone();
        if status.is_authenticated_on(generation) {
            debug!("Already logged in on generation {}", generation);
            return Ok(());
        }
        if let AuthState::Failed(reason) = status.state {
            if status.generation == generation && !retry_failed {
                return Err(StreamError::LoginRejected {
                    code: None,
                    message: reason,
                });
            }
        }

        let state = self.state();
        if !state.is_connected() {
            return Err(StreamError::NotReady { state });
        }

        let request = credentials.login_request()?;
        info!("Logging in (generation {})", generation);
        self.set_auth(generation, AuthState::LoggingIn);

        let pending = self.login_slot.begin();
        let outcome = async {
            self.enqueue(request.to_json().to_string(), ConnectionState::is_connected)
                .await?;
            let ack = pending.wait(self.config.login_timeout).await?;
            if ack.success {
                Ok(())
            } else {
                Err(StreamError::LoginRejected {
                    code: ack.code,
                    message: ack.message.unwrap_or_default(),
                })
            }
        }
        .await;

        match &outcome {
            Ok(()) => self.on_authenticated(generation),
            Err(e) => {
                warn!("Login failed on generation {}: {}", generation, e);
                self.set_auth(generation, AuthState::Failed(e.to_string()));
                self.emit(ConnectionEvent::LoginFailed {
                    generation,
                    reason: e.to_string(),
                });
            }
        }
        outcome
    }

    fn on_authenticated(&self, generation: u64) {
        info!("Logged in (generation {})", generation);
        self.set_auth(generation, AuthState::Authenticated);
        self.emit(ConnectionEvent::Authenticated { generation });

        let current = self.generation.load(Ordering::SeqCst);
        let promoted = self.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Authenticating && current == generation {
                *state = ConnectionState::Ready;
                true
            } else {
                false
            }
        });
        if promoted {
            self.replay_subscriptions();
        }
    }

    fn replay_subscriptions(&self) {
        if !self.config.replay_subscriptions {
            return;
        }

        let (request, count) = {
            let registry = self.subscriptions.read();
            (registry.restoration_request(), registry.len())
        };
        let Some(request) = request else {
            return;
        };

        if self.push(Outbound {
            text: request.to_string(),
            ack: None,
        }) {
            info!("Restoring {} subscriptions", count);
            self.emit(ConnectionEvent::SubscriptionsRestored { count });
        }
    }

    async fn supervise(
        self: Arc<Self>,
        mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let policy = self.config.reconnect.clone();
        let mut failures: u32 = 0;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            self.set_state(ConnectionState::Connecting);
            let mut transport = (self.factory)();
            info!("Connecting to {}", transport.endpoint());

            let connected = tokio::select! {
                result = transport.connect() => result,
                _ = shutdown_rx.changed() => break,
            };

            match connected {
                Ok(()) => {
                    failures = 0;
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    self.on_connected(generation);

                    let result = self
                        .run_connection(transport.as_mut(), &mut outbound_rx, &mut shutdown_rx)
                        .await;
                    self.on_connection_lost(&mut outbound_rx);
                    if let Err(e) = transport.close().await {
                        debug!("Close after disconnect failed: {}", e);
                    }

                    match result {
                        Ok(()) => break,
                        Err(reason) => {
                            warn!("Connection lost: {:?}", reason);
                            self.emit(ConnectionEvent::Disconnected { reason });
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    if !policy.should_retry(failures) {
                        error!(
                            "Reconnection attempts exhausted after {} failures: {}",
                            failures, e
                        );
                        self.emit(ConnectionEvent::ReconnectFailed {
                            error: e.to_string(),
                        });
                        break;
                    }
                    warn!("Connection failed ({} in a row): {}", failures, e);
                }
            }

            self.set_state(ConnectionState::Disconnected);
            self.emit(ConnectionEvent::Reconnecting {
                failures,
                delay: policy.interval,
            });

            tokio::select! {
                _ = tokio::time::sleep(policy.interval) => {}
                _ = shutdown_rx.changed() => break,
            }
        }

        *self.outbound_tx.lock() = None;
        self.on_connection_lost(&mut outbound_rx);
        self.set_state(ConnectionState::Closed);
        info!("Supervisor stopped");
    }

    fn on_connected(self: &Arc<Self>, generation: u64) {
        *self.last_activity.lock() = Some(Instant::now());
        info!("Connected (generation {})", generation);
        self.emit(ConnectionEvent::Connected { generation });

        if self.config.has_credentials() {
            self.set_state(ConnectionState::Authenticating);
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = inner.login(false).await {
                    debug!("Automatic login on generation {} failed: {}", generation, e);
                }
            });
        } else {
            self.set_state(ConnectionState::Ready);
            self.replay_subscriptions();
        }
    }

    fn on_connection_lost(&self, outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>) {
        self.login_slot.cancel();
        *self.last_activity.lock() = None;

        let mut dropped = 0;
        while let Ok(outbound) = outbound_rx.try_recv() {
            if let Some(ack) = outbound.ack {
                let _ = ack.send(Err(TransportError::NotConnected));
            }
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Dropped {} unsent frames", dropped);
        }
    }

    /// Drive one physical connection until it fails or shutdown is requested
    async fn run_connection(
        &self,
        transport: &mut dyn Transport,
        outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), DisconnectReason> {
        let heartbeat = self.config.heartbeat_interval;
        let idle_timeout = self.config.idle_timeout;

        let mut ping_timer = tokio::time::interval_at(Instant::now() + heartbeat, heartbeat);
        ping_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_activity = Instant::now();

        loop {
            let idle_deadline = last_activity + idle_timeout;

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Shutdown requested, closing connection");
                    return Ok(());
                }
                frame = transport.recv() => match frame {
                    Ok(Some(text)) => {
                        last_activity = Instant::now();
                        *self.last_activity.lock() = Some(last_activity);
                        self.handle_frame(&text);
                    }
                    Ok(None) => {
                        info!("Server closed connection");
                        return Err(DisconnectReason::ServerClosed);
                    }
                    Err(e) if e.is_frame_error() => {
                        last_activity = Instant::now();
                        *self.last_activity.lock() = Some(last_activity);
                        warn!("Dropping undecodable frame: {}", e);
                        self.emit(StreamError::Transport(e));
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        return Err(DisconnectReason::NetworkError(e.to_string()));
                    }
                },
                Some(outbound) = outbound_rx.recv() => {
                    trace!("Sending {}", outbound.text);
                    let result = transport.send(&outbound.text).await;
                    let failure = result.as_ref().err().map(|e| e.to_string());
                    if let Some(ack) = outbound.ack {
                        let _ = ack.send(result);
                    }
                    if let Some(e) = failure {
                        return Err(DisconnectReason::NetworkError(e));
                    }
                }
                _ = ping_timer.tick() => {
                    trace!("Sending keep-alive");
                    if let Err(e) = transport.send(PING).await {
                        return Err(DisconnectReason::NetworkError(e.to_string()));
                    }
                }
                _ = tokio::time::sleep_until(idle_deadline) => {
                    warn!("No inbound traffic for {:?}", idle_timeout);
                    return Err(DisconnectReason::IdleTimeout);
                }
            }
        }
    }

    /// Classify and dispatch one inbound frame
    fn handle_frame(&self, text: &str) {
        match channel::classify(text) {
            Ok(Frame::KeepAlive) => trace!("Keep-alive received"),
            Ok(Frame::Subscribed { channel }) => {
                info!("Subscribed to {}", channel.as_deref().unwrap_or("<unnamed>"));
            }
            Ok(Frame::Login(ack)) => {
                if !self.login_slot.resolve(ack) {
                    debug!("Login acknowledgment with no pending login dropped");
                }
            }
            Ok(Frame::ExchangeError { code, message }) => {
                // OKEx rejects logins with an error event, not a login event
                if self
                    .login_slot
                    .resolve(LoginAck::rejected(Some(code.clone()), message.clone()))
                {
                    debug!("Error event failed the pending login");
                }
                warn!("Exchange error {}: {}", code, message);
                self.emit(StreamError::Exchange { code, message });
            }
            Ok(Frame::Table { table, kind, data }) => self.dispatch_table(&table, &kind, &data),
            Err(e) => {
                warn!("Unhandled frame: {}", e);
                self.emit(e);
            }
        }
    }

    fn dispatch_table(&self, table: &str, kind: &TableKind, data: &Value) {
        match decode::decode(kind, data, self.resolver.as_ref()) {
            Ok(events) => {
                for event in events {
                    if !self.handlers.dispatch(event) {
                        debug!("No handler for {} frame on {}", kind.category, table);
                    }
                }
            }
            Err(e) => {
                warn!("Dropping {} frame: {}", table, e);
                self.emit(e);
            }
        }
    }
}
