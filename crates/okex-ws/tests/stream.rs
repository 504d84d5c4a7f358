//! Stream behavior against a mock OKEx server

mod common;

use common::*;
use okex_types::{ContractType, CurrencyPair, KlinePeriod, Side};
use okex_ws::transport::{inflate, mock_factory, MockTransport};
use okex_ws::{
    AuthState, ConnectionEvent, ConnectionState, DisconnectReason, OkexStream, ReconnectPolicy,
    StreamError, TransportError,
};
use std::sync::Arc;
use std::time::Duration;

fn btc() -> CurrencyPair {
    CurrencyPair::new("BTC", "USD")
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let (stream, mut servers) = mock_stream(config(), 2);
    let mut events = stream.take_event_receiver().unwrap();

    assert_eq!(stream.connect().await.unwrap(), ConnectionState::Ready);
    assert_eq!(stream.connect().await.unwrap(), ConnectionState::Ready);

    assert_eq!(stream.generation(), 1);
    assert!(sent_frames(&mut servers[0]).is_empty());

    let mut connects = 0;
    while let Ok(event) = events.try_recv() {
        if let Some(ConnectionEvent::Connected { generation }) = event.as_connection() {
            assert_eq!(*generation, 1);
            connects += 1;
        }
    }
    assert_eq!(connects, 1);
}

#[tokio::test]
async fn test_subscribe_ticker() {
    let (stream, mut servers) = mock_stream(config(), 1);
    let (handler, mut tickers) = forward();
    stream.on_ticker(handler);

    stream.subscribe_ticker(&btc(), ContractType::Swap).await.unwrap();

    let frame = next_frame(&mut servers[0]).await;
    assert_eq!(frame["op"], "subscribe");
    assert_eq!(frame["args"][0], "swap/ticker:BTC-USD-SWAP");
    assert_eq!(stream.subscriptions().len(), 1);

    servers[0].push(SUBSCRIBE_ACK);
    servers[0].push(TICKER);

    let ticker = recv(&mut tickers).await;
    assert_eq!(ticker.pair, btc());
    assert_eq!(ticker.contract_alias, "swap");
    assert_eq!(ticker.last, 3640.5);
    assert_eq!(ticker.buy, 3640.4);
    assert_eq!(ticker.sell, 3640.6);
    assert_eq!(ticker.timestamp_ms, 1551775222123);
}

#[tokio::test]
async fn test_depth_asks_sorted_descending() {
    let (stream, servers) = mock_stream(config(), 1);
    let (handler, mut depths) = forward();
    stream.on_depth(handler);
    stream.connect().await.unwrap();

    servers[0].push(DEPTH);
    let depth = recv(&mut depths).await;

    let asks: Vec<f64> = depth.asks.iter().map(|l| l.price).collect();
    assert_eq!(asks, vec![3641.5, 3641.0, 3640.8, 3640.6]);
    let bids: Vec<f64> = depth.bids.iter().map(|l| l.price).collect();
    assert_eq!(bids, vec![3640.4, 3640.1, 3639.8]);

    assert_eq!(depth.best_ask().unwrap().price, 3640.6);
    assert_eq!(depth.best_bid().unwrap().price, 3640.4);
}

#[tokio::test]
async fn test_candle_period_from_table() {
    let (stream, servers) = mock_stream(config(), 1);
    let (handler, mut klines) = forward();
    stream.on_kline(handler);
    stream.connect().await.unwrap();

    servers[0].push_all([SWAP_CANDLE, FUTURES_CANDLE, BAD_PERIOD_CANDLE]);

    let swap = recv(&mut klines).await;
    assert_eq!(swap.period, Some(KlinePeriod::M1));
    assert_eq!(swap.contract_alias, "swap");
    assert_eq!(swap.close, 3645.0);
    assert_eq!(swap.currency_volume, 32.9);

    let futures = recv(&mut klines).await;
    assert_eq!(futures.period, Some(KlinePeriod::M1));
    assert_eq!(futures.pair, btc());
    assert_eq!(futures.contract_alias, "quarter");

    let unknown = recv(&mut klines).await;
    assert_eq!(unknown.period, None);
}

#[tokio::test]
async fn test_malformed_frame_does_not_stop_dispatch() {
    let (stream, servers) = mock_stream(config(), 1);
    let mut events = stream.take_event_receiver().unwrap();
    let (on_ticker, mut tickers) = forward();
    let (on_trade, mut trades) = forward();
    stream.on_ticker(on_ticker);
    stream.on_trade(on_trade);
    stream.connect().await.unwrap();

    servers[0].push_all([TICKER, "{not json", TRADE]);

    recv(&mut tickers).await;
    let trade = recv(&mut trades).await;
    assert_eq!(trade.side, Side::Sell);
    assert_eq!(trade.amount, 12.0);

    assert!(matches!(next_error(&mut events).await, StreamError::Json(_)));
    assert_eq!(stream.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn test_corrupt_compressed_frame_keeps_connection() {
    let (stream, servers) = mock_stream(config(), 2);
    let mut events = stream.take_event_receiver().unwrap();
    let (on_ticker, mut tickers) = forward();
    let (on_trade, mut trades) = forward();
    stream.on_ticker(on_ticker);
    stream.on_trade(on_trade);
    stream.connect().await.unwrap();

    let corrupt = inflate(&[0xff, 0xff, 0xff, 0x00]).unwrap_err();
    servers[0].push(TICKER);
    servers[0].push_error(corrupt);
    servers[0].push(TRADE);

    recv(&mut tickers).await;
    recv(&mut trades).await;

    match next_error(&mut events).await {
        StreamError::Transport(e) => assert!(e.is_frame_error()),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(stream.generation(), 1);
    assert_eq!(stream.state(), ConnectionState::Ready);
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(
            event.as_connection(),
            Some(ConnectionEvent::Disconnected { .. })
        ));
    }
}

#[tokio::test]
async fn test_receive_failure_reconnects() {
    let (stream, servers) = mock_stream(config(), 2);
    let mut events = stream.take_event_receiver().unwrap();
    stream.connect().await.unwrap();

    servers[0].push_error(TransportError::ReceiveFailed("connection reset".into()));

    let disconnected = wait_for_event(&mut events, |e| {
        matches!(e, ConnectionEvent::Disconnected { .. })
    })
    .await;
    assert!(matches!(
        disconnected,
        ConnectionEvent::Disconnected {
            reason: DisconnectReason::NetworkError(_)
        }
    ));
    wait_for_event(&mut events, |e| {
        matches!(e, ConnectionEvent::Connected { generation: 2 })
    })
    .await;
}

#[tokio::test]
async fn test_events_dropped_until_receiver_taken() {
    let (stream, servers) = mock_stream(config(), 1);
    let (handler, mut tickers) = forward();
    stream.on_ticker(handler);
    stream.connect().await.unwrap();

    servers[0].push_all(["{not json", UNKNOWN_TABLE, TICKER]);
    recv(&mut tickers).await;

    let mut events = stream.take_event_receiver().unwrap();
    assert!(events.try_recv().is_err());

    servers[0].push_all([CHANNEL_ERROR, TICKER]);
    recv(&mut tickers).await;
    assert!(matches!(
        queued_errors(&mut events).as_slice(),
        [StreamError::Exchange { .. }]
    ));
}

#[tokio::test]
async fn test_unknown_table_reported() {
    let (stream, servers) = mock_stream(config(), 1);
    let mut events = stream.take_event_receiver().unwrap();
    stream.connect().await.unwrap();

    servers[0].push(UNKNOWN_TABLE);

    match next_error(&mut events).await {
        StreamError::UnknownChannel(table) => assert_eq!(table, "swap/funding_rate"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_exchange_error_reported() {
    let (stream, servers) = mock_stream(config(), 1);
    let mut events = stream.take_event_receiver().unwrap();
    stream.connect().await.unwrap();

    servers[0].push(CHANNEL_ERROR);

    match next_error(&mut events).await {
        StreamError::Exchange { code, message } => {
            assert_eq!(code, "30040");
            assert!(message.contains("doesn't exist"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_keepalive_and_stray_login_ack_ignored() {
    let (stream, servers) = mock_stream(config(), 1);
    let mut events = stream.take_event_receiver().unwrap();
    let (handler, mut tickers) = forward();
    stream.on_ticker(handler);
    stream.connect().await.unwrap();

    servers[0].push_all(["pong", LOGIN_OK, TICKER]);
    recv(&mut tickers).await;

    assert!(queued_errors(&mut events).is_empty());
    assert!(tickers.try_recv().is_err());
    assert!(stream.last_activity().is_some());
}

#[tokio::test]
async fn test_concurrent_logins_send_one_request() {
    let (stream, mut servers) = mock_stream(config().with_credentials(credentials()), 1);
    let stream = Arc::new(stream);

    let first = tokio::spawn({
        let stream = Arc::clone(&stream);
        async move { stream.login().await }
    });
    let second = tokio::spawn({
        let stream = Arc::clone(&stream);
        async move { stream.login().await }
    });

    let frame = next_frame(&mut servers[0]).await;
    assert_eq!(frame["op"], "login");
    assert_eq!(frame["args"][0], "api-key");
    assert_eq!(frame["args"][1], "passphrase");

    servers[0].push(LOGIN_OK);

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    assert_eq!(stream.state(), ConnectionState::Ready);
    assert_eq!(stream.auth_state(), AuthState::Authenticated);

    stream.login().await.unwrap();
    assert!(sent_frames(&mut servers[0])
        .iter()
        .all(|frame| frame["op"] != "login"));
}

#[tokio::test]
async fn test_login_rejected_by_error_event() {
    let (stream, mut servers) = mock_stream(config().with_credentials(credentials()), 1);
    let mut events = stream.take_event_receiver().unwrap();
    let stream = Arc::new(stream);

    let connect = tokio::spawn({
        let stream = Arc::clone(&stream);
        async move { stream.connect().await }
    });

    let frame = next_frame(&mut servers[0]).await;
    assert_eq!(frame["op"], "login");
    servers[0].push(LOGIN_REJECTED);

    let err = connect.await.unwrap().unwrap_err();
    assert!(matches!(err, StreamError::LoginRejected { .. }));
    assert_eq!(stream.state(), ConnectionState::Authenticating);
    assert!(matches!(stream.auth_state(), AuthState::Failed(_)));

    wait_for_event(&mut events, |e| {
        matches!(e, ConnectionEvent::LoginFailed { generation: 1, .. })
    })
    .await;
    assert!(sent_frames(&mut servers[0])
        .iter()
        .all(|frame| frame["op"] != "login"));
}

#[tokio::test]
async fn test_send_requires_ready() {
    let (stream, mut servers) = mock_stream(config().with_credentials(credentials()), 1);
    let stream = Arc::new(stream);

    let connect = tokio::spawn({
        let stream = Arc::clone(&stream);
        async move { stream.connect().await }
    });
    next_frame(&mut servers[0]).await;

    let err = stream.send(r#"{"op":"subscribe","args":[]}"#).await.unwrap_err();
    assert!(matches!(
        err,
        StreamError::NotReady {
            state: ConnectionState::Authenticating
        }
    ));

    servers[0].push(LOGIN_OK);
    assert_eq!(connect.await.unwrap().unwrap(), ConnectionState::Ready);

    stream.send(r#"{"op":"subscribe","args":[]}"#).await.unwrap();
    assert_eq!(next_frame(&mut servers[0]).await["op"], "subscribe");
}

#[tokio::test]
async fn test_private_subscription_after_login() {
    let (stream, mut servers) = mock_stream(config().with_credentials(credentials()), 1);
    stream.on_account(|_| {});
    stream.on_order(|_| {});
    let stream = Arc::new(stream);

    let subscribe = tokio::spawn({
        let stream = Arc::clone(&stream);
        async move { stream.subscribe_account("btc", true).await }
    });

    assert_eq!(next_frame(&mut servers[0]).await["op"], "login");
    servers[0].push(LOGIN_OK);
    subscribe.await.unwrap().unwrap();

    let frame = next_frame(&mut servers[0]).await;
    assert_eq!(frame["args"][0], "swap/account:BTC-USDT");

    stream.subscribe_order(&btc(), ContractType::Quarter).await.unwrap();
    let frame = next_frame(&mut servers[0]).await;
    assert_eq!(frame["args"][0], "futures/order:BTC-USD-190329");
}

#[tokio::test]
async fn test_subscriptions_replayed_after_reconnect() {
    let (stream, mut servers) = mock_stream(config(), 2);
    let mut events = stream.take_event_receiver().unwrap();
    stream.on_ticker(|_| {});
    stream.on_kline(|_| {});

    stream.subscribe_ticker(&btc(), ContractType::Swap).await.unwrap();
    stream
        .subscribe_kline(&btc(), ContractType::Swap, KlinePeriod::M5)
        .await
        .unwrap();
    assert_eq!(sent_frames(&mut servers[0]).len(), 2);

    servers[0].push_close();

    let disconnected = wait_for_event(&mut events, |e| {
        matches!(e, ConnectionEvent::Disconnected { .. })
    })
    .await;
    assert_eq!(
        disconnected,
        ConnectionEvent::Disconnected {
            reason: DisconnectReason::ServerClosed
        }
    );
    wait_for_event(&mut events, |e| {
        matches!(e, ConnectionEvent::SubscriptionsRestored { count: 2 })
    })
    .await;

    let frame = next_frame(&mut servers[1]).await;
    assert_eq!(frame["op"], "subscribe");
    assert_eq!(frame["args"][0], "swap/ticker:BTC-USD-SWAP");
    assert_eq!(frame["args"][1], "swap/candle300s:BTC-USD-SWAP");
    assert_eq!(stream.generation(), 2);
}

#[tokio::test]
async fn test_replay_waits_for_login() {
    let (stream, mut servers) = mock_stream(config().with_credentials(credentials()), 2);
    stream.on_ticker(|_| {});
    let stream = Arc::new(stream);

    let subscribe = tokio::spawn({
        let stream = Arc::clone(&stream);
        async move { stream.subscribe_ticker(&btc(), ContractType::Swap).await }
    });
    assert_eq!(next_frame(&mut servers[0]).await["op"], "login");
    servers[0].push(LOGIN_OK);
    subscribe.await.unwrap().unwrap();
    assert_eq!(next_frame(&mut servers[0]).await["op"], "subscribe");

    servers[0].push_close();

    assert_eq!(next_frame(&mut servers[1]).await["op"], "login");
    assert!(sent_frames(&mut servers[1]).is_empty());
    servers[1].push(LOGIN_OK);

    let frame = next_frame(&mut servers[1]).await;
    assert_eq!(frame["op"], "subscribe");
    assert_eq!(frame["args"][0], "swap/ticker:BTC-USD-SWAP");
}

#[tokio::test(start_paused = true)]
async fn test_idle_connection_is_replaced() {
    let config = config().with_heartbeat(Duration::from_secs(5));
    let (stream, mut servers) = mock_stream(config, 2);
    let mut events = stream.take_event_receiver().unwrap();

    stream.connect().await.unwrap();

    let frame = tokio::time::timeout(WAIT, servers[0].next_sent())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame, "ping");

    let disconnected = wait_for_event(&mut events, |e| {
        matches!(e, ConnectionEvent::Disconnected { .. })
    })
    .await;
    assert_eq!(
        disconnected,
        ConnectionEvent::Disconnected {
            reason: DisconnectReason::IdleTimeout
        }
    );

    wait_for_event(&mut events, |e| {
        matches!(e, ConnectionEvent::Connected { generation: 2 })
    })
    .await;
}

#[tokio::test]
async fn test_reconnect_policy_exhausted() {
    let policy = ReconnectPolicy::new()
        .with_interval(Duration::from_millis(10))
        .with_max_failures(2);
    let (stream, _servers) = mock_stream(config().with_reconnect(policy), 0);
    let mut events = stream.take_event_receiver().unwrap();

    let err = stream.connect().await.unwrap_err();
    assert!(matches!(err, StreamError::ReconnectExhausted { failures: 2 }));
    assert_eq!(stream.state(), ConnectionState::Closed);

    wait_for_event(&mut events, |e| {
        matches!(e, ConnectionEvent::ReconnectFailed { .. })
    })
    .await;
}

#[tokio::test]
async fn test_failed_subscribe_is_rolled_back() {
    let (mut transport, _server) = MockTransport::new("mock://okex/0");
    transport.fail_send = true;
    let stream = OkexStream::with_transport(
        config().with_reconnect(ReconnectPolicy::disabled()),
        contracts(),
        mock_factory(vec![transport]),
    );
    stream.on_ticker(|_| {});

    let err = stream
        .subscribe_ticker(&btc(), ContractType::Swap)
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::Transport(_)));
    assert!(stream.subscriptions().is_empty());
}

#[tokio::test]
async fn test_close_stops_stream() {
    let (stream, _servers) = mock_stream(config(), 1);
    stream.on_ticker(|_| {});
    stream.connect().await.unwrap();

    stream.close().await;
    assert_eq!(stream.state(), ConnectionState::Closed);

    assert!(matches!(stream.send("ping").await, Err(StreamError::Closed)));
    assert!(matches!(
        stream.subscribe_ticker(&btc(), ContractType::Swap).await,
        Err(StreamError::Closed)
    ));
}
