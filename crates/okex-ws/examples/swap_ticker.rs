//! Simple example: stream BTC swap tickers and one-minute candles
//!
//! Run with: cargo run -p okex-ws --example swap_ticker

use okex_types::{ContractType, CurrencyPair, KlinePeriod};
use okex_ws::{ConnectionEvent, OkexStream, StreamConfig, StreamEvent};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let stream = OkexStream::new(StreamConfig::default());
    let mut events = stream.take_event_receiver().ok_or("event receiver taken")?;

    stream.on_ticker(|t| {
        println!(
            "{} {}: last={:.2} bid={:.2} ask={:.2} spread={:.2}",
            t.pair,
            t.contract_alias,
            t.last,
            t.buy,
            t.sell,
            t.spread()
        );
    });
    stream.on_kline(|k| {
        println!(
            "{} candle {:?}: o={:.2} h={:.2} l={:.2} c={:.2} v={}",
            k.pair, k.period, k.open, k.high, k.low, k.close, k.volume
        );
    });

    println!("Connecting to OKEx WebSocket API...");
    let btc = CurrencyPair::new("BTC", "USD");
    stream.subscribe_ticker(&btc, ContractType::Swap).await?;
    stream
        .subscribe_kline(&btc, ContractType::Swap, KlinePeriod::M1)
        .await?;
    println!("Subscribed to {:?}", stream.subscriptions());

    // Process events for 30 seconds
    let timeout = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            _ = &mut timeout => {
                println!("\nTimeout reached. Shutting down...");
                break;
            }
            event = events.recv() => match event {
                Some(StreamEvent::Connection(ConnectionEvent::Disconnected { reason })) => {
                    println!("Disconnected: {:?}", reason);
                }
                Some(StreamEvent::Connection(ConnectionEvent::SubscriptionsRestored { count })) => {
                    println!("Restored {} subscriptions", count);
                }
                Some(StreamEvent::Error(e)) => eprintln!("Stream error: {}", e),
                Some(_) => {}
                None => break,
            }
        }
    }

    stream.close().await;
    Ok(())
}
