use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, watch};

use candle_stream::aggregator::Aggregator;
use candle_stream::binance::rest::BinanceRestClient;
use candle_stream::config::Config;
use candle_stream::event::FeedEvent;
use candle_stream::model::candle::Candle;
use candle_stream::model::tick::Tick;
use candle_stream::pyth::ws::PythWsClient;
use candle_stream::source::{unix_ms, HistoryRequest};
use candle_stream::window::CandleWindow;

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(&config.logging.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let duration_ms = config.candle_duration_ms()?;
    tracing::info!(
        symbol = %config.binance.symbol,
        asset = %config.pyth.asset,
        interval = %config.binance.kline_interval,
        window = config.window.size,
        "Starting candle-stream"
    );

    let window = CandleWindow::new(duration_ms, config.window.size)
        .with_stale_policy(config.window.stale_ticks);
    let mut aggregator = Aggregator::new(window).with_indicators(config.indicators.clone());

    // History must be in the window before the first live tick is applied.
    let rest = BinanceRestClient::new(&config.binance.rest_base_url);
    let now_ms = unix_ms(chrono::Utc::now())?;
    let request = HistoryRequest::ending_at(
        &config.binance.symbol,
        &config.binance.kline_interval,
        duration_ms,
        config.window.size,
        now_ms,
    );
    if let Err(e) = aggregator.seed_from(&rest, &request).await {
        tracing::error!(error = %e, "Seeding failed; live ticks will be dropped");
    }

    let (tick_tx, tick_rx) = mpsc::channel::<Tick>(config.window.tick_buffer);
    let (status_tx, mut status_rx) = mpsc::channel::<FeedEvent>(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (snapshot_tx, mut snapshot_rx) = watch::channel::<Vec<Candle>>(Vec::new());

    let feed = PythWsClient::new(&config.pyth.ws_url, &config.pyth.price_feed_id);
    let feed_shutdown = shutdown_rx.clone();
    let feed_handle = tokio::spawn(async move {
        if let Err(e) = feed.connect_and_run(tick_tx, status_tx, feed_shutdown).await {
            tracing::warn!(error = %e, "Price feed task failed");
        }
    });

    tokio::spawn(async move {
        while let Some(event) = status_rx.recv().await {
            match event {
                FeedEvent::WsStatus(status) => tracing::info!(?status, "Feed status"),
                FeedEvent::LogMessage(msg) => tracing::info!("{}", msg),
            }
        }
    });

    let aggregator_handle = tokio::spawn(aggregator.run(tick_rx, snapshot_tx, shutdown_rx));

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("failed to listen for Ctrl+C")?;
                tracing::info!("Ctrl+C received");
                break;
            }
            changed = snapshot_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshot_rx.borrow_and_update();
                if let Some(last) = snapshot.last() {
                    tracing::trace!(len = snapshot.len(), last = %last, "Window updated");
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let window = aggregator_handle
        .await
        .context("aggregator task panicked")?;
    let _ = feed_handle.await;

    tracing::info!(len = window.len(), "Final candle window (open time - O - H - L - C)");
    for candle in window.iter() {
        let side = if candle.is_bullish() { "bull" } else { "bear" };
        tracing::info!("{} {}", candle, side);
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
