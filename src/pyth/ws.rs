use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;

use super::types::{parse_price_update, PythSubscribe};
use crate::event::{FeedEvent, WsConnectionStatus};
use crate::model::tick::Tick;

/// Exponential backoff for reconnection.
#[derive(Debug)]
pub struct ExponentialBackoff {
    current: Duration,
    initial: Duration,
    max: Duration,
    factor: f64,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            current: initial,
            initial,
            max,
            factor,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64()),
        );
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Live price stream for a single Pyth feed via Hermes.
pub struct PythWsClient {
    url: String,
    price_feed_id: String,
}

impl PythWsClient {
    pub fn new(ws_url: &str, price_feed_id: &str) -> Self {
        Self {
            url: ws_url.to_string(),
            price_feed_id: price_feed_id.to_string(),
        }
    }

    /// Connect, subscribe and forward ticks until shutdown, reconnecting on
    /// failure. Status changes go to `status_tx`, prices to `tick_tx`.
    pub async fn connect_and_run(
        &self,
        tick_tx: mpsc::Sender<Tick>,
        status_tx: mpsc::Sender<FeedEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            2.0,
        );
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self
                .connect_once(&tick_tx, &status_tx, &mut shutdown, &mut backoff)
                .await
            {
                Ok(()) => {
                    // Clean shutdown requested
                    let _ = status_tx
                        .send(FeedEvent::WsStatus(WsConnectionStatus::Disconnected))
                        .await;
                    break;
                }
                Err(e) => {
                    let _ = status_tx
                        .send(FeedEvent::WsStatus(WsConnectionStatus::Disconnected))
                        .await;
                    let _ = status_tx
                        .send(FeedEvent::LogMessage(format!("WS error: {:#}", e)))
                        .await;
                    if tick_tx.is_closed() {
                        break;
                    }

                    let delay = backoff.next_delay();
                    let _ = status_tx
                        .send(FeedEvent::WsStatus(WsConnectionStatus::Reconnecting {
                            attempt,
                            delay_ms: delay.as_millis() as u64,
                        }))
                        .await;

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => continue,
                        _ = shutdown.changed() => {
                            let _ = status_tx
                                .send(FeedEvent::LogMessage("Shutdown during reconnect".to_string()))
                                .await;
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn connect_once(
        &self,
        tick_tx: &mpsc::Sender<Tick>,
        status_tx: &mpsc::Sender<FeedEvent>,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut ExponentialBackoff,
    ) -> Result<()> {
        let _ = status_tx
            .send(FeedEvent::LogMessage(format!("Connecting to {}", self.url)))
            .await;

        let (ws_stream, _resp) = tokio_tungstenite::connect_async(&self.url)
            .await
            .context("WebSocket connect failed")?;

        let _ = status_tx
            .send(FeedEvent::WsStatus(WsConnectionStatus::Connected))
            .await;

        let (mut write, mut read) = ws_stream.split();

        let subscribe = serde_json::to_string(&PythSubscribe::new(vec![self.price_feed_id.as_str()]))?;
        write
            .send(tungstenite::Message::Text(subscribe))
            .await
            .context("subscribe send failed")?;
        backoff.reset();
        tracing::info!(feed_id = %self.price_feed_id, "Subscribed to price updates");

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            match parse_price_update(&text, &self.price_feed_id) {
                                Ok(Some(tick)) => {
                                    match tick_tx.try_send(tick) {
                                        Ok(()) => {}
                                        Err(mpsc::error::TrySendError::Full(_)) => {
                                            tracing::warn!("Tick channel full, dropping tick");
                                        }
                                        Err(mpsc::error::TrySendError::Closed(_)) => {
                                            return Err(anyhow::anyhow!("tick receiver dropped"));
                                        }
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    tracing::debug!(error = %e, "Failed to parse WS message");
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            return Err(anyhow::anyhow!("WebSocket closed by server: {:?}", frame));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(anyhow::anyhow!("WebSocket read error: {}", e));
                        }
                        None => {
                            return Err(anyhow::anyhow!("WebSocket stream ended"));
                        }
                    }
                }
                _ = shutdown.changed() => {
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_cap_then_resets() {
        let mut b = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(4), 2.0);
        assert_eq!(b.next_delay(), Duration::from_secs(1));
        assert_eq!(b.next_delay(), Duration::from_secs(2));
        assert_eq!(b.next_delay(), Duration::from_secs(4));
        assert_eq!(b.next_delay(), Duration::from_secs(4));
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_secs(1));
    }
}
