//! Feed-driven supplier: a background task polls a remote HTTP endpoint on a
//! fixed interval and appends extracted token addresses into a shared
//! [`CandidateQueue`]; `retrieve` drains that queue on its own cadence.

use super::{CandidateQueue, TokenCandidate, TokenSupplier};
use crate::config::DataSourceConfig;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::{self, MissedTickBehavior};

const DRAIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct HttpSupplier {
    queue: CandidateQueue,
    ticker: time::Interval,
}

/// Handle for stopping the background poller. Dropping the poller's side of
/// `done` signals completion; `stop` waits for that under a caller timeout.
pub struct FeedHandle {
    stop: watch::Sender<bool>,
    done: oneshot::Receiver<()>,
}

impl FeedHandle {
    pub async fn stop(self, timeout: Duration) {
        tracing::info!("stopping http data source");
        let _ = self.stop.send(true);

        // The receiver resolves (with an error) once the poll task drops its
        // sender half; a timeout means the task never wound down.
        if time::timeout(timeout, self.done).await.is_err() {
            tracing::error!("http data source did not stop within {:?}", timeout);
        }
    }
}

impl HttpSupplier {
    /// Validates the feed config and spawns the background poller.
    pub fn start(config: DataSourceConfig) -> Result<(HttpSupplier, FeedHandle)> {
        config.validate()?;
        let interval = config.interval()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_bytes(config.auth.name.as_bytes())?,
            HeaderValue::from_str(&config.auth.value)?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base = if config.host.contains("://") {
            config.host.clone()
        } else {
            format!("http://{}", config.host)
        };
        let url = format!("{}:{}/{}", base, config.port, config.method);

        let queue = CandidateQueue::new();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();

        tracing::info!("starting http data source");
        tokio::spawn(poll_feed(
            client,
            url,
            config.params.into_iter().collect(),
            config.token_path,
            interval,
            queue.clone(),
            stop_rx,
            done_tx,
        ));

        let mut ticker = time::interval(DRAIN_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let supplier = HttpSupplier { queue, ticker };
        let handle = FeedHandle {
            stop: stop_tx,
            done: done_rx,
        };
        Ok((supplier, handle))
    }
}

#[async_trait]
impl TokenSupplier for HttpSupplier {
    async fn retrieve(&mut self) -> Result<Option<Vec<TokenCandidate>>> {
        self.ticker.tick().await;
        Ok(Some(self.queue.drain().await))
    }
}

#[allow(clippy::too_many_arguments)]
async fn poll_feed(
    client: reqwest::Client,
    url: String,
    params: Vec<(String, String)>,
    token_path: String,
    interval: Duration,
    queue: CandidateQueue,
    mut stop: watch::Receiver<bool>,
    done: oneshot::Sender<()>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // first tick completes immediately

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                match fetch_feed(&client, &url, &params).await {
                    Ok(items) => {
                        let tokens = extract_tokens(&items, &token_path);
                        if !tokens.is_empty() {
                            queue.push_all(tokens.into_iter().map(TokenCandidate::new)).await;
                        }
                    }
                    Err(e) => tracing::error!("feed request failed: {}", e),
                }
            }
        }
    }

    drop(done);
}

async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    params: &[(String, String)],
) -> Result<Vec<serde_json::Value>> {
    let response = client.get(url).query(params).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("unexpected status code: {}", response.status());
    }
    Ok(response.json().await?)
}

/// Pulls one token string out of each feed item; malformed items are skipped
/// with a warning, never fatal.
fn extract_tokens(items: &[serde_json::Value], token_path: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for item in items {
        let Some(object) = item.as_object() else {
            tracing::warn!("feed item is not an object: {}", item);
            continue;
        };
        match object.get(token_path) {
            Some(serde_json::Value::String(token)) => tokens.push(token.clone()),
            Some(other) => tracing::warn!("token field is not a string: {}", other),
            None => tracing::warn!("token field {:?} missing in feed item", token_path),
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_token_per_item() {
        let items = vec![
            json!({"address": "AAA", "symbol": "A"}),
            json!({"address": "BBB"}),
        ];
        assert_eq!(extract_tokens(&items, "address"), ["AAA", "BBB"]);
    }

    #[test]
    fn skips_malformed_items() {
        let items = vec![
            json!("not an object"),
            json!({"address": 42}),
            json!({"other": "CCC"}),
            json!({"address": "DDD"}),
        ];
        assert_eq!(extract_tokens(&items, "address"), ["DDD"]);
    }

    #[test]
    fn empty_feed_yields_no_tokens() {
        assert!(extract_tokens(&[], "address").is_empty());
    }
}
