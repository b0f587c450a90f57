//! Purchase pipeline: supplier → orchestrator → worker → transport.

pub mod classify;
pub mod ledger;
pub mod orchestrator;
pub mod retry;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::Config;
use crate::datasource::{ConsoleSupplier, FeedHandle, HttpSupplier, TokenSupplier};
use crate::telegram::{self, TelegramTransport};
use anyhow::{Context, Result};
use orchestrator::Orchestrator;
use std::time::Duration;
use tokio::sync::watch;
use worker::{InlineAction, PurchaseWorker, WorkerConfig};

/// Hard ceiling on one purchase attempt, from send to terminal status.
const ATTEMPT_DEADLINE: Duration = Duration::from_secs(75);

/// How long to wait for the feed poller to wind down on exit.
const FEED_STOP_TIMEOUT: Duration = Duration::from_secs(15);

/// Wires everything together and runs until the supplier closes or Ctrl-C.
pub async fn async_main(config: Config, autobuy: bool) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received interrupt signal");
            let _ = shutdown_tx.send(true);
        }
    });

    // Reject a broken feed config up front, before login runs and the
    // session file is written.
    let datasource = if autobuy {
        let datasource = config
            .validate_feed()
            .context("autobuy mode requires a valid [datasource] section in the config")?;
        Some(datasource.clone())
    } else {
        None
    };

    tracing::info!("{}", config.telegram);
    let client = telegram::connect(&config.telegram).await?;
    let peer = telegram::find_contact(&client, &config.telegram.contact_name).await?;
    let transport = TelegramTransport::new(client, peer);
    tracing::info!("sending buys to {}", transport.peer_name());

    let (supplier, feed): (Box<dyn TokenSupplier>, Option<FeedHandle>) = match datasource {
        Some(datasource) => {
            tracing::info!("{}", datasource);
            let (supplier, handle) = HttpSupplier::start(datasource)?;
            (Box::new(supplier), Some(handle))
        }
        None => (Box::new(ConsoleSupplier::new()), None),
    };

    let worker_config = WorkerConfig {
        inline_action: config.telegram.buy_button.map(|b| InlineAction {
            row: b.row,
            col: b.col,
            marker: b.marker,
        }),
        ..WorkerConfig::default()
    };
    let worker = PurchaseWorker::new(transport, worker_config, shutdown_rx.clone());
    let mut orchestrator =
        Orchestrator::new(worker, supplier, ATTEMPT_DEADLINE, shutdown_rx);

    let outcome = orchestrator.run().await;

    if let Some(handle) = feed {
        handle.stop(FEED_STOP_TIMEOUT).await;
    }
    outcome
}
