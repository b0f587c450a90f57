//! Pulls candidates from the supplier and feeds them to the worker, one at a
//! time, skipping anything the ledger has already seen.

use super::ledger::DedupLedger;
use super::worker::{AttemptStatus, PurchaseWorker};
use crate::datasource::{TokenCandidate, TokenSupplier};
use crate::telegram::ChatTransport;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::watch;

pub struct Orchestrator<T: ChatTransport> {
    worker: PurchaseWorker<T>,
    supplier: Box<dyn TokenSupplier>,
    ledger: DedupLedger,
    attempt_deadline: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<T: ChatTransport> Orchestrator<T> {
    pub fn new(
        worker: PurchaseWorker<T>,
        supplier: Box<dyn TokenSupplier>,
        attempt_deadline: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            worker,
            supplier,
            ledger: DedupLedger::new(),
            attempt_deadline,
            shutdown,
        }
    }

    /// Runs until the supplier closes or shutdown is signalled. Candidates
    /// within a batch are processed strictly in order, one attempt at a time.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let batch = tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("stopping orchestrator");
                    return Ok(());
                }
                batch = self.supplier.retrieve() => batch?,
            };

            let Some(candidates) = batch else {
                tracing::info!("token supplier closed");
                return Ok(());
            };

            for candidate in candidates {
                if *self.shutdown.borrow() {
                    tracing::info!("stopping orchestrator");
                    return Ok(());
                }
                self.process(&candidate).await;
            }
        }
    }

    async fn process(&mut self, candidate: &TokenCandidate) {
        if let Some(status) = self.ledger.get(&candidate.address) {
            tracing::info!("token already bought: {} ({})", candidate.address, status);
            return;
        }

        let attempt = self.worker.attempt(candidate, self.attempt_deadline).await;
        match attempt.status {
            AttemptStatus::Succeeded => {
                tracing::info!("token bought: {}", attempt.token);
            }
            status => {
                tracing::error!(
                    "failed to buy token {} ({}): {}",
                    attempt.token,
                    status,
                    attempt.reason.as_deref().unwrap_or("no reason"),
                );
            }
        }
        self.ledger.record(&attempt.token, attempt.status);
    }

    #[cfg(test)]
    pub(crate) fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }
}
