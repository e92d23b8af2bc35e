use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{error, info};

use crate::storage::Storage;

/// Periodically moves open invoices past their due date to `Overdue`.
///
/// Cloning yields a handle to the same sweeper, so one clone can run
/// [`start`](Self::start) on a task while another calls [`stop`](Self::stop).
#[derive(Clone)]
pub struct OverdueSweeper {
    storage: Arc<dyn Storage>,

    /// Time between sweeps
    interval: Duration,

    running: Arc<RwLock<bool>>,
}

impl OverdueSweeper {
    /// Creates a stopped sweeper.
    ///
    /// # Arguments
    ///
    /// * `storage` - Store whose invoices are swept
    /// * `interval_seconds` - Pause between sweeps, at least one second
    ///
    /// # Returns
    ///
    /// Returns a new `OverdueSweeper`; call [`start`](Self::start) to run it.
    pub fn new(storage: Arc<dyn Storage>, interval_seconds: u64) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(interval_seconds.max(1)),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Runs sweeps until [`stop`](Self::stop) is called.
    ///
    /// A failed sweep is logged and the loop carries on.
    pub async fn start(self) {
        *self.running.write().await = true;
        info!(interval_seconds = self.interval.as_secs(), "Overdue sweeper started");

        while *self.running.read().await {
            match self.sweep_once().await {
                Ok(0) => {}
                Ok(count) => info!("Marked {} invoice(s) overdue", count),
                Err(e) => error!("Overdue sweep failed: {}", e),
            }

            sleep(self.interval).await;
        }

        info!("Overdue sweeper stopped");
    }

    /// Makes the loop exit after its current iteration.
    pub async fn stop(&self) {
        info!("Stopping overdue sweeper...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Runs a single sweep against the store's current date.
    ///
    /// # Returns
    ///
    /// Returns the number of invoices that became overdue.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to mark invoices.
    pub async fn sweep_once(&self) -> anyhow::Result<usize> {
        let today = self.storage.today();
        let overdue = self.storage.mark_overdue_invoices(today).await?;
        for invoice in &overdue {
            info!(
                invoice = %invoice.invoice_number,
                due_date = %invoice.due_date,
                balance = %invoice.balance(),
                "Invoice is overdue"
            );
        }
        Ok(overdue.len())
    }
}
