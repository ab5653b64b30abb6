use log::*;
use recon_engine::{ReconciliationApi, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::{config::PollConfig, integrations::provider::ProviderStatusSource};

/// Starts the poll worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `config.interval`, up to `config.batch_size` open transactions are polled, least recently polled first. The
/// results go through the same reconciliation path as webhook calls.
pub fn start_poll_worker(
    api: ReconciliationApi<SqliteDatabase>,
    provider: ProviderStatusSource,
    config: PollConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(config.interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("🕰️ Poll worker started. Polling up to {} orders every {}s", config.batch_size, config.interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🕰️ Running poll sweep");
            match api.poll_open_transactions(&provider, config.batch_size).await {
                Ok(summary) if summary.polled == 0 => trace!("🕰️ No open transactions to poll"),
                Ok(summary) => {
                    info!(
                        "🕰️ Polled {} orders. {} advanced, {} failed",
                        summary.polled, summary.advanced, summary.failed
                    );
                },
                Err(e) => {
                    error!("🕰️ Error running poll sweep: {e}");
                },
            }
        }
    })
}
