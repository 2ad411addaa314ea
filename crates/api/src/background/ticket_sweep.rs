//! Drops used and lapsed chat tickets so the in-memory map stays small.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ws::TicketStore;

/// How often lapsed tickets are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run(tickets: Arc<TicketStore>, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Ticket sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = tickets.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept chat tickets");
                }
            }
        }
    }
}
