//! Broadcaster — fans one envelope out to every open connection.

use std::sync::Arc;

use futures_util::future::join_all;
use relay_protocol::{Envelope, encode};
use tracing::{error, warn};

use crate::registry::Registry;

/// Outcome of a single broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was handed to successfully
    pub delivered: usize,
    /// Connections whose send failed (now marked closed)
    pub failed: usize,
}

/// Sends envelopes to all registered connections.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Encode `envelope` once and send it to every open connection in a
    /// registry snapshot.
    ///
    /// Sends run concurrently and each failure is contained to its own
    /// connection. Returns after every send has either succeeded or failed.
    pub async fn broadcast(&self, envelope: &Envelope) -> BroadcastReport {
        let text = match encode(envelope) {
            Ok(text) => text,
            Err(e) => {
                error!("{e}");
                return BroadcastReport::default();
            }
        };

        let targets: Vec<_> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|conn| conn.is_open())
            .collect();

        let results = join_all(targets.iter().map(|conn| {
            let text = text.as_str();
            async move { (conn, conn.send(text).await) }
        }))
        .await;

        let mut report = BroadcastReport::default();
        for (conn, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        connection_id = %conn.id(),
                        kind = %envelope.kind(),
                        "Failed to broadcast: {e}"
                    );
                }
            }
        }
        report
    }
}
