//! Registry — the live set of client connections.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use relay_transport::Outbound;
use tracing::debug;

use crate::connection::Connection;

/// Concurrent map of connection ID → [`Connection`].
///
/// This is the only shared mutable structure in the relay. Callers never
/// lock it themselves; every method takes `&self` and completes without
/// awaiting, so no shard lock is held across a suspension point.
#[derive(Default)]
pub struct Registry {
    connections: DashMap<String, Arc<Connection>>,
    next_seq: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection under a fresh ID. Visible to broadcasts and
    /// roster queries as soon as this returns.
    pub fn admit(&self, outbound: Arc<dyn Outbound>) -> Arc<Connection> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = self.connections.entry(id.clone()) {
                let connection = Arc::new(Connection::new(id, seq, outbound));
                slot.insert(connection.clone());
                debug!(connection_id = %connection.id(), "Connection admitted");
                return connection;
            }
        }
    }

    /// Remove a connection. Removing an unknown ID is a no-op.
    pub fn evict(&self, connection_id: &str) -> Option<Arc<Connection>> {
        let removed = self.connections.remove(connection_id).map(|(_, conn)| conn);
        if removed.is_some() {
            debug!(connection_id, "Connection evicted");
        }
        removed
    }

    pub fn get(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(connection_id).map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of every registered connection, ordered by
    /// admission.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        let mut connections: Vec<_> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        connections.sort_by_key(|conn| conn.seq());
        connections
    }

    /// Distinct, non-empty display names of registered connections, in
    /// admission order.
    pub fn named_users(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.snapshot()
            .iter()
            .filter_map(|conn| conn.display_name())
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.to_string()))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
