use crate::transport::DirectConnection;
use bytes::Bytes;
use futures::future::join_all;
use parking_lot::RwLock;
use relaymesh_core::PeerId;
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Clone)]
pub struct RegistryEntry {
    pub peer_id: PeerId,
    pub connection: Arc<dyn DirectConnection>,
}

/// Outcome of a broadcast, per peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<PeerId>,
    pub failed: Vec<PeerId>,
}

impl BroadcastReport {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.failed.is_empty()
    }
}

/// Open direct connections, in the order they opened.
///
/// The lock is only held to mutate or snapshot the list; sends happen on the
/// snapshot.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<Vec<RegistryEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `peer_id`. A peer that is already present keeps its position
    /// and gets the new connection.
    pub fn add(&self, peer_id: PeerId, connection: Arc<dyn DirectConnection>) {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|entry| entry.peer_id == peer_id) {
            Some(entry) => entry.connection = connection,
            None => entries.push(RegistryEntry {
                peer_id,
                connection,
            }),
        }
    }

    /// Removes `peer_id` keeping the order of the others. Absent peers are a
    /// no-op.
    pub fn remove(&self, peer_id: &PeerId) -> Option<Arc<dyn DirectConnection>> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|entry| entry.peer_id == *peer_id)?;
        Some(entries.remove(index).connection)
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<Arc<dyn DirectConnection>> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.peer_id == *peer_id)
            .map(|entry| entry.connection.clone())
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.entries
            .read()
            .iter()
            .any(|entry| entry.peer_id == *peer_id)
    }

    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.peer_id.clone())
            .collect()
    }

    fn snapshot(&self) -> Vec<RegistryEntry> {
        self.entries.read().clone()
    }

    /// Sends `data` over every registered connection. A failing connection is
    /// reported and does not stop delivery to the others.
    pub async fn broadcast(&self, data: Bytes) -> BroadcastReport {
        let entries = self.snapshot();

        let sends = entries.iter().map(|entry| {
            let data = data.clone();
            async move { entry.connection.send(data).await }
        });
        let results = join_all(sends).await;

        let mut report = BroadcastReport::default();
        for (entry, result) in entries.into_iter().zip(results) {
            match result {
                Ok(()) => report.delivered.push(entry.peer_id),
                Err(e) => {
                    error!("Broadcast to {} failed: {}", entry.peer_id, e);
                    report.failed.push(entry.peer_id);
                }
            }
        }
        debug!(
            "Broadcast delivered to {} peer(s), {} failed",
            report.delivered.len(),
            report.failed.len()
        );
        report
    }
}
