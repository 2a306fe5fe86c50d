//! Hand-off between in-memory state and a persistence backend.
//!
//! Mutations push [`PersistRequest`]s onto an unbounded channel and return
//! immediately. A worker task drains the channel into a [`LedgerStore`].
//! A failed write is logged and counted; the in-memory state stays as it is.

mod memory;
mod snapshot;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::id::FactionId;
use crate::model::{Faction, Land, LandKey, Relation};

pub use memory::MemoryStore;
pub use snapshot::LedgerSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub enum PersistRequest {
    SaveLand(Land),
    DeleteLand(LandKey),
    SaveFaction(Faction),
    DeleteFaction(FactionId),
    SaveRelation(Relation),
    DeleteRelation(FactionId, FactionId),
}

/// A backend that owns the stored schema.
pub trait LedgerStore: Send + Sync + 'static {
    fn save_land(&self, land: &Land) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn delete_land(&self, key: &LandKey) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn save_faction(&self, faction: &Faction)
    -> impl Future<Output = Result<(), StoreError>> + Send;
    fn delete_faction(&self, id: FactionId)
    -> impl Future<Output = Result<(), StoreError>> + Send;
    fn save_relation(&self, relation: &Relation)
    -> impl Future<Output = Result<(), StoreError>> + Send;
    fn delete_relation(
        &self,
        one: FactionId,
        two: FactionId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Sending half of the persistence channel. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct PersistQueue {
    tx: Option<UnboundedSender<PersistRequest>>,
}

impl PersistQueue {
    pub fn channel() -> (Self, UnboundedReceiver<PersistRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A queue that drops every request. For purely in-memory use.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Hand a request off without waiting.
    pub fn send(&self, request: PersistRequest) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(request).is_err() {
            tracing::warn!("persistence worker has stopped, dropping request");
        }
    }
}

/// Totals reported by a store worker once its channel closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub applied: u64,
    pub failed: u64,
}

async fn apply<S: LedgerStore>(store: &S, request: &PersistRequest) -> Result<(), StoreError> {
    match request {
        PersistRequest::SaveLand(land) => store.save_land(land).await,
        PersistRequest::DeleteLand(key) => store.delete_land(key).await,
        PersistRequest::SaveFaction(faction) => store.save_faction(faction).await,
        PersistRequest::DeleteFaction(id) => store.delete_faction(*id).await,
        PersistRequest::SaveRelation(relation) => store.save_relation(relation).await,
        PersistRequest::DeleteRelation(one, two) => store.delete_relation(*one, *two).await,
    }
}

/// Drain `rx` into `store` until every sender is dropped.
pub async fn run_store_worker<S: LedgerStore>(
    mut rx: UnboundedReceiver<PersistRequest>,
    store: Arc<S>,
) -> StoreStats {
    let mut stats = StoreStats::default();
    while let Some(request) = rx.recv().await {
        match apply(store.as_ref(), &request).await {
            Ok(()) => stats.applied += 1,
            Err(err) => {
                stats.failed += 1;
                tracing::error!(?request, %err, "persistence request failed");
            }
        }
    }
    tracing::debug!(applied = stats.applied, failed = stats.failed, "store worker finished");
    stats
}

pub fn spawn_store_worker<S: LedgerStore>(
    rx: UnboundedReceiver<PersistRequest>,
    store: Arc<S>,
) -> JoinHandle<StoreStats> {
    tokio::spawn(run_store_worker(rx, store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn worker_applies_requests_in_order() {
        let (queue, rx) = PersistQueue::channel();
        let store = Arc::new(MemoryStore::new());
        let key = LandKey::new(0, 0, "world", 0);
        let mut land = Land::new(key.clone());
        land.claim(FactionId::new(3));

        queue.send(PersistRequest::SaveLand(land.clone()));
        queue.send(PersistRequest::DeleteLand(key.clone()));
        queue.send(PersistRequest::SaveLand(land));
        drop(queue);

        let stats = run_store_worker(rx, store.clone()).await;
        assert_eq!(stats, StoreStats { applied: 3, failed: 0 });
        assert_eq!(store.land(&key).map(|l| l.claimer_id()), Some(FactionId::new(3)));
    }

    #[tokio::test]
    async fn failures_are_counted_not_fatal() {
        let (queue, rx) = PersistQueue::channel();
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        queue.send(PersistRequest::DeleteFaction(FactionId::new(9)));
        queue.send(PersistRequest::DeleteFaction(FactionId::new(10)));
        drop(queue);

        let stats = spawn_store_worker(rx, store).await.unwrap();
        assert_eq!(stats, StoreStats { applied: 0, failed: 2 });
    }

    #[test]
    fn disabled_queue_drops_silently() {
        let queue = PersistQueue::disabled();
        queue.send(PersistRequest::DeleteFaction(FactionId::new(2)));
    }

    #[test]
    fn send_after_worker_gone_does_not_panic() {
        let (queue, rx) = PersistQueue::channel();
        drop(rx);
        queue.send(PersistRequest::DeleteFaction(FactionId::new(2)));
    }
}
