//! Periodic retention sweep over the backup index.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use super::DatasetStore;

pub struct RetentionSweeper {
    store: Arc<DatasetStore>,
    period: Duration,
    shutdown_rx: watch::Receiver<()>,
}

impl RetentionSweeper {
    pub fn new(store: Arc<DatasetStore>, period: Duration, shutdown_rx: watch::Receiver<()>) -> Self {
        Self {
            store,
            period,
            shutdown_rx,
        }
    }

    /// Sweep every `period` until the shutdown channel fires or closes.
    pub async fn run(mut self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                },
                _ = self.shutdown_rx.changed() => {
                    info!("Retention sweeper shutting down.");
                    break;
                }
            }
        }
    }

    async fn sweep_once(&self) {
        match self.store.sweep_backups().await {
            Ok(report) if !report.evicted.is_empty() => {
                info!("Scheduled sweep evicted {} backups", report.evicted.len());
            }
            Ok(_) => {}
            Err(e) => warn!("Scheduled retention sweep failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{KvStore, MemoryKv};
    use crate::store::{BACKUP_INDEX_KEY, MAX_BACKUPS};

    #[tokio::test]
    async fn test_sweeper_trims_and_stops_on_shutdown() {
        let kv = Arc::new(MemoryKv::new());
        let keys: Vec<String> = (0..12).map(|i| format!("backup:{}", 9_000 - i)).collect();
        for key in &keys {
            kv.put(key, "{}").await.unwrap();
        }
        kv.put(BACKUP_INDEX_KEY, &serde_json::to_string(&keys).unwrap())
            .await
            .unwrap();

        let store = Arc::new(DatasetStore::new(kv.clone()));
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let sweeper = RetentionSweeper::new(store.clone(), Duration::from_millis(20), shutdown_rx);
        let handle = tokio::spawn(sweeper.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.list_backups().await.unwrap().len(), MAX_BACKUPS);
        assert!(kv.get("backup:8989").await.unwrap().is_none());

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
