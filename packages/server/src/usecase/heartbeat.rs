//! UseCase: 死活監視
//!
//! 一定間隔で全接続を巡回し、開いている接続には Ping フレームを送り、
//! 閉じている接続はセッションごとレジストリから取り除く。
//! Pong の未着回数は数えない（閉じた接続の掃除のみ）。

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::domain::{ConnectionRegistry, SweepReport};

/// 死活監視
pub struct HeartbeatMonitor {
    registry: Arc<dyn ConnectionRegistry>,
    interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// 1 回分の巡回
    pub async fn tick(&self) -> SweepReport {
        let report = self.registry.sweep().await;
        if report.reaped > 0 {
            tracing::info!(
                "Heartbeat reaped {} closed connection(s), pinged {}",
                report.reaped,
                report.pinged
            );
        } else {
            tracing::debug!("Heartbeat pinged {} connection(s)", report.pinged);
        }
        report
    }

    /// 巡回タスクを起動する。`stop` に `true` が送られるか送信側が破棄されると終了する。
    pub fn spawn(self, mut stop: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; the first sweep is one
            // interval after start.
            ticker.tick().await;

            tracing::info!("Heartbeat started (every {:?})", self.interval);
            loop {
                tokio::select! {
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }
            tracing::info!("Heartbeat stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        domain::{ClientId, Connection, Identity, OutboundFrame, Timestamp},
        infrastructure::repository::InMemoryConnectionRegistry,
        usecase::SessionQueryUseCase,
    };

    async fn register(
        registry: &InMemoryConnectionRegistry,
    ) -> (ClientId, mpsc::UnboundedReceiver<OutboundFrame>) {
        let id = ClientId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        registry
            .register(
                Connection::new(id.clone(), Identity::new("u", "n"), Timestamp::now()),
                tx,
            )
            .await
            .unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn test_tick_pings_open_and_reaps_closed() {
        // テスト項目: 開いている接続には Ping、閉じた接続はセッションごと削除される
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let (open_id, mut open_rx) = register(&registry).await;
        let (closed_id, closed_rx) = register(&registry).await;
        drop(closed_rx);
        let monitor = HeartbeatMonitor::new(registry.clone(), Duration::from_secs(30));
        let session_query = SessionQueryUseCase::new(registry.clone());
        assert_eq!(session_query.get_client_count().await, 2);

        // when (操作):
        let report = monitor.tick().await;

        // then (期待する結果):
        assert_eq!(report, SweepReport { pinged: 1, reaped: 1 });
        assert_eq!(open_rx.try_recv(), Ok(OutboundFrame::Ping));
        assert!(registry.lookup_session(&open_id).await.is_some());
        assert!(registry.lookup_session(&closed_id).await.is_none());
        assert_eq!(registry.count().await, 1);
        assert_eq!(session_query.get_client_count().await, 1);
        assert!(session_query.get_session_data(&closed_id).await.is_none());
    }

    #[tokio::test]
    async fn test_first_sweep_is_one_interval_after_start() {
        // テスト項目: 起動直後には巡回せず、1 間隔後に最初の Ping が送られる
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let (_id, mut rx) = register(&registry).await;
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle =
            HeartbeatMonitor::new(registry.clone(), Duration::from_millis(200)).spawn(stop_rx);

        // when (操作):
        time::sleep(Duration::from_millis(50)).await;
        let before = rx.try_recv();
        time::sleep(Duration::from_millis(250)).await;
        let after = rx.try_recv();

        // then (期待する結果):
        assert!(before.is_err());
        assert_eq!(after, Ok(OutboundFrame::Ping));

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_signal_ends_task() {
        // テスト項目: 停止シグナルで巡回タスクが終了する
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = HeartbeatMonitor::new(registry, Duration::from_secs(30)).spawn(stop_rx);

        // when (操作):
        stop_tx.send(true).unwrap();

        // then (期待する結果):
        time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
