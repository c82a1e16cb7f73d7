//! UseCase: グレースフルシャットダウン
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ShutdownCoordinator::shutdown() メソッド
//! - 受付停止 → 死活監視の停止 → 全接続のクローズ → 外部リソースの解放
//!
//! ### なぜこのテストが必要か
//! - シャットダウン後に接続が 1 件も残らないことを保証
//! - 2 回呼ばれてもパニック・ハングしないことを確認
//! - 応答しないリソースがあってもタイムアウトで先に進むことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：接続ありの状態からのシャットダウン
//! - エッジケース：シャットダウンの二重呼び出し、同時呼び出し
//! - 異常系：解放に失敗するリソース・終わらないリソース

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, OnceCell, watch},
    task::JoinHandle,
};

use crate::domain::{ConnectionRegistry, OwnedResource};

/// What one shutdown run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Connections asked to close
    pub closed: usize,
    /// Resources released cleanly
    pub released: usize,
    /// Names of resources that failed or timed out
    pub failed: Vec<String>,
}

/// シャットダウンの調整役
///
/// 新規接続の受付可否フラグと、HTTP サーバーの graceful shutdown を起こすための
/// 通知（watch チャンネル）を兼ねる。
pub struct ShutdownCoordinator {
    registry: Arc<dyn ConnectionRegistry>,
    resources: Vec<Arc<dyn OwnedResource>>,
    /// Bound on closing connections and on each resource release
    timeout: Duration,
    trigger: watch::Sender<bool>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    report: OnceCell<ShutdownReport>,
}

impl ShutdownCoordinator {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        resources: Vec<Arc<dyn OwnedResource>>,
        timeout: Duration,
    ) -> Self {
        let (trigger, _) = watch::channel(false);
        Self {
            registry,
            resources,
            timeout,
            trigger,
            heartbeat: Mutex::new(None),
            report: OnceCell::new(),
        }
    }

    /// Receiver that flips to `true` once shutdown has begun
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.trigger.subscribe()
    }

    /// Whether new connections may still be accepted
    pub fn is_accepting(&self) -> bool {
        !*self.trigger.borrow()
    }

    /// Stop accepting and wake everything waiting in [`Self::triggered`]
    pub fn trigger(&self) {
        if !self.trigger.send_replace(true) {
            tracing::info!("Shutdown triggered, no longer accepting connections");
        }
    }

    /// Resolves once shutdown has been triggered
    pub async fn triggered(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this only ends on `true`.
        let _ = rx.wait_for(|stopping| *stopping).await;
    }

    /// 死活監視タスクのハンドルを預かる（シャットダウン時に停止する）
    pub async fn attach_heartbeat(&self, handle: JoinHandle<()>) {
        let previous = self.heartbeat.lock().await.replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// シャットダウンを実行する
    ///
    /// 何度呼んでも実処理は 1 回だけ行われ、同時に呼ばれた場合も全員が最初の実行の
    /// 完了を待ってから同じ結果を受け取る。
    pub async fn shutdown(&self) -> ShutdownReport {
        self.report.get_or_init(|| self.run()).await.clone()
    }

    async fn run(&self) -> ShutdownReport {
        self.trigger();

        if let Some(heartbeat) = self.heartbeat.lock().await.take() {
            heartbeat.abort();
            tracing::debug!("Heartbeat aborted");
        }

        let mut report = ShutdownReport::default();
        match tokio::time::timeout(self.timeout, self.registry.close_all()).await {
            Ok(closed) => {
                tracing::info!("Closed {} connection(s)", closed);
                report.closed = closed;
            }
            Err(_) => {
                tracing::warn!("Closing connections timed out after {:?}", self.timeout);
            }
        }

        for resource in &self.resources {
            match tokio::time::timeout(self.timeout, resource.release()).await {
                Ok(Ok(())) => {
                    tracing::debug!("Released '{}'", resource.name());
                    report.released += 1;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Failed to release '{}': {}", resource.name(), e);
                    report.failed.push(resource.name().to_string());
                }
                Err(_) => {
                    tracing::warn!(
                        "Releasing '{}' timed out after {:?}",
                        resource.name(),
                        self.timeout
                    );
                    report.failed.push(resource.name().to_string());
                }
            }
        }

        tracing::info!("Shutdown complete");
        report
    }
}
