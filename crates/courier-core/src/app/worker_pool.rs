//! WorkerPool - 外部呼び出しを実行する固定数の worker
//!
//! トランザクション側のスレッドはネットワーク I/O で待たず、ジョブを
//! `submit` して戻るだけです。`submit` は同期関数なので、コミット後の
//! synchronizer から直接呼べます。
//!
//! # 実装
//! - `n` 本の worker が 1 本の unbounded channel を共有して取り出す
//! - 各ジョブは `tokio::spawn` で包んで実行し、panic しても worker は止まらない
//! - `shutdown_and_join()` で受付を止め、キュー済みのジョブを流し切ってから終了を待つ

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::domain::CourierError;

pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub struct WorkerPool {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    joins: Mutex<Vec<JoinHandle<()>>>,
    completed: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Spawn `n` workers. tokio runtime の中で呼ぶこと。
    pub fn spawn(n: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let completed = Arc::new(AtomicU64::new(0));

        let joins = (0..n)
            .map(|worker_id| {
                let rx = Arc::clone(&receiver);
                let completed = Arc::clone(&completed);
                tokio::spawn(async move {
                    worker_loop(worker_id, rx, completed).await;
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            joins: Mutex::new(joins),
            completed,
        }
    }

    pub fn submit<F>(&self, job: F) -> Result<(), CourierError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = sender.as_ref().ok_or(CourierError::PoolClosed)?;
        sender
            .send(Box::pin(job))
            .map_err(|_| CourierError::PoolClosed)
    }

    /// 実行を終えたジョブの数
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// 新しいジョブの受付を止める（キュー済みのジョブは実行される）
    pub fn request_shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub async fn shutdown_and_join(&self) {
        self.request_shutdown();
        let joins = std::mem::take(&mut *self.joins.lock().unwrap_or_else(PoisonError::into_inner));
        for join in joins {
            let _ = join.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<Job>>>,
    completed: Arc<AtomicU64>,
) {
    loop {
        // 受信待ちの間だけロックを持つ
        let job = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            debug!(worker = worker_id, "worker stopped");
            break;
        };
        if let Err(e) = tokio::spawn(job).await {
            error!(worker = worker_id, error = %e, "job aborted");
        }
        completed.fetch_add(1, Ordering::SeqCst);
    }
}
