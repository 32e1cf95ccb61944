//! InMemoryScheduler - 開発用のトランザクション管理
//!
//! # 実装
//! - `begin()` で `InMemoryTransaction` を開き、`commit()` / `rollback()` で閉じる
//! - commit / rollback せずに drop したトランザクションは rollback 扱い
//! - synchronizer は完了時に登録順で 1 回だけ呼ばれる
//! - `exec_isolated` は内部ロックで直列化する（isolated transaction 同士は重ならない）

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::domain::CourierError;
use crate::ports::{IsolatedWork, Scheduler, Synchronizer, TransactionScope};

#[derive(Default)]
pub struct InMemoryTransaction {
    synchronizers: Mutex<Vec<Box<dyn Synchronizer>>>,
    completed: bool,
}

impl InMemoryTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(mut self) {
        self.complete(true);
    }

    pub fn rollback(mut self) {
        self.complete(false);
    }

    fn complete(&mut self, committed: bool) {
        if self.completed {
            return;
        }
        self.completed = true;
        let synchronizers = std::mem::take(
            &mut *self
                .synchronizers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        debug!(committed, synchronizers = synchronizers.len(), "transaction completed");
        for synchronizer in synchronizers {
            synchronizer.after_completion(committed);
        }
    }
}

impl TransactionScope for InMemoryTransaction {
    fn register_synchronizer(&self, synchronizer: Box<dyn Synchronizer>) {
        self.synchronizers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(synchronizer);
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        self.complete(false);
    }
}

#[derive(Debug, Default)]
pub struct InMemoryScheduler {
    isolation: Mutex<()>,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> InMemoryTransaction {
        InMemoryTransaction::new()
    }

    /// コミットされた isolated transaction の数
    pub fn committed_isolated(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn rolled_back_isolated(&self) -> u64 {
        self.rolled_back.load(Ordering::SeqCst)
    }
}

impl Scheduler for InMemoryScheduler {
    fn exec_isolated(&self, work: IsolatedWork) -> Result<(), CourierError> {
        let _guard = self.isolation.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = self.begin();
        match work(&tx) {
            Ok(()) => {
                tx.commit();
                self.committed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(err) => {
                tx.rollback();
                self.rolled_back.fetch_add(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }
}
