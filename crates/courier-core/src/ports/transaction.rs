//! Transaction facade port - コミット同期と isolated transaction
//!
//! # 契約
//! - `register_synchronizer`: 登録したコールバックはトランザクション完了時に
//!   高々 1 回呼ばれ、`committed` でコミット成否を受け取る
//! - `exec_isolated`: 呼び出し側とは独立した新しいトランザクションで処理を実行し、
//!   処理の結果（失敗を含む）をそのまま返す

use crate::domain::CourierError;

/// トランザクション完了の通知を受け取る
pub trait Synchronizer: Send {
    fn after_completion(self: Box<Self>, committed: bool);
}

impl<F> Synchronizer for F
where
    F: FnOnce(bool) + Send,
{
    fn after_completion(self: Box<Self>, committed: bool) {
        (*self)(committed)
    }
}

/// 実行中のトランザクション
pub trait TransactionScope {
    fn register_synchronizer(&self, synchronizer: Box<dyn Synchronizer>);
}

pub type IsolatedWork = Box<dyn FnOnce(&dyn TransactionScope) -> Result<(), CourierError> + Send>;

/// Scheduler はトランザクションの外側から新しいトランザクションを開く
///
/// `exec_isolated` はブロッキングです。async context からは
/// `spawn_blocking` 経由で呼び出してください。
pub trait Scheduler: Send + Sync {
    fn exec_isolated(&self, work: IsolatedWork) -> Result<(), CourierError>;
}
