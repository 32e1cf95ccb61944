//! Reply delivery - worker 側の結果を isolated transaction で書き戻す
//!
//! # 実装
//! 1. `spawn_blocking` で `Scheduler::exec_isolated` を呼ぶ（ブロッキング API のため）
//!    async 文脈の外では `deliver_blocking` でその場で実行する
//! 2. トランザクション内で交換を ID から引き直す
//! 3. `ReplyOutcome` を適用して保存
//!
//! isolated transaction 自体が失敗した場合はログを残すだけで、返信は失われます。

use std::sync::Arc;

use tracing::{debug, error};

use crate::domain::{CourierError, ExchangeId, ReplyOutcome};
use crate::ports::{ExchangeStore, Scheduler};

#[derive(Clone)]
pub struct ReplyChannel {
    scheduler: Arc<dyn Scheduler>,
    store: Arc<dyn ExchangeStore>,
}

impl ReplyChannel {
    pub fn new(scheduler: Arc<dyn Scheduler>, store: Arc<dyn ExchangeStore>) -> Self {
        Self { scheduler, store }
    }

    pub async fn deliver(&self, id: ExchangeId, outcome: ReplyOutcome) {
        let channel = self.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || channel.deliver_blocking(id, outcome)).await {
            error!(mex = %id, error = %e, "reply task aborted; reply will be lost");
        }
    }

    /// 現在のスレッドで isolated transaction を実行して書き戻す
    ///
    /// コミット後の synchronizer のように async 文脈の外から返信するときに使います。
    pub fn deliver_blocking(&self, id: ExchangeId, outcome: ReplyOutcome) {
        let store = Arc::clone(&self.store);
        let result = self.scheduler.exec_isolated(Box::new(move |_tx| {
            let mut exchange = store.lookup(id).ok_or(CourierError::ExchangeNotFound(id))?;
            exchange.apply(outcome)?;
            let state = exchange.state();
            store.save(exchange);
            debug!(mex = %id, state = ?state, "reply applied");
            Ok(())
        }));
        if let Err(e) = result {
            error!(mex = %id, error = %e, "error executing reply transaction; reply will be lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExchangePattern, ExchangeState, FailureType, Message, MessageExchange, QName};
    use crate::impls::{InMemoryExchangeStore, InMemoryScheduler};

    #[tokio::test]
    async fn applies_outcome_to_stored_exchange() {
        let scheduler = Arc::new(InMemoryScheduler::new());
        let store = Arc::new(InMemoryExchangeStore::new());
        let mut mex = MessageExchange::new(
            "PlaceOrder",
            ExchangePattern::RequestResponse,
            Message::new(QName::local("req")),
        );
        mex.reply_async().unwrap();
        store.save(mex.clone());

        let channel = ReplyChannel::new(scheduler.clone(), store.clone());
        channel
            .deliver(mex.id(), ReplyOutcome::failure(FailureType::CommunicationError, "down"))
            .await;

        assert_eq!(store.lookup(mex.id()).unwrap().state(), ExchangeState::Failed);
        assert_eq!(scheduler.committed_isolated(), 1);
    }

    #[tokio::test]
    async fn missing_exchange_rolls_back_and_is_logged() {
        let scheduler = Arc::new(InMemoryScheduler::new());
        let store = Arc::new(InMemoryExchangeStore::new());
        let channel = ReplyChannel::new(scheduler.clone(), store.clone());

        channel
            .deliver(ExchangeId::generate(), ReplyOutcome::failure(FailureType::Other, "x"))
            .await;

        assert_eq!(scheduler.rolled_back_isolated(), 1);
        assert_eq!(store.counts().total(), 0);
    }
}
