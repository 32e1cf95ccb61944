//! ExchangeStore port - メッセージ交換の保存先
//!
//! worker pool 側は交換オブジェクトを持ち回らず、isolated transaction の中で
//! `lookup` により ID から引き直します。

use crate::domain::{ExchangeId, MessageExchange};
use crate::observability::ExchangeCounts;

pub trait ExchangeStore: Send + Sync {
    fn lookup(&self, id: ExchangeId) -> Option<MessageExchange>;

    /// 同じ ID があれば上書き
    fn save(&self, exchange: MessageExchange);

    fn counts(&self) -> ExchangeCounts;
}
