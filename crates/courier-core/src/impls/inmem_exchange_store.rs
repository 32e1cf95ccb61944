//! InMemoryExchangeStore - 開発用のメッセージ交換ストア

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::domain::{ExchangeId, MessageExchange};
use crate::observability::ExchangeCounts;
use crate::ports::ExchangeStore;

#[derive(Debug, Default)]
pub struct InMemoryExchangeStore {
    exchanges: Mutex<HashMap<ExchangeId, MessageExchange>>,
}

impl InMemoryExchangeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExchangeStore for InMemoryExchangeStore {
    fn lookup(&self, id: ExchangeId) -> Option<MessageExchange> {
        let exchanges = self.exchanges.lock().unwrap_or_else(PoisonError::into_inner);
        exchanges.get(&id).cloned()
    }

    fn save(&self, exchange: MessageExchange) {
        let mut exchanges = self.exchanges.lock().unwrap_or_else(PoisonError::into_inner);
        exchanges.insert(exchange.id(), exchange);
    }

    fn counts(&self) -> ExchangeCounts {
        let exchanges = self.exchanges.lock().unwrap_or_else(PoisonError::into_inner);
        let mut counts = ExchangeCounts::default();
        for exchange in exchanges.values() {
            counts.record(exchange.state());
        }
        counts
    }
}
