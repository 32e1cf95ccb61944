//! InMemoryCorrelator - 開発用の correlator と、その registry
//!
//! # 実装
//! - メッセージは `VecDeque`（到着順）、route は `Vec`（登録順）で線形走査
//! - registry は `Mutex<HashMap<CorrelatorId, InMemoryCorrelator>>`
//! - `with_correlator` のクロージャ実行中はロックを保持する。
//!   この間が 1 トランザクション分の排他範囲になるので、中で I/O はしない
//!
//! プロセス再起動を越えた永続化はしません。

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::domain::{CorrelationKey, CorrelatorId, ExchangeId, InstanceId, QueuedMessage, Route};
use crate::observability::CorrelatorStats;
use crate::ports::Correlator;

#[derive(Debug)]
pub struct InMemoryCorrelator {
    id: CorrelatorId,
    messages: VecDeque<QueuedMessage>,
    routes: Vec<Route>,
}

impl InMemoryCorrelator {
    pub fn new(id: CorrelatorId) -> Self {
        Self {
            id,
            messages: VecDeque::new(),
            routes: Vec::new(),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

impl Correlator for InMemoryCorrelator {
    fn correlator_id(&self) -> &CorrelatorId {
        &self.id
    }

    fn enqueue_message(&mut self, exchange: ExchangeId, keys: Vec<CorrelationKey>) {
        debug!(correlator = %self.id, mex = %exchange, keys = keys.len(), "enqueue message");
        self.messages.push_back(QueuedMessage { exchange, keys });
    }

    fn dequeue_message(&mut self, key: Option<&CorrelationKey>) -> Option<ExchangeId> {
        let position = self.messages.iter().position(|m| m.matches(key));
        match position.and_then(|idx| self.messages.remove(idx)) {
            Some(message) => {
                debug!(correlator = %self.id, mex = %message.exchange, "dequeue matched");
                Some(message.exchange)
            }
            None => {
                debug!(correlator = %self.id, key = ?key.map(ToString::to_string), "dequeue: no match");
                None
            }
        }
    }

    fn find_route(&self, key: Option<&CorrelationKey>) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(key))
    }

    fn add_route(
        &mut self,
        group_id: &str,
        target: InstanceId,
        index: i32,
        key: Option<CorrelationKey>,
    ) {
        debug!(correlator = %self.id, group = group_id, target = %target, index, "add route");
        self.routes.push(Route {
            group_id: group_id.to_string(),
            target,
            index,
            key,
        });
    }

    fn remove_routes(&mut self, group_id: Option<&str>, target: InstanceId) -> usize {
        let before = self.routes.len();
        self.routes.retain(|r| {
            let group_matches = group_id.is_none_or(|g| r.group_id == g);
            !(group_matches && r.target == target)
        });
        let removed = before - self.routes.len();
        debug!(correlator = %self.id, group = ?group_id, target = %target, removed, "remove routes");
        removed
    }

    fn stats(&self) -> CorrelatorStats {
        CorrelatorStats {
            correlator: self.id.clone(),
            queued_messages: self.messages.len(),
            routes: self.routes.len(),
        }
    }
}

/// correlator の集合（初回アクセス時に作成）
#[derive(Debug, Default)]
pub struct InMemoryCorrelatorRegistry {
    correlators: Mutex<HashMap<CorrelatorId, InMemoryCorrelator>>,
}

impl InMemoryCorrelatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した correlator を排他的に操作する
    pub fn with_correlator<R>(
        &self,
        id: &CorrelatorId,
        f: impl FnOnce(&mut dyn Correlator) -> R,
    ) -> R {
        let mut correlators = self.correlators.lock().unwrap_or_else(PoisonError::into_inner);
        let correlator = correlators
            .entry(id.clone())
            .or_insert_with(|| InMemoryCorrelator::new(id.clone()));
        f(correlator)
    }

    /// インスタンス破棄時に全 correlator からその route を消す
    pub fn discard_instance(&self, target: InstanceId) -> usize {
        let mut correlators = self.correlators.lock().unwrap_or_else(PoisonError::into_inner);
        correlators
            .values_mut()
            .map(|c| c.remove_routes(None, target))
            .sum()
    }

    pub fn stats(&self) -> Vec<CorrelatorStats> {
        let correlators = self.correlators.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats: Vec<_> = correlators.values().map(|c| c.stats()).collect();
        stats.sort_by(|a, b| a.correlator.cmp(&b.correlator));
        stats
    }
}
