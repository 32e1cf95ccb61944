//! Correlation - correlation key と route
//!
//! # 設計原則
//! - CorrelationKey は不変。メッセージ交換に関連付いた後は変更しない
//! - 等価性は値の順序込みの完全一致
//! - Route の key が None のときは「キーなし配送」だけにマッチするワイルドカード

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{ExchangeId, InstanceId};

/// 会話を識別する順序付きの値のタプル
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    values: Vec<String>,
}

impl CorrelationKey {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@[{}]", self.values.join(","))
    }
}

/// マッチ待ちのインバウンドメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub exchange: ExchangeId,
    /// このメッセージが満たしうるすべての key
    pub keys: Vec<CorrelationKey>,
}

impl QueuedMessage {
    pub fn matches(&self, key: Option<&CorrelationKey>) -> bool {
        match key {
            None => true,
            Some(key) => self.keys.contains(key),
        }
    }
}

/// プロセスインスタンスが特定の key を待っているという登録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub group_id: String,
    pub target: InstanceId,
    pub index: i32,
    pub key: Option<CorrelationKey>,
}

impl Route {
    pub fn matches(&self, key: Option<&CorrelationKey>) -> bool {
        self.key.as_ref() == key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_order_sensitive() {
        let a = CorrelationKey::new(["x", "y"]);
        let b = CorrelationKey::new(["x", "y"]);
        let c = CorrelationKey::new(["y", "x"]);
        let d = CorrelationKey::new(["x"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn wildcard_route_only_matches_unkeyed_delivery() {
        let key = CorrelationKey::new(["42"]);
        let wildcard = Route {
            group_id: "g".into(),
            target: InstanceId::generate(),
            index: 0,
            key: None,
        };
        let keyed = Route {
            key: Some(key.clone()),
            ..wildcard.clone()
        };

        assert!(wildcard.matches(None));
        assert!(!wildcard.matches(Some(&key)));
        assert!(keyed.matches(Some(&key)));
        assert!(!keyed.matches(None));
    }

    #[test]
    fn null_key_matches_any_queued_message() {
        let msg = QueuedMessage {
            exchange: ExchangeId::generate(),
            keys: vec![CorrelationKey::new(["1"])],
        };
        assert!(msg.matches(None));
        assert!(msg.matches(Some(&CorrelationKey::new(["1"]))));
        assert!(!msg.matches(Some(&CorrelationKey::new(["2"]))));
    }

    #[test]
    fn display_lists_values() {
        assert_eq!(CorrelationKey::new(["a", "b"]).to_string(), "@[a,b]");
    }
}
