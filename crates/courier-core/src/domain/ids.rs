//! Domain identifiers (strongly-typed IDs).
//!
//! メッセージ交換とプロセスインスタンスは ULID ベースの ID で識別します。
//! 非同期境界（worker pool → isolated transaction）を越えるときは
//! オブジェクト参照ではなく、この ID で store から引き直します。
//!
//! ## Phantom Type パターン
//! `Id<T>` の `T` は実行時には使わないマーカー型で、
//! `ExchangeId` と `InstanceId` をコンパイル時に区別します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"mex-", "pi-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// 新しい ID を生成（現在時刻ベース）
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Message exchange のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Exchange {}

impl IdMarker for Exchange {
    fn prefix() -> &'static str {
        "mex-"
    }
}

/// Process instance のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instance {}

impl IdMarker for Instance {
    fn prefix() -> &'static str {
        "pi-"
    }
}

/// Identifier of a message exchange (one request/response or one-way interaction).
pub type ExchangeId = Id<Exchange>;

/// Identifier of a process instance (the target of a route).
pub type InstanceId = Id<Instance>;

/// Correlator の識別子
///
/// `{process definition}.{correlation set}` の組で一意になる文字列です。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelatorId(String);

impl CorrelatorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// process definition と correlation set 名から組み立てる
    pub fn for_set(process: &str, correlation_set: &str) -> Self {
        Self(format!("{process}.{correlation_set}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let ulid1 = Ulid::new();
        let ulid2 = Ulid::new();

        let mex = ExchangeId::from_ulid(ulid1);
        let instance = InstanceId::from_ulid(ulid2);

        assert_eq!(mex.as_ulid(), ulid1);
        assert_eq!(instance.as_ulid(), ulid2);

        assert!(mex.to_string().starts_with("mex-"));
        assert!(instance.to_string().starts_with("pi-"));

        // let _: ExchangeId = instance; // <- does not compile
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = ExchangeId::generate();
        let b = ExchangeId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_can_be_serialized() {
        let mex = ExchangeId::generate();
        let serialized = serde_json::to_string(&mex).unwrap();
        let deserialized: ExchangeId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(mex, deserialized);
    }

    #[test]
    fn correlator_id_joins_process_and_set() {
        let id = CorrelatorId::for_set("OrderProcess", "orderId");
        assert_eq!(id.as_str(), "OrderProcess.orderId");
        assert_eq!(id.to_string(), "OrderProcess.orderId");
    }
}
