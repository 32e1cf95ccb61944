//! Ports - 外部協調者とのインターフェース
//!
//! Hexagonal Architecture の「ポート」です。トランザクション管理、
//! メッセージ交換の永続化、SOAP マーシャリング、HTTP 通信、サービス
//! メタデータはすべてこのクレートの外側にあり、ここでは trait だけを定義します。
//!
//! # 設計原則
//! - correlator の状態は呼び出し側トランザクションの排他範囲でだけ触る
//! - ネットワーク呼び出しは必ずコミット後、worker pool 上で行う
//! - 非同期境界を越えるときは ID で引き直す（参照を持ち回らない）

pub mod converter;
pub mod correlator;
pub mod exchange_store;
pub mod service_registry;
pub mod transaction;
pub mod transport;

pub use self::converter::{MessageConverter, SessionHeaders, SoapFault};
pub use self::correlator::Correlator;
pub use self::exchange_store::ExchangeStore;
pub use self::service_registry::ServiceRegistry;
pub use self::transaction::{IsolatedWork, Scheduler, Synchronizer, TransactionScope};
pub use self::transport::{HttpTransport, InboundResponse, OutboundRequest, TransportError};
