//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **CourierBuilder**: 協調者の構築とワイヤリング
//! - **ServiceDispatcher**: インバウンドの service / operation 解決
//! - **routing**: correlator の 2 段階プロトコル
//! - **WorkerPool**: 外部呼び出しを実行する worker
//! - **external**: SOAP / HTTP の外部呼び出し adapter

pub mod builder;
pub mod dispatch;
pub mod external;
pub mod routing;
pub mod worker_pool;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, Courier, CourierBuilder};
pub use self::dispatch::ServiceDispatcher;
pub use self::external::{ExternalService, InvocationContext};
pub use self::routing::{InboundRouting, Interest, register_interest, route_inbound};
pub use self::worker_pool::WorkerPool;
