//! Implementations - ports の実装
//!
//! in-memory 実装は開発・テスト用です。永続化はしません。

pub mod client_pool;
pub mod inmem_correlator;
pub mod inmem_exchange_store;
pub mod inmem_registry;
pub mod inmem_scheduler;
pub mod reqwest_transport;
pub mod soap_converter;

pub use self::client_pool::ClientPool;
pub use self::inmem_correlator::{InMemoryCorrelator, InMemoryCorrelatorRegistry};
pub use self::inmem_exchange_store::InMemoryExchangeStore;
pub use self::inmem_registry::{InMemoryServiceRegistry, RegistryError};
pub use self::inmem_scheduler::{InMemoryScheduler, InMemoryTransaction};
pub use self::reqwest_transport::ReqwestTransport;
pub use self::soap_converter::DocLiteralConverter;
