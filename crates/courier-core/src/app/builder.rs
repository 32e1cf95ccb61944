//! CourierBuilder - 協調者のワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//!
//! # Fail-fast 設計
//! - expect_services() で期待されるサービス名を登録
//! - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 設定値も build() 時に検証する

use std::sync::Arc;
use std::time::Duration;

use crate::app::dispatch::ServiceDispatcher;
use crate::app::external::{ExternalService, InvocationContext};
use crate::app::worker_pool::WorkerPool;
use crate::config::CourierConfig;
use crate::domain::{CourierError, ExchangeId, MessageExchange, ServiceDefinition};
use crate::impls::{
    DocLiteralConverter, InMemoryCorrelatorRegistry, InMemoryExchangeStore, InMemoryScheduler,
    InMemoryServiceRegistry, RegistryError, ReqwestTransport,
};
use crate::observability::{CorrelatorStats, ExchangeCounts};
use crate::ports::{ExchangeStore, HttpTransport, MessageConverter, ServiceRegistry};

/// # 使用例
/// ```ignore
/// let courier = CourierBuilder::new()
///     .with_config(config)
///     .register_service(order_service)?
///     .expect_services(&["OrderService"])
///     .build()?;
/// ```
pub struct CourierBuilder {
    config: CourierConfig,
    registry: InMemoryServiceRegistry,
    expected_services: Option<Vec<String>>,
    transport: Option<Arc<dyn HttpTransport>>,
    converter: Option<Arc<dyn MessageConverter>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing services: {0:?}. These services were expected but not registered.")]
    MissingServices(Vec<String>),

    #[error(transparent)]
    Config(#[from] CourierError),
}

impl CourierBuilder {
    pub fn new() -> Self {
        Self {
            config: CourierConfig::default(),
            registry: InMemoryServiceRegistry::new(),
            expected_services: None,
            transport: None,
            converter: None,
        }
    }

    pub fn with_config(mut self, config: CourierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register_service(mut self, service: ServiceDefinition) -> Result<Self, RegistryError> {
        self.registry.register(service)?;
        Ok(self)
    }

    pub fn expect_services(mut self, names: &[&str]) -> Self {
        self.expected_services = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// 全 adapter で共有する transport を差し込む
    ///
    /// 既定では adapter ごとに reqwest transport（送信先ごとの client を TTL 付きで使い回す）を作ります。
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 既定は document/literal
    pub fn with_converter(mut self, converter: Arc<dyn MessageConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// 構築（worker pool を起動するので tokio runtime の中で呼ぶこと）
    pub fn build(self) -> Result<Courier, BuildError> {
        self.config.validate()?;
        if let Some(expected) = &self.expected_services {
            let registered = self.registry.service_names();
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !registered.contains(name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingServices(missing));
            }
        }

        let registry = Arc::new(self.registry);
        let converter = self
            .converter
            .unwrap_or_else(|| Arc::new(DocLiteralConverter::new()));
        let dispatcher = ServiceDispatcher::new(
            Arc::clone(&registry) as Arc<dyn ServiceRegistry>,
            self.config.dispatch_path_marker.clone(),
        );

        Ok(Courier {
            pool: Arc::new(WorkerPool::spawn(self.config.worker_count)),
            scheduler: Arc::new(InMemoryScheduler::new()),
            store: Arc::new(InMemoryExchangeStore::new()),
            correlators: Arc::new(InMemoryCorrelatorRegistry::new()),
            config: self.config,
            registry,
            transport: self.transport,
            converter,
            dispatcher,
        })
    }
}

impl Default for CourierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 構築済みの協調者一式
pub struct Courier {
    config: CourierConfig,
    registry: Arc<InMemoryServiceRegistry>,
    scheduler: Arc<InMemoryScheduler>,
    store: Arc<InMemoryExchangeStore>,
    correlators: Arc<InMemoryCorrelatorRegistry>,
    pool: Arc<WorkerPool>,
    /// 差し込まれた共有 transport（無ければ adapter ごとに作る）
    transport: Option<Arc<dyn HttpTransport>>,
    converter: Arc<dyn MessageConverter>,
    dispatcher: ServiceDispatcher,
}

impl Courier {
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<InMemoryServiceRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &Arc<InMemoryScheduler> {
        &self.scheduler
    }

    pub fn store(&self) -> &Arc<InMemoryExchangeStore> {
        &self.store
    }

    pub fn correlators(&self) -> &Arc<InMemoryCorrelatorRegistry> {
        &self.correlators
    }

    pub fn dispatcher(&self) -> &ServiceDispatcher {
        &self.dispatcher
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// adapter 1 つ分の協調者
    ///
    /// transport は呼ぶたびに新しく作るので、adapter の close は他の adapter に影響しません。
    pub fn invocation_context(&self) -> InvocationContext {
        let transport = match &self.transport {
            Some(shared) => Arc::clone(shared),
            None => Arc::new(ReqwestTransport::new(self.config.client_ttl())) as Arc<dyn HttpTransport>,
        };
        InvocationContext {
            scheduler: Arc::clone(&self.scheduler) as _,
            store: Arc::clone(&self.store) as _,
            pool: Arc::clone(&self.pool),
            transport,
            converter: Arc::clone(&self.converter),
        }
    }

    /// 登録済みサービスの port に対する adapter
    pub fn external_service(&self, service: &str, port: &str) -> Result<ExternalService, CourierError> {
        let definition = self.registry.service(service).ok_or_else(|| {
            CourierError::InvalidBinding(format!("service '{service}' is not registered"))
        })?;
        ExternalService::for_port(definition, port, self.invocation_context(), &self.config)
    }

    pub fn exchange_counts(&self) -> ExchangeCounts {
        self.store.counts()
    }

    pub fn correlator_stats(&self) -> Vec<CorrelatorStats> {
        self.correlators.stats()
    }

    /// 実行中の呼び出しを流し切ってから共有 transport を閉じる
    ///
    /// adapter ごとの transport はそれぞれの `ExternalService::close` で閉じること。
    pub async fn shutdown(&self) {
        self.pool.shutdown_and_join().await;
        if let Some(transport) = &self.transport {
            transport.close();
        }
    }

    /// 指定時間内に交換が終端状態になるのを待つ（テスト・デモ用）
    pub async fn wait_for_terminal(
        &self,
        id: ExchangeId,
        timeout: Duration,
    ) -> Option<MessageExchange> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(exchange) = self.store.lookup(id) {
                if exchange.state().is_terminal() {
                    return Some(exchange);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BindingKind, PortDefinition, QName};

    fn service(name: &str) -> ServiceDefinition {
        ServiceDefinition {
            name: QName::new("urn:shop", name),
            ports: vec![PortDefinition {
                name: "SoapPort".into(),
                address: "http://partner.example/svc".into(),
                binding: BindingKind::Soap,
                operations: vec![],
            }],
            operations: vec![],
        }
    }

    #[tokio::test]
    async fn test_build_success() {
        let courier = CourierBuilder::new()
            .register_service(service("OrderService"))
            .unwrap()
            .expect_services(&["OrderService"])
            .build()
            .unwrap();
        let external = courier.external_service("OrderService", "SoapPort").unwrap();
        assert_eq!(
            external.initial_endpoint_reference().address().as_str(),
            "http://partner.example/svc"
        );
        assert!(matches!(external, ExternalService::Soap(_)));
        courier.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_missing_services() {
        let result = CourierBuilder::new()
            .register_service(service("OrderService"))
            .unwrap()
            .expect_services(&["OrderService", "ShippingService"])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingServices(missing)) if missing == vec!["ShippingService".to_string()]
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let config = CourierConfig {
            worker_count: 0,
            ..CourierConfig::default()
        };
        let result = CourierBuilder::new().with_config(config).build();
        assert!(matches!(result, Err(BuildError::Config(CourierError::Config(_)))));
    }

    #[tokio::test]
    async fn unknown_port_is_invalid_binding() {
        let courier = CourierBuilder::new()
            .register_service(service("OrderService"))
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(
            courier.external_service("OrderService", "Nope"),
            Err(CourierError::InvalidBinding(_))
        ));
        assert!(matches!(
            courier.external_service("Missing", "SoapPort"),
            Err(CourierError::InvalidBinding(_))
        ));
    }
}
