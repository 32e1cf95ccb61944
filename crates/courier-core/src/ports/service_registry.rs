//! ServiceRegistry port - サービス名からメタデータへの引き当て

use std::sync::Arc;

use crate::domain::ServiceDefinition;

pub trait ServiceRegistry: Send + Sync {
    /// サービスのローカル名で引く
    fn service(&self, name: &str) -> Option<Arc<ServiceDefinition>>;

    fn service_names(&self) -> Vec<String>;
}
