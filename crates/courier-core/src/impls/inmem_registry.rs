//! InMemoryServiceRegistry - サービスメタデータの登録先
//!
//! 初期化時に登録し（mutable）、実行中は読み取りだけ（immutable）にします。
//! ロックを持たずに済ませるためです。

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::ServiceDefinition;
use crate::ports::ServiceRegistry;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Service '{0}' is already registered")]
    AlreadyRegistered(String),
}

#[derive(Debug, Default)]
pub struct InMemoryServiceRegistry {
    services: HashMap<String, Arc<ServiceDefinition>>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// サービスのローカル名で登録
    pub fn register(&mut self, service: ServiceDefinition) -> Result<(), RegistryError> {
        let name = service.name.local.clone();
        if self.services.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.services.insert(name, Arc::new(service));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn service(&self, name: &str) -> Option<Arc<ServiceDefinition>> {
        self.services.get(name).cloned()
    }

    fn service_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.services.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QName;

    fn service(name: &str) -> ServiceDefinition {
        ServiceDefinition {
            name: QName::new("urn:shop", name),
            ports: vec![],
            operations: vec![],
        }
    }

    #[test]
    fn register_and_lookup_by_local_name() {
        let mut registry = InMemoryServiceRegistry::new();
        registry.register(service("OrderService")).unwrap();
        assert!(registry.service("OrderService").is_some());
        assert!(registry.service("{urn:shop}OrderService").is_none());
        assert_eq!(registry.service_names(), vec!["OrderService".to_string()]);
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = InMemoryServiceRegistry::new();
        registry.register(service("OrderService")).unwrap();
        let err = registry.register(service("OrderService")).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(name) if name == "OrderService"));
        assert_eq!(registry.len(), 1);
    }
}
