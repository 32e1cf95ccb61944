//! Dispatch - インバウンドメッセージの service / operation 解決
//!
//! # service
//! 宛先アドレス中の path marker（既定 `/processes/`）より後ろ、`?` より前をサービス名とし、
//! registry から引きます。
//!
//! # operation
//! 1. wire レベルの action ヘッダで完全一致
//! 2. Body 最初の子要素のローカル名で operation 名と一致
//! 3. そのローカル名の末尾 `Request` / `Response` を落として再試行
//!
//! 見つからないのは想定内なので `CourierError::NoMatch` を返します。
//! 呼び出し側はプロトコルレベルの fault にして返すこと。

use std::sync::Arc;

use tracing::debug;

use crate::domain::{CourierError, Element, OperationDefinition, ServiceDefinition};
use crate::ports::ServiceRegistry;

const OPERATION_SUFFIXES: [&str; 2] = ["Request", "Response"];

pub struct ServiceDispatcher {
    registry: Arc<dyn ServiceRegistry>,
    path_marker: String,
}

impl ServiceDispatcher {
    pub fn new(registry: Arc<dyn ServiceRegistry>, path_marker: impl Into<String>) -> Self {
        Self {
            registry,
            path_marker: path_marker.into(),
        }
    }

    pub fn path_marker(&self) -> &str {
        &self.path_marker
    }

    /// 宛先アドレスからサービス名を取り出す
    pub fn service_name<'a>(&self, to_address: &'a str) -> Result<&'a str, CourierError> {
        let start = to_address
            .find(&self.path_marker)
            .map(|idx| idx + self.path_marker.len())
            .ok_or_else(|| {
                CourierError::NoMatch(format!(
                    "address '{to_address}' does not contain '{}'",
                    self.path_marker
                ))
            })?;
        let rest = &to_address[start..];
        let name = rest.split_once('?').map_or(rest, |(name, _)| name);
        if name.is_empty() {
            return Err(CourierError::NoMatch(format!(
                "address '{to_address}' names no service"
            )));
        }
        Ok(name)
    }

    pub fn find_service(&self, to_address: &str) -> Result<Arc<ServiceDefinition>, CourierError> {
        let name = self.service_name(to_address)?;
        self.registry.service(name).ok_or_else(|| {
            debug!(service = name, "dispatch: unknown service");
            CourierError::NoMatch(format!("service '{name}' is not registered"))
        })
    }

    pub fn find_operation<'s>(
        &self,
        service: &'s ServiceDefinition,
        action: Option<&str>,
        payload: Option<&Element>,
    ) -> Result<&'s OperationDefinition, CourierError> {
        if let Some(op) = action
            .filter(|a| !a.is_empty())
            .and_then(|a| service.operation_by_action(a))
        {
            return Ok(op);
        }

        let local = payload.map(|p| p.name.local.as_str());
        if let Some(local) = local {
            if let Some(op) = service.operation(local) {
                return Ok(op);
            }
            let stripped = OPERATION_SUFFIXES
                .iter()
                .filter_map(|suffix| local.strip_suffix(suffix))
                .find(|base| !base.is_empty());
            if let Some(op) = stripped.and_then(|base| service.operation(base)) {
                return Ok(op);
            }
        }

        debug!(service = %service.name, action = ?action, element = ?local, "dispatch: no operation");
        Err(CourierError::NoMatch(format!(
            "no operation of '{}' matches action {:?} / element {:?}",
            service.name, action, local
        )))
    }

    /// アドレス・action・Body 要素からまとめて解決
    pub fn resolve(
        &self,
        to_address: &str,
        action: Option<&str>,
        payload: Option<&Element>,
    ) -> Result<(Arc<ServiceDefinition>, String), CourierError> {
        let service = self.find_service(to_address)?;
        let operation = self.find_operation(&service, action, payload)?.name.clone();
        Ok((service, operation))
    }
}
