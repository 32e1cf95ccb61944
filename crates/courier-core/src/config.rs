//! Config - 実行時設定
//!
//! JSON から読み込み、`COURIER_*` 環境変数で上書きできます。
//! 省略したフィールドは既定値になります。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::CourierError;

pub const DEFAULT_WORKER_COUNT: usize = 8;
pub const DEFAULT_SOAP_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_CLIENT_TTL_MS: u64 = 30_000;
pub const DEFAULT_DISPATCH_PATH_MARKER: &str = "/processes/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub worker_count: usize,
    pub soap_timeout_ms: u64,
    /// None なら transport の既定タイムアウト
    pub http_timeout_ms: Option<u64>,
    pub client_ttl_ms: u64,
    pub dispatch_path_marker: String,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            soap_timeout_ms: DEFAULT_SOAP_TIMEOUT_MS,
            http_timeout_ms: None,
            client_ttl_ms: DEFAULT_CLIENT_TTL_MS,
            dispatch_path_marker: DEFAULT_DISPATCH_PATH_MARKER.to_string(),
        }
    }
}

impl CourierConfig {
    pub fn from_json_str(input: &str) -> Result<Self, CourierError> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| CourierError::Config(format!("invalid config json: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// プロセス環境変数で上書き
    pub fn with_env_overrides(self) -> Result<Self, CourierError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// `lookup` が返した値で上書き（キーは `COURIER_*`）
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, CourierError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("COURIER_WORKER_COUNT") {
            self.worker_count = parse_number("COURIER_WORKER_COUNT", &v)?;
        }
        if let Some(v) = lookup("COURIER_SOAP_TIMEOUT_MS") {
            self.soap_timeout_ms = parse_number("COURIER_SOAP_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("COURIER_HTTP_TIMEOUT_MS") {
            self.http_timeout_ms = Some(parse_number("COURIER_HTTP_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("COURIER_CLIENT_TTL_MS") {
            self.client_ttl_ms = parse_number("COURIER_CLIENT_TTL_MS", &v)?;
        }
        if let Some(v) = lookup("COURIER_DISPATCH_PATH_MARKER") {
            self.dispatch_path_marker = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), CourierError> {
        if self.worker_count == 0 {
            return Err(CourierError::Config("worker_count must be > 0".to_string()));
        }
        if self.soap_timeout_ms == 0 || self.http_timeout_ms == Some(0) {
            return Err(CourierError::Config("timeouts must be > 0".to_string()));
        }
        let marker = &self.dispatch_path_marker;
        if marker.len() < 2 || !marker.starts_with('/') || !marker.ends_with('/') {
            return Err(CourierError::Config(format!(
                "dispatch_path_marker must start and end with '/': {marker:?}"
            )));
        }
        Ok(())
    }

    pub fn soap_timeout(&self) -> Duration {
        Duration::from_millis(self.soap_timeout_ms)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_ms.map(Duration::from_millis)
    }

    pub fn client_ttl(&self) -> Duration {
        Duration::from_millis(self.client_ttl_ms)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CourierError> {
    value
        .trim()
        .parse()
        .map_err(|_| CourierError::Config(format!("{key} is not a number: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CourierConfig::from_json_str(r#"{"worker_count": 2}"#).unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.soap_timeout(), Duration::from_secs(60));
        assert_eq!(config.client_ttl(), Duration::from_secs(30));
        assert_eq!(config.http_timeout(), None);
        assert_eq!(config.dispatch_path_marker, "/processes/");
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("COURIER_WORKER_COUNT", "3"),
            ("COURIER_HTTP_TIMEOUT_MS", "1500"),
            ("COURIER_DISPATCH_PATH_MARKER", "/ode/processes/"),
        ]
        .into_iter()
        .collect();
        let config = CourierConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.http_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.dispatch_path_marker, "/ode/processes/");
    }

    #[test]
    fn bad_env_value_is_config_error() {
        let err = CourierConfig::default()
            .with_overrides(|k| (k == "COURIER_CLIENT_TTL_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, CourierError::Config(_)));
    }

    #[rstest]
    #[case(r#"{"worker_count": 0}"#)]
    #[case(r#"{"soap_timeout_ms": 0}"#)]
    #[case(r#"{"http_timeout_ms": 0}"#)]
    #[case(r#"{"dispatch_path_marker": "processes"}"#)]
    #[case(r#"{"dispatch_path_marker": "/"}"#)]
    #[case(r#"{"worker_count": "many"}"#)]
    fn invalid_configs_are_rejected(#[case] json: &str) {
        assert!(matches!(
            CourierConfig::from_json_str(json),
            Err(CourierError::Config(_))
        ));
    }
}
