//! HttpTransport port - 送信先への HTTP 呼び出し
//!
//! SOAP / HTTP どちらの adapter もこの port を通してネットワークに出ます。
//! 実装は worker pool から並行に呼ばれるので、共有して安全でなければいけません。

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::domain::{HttpCredentials, HttpVerb};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpVerb,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// None なら transport 側の既定値
    pub timeout: Option<Duration>,
    pub credentials: Option<HttpCredentials>,
}

impl OutboundRequest {
    pub fn new(method: HttpVerb, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            timeout: None,
            credentials: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<HttpCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
    pub status: u16,
    /// 例: `HTTP/1.1 503 Service Unavailable`
    pub status_line: String,
    pub content_type: Option<String>,
    pub body: String,
}

/// 送信失敗（どれも communication error として扱われる）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("i/o error: {0}")]
    Io(String),

    /// ステータス行までは受け取れたが body を読み切れなかった
    #[error("unable to read response body ({status_line}): {reason}")]
    Body {
        status: u16,
        status_line: String,
        reason: String,
    },

    #[error("transport is closed")]
    Closed,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError>;

    /// 保持している接続を解放（2 回目以降は何もしない）
    fn close(&self);
}
