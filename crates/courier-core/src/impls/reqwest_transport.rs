//! ReqwestTransport - reqwest による HttpTransport 実装

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use super::client_pool::ClientPool;
use crate::domain::HttpVerb;
use crate::ports::{HttpTransport, InboundResponse, OutboundRequest, TransportError};

pub struct ReqwestTransport {
    pool: ClientPool,
}

impl ReqwestTransport {
    pub fn new(client_ttl: Duration) -> Self {
        Self {
            pool: ClientPool::new(client_ttl),
        }
    }

    pub fn pool(&self) -> &ClientPool {
        &self.pool
    }
}

fn method(verb: HttpVerb) -> Method {
    match verb {
        HttpVerb::Get => Method::GET,
        HttpVerb::Post => Method::POST,
        HttpVerb::Put => Method::PUT,
        HttpVerb::Delete => Method::DELETE,
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else {
        TransportError::Io(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        let client = self.pool.client_for(&request.url)?;
        debug!(method = request.method.as_str(), url = %request.url, "http request");

        let mut builder = client.request(method(request.method), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(credentials) = &request.credentials {
            builder = builder.basic_auth(&credentials.username, credentials.password.as_ref());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let status_line = format!("{:?} {}", response.version(), status);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| TransportError::Body {
            status: status.as_u16(),
            status_line: status_line.clone(),
            reason: e.to_string(),
        })?;
        debug!(status = status.as_u16(), url = %request.url, "http response");

        Ok(InboundResponse {
            status: status.as_u16(),
            status_line,
            content_type,
            body,
        })
    }

    fn close(&self) {
        if self.pool.close() {
            info!("http transport closed");
        }
    }
}
