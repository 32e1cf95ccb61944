//! ClientPool - 送信先ごとの HTTP client キャッシュ
//!
//! 接続確立のコストを償却するため、送信先 origin（scheme + host + port）ごとに
//! `reqwest::Client` を使い回します。生成から TTL を過ぎた client は次の取得時に捨てます。
//!
//! # 実装
//! - `Mutex<HashMap<origin, PooledClient>>`、取得のたびに期限切れを掃除
//! - redirect は追わない（3xx はそのまま呼び出し側に返す）
//! - `close()` は 1 回だけ効く。閉じた後の取得は `TransportError::Closed`

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use crate::ports::TransportError;

struct PooledClient {
    client: reqwest::Client,
    created_at: Instant,
}

pub struct ClientPool {
    ttl: Duration,
    clients: Mutex<HashMap<String, PooledClient>>,
    closed: AtomicBool,
}

impl ClientPool {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            clients: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn client_for(&self, url: &Url) -> Result<reqwest::Client, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let origin = url.origin().ascii_serialization();
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let ttl = self.ttl;
        clients.retain(|_, pooled| pooled.created_at.elapsed() < ttl);

        if let Some(pooled) = clients.get(&origin) {
            return Ok(pooled.client.clone());
        }
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| TransportError::Io(format!("failed to build http client: {e}")))?;
        debug!(origin = %origin, "new pooled http client");
        clients.insert(
            origin,
            PooledClient {
                client: client.clone(),
                created_at: Instant::now(),
            },
        );
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 初回だけ true を返す
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_are_shared_per_origin() {
        let pool = ClientPool::new(Duration::from_secs(30));
        pool.client_for(&Url::parse("http://a:8080/x").unwrap()).unwrap();
        pool.client_for(&Url::parse("http://a:8080/y?z=1").unwrap()).unwrap();
        pool.client_for(&Url::parse("http://b/").unwrap()).unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn expired_clients_are_evicted() {
        let pool = ClientPool::new(Duration::ZERO);
        pool.client_for(&Url::parse("http://a/").unwrap()).unwrap();
        pool.client_for(&Url::parse("http://b/").unwrap()).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn close_happens_once() {
        let pool = ClientPool::new(Duration::from_secs(30));
        pool.client_for(&Url::parse("http://a/").unwrap()).unwrap();
        assert!(pool.close());
        assert!(!pool.close());
        assert!(pool.is_empty());
        assert!(matches!(
            pool.client_for(&Url::parse("http://a/").unwrap()),
            Err(TransportError::Closed)
        ));
    }
}
