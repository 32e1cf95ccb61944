//! External services - パートナー呼び出しの adapter
//!
//! # 設計原則
//! - request-response: 呼び出し元トランザクションに synchronizer を登録するだけで戻る。
//!   コミットされたときだけ worker pool に投入する（ロールバックされた仕事は外に出ない）
//! - one-way: その場で worker pool に投入し、受理を返す
//! - 結果は `ReplyChannel` が isolated transaction で書き戻す
//! - fault（プロトコル）と communication error（インフラ）は混ぜない
//!
//! transport ごとの差は `ExternalService` の variant で表し、
//! port の binding から構築時に選びます。

pub mod http;
pub mod http_method;
pub mod reply;
pub mod soap;

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::CourierConfig;
use crate::domain::{
    BindingKind, CourierError, EndpointReference, FailureType, MessageExchange, QName,
    ReplyOutcome, ServiceDefinition,
};
use crate::ports::{
    ExchangeStore, HttpTransport, MessageConverter, Scheduler, TransactionScope,
};

use self::http::HttpExternalService;
use self::reply::ReplyChannel;
use self::soap::SoapExternalService;
use super::worker_pool::WorkerPool;

/// adapter が共有する協調者
#[derive(Clone)]
pub struct InvocationContext {
    pub scheduler: Arc<dyn Scheduler>,
    pub store: Arc<dyn ExchangeStore>,
    pub pool: Arc<WorkerPool>,
    pub transport: Arc<dyn HttpTransport>,
    pub converter: Arc<dyn MessageConverter>,
}

impl InvocationContext {
    pub fn reply_channel(&self) -> ReplyChannel {
        ReplyChannel::new(Arc::clone(&self.scheduler), Arc::clone(&self.store))
    }

    /// 交換を遷移させ、呼び出しジョブを投入（two-way はコミット後）
    ///
    /// 遷移後の交換は store に保存されます。worker 側はそれを ID で引き直します。
    pub(crate) fn schedule<F>(
        &self,
        tx: &dyn TransactionScope,
        exchange: &mut MessageExchange,
        job: F,
    ) -> Result<(), CourierError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = exchange.id();
        if exchange.is_two_way() {
            exchange.reply_async()?;
            self.store.save(exchange.clone());
            let pool = Arc::clone(&self.pool);
            let reply = self.reply_channel();
            tx.register_synchronizer(Box::new(move |committed: bool| {
                if !committed {
                    debug!(mex = %id, "transaction rolled back; request not sent");
                    return;
                }
                if let Err(e) = pool.submit(job) {
                    warn!(mex = %id, error = %e, "unable to submit request after commit");
                    reply.deliver_blocking(
                        id,
                        ReplyOutcome::failure(
                            FailureType::Other,
                            format!("Unable to schedule the partner call: {e}"),
                        ),
                    );
                }
            }));
        } else {
            exchange.reply_one_way_ok()?;
            self.store.save(exchange.clone());
            self.pool.submit(job)?;
        }
        debug!(mex = %id, operation = exchange.operation(), two_way = exchange.is_two_way(), "invocation scheduled");
        Ok(())
    }

    /// リクエストを組み立てられなかったときの処理
    ///
    /// format error はその場で交換の failure として返します（ネットワークには出ない）。
    /// それ以外のエラーは呼び出し元にそのまま返します。
    pub(crate) fn fail_construction(
        &self,
        exchange: &mut MessageExchange,
        err: CourierError,
    ) -> Result<(), CourierError> {
        match err {
            CourierError::Format(reason) => {
                error!(mex = %exchange.id(), reason = %reason, "unable to build request");
                exchange.reply_with_failure(FailureType::FormatError, reason, None)?;
                self.store.save(exchange.clone());
                Ok(())
            }
            other => Err(other),
        }
    }
}

pub enum ExternalService {
    Soap(SoapExternalService),
    Http(HttpExternalService),
}

impl ExternalService {
    /// port の binding に応じた adapter を作る
    pub fn for_port(
        service: Arc<ServiceDefinition>,
        port_name: &str,
        context: InvocationContext,
        config: &CourierConfig,
    ) -> Result<Self, CourierError> {
        let port = service.port(port_name).ok_or_else(|| {
            CourierError::InvalidBinding(format!(
                "port '{port_name}' is not defined on service {}",
                service.name
            ))
        })?;
        match port.binding {
            BindingKind::Soap => Ok(ExternalService::Soap(SoapExternalService::new(
                service.clone(),
                port_name,
                context,
                config.soap_timeout(),
            )?)),
            BindingKind::Http { .. } => Ok(ExternalService::Http(HttpExternalService::new(
                service.clone(),
                port_name,
                context,
                config.http_timeout(),
            )?)),
        }
    }

    pub fn invoke(
        &self,
        tx: &dyn TransactionScope,
        exchange: &mut MessageExchange,
    ) -> Result<(), CourierError> {
        match self {
            ExternalService::Soap(s) => s.invoke(tx, exchange),
            ExternalService::Http(h) => h.invoke(tx, exchange),
        }
    }

    pub fn close(&self) {
        match self {
            ExternalService::Soap(s) => s.close(),
            ExternalService::Http(h) => h.close(),
        }
    }

    pub fn initial_endpoint_reference(&self) -> &EndpointReference {
        match self {
            ExternalService::Soap(s) => s.initial_endpoint_reference(),
            ExternalService::Http(h) => h.initial_endpoint_reference(),
        }
    }

    pub fn service_name(&self) -> &QName {
        match self {
            ExternalService::Soap(s) => s.service_name(),
            ExternalService::Http(h) => h.service_name(),
        }
    }

    pub fn port_name(&self) -> &str {
        match self {
            ExternalService::Soap(s) => s.port_name(),
            ExternalService::Http(h) => h.port_name(),
        }
    }
}
