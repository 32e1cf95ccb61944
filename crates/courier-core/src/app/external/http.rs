//! HttpExternalService - HTTP binding の外部サービス呼び出し
//!
//! 構築時に binding を検証し、operation ごとの verb / location / input の載せ方を確定します。
//! 応答はステータスコードの範囲だけで分類します。
//!
//! | status | 結果 |
//! |---|---|
//! | 2xx | 応答 body を output part に変換（typed part かつ `text/plain` なら body をそのままテキストに） |
//! | 3xx | failure（redirect は追わない） |
//! | 4xx | failure（bad request） |
//! | 5xx | fault `HttpRemoteServerFault`（status line 付き） |
//! | その他 | failure（unmanaged status） |

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::InvocationContext;
use super::http_method::{self, HttpOperation};
use super::reply::ReplyChannel;
use crate::domain::{
    CourierError, ENGINE_EXTENSION_NS, Element, EndpointReference, ExchangeId, FailureType,
    Message, MessageExchange, PartDefinition, QName, ReplyOutcome, ServiceDefinition,
};
use crate::ports::{
    HttpTransport, InboundResponse, OutboundRequest, TransactionScope, TransportError,
};

pub fn remote_server_fault() -> QName {
    QName::new(ENGINE_EXTENSION_NS, "HttpRemoteServerFault")
}

pub struct HttpExternalService {
    service: Arc<ServiceDefinition>,
    port_name: String,
    endpoint: EndpointReference,
    operations: HashMap<String, HttpOperation>,
    timeout: Option<Duration>,
    context: InvocationContext,
}

impl HttpExternalService {
    pub fn new(
        service: Arc<ServiceDefinition>,
        port_name: &str,
        context: InvocationContext,
        timeout: Option<Duration>,
    ) -> Result<Self, CourierError> {
        let port = service.port(port_name).ok_or_else(|| {
            CourierError::InvalidBinding(format!(
                "port '{port_name}' is not defined on service {}",
                service.name
            ))
        })?;
        let operations = http_method::validate_binding(port, &service.operations)?
            .into_iter()
            .collect();
        let endpoint = EndpointReference::parse(&port.address)?;
        Ok(Self {
            port_name: port_name.to_string(),
            service,
            endpoint,
            operations,
            timeout,
            context,
        })
    }

    pub fn service_name(&self) -> &QName {
        &self.service.name
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn initial_endpoint_reference(&self) -> &EndpointReference {
        &self.endpoint
    }

    pub fn close(&self) {
        self.context.transport.close();
    }

    pub fn invoke(
        &self,
        tx: &dyn TransactionScope,
        exchange: &mut MessageExchange,
    ) -> Result<(), CourierError> {
        let name = exchange.operation().to_string();
        let (operation, http) = self
            .service
            .operation(&name)
            .zip(self.operations.get(&name))
            .ok_or_else(|| {
                CourierError::InvalidBinding(format!(
                    "operation '{name}' is not bound on port '{}'",
                    self.port_name
                ))
            })?;
        let base = exchange
            .partner_endpoint()
            .map(|e| e.address().clone())
            .unwrap_or_else(|| self.endpoint.address().clone());

        let request = match http_method::build_request(&base, operation, http, exchange.request()) {
            Ok(request) => request
                .with_timeout(self.timeout)
                .with_credentials(exchange.http_credentials().cloned()),
            Err(e) => return self.context.fail_construction(exchange, e),
        };

        let call = HttpCall {
            transport: Arc::clone(&self.context.transport),
            reply: self.context.reply_channel(),
            output_type: operation.output.as_ref().map(|o| o.name.clone()),
            output_part: operation
                .output
                .as_ref()
                .and_then(|o| o.parts.first().cloned()),
            two_way: exchange.is_two_way(),
        };
        info!(
            mex = %exchange.id(),
            operation = %name,
            method = request.method.as_str(),
            url = %request.url,
            "http invocation"
        );
        let id = exchange.id();
        self.context
            .schedule(tx, exchange, async move { call.run(id, request).await })
    }
}

struct HttpCall {
    transport: Arc<dyn HttpTransport>,
    reply: ReplyChannel,
    output_type: Option<QName>,
    output_part: Option<PartDefinition>,
    two_way: bool,
}

impl HttpCall {
    async fn run(self, id: ExchangeId, request: OutboundRequest) {
        let url = request.url.clone();
        let outcome = match self.transport.execute(request).await {
            Err(TransportError::Body {
                status,
                status_line,
                reason,
            }) if self.two_way => Some(self.unreadable_body(id, status, status_line, reason)),
            Err(e) => {
                error!(mex = %id, url = %url, error = %e, "unable to execute http request");
                Some(ReplyOutcome::failure(
                    FailureType::CommunicationError,
                    format!("Unable to execute http request : {e}"),
                ))
            }
            // one-way は応答を見ない
            Ok(_) if !self.two_way => None,
            Ok(response) => Some(self.classify(id, &response)),
        };
        if let Some(outcome) = outcome {
            self.reply.deliver(id, outcome).await;
        }
    }

    fn classify(&self, id: ExchangeId, response: &InboundResponse) -> ReplyOutcome {
        let status_line = &response.status_line;
        match response.status {
            200..=299 => self.success(id, response),
            300..=399 => {
                error!(mex = %id, status = response.status, "redirections are not supported");
                ReplyOutcome::failure(
                    FailureType::Other,
                    format!("Redirections are not supported! {status_line}"),
                )
            }
            400..=499 => {
                error!(mex = %id, status = response.status, "bad request");
                ReplyOutcome::failure(FailureType::Other, format!("Bad Request! {status_line}"))
            }
            500..=599 => {
                error!(mex = %id, status = response.status, "http server error");
                let fault = remote_server_fault();
                let root = Element::local("message")
                    .with_child(Element::local("statusLine").with_text(status_line.as_str()));
                ReplyOutcome::Fault {
                    message: Message::from_element(fault.clone(), root),
                    fault,
                }
            }
            _ => {
                error!(mex = %id, status = response.status, "unmanaged status code");
                ReplyOutcome::failure(
                    FailureType::Other,
                    format!("Unmanaged Status Code! {status_line}"),
                )
            }
        }
    }

    /// body の読み込み失敗は 2xx なら format error、それ以外はステータスで分類
    fn unreadable_body(
        &self,
        id: ExchangeId,
        status: u16,
        status_line: String,
        reason: String,
    ) -> ReplyOutcome {
        if (200..300).contains(&status) {
            error!(mex = %id, error = %reason, "unable to read the response body");
            return ReplyOutcome::failure(
                FailureType::FormatError,
                format!("Unable to read the response body : {reason}"),
            );
        }
        self.classify(
            id,
            &InboundResponse {
                status,
                status_line,
                content_type: None,
                body: String::new(),
            },
        )
    }

    fn success(&self, id: ExchangeId, response: &InboundResponse) -> ReplyOutcome {
        debug!(mex = %id, status_line = %response.status_line, "http success");
        if response.body.trim().is_empty() {
            error!(mex = %id, "empty response body for a two-way message");
            return ReplyOutcome::failure(
                FailureType::Other,
                format!("Response body of a two-way message is empty! Msg Id={id}"),
            );
        }
        if let (Some(output_type), Some(part)) = (&self.output_type, &self.output_part) {
            if part.element.is_none() && is_plain_text(response.content_type.as_deref()) {
                let mut message = Message::new(output_type.clone());
                let text = Element::local(&part.name).with_text(response.body.as_str());
                message.set_part(&part.name, text);
                info!(mex = %id, "http plain text response received");
                return ReplyOutcome::Response(message);
            }
        }
        let body = match Element::parse(&response.body) {
            Ok(body) => body,
            Err(e) => {
                error!(mex = %id, error = %e, "unable to parse the response body");
                return ReplyOutcome::failure(
                    FailureType::FormatError,
                    format!("Unable to parse the response body : {e}"),
                );
            }
        };
        let (Some(output_type), Some(part)) = (&self.output_type, &self.output_part) else {
            error!(mex = %id, "operation declares no output part");
            return ReplyOutcome::failure_with_details(
                FailureType::Other,
                "Unable to process response: operation declares no output part",
                body,
            );
        };

        let mut message = Message::new(output_type.clone());
        message.set_part(&part.name, part_element(id, part, body));
        info!(mex = %id, "http response received");
        ReplyOutcome::Response(message)
    }
}

fn is_plain_text(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/plain"))
}

/// 応答 body を part 要素にする（要素名は part 名）
///
/// - element 宣言の part: body 要素をそのまま子にする
/// - body が空: 空テキスト
/// - body がテキストだけ: そのテキスト
/// - それ以外: body の子ノードをすべて取り込む（ルートの属性は捨てる）
fn part_element(id: ExchangeId, part: &PartDefinition, body: Element) -> Element {
    let element = Element::local(&part.name);
    if part.element.is_some() {
        return element.with_child(body);
    }
    if body.is_empty() {
        return element.with_text("");
    }
    if let Some(text) = body.text_content() {
        return element.with_text(text);
    }
    if body.has_attributes() {
        warn!(mex = %id, element = %body.name, "attributes on the response root are ignored");
    }
    Element {
        children: body.children,
        ..element
    }
}
