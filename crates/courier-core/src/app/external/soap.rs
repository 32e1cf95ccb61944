//! SoapExternalService - SOAP binding の外部サービス呼び出し
//!
//! # 手順
//! 1. action を決める（WS-Addressing の input action、無ければ binding の soapAction）
//! 2. 宛先は交換の partner endpoint、無ければ port のアドレス
//! 3. converter で envelope を組み立て、セッションヘッダを付ける
//! 4. two-way はコミット後、one-way は即座に worker pool へ
//! 5. 応答は正常 / fault / 通信失敗に分類して isolated transaction で返す
//!    （2xx 以外で SOAP fault でない応答は通信失敗）

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::InvocationContext;
use super::reply::ReplyChannel;
use crate::domain::{
    BindingKind, CourierError, ENGINE_EXTENSION_NS, Element, EndpointReference, ExchangeId,
    FailureType,
    HttpVerb, MessageExchange, OperationDefinition, QName, ReplyOutcome, ServiceDefinition,
};
use crate::ports::{
    HttpTransport, InboundResponse, MessageConverter, OutboundRequest, SessionHeaders,
    TransactionScope,
};

pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

pub struct SoapExternalService {
    service: Arc<ServiceDefinition>,
    port_name: String,
    endpoint: EndpointReference,
    timeout: Duration,
    context: InvocationContext,
}

impl SoapExternalService {
    pub fn new(
        service: Arc<ServiceDefinition>,
        port_name: &str,
        context: InvocationContext,
        timeout: Duration,
    ) -> Result<Self, CourierError> {
        let port = service.port(port_name).ok_or_else(|| {
            CourierError::InvalidBinding(format!(
                "port '{port_name}' is not defined on service {}",
                service.name
            ))
        })?;
        if port.binding != BindingKind::Soap {
            return Err(CourierError::InvalidBinding(format!(
                "port '{port_name}' does not use a SOAP binding"
            )));
        }
        let endpoint = EndpointReference::parse(&port.address)?;
        Ok(Self {
            port_name: port_name.to_string(),
            service,
            endpoint,
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

    fn operation(&self, name: &str) -> Result<&OperationDefinition, CourierError> {
        self.service.operation(name).ok_or_else(|| {
            CourierError::InvalidBinding(format!(
                "operation '{name}' is not defined on service {}",
                self.service.name
            ))
        })
    }

    fn action(&self, operation: &OperationDefinition) -> Option<String> {
        operation.input_action.clone().or_else(|| {
            self.service
                .port(&self.port_name)
                .and_then(|p| p.operation_binding(&operation.name))
                .and_then(|b| b.soap_action.clone())
        })
    }

    pub fn invoke(
        &self,
        tx: &dyn TransactionScope,
        exchange: &mut MessageExchange,
    ) -> Result<(), CourierError> {
        let operation = self.operation(exchange.operation())?;
        let target = exchange
            .partner_endpoint()
            .cloned()
            .unwrap_or_else(|| self.endpoint.clone());
        let action = self.action(operation);

        let partner_session = exchange
            .partner_session_id()
            .or(target.session_id())
            .map(str::to_string);
        if let Some(session) = &partner_session {
            debug!(mex = %exchange.id(), session = %session, "partner session header");
        }
        let headers = SessionHeaders {
            action: action.clone(),
            to: Some(target.address().clone()),
            partner_session,
            callback_session: exchange.my_role_session_id().map(str::to_string),
            callback_address: exchange.my_role_endpoint().map(|e| e.address().clone()),
            message_id: exchange
                .is_two_way()
                .then(|| format!("uuid:{}", Uuid::new_v4())),
        };

        let envelope = match self
            .context
            .converter
            .create_soap_request(operation, exchange.request(), &headers)
        {
            Ok(envelope) => envelope,
            Err(e) => return self.context.fail_construction(exchange, e),
        };
        let request = OutboundRequest::new(HttpVerb::Post, target.address().clone())
            .with_header("Content-Type", SOAP_CONTENT_TYPE)
            .with_header("SOAPAction", format!("\"{}\"", action.unwrap_or_default()))
            .with_body(envelope.to_xml())
            .with_timeout(Some(self.timeout))
            .with_credentials(exchange.http_credentials().cloned());

        let call = SoapCall {
            transport: Arc::clone(&self.context.transport),
            converter: Arc::clone(&self.context.converter),
            reply: self.context.reply_channel(),
            service: Arc::clone(&self.service),
            operation: operation.name.clone(),
            two_way: exchange.is_two_way(),
        };
        info!(mex = %exchange.id(), operation = %operation.name, url = %target.address(), "soap invocation");
        let id = exchange.id();
        self.context
            .schedule(tx, exchange, async move { call.run(id, request).await })
    }
}

/// worker pool 上で実行する 1 回分の呼び出し
struct SoapCall {
    transport: Arc<dyn HttpTransport>,
    converter: Arc<dyn MessageConverter>,
    reply: ReplyChannel,
    service: Arc<ServiceDefinition>,
    operation: String,
    two_way: bool,
}

impl SoapCall {
    async fn run(self, id: ExchangeId, request: OutboundRequest) {
        let url = request.url.clone();
        let outcome = match self.transport.execute(request).await {
            Err(e) => {
                error!(mex = %id, url = %url, error = %e, "soap request failed");
                Some(ReplyOutcome::failure(
                    FailureType::CommunicationError,
                    format!("Error sending message to partner: {e}"),
                ))
            }
            Ok(_) if !self.two_way => {
                debug!(mex = %id, "one-way request sent");
                None
            }
            Ok(response) => Some(self.classify(id, &response)),
        };
        if let Some(outcome) = outcome {
            self.reply.deliver(id, outcome).await;
        }
    }

    /// 2xx 以外で SOAP fault を含まない応答は transport レベルの失敗
    fn transport_failure(&self, id: ExchangeId, response: &InboundResponse) -> ReplyOutcome {
        error!(mex = %id, status = response.status, status_line = %response.status_line, "soap request rejected by transport");
        ReplyOutcome::failure(
            FailureType::CommunicationError,
            format!("Error sending message to partner: {}", response.status_line),
        )
    }

    fn classify(&self, id: ExchangeId, response: &InboundResponse) -> ReplyOutcome {
        let accepted = (200..300).contains(&response.status);
        let envelope = match Element::parse(&response.body) {
            Ok(envelope) => envelope,
            Err(_) if !accepted => return self.transport_failure(id, response),
            Err(e) => {
                error!(mex = %id, status = response.status, error = %e, "unparseable soap response");
                return ReplyOutcome::failure(
                    FailureType::FormatError,
                    format!("Unable to parse response: {e}"),
                );
            }
        };
        let Some(operation) = self.service.operation(&self.operation) else {
            return ReplyOutcome::failure(
                FailureType::Other,
                format!("operation '{}' disappeared from the service", self.operation),
            );
        };

        if let Some(fault) = self.converter.parse_soap_fault(&envelope) {
            return match fault.detail_name().cloned() {
                Some(fault_name) => {
                    let message_type = operation
                        .fault(&fault_name.local)
                        .and_then(|f| f.message.clone())
                        .unwrap_or_else(|| {
                            debug!(mex = %id, fault = %fault_name, "fault is not declared; unknown fault");
                            QName::new(ENGINE_EXTENSION_NS, "unknownFault")
                        });
                    warn!(mex = %id, fault = %fault_name, "fault response");
                    let message = self.converter.fault_message(message_type, &fault);
                    ReplyOutcome::Fault {
                        fault: fault_name,
                        message,
                    }
                }
                None => {
                    warn!(mex = %id, reason = %fault.reason, "fault response without type");
                    ReplyOutcome::failure_with_details(FailureType::Other, fault.reason, fault.body)
                }
            };
        }

        if !accepted {
            return self.transport_failure(id, response);
        }

        match self.converter.parse_soap_response(operation, &envelope) {
            Ok(message) => {
                info!(mex = %id, operation = %self.operation, "soap response received");
                ReplyOutcome::Response(message)
            }
            Err(e) => {
                error!(mex = %id, error = %e, "unable to process response");
                ReplyOutcome::failure(FailureType::Other, format!("Unable to process response: {e}"))
            }
        }
    }
}
