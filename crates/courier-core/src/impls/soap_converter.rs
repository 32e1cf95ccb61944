//! DocLiteralConverter - document/literal の SOAP 1.1 envelope 変換
//!
//! # part の載せ方
//! - element 宣言の part: part 要素の最初の子要素をそのまま Body に置く
//! - type 宣言の part: operation 名のラッパー要素の下に part 要素を並べる
//!
//! # ヘッダ
//! WS-Addressing（Action / To / MessageID / ReplyTo）と、
//! セッション固定用の `session` / `callback` ブロックを付けます。

use crate::domain::{CourierError, Element, Message, OperationDefinition, QName};
use crate::ports::{MessageConverter, SessionHeaders, SoapFault};

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const WSA_NS: &str = "http://www.w3.org/2005/08/addressing";
pub const WSA_ANONYMOUS: &str = "http://www.w3.org/2005/08/addressing/anonymous";
pub const SESSION_NS: &str = "http://www.intalio.com/type/session";

#[derive(Debug, Clone, Copy, Default)]
pub struct DocLiteralConverter;

impl DocLiteralConverter {
    pub fn new() -> Self {
        Self
    }
}

fn soap(local: &str) -> QName {
    QName::new(SOAP_ENV_NS, local)
}

fn wsa(local: &str, text: impl Into<String>) -> Element {
    Element::new(QName::new(WSA_NS, local)).with_text(text)
}

fn build_header(headers: &SessionHeaders) -> Option<Element> {
    let mut header = Element::new(soap("Header"));
    if let Some(to) = &headers.to {
        header.push_child(wsa("To", to.as_str()));
    }
    if let Some(action) = &headers.action {
        header.push_child(wsa("Action", action.as_str()));
    }
    if let Some(message_id) = &headers.message_id {
        header.push_child(wsa("MessageID", message_id.as_str()));
        header.push_child(
            Element::new(QName::new(WSA_NS, "ReplyTo")).with_child(wsa("Address", WSA_ANONYMOUS)),
        );
    }
    if let Some(session) = &headers.partner_session {
        header.push_child(Element::new(QName::new(SESSION_NS, "session")).with_text(session.as_str()));
    }
    if headers.callback_address.is_some() || headers.callback_session.is_some() {
        let mut callback = Element::new(QName::new(SESSION_NS, "callback"));
        if let Some(address) = &headers.callback_address {
            callback.push_child(wsa("Address", address.as_str()));
        }
        if let Some(session) = &headers.callback_session {
            callback.push_child(
                Element::new(QName::new(SESSION_NS, "session")).with_text(session.as_str()),
            );
        }
        header.push_child(callback);
    }
    (!header.children.is_empty()).then_some(header)
}

fn soap_body(envelope: &Element) -> Result<&Element, CourierError> {
    if envelope.name != soap("Envelope") {
        return Err(CourierError::Format(format!(
            "expected a SOAP envelope, got {}",
            envelope.name
        )));
    }
    envelope
        .child_elements()
        .find(|e| e.name == soap("Body"))
        .ok_or_else(|| CourierError::Format("SOAP envelope without Body".to_string()))
}

impl MessageConverter for DocLiteralConverter {
    fn create_soap_request(
        &self,
        operation: &OperationDefinition,
        message: &Message,
        headers: &SessionHeaders,
    ) -> Result<Element, CourierError> {
        let mut body = Element::new(soap("Body"));
        let namespace = operation.input.name.namespace().unwrap_or_default().to_string();
        let mut wrapper: Option<Element> = None;

        for part in &operation.input.parts {
            let content = message.part(&part.name).ok_or_else(|| {
                CourierError::Format(format!(
                    "message for operation '{}' is missing part '{}'",
                    operation.name, part.name
                ))
            })?;
            if part.element.is_some() {
                let element = content.first_child_element().ok_or_else(|| {
                    CourierError::Format(format!("element part '{}' is empty", part.name))
                })?;
                body.push_child(element.clone());
            } else {
                wrapper
                    .get_or_insert_with(|| Element::new(QName::new(namespace.clone(), &operation.name)))
                    .push_child(content.clone());
            }
        }
        if let Some(wrapper) = wrapper {
            body.push_child(wrapper);
        }

        let mut envelope = Element::new(soap("Envelope"));
        if let Some(header) = build_header(headers) {
            envelope.push_child(header);
        }
        envelope.push_child(body);
        Ok(envelope)
    }

    fn parse_soap_response(
        &self,
        operation: &OperationDefinition,
        envelope: &Element,
    ) -> Result<Message, CourierError> {
        let body = soap_body(envelope)?;
        let output = operation.output.as_ref().ok_or_else(|| {
            CourierError::Format(format!("operation '{}' has no output", operation.name))
        })?;

        let mut message = Message::new(output.name.clone());
        let wrapper = body.first_child_element();
        for (index, part) in output.parts.iter().enumerate() {
            let content = match &part.element {
                Some(element_name) => body
                    .child_elements()
                    .find(|e| &e.name == element_name)
                    .or_else(|| body.child_elements().nth(index))
                    .map(|e| Element::local(&part.name).with_child(e.clone())),
                None => wrapper.and_then(|w| w.child_by_local(&part.name)).cloned(),
            };
            let content = content.ok_or_else(|| {
                CourierError::Format(format!(
                    "response for operation '{}' is missing part '{}'",
                    operation.name, part.name
                ))
            })?;
            message.set_part(&part.name, content);
        }
        Ok(message)
    }

    fn parse_soap_fault(&self, envelope: &Element) -> Option<SoapFault> {
        let body = soap_body(envelope).ok()?;
        let fault = body.child_elements().find(|e| e.name == soap("Fault"))?;
        let code = fault
            .child_by_local("faultcode")
            .map(|c| c.deep_text().trim().to_string());
        let reason = fault
            .child_by_local("faultstring")
            .map(|s| s.deep_text().trim().to_string())
            .unwrap_or_default();
        let detail = fault
            .child_by_local("detail")
            .and_then(Element::first_child_element)
            .cloned();
        Some(SoapFault {
            code,
            reason,
            detail,
            body: body.clone(),
        })
    }

    fn fault_message(&self, message_type: QName, fault: &SoapFault) -> Message {
        let mut message = Message::new(message_type);
        let content = fault.detail.as_ref().unwrap_or(&fault.body).clone();
        message.set_part("detail", Element::local("detail").with_child(content));
        message
    }
}
