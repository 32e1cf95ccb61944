//! MessageExchange - エンジンとパートナー間の 1 回のやり取り
//!
//! 呼び出しの試行ごとにエンジンが作成し、終端状態はトランザクション内で
//! 書き戻されます。別の呼び出しに再利用はしません。
//!
//! 返信の中身は `ReplyOutcome` に集約し、SOAP / HTTP のどちらの adapter も
//! isolated transaction の中で `MessageExchange::apply` を呼ぶだけにしています。

use serde::{Deserialize, Serialize};

use super::endpoint::EndpointReference;
use super::errors::CourierError;
use super::ids::ExchangeId;
use super::message::Message;
use super::partner_link::PartnerLink;
use super::state::ExchangeState;
use super::xml::{Element, QName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangePattern {
    OneWay,
    RequestResponse,
}

/// 失敗の分類
///
/// fault はプロトコルレベル、communication error はインフラレベル。
/// リトライ方針がこの区別で分岐するため混ぜないこと。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureType {
    CommunicationError,
    FormatError,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureType,
    pub reason: String,
    pub details: Option<Element>,
}

/// worker 側で確定した返信の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Response(Message),
    Fault { fault: QName, message: Message },
    Failure(Failure),
}

impl ReplyOutcome {
    pub fn failure(kind: FailureType, reason: impl Into<String>) -> Self {
        ReplyOutcome::Failure(Failure {
            kind,
            reason: reason.into(),
            details: None,
        })
    }

    pub fn failure_with_details(
        kind: FailureType,
        reason: impl Into<String>,
        details: Element,
    ) -> Self {
        ReplyOutcome::Failure(Failure {
            kind,
            reason: reason.into(),
            details: Some(details),
        })
    }

    pub fn target_state(&self) -> ExchangeState {
        match self {
            ReplyOutcome::Response(_) => ExchangeState::Replied,
            ReplyOutcome::Fault { .. } => ExchangeState::Faulted,
            ReplyOutcome::Failure(_) => ExchangeState::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageExchange {
    id: ExchangeId,
    operation: String,
    pattern: ExchangePattern,
    my_role_endpoint: Option<EndpointReference>,
    partner_endpoint: Option<EndpointReference>,
    my_role_session_id: Option<String>,
    partner_session_id: Option<String>,
    request: Message,
    state: ExchangeState,
    response: Option<Message>,
    fault: Option<QName>,
    failure: Option<Failure>,
    http_credentials: Option<HttpCredentials>,
}

/// パートナー呼び出しに付ける basic 認証
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCredentials {
    pub username: String,
    pub password: Option<String>,
}

impl MessageExchange {
    pub fn new(operation: impl Into<String>, pattern: ExchangePattern, request: Message) -> Self {
        Self {
            id: ExchangeId::generate(),
            operation: operation.into(),
            pattern,
            my_role_endpoint: None,
            partner_endpoint: None,
            my_role_session_id: None,
            partner_session_id: None,
            request,
            state: ExchangeState::Pending,
            response: None,
            fault: None,
            failure: None,
            http_credentials: None,
        }
    }

    /// partner link の現在の束縛から endpoint を解決して作成
    pub fn for_partner_link(
        link: &PartnerLink,
        operation: impl Into<String>,
        pattern: ExchangePattern,
        request: Message,
    ) -> Result<Self, CourierError> {
        let mut mex = Self::new(operation, pattern, request);
        mex.partner_endpoint = link.partner_endpoint()?;
        mex.my_role_endpoint = link.my_endpoint()?;
        Ok(mex)
    }

    pub fn with_partner_endpoint(mut self, epr: EndpointReference) -> Self {
        self.partner_endpoint = Some(epr);
        self
    }

    pub fn with_my_role_endpoint(mut self, epr: EndpointReference) -> Self {
        self.my_role_endpoint = Some(epr);
        self
    }

    pub fn with_partner_session(mut self, session_id: impl Into<String>) -> Self {
        self.partner_session_id = Some(session_id.into());
        self
    }

    pub fn with_my_role_session(mut self, session_id: impl Into<String>) -> Self {
        self.my_role_session_id = Some(session_id.into());
        self
    }

    pub fn with_http_credentials(
        mut self,
        username: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        self.http_credentials = Some(HttpCredentials {
            username: username.into(),
            password,
        });
        self
    }

    pub fn http_credentials(&self) -> Option<&HttpCredentials> {
        self.http_credentials.as_ref()
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn pattern(&self) -> ExchangePattern {
        self.pattern
    }

    pub fn is_two_way(&self) -> bool {
        self.pattern == ExchangePattern::RequestResponse
    }

    pub fn my_role_endpoint(&self) -> Option<&EndpointReference> {
        self.my_role_endpoint.as_ref()
    }

    pub fn partner_endpoint(&self) -> Option<&EndpointReference> {
        self.partner_endpoint.as_ref()
    }

    pub fn my_role_session_id(&self) -> Option<&str> {
        self.my_role_session_id.as_deref()
    }

    pub fn partner_session_id(&self) -> Option<&str> {
        self.partner_session_id.as_deref()
    }

    pub fn request(&self) -> &Message {
        &self.request
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn response(&self) -> Option<&Message> {
        self.response.as_ref()
    }

    pub fn fault(&self) -> Option<&QName> {
        self.fault.as_ref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// 正常以外の終端状態をエラー分類に写す（Replied や未確定なら None）
    pub fn outcome_error(&self) -> Option<CourierError> {
        match self.state {
            ExchangeState::Faulted => Some(CourierError::Fault(
                self.fault.as_ref().map(ToString::to_string).unwrap_or_default(),
            )),
            ExchangeState::Failed => self.failure.as_ref().map(|failure| {
                let reason = failure.reason.clone();
                match failure.kind {
                    FailureType::CommunicationError => CourierError::Communication(reason),
                    FailureType::FormatError => CourierError::Format(reason),
                    FailureType::Other => CourierError::Other(reason),
                }
            }),
            _ => None,
        }
    }

    fn transition(&mut self, next: ExchangeState) -> Result<(), CourierError> {
        if !self.state.can_transition_to(next) {
            return Err(CourierError::IllegalTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// 返信は後で非同期に届く
    pub fn reply_async(&mut self) -> Result<(), CourierError> {
        self.transition(ExchangeState::InFlight)
    }

    /// one-way の受理
    pub fn reply_one_way_ok(&mut self) -> Result<(), CourierError> {
        self.transition(ExchangeState::Accepted)
    }

    pub fn reply_with_failure(
        &mut self,
        kind: FailureType,
        reason: impl Into<String>,
        details: Option<Element>,
    ) -> Result<(), CourierError> {
        self.apply(ReplyOutcome::Failure(Failure {
            kind,
            reason: reason.into(),
            details,
        }))
    }

    pub fn apply(&mut self, outcome: ReplyOutcome) -> Result<(), CourierError> {
        self.transition(outcome.target_state())?;
        match outcome {
            ReplyOutcome::Response(message) => self.response = Some(message),
            ReplyOutcome::Fault { fault, message } => {
                self.fault = Some(fault);
                self.response = Some(message);
            }
            ReplyOutcome::Failure(failure) => self.failure = Some(failure),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mex(pattern: ExchangePattern) -> MessageExchange {
        MessageExchange::new("PlaceOrder", pattern, Message::new(QName::local("req")))
    }

    #[test]
    fn two_way_lifecycle() {
        let mut m = mex(ExchangePattern::RequestResponse);
        assert_eq!(m.state(), ExchangeState::Pending);
        m.reply_async().unwrap();
        m.apply(ReplyOutcome::Response(Message::new(QName::local("resp"))))
            .unwrap();
        assert_eq!(m.state(), ExchangeState::Replied);
        assert!(m.response().is_some());
    }

    #[test]
    fn fault_keeps_type_and_payload() {
        let mut m = mex(ExchangePattern::RequestResponse);
        m.reply_async().unwrap();
        let fault = QName::new("urn:f", "OutOfStock");
        m.apply(ReplyOutcome::Fault {
            fault: fault.clone(),
            message: Message::new(QName::local("f")),
        })
        .unwrap();
        assert_eq!(m.state(), ExchangeState::Faulted);
        assert_eq!(m.fault(), Some(&fault));
    }

    #[test]
    fn terminal_states_cannot_be_replied_twice() {
        let mut m = mex(ExchangePattern::RequestResponse);
        m.reply_async().unwrap();
        m.reply_with_failure(FailureType::CommunicationError, "down", None)
            .unwrap();
        let err = m
            .apply(ReplyOutcome::Response(Message::new(QName::local("late"))))
            .unwrap_err();
        assert!(matches!(err, CourierError::IllegalTransition { .. }));
        assert_eq!(m.failure().unwrap().kind, FailureType::CommunicationError);
    }

    #[test]
    fn one_way_accepted_then_failed() {
        let mut m = mex(ExchangePattern::OneWay);
        m.reply_one_way_ok().unwrap();
        assert_eq!(m.state(), ExchangeState::Accepted);
        m.reply_with_failure(FailureType::CommunicationError, "refused", None)
            .unwrap();
        assert_eq!(m.state(), ExchangeState::Failed);
    }

    #[test]
    fn outcome_error_follows_the_taxonomy() {
        use crate::domain::ErrorKind;

        let mut replied = mex(ExchangePattern::RequestResponse);
        assert!(replied.outcome_error().is_none());
        replied.reply_async().unwrap();
        replied
            .apply(ReplyOutcome::Response(Message::new(QName::local("resp"))))
            .unwrap();
        assert!(replied.outcome_error().is_none());

        let mut faulted = mex(ExchangePattern::RequestResponse);
        faulted.reply_async().unwrap();
        faulted
            .apply(ReplyOutcome::Fault {
                fault: QName::new("urn:f", "OutOfStock"),
                message: Message::new(QName::local("f")),
            })
            .unwrap();
        let err = faulted.outcome_error().unwrap();
        assert_eq!(err.kind(), ErrorKind::ProtocolFault);
        assert_eq!(err.to_string(), "protocol fault: {urn:f}OutOfStock");

        let mut failed = mex(ExchangePattern::OneWay);
        failed.reply_one_way_ok().unwrap();
        failed
            .reply_with_failure(FailureType::CommunicationError, "refused", None)
            .unwrap();
        assert_eq!(failed.outcome_error().unwrap().kind(), ErrorKind::Communication);
    }

    #[test]
    fn partner_link_endpoints_are_resolved() {
        let mut link = PartnerLink::new(1, "shipping");
        link.set_partner_epr(Some(
            Element::local("address").with_attribute("location", "http://partner/ship"),
        ));
        let m = MessageExchange::for_partner_link(
            &link,
            "Ship",
            ExchangePattern::OneWay,
            Message::new(QName::local("req")),
        )
        .unwrap();
        assert_eq!(
            m.partner_endpoint().unwrap().address().as_str(),
            "http://partner/ship"
        );
        assert!(m.my_role_endpoint().is_none());
    }
}
