//! MessageConverter port - エンジン内部メッセージと SOAP envelope の相互変換
//!
//! operation 名をキーにした双方向 codec として扱います。

use url::Url;

use crate::domain::{CourierError, Element, Message, OperationDefinition, QName};

/// envelope に載せるヘッダ情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHeaders {
    /// WS-Addressing `Action`
    pub action: Option<String>,
    /// WS-Addressing `To`
    pub to: Option<Url>,
    /// 呼び出し先（partner role）側のセッション
    pub partner_session: Option<String>,
    /// コールバック（my role）側のセッション
    pub callback_session: Option<String>,
    pub callback_address: Option<Url>,
    /// two-way のときだけ設定（anonymous ReplyTo を付ける）
    pub message_id: Option<String>,
}

/// 受信した SOAP fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: Option<String>,
    pub reason: String,
    /// `detail` の最初の子要素
    pub detail: Option<Element>,
    /// 受信した Body 要素全体
    pub body: Element,
}

impl SoapFault {
    /// 宣言済み fault との照合に使う名前
    pub fn detail_name(&self) -> Option<&QName> {
        self.detail.as_ref().map(|d| &d.name)
    }
}

pub trait MessageConverter: Send + Sync {
    fn create_soap_request(
        &self,
        operation: &OperationDefinition,
        message: &Message,
        headers: &SessionHeaders,
    ) -> Result<Element, CourierError>;

    /// 正常応答の envelope から output メッセージを組み立てる
    fn parse_soap_response(
        &self,
        operation: &OperationDefinition,
        envelope: &Element,
    ) -> Result<Message, CourierError>;

    /// envelope が fault なら取り出す
    fn parse_soap_fault(&self, envelope: &Element) -> Option<SoapFault>;

    /// fault の内容を指定された型のメッセージにする
    fn fault_message(&self, message_type: QName, fault: &SoapFault) -> Message;
}
