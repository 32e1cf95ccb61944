//! Service metadata - WSDL から読み取った service / port / operation の記述
//!
//! WSDL のパース自体は扱いません。service registry がこの型を組み立てて渡します。

use serde::{Deserialize, Serialize};

use super::xml::QName;

/// HTTP binding の verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }

    /// body を持たない verb
    pub fn is_query_only(self) -> bool {
        matches!(self, HttpVerb::Get | HttpVerb::Delete)
    }
}

/// HTTP binding 上の input の載せ方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HttpInputEncoding {
    /// location 中の `(part)` を値で置き換える
    UrlReplacement,
    /// part をクエリ文字列にする
    UrlEncoded,
    /// part を XML body として送る
    MimeXml,
    /// part を application/x-www-form-urlencoded body として送る
    FormUrlEncoded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpOperationBinding {
    /// operation の相対 location（`(part)` プレースホルダ可）
    pub location: String,
    pub input: HttpInputEncoding,
    /// port の verb を上書きする場合のみ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<HttpVerb>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationBinding {
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soap_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpOperationBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BindingKind {
    Soap,
    Http { verb: HttpVerb },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDefinition {
    pub name: String,
    pub address: String,
    pub binding: BindingKind,
    #[serde(default)]
    pub operations: Vec<OperationBinding>,
}

impl PortDefinition {
    pub fn operation_binding(&self, operation: &str) -> Option<&OperationBinding> {
        self.operations.iter().find(|b| b.operation == operation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDefinition {
    pub name: String,
    /// element 宣言の part
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<QName>,
    /// type 宣言の part
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<QName>,
}

impl PartDefinition {
    pub fn element(name: impl Into<String>, element: QName) -> Self {
        Self {
            name: name.into(),
            element: Some(element),
            type_name: None,
        }
    }

    pub fn typed(name: impl Into<String>, type_name: QName) -> Self {
        Self {
            name: name.into(),
            element: None,
            type_name: Some(type_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDefinition {
    pub name: QName,
    #[serde(default)]
    pub parts: Vec<PartDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<QName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub name: String,
    pub input: MessageDefinition,
    /// None なら one-way
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<MessageDefinition>,
    #[serde(default)]
    pub faults: Vec<FaultDefinition>,
    /// WS-Addressing で宣言された input action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_action: Option<String>,
}

impl OperationDefinition {
    pub fn fault(&self, name: &str) -> Option<&FaultDefinition> {
        self.faults.iter().find(|f| f.name == name)
    }

    pub fn is_one_way(&self) -> bool {
        self.output.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: QName,
    #[serde(default)]
    pub ports: Vec<PortDefinition>,
    #[serde(default)]
    pub operations: Vec<OperationDefinition>,
}

impl ServiceDefinition {
    pub fn port(&self, name: &str) -> Option<&PortDefinition> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.operations.iter().find(|o| o.name == name)
    }

    /// input action（WS-Addressing または SOAPAction）で operation を探す
    pub fn operation_by_action(&self, action: &str) -> Option<&OperationDefinition> {
        if let Some(op) = self
            .operations
            .iter()
            .find(|o| o.input_action.as_deref() == Some(action))
        {
            return Some(op);
        }
        self.ports
            .iter()
            .flat_map(|p| p.operations.iter())
            .find(|b| b.soap_action.as_deref() == Some(action))
            .and_then(|b| self.operation(&b.operation))
    }
}
