//! EndpointReference - 呼び出し先アドレスとセッション
//!
//! partner link が持つ endpoint reference 要素から、送信先 URL と
//! セッション識別子を取り出します。対応する形式:
//! - WS-Addressing `<wsa:EndpointReference><wsa:Address>url</wsa:Address>`
//! - SOAP `<soap:address location="url"/>`
//! - 上記いずれかを包む `<service-ref>`

use url::Url;

use super::errors::CourierError;
use super::xml::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReference {
    address: Url,
    session_id: Option<String>,
}

impl EndpointReference {
    pub fn new(address: Url) -> Self {
        Self {
            address,
            session_id: None,
        }
    }

    pub fn parse(address: &str) -> Result<Self, CourierError> {
        let url = Url::parse(address)
            .map_err(|e| CourierError::Format(format!("invalid endpoint address '{address}': {e}")))?;
        Ok(Self::new(url))
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn set_session_id(&mut self, session_id: Option<String>) {
        self.session_id = session_id;
    }

    pub fn from_element(element: &Element) -> Result<Self, CourierError> {
        match element.name.local.as_str() {
            "service-ref" => {
                let inner = element.first_child_element().ok_or_else(|| {
                    CourierError::Format("empty service-ref element".to_string())
                })?;
                Self::from_element(inner)
            }
            "address" => {
                let location = element.attribute("location").ok_or_else(|| {
                    CourierError::Format("address element without location".to_string())
                })?;
                Self::parse(location)
            }
            "EndpointReference" => {
                let address = element.child_by_local("Address").ok_or_else(|| {
                    CourierError::Format("EndpointReference without Address".to_string())
                })?;
                let mut epr = Self::parse(address.deep_text().trim())?;
                if let Some(session) = element
                    .child_by_local("ReferenceParameters")
                    .and_then(|p| p.child_by_local("session"))
                {
                    epr.session_id = Some(session.deep_text().trim().to_string());
                }
                Ok(epr)
            }
            other => Err(CourierError::Format(format!(
                "unsupported endpoint reference element '{other}'"
            ))),
        }
    }
}
