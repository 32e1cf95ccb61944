//! PartnerLink - 会話ごとの own/partner endpoint の保持
//!
//! エンジンがロールの束縛を変えるたびに更新し、invocation adapter は
//! 呼び出し時に partner 側の endpoint を読み出します。

use super::endpoint::EndpointReference;
use super::errors::CourierError;
use super::xml::{Element, QName};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerLink {
    model_id: i32,
    link_name: String,
    my_role_name: Option<String>,
    my_role_service: Option<QName>,
    partner_role_name: Option<String>,
    my_epr: Option<Element>,
    partner_epr: Option<Element>,
}

impl PartnerLink {
    pub fn new(model_id: i32, link_name: impl Into<String>) -> Self {
        Self {
            model_id,
            link_name: link_name.into(),
            ..Self::default()
        }
    }

    pub fn model_id(&self) -> i32 {
        self.model_id
    }

    pub fn set_model_id(&mut self, model_id: i32) {
        self.model_id = model_id;
    }

    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    pub fn set_link_name(&mut self, name: impl Into<String>) {
        self.link_name = name.into();
    }

    pub fn my_role_name(&self) -> Option<&str> {
        self.my_role_name.as_deref()
    }

    pub fn set_my_role_name(&mut self, name: Option<String>) {
        self.my_role_name = name;
    }

    pub fn my_role_service(&self) -> Option<&QName> {
        self.my_role_service.as_ref()
    }

    pub fn set_my_role_service(&mut self, service: Option<QName>) {
        self.my_role_service = service;
    }

    pub fn partner_role_name(&self) -> Option<&str> {
        self.partner_role_name.as_deref()
    }

    pub fn set_partner_role_name(&mut self, name: Option<String>) {
        self.partner_role_name = name;
    }

    pub fn my_epr(&self) -> Option<&Element> {
        self.my_epr.as_ref()
    }

    pub fn set_my_epr(&mut self, epr: Option<Element>) {
        self.my_epr = epr;
    }

    pub fn partner_epr(&self) -> Option<&Element> {
        self.partner_epr.as_ref()
    }

    /// 動的な partner endpoint の更新
    pub fn set_partner_epr(&mut self, epr: Option<Element>) {
        self.partner_epr = epr;
    }

    pub fn partner_endpoint(&self) -> Result<Option<EndpointReference>, CourierError> {
        self.partner_epr
            .as_ref()
            .map(EndpointReference::from_element)
            .transpose()
    }

    pub fn my_endpoint(&self) -> Result<Option<EndpointReference>, CourierError> {
        self.my_epr
            .as_ref()
            .map(EndpointReference::from_element)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soap_address(location: &str) -> Element {
        Element::new(QName::new("http://schemas.xmlsoap.org/wsdl/soap/", "address"))
            .with_attribute("location", location)
    }

    #[test]
    fn partner_endpoint_follows_updates() {
        let mut link = PartnerLink::new(3, "shipping");
        link.set_partner_role_name(Some("shipper".into()));
        assert_eq!(link.partner_endpoint().unwrap(), None);

        link.set_partner_epr(Some(soap_address("http://a/ship")));
        assert_eq!(
            link.partner_endpoint().unwrap().unwrap().address().as_str(),
            "http://a/ship"
        );

        link.set_partner_epr(Some(soap_address("http://b/ship")));
        assert_eq!(
            link.partner_endpoint().unwrap().unwrap().address().as_str(),
            "http://b/ship"
        );
        assert_eq!(link.model_id(), 3);
        assert_eq!(link.partner_role_name(), Some("shipper"));
    }
}
