#![allow(dead_code)]

use std::time::Duration;

use courier_core::app::{Courier, CourierBuilder};
use courier_core::domain::{
    BindingKind, Element, FaultDefinition, HttpInputEncoding, HttpOperationBinding, HttpVerb,
    Message, MessageDefinition, MessageExchange, OperationBinding, OperationDefinition,
    PartDefinition, PortDefinition, QName, ServiceDefinition,
};

pub const SHOP_NS: &str = "urn:shop";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const WAIT: Duration = Duration::from_secs(5);

pub fn shop(local: &str) -> QName {
    QName::new(SHOP_NS, local)
}

fn message_def(name: &str, parts: Vec<PartDefinition>) -> MessageDefinition {
    MessageDefinition {
        name: shop(name),
        parts,
    }
}

/// PlaceOrder (request-response, fault OutOfStock) と Notify (one-way) を持つ SOAP サービス
pub fn order_service(address: &str) -> ServiceDefinition {
    ServiceDefinition {
        name: shop("OrderService"),
        ports: vec![PortDefinition {
            name: "SoapPort".into(),
            address: address.into(),
            binding: BindingKind::Soap,
            operations: vec![OperationBinding {
                operation: "Notify".into(),
                soap_action: Some("urn:shop/notify".into()),
                http: None,
            }],
        }],
        operations: vec![
            OperationDefinition {
                name: "PlaceOrder".into(),
                input: message_def(
                    "PlaceOrderRequest",
                    vec![PartDefinition::element("order", shop("order"))],
                ),
                output: Some(message_def(
                    "PlaceOrderResponse",
                    vec![PartDefinition::element("confirmation", shop("confirmation"))],
                )),
                faults: vec![FaultDefinition {
                    name: "OutOfStock".into(),
                    message: Some(shop("OutOfStockFault")),
                }],
                input_action: Some("urn:shop/place".into()),
            },
            OperationDefinition {
                name: "Notify".into(),
                input: message_def(
                    "NotifyRequest",
                    vec![PartDefinition::element("note", shop("note"))],
                ),
                output: None,
                faults: vec![],
                input_action: None,
            },
        ],
    }
}

/// GetItem (GET, url replacement), CountItems (GET, typed output) と
/// PostNote (POST, one-way, xml body) を持つ HTTP サービス
pub fn catalog_service(address: &str) -> ServiceDefinition {
    ServiceDefinition {
        name: shop("Catalog"),
        ports: vec![PortDefinition {
            name: "HttpPort".into(),
            address: address.into(),
            binding: BindingKind::Http {
                verb: HttpVerb::Get,
            },
            operations: vec![
                OperationBinding {
                    operation: "GetItem".into(),
                    soap_action: None,
                    http: Some(HttpOperationBinding {
                        location: "items/(id)".into(),
                        input: HttpInputEncoding::UrlReplacement,
                        verb: None,
                    }),
                },
                OperationBinding {
                    operation: "CountItems".into(),
                    soap_action: None,
                    http: Some(HttpOperationBinding {
                        location: "count".into(),
                        input: HttpInputEncoding::UrlReplacement,
                        verb: None,
                    }),
                },
                OperationBinding {
                    operation: "PostNote".into(),
                    soap_action: None,
                    http: Some(HttpOperationBinding {
                        location: "notes".into(),
                        input: HttpInputEncoding::MimeXml,
                        verb: Some(HttpVerb::Post),
                    }),
                },
            ],
        }],
        operations: vec![
            OperationDefinition {
                name: "GetItem".into(),
                input: message_def(
                    "GetItemRequest",
                    vec![PartDefinition::typed("id", QName::new(XSD_NS, "string"))],
                ),
                output: Some(message_def(
                    "GetItemResponse",
                    vec![PartDefinition::element("item", shop("item"))],
                )),
                faults: vec![],
                input_action: None,
            },
            OperationDefinition {
                name: "CountItems".into(),
                input: message_def("CountItemsRequest", vec![]),
                output: Some(message_def(
                    "CountItemsResponse",
                    vec![PartDefinition::typed("count", QName::new(XSD_NS, "int"))],
                )),
                faults: vec![],
                input_action: None,
            },
            OperationDefinition {
                name: "PostNote".into(),
                input: message_def(
                    "PostNoteRequest",
                    vec![PartDefinition::element("note", shop("note"))],
                ),
                output: None,
                faults: vec![],
                input_action: None,
            },
        ],
    }
}

pub fn courier_with(services: Vec<ServiceDefinition>) -> Courier {
    let mut builder = CourierBuilder::new();
    for service in services {
        builder = builder.register_service(service).unwrap();
    }
    builder.build().unwrap()
}

pub fn place_order_exchange(order_id: &str) -> MessageExchange {
    let mut request = Message::new(shop("PlaceOrderRequest"));
    request.set_part(
        "order",
        Element::local("order").with_child(
            Element::new(shop("order")).with_child(Element::new(shop("id")).with_text(order_id)),
        ),
    );
    MessageExchange::new(
        "PlaceOrder",
        courier_core::domain::ExchangePattern::RequestResponse,
        request,
    )
}

pub fn note_exchange(operation: &str, text: &str) -> MessageExchange {
    let mut request = Message::new(shop(&format!("{operation}Request")));
    request.set_part(
        "note",
        Element::local("note").with_child(Element::new(shop("note")).with_text(text)),
    );
    MessageExchange::new(
        operation,
        courier_core::domain::ExchangePattern::OneWay,
        request,
    )
}

pub fn get_item_exchange(id: &str) -> MessageExchange {
    let mut request = Message::new(shop("GetItemRequest"));
    request.set_part("id", Element::local("id").with_text(id));
    MessageExchange::new(
        "GetItem",
        courier_core::domain::ExchangePattern::RequestResponse,
        request,
    )
}

pub fn soap_envelope(body: &str) -> String {
    format!(
        r#"<soapenv:Envelope xmlns:soapenv="{SOAP_ENV_NS}"><soapenv:Body>{body}</soapenv:Body></soapenv:Envelope>"#
    )
}

pub fn count_items_exchange() -> MessageExchange {
    MessageExchange::new(
        "CountItems",
        courier_core::domain::ExchangePattern::RequestResponse,
        Message::new(shop("CountItemsRequest")),
    )
}
