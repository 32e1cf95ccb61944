mod common;

use common::*;
use courier_core::app::Courier;
use courier_core::app::external::http::remote_server_fault;
use courier_core::domain::{ExchangeState, FailureType, MessageExchange};
use courier_core::ports::ExchangeStore;
use httpmock::{
    Method::{GET, POST},
    MockServer,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn invoke_and_wait(courier: &Courier, mut exchange: MessageExchange) -> MessageExchange {
    let service = courier.external_service("Catalog", "HttpPort").unwrap();
    let id = exchange.id();
    let tx = courier.scheduler().begin();
    service.invoke(&tx, &mut exchange).unwrap();
    tx.commit();
    courier.wait_for_terminal(id, WAIT).await.unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn success_body_becomes_the_output_part() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET).path("/catalog/items/A1");
        then.status(200)
            .header("content-type", "text/xml")
            .body(r#"<item xmlns="urn:shop"><name>Widget</name></item>"#);
    });

    let courier = courier_with(vec![catalog_service(&server.url("/catalog"))]);
    let done = invoke_and_wait(&courier, get_item_exchange("A1")).await;

    assert_eq!(done.state(), ExchangeState::Replied);
    let response = done.response().unwrap();
    assert_eq!(response.message_type(), &shop("GetItemResponse"));
    let item = response.part("item").unwrap().first_child_element().unwrap();
    assert_eq!(item.name, shop("item"));
    assert_eq!(item.deep_text(), "Widget");
    mock.assert_async().await;
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_a_remote_server_fault() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/catalog/items/7");
        then.status(503);
    });

    let courier = courier_with(vec![catalog_service(&server.url("/catalog"))]);
    let done = invoke_and_wait(&courier, get_item_exchange("7")).await;

    assert_eq!(done.state(), ExchangeState::Faulted);
    assert_eq!(done.fault(), Some(&remote_server_fault()));
    let status_line = done
        .response()
        .unwrap()
        .root()
        .child_by_local("statusLine")
        .unwrap()
        .deep_text();
    assert!(status_line.contains("503"), "{status_line}");
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn client_error_is_a_bad_request_failure() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/catalog/items/404");
        then.status(404);
    });

    let courier = courier_with(vec![catalog_service(&server.url("/catalog"))]);
    let done = invoke_and_wait(&courier, get_item_exchange("404")).await;

    assert_eq!(done.state(), ExchangeState::Failed);
    let failure = done.failure().unwrap();
    assert_eq!(failure.kind, FailureType::Other);
    assert!(failure.reason.starts_with("Bad Request!"), "{}", failure.reason);
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn redirects_are_not_followed() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/catalog/items/moved");
        then.status(302).header("location", "http://elsewhere.invalid/");
    });

    let courier = courier_with(vec![catalog_service(&server.url("/catalog"))]);
    let done = invoke_and_wait(&courier, get_item_exchange("moved")).await;

    assert_eq!(done.state(), ExchangeState::Failed);
    assert!(
        done.failure()
            .unwrap()
            .reason
            .starts_with("Redirections are not supported!")
    );
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_success_body_is_a_failure() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/catalog/items/empty");
        then.status(200);
    });

    let courier = courier_with(vec![catalog_service(&server.url("/catalog"))]);
    let done = invoke_and_wait(&courier, get_item_exchange("empty")).await;

    assert_eq!(done.state(), ExchangeState::Failed);
    assert_eq!(done.failure().unwrap().kind, FailureType::Other);
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_success_body_is_a_format_error() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/catalog/items/junk");
        then.status(200).body("<item><unclosed></item>");
    });

    let courier = courier_with(vec![catalog_service(&server.url("/catalog"))]);
    let done = invoke_and_wait(&courier, get_item_exchange("junk")).await;

    assert_eq!(done.state(), ExchangeState::Failed);
    assert_eq!(done.failure().unwrap().kind, FailureType::FormatError);
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn partner_endpoint_overrides_the_port_address() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET).path("/moved/items/3");
        then.status(200).body(r#"<item xmlns="urn:shop"/>"#);
    });

    let courier = courier_with(vec![catalog_service("http://127.0.0.1:1/catalog")]);
    let endpoint =
        courier_core::domain::EndpointReference::parse(&server.url("/moved")).unwrap();
    let exchange = get_item_exchange("3").with_partner_endpoint(endpoint);
    let done = invoke_and_wait(&courier, exchange).await;

    assert_eq!(done.state(), ExchangeState::Replied);
    mock.assert_async().await;
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn one_way_post_ignores_the_response() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/catalog/notes")
            .header("content-type", "text/xml; charset=utf-8")
            .body_contains("restocked");
        then.status(500);
    });

    let courier = courier_with(vec![catalog_service(&server.url("/catalog"))]);
    let service = courier.external_service("Catalog", "HttpPort").unwrap();
    let mut exchange = note_exchange("PostNote", "restocked");
    let id = exchange.id();
    let tx = courier.scheduler().begin();
    service.invoke(&tx, &mut exchange).unwrap();
    tx.commit();

    courier.shutdown().await;
    assert_eq!(mock.hits(), 1);
    assert_eq!(
        courier.store().lookup(id).unwrap().state(),
        ExchangeState::Accepted
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn closing_one_adapter_leaves_the_others_usable() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET).path("/catalog/items/B2");
        then.status(200).body(r#"<item xmlns="urn:shop"/>"#);
    });

    let courier = courier_with(vec![
        order_service("http://127.0.0.1:1/orders"),
        catalog_service(&server.url("/catalog")),
    ]);
    courier.external_service("OrderService", "SoapPort").unwrap().close();
    courier.external_service("Catalog", "HttpPort").unwrap().close();

    let done = invoke_and_wait(&courier, get_item_exchange("B2")).await;

    assert_eq!(done.state(), ExchangeState::Replied);
    mock.assert_async().await;
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn truncated_success_body_is_a_format_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        // Content-Length より短い body を送って切断する
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n<item/>")
            .await
            .unwrap();
        socket.shutdown().await.ok();
    });

    let courier = courier_with(vec![catalog_service(&format!("http://{addr}/catalog"))]);
    let done = invoke_and_wait(&courier, get_item_exchange("cut")).await;

    assert_eq!(done.state(), ExchangeState::Failed);
    let failure = done.failure().unwrap();
    assert_eq!(failure.kind, FailureType::FormatError);
    assert!(
        failure.reason.starts_with("Unable to read the response body"),
        "{}",
        failure.reason
    );
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn plain_text_body_fills_a_typed_part() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/catalog/count");
        then.status(200)
            .header("content-type", "text/plain; charset=utf-8")
            .body("42");
    });

    let courier = courier_with(vec![catalog_service(&server.url("/catalog"))]);
    let done = invoke_and_wait(&courier, count_items_exchange()).await;

    assert_eq!(done.state(), ExchangeState::Replied);
    let count = done.response().unwrap().part("count").unwrap();
    assert_eq!(count.text_content().as_deref(), Some("42"));
    courier.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn exchange_credentials_are_sent_as_basic_auth() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/catalog/items/secret")
            .header("authorization", "Basic dXNlcjpwYXNz");
        then.status(200).body(r#"<item xmlns="urn:shop"/>"#);
    });

    let courier = courier_with(vec![catalog_service(&server.url("/catalog"))]);
    let exchange =
        get_item_exchange("secret").with_http_credentials("user", Some("pass".to_string()));
    let done = invoke_and_wait(&courier, exchange).await;

    assert_eq!(done.state(), ExchangeState::Replied);
    mock.assert_async().await;
    courier.shutdown().await;
}
