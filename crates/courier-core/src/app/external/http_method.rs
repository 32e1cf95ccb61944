//! HttpMethodBuilder - HTTP binding メタデータから送信リクエストを組み立てる
//!
//! # input の載せ方
//! - `UrlReplacement`: location 中の `(part)` を part の値で置き換える
//! - `UrlEncoded`: part を `name=value` のクエリ文字列にする
//! - `MimeXml`: 唯一の part の内容を XML body にする
//! - `FormUrlEncoded`: part を `application/x-www-form-urlencoded` body にする
//!
//! 置き換え・エンコードに使う part の値はテキストのみです。
//! 子要素を持つ part は format error になります。

use url::Url;
use url::form_urlencoded;

use crate::domain::{
    BindingKind, CourierError, HttpInputEncoding, HttpOperationBinding, HttpVerb, Message, OperationDefinition,
    PortDefinition,
};
use crate::ports::OutboundRequest;

pub const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// 1 つの operation の HTTP binding 解決結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOperation {
    pub verb: HttpVerb,
    pub binding: HttpOperationBinding,
}

/// port の binding 全体を検証し、operation ごとの解決結果を返す
pub fn validate_binding(
    port: &PortDefinition,
    operations: &[OperationDefinition],
) -> Result<Vec<(String, HttpOperation)>, CourierError> {
    let BindingKind::Http { verb: port_verb } = port.binding else {
        return Err(CourierError::InvalidBinding(format!(
            "port '{}' does not use an HTTP binding",
            port.name
        )));
    };

    let mut resolved = Vec::with_capacity(operations.len());
    for operation in operations {
        let binding = port
            .operation_binding(&operation.name)
            .and_then(|b| b.http.clone())
            .ok_or_else(|| {
                CourierError::InvalidBinding(format!(
                    "operation '{}' has no HTTP binding on port '{}'",
                    operation.name, port.name
                ))
            })?;
        let verb = binding.verb.unwrap_or(port_verb);
        let carries_body = matches!(
            binding.input,
            HttpInputEncoding::MimeXml | HttpInputEncoding::FormUrlEncoded
        );
        if carries_body && verb.is_query_only() {
            return Err(CourierError::InvalidBinding(format!(
                "operation '{}': {} cannot carry a request body",
                operation.name,
                verb.as_str()
            )));
        }
        if binding.input == HttpInputEncoding::MimeXml && operation.input.parts.len() != 1 {
            return Err(CourierError::InvalidBinding(format!(
                "operation '{}': mime xml input needs exactly one part",
                operation.name
            )));
        }
        resolved.push((operation.name.clone(), HttpOperation { verb, binding }));
    }
    Ok(resolved)
}

fn part_text(operation: &OperationDefinition, message: &Message, part: &str) -> Result<String, CourierError> {
    let element = message.part(part).ok_or_else(|| {
        CourierError::Format(format!(
            "message for operation '{}' is missing part '{part}'",
            operation.name
        ))
    })?;
    element.text_content().ok_or_else(|| {
        CourierError::Format(format!(
            "part '{part}' of operation '{}' is not a simple value",
            operation.name
        ))
    })
}

fn encode_path_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn join_location(base: &Url, location: &str) -> Result<Url, CourierError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(location.trim_start_matches('/'))
        .map_err(|e| CourierError::Format(format!("invalid location '{location}': {e}")))
}

pub fn build_request(
    base: &Url,
    operation: &OperationDefinition,
    http: &HttpOperation,
    message: &Message,
) -> Result<OutboundRequest, CourierError> {
    let parts = &operation.input.parts;
    let mut location = http.binding.location.clone();

    match http.binding.input {
        HttpInputEncoding::UrlReplacement => {
            for part in parts {
                let value = part_text(operation, message, &part.name)?;
                location = location.replace(&format!("({})", part.name), &encode_path_value(&value));
            }
            let url = join_location(base, &location)?;
            Ok(OutboundRequest::new(http.verb, url))
        }
        HttpInputEncoding::UrlEncoded => {
            let mut url = join_location(base, &location)?;
            {
                let mut query = url.query_pairs_mut();
                for part in parts {
                    query.append_pair(&part.name, &part_text(operation, message, &part.name)?);
                }
            }
            Ok(OutboundRequest::new(http.verb, url))
        }
        HttpInputEncoding::FormUrlEncoded => {
            let mut form = form_urlencoded::Serializer::new(String::new());
            for part in parts {
                form.append_pair(&part.name, &part_text(operation, message, &part.name)?);
            }
            let url = join_location(base, &location)?;
            Ok(OutboundRequest::new(http.verb, url)
                .with_header("Content-Type", FORM_CONTENT_TYPE)
                .with_body(form.finish()))
        }
        HttpInputEncoding::MimeXml => {
            let part = parts.first().ok_or_else(|| {
                CourierError::InvalidBinding(format!("operation '{}' has no input part", operation.name))
            })?;
            let content = message.part(&part.name).ok_or_else(|| {
                CourierError::Format(format!(
                    "message for operation '{}' is missing part '{}'",
                    operation.name, part.name
                ))
            })?;
            let body = match content.first_child_element() {
                Some(element) if part.element.is_some() => element.to_xml(),
                _ => content.to_xml(),
            };
            let url = join_location(base, &location)?;
            Ok(OutboundRequest::new(http.verb, url)
                .with_header("Content-Type", XML_CONTENT_TYPE)
                .with_body(body))
        }
    }
}
