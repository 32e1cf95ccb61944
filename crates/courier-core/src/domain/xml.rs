//! XML - メッセージ payload の最小 DOM
//!
//! エンジン内部のメッセージ、SOAP envelope、HTTP レスポンス body は
//! すべてこの所有型ツリーで扱います。パースとシリアライズには quick-xml を使います。
//!
//! # 方針
//! - 要素名は名前空間付きの `QName` で保持
//! - 属性はローカル名と値のみ（名前空間宣言は保持しない）
//! - 空白だけのテキストノードは読み捨てる

use std::fmt;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use serde::{Deserialize, Serialize};

use super::errors::CourierError;

/// 名前空間付きの名前
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: if namespace.is_empty() { None } else { Some(namespace) },
            local: local.into(),
        }
    }

    /// 名前空間なしの名前
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local_part(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn local(local: impl Into<String>) -> Self {
        Self::new(QName::local(local))
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn first_child_element(&self) -> Option<&Element> {
        self.child_elements().next()
    }

    /// ローカル名で最初の子要素を探す
    pub fn child_by_local(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name.local == local)
    }

    /// 子ノードを持たない（テキストも要素もない）
    pub fn is_empty(&self) -> bool {
        self.children.iter().all(|node| match node {
            Node::Text(t) => t.is_empty(),
            Node::Element(_) => false,
        })
    }

    /// 子がテキストだけのときその連結を返す。子要素があれば None。
    pub fn text_content(&self) -> Option<String> {
        let mut text = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) => text.push_str(t),
                Node::Element(_) => return None,
            }
        }
        Some(text)
    }

    /// 子孫を含むすべてのテキストの連結
    pub fn deep_text(&self) -> String {
        let mut text = String::new();
        collect_text(self, &mut text);
        text
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_element(self, None, &mut out);
        out
    }

    pub fn parse(input: &str) -> Result<Element, CourierError> {
        parse_document(input)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

fn write_element(element: &Element, inherited_ns: Option<&str>, out: &mut String) {
    let own_ns = element.name.namespace();
    out.push('<');
    out.push_str(&element.name.local);
    if own_ns != inherited_ns {
        out.push_str(" xmlns=\"");
        out.push_str(&escape(own_ns.unwrap_or("")));
        out.push('"');
    }
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for node in &element.children {
        match node {
            Node::Text(t) => out.push_str(&escape(t.as_str())),
            Node::Element(child) => write_element(child, own_ns, out),
        }
    }
    out.push_str("</");
    out.push_str(&element.name.local);
    out.push('>');
}

fn format_error(err: impl fmt::Display) -> CourierError {
    CourierError::Format(format!("malformed xml: {err}"))
}

fn resolve_namespace(result: ResolveResult<'_>) -> Result<Option<String>, CourierError> {
    match result {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(CourierError::Format(format!(
            "unbound namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn start_element(
    reader: &NsReader<&[u8]>,
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<Element, CourierError> {
    let (resolved, local) = reader.resolve_element(start.name());
    let name = QName {
        namespace: resolve_namespace(resolved)?,
        local: String::from_utf8_lossy(local.as_ref()).into_owned(),
    };
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(format_error)?;
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(format_error)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), CourierError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(CourierError::Format("multiple root elements".to_string())),
    }
}

fn parse_document(input: &str) -> Result<Element, CourierError> {
    let mut reader = NsReader::from_reader(input.as_bytes());
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(format_error)? {
            Event::Start(start) => {
                let element = start_element(&reader, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = start_element(&reader, &start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CourierError::Format("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(format_error)?.into_owned();
                match stack.last_mut() {
                    Some(parent) if !text.is_empty() => parent.children.push(Node::Text(text)),
                    Some(_) => {}
                    None => {
                        return Err(CourierError::Format(
                            "text outside of the root element".to_string(),
                        ));
                    }
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CourierError::Format("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| CourierError::Format("document has no root element".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespaced_elements() {
        let doc = r#"<a:order xmlns:a="urn:orders" id="7"><a:item>book</a:item><note/></a:order>"#;
        let root = Element::parse(doc).unwrap();

        assert_eq!(root.name, QName::new("urn:orders", "order"));
        assert_eq!(root.attribute("id"), Some("7"));
        let item = root.child_by_local("item").unwrap();
        assert_eq!(item.name.namespace(), Some("urn:orders"));
        assert_eq!(item.text_content().as_deref(), Some("book"));
        assert!(root.child_by_local("note").unwrap().is_empty());
    }

    #[test]
    fn default_namespace_applies_to_children() {
        let root = Element::parse(r#"<r xmlns="urn:x"><c>1</c></r>"#).unwrap();
        assert_eq!(root.first_child_element().unwrap().name, QName::new("urn:x", "c"));
    }

    #[test]
    fn serialization_reparses_to_same_tree() {
        let element = Element::new(QName::new("urn:x", "root"))
            .with_attribute("kind", "a<b")
            .with_child(Element::local("plain").with_text("1 & 2"))
            .with_child(Element::new(QName::new("urn:x", "same")));

        let reparsed = Element::parse(&element.to_xml()).unwrap();
        assert_eq!(reparsed, element);
    }

    #[test]
    fn text_content_is_none_for_complex_elements() {
        let root = Element::parse("<r><a>1</a></r>").unwrap();
        assert_eq!(root.text_content(), None);
        assert_eq!(root.deep_text(), "1");
    }

    #[test]
    fn malformed_documents_are_format_errors() {
        for doc in ["", "<a>", "<a></b>", "<a/><b/>", "<p:a/>"] {
            let err = Element::parse(doc).unwrap_err();
            assert!(matches!(err, CourierError::Format(_)), "{doc}: {err}");
        }
    }
}
