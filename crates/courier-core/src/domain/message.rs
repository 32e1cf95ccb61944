//! Message - エンジン内部のメッセージ表現
//!
//! `<message>` ルート要素の子がそれぞれ名前付きの part になります。
//!
//! ```text
//! <message>
//!   <orderPart><ns:order xmlns:ns="...">...</ns:order></orderPart>
//!   <countPart>3</countPart>
//! </message>
//! ```

use super::xml::{Element, Node, QName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    message_type: QName,
    root: Element,
}

impl Message {
    pub fn new(message_type: QName) -> Self {
        Self {
            message_type,
            root: Element::local("message"),
        }
    }

    /// 既存の `<message>` 要素から組み立てる
    pub fn from_element(message_type: QName, root: Element) -> Self {
        Self { message_type, root }
    }

    pub fn message_type(&self) -> &QName {
        &self.message_type
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }

    /// part を設定（同名の part があれば置き換える）
    ///
    /// `content` は part 要素そのもので、要素名は part 名に揃えられます。
    pub fn set_part(&mut self, name: &str, mut content: Element) {
        content.name = QName::local(name);
        let existing = self.root.children.iter_mut().find_map(|node| match node {
            Node::Element(e) if e.name.namespace.is_none() && e.name.local == name => Some(e),
            _ => None,
        });
        match existing {
            Some(slot) => *slot = content,
            None => self.root.push_child(content),
        }
    }

    pub fn part(&self, name: &str) -> Option<&Element> {
        self.root
            .child_elements()
            .find(|e| e.name.namespace.is_none() && e.name.local == name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.root.child_elements().map(|e| e.name.local.as_str())
    }
}
