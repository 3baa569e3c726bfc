//! Thin parsing layer over `roxmltree`.
//!
//! Callers parse a document once and walk borrowed [`Node`]s; the document
//! must outlive every node handed out of it.

pub use roxmltree::{Document, Node};

use crate::XmlError;

pub fn parse(text: &str) -> Result<Document<'_>, XmlError> {
    Ok(Document::parse(text)?)
}

/// First element child with the given tag name, if any.
pub fn child_element<'a>(node: Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

/// All element children, in document order.
pub fn element_children<'a>(node: Node<'a, 'a>) -> impl Iterator<Item = Node<'a, 'a>> {
    node.children().filter(roxmltree::Node::is_element)
}

/// Text content of an element, empty string when the element is empty.
pub fn text_of<'a>(node: Node<'a, 'a>) -> &'a str {
    node.text().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_element_children() {
        let doc = parse("<Obj><TN RefId=\"0\"><T>System.Object</T></TN><S>hi</S></Obj>").unwrap();
        let root = doc.root_element();
        let names: Vec<_> = element_children(root)
            .map(|n| n.tag_name().name().to_string())
            .collect();
        assert_eq!(names, ["TN", "S"]);

        let s = child_element(root, "S").unwrap();
        assert_eq!(text_of(s), "hi");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("<Obj><S>hi</Obj>").is_err());
    }
}
