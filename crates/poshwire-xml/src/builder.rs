//! Owned XML element builder.
//!
//! CLIXML bodies are namespace-free, so an element is just a name, a list
//! of attributes, and either text or child elements. Rendering escapes
//! text and attribute values; structural escaping beyond the five XML
//! entities (e.g. CLIXML `_xHHHH_` spans) is the caller's concern.

use std::borrow::Cow;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: Cow<'static, str>,
    value: String,
}

impl Attribute {
    pub fn new(name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Content {
    #[default]
    Empty,
    Text(String),
    Children(Vec<Element>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: Cow<'static, str>,
    attributes: Vec<Attribute>,
    content: Content,
}

impl Element {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            content: Content::Empty,
        }
    }

    pub fn attr(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Sets text content, replacing whatever content was there.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.content = Content::Text(text.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        match &mut self.content {
            Content::Children(children) => children.push(child),
            _ => self.content = Content::Children(vec![child]),
        }
        self
    }

    pub fn children(mut self, iter: impl IntoIterator<Item = Element>) -> Self {
        for child in iter {
            self = self.child(child);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the element and everything below it as a single-line XML string.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", attr.name, escape_attr(&attr.value));
        }
        match &self.content {
            Content::Empty => out.push_str(" />"),
            Content::Text(text) => {
                out.push('>');
                out.push_str(&escape_text(text));
                let _ = write!(out, "</{}>", self.name);
            }
            Content::Children(children) => {
                out.push('>');
                for child in children {
                    child.write_into(out);
                }
                let _ = write!(out, "</{}>", self.name);
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
