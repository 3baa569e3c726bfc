//! CLIXML deserialization: XML nodes → `PsValue`.
//!
//! Mirrors the serializer's two tables: `<TNRef>` resolves against seen
//! `<TN>` lists, `<Ref>` against seen `<Obj>` bodies. Unknown tags under
//! `<Obj>` are ignored; a tag in value position that the dialect does not
//! define is an `UnexpectedTag` error. Incoming type lists pass through
//! the [`TypeRegistry`]: unregistered types come back `Deserialized.`.

use std::collections::HashMap;

use poshwire_xml::parser::Node;
use tracing::trace;

use crate::PsrpError;
use crate::crypto::CryptoProvider;
use crate::registry::TypeRegistry;

use super::escape;
use super::{
    ComplexObject, ComplexObjectContent, Container, EnumWidth, PsDateTime, PsDuration, PsEnum,
    PsPrimitiveValue, PsProperty, PsSecureString, PsString, PsType, PsValue,
};

type Result<T> = std::result::Result<T, PsrpError>;

const PRIMITIVE_TAGS: &[&str] = &[
    "S", "C", "B", "SB", "By", "I16", "U16", "I32", "U32", "I64", "U64", "Sg", "Db", "D", "DT",
    "TS", "BA", "G", "URI", "Version", "XD", "SBK", "SS", "Nil",
];

const CONTAINER_TAGS: &[&str] = &["STK", "QUE", "LST", "DCT", "IE"];

pub(crate) struct Deserializer<'a> {
    type_refs: HashMap<String, PsType>,
    object_refs: HashMap<String, ComplexObject>,
    registry: &'a TypeRegistry,
    crypto: Option<&'a dyn CryptoProvider>,
}

impl<'a> Deserializer<'a> {
    pub fn new(registry: &'a TypeRegistry, crypto: Option<&'a dyn CryptoProvider>) -> Self {
        Self {
            type_refs: HashMap::new(),
            object_refs: HashMap::new(),
            registry,
            crypto,
        }
    }

    pub fn value_from_node(&mut self, node: Node<'_, '_>) -> Result<PsValue> {
        let tag = node.tag_name().name();
        if PRIMITIVE_TAGS.contains(&tag) {
            return Ok(PsValue::Primitive(self.primitive_from_node(node)?));
        }
        match tag {
            "Obj" => Ok(PsValue::Object(self.object_from_node(node)?)),
            "Ref" => {
                let ref_id = attr(node, "RefId")?;
                self.object_refs.get(ref_id).cloned().map(PsValue::Object).ok_or_else(|| {
                    PsrpError::MalformedXml(format!("unresolved object reference '{ref_id}'"))
                })
            }
            other => Err(PsrpError::UnexpectedTag {
                tag: other.to_string(),
                context: "in value position",
            }),
        }
    }

    fn primitive_from_node(&self, node: Node<'_, '_>) -> Result<PsPrimitiveValue> {
        let tag = node.tag_name().name();
        let text = node.text().unwrap_or("");
        Ok(match tag {
            "S" => PsPrimitiveValue::Str(PsString::from_units(escape::decode_to_units(text))),
            "C" => {
                let code: u32 = parse_number(tag, text)?;
                let ch = char::from_u32(code).ok_or_else(|| {
                    PsrpError::MalformedXml(format!("invalid character code point {code}"))
                })?;
                PsPrimitiveValue::Char(ch)
            }
            "B" => match text.trim().to_ascii_lowercase().as_str() {
                "true" => PsPrimitiveValue::Bool(true),
                "false" => PsPrimitiveValue::Bool(false),
                other => {
                    return Err(PsrpError::MalformedXml(format!(
                        "invalid boolean value '{other}'"
                    )));
                }
            },
            "SB" => PsPrimitiveValue::SByte(parse_number(tag, text)?),
            "By" => PsPrimitiveValue::Byte(parse_number(tag, text)?),
            "I16" => PsPrimitiveValue::I16(parse_number(tag, text)?),
            "U16" => PsPrimitiveValue::U16(parse_number(tag, text)?),
            "I32" => PsPrimitiveValue::I32(parse_number(tag, text)?),
            "U32" => PsPrimitiveValue::U32(parse_number(tag, text)?),
            "I64" => PsPrimitiveValue::I64(parse_number(tag, text)?),
            "U64" => PsPrimitiveValue::U64(parse_number(tag, text)?),
            "Sg" => PsPrimitiveValue::Single(parse_f32(text)?),
            "Db" => PsPrimitiveValue::Double(parse_f64(text)?),
            "D" => PsPrimitiveValue::Decimal(text.trim().to_string()),
            "DT" => PsPrimitiveValue::DateTime(PsDateTime::from_clixml(text)?),
            "TS" => PsPrimitiveValue::Duration(PsDuration::from_clixml(text)?),
            "BA" => {
                use base64::Engine as _;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(text.trim())
                    .map_err(|e| {
                        PsrpError::MalformedXml(format!("invalid base64 byte array: {e}"))
                    })?;
                PsPrimitiveValue::Bytes(bytes)
            }
            "G" => {
                let guid = uuid::Uuid::parse_str(text.trim())
                    .map_err(|e| PsrpError::MalformedXml(format!("invalid guid '{text}': {e}")))?;
                PsPrimitiveValue::Guid(guid)
            }
            "URI" => PsPrimitiveValue::Uri(escape::decode_to_string_lossy(text)),
            "Version" => PsPrimitiveValue::Version(text.trim().to_string()),
            "XD" => PsPrimitiveValue::XmlDocument(escape::decode_to_string_lossy(text)),
            "SBK" => PsPrimitiveValue::ScriptBlock(escape::decode_to_string_lossy(text)),
            "SS" => {
                let crypto = self.crypto.ok_or(PsrpError::CryptoUnavailable)?;
                PsPrimitiveValue::SecureString(PsSecureString::new(crypto.decrypt(text.trim())?))
            }
            "Nil" => PsPrimitiveValue::Nil,
            other => {
                return Err(PsrpError::UnexpectedTag {
                    tag: other.to_string(),
                    context: "as primitive",
                });
            }
        })
    }

    fn object_from_node(&mut self, node: Node<'_, '_>) -> Result<ComplexObject> {
        let ref_id = node.attribute("RefId").map(str::to_string);
        trace!(?ref_id, "decoding Obj");

        let mut obj = ComplexObject::new();
        let mut raw_type: Option<PsType> = None;

        for child in node.children().filter(Node::is_element) {
            let tag = child.tag_name().name();
            match tag {
                "TN" | "TNRef" => {
                    raw_type = Some(self.type_from_node(child)?);
                }
                "ToString" => {
                    obj.to_string = Some(escape::decode_to_string_lossy(
                        child.text().unwrap_or(""),
                    ));
                }
                _ if PRIMITIVE_TAGS.contains(&tag) => {
                    obj.content =
                        ComplexObjectContent::ExtendedPrimitive(self.primitive_from_node(child)?);
                }
                _ if CONTAINER_TAGS.contains(&tag) => {
                    obj.content = ComplexObjectContent::Container(self.container_from_node(child)?);
                }
                "Props" => {
                    for prop_node in child.children().filter(Node::is_element) {
                        let prop = self.property_from_node(prop_node)?;
                        obj.adapted_properties.insert(prop.name.clone(), prop);
                    }
                }
                "MS" => {
                    for prop_node in child.children().filter(Node::is_element) {
                        let prop = self.property_from_node(prop_node)?;
                        obj.extended_properties.insert(prop.name.clone(), prop);
                    }
                }
                // Tolerated: later protocol revisions add elements here.
                _ => trace!(tag, "ignoring unknown element under Obj"),
            }
        }

        // An integral payload on an enum-typed object is the enum value.
        if let Some(type_def) = &raw_type
            && type_def.is_enum()
            && let ComplexObjectContent::ExtendedPrimitive(p) = &obj.content
            && let Some((value, width)) = integral_parts(p)
        {
            obj.content = ComplexObjectContent::Enum(PsEnum::with_width(value, width));
        }

        obj.type_def = raw_type.map(|t| self.registry.resolve(t));

        if let Some(ref_id) = ref_id {
            self.object_refs.insert(ref_id, obj.clone());
        }
        Ok(obj)
    }

    fn container_from_node(&mut self, node: Node<'_, '_>) -> Result<Container> {
        let tag = node.tag_name().name();
        match tag {
            "STK" | "QUE" | "LST" | "IE" => {
                let mut values = Vec::new();
                for child in node.children().filter(Node::is_element) {
                    values.push(self.value_from_node(child)?);
                }
                Ok(match tag {
                    "STK" => Container::Stack(values),
                    "QUE" => Container::Queue(values),
                    "LST" => Container::List(values),
                    _ => Container::Enumerable(values),
                })
            }
            "DCT" => {
                let mut entries = Vec::new();
                for entry_node in node.children().filter(Node::is_element) {
                    if entry_node.tag_name().name() != "En" {
                        continue;
                    }
                    let mut key: Option<PsValue> = None;
                    let mut value: Option<PsValue> = None;
                    for part in entry_node.children().filter(Node::is_element) {
                        match part.attribute("N") {
                            Some("Key") => key = Some(self.value_from_node(part)?),
                            Some("Value") => value = Some(self.value_from_node(part)?),
                            _ => {}
                        }
                    }
                    if let (Some(k), Some(v)) = (key, value) {
                        entries.push((k, v));
                    }
                }
                Ok(Container::Dictionary(entries))
            }
            other => Err(PsrpError::UnexpectedTag {
                tag: other.to_string(),
                context: "as container",
            }),
        }
    }

    fn property_from_node(&mut self, node: Node<'_, '_>) -> Result<PsProperty> {
        let name = node
            .attribute("N")
            .map(escape::decode_to_string_lossy)
            .unwrap_or_default();
        let value = self.value_from_node(node)?;
        Ok(PsProperty { name, value })
    }

    fn type_from_node(&mut self, node: Node<'_, '_>) -> Result<PsType> {
        match node.tag_name().name() {
            "TN" => {
                let mut type_names = Vec::new();
                for child in node.children().filter(Node::is_element) {
                    if child.tag_name().name() == "T" {
                        type_names.push(std::borrow::Cow::Owned(escape::decode_to_string_lossy(
                            child.text().unwrap_or(""),
                        )));
                    }
                }
                let ps_type = PsType { type_names };
                if let Some(ref_id) = node.attribute("RefId") {
                    trace!(ref_id, "registering type reference");
                    self.type_refs.insert(ref_id.to_string(), ps_type.clone());
                }
                Ok(ps_type)
            }
            "TNRef" => {
                let ref_id = attr(node, "RefId")?;
                self.type_refs.get(ref_id).cloned().ok_or_else(|| {
                    PsrpError::MalformedXml(format!("unresolved type reference '{ref_id}'"))
                })
            }
            other => Err(PsrpError::UnexpectedTag {
                tag: other.to_string(),
                context: "as type definition",
            }),
        }
    }
}

fn attr<'a>(node: Node<'a, 'a>, name: &'static str) -> Result<&'a str> {
    node.attribute(name)
        .ok_or_else(|| PsrpError::MalformedXml(format!("missing attribute '{name}'")))
}

fn parse_number<T: std::str::FromStr>(tag: &str, text: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse()
        .map_err(|e| PsrpError::MalformedXml(format!("invalid <{tag}> value '{text}': {e}")))
}

fn parse_f32(text: &str) -> Result<f32> {
    match text.trim() {
        "NaN" => Ok(f32::NAN),
        "Infinity" => Ok(f32::INFINITY),
        "-Infinity" => Ok(f32::NEG_INFINITY),
        other => parse_number("Sg", other),
    }
}

fn parse_f64(text: &str) -> Result<f64> {
    match text.trim() {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        other => parse_number("Db", other),
    }
}

/// Integral value and width for enum content detection.
fn integral_parts(p: &PsPrimitiveValue) -> Option<(i64, EnumWidth)> {
    Some(match p {
        PsPrimitiveValue::SByte(v) => (i64::from(*v), EnumWidth::SByte),
        PsPrimitiveValue::Byte(v) => (i64::from(*v), EnumWidth::Byte),
        PsPrimitiveValue::I16(v) => (i64::from(*v), EnumWidth::I16),
        PsPrimitiveValue::U16(v) => (i64::from(*v), EnumWidth::U16),
        PsPrimitiveValue::I32(v) => (i64::from(*v), EnumWidth::I32),
        PsPrimitiveValue::U32(v) => (i64::from(*v), EnumWidth::U32),
        PsPrimitiveValue::I64(v) => (*v, EnumWidth::I64),
        PsPrimitiveValue::U64(v) => (*v as i64, EnumWidth::U64),
        _ => return None,
    })
}
