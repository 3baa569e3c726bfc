//! CLIXML serialization: `PsValue` → XML elements.
//!
//! Two per-encode tables deduplicate repeated complex objects (`<Ref>`)
//! and repeated type-name lists (`<TNRef>`). Collection-bearing objects
//! always serialise inline: PowerShell's own deserialiser mishandles
//! back-references into collection types, so they are assigned a RefId
//! but never recorded for reuse.

use std::collections::HashMap;

use poshwire_xml::builder::Element;
use tracing::trace;

use crate::PsrpError;
use crate::crypto::CryptoProvider;

use super::escape;
use super::{
    ComplexObject, ComplexObjectContent, Container, EnumWidth, PsPrimitiveValue, PsProperty,
    PsType, PsValue,
};

type Result<T> = std::result::Result<T, PsrpError>;

#[derive(Debug, Default)]
struct RefIdMap<'a, T> {
    map: HashMap<&'a T, u32>,
    next_id: u32,
}

impl<'a, T> RefIdMap<'a, T>
where
    T: std::hash::Hash + Eq,
{
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            next_id: 0,
        }
    }

    fn get(&self, item: &T) -> Option<u32> {
        self.map.get(item).copied()
    }

    fn insert(&mut self, item: &'a T) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.map.insert(item, id);
        id
    }

    /// Burns an id without recording the item (collection objects).
    fn skip(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

pub(crate) struct Serializer<'a> {
    objects: RefIdMap<'a, ComplexObject>,
    types: RefIdMap<'a, PsType>,
    crypto: Option<&'a dyn CryptoProvider>,
}

impl<'a> Serializer<'a> {
    pub fn new(crypto: Option<&'a dyn CryptoProvider>) -> Self {
        Self {
            objects: RefIdMap::new(),
            types: RefIdMap::new(),
            crypto,
        }
    }

    pub fn value_to_element(&mut self, value: &'a PsValue) -> Result<Element> {
        match value {
            PsValue::Primitive(p) => self.primitive_to_element(p),
            PsValue::Object(obj) => self.object_to_element(obj),
        }
    }

    fn primitive_to_element(&self, value: &PsPrimitiveValue) -> Result<Element> {
        Ok(match value {
            PsPrimitiveValue::Str(s) => Element::new("S").text(escape::encode_units(s.units())),
            PsPrimitiveValue::Char(c) => Element::new("C").text((*c as u32).to_string()),
            PsPrimitiveValue::Bool(b) => Element::new("B").text(b.to_string()),
            PsPrimitiveValue::SByte(v) => Element::new("SB").text(v.to_string()),
            PsPrimitiveValue::Byte(v) => Element::new("By").text(v.to_string()),
            PsPrimitiveValue::I16(v) => Element::new("I16").text(v.to_string()),
            PsPrimitiveValue::U16(v) => Element::new("U16").text(v.to_string()),
            PsPrimitiveValue::I32(v) => Element::new("I32").text(v.to_string()),
            PsPrimitiveValue::U32(v) => Element::new("U32").text(v.to_string()),
            PsPrimitiveValue::I64(v) => Element::new("I64").text(v.to_string()),
            PsPrimitiveValue::U64(v) => Element::new("U64").text(v.to_string()),
            PsPrimitiveValue::Single(v) => Element::new("Sg").text(format_f32(*v)),
            PsPrimitiveValue::Double(v) => Element::new("Db").text(format_f64(*v)),
            PsPrimitiveValue::Decimal(v) => Element::new("D").text(v.clone()),
            PsPrimitiveValue::DateTime(v) => Element::new("DT").text(v.to_clixml()),
            PsPrimitiveValue::Duration(v) => Element::new("TS").text(v.to_clixml()),
            PsPrimitiveValue::Bytes(v) => {
                use base64::Engine as _;
                Element::new("BA").text(base64::engine::general_purpose::STANDARD.encode(v))
            }
            PsPrimitiveValue::Guid(v) => Element::new("G").text(v.to_string()),
            PsPrimitiveValue::Uri(v) => Element::new("URI").text(escape::encode_str(v)),
            PsPrimitiveValue::Version(v) => Element::new("Version").text(v.clone()),
            PsPrimitiveValue::XmlDocument(v) => Element::new("XD").text(escape::encode_str(v)),
            PsPrimitiveValue::ScriptBlock(v) => Element::new("SBK").text(escape::encode_str(v)),
            PsPrimitiveValue::SecureString(ss) => {
                let crypto = self.crypto.ok_or(PsrpError::CryptoUnavailable)?;
                Element::new("SS").text(crypto.encrypt(ss.plaintext())?)
            }
            PsPrimitiveValue::Nil => Element::new("Nil"),
        })
    }

    fn object_to_element(&mut self, obj: &'a ComplexObject) -> Result<Element> {
        let is_collection = matches!(obj.content, ComplexObjectContent::Container(_));

        let ref_id = if is_collection {
            // Inline always; the id is still consumed so output ids stay
            // dense and deterministic.
            self.objects.skip()
        } else if let Some(existing) = self.objects.get(obj) {
            trace!(ref_id = existing, "emitting back-reference");
            return Ok(Element::new("Ref").attr("RefId", existing.to_string()));
        } else {
            self.objects.insert(obj)
        };

        let mut element = Element::new("Obj").attr("RefId", ref_id.to_string());

        if let Some(type_def) = &obj.type_def {
            element = element.child(self.type_to_element(type_def));
        }
        if let Some(to_string) = &obj.to_string {
            element = element.child(Element::new("ToString").text(escape::encode_str(to_string)));
        }

        match &obj.content {
            ComplexObjectContent::Standard => {}
            ComplexObjectContent::ExtendedPrimitive(p) => {
                element = element.child(self.primitive_to_element(p)?);
            }
            ComplexObjectContent::Container(container) => {
                element = element.child(self.container_to_element(container)?);
            }
            ComplexObjectContent::Enum(e) => {
                element = element.child(enum_to_element(e));
            }
        }

        if !obj.adapted_properties.is_empty() {
            let mut props = Element::new("Props");
            for prop in obj.adapted_properties.values() {
                props = props.child(self.property_to_element(prop)?);
            }
            element = element.child(props);
        }
        if !obj.extended_properties.is_empty() {
            let mut ms = Element::new("MS");
            for prop in obj.extended_properties.values() {
                ms = ms.child(self.property_to_element(prop)?);
            }
            element = element.child(ms);
        }

        Ok(element)
    }

    fn container_to_element(&mut self, container: &'a Container) -> Result<Element> {
        Ok(match container {
            Container::Stack(values) => self.sequence_to_element("STK", values)?,
            Container::Queue(values) => self.sequence_to_element("QUE", values)?,
            Container::List(values) => self.sequence_to_element("LST", values)?,
            Container::Enumerable(values) => self.sequence_to_element("IE", values)?,
            Container::Dictionary(entries) => {
                let mut element = Element::new("DCT");
                for (key, value) in entries {
                    let key_element = self.value_to_element(key)?.attr("N", "Key");
                    let value_element = self.value_to_element(value)?.attr("N", "Value");
                    element =
                        element.child(Element::new("En").child(key_element).child(value_element));
                }
                element
            }
        })
    }

    fn sequence_to_element(&mut self, tag: &'static str, values: &'a [PsValue]) -> Result<Element> {
        let mut element = Element::new(tag);
        for value in values {
            element = element.child(self.value_to_element(value)?);
        }
        Ok(element)
    }

    fn property_to_element(&mut self, prop: &'a PsProperty) -> Result<Element> {
        Ok(self
            .value_to_element(&prop.value)?
            .attr("N", escape::encode_str(&prop.name)))
    }

    fn type_to_element(&mut self, type_def: &'a PsType) -> Element {
        if let Some(ref_id) = self.types.get(type_def) {
            trace!(ref_id, "emitting type back-reference");
            return Element::new("TNRef").attr("RefId", ref_id.to_string());
        }

        let ref_id = self.types.insert(type_def);
        let mut element = Element::new("TN").attr("RefId", ref_id.to_string());
        for name in &type_def.type_names {
            element = element.child(Element::new("T").text(escape::encode_str(name)));
        }
        element
    }
}

fn enum_to_element(e: &super::PsEnum) -> Element {
    match e.width {
        EnumWidth::SByte => Element::new("SB").text((e.value as i8).to_string()),
        EnumWidth::Byte => Element::new("By").text((e.value as u8).to_string()),
        EnumWidth::I16 => Element::new("I16").text((e.value as i16).to_string()),
        EnumWidth::U16 => Element::new("U16").text((e.value as u16).to_string()),
        EnumWidth::I32 => Element::new("I32").text((e.value as i32).to_string()),
        EnumWidth::U32 => Element::new("U32").text((e.value as u32).to_string()),
        EnumWidth::I64 => Element::new("I64").text(e.value.to_string()),
        EnumWidth::U64 => Element::new("U64").text((e.value as u64).to_string()),
    }
}

fn format_f32(v: f32) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else {
        format!("{v}")
    }
}

/// .NET-style float text: `Infinity` / `-Infinity` / `NaN` spelled out.
fn format_f64(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else {
        format!("{v}")
    }
}
