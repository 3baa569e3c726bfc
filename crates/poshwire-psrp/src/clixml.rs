//! Top-level CLIXML entry points.
//!
//! A CLIXML stream is a plain concatenation of top-level elements with no
//! envelope; the decoder wraps the text in a synthetic root so the XML
//! parser accepts it and then yields one value per top-level element.

use crate::PsrpError;
use crate::crypto::CryptoProvider;
use crate::ps_value::{Deserializer, PsValue, Serializer};
use crate::registry::TypeRegistry;

/// Serialises values back-to-back, no envelope. Fails with
/// [`PsrpError::CryptoUnavailable`] if any value holds a secure string.
pub fn serialize_clixml(values: &[PsValue]) -> Result<String, PsrpError> {
    serialize_clixml_with(values, None)
}

/// Serialises with an optional crypto provider for `<SS>` payloads. The
/// reference and type tables span the whole call, so repeated objects
/// across top-level values still collapse to `<Ref>`.
pub fn serialize_clixml_with(
    values: &[PsValue],
    crypto: Option<&dyn CryptoProvider>,
) -> Result<String, PsrpError> {
    let mut serializer = Serializer::new(crypto);
    let mut out = String::new();
    for value in values {
        out.push_str(&serializer.value_to_element(value)?.to_xml_string());
    }
    Ok(out)
}

/// Deserialises a CLIXML stream with the protocol's default registry and
/// no crypto provider.
pub fn deserialize_clixml(text: &str) -> Result<Vec<PsValue>, PsrpError> {
    deserialize_clixml_with(text, &TypeRegistry::default(), None)
}

pub fn deserialize_clixml_with(
    text: &str,
    registry: &TypeRegistry,
    crypto: Option<&dyn CryptoProvider>,
) -> Result<Vec<PsValue>, PsrpError> {
    let body = strip_preamble(text);
    let wrapped = format!("<PsrpDoc>{body}</PsrpDoc>");
    let document = poshwire_xml::parser::parse(&wrapped)
        .map_err(|e| PsrpError::MalformedXml(e.to_string()))?;

    let mut deserializer = Deserializer::new(registry, crypto);
    let mut values = Vec::new();
    for node in poshwire_xml::parser::element_children(document.root_element()) {
        values.push(deserializer.value_from_node(node)?);
    }
    Ok(values)
}

/// Drops a UTF-8 BOM and an optional XML declaration.
fn strip_preamble(text: &str) -> &str {
    let text = text.trim_start_matches('\u{FEFF}');
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("<?xml")
        && let Some(end) = rest.find("?>")
    {
        &rest[end + 2..]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_top_level_objects() {
        let values = vec![PsValue::from("a"), PsValue::from(2)];
        let xml = serialize_clixml(&values).unwrap();
        assert_eq!(xml, "<S>a</S><I32>2</I32>");
        assert_eq!(deserialize_clixml(&xml).unwrap(), values);
    }

    #[test]
    fn tolerates_bom_and_declaration() {
        let xml = "\u{FEFF}<?xml version=\"1.0\"?><S>hi</S>";
        let values = deserialize_clixml(xml).unwrap();
        assert_eq!(values, vec![PsValue::from("hi")]);
    }

    #[test]
    fn parse_error_is_malformed_xml() {
        let err = deserialize_clixml("<S>unclosed").unwrap_err();
        assert!(matches!(err, PsrpError::MalformedXml(_)));
    }
}
