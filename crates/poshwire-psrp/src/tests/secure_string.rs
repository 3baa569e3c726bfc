//! Secure-string gating: `<SS>` must refuse to move in either direction
//! without a provider, and round-trip through one.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::PsrpError;
use crate::crypto::{CryptoProvider, NoCrypto};
use crate::ps_value::{PsPrimitiveValue, PsSecureString, PsString, PsValue};
use crate::registry::TypeRegistry;
use crate::{deserialize_clixml_with, serialize_clixml, serialize_clixml_with};

/// Stand-in provider: base64 of the UTF-16LE plaintext. Reversible, no
/// key material, test-only.
struct EchoCrypto;

impl CryptoProvider for EchoCrypto {
    fn encrypt(&self, plaintext: &PsString) -> Result<String, PsrpError> {
        let bytes: Vec<u8> = plaintext
            .units()
            .iter()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        Ok(B64.encode(bytes))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<PsString, PsrpError> {
        let bytes = B64
            .decode(ciphertext)
            .map_err(|e| PsrpError::Crypto(e.to_string()))?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(PsString::from_units(units))
    }

    fn register_session_key(&mut self, _key: &[u8]) -> Result<(), PsrpError> {
        Ok(())
    }
}

fn secret(text: &str) -> PsValue {
    PsValue::Primitive(PsPrimitiveValue::SecureString(PsSecureString::new(text)))
}

#[test]
fn serialize_without_provider_is_crypto_unavailable() {
    let err = serialize_clixml(&[secret("hunter2")]).unwrap_err();
    assert!(matches!(err, PsrpError::CryptoUnavailable));
}

#[test]
fn serialize_with_no_crypto_provider_is_crypto_unavailable() {
    let err = serialize_clixml_with(&[secret("hunter2")], Some(&NoCrypto)).unwrap_err();
    assert!(matches!(err, PsrpError::CryptoUnavailable));
}

#[test]
fn nested_secure_string_is_also_gated() {
    let value = PsValue::dict([(PsValue::from("password"), secret("hunter2"))]);
    let err = serialize_clixml(&[value]).unwrap_err();
    assert!(matches!(err, PsrpError::CryptoUnavailable));
}

#[test]
fn round_trip_through_provider() {
    let value = secret("hunter2");
    let xml = serialize_clixml_with(std::slice::from_ref(&value), Some(&EchoCrypto)).unwrap();
    assert!(xml.starts_with("<SS>"));
    assert!(!xml.contains("hunter2"));

    let decoded =
        deserialize_clixml_with(&xml, &TypeRegistry::default(), Some(&EchoCrypto)).unwrap();
    assert_eq!(decoded, vec![value]);
}

#[test]
fn decode_without_provider_is_crypto_unavailable() {
    let xml = serialize_clixml_with(&[secret("x")], Some(&EchoCrypto)).unwrap();
    let err = deserialize_clixml_with(&xml, &TypeRegistry::default(), None).unwrap_err();
    assert!(matches!(err, PsrpError::CryptoUnavailable));
}
