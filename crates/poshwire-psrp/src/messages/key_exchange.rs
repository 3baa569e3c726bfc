//! Session-key exchange messages.
//!
//! The client offers an RSA public key (PUBLIC_KEY), the server answers
//! with the AES session key wrapped under it (ENCRYPTED_SESSION_KEY),
//! and either side may force a round with PUBLIC_KEY_REQUEST.

use crate::MessageType;
use crate::ps_value::{ComplexObject, PsPrimitiveValue, PsString, PsValue};

use super::{PsObjectWithType, decode};

/// Client → server public key blob (base64 CryptoAPI PUBLICKEYBLOB).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub public_key: String,
}

impl PsObjectWithType for PublicKey {
    fn message_type(&self) -> MessageType {
        MessageType::PublicKey
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<PublicKey> for ComplexObject {
    fn from(value: PublicKey) -> Self {
        let mut obj = Self::new();
        obj.insert_extended("PublicKey", value.public_key);
        obj
    }
}

impl TryFrom<ComplexObject> for PublicKey {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            public_key: decode::required_str(&value, "PublicKey")?,
        })
    }
}

/// Server → client session key, RSA-wrapped (base64 SIMPLEBLOB).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSessionKey {
    pub encrypted_session_key: String,
}

impl PsObjectWithType for EncryptedSessionKey {
    fn message_type(&self) -> MessageType {
        MessageType::EncryptedSessionKey
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<EncryptedSessionKey> for ComplexObject {
    fn from(value: EncryptedSessionKey) -> Self {
        let mut obj = Self::new();
        obj.insert_extended("EncryptedSessionKey", value.encrypted_session_key);
        obj
    }
}

impl TryFrom<ComplexObject> for EncryptedSessionKey {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            encrypted_session_key: decode::required_str(&value, "EncryptedSessionKey")?,
        })
    }
}

/// Request for the peer's public key. The body is an empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicKeyRequest;

impl PsObjectWithType for PublicKeyRequest {
    fn message_type(&self) -> MessageType {
        MessageType::PublicKeyRequest
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Primitive(PsPrimitiveValue::Str(PsString::new()))
    }
}

impl TryFrom<PsValue> for PublicKeyRequest {
    type Error = crate::PsrpError;

    fn try_from(value: PsValue) -> Result<Self, Self::Error> {
        match value {
            PsValue::Primitive(PsPrimitiveValue::Str(s)) if s.is_empty() => Ok(Self),
            PsValue::Primitive(PsPrimitiveValue::Nil) => Ok(Self),
            other => Err(crate::PsrpError::InvalidMessage(format!(
                "invalid PublicKeyRequest payload: expected empty string, got {other:?}"
            ))),
        }
    }
}
