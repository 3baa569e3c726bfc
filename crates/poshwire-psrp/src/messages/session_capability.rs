use crate::MessageType;
use crate::ps_value::{ComplexObject, PsPrimitiveValue, PsValue};

use super::{PsObjectWithType, decode};

/// First message either side sends: protocol, PowerShell, and
/// serialization version numbers.
///
/// ```xml
/// <Obj RefId="0">
///   <MS>
///     <Version N="protocolversion">2.3</Version>
///     <Version N="PSVersion">2.0</Version>
///     <Version N="SerializationVersion">1.1.0.1</Version>
///   </MS>
/// </Obj>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct SessionCapability {
    #[builder(setter(into))]
    pub protocol_version: String,
    #[builder(setter(into))]
    pub ps_version: String,
    #[builder(setter(into))]
    pub serialization_version: String,
    /// Serialized .NET TimeZone blob; clients may omit it.
    #[builder(default)]
    pub time_zone: Option<Vec<u8>>,
}

impl PsObjectWithType for SessionCapability {
    fn message_type(&self) -> MessageType {
        MessageType::SessionCapability
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<SessionCapability> for ComplexObject {
    fn from(cap: SessionCapability) -> Self {
        let mut obj = Self::new();
        obj.insert_extended(
            "protocolversion",
            PsPrimitiveValue::Version(cap.protocol_version),
        );
        obj.insert_extended("PSVersion", PsPrimitiveValue::Version(cap.ps_version));
        obj.insert_extended(
            "SerializationVersion",
            PsPrimitiveValue::Version(cap.serialization_version),
        );
        if let Some(time_zone) = cap.time_zone {
            obj.insert_extended("TimeZone", PsPrimitiveValue::Bytes(time_zone));
        }
        obj
    }
}

impl TryFrom<ComplexObject> for SessionCapability {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let protocol_version = decode::required_version(&value, "protocolversion")?;
        let ps_version = decode::required_version(&value, "PSVersion")?;
        let serialization_version = decode::required_version(&value, "SerializationVersion")?;
        let time_zone = match value.property("TimeZone") {
            Some(PsValue::Primitive(PsPrimitiveValue::Bytes(bytes))) => Some(bytes.clone()),
            _ => None,
        };

        Ok(Self {
            protocol_version,
            ps_version,
            serialization_version,
            time_zone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let cap = SessionCapability::builder()
            .protocol_version("2.3")
            .ps_version("2.0")
            .serialization_version("1.1.0.1")
            .build();

        let obj = ComplexObject::from(cap.clone());
        assert_eq!(SessionCapability::try_from(obj).unwrap(), cap);
    }

    #[test]
    fn message_type_value() {
        let cap = SessionCapability::builder()
            .protocol_version("2.3")
            .ps_version("2.0")
            .serialization_version("1.1.0.1")
            .build();
        assert_eq!(cap.message_type().value(), 0x00010002);
    }

    #[test]
    fn missing_version_is_invalid() {
        let obj = ComplexObject::new();
        assert!(SessionCapability::try_from(obj).is_err());
    }
}
