//! Reconnection support: CONNECT_RUNSPACEPOOL (client rejoining a
//! disconnected pool) and RUNSPACEPOOL_INIT_DATA (the server's snapshot
//! of the pool's configuration for the new connection).

use crate::MessageType;
use crate::ps_value::{ComplexObject, PsValue};

use super::{PsObjectWithType, decode};

#[derive(Debug, Clone, PartialEq, Eq, Default, typed_builder::TypedBuilder)]
pub struct ConnectRunspacePool {
    /// Present when renegotiating limits on reconnect.
    #[builder(default)]
    pub min_runspaces: Option<i32>,
    #[builder(default)]
    pub max_runspaces: Option<i32>,
}

impl PsObjectWithType for ConnectRunspacePool {
    fn message_type(&self) -> MessageType {
        MessageType::ConnectRunspacePool
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        if let Some(min) = self.min_runspaces {
            obj.insert_extended("MinRunspaces", min);
        }
        if let Some(max) = self.max_runspaces {
            obj.insert_extended("MaxRunspaces", max);
        }
        // an empty <Obj><MS /></Obj> is legal when nothing is renegotiated
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for ConnectRunspacePool {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let read = |name: &str| -> Option<i32> {
            value
                .property(name)
                .and_then(PsValue::as_integer)
                .and_then(|v| i32::try_from(v).ok())
        };
        Ok(Self {
            min_runspaces: read("MinRunspaces"),
            max_runspaces: read("MaxRunspaces"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunspacePoolInitData {
    pub min_runspaces: i32,
    pub max_runspaces: i32,
}

impl PsObjectWithType for RunspacePoolInitData {
    fn message_type(&self) -> MessageType {
        MessageType::RunspacePoolInitData
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        obj.insert_extended("MinRunspaces", self.min_runspaces);
        obj.insert_extended("MaxRunspaces", self.max_runspaces);
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for RunspacePoolInitData {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            min_runspaces: decode::required_i32(&value, "MinRunspaces")?,
            max_runspaces: decode::required_i32(&value, "MaxRunspaces")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_round_trip() {
        let msg = ConnectRunspacePool::builder()
            .min_runspaces(Some(1))
            .max_runspaces(Some(4))
            .build();
        let PsValue::Object(obj) = msg.to_ps_object() else {
            panic!("expected object");
        };
        assert_eq!(ConnectRunspacePool::try_from(obj).unwrap(), msg);
    }

    #[test]
    fn empty_connect_is_legal() {
        let msg = ConnectRunspacePool::default();
        let PsValue::Object(obj) = msg.to_ps_object() else {
            panic!("expected object");
        };
        assert_eq!(ConnectRunspacePool::try_from(obj).unwrap(), msg);
    }

    #[test]
    fn init_data_round_trip() {
        let msg = RunspacePoolInitData {
            min_runspaces: 1,
            max_runspaces: 4,
        };
        let PsValue::Object(obj) = msg.to_ps_object() else {
            panic!("expected object");
        };
        assert_eq!(RunspacePoolInitData::try_from(obj).unwrap(), msg);
        assert_eq!(msg.message_type().value(), 0x0002100B);
    }
}
