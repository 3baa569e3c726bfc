//! Runspace-count management: SET_MAX_RUNSPACES, SET_MIN_RUNSPACES,
//! GET_AVAILABLE_RUNSPACES, their shared RUNSPACE_AVAILABILITY reply, and
//! RESET_RUNSPACE_STATE. Every request carries a call id (`ci`) the reply
//! echoes back.

use crate::MessageType;
use crate::ps_value::{ComplexObject, PsValue};

use super::{PsObjectWithType, decode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetMaxRunspaces {
    pub max_runspaces: i32,
    pub call_id: i64,
}

impl PsObjectWithType for SetMaxRunspaces {
    fn message_type(&self) -> MessageType {
        MessageType::SetMaxRunspaces
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        obj.insert_extended("MaxRunspaces", self.max_runspaces);
        obj.insert_extended("ci", self.call_id);
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for SetMaxRunspaces {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            max_runspaces: decode::required_i32(&value, "MaxRunspaces")?,
            call_id: decode::required_i64(&value, "ci")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetMinRunspaces {
    pub min_runspaces: i32,
    pub call_id: i64,
}

impl PsObjectWithType for SetMinRunspaces {
    fn message_type(&self) -> MessageType {
        MessageType::SetMinRunspaces
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        obj.insert_extended("MinRunspaces", self.min_runspaces);
        obj.insert_extended("ci", self.call_id);
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for SetMinRunspaces {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            min_runspaces: decode::required_i32(&value, "MinRunspaces")?,
            call_id: decode::required_i64(&value, "ci")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetAvailableRunspaces {
    pub call_id: i64,
}

impl PsObjectWithType for GetAvailableRunspaces {
    fn message_type(&self) -> MessageType {
        MessageType::GetAvailableRunspaces
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        obj.insert_extended("ci", self.call_id);
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for GetAvailableRunspaces {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            call_id: decode::required_i64(&value, "ci")?,
        })
    }
}

/// RESET_RUNSPACE_STATE: return the (single) runspace to its initial
/// state. Protocol 2.3 and newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetRunspaceState {
    pub call_id: i64,
}

impl PsObjectWithType for ResetRunspaceState {
    fn message_type(&self) -> MessageType {
        MessageType::ResetRunspaceState
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        obj.insert_extended("ci", self.call_id);
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for ResetRunspaceState {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            call_id: decode::required_i64(&value, "ci")?,
        })
    }
}

/// RUNSPACE_AVAILABILITY: the server's answer to any of the requests
/// above. A boolean for the set operations, a count for the get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunspaceAvailability {
    pub set_min_max_runspaces_response: PsValue,
    pub call_id: i64,
}

impl RunspaceAvailability {
    pub fn accepted(call_id: i64) -> Self {
        Self {
            set_min_max_runspaces_response: PsValue::from(true),
            call_id,
        }
    }

    pub fn available_count(call_id: i64, count: i64) -> Self {
        Self {
            set_min_max_runspaces_response: PsValue::from(count),
            call_id,
        }
    }
}

impl PsObjectWithType for RunspaceAvailability {
    fn message_type(&self) -> MessageType {
        MessageType::RunspaceAvailability
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        obj.insert_extended(
            "SetMinMaxRunspacesResponse",
            self.set_min_max_runspaces_response.clone(),
        );
        obj.insert_extended("ci", self.call_id);
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for RunspaceAvailability {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            set_min_max_runspaces_response: decode::required(
                &value,
                "SetMinMaxRunspacesResponse",
            )?
            .clone(),
            call_id: decode::required_i64(&value, "ci")?,
        })
    }
}
