use serde::{Deserialize, Serialize};

use super::PsValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PsProperty {
    pub name: String,
    pub value: PsValue,
}

impl PsProperty {
    pub fn new(name: impl Into<String>, value: impl Into<PsValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
