use crate::ps_value::{ComplexObject, PsValue};

/// One argument to a command: named (`-Name value`), positional (name is
/// null on the wire), or a switch (boolean value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParameter {
    pub name: Option<String>,
    pub value: PsValue,
}

impl CommandParameter {
    pub fn named(name: impl Into<String>, value: impl Into<PsValue>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }

    pub fn positional(value: impl Into<PsValue>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn switch(name: impl Into<String>, enabled: bool) -> Self {
        Self::named(name, enabled)
    }
}

impl From<CommandParameter> for ComplexObject {
    fn from(param: CommandParameter) -> Self {
        let mut obj = Self::new();
        obj.insert_extended(
            "N",
            match param.name {
                Some(name) => PsValue::from(name),
                None => PsValue::NULL,
            },
        );
        obj.insert_extended("V", param.value);
        obj
    }
}

impl TryFrom<ComplexObject> for CommandParameter {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let name = value.property("N").and_then(PsValue::as_string);
        let param_value = value.property("V").cloned().unwrap_or(PsValue::NULL);
        Ok(Self {
            name,
            value: param_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_round_trip() {
        let param = CommandParameter::named("Path", "C:\\temp");
        let obj = ComplexObject::from(param.clone());
        assert_eq!(CommandParameter::try_from(obj).unwrap(), param);
    }

    #[test]
    fn positional_name_is_null_on_the_wire() {
        let param = CommandParameter::positional(42);
        let obj = ComplexObject::from(param.clone());
        assert!(obj.property("N").unwrap().is_null());
        assert_eq!(CommandParameter::try_from(obj).unwrap(), param);
    }
}
