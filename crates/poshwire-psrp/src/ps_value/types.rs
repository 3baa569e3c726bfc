use core::hash;
use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// An object's type-name list, most-derived first.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/2784bd9c-267d-4297-b603-722c727f85f1
#[derive(Debug, Clone, Eq, Default, Serialize, Deserialize)]
pub struct PsType {
    pub type_names: Vec<Cow<'static, str>>,
}

impl PsType {
    pub fn new(type_names: impl IntoIterator<Item = impl Into<Cow<'static, str>>>) -> Self {
        Self {
            type_names: type_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Most-derived type name; `None` only for a degenerate empty list.
    pub fn leading(&self) -> Option<&str> {
        self.type_names.first().map(Cow::as_ref)
    }

    pub fn is_enum(&self) -> bool {
        self.type_names
            .iter()
            .any(|name| name.as_ref() == "System.Enum")
    }

    /// `Deserialized.`-prefixed copy, for objects decoded without
    /// rehydration. Already-prefixed names are left alone so repeated
    /// decode/encode cycles stay stable.
    pub fn deserialized(&self) -> Self {
        Self {
            type_names: self
                .type_names
                .iter()
                .map(|name| {
                    if name.starts_with("Deserialized.") {
                        name.clone()
                    } else {
                        Cow::Owned(format!("Deserialized.{name}"))
                    }
                })
                .collect(),
        }
    }

    pub fn array_list() -> Self {
        Self {
            type_names: vec![
                Cow::Borrowed("System.Collections.ArrayList"),
                Cow::Borrowed("System.Object"),
            ],
        }
    }

    pub fn hashtable() -> Self {
        Self {
            type_names: vec![
                Cow::Borrowed("System.Collections.Hashtable"),
                Cow::Borrowed("System.Object"),
            ],
        }
    }

    pub fn stack() -> Self {
        Self {
            type_names: vec![
                Cow::Borrowed("System.Collections.Stack"),
                Cow::Borrowed("System.Object"),
            ],
        }
    }

    pub fn queue() -> Self {
        Self {
            type_names: vec![
                Cow::Borrowed("System.Collections.Queue"),
                Cow::Borrowed("System.Object"),
            ],
        }
    }

    pub fn ps_primitive_dictionary() -> Self {
        Self {
            type_names: vec![
                Cow::Borrowed("System.Management.Automation.PSPrimitiveDictionary"),
                Cow::Borrowed("System.Collections.Hashtable"),
                Cow::Borrowed("System.Object"),
            ],
        }
    }

    pub fn remote_host_method_id() -> Self {
        Self::enum_type("System.Management.Automation.Remoting.RemoteHostMethodId")
    }

    pub fn pipeline_result_types() -> Self {
        Self::enum_type("System.Management.Automation.Runspaces.PipelineResultTypes")
    }

    pub fn error_category() -> Self {
        Self::enum_type("System.Management.Automation.ErrorCategory")
    }

    /// Standard enum hierarchy under a concrete enum type name.
    pub fn enum_type(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            type_names: vec![
                name.into(),
                Cow::Borrowed("System.Enum"),
                Cow::Borrowed("System.ValueType"),
                Cow::Borrowed("System.Object"),
            ],
        }
    }
}

impl PartialEq for PsType {
    fn eq(&self, other: &Self) -> bool {
        self.type_names.len() == other.type_names.len()
            && self
                .type_names
                .iter()
                .zip(other.type_names.iter())
                .all(|(a, b)| a.as_ref() == b.as_ref())
    }
}

impl hash::Hash for PsType {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        for ty in &self.type_names {
            ty.hash(state);
        }
    }
}
