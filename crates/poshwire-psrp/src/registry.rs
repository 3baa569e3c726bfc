//! Type registry: which .NET type names rehydrate on deserialization.
//!
//! Lookup keys on the leading (most-derived) type name. A hit with
//! `rehydrate = true` keeps the original type identity; anything else
//! deserialises down the generic path — type names prefixed with
//! `Deserialized.`, `ToString` preserved. Unknown types are never an
//! error.
//!
//! The registry is plain data and injectable per pool; nothing in this
//! crate holds one as process-wide state.

use std::collections::HashMap;

use crate::ps_value::PsType;

#[derive(Debug, Clone)]
pub struct RegisteredType {
    pub type_names: PsType,
    pub rehydrate: bool,
}

#[derive(Debug, Clone)]
pub struct TypeRegistry {
    entries: HashMap<String, RegisteredType>,
}

impl TypeRegistry {
    /// A registry with nothing registered: every typed object comes back
    /// `Deserialized.`.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers the types the protocol itself relies on (collections,
    /// protocol enums, the primitive dictionary) for rehydration.
    pub fn with_protocol_types() -> Self {
        let mut registry = Self::empty();
        for ps_type in [
            PsType::array_list(),
            PsType::hashtable(),
            PsType::stack(),
            PsType::queue(),
            PsType::ps_primitive_dictionary(),
            PsType::remote_host_method_id(),
            PsType::pipeline_result_types(),
            PsType::error_category(),
            PsType::new(["System.Version", "System.Object"]),
            PsType::new(["System.Exception", "System.Object"]),
            PsType::new([
                "System.Management.Automation.ErrorRecord",
                "System.Object",
            ]),
            PsType::new([
                "System.Management.Automation.InformationalRecord",
                "System.Object",
            ]),
            PsType::new([
                "System.Management.Automation.ProgressRecord",
                "System.Object",
            ]),
            PsType::new([
                "System.Management.Automation.InformationRecord",
                "System.Object",
            ]),
            PsType::new([
                "System.Management.Automation.PSCredential",
                "System.Object",
            ]),
        ] {
            registry.register(ps_type, true);
        }
        registry
    }

    /// Registers (or replaces, keyed by leading name) a type-name tuple.
    pub fn register(&mut self, type_names: PsType, rehydrate: bool) {
        let Some(leading) = type_names.leading() else {
            return;
        };
        self.entries.insert(
            leading.to_string(),
            RegisteredType {
                type_names,
                rehydrate,
            },
        );
    }

    pub fn lookup(&self, leading: &str) -> Option<&RegisteredType> {
        self.entries.get(leading)
    }

    /// Whether an incoming object with this type list keeps its identity.
    pub fn rehydrates(&self, type_def: &PsType) -> bool {
        type_def
            .leading()
            .and_then(|leading| self.lookup(leading))
            .is_some_and(|entry| entry.rehydrate)
    }

    /// Applies the lookup semantics to an incoming type list.
    pub fn resolve(&self, type_def: PsType) -> PsType {
        if self.rehydrates(&type_def) {
            type_def
        } else {
            type_def.deserialized()
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_protocol_types()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_types_take_the_generic_path() {
        let registry = TypeRegistry::empty();
        let resolved = registry.resolve(PsType::new(["Contoso.Widget", "System.Object"]));
        assert_eq!(resolved.leading(), Some("Deserialized.Contoso.Widget"));
    }

    #[test]
    fn registered_types_rehydrate() {
        let registry = TypeRegistry::default();
        let resolved = registry.resolve(PsType::array_list());
        assert_eq!(resolved.leading(), Some("System.Collections.ArrayList"));
    }

    #[test]
    fn reregistration_replaces_by_leading_name() {
        let mut registry = TypeRegistry::empty();
        registry.register(PsType::new(["Contoso.Widget", "System.Object"]), true);
        registry.register(PsType::new(["Contoso.Widget"]), false);
        assert!(!registry.rehydrates(&PsType::new(["Contoso.Widget", "System.Object"])));
    }
}
