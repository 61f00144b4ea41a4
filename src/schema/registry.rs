//! Type registry: registration, link validation, and record validation.

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::TypeDef;
use crate::error::{BuildError, Result};
use crate::node::JsonMap;

/// Registry of declared node types
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<String, TypeDef>,
    /// Registration order, for deterministic iteration.
    order: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. Fails with `DuplicateType` on name reuse.
    pub fn register(&mut self, def: TypeDef) -> Result<()> {
        if self.types.contains_key(&def.name) {
            return Err(BuildError::DuplicateType(def.name));
        }
        self.order.push(def.name.clone());
        self.types.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Registered type defs in registration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.order.iter().filter_map(|name| self.types.get(name))
    }

    /// Validate every link spec against the registered types.
    ///
    /// Fails fast with `UnknownLinkTarget` instead of letting an
    /// unresolvable link silently produce empty relations. Call after all
    /// registrations, before ingestion.
    pub fn validate_links(&self) -> Result<()> {
        for def in self.types() {
            for link in &def.links {
                let Some(target) = self.types.get(&link.target_type) else {
                    return Err(BuildError::UnknownLinkTarget {
                        type_name: def.name.clone(),
                        link: link.name.clone(),
                        what: "type",
                        target: link.target_type.clone(),
                    });
                };
                if target.find_field(&link.target_field).is_none() {
                    return Err(BuildError::UnknownLinkTarget {
                        type_name: def.name.clone(),
                        link: link.name.clone(),
                        what: "field",
                        target: format!("{}.{}", link.target_type, link.target_field),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate a record against a type's declared field schema.
    ///
    /// Required fields must be present and non-null; present values must
    /// match their declared kind. Fields outside the declaration are
    /// rejected: the schema is a closed set, not an open-ended bag.
    pub fn validate_record(&self, type_name: &str, record: &JsonMap) -> Result<()> {
        let def = self
            .types
            .get(type_name)
            .ok_or_else(|| BuildError::UnknownType(type_name.to_string()))?;

        for field in &def.fields {
            match record.get(&field.name) {
                None | Some(Value::Null) if !field.nullable => {
                    return Err(BuildError::SchemaViolation {
                        type_name: def.name.clone(),
                        message: format!("missing required field `{}`", field.name),
                    });
                }
                Some(value) if !value.is_null() && !field.kind.accepts(value) => {
                    return Err(BuildError::SchemaViolation {
                        type_name: def.name.clone(),
                        message: format!(
                            "field `{}` has wrong shape: expected {:?}, got {value}",
                            field.name, field.kind
                        ),
                    });
                }
                _ => {}
            }
        }

        for key in record.keys() {
            if def.find_field(key).is_none() {
                return Err(BuildError::SchemaViolation {
                    type_name: def.name.clone(),
                    message: format!("undeclared field `{key}`"),
                });
            }
        }

        Ok(())
    }

    /// Extract the natural-key value of a record as a string.
    ///
    /// The key field is required by construction, so a missing or null key
    /// is a schema violation.
    pub fn natural_key(&self, type_name: &str, record: &JsonMap) -> Result<String> {
        let def = self
            .types
            .get(type_name)
            .ok_or_else(|| BuildError::UnknownType(type_name.to_string()))?;

        match record.get(&def.key_field) {
            None | Some(Value::Null) => Err(BuildError::SchemaViolation {
                type_name: def.name.clone(),
                message: format!("missing natural key `{}`", def.key_field),
            }),
            Some(Value::String(s)) => Ok(s.clone()),
            // Numbers and other scalars key via their JSON text
            Some(other) => Ok(other.to_string()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
