//! Type declarations: field schemas and link specifications.

mod registry;

use serde_json::Value;

pub use registry::TypeRegistry;

/// Relation cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Expected shape of a declared field's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    String,
    Int,
    Float,
    Bool,
    /// No shape constraint beyond the nullability check.
    #[default]
    Any,
}

impl FieldKind {
    /// Check a (non-null) value against this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Int => value.is_i64() || value.is_u64(),
            FieldKind::Float => value.is_number(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Any => true,
        }
    }
}

/// A declared field
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldDef {
    pub fn required(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
        }
    }

    pub fn nullable(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: true,
        }
    }
}

/// A declared foreign-key style relation between two types
#[derive(Debug, Clone)]
pub struct LinkSpec {
    /// Link name, used for lookup and diagnostics (e.g. `author`).
    pub name: String,
    /// Field on the source node holding the key value.
    pub source_field: String,
    /// Type the link points at.
    pub target_type: String,
    /// Field on the target type matched against the source value.
    pub target_field: String,
    pub cardinality: Cardinality,
}

/// A registered node type
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    /// Natural-key field; its value (with the type name) derives node ids.
    pub key_field: String,
    pub fields: Vec<FieldDef>,
    pub links: Vec<LinkSpec>,
}

impl TypeDef {
    pub fn new(name: &str, key_field: &str) -> Self {
        Self {
            name: name.to_string(),
            key_field: key_field.to_string(),
            fields: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn link(mut self, link: LinkSpec) -> Self {
        self.links.push(link);
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_link(&self, name: &str) -> Option<&LinkSpec> {
        self.links.iter().find(|l| l.name == name)
    }
}
