//! Page descriptors and generation rules.

mod generate;

use serde::Serialize;
use serde_json::Value;

pub use generate::{PageGenerator, PageSet};

use crate::core::UrlPath;

/// The output unit handed to the rendering collaborator
///
/// Paths are globally unique across a generated set; uniqueness is
/// enforced at generation time, not assumed.
#[derive(Debug, Clone, Serialize)]
pub struct PageDescriptor {
    pub path: UrlPath,
    /// Identifier the renderer maps to a template function.
    pub template_id: String,
    /// Render input; shape is the renderer's concern.
    pub context: Value,
}

/// Declares which nodes of a type become pages, and how
#[derive(Debug, Clone)]
pub struct PageRule {
    pub type_name: String,
    pub template_id: String,
    /// Attribute the entity slug is derived from.
    pub name_field: String,
    /// Optional grouping attribute: non-null values add a group segment
    /// to the path (`/{category}/{group}/{entity}`).
    pub group_field: Option<String>,
}

impl PageRule {
    pub fn new(type_name: &str, template_id: &str, name_field: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            template_id: template_id.to_string(),
            name_field: name_field.to_string(),
            group_field: None,
        }
    }

    pub fn grouped_by(mut self, field: &str) -> Self {
        self.group_field = Some(field.to_string());
        self
    }
}
