//! Page generation with path collision detection.

use rustc_hash::FxHashMap;
use serde_json::json;

use super::{PageDescriptor, PageRule};
use crate::core::{UrlPath, slug};
use crate::error::{BuildError, Result};
use crate::node::{NodeId, NodeStore};

/// Ordered page set enforcing global path uniqueness
///
/// Every added page is checked against all previously generated paths in
/// the run; a duplicate is a fatal `PathCollision` naming both
/// contributing node ids.
#[derive(Debug, Default)]
pub struct PageSet {
    pages: Vec<PageDescriptor>,
    seen: FxHashMap<UrlPath, NodeId>,
}

impl PageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: PageDescriptor, origin: NodeId) -> Result<()> {
        if let Some(first) = self.seen.get(&descriptor.path) {
            return Err(BuildError::PathCollision {
                path: descriptor.path,
                first: first.clone(),
                second: origin,
            });
        }
        self.seen.insert(descriptor.path.clone(), origin);
        self.pages.push(descriptor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn into_pages(self) -> Vec<PageDescriptor> {
        self.pages
    }
}

/// Walks resolved nodes and emits the final descriptor set
pub struct PageGenerator<'a> {
    store: &'a NodeStore,
}

impl<'a> PageGenerator<'a> {
    pub fn new(store: &'a NodeStore) -> Self {
        Self { store }
    }

    /// Generate all pages: standalone descriptors first, then one page per
    /// page-eligible node, in store insertion order.
    pub fn generate(
        &self,
        rules: &[PageRule],
        standalone: Vec<PageDescriptor>,
    ) -> Result<Vec<PageDescriptor>> {
        let mut set = PageSet::new();

        for descriptor in standalone {
            // Standalone pages get a synthetic identity for collision reports
            let origin = NodeId::derive("Page", descriptor.path.as_str());
            set.add(descriptor, origin)?;
        }

        for rule in rules {
            for node in self.store.query_by_type(&rule.type_name) {
                let Some(name) = node.str_attr(&rule.name_field) else {
                    crate::debug!("pages"; "node {} has no `{}`, skipped", node.id(), rule.name_field);
                    continue;
                };

                let category = rule.type_name.to_lowercase();
                let entity_slug = slug(name);

                let group_slug = rule
                    .group_field
                    .as_deref()
                    .and_then(|field| node.str_attr(field))
                    .map(slug);

                let path = match &group_slug {
                    Some(group) => UrlPath::from_segments([&category, group, &entity_slug]),
                    None => UrlPath::from_segments([&category, &entity_slug]),
                };

                set.add(
                    PageDescriptor {
                        path,
                        template_id: rule.template_id.clone(),
                        context: json!({ "id": node.id().as_str() }),
                    },
                    node.id().clone(),
                )?;
            }
        }

        crate::log!("pages"; "generated {} page descriptors", set.len());
        Ok(set.into_pages())
    }
}

// =============================================================================
// Tests
// =============================================================================
