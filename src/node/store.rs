//! Node storage with lazy per-(type, field) indexing.
//!
//! The store is mutated single-threaded during ingestion and read-only
//! during resolution and generation, so only the lazily built field index
//! needs interior mutability.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;

use super::{Node, NodeId};
use crate::error::{BuildError, Result};

/// Index key: `(type_name, field_name)`
type IndexKey = (String, String);

/// Value-keyed posting lists for one `(type, field)` pair
type FieldIndex = FxHashMap<String, Vec<NodeId>>;

/// Exclusive owner of node lifetime for a build run
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: FxHashMap<NodeId, Arc<Node>>,
    /// Ids per type, in insertion order.
    by_type: FxHashMap<String, Vec<NodeId>>,
    /// Lazily built indexes, dropped again when their type is upserted.
    index: RwLock<FxHashMap<IndexKey, FieldIndex>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node.
    ///
    /// Idempotent for identical content: a node whose id and digest both
    /// match the stored one is a no-op. A matching id with a differing
    /// digest is an `IdentityConflict`.
    pub fn upsert(&mut self, node: Node) -> Result<()> {
        if let Some(existing) = self.nodes.get(node.id()) {
            if existing.content_digest() == node.content_digest() {
                return Ok(());
            }
            return Err(BuildError::IdentityConflict {
                id: node.id().clone(),
            });
        }

        let type_name = node.type_name().to_string();
        let id = node.id().clone();

        self.by_type
            .entry(type_name.clone())
            .or_default()
            .push(id.clone());
        self.nodes.insert(id, Arc::new(node));

        // Any index over this type is now stale
        self.index
            .write()
            .retain(|(indexed_type, _), _| *indexed_type != type_name);

        Ok(())
    }

    pub fn get(&self, id: &NodeId) -> Option<Arc<Node>> {
        self.nodes.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes of a type, in insertion order.
    pub fn query_by_type(&self, type_name: &str) -> Vec<Arc<Node>> {
        self.by_type
            .get(type_name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.nodes.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes of `type_name` whose `field_name` equals `value`.
    ///
    /// Backed by an index built on first query per `(type, field)` pair.
    /// Null and absent field values are never indexed: they represent
    /// "no relation" and can match nothing.
    pub fn query_by_field(
        &self,
        type_name: &str,
        field_name: &str,
        value: &Value,
    ) -> Vec<Arc<Node>> {
        if value.is_null() {
            return Vec::new();
        }

        let key = (type_name.to_string(), field_name.to_string());
        let value_key = value.to_string();

        if let Some(ids) = self
            .index
            .read()
            .get(&key)
            .and_then(|idx| idx.get(&value_key))
        {
            return ids
                .iter()
                .filter_map(|id| self.nodes.get(id).cloned())
                .collect();
        }

        let built = self.build_field_index(type_name, field_name);
        let ids = built.get(&value_key).cloned().unwrap_or_default();
        self.index.write().insert(key, built);

        ids.iter()
            .filter_map(|id| self.nodes.get(id).cloned())
            .collect()
    }

    fn build_field_index(&self, type_name: &str, field_name: &str) -> FieldIndex {
        let mut built = FieldIndex::default();
        if let Some(ids) = self.by_type.get(type_name) {
            for id in ids {
                let Some(node) = self.nodes.get(id) else {
                    continue;
                };
                match node.attr(field_name) {
                    None | Some(Value::Null) => {}
                    Some(value) => {
                        built.entry(value.to_string()).or_default().push(id.clone());
                    }
                }
            }
        }
        crate::debug!("store"; "indexed {}.{} ({} distinct values)", type_name, field_name, built.len());
        built
    }
}

// =============================================================================
// Tests
// =============================================================================
