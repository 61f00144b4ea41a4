//! Typed content-graph nodes with stable identity and content digests.

mod store;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use store::NodeStore;

/// Ordered attribute map (insertion order preserved for serialization)
pub type JsonMap = serde_json::Map<String, Value>;

// =============================================================================
// NodeId
// =============================================================================

/// Stable node identity
///
/// Derived deterministically from the type name plus the declared natural
/// key, never randomly generated: re-ingesting identical input yields
/// identical identity. Lexicographic ordering over ids is the deterministic
/// tie-break for ambiguous links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Arc<str>);

impl NodeId {
    /// Derive an id from a type name and its natural-key value.
    pub fn derive(type_name: &str, natural_key: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(type_name.as_bytes());
        hasher.update(b"\0");
        hasher.update(natural_key.as_bytes());
        let hash = hasher.finalize();
        Self(Arc::from(hex::encode(&hash.as_bytes()[..16])))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ContentDigest
// =============================================================================

/// Deterministic 256-bit hash over a node's attributes (blake3)
///
/// Equal attributes always produce equal digests; used for idempotent
/// re-ingestion detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Compute the digest of an attribute map.
    ///
    /// Keys are hashed in sorted order at every nesting level, so logically
    /// equal maps digest identically regardless of insertion order.
    pub fn compute(attributes: &JsonMap) -> Self {
        let mut hasher = blake3::Hasher::new();
        hash_map_sorted(&mut hasher, attributes);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 16 hex chars are plenty for display
        f.write_str(&self.to_hex()[..16])
    }
}

fn hash_map_sorted(hasher: &mut blake3::Hasher, map: &JsonMap) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hash_value(hasher, &map[key]);
        hasher.update(b";");
    }
}

fn hash_value(hasher: &mut blake3::Hasher, value: &Value) {
    match value {
        Value::Object(map) => {
            hasher.update(b"{");
            hash_map_sorted(hasher, map);
            hasher.update(b"}");
        }
        Value::Array(items) => {
            hasher.update(b"[");
            for item in items {
                hash_value(hasher, item);
                hasher.update(b",");
            }
            hasher.update(b"]");
        }
        // Scalars hash via their canonical JSON text
        other => {
            hasher.update(other.to_string().as_bytes());
        }
    }
}

// =============================================================================
// Node
// =============================================================================

/// An identity-bearing, typed record in the content graph
///
/// Immutable once ingested. Resolved-field values are memoized in the
/// resolver engine, keyed by id, and are not part of identity or digest.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    type_name: Arc<str>,
    attributes: JsonMap,
    content_digest: ContentDigest,
}

impl Node {
    /// Build a node from validated attributes.
    ///
    /// `natural_key` is the value of the type's declared key field.
    pub fn ingest(type_name: &str, natural_key: &str, attributes: JsonMap) -> Self {
        let content_digest = ContentDigest::compute(&attributes);
        Self {
            id: NodeId::derive(type_name, natural_key),
            type_name: Arc::from(type_name),
            attributes,
            content_digest,
        }
    }

    #[inline]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn attributes(&self) -> &JsonMap {
        &self.attributes
    }

    #[inline]
    pub fn content_digest(&self) -> ContentDigest {
        self.content_digest
    }

    /// Attribute lookup; `None` for absent fields.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attribute as `&str`, if present and a string.
    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(Value::as_str)
    }
}

// =============================================================================
// Tests
// =============================================================================
