//! Cross-type link resolution.
//!
//! A link is resolved lazily, as a pure function of current store state:
//! read the source field value, match it against the target type's field
//! via the store's lazy index. The store does not mutate during the
//! resolution phase, so no caching is layered on top.

use std::sync::Arc;

use serde_json::Value;

use crate::node::{Node, NodeStore};
use crate::report::{Reporter, Warning};
use crate::schema::{Cardinality, LinkSpec};

/// Outcome of resolving one link on one node
#[derive(Debug, Clone)]
pub enum ResolvedLink {
    /// `one` cardinality: at most a single target.
    One(Option<Arc<Node>>),
    /// `many` cardinality: all targets, ordered by id.
    Many(Vec<Arc<Node>>),
}

impl ResolvedLink {
    /// The single target of a `one` link, if any.
    pub fn one(&self) -> Option<&Arc<Node>> {
        match self {
            ResolvedLink::One(node) => node.as_ref(),
            ResolvedLink::Many(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ResolvedLink::One(node) => node.is_none(),
            ResolvedLink::Many(nodes) => nodes.is_empty(),
        }
    }
}

/// Resolve a link spec on `node`.
///
/// An absent or null source value is a normal "no relation" case, never an
/// error. A `one` link matching more than one node is a `LinkAmbiguity`
/// warning, resolved deterministically by the lexicographically smallest id.
pub fn resolve(
    store: &NodeStore,
    node: &Node,
    spec: &LinkSpec,
    reporter: &Reporter,
) -> ResolvedLink {
    let value = match node.attr(&spec.source_field) {
        None | Some(Value::Null) => {
            return match spec.cardinality {
                Cardinality::One => ResolvedLink::One(None),
                Cardinality::Many => ResolvedLink::Many(Vec::new()),
            };
        }
        Some(value) => value,
    };

    let mut matches = store.query_by_field(&spec.target_type, &spec.target_field, value);
    matches.sort_by(|a, b| a.id().cmp(b.id()));

    match spec.cardinality {
        Cardinality::Many => ResolvedLink::Many(matches),
        Cardinality::One => {
            if matches.len() > 1 {
                reporter.warn(Warning::LinkAmbiguity {
                    source: node.id().clone(),
                    link: spec.name.clone(),
                    matches: matches.len(),
                    picked: matches[0].id().clone(),
                });
            }
            ResolvedLink::One(matches.into_iter().next())
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::JsonMap;
    use serde_json::json;

    fn node(type_name: &str, key: &str, pairs: &[(&str, Value)]) -> Node {
        let attrs: JsonMap = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Node::ingest(type_name, key, attrs)
    }

    fn author_link(cardinality: Cardinality) -> LinkSpec {
        LinkSpec {
            name: "author".into(),
            source_field: "author".into(),
            target_type: "Author".into(),
            target_field: "slug".into(),
            cardinality,
        }
    }

    fn store_with_authors(slugs: &[&str]) -> NodeStore {
        let mut store = NodeStore::new();
        for (i, slug) in slugs.iter().enumerate() {
            store
                .upsert(node(
                    "Author",
                    &format!("a{i}"),
                    &[("slug", json!(slug)), ("name", json!(format!("Author {i}")))],
                ))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_one_link_single_match() {
        let store = store_with_authors(&["blake-crouch"]);
        let reporter = Reporter::new();
        let book = node("Book", "1", &[("author", json!("blake-crouch"))]);

        let resolved = resolve(&store, &book, &author_link(Cardinality::One), &reporter);
        let target = resolved.one().expect("should match");
        assert_eq!(target.str_attr("slug"), Some("blake-crouch"));
        assert_eq!(reporter.warning_count(), 0);
    }

    #[test]
    fn test_one_link_zero_matches_is_none_not_error() {
        let store = store_with_authors(&["blake-crouch"]);
        let reporter = Reporter::new();
        let book = node("Book", "1", &[("author", json!("nobody"))]);

        let resolved = resolve(&store, &book, &author_link(Cardinality::One), &reporter);
        assert!(resolved.is_empty());
        assert_eq!(reporter.warning_count(), 0);
    }

    #[test]
    fn test_absent_source_value_is_no_relation() {
        let store = store_with_authors(&["blake-crouch"]);
        let reporter = Reporter::new();

        let missing = node("Book", "1", &[("name", json!("Dark Matter"))]);
        assert!(resolve(&store, &missing, &author_link(Cardinality::One), &reporter).is_empty());

        let null = node("Book", "2", &[("author", json!(null))]);
        assert!(resolve(&store, &null, &author_link(Cardinality::One), &reporter).is_empty());
        assert_eq!(reporter.warning_count(), 0);
    }

    #[test]
    fn test_ambiguous_one_link_picks_lowest_id_and_warns() {
        // Two authors sharing a slug
        let mut store = NodeStore::new();
        let a = node("Author", "a1", &[("slug", json!("dup"))]);
        let b = node("Author", "a2", &[("slug", json!("dup"))]);
        let expected = a.id().min(b.id()).clone();
        store.upsert(a.clone()).unwrap();
        store.upsert(b.clone()).unwrap();

        let reporter = Reporter::new();
        let book = node("Book", "1", &[("author", json!("dup"))]);
        let resolved = resolve(&store, &book, &author_link(Cardinality::One), &reporter);

        assert_eq!(resolved.one().unwrap().id(), &expected);
        assert_eq!(reporter.warning_count(), 1);
        assert!(matches!(
            reporter.warnings()[0],
            Warning::LinkAmbiguity { matches: 2, .. }
        ));
    }

    #[test]
    fn test_many_link_ordered_by_id() {
        let mut store = NodeStore::new();
        for key in ["b-late", "a-early", "c-mid"] {
            store
                .upsert(node("Book", key, &[("author", json!("n-k-jemisin"))]))
                .unwrap();
        }

        let reporter = Reporter::new();
        let author = node("Author", "x", &[("slug", json!("n-k-jemisin"))]);
        let spec = LinkSpec {
            name: "books".into(),
            source_field: "slug".into(),
            target_type: "Book".into(),
            target_field: "author".into(),
            cardinality: Cardinality::Many,
        };

        let resolved = resolve(&store, &author, &spec, &reporter);
        let ResolvedLink::Many(books) = resolved else {
            panic!("expected many");
        };
        assert_eq!(books.len(), 3);
        assert!(books.windows(2).all(|w| w[0].id() < w[1].id()));
    }
}
