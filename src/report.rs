//! Recoverable warning collection.
//!
//! Warnings are logged as they happen and retained for the build output.
//! They never interrupt the pipeline; fatal conditions are `BuildError`.

use std::fmt;

use parking_lot::Mutex;

use crate::node::NodeId;

/// A recoverable condition observed during a build
#[derive(Debug, Clone)]
pub enum Warning {
    /// A `one`-cardinality link matched more than one node.
    LinkAmbiguity {
        source: NodeId,
        link: String,
        matches: usize,
        picked: NodeId,
    },
    /// A field resolver failed; the field was set to null.
    ResolverError {
        node: NodeId,
        field: String,
        message: String,
    },
    /// A remote fetch failed; the asset is unavailable.
    FetchError { locator: String, message: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::LinkAmbiguity {
                source,
                link,
                matches,
                picked,
            } => write!(
                f,
                "link `{link}` on `{source}` matched {matches} nodes, picked `{picked}`"
            ),
            Warning::ResolverError {
                node,
                field,
                message,
            } => write!(f, "resolver for `{node}.{field}` failed: {message}"),
            Warning::FetchError { locator, message } => {
                write!(f, "fetch of `{locator}` failed: {message}")
            }
        }
    }
}

/// Thread-safe warning sink shared across build phases
///
/// Concurrent resolver tasks push warnings through a shared reference;
/// `into_warnings` drains the list at the end of the run.
#[derive(Debug, Default)]
pub struct Reporter {
    warnings: Mutex<Vec<Warning>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it.
    pub fn warn(&self, warning: Warning) {
        crate::log!("warning"; "{warning}");
        self.warnings.lock().push(warning);
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.lock().len()
    }

    /// Snapshot of the warnings recorded so far.
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    /// Consume the reporter, returning the collected warnings.
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings.into_inner()
    }
}
