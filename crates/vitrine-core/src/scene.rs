//! Scene node records and target-name resolution

use serde::{Deserialize, Serialize};

/// Opaque handle to a node in the provider's scene graph
///
/// Handles are only stable for the lifetime of one viewer session; a page
/// reload assigns fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeHandle(pub u32);

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the node map the viewer reports once it is ready
///
/// Names may be absent or duplicated; the provider makes no promises about
/// enumeration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub handle: NodeHandle,
    pub name: Option<String>,
    /// None for root-like nodes
    pub parent: Option<NodeHandle>,
}

/// Outcome of resolving an exhibit's target names against a node map
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// At least one target name matched
    Matched {
        handles: Vec<NodeHandle>,
        /// Target names that matched nothing
        missing: Vec<String>,
    },
    /// No target matched; a single root-like node stands in
    Fallback {
        handle: NodeHandle,
        /// Whether the stand-in was chosen for having no parent, as opposed
        /// to simply being first in enumeration order
        root_like: bool,
    },
    /// The node map was empty; there is nothing to control
    Empty,
}

/// Resolve target names against a node map
///
/// Policy, in order: every node whose name appears in `targets`; otherwise a
/// single fallback node (one without a parent if present, else the first node
/// in `nodes` order); otherwise `Empty`. Matching is exact and the result is
/// independent of node order, except for the first-node fallback which keeps
/// the order the viewer reported.
pub fn resolve_nodes(nodes: &[SceneNode], targets: &[String]) -> Resolution {
    if nodes.is_empty() {
        return Resolution::Empty;
    }

    let handles: Vec<NodeHandle> = nodes
        .iter()
        .filter(|node| {
            node.name
                .as_deref()
                .map(|name| targets.iter().any(|t| t == name))
                .unwrap_or(false)
        })
        .map(|node| node.handle)
        .collect();

    if !handles.is_empty() {
        let missing = targets
            .iter()
            .filter(|t| !nodes.iter().any(|n| n.name.as_deref() == Some(t.as_str())))
            .cloned()
            .collect();
        return Resolution::Matched { handles, missing };
    }

    match nodes.iter().find(|node| node.parent.is_none()) {
        Some(root) => Resolution::Fallback {
            handle: root.handle,
            root_like: true,
        },
        None => Resolution::Fallback {
            handle: nodes[0].handle,
            root_like: false,
        },
    }
}
