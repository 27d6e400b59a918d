//! Wire protocol spoken with the page-side viewer bridge
//!
//! Messages travel as JSON text frames over the bridge WebSocket. The bridge
//! is a dumb relay around the provider's embed client; every decision stays
//! on the daemon side.

use serde::{Deserialize, Serialize};
use vitrine_core::{MaterialState, ModelUid, NodeHandle, SceneNode};

/// Provider hit-testing fidelity for click picking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickMode {
    #[default]
    Fast,
    Slow,
}

/// Wire sentinel the provider uses for "no parent"
const NO_PARENT: i64 = -1;

fn no_parent() -> i64 {
    NO_PARENT
}

/// Raw node record as delivered by the bridge
///
/// The bridge sends records as an array so the provider's enumeration order
/// survives transport; a JSON object map would lose it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "instanceID")]
    pub instance_id: u32,
    #[serde(default)]
    pub name: Option<String>,
    /// -1 when the node has no parent
    #[serde(default = "no_parent", rename = "parentID")]
    pub parent_id: i64,
}

impl From<NodeRecord> for SceneNode {
    fn from(record: NodeRecord) -> Self {
        SceneNode {
            handle: NodeHandle(record.instance_id),
            // Blank names are as useless as absent ones
            name: record.name.filter(|name| !name.is_empty()),
            parent: u32::try_from(record.parent_id).ok().map(NodeHandle),
        }
    }
}

/// Messages sent by the daemon to the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerCommand {
    /// Load the given model into the mount's iframe
    Init { model_uid: ModelUid },
    /// Begin playback/rendering
    Start,
    /// Subscribe to click events at the given pick fidelity
    WatchClicks { pick: PickMode },
    QueryNodeMap { id: u32 },
    QueryMaterialList { id: u32 },
    Show { node: NodeHandle },
    Hide { node: NodeHandle },
    SetMaterial { material: MaterialState },
}

/// Messages sent by the bridge to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// Viewer finished loading and accepts queries
    Ready,
    /// Provider reported an embed/initialization failure
    InitFailed {
        #[serde(default)]
        message: String,
    },
    /// User clicked the viewer region
    Click {
        #[serde(default)]
        node: Option<u32>,
        #[serde(default)]
        position: Option<[f64; 2]>,
    },
    /// Reply to `QueryNodeMap`
    NodeMap { id: u32, nodes: Vec<NodeRecord> },
    /// Reply to `QueryMaterialList`
    MaterialList {
        id: u32,
        materials: Vec<MaterialState>,
    },
    /// The query with the given id failed inside the provider client
    Failed {
        id: u32,
        #[serde(default)]
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_record_normalizes_parent_sentinel() {
        let record: NodeRecord =
            serde_json::from_str(r#"{"instanceID": 12, "name": "Maxilla", "parentID": -1}"#)
                .unwrap();
        let node = SceneNode::from(record);
        assert_eq!(node.handle, NodeHandle(12));
        assert_eq!(node.name.as_deref(), Some("Maxilla"));
        assert_eq!(node.parent, None);
    }

    #[test]
    fn test_node_record_defaults_missing_fields() {
        let record: NodeRecord = serde_json::from_str(r#"{"instanceID": 3}"#).unwrap();
        let node = SceneNode::from(record);
        assert_eq!(node.name, None);
        assert_eq!(node.parent, None);
    }

    #[test]
    fn test_blank_name_becomes_absent() {
        let record: NodeRecord =
            serde_json::from_str(r#"{"instanceID": 3, "name": "", "parentID": 1}"#).unwrap();
        let node = SceneNode::from(record);
        assert_eq!(node.name, None);
        assert_eq!(node.parent, Some(NodeHandle(1)));
    }

    #[test]
    fn test_command_wire_shape() {
        let json = serde_json::to_string(&ViewerCommand::Show {
            node: NodeHandle(42),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"show","node":42}"#);

        let json = serde_json::to_string(&ViewerCommand::WatchClicks {
            pick: PickMode::Fast,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"watch_clicks","pick":"fast"}"#);
    }

    #[test]
    fn test_bridge_event_round_trip() {
        let event: BridgeEvent = serde_json::from_str(
            r#"{"type":"node_map","id":7,"nodes":[{"instanceID":1,"name":"Mandible","parentID":-1}]}"#,
        )
        .unwrap();
        match event {
            BridgeEvent::NodeMap { id, nodes } => {
                assert_eq!(id, 7);
                assert_eq!(nodes.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
