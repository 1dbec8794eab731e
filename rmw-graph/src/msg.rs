use serde::{Deserialize, Serialize};

use crate::gid::Gid;

/// Descriptor of one logical node: its name, namespace, and the gids of
/// the data writers and data readers associated with it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntitiesInfo {
    pub node_name: String,
    pub node_namespace: String,
    pub writer_gid_seq: Vec<Gid>,
    pub reader_gid_seq: Vec<Gid>,
}

impl NodeEntitiesInfo {
    pub fn new(node_name: impl Into<String>, node_namespace: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            node_namespace: node_namespace.into(),
            ..Default::default()
        }
    }
}

/// The gossip message a participant publishes to announce its complete
/// node/entity state. Always a full snapshot, never a delta: receivers
/// replace their cached copy of the participant wholesale.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEntitiesInfo {
    pub gid: Gid,
    pub node_entities_info_seq: Vec<NodeEntitiesInfo>,
}

impl ParticipantEntitiesInfo {
    pub fn new(gid: Gid, node_entities_info_seq: Vec<NodeEntitiesInfo>) -> Self {
        Self {
            gid,
            node_entities_info_seq,
        }
    }
}
