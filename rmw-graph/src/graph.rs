use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use crate::entity::{
    EndpointInfo, EndpointKind, EntityInfo, NODE_NAME_UNKNOWN, NODE_NAMESPACE_UNKNOWN,
};
use crate::gid::Gid;
use crate::msg::{NodeEntitiesInfo, ParticipantEntitiesInfo};
use crate::qos::QosProfile;

/// Topic name to the set of type names discovered for it.
pub type NamesAndTypes = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A local-construction operation referenced a participant gid that
    /// was never registered. The caller is responsible for sequencing
    /// `add_participant` before node and endpoint operations.
    ParticipantNotFound(Gid),
    /// No node with the given name and namespace exists under the
    /// referenced participant.
    NodeNotFound {
        node_name: String,
        node_namespace: String,
    },
    /// The node count does not fit in a usize.
    CountOverflow,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParticipantNotFound(gid) => {
                write!(f, "participant '{}' is not in the graph cache", gid)
            }
            Self::NodeNotFound {
                node_name,
                node_namespace,
            } => write!(
                f,
                "node '{}' in namespace '{}' is not in the graph cache",
                node_name, node_namespace
            ),
            Self::CountOverflow => write!(f, "node count overflowed"),
        }
    }
}

impl std::error::Error for GraphError {}

#[derive(Debug, Default)]
struct GraphCacheData {
    data_writers: BTreeMap<Gid, EntityInfo>,
    data_readers: BTreeMap<Gid, EntityInfo>,
    participants: BTreeMap<Gid, Vec<NodeEntitiesInfo>>,
}

impl GraphCacheData {
    fn add_endpoint(
        entities: &mut BTreeMap<Gid, EntityInfo>,
        gid: Gid,
        info: EntityInfo,
    ) -> bool {
        use std::collections::btree_map::Entry;
        match entities.entry(gid) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(info);
                true
            }
        }
    }

    fn nodes_of(&mut self, participant_gid: Gid) -> Result<&mut Vec<NodeEntitiesInfo>, GraphError> {
        self.participants
            .get_mut(&participant_gid)
            .ok_or(GraphError::ParticipantNotFound(participant_gid))
    }

    fn modify_node_info<F>(
        &mut self,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
        do_sth: F,
    ) -> Result<ParticipantEntitiesInfo, GraphError>
    where
        F: FnOnce(&mut NodeEntitiesInfo),
    {
        let nodes = self.nodes_of(participant_gid)?;
        // Duplicate (namespace, name) pairs are allowed; the first match wins.
        let node = nodes
            .iter_mut()
            .find(|node| node.node_name == node_name && node.node_namespace == node_namespace)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_name: node_name.to_string(),
                node_namespace: node_namespace.to_string(),
            })?;
        do_sth(node);
        Ok(ParticipantEntitiesInfo::new(participant_gid, nodes.clone()))
    }

    /// Resolves the node owning an endpoint gid, scanning every
    /// participant's node list. Sentinels are returned when no node
    /// references the gid, which can happen transiently while discovery
    /// and gossip race each other.
    fn endpoint_node(&self, gid: &Gid, kind: EndpointKind) -> (String, String) {
        for nodes in self.participants.values() {
            for node in nodes {
                let gid_seq = match kind {
                    EndpointKind::Publisher => &node.writer_gid_seq,
                    EndpointKind::Subscription => &node.reader_gid_seq,
                };
                if gid_seq.contains(gid) {
                    return (node.node_name.clone(), node.node_namespace.clone());
                }
            }
        }
        (
            NODE_NAME_UNKNOWN.to_string(),
            NODE_NAMESPACE_UNKNOWN.to_string(),
        )
    }

    fn endpoint_info_by_topic(
        &self,
        entities: &BTreeMap<Gid, EntityInfo>,
        topic_name: &str,
        kind: EndpointKind,
        demangle_type: &impl Fn(&str) -> String,
    ) -> Vec<EndpointInfo> {
        entities
            .iter()
            .filter(|(_, info)| info.topic_name == topic_name)
            .map(|(gid, info)| {
                let (node_name, node_namespace) = self.endpoint_node(gid, kind);
                EndpointInfo {
                    node_name,
                    node_namespace,
                    topic_type: demangle_type(&info.topic_type),
                    endpoint_kind: kind,
                    endpoint_gid: *gid,
                    qos_profile: info.qos,
                }
            })
            .collect()
    }
}

fn collect_names_and_types(
    entities: &BTreeMap<Gid, EntityInfo>,
    demangle_topic: &impl Fn(&str) -> String,
    demangle_type: &impl Fn(&str) -> String,
    topics: &mut NamesAndTypes,
) {
    for info in entities.values() {
        let demangled_topic_name = demangle_topic(&info.topic_name);
        // An empty demangled name marks a transport-internal topic that
        // must stay hidden from introspection.
        if demangled_topic_name.is_empty() {
            continue;
        }
        topics
            .entry(demangled_topic_name)
            .or_default()
            .insert(demangle_type(&info.topic_type));
    }
}

fn names_and_types_from_gids(
    entities: &BTreeMap<Gid, EntityInfo>,
    gids: &[Gid],
    demangle_topic: &impl Fn(&str) -> String,
    demangle_type: &impl Fn(&str) -> String,
) -> NamesAndTypes {
    let mut topics = NamesAndTypes::new();
    for gid in gids {
        // Gids advertised through gossip may not have been discovered at
        // the transport level yet; skip the ones we cannot resolve.
        let Some(info) = entities.get(gid) else {
            continue;
        };
        let demangled_topic_name = demangle_topic(&info.topic_name);
        if demangled_topic_name.is_empty() {
            continue;
        }
        topics
            .entry(demangled_topic_name)
            .or_default()
            .insert(demangle_type(&info.topic_type));
    }
    topics
}

fn find_node<'a>(
    participants: &'a BTreeMap<Gid, Vec<NodeEntitiesInfo>>,
    node_name: &str,
    node_namespace: &str,
) -> Option<&'a NodeEntitiesInfo> {
    participants.values().flatten().find(|node| {
        node.node_name == node_name && node.node_namespace == node_namespace
    })
}

/// Eventually-consistent view of every participant, node, data writer and
/// data reader discovered in the system.
///
/// The cache is fed from two independent paths: transport-level discovery
/// events maintain the writer/reader maps, and participant gossip
/// messages maintain the node associations. The two views may transiently
/// disagree; queries degrade gracefully instead of failing when a gid
/// cannot be resolved across them.
///
/// Every public operation locks one internal mutex for its full duration,
/// so operations on one instance are strictly serialized. No caller
/// callback is ever invoked while the lock is held.
#[derive(Debug, Default)]
pub struct GraphCache {
    data: Mutex<GraphCacheData>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- DDS discovery API -------------------------------------------------
    //
    // These operations track transport-level existence only. They never
    // touch the participant map and never produce a gossip message.

    /// Records a newly discovered data writer. Returns false if the gid
    /// was already known, leaving the stored info untouched.
    pub fn add_writer(
        &self,
        gid: Gid,
        topic_name: impl Into<String>,
        topic_type: impl Into<String>,
        participant_gid: Gid,
        qos: QosProfile,
    ) -> bool {
        let mut data = self.data.lock();
        GraphCacheData::add_endpoint(
            &mut data.data_writers,
            gid,
            EntityInfo::new(topic_name, topic_type, participant_gid, qos),
        )
    }

    /// Records a newly discovered data reader. Returns false on duplicates.
    pub fn add_reader(
        &self,
        gid: Gid,
        topic_name: impl Into<String>,
        topic_type: impl Into<String>,
        participant_gid: Gid,
        qos: QosProfile,
    ) -> bool {
        let mut data = self.data.lock();
        GraphCacheData::add_endpoint(
            &mut data.data_readers,
            gid,
            EntityInfo::new(topic_name, topic_type, participant_gid, qos),
        )
    }

    pub fn add_entity(
        &self,
        kind: EndpointKind,
        gid: Gid,
        topic_name: impl Into<String>,
        topic_type: impl Into<String>,
        participant_gid: Gid,
        qos: QosProfile,
    ) -> bool {
        match kind {
            EndpointKind::Publisher => {
                self.add_writer(gid, topic_name, topic_type, participant_gid, qos)
            }
            EndpointKind::Subscription => {
                self.add_reader(gid, topic_name, topic_type, participant_gid, qos)
            }
        }
    }

    /// Returns whether a writer entry existed for the gid.
    pub fn remove_writer(&self, gid: &Gid) -> bool {
        self.data.lock().data_writers.remove(gid).is_some()
    }

    /// Returns whether a reader entry existed for the gid.
    pub fn remove_reader(&self, gid: &Gid) -> bool {
        self.data.lock().data_readers.remove(gid).is_some()
    }

    pub fn remove_entity(&self, kind: EndpointKind, gid: &Gid) -> bool {
        match kind {
            EndpointKind::Publisher => self.remove_writer(gid),
            EndpointKind::Subscription => self.remove_reader(gid),
        }
    }

    // ---- Gossip ingestion --------------------------------------------------

    /// Replaces the cached state of the message's participant wholesale.
    ///
    /// An empty node sequence signals that the participant is shutting
    /// down and erases its entry.
    pub fn update_participant_entities(&self, msg: ParticipantEntitiesInfo) {
        let mut data = self.data.lock();
        if msg.node_entities_info_seq.is_empty() {
            debug!("removing participant '{}' on empty entities info", msg.gid);
            data.participants.remove(&msg.gid);
        } else {
            data.participants.insert(msg.gid, msg.node_entities_info_seq);
        }
    }

    /// Returns whether a participant entry existed for the gid.
    pub fn remove_participant(&self, gid: &Gid) -> bool {
        self.data.lock().participants.remove(gid).is_some()
    }

    // ---- Local construction ------------------------------------------------
    //
    // Operations on the local participant. Each mutation returns a fresh
    // full-state snapshot for the caller to publish; publishing is the
    // coordinator's job, never the cache's.

    /// Registers a participant with an empty node list. A no-op if the
    /// gid is already registered.
    pub fn add_participant(&self, gid: Gid) {
        self.data.lock().participants.entry(gid).or_default();
    }

    /// Appends a node to the participant's list. Duplicate (namespace,
    /// name) pairs are not rejected; later modify operations act on the
    /// first match.
    pub fn add_node(
        &self,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo, GraphError> {
        let mut data = self.data.lock();
        let nodes = data.nodes_of(participant_gid)?;
        nodes.push(NodeEntitiesInfo::new(node_name, node_namespace));
        Ok(ParticipantEntitiesInfo::new(participant_gid, nodes.clone()))
    }

    /// Removes the first node matching (namespace, name) under the
    /// participant. A missing match is a caller sequencing bug, reported
    /// as [`GraphError::NodeNotFound`].
    pub fn remove_node(
        &self,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo, GraphError> {
        let mut data = self.data.lock();
        let nodes = data.nodes_of(participant_gid)?;
        let index = nodes
            .iter()
            .position(|node| node.node_name == node_name && node.node_namespace == node_namespace)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_name: node_name.to_string(),
                node_namespace: node_namespace.to_string(),
            })?;
        nodes.remove(index);
        Ok(ParticipantEntitiesInfo::new(participant_gid, nodes.clone()))
    }

    pub fn associate_writer(
        &self,
        writer_gid: Gid,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo, GraphError> {
        self.data
            .lock()
            .modify_node_info(participant_gid, node_name, node_namespace, |node| {
                node.writer_gid_seq.push(writer_gid);
            })
    }

    /// Removes the first occurrence of the writer gid from the node's
    /// sequence. An absent gid is a no-op; only the node match is a hard
    /// precondition.
    pub fn dissociate_writer(
        &self,
        writer_gid: Gid,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo, GraphError> {
        self.data
            .lock()
            .modify_node_info(participant_gid, node_name, node_namespace, |node| {
                if let Some(index) = node.writer_gid_seq.iter().position(|gid| *gid == writer_gid)
                {
                    node.writer_gid_seq.remove(index);
                }
            })
    }

    pub fn associate_reader(
        &self,
        reader_gid: Gid,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo, GraphError> {
        self.data
            .lock()
            .modify_node_info(participant_gid, node_name, node_namespace, |node| {
                node.reader_gid_seq.push(reader_gid);
            })
    }

    pub fn dissociate_reader(
        &self,
        reader_gid: Gid,
        participant_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<ParticipantEntitiesInfo, GraphError> {
        self.data
            .lock()
            .modify_node_info(participant_gid, node_name, node_namespace, |node| {
                if let Some(index) = node.reader_gid_seq.iter().position(|gid| *gid == reader_gid)
                {
                    node.reader_gid_seq.remove(index);
                }
            })
    }

    // ---- Introspection -----------------------------------------------------

    /// Number of discovered writers whose stored topic name equals the
    /// argument exactly. No demangling is applied.
    pub fn get_writer_count(&self, topic_name: &str) -> usize {
        let data = self.data.lock();
        data.data_writers
            .values()
            .filter(|info| info.topic_name == topic_name)
            .count()
    }

    pub fn get_reader_count(&self, topic_name: &str) -> usize {
        let data = self.data.lock();
        data.data_readers
            .values()
            .filter(|info| info.topic_name == topic_name)
            .count()
    }

    /// Like [`get_writer_count`](Self::get_writer_count), but mangles the
    /// query name first so it can be compared against the stored
    /// transport-level names.
    pub fn get_writer_count_with(
        &self,
        topic_name: &str,
        mangle_topic: impl Fn(&str) -> String,
    ) -> usize {
        self.get_writer_count(&mangle_topic(topic_name))
    }

    pub fn get_reader_count_with(
        &self,
        topic_name: &str,
        mangle_topic: impl Fn(&str) -> String,
    ) -> usize {
        self.get_reader_count(&mangle_topic(topic_name))
    }

    /// Union of topic names and types over all discovered writers and
    /// readers. Entries whose demangled topic name is empty are hidden.
    pub fn get_names_and_types(
        &self,
        demangle_topic: impl Fn(&str) -> String,
        demangle_type: impl Fn(&str) -> String,
    ) -> NamesAndTypes {
        let data = self.data.lock();
        let mut topics = NamesAndTypes::new();
        collect_names_and_types(&data.data_readers, &demangle_topic, &demangle_type, &mut topics);
        collect_names_and_types(&data.data_writers, &demangle_topic, &demangle_type, &mut topics);
        topics
    }

    /// Topics written by the first node matching (namespace, name) across
    /// all participants. Gids that cannot be resolved through the writer
    /// map are skipped. A node with no resolvable writers yields an empty
    /// mapping, distinct from the node-not-found error.
    pub fn get_writer_names_and_types_by_node(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: impl Fn(&str) -> String,
        demangle_type: impl Fn(&str) -> String,
    ) -> Result<NamesAndTypes, GraphError> {
        let data = self.data.lock();
        let node = find_node(&data.participants, node_name, node_namespace).ok_or_else(|| {
            GraphError::NodeNotFound {
                node_name: node_name.to_string(),
                node_namespace: node_namespace.to_string(),
            }
        })?;
        Ok(names_and_types_from_gids(
            &data.data_writers,
            &node.writer_gid_seq,
            &demangle_topic,
            &demangle_type,
        ))
    }

    pub fn get_reader_names_and_types_by_node(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: impl Fn(&str) -> String,
        demangle_type: impl Fn(&str) -> String,
    ) -> Result<NamesAndTypes, GraphError> {
        let data = self.data.lock();
        let node = find_node(&data.participants, node_name, node_namespace).ok_or_else(|| {
            GraphError::NodeNotFound {
                node_name: node_name.to_string(),
                node_namespace: node_namespace.to_string(),
            }
        })?;
        Ok(names_and_types_from_gids(
            &data.data_readers,
            &node.reader_gid_seq,
            &demangle_topic,
            &demangle_type,
        ))
    }

    /// Total node count across all participants, with overflow reported
    /// instead of wrapping.
    pub fn get_number_of_nodes(&self) -> Result<usize, GraphError> {
        let data = self.data.lock();
        let mut count: usize = 0;
        for nodes in data.participants.values() {
            count = count
                .checked_add(nodes.len())
                .ok_or(GraphError::CountOverflow)?;
        }
        Ok(count)
    }

    /// Flattened node names and namespaces across all participants. The
    /// two sequences are index-aligned and always of equal length.
    pub fn get_node_names(&self) -> (Vec<String>, Vec<String>) {
        let data = self.data.lock();
        let mut names = Vec::new();
        let mut namespaces = Vec::new();
        for nodes in data.participants.values() {
            for node in nodes {
                names.push(node.node_name.clone());
                namespaces.push(node.node_namespace.clone());
            }
        }
        (names, namespaces)
    }

    /// Full endpoint metadata of every writer on the topic, resolving the
    /// owning node by reverse lookup through the participant map.
    pub fn get_writers_info_by_topic(
        &self,
        topic_name: &str,
        demangle_type: impl Fn(&str) -> String,
    ) -> Vec<EndpointInfo> {
        let data = self.data.lock();
        data.endpoint_info_by_topic(
            &data.data_writers,
            topic_name,
            EndpointKind::Publisher,
            &demangle_type,
        )
    }

    pub fn get_readers_info_by_topic(
        &self,
        topic_name: &str,
        demangle_type: impl Fn(&str) -> String,
    ) -> Vec<EndpointInfo> {
        let data = self.data.lock();
        data.endpoint_info_by_topic(
            &data.data_readers,
            topic_name,
            EndpointKind::Subscription,
            &demangle_type,
        )
    }
}

impl fmt::Display for GraphCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.lock();
        writeln!(f, "---------------------------------")?;
        writeln!(f, "Graph cache:")?;
        writeln!(f, "  Discovered data writers:")?;
        for (gid, info) in &data.data_writers {
            writeln!(
                f,
                "    gid: '{}', topic name: '{}', topic_type: '{}'",
                gid, info.topic_name, info.topic_type
            )?;
        }
        writeln!(f, "  Discovered data readers:")?;
        for (gid, info) in &data.data_readers {
            writeln!(
                f,
                "    gid: '{}', topic name: '{}', topic_type: '{}'",
                gid, info.topic_name, info.topic_type
            )?;
        }
        writeln!(f, "  Discovered participants:")?;
        for (gid, nodes) in &data.participants {
            writeln!(f, "    gid: '{}'", gid)?;
            writeln!(f, "    nodes:")?;
            for node in nodes {
                writeln!(
                    f,
                    "      namespace: '{}' name: '{}'",
                    node.node_namespace, node.node_name
                )?;
                writeln!(f, "      associated data readers gids:")?;
                for gid in &node.reader_gid_seq {
                    writeln!(f, "        {}", gid)?;
                }
                writeln!(f, "      associated data writers gids:")?;
                for gid in &node.writer_gid_seq {
                    writeln!(f, "        {}", gid)?;
                }
            }
        }
        writeln!(f, "---------------------------------")
    }
}
