use rmw_graph::entity::{NODE_NAME_UNKNOWN, NODE_NAMESPACE_UNKNOWN};
use rmw_graph::gid::{Gid, GID_STORAGE_SIZE};
use rmw_graph::graph::{GraphCache, GraphError};
use rmw_graph::msg::{NodeEntitiesInfo, ParticipantEntitiesInfo};
use rmw_graph::qos::QosProfile;

fn gid(n: u8) -> Gid {
    let mut bytes = [0u8; GID_STORAGE_SIZE];
    bytes[0] = n;
    Gid::from_bytes(bytes)
}

fn identity(s: &str) -> String {
    s.to_string()
}

#[test]
fn test_add_writer_rejects_duplicates() {
    let cache = GraphCache::new();
    assert!(cache.add_writer(gid(1), "/chatter", "std_msgs/String", gid(0), QosProfile::default()));
    assert!(!cache.add_writer(gid(1), "/other", "std_msgs/Bool", gid(0), QosProfile::default()));

    // The duplicate insert did not overwrite the original entry.
    assert_eq!(cache.get_writer_count("/chatter"), 1);
    assert_eq!(cache.get_writer_count("/other"), 0);
}

#[test]
fn test_remove_endpoint_reports_existence() {
    let cache = GraphCache::new();
    cache.add_reader(gid(2), "/chatter", "std_msgs/String", gid(0), QosProfile::default());
    assert!(cache.remove_reader(&gid(2)));
    assert!(!cache.remove_reader(&gid(2)));
    assert!(!cache.remove_writer(&gid(2)));
}

#[test]
fn test_writer_and_reader_maps_are_independent() {
    let cache = GraphCache::new();
    assert!(cache.add_writer(gid(1), "/chatter", "std_msgs/String", gid(0), QosProfile::default()));
    assert!(cache.add_reader(gid(1), "/chatter", "std_msgs/String", gid(0), QosProfile::default()));
    assert_eq!(cache.get_writer_count("/chatter"), 1);
    assert_eq!(cache.get_reader_count("/chatter"), 1);
}

#[test]
fn test_update_participant_entities_replaces_state() {
    let cache = GraphCache::new();
    let participant = gid(10);

    let mut first = NodeEntitiesInfo::new("talker", "/");
    first.writer_gid_seq.push(gid(1));
    cache.update_participant_entities(ParticipantEntitiesInfo::new(participant, vec![first]));
    assert_eq!(cache.get_node_names().0, vec!["talker"]);

    // A later message is a full snapshot, not a delta.
    let second = NodeEntitiesInfo::new("listener", "/");
    cache.update_participant_entities(ParticipantEntitiesInfo::new(participant, vec![second]));
    assert_eq!(cache.get_node_names().0, vec!["listener"]);
}

#[test]
fn test_empty_participant_entities_erases_participant() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.update_participant_entities(ParticipantEntitiesInfo::new(
        participant,
        vec![NodeEntitiesInfo::new("talker", "/")],
    ));
    assert_eq!(cache.get_number_of_nodes().unwrap(), 1);

    cache.update_participant_entities(ParticipantEntitiesInfo::new(participant, vec![]));
    assert_eq!(cache.get_number_of_nodes().unwrap(), 0);
    assert!(!cache.remove_participant(&participant));
}

#[test]
fn test_add_participant_is_idempotent() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.add_participant(participant);
    let msg = cache.add_node(participant, "talker", "/").unwrap();
    assert_eq!(msg.node_entities_info_seq.len(), 1);

    // Registering again must not clear the node list.
    cache.add_participant(participant);
    assert_eq!(cache.get_number_of_nodes().unwrap(), 1);
}

#[test]
fn test_add_node_requires_participant() {
    let cache = GraphCache::new();
    let err = cache.add_node(gid(10), "talker", "/").unwrap_err();
    assert_eq!(err, GraphError::ParticipantNotFound(gid(10)));
}

#[test]
fn test_add_node_returns_snapshot() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.add_participant(participant);
    cache.add_node(participant, "talker", "/").unwrap();
    let msg = cache.add_node(participant, "listener", "/ns").unwrap();

    assert_eq!(msg.gid, participant);
    assert_eq!(msg.node_entities_info_seq.len(), 2);
    assert_eq!(msg.node_entities_info_seq[1].node_name, "listener");
    assert_eq!(msg.node_entities_info_seq[1].node_namespace, "/ns");
}

#[test]
fn test_remove_node_removes_first_match_only() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.add_participant(participant);
    // Duplicate names are accepted; removal peels them off one at a time.
    cache.add_node(participant, "talker", "/").unwrap();
    cache.add_node(participant, "talker", "/").unwrap();

    let msg = cache.remove_node(participant, "talker", "/").unwrap();
    assert_eq!(msg.node_entities_info_seq.len(), 1);
    let msg = cache.remove_node(participant, "talker", "/").unwrap();
    assert!(msg.node_entities_info_seq.is_empty());

    let err = cache.remove_node(participant, "talker", "/").unwrap_err();
    assert_eq!(
        err,
        GraphError::NodeNotFound {
            node_name: "talker".to_string(),
            node_namespace: "/".to_string(),
        }
    );
}

#[test]
fn test_associate_writer_updates_snapshot() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.add_participant(participant);
    cache.add_node(participant, "talker", "/").unwrap();

    let msg = cache.associate_writer(gid(1), participant, "talker", "/").unwrap();
    assert_eq!(msg.node_entities_info_seq[0].writer_gid_seq, vec![gid(1)]);

    let msg = cache.dissociate_writer(gid(1), participant, "talker", "/").unwrap();
    assert!(msg.node_entities_info_seq[0].writer_gid_seq.is_empty());
}

#[test]
fn test_symmetric_add_remove_restores_state() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.add_participant(participant);
    let baseline = cache.get_number_of_nodes().unwrap();

    cache.add_node(participant, "talker", "/").unwrap();
    cache.associate_writer(gid(1), participant, "talker", "/").unwrap();
    cache.associate_reader(gid(2), participant, "talker", "/").unwrap();
    cache.dissociate_writer(gid(1), participant, "talker", "/").unwrap();
    cache.dissociate_reader(gid(2), participant, "talker", "/").unwrap();
    let msg = cache.remove_node(participant, "talker", "/").unwrap();

    assert!(msg.node_entities_info_seq.is_empty());
    assert_eq!(cache.get_number_of_nodes().unwrap(), baseline);
}

#[test]
fn test_dissociate_missing_gid_is_a_no_op() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.add_participant(participant);
    cache.add_node(participant, "talker", "/").unwrap();

    // The node lookup is the hard precondition, not the gid.
    let msg = cache.dissociate_reader(gid(9), participant, "talker", "/").unwrap();
    assert!(msg.node_entities_info_seq[0].reader_gid_seq.is_empty());

    let err = cache
        .associate_reader(gid(9), participant, "listener", "/")
        .unwrap_err();
    assert!(matches!(err, GraphError::NodeNotFound { .. }));
}

#[test]
fn test_counts_with_mangling() {
    let cache = GraphCache::new();
    cache.add_writer(gid(1), "rt/chatter", "std_msgs/String", gid(0), QosProfile::default());
    cache.add_reader(gid(2), "rt/chatter", "std_msgs/String", gid(0), QosProfile::default());

    assert_eq!(cache.get_writer_count("rt/chatter"), 1);
    assert_eq!(cache.get_writer_count("/chatter"), 0);
    assert_eq!(cache.get_writer_count_with("/chatter", |name| format!("rt{}", name)), 1);
    assert_eq!(cache.get_reader_count_with("/chatter", |name| format!("rt{}", name)), 1);
}

#[test]
fn test_get_names_and_types_merges_and_hides() {
    let cache = GraphCache::new();
    cache.add_writer(gid(1), "rt/chatter", "std_msgs/String", gid(0), QosProfile::default());
    cache.add_reader(gid(2), "rt/chatter", "std_msgs/Bool", gid(0), QosProfile::default());
    cache.add_writer(gid(3), "internal/topic", "internal/Type", gid(0), QosProfile::default());

    let topics = cache.get_names_and_types(
        |name| name.strip_prefix("rt").map(str::to_string).unwrap_or_default(),
        |ty| ty.replace('/', "::"),
    );

    assert_eq!(topics.len(), 1);
    let types = &topics["/chatter"];
    assert!(types.contains("std_msgs::String"));
    assert!(types.contains("std_msgs::Bool"));
}

#[test]
fn test_names_and_types_by_node() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.add_writer(gid(1), "/chatter", "std_msgs/String", participant, QosProfile::default());
    cache.add_participant(participant);
    cache.add_node(participant, "talker", "/").unwrap();
    cache.associate_writer(gid(1), participant, "talker", "/").unwrap();
    // Gossip may reference gids discovery has not seen yet.
    cache.associate_writer(gid(9), participant, "talker", "/").unwrap();

    let topics = cache
        .get_writer_names_and_types_by_node("talker", "/", identity, identity)
        .unwrap();
    assert_eq!(topics.len(), 1);
    assert!(topics["/chatter"].contains("std_msgs/String"));

    // No readers: empty result, not an error.
    let topics = cache
        .get_reader_names_and_types_by_node("talker", "/", identity, identity)
        .unwrap();
    assert!(topics.is_empty());

    let err = cache
        .get_writer_names_and_types_by_node("nobody", "/", identity, identity)
        .unwrap_err();
    assert!(matches!(err, GraphError::NodeNotFound { .. }));
}

#[test]
fn test_node_names_across_participants() {
    let cache = GraphCache::new();
    cache.update_participant_entities(ParticipantEntitiesInfo::new(
        gid(10),
        vec![NodeEntitiesInfo::new("talker", "/")],
    ));
    cache.update_participant_entities(ParticipantEntitiesInfo::new(
        gid(11),
        vec![
            NodeEntitiesInfo::new("listener", "/ns"),
            NodeEntitiesInfo::new("relay", "/ns"),
        ],
    ));

    assert_eq!(cache.get_number_of_nodes().unwrap(), 3);
    let (names, namespaces) = cache.get_node_names();
    assert_eq!(names.len(), namespaces.len());
    assert_eq!(names, vec!["talker", "listener", "relay"]);
    assert_eq!(namespaces, vec!["/", "/ns", "/ns"]);
}

#[test]
fn test_info_by_topic_resolves_owning_node() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.add_writer(gid(1), "/chatter", "std_msgs/String", participant, QosProfile::default());
    cache.add_participant(participant);
    cache.add_node(participant, "talker", "/ns").unwrap();
    cache.associate_writer(gid(1), participant, "talker", "/ns").unwrap();

    let info = cache.get_writers_info_by_topic("/chatter", identity);
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].node_name, "talker");
    assert_eq!(info[0].node_namespace, "/ns");
    assert_eq!(info[0].endpoint_gid, gid(1));
    assert_eq!(info[0].topic_type, "std_msgs/String");

    assert!(cache.get_readers_info_by_topic("/chatter", identity).is_empty());
}

#[test]
fn test_info_by_topic_uses_sentinels_for_unassociated_endpoints() {
    let cache = GraphCache::new();
    cache.add_reader(gid(2), "/chatter", "std_msgs/String", gid(10), QosProfile::default());

    let info = cache.get_readers_info_by_topic("/chatter", identity);
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].node_name, NODE_NAME_UNKNOWN);
    assert_eq!(info[0].node_namespace, NODE_NAMESPACE_UNKNOWN);
}

#[test]
fn test_display_renders_full_cache() {
    let cache = GraphCache::new();
    let participant = gid(10);
    cache.add_writer(gid(1), "/chatter", "std_msgs/String", participant, QosProfile::default());
    cache.add_participant(participant);
    cache.add_node(participant, "talker", "/").unwrap();
    cache.associate_writer(gid(1), participant, "talker", "/").unwrap();

    let rendered = cache.to_string();
    assert!(rendered.contains("Graph cache:"));
    assert!(rendered.contains("/chatter"));
    assert!(rendered.contains("name: 'talker'"));
    assert!(rendered.contains(&gid(1).to_string()));
}
