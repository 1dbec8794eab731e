use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::gid::Gid;
use crate::graph::{GraphCache, GraphError};
use crate::msg::ParticipantEntitiesInfo;

/// Sink for the participant's gossip snapshots. Implemented by whatever
/// transport-level writer carries the discovery topic.
///
/// Implemented for closures too, so a test or a thin integration can pass
/// `|msg| { ... }` directly.
pub trait EntitiesInfoPublisher: Send + Sync {
    fn publish(&self, msg: &ParticipantEntitiesInfo) -> crate::Result<()>;
}

impl<F> EntitiesInfoPublisher for F
where
    F: Fn(&ParticipantEntitiesInfo) -> crate::Result<()> + Send + Sync,
{
    fn publish(&self, msg: &ParticipantEntitiesInfo) -> crate::Result<()> {
        self(msg)
    }
}

#[derive(Debug)]
pub enum ContextError {
    Graph(GraphError),
    /// The graph mutation succeeded but the snapshot could not be
    /// published; the mutation has been rolled back.
    PublishFailed(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(err) => write!(f, "{}", err),
            Self::PublishFailed(reason) => {
                write!(f, "failed to publish participant entities info: {}", reason)
            }
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Graph(err) => Some(err),
            Self::PublishFailed(_) => None,
        }
    }
}

impl From<GraphError> for ContextError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}

/// Per-participant coordinator tying graph mutations to gossip
/// publication.
///
/// Every operation follows the same protocol: mutate the cache, publish
/// the resulting snapshot, and roll the mutation back if publication
/// fails, so the published stream and the local cache never diverge.
/// Node-level sequencing is serialized on an internal mutex; the graph
/// cache lock is never held across a publish call.
pub struct Context {
    gid: Gid,
    graph_cache: Arc<GraphCache>,
    publisher: Option<Arc<dyn EntitiesInfoPublisher>>,
    node_update_mutex: Mutex<()>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("gid", &self.gid)
            .field("graph_cache", &self.graph_cache)
            .field("has_publisher", &self.publisher.is_some())
            .finish()
    }
}

impl Context {
    /// A context without a publisher; every graph update operation will
    /// fail and roll back. Useful before the discovery writer exists.
    pub fn new(gid: Gid, graph_cache: Arc<GraphCache>) -> Self {
        graph_cache.add_participant(gid);
        Self {
            gid,
            graph_cache,
            publisher: None,
            node_update_mutex: Mutex::new(()),
        }
    }

    pub fn with_publisher(
        gid: Gid,
        graph_cache: Arc<GraphCache>,
        publisher: Arc<dyn EntitiesInfoPublisher>,
    ) -> Self {
        graph_cache.add_participant(gid);
        Self {
            gid,
            graph_cache,
            publisher: Some(publisher),
            node_update_mutex: Mutex::new(()),
        }
    }

    pub fn gid(&self) -> Gid {
        self.gid
    }

    pub fn graph_cache(&self) -> &Arc<GraphCache> {
        &self.graph_cache
    }

    fn publish(&self, msg: &ParticipantEntitiesInfo) -> Result<(), ContextError> {
        let publisher = self
            .publisher
            .as_ref()
            .ok_or_else(|| ContextError::PublishFailed("no publisher attached".to_string()))?;
        publisher
            .publish(msg)
            .map_err(|err| ContextError::PublishFailed(err.to_string()))
    }

    /// Publishes the snapshot, undoing the already-applied mutation on
    /// failure. Rollback failures are logged and swallowed; the publish
    /// error is the one the caller needs.
    fn publish_or_rollback(
        &self,
        msg: &ParticipantEntitiesInfo,
        rollback: impl FnOnce() -> Result<ParticipantEntitiesInfo, GraphError>,
    ) -> Result<(), ContextError> {
        let Err(publish_err) = self.publish(msg) else {
            return Ok(());
        };
        if let Err(rollback_err) = rollback() {
            error!(
                "failed to roll back graph update after publish error: {}",
                rollback_err
            );
        }
        Err(publish_err)
    }

    /// Registers a node under this participant and announces it.
    pub fn update_node_graph(
        &self,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        let msg = self.graph_cache.add_node(self.gid, node_name, node_namespace)?;
        self.publish_or_rollback(&msg, || {
            self.graph_cache.remove_node(self.gid, node_name, node_namespace)
        })
    }

    /// Removes a node and announces the removal. No rollback: readding a
    /// node whose endpoints are already being torn down would leave the
    /// graph in a worse state than a missed announcement.
    pub fn destroy_node_graph(
        &self,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        let msg = self.graph_cache.remove_node(self.gid, node_name, node_namespace)?;
        self.publish(&msg)
    }

    pub fn update_publisher_graph(
        &self,
        writer_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        let msg =
            self.graph_cache
                .associate_writer(writer_gid, self.gid, node_name, node_namespace)?;
        self.publish_or_rollback(&msg, || {
            self.graph_cache
                .dissociate_writer(writer_gid, self.gid, node_name, node_namespace)
        })
    }

    pub fn destroy_publisher_graph(
        &self,
        writer_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        let msg =
            self.graph_cache
                .dissociate_writer(writer_gid, self.gid, node_name, node_namespace)?;
        self.publish(&msg)
    }

    pub fn update_subscriber_graph(
        &self,
        reader_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        let msg =
            self.graph_cache
                .associate_reader(reader_gid, self.gid, node_name, node_namespace)?;
        self.publish_or_rollback(&msg, || {
            self.graph_cache
                .dissociate_reader(reader_gid, self.gid, node_name, node_namespace)
        })
    }

    pub fn destroy_subscriber_graph(
        &self,
        reader_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        let msg =
            self.graph_cache
                .dissociate_reader(reader_gid, self.gid, node_name, node_namespace)?;
        self.publish(&msg)
    }

    /// Registers a service client's request writer and response reader in
    /// one announcement. On publish failure both associations are undone
    /// in reverse order.
    pub fn update_client_graph(
        &self,
        request_writer_gid: Gid,
        response_reader_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        self.graph_cache.associate_writer(
            request_writer_gid,
            self.gid,
            node_name,
            node_namespace,
        )?;
        let msg = match self.graph_cache.associate_reader(
            response_reader_gid,
            self.gid,
            node_name,
            node_namespace,
        ) {
            Ok(msg) => msg,
            Err(err) => {
                if let Err(rollback_err) = self.graph_cache.dissociate_writer(
                    request_writer_gid,
                    self.gid,
                    node_name,
                    node_namespace,
                ) {
                    error!(
                        "failed to roll back writer association: {}",
                        rollback_err
                    );
                }
                return Err(err.into());
            }
        };
        self.publish_or_rollback(&msg, || {
            self.graph_cache.dissociate_reader(
                response_reader_gid,
                self.gid,
                node_name,
                node_namespace,
            )?;
            self.graph_cache.dissociate_writer(
                request_writer_gid,
                self.gid,
                node_name,
                node_namespace,
            )
        })
    }

    pub fn destroy_client_graph(
        &self,
        request_writer_gid: Gid,
        response_reader_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        self.graph_cache.dissociate_writer(
            request_writer_gid,
            self.gid,
            node_name,
            node_namespace,
        )?;
        let msg = self.graph_cache.dissociate_reader(
            response_reader_gid,
            self.gid,
            node_name,
            node_namespace,
        )?;
        self.publish(&msg)
    }

    /// Registers a service server's request reader and response writer in
    /// one announcement, mirroring [`update_client_graph`](Self::update_client_graph).
    pub fn update_service_graph(
        &self,
        request_reader_gid: Gid,
        response_writer_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        self.graph_cache.associate_reader(
            request_reader_gid,
            self.gid,
            node_name,
            node_namespace,
        )?;
        let msg = match self.graph_cache.associate_writer(
            response_writer_gid,
            self.gid,
            node_name,
            node_namespace,
        ) {
            Ok(msg) => msg,
            Err(err) => {
                if let Err(rollback_err) = self.graph_cache.dissociate_reader(
                    request_reader_gid,
                    self.gid,
                    node_name,
                    node_namespace,
                ) {
                    error!(
                        "failed to roll back reader association: {}",
                        rollback_err
                    );
                }
                return Err(err.into());
            }
        };
        self.publish_or_rollback(&msg, || {
            self.graph_cache.dissociate_writer(
                response_writer_gid,
                self.gid,
                node_name,
                node_namespace,
            )?;
            self.graph_cache.dissociate_reader(
                request_reader_gid,
                self.gid,
                node_name,
                node_namespace,
            )
        })
    }

    pub fn destroy_service_graph(
        &self,
        request_reader_gid: Gid,
        response_writer_gid: Gid,
        node_name: &str,
        node_namespace: &str,
    ) -> Result<(), ContextError> {
        let _guard = self.node_update_mutex.lock();
        self.graph_cache.dissociate_reader(
            request_reader_gid,
            self.gid,
            node_name,
            node_namespace,
        )?;
        let msg = self.graph_cache.dissociate_writer(
            response_writer_gid,
            self.gid,
            node_name,
            node_namespace,
        )?;
        self.publish(&msg)
    }
}
