//! Daemon-side session over an established bridge connection
//!
//! A `ViewerSession` is the controller's handle to one embedded viewer. It
//! pairs with a `BridgeLink` that the transport (the daemon's WebSocket
//! handler, or a plain channel in tests) pumps messages through. Queries are
//! correlated to replies by sequence number and bounded by a timeout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use vitrine_core::{MaterialState, ModelUid, NodeHandle, SceneNode};

use crate::protocol::{BridgeEvent, PickMode, ViewerCommand};

/// Default bound on one bridge query
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 64;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("bridge connection closed")]
    Closed,
    #[error("query {0} timed out")]
    Timeout(u32),
    #[error("viewer rejected query {id}: {message}")]
    Rejected { id: u32, message: String },
    #[error("reply to query {0} had the wrong payload")]
    UnexpectedReply(u32),
}

/// Events the exhibit controller consumes
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// Viewer finished loading and accepts queries
    Ready,
    /// Provider reported an embed/initialization failure
    InitFailed { message: String },
    /// User clicked the viewer region
    Click { node: Option<NodeHandle> },
    /// The bridge transport went away
    Closed,
}

#[derive(Debug)]
enum Reply {
    NodeMap(Vec<SceneNode>),
    MaterialList(Vec<MaterialState>),
    Failed(String),
}

struct Shared {
    pending: Mutex<HashMap<u32, oneshot::Sender<Reply>>>,
    seq: AtomicU32,
}

/// Daemon-side handle to one embedded viewer
pub struct ViewerSession {
    commands: mpsc::Sender<ViewerCommand>,
    events: mpsc::Receiver<ViewerEvent>,
    shared: Arc<Shared>,
    query_timeout: Duration,
}

/// Transport-facing half of a session
///
/// The transport forwards everything read from `commands` to the bridge and
/// calls [`BridgeLink::deliver`] for every decoded inbound message.
pub struct BridgeLink {
    /// Commands for the transport to forward to the bridge
    pub commands: mpsc::Receiver<ViewerCommand>,
    events: mpsc::Sender<ViewerEvent>,
    shared: Arc<Shared>,
}

impl ViewerSession {
    /// Create a session and its transport half
    pub fn pair(query_timeout: Duration) -> (ViewerSession, BridgeLink) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            seq: AtomicU32::new(0),
        });

        let session = ViewerSession {
            commands: command_tx,
            events: event_rx,
            shared: shared.clone(),
            query_timeout,
        };
        let link = BridgeLink {
            commands: command_rx,
            events: event_tx,
            shared,
        };
        (session, link)
    }

    /// Load the given model into the viewer
    pub async fn init(&self, model_uid: ModelUid) -> Result<(), SessionError> {
        self.send(ViewerCommand::Init { model_uid }).await
    }

    /// Begin playback/rendering
    pub async fn start(&self) -> Result<(), SessionError> {
        self.send(ViewerCommand::Start).await
    }

    /// Subscribe to click events
    pub async fn watch_clicks(&self, pick: PickMode) -> Result<(), SessionError> {
        self.send(ViewerCommand::WatchClicks { pick }).await
    }

    pub async fn show(&self, node: NodeHandle) -> Result<(), SessionError> {
        self.send(ViewerCommand::Show { node }).await
    }

    pub async fn hide(&self, node: NodeHandle) -> Result<(), SessionError> {
        self.send(ViewerCommand::Hide { node }).await
    }

    pub async fn set_material(&self, material: &MaterialState) -> Result<(), SessionError> {
        self.send(ViewerCommand::SetMaterial {
            material: material.clone(),
        })
        .await
    }

    /// Fetch the current node map; at most one in-flight query per id
    pub async fn node_map(&self) -> Result<Vec<SceneNode>, SessionError> {
        let id = self.next_id();
        match self.query(ViewerCommand::QueryNodeMap { id }, id).await? {
            Reply::NodeMap(nodes) => Ok(nodes),
            Reply::Failed(message) => Err(SessionError::Rejected { id, message }),
            _ => Err(SessionError::UnexpectedReply(id)),
        }
    }

    /// Fetch the viewer's material list
    pub async fn material_list(&self) -> Result<Vec<MaterialState>, SessionError> {
        let id = self.next_id();
        match self
            .query(ViewerCommand::QueryMaterialList { id }, id)
            .await?
        {
            Reply::MaterialList(materials) => Ok(materials),
            Reply::Failed(message) => Err(SessionError::Rejected { id, message }),
            _ => Err(SessionError::UnexpectedReply(id)),
        }
    }

    /// Next viewer event; `Closed` once the transport is gone
    pub async fn next_event(&mut self) -> ViewerEvent {
        self.events.recv().await.unwrap_or(ViewerEvent::Closed)
    }

    fn next_id(&self) -> u32 {
        self.shared.seq.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, command: ViewerCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    async fn query(&self, command: ViewerCommand, id: u32) -> Result<Reply, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().await.insert(id, tx);

        if let Err(e) = self.send(command).await {
            self.shared.pending.lock().await.remove(&id);
            return Err(e);
        }

        match timeout(self.query_timeout, rx).await {
            Ok(Ok(reply)) => {
                trace!(id, ?reply, "query resolved");
                Ok(reply)
            }
            // Router dropped the sender: transport is gone
            Ok(Err(_)) => Err(SessionError::Closed),
            Err(_) => {
                self.shared.pending.lock().await.remove(&id);
                Err(SessionError::Timeout(id))
            }
        }
    }
}

impl BridgeLink {
    /// Route one decoded bridge message
    pub async fn deliver(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::Ready => self.forward(ViewerEvent::Ready).await,
            BridgeEvent::InitFailed { message } => {
                self.forward(ViewerEvent::InitFailed { message }).await
            }
            BridgeEvent::Click { node, position } => {
                trace!(?node, ?position, "viewer click");
                self.forward(ViewerEvent::Click {
                    node: node.map(NodeHandle),
                })
                .await
            }
            BridgeEvent::NodeMap { id, nodes } => {
                let nodes = nodes.into_iter().map(SceneNode::from).collect();
                self.reply(id, Reply::NodeMap(nodes)).await
            }
            BridgeEvent::MaterialList { id, materials } => {
                self.reply(id, Reply::MaterialList(materials)).await
            }
            BridgeEvent::Failed { id, message } => self.reply(id, Reply::Failed(message)).await,
        }
    }

    /// Tell the session the transport is gone
    pub async fn close(&self) {
        let _ = self.events.send(ViewerEvent::Closed).await;
    }

    async fn reply(&self, id: u32, reply: Reply) {
        match self.shared.pending.lock().await.remove(&id) {
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => warn!(id, "reply for unknown or expired query"),
        }
    }

    async fn forward(&self, event: ViewerEvent) {
        if self.events.send(event).await.is_err() {
            debug!("session dropped, event discarded");
        }
    }
}
