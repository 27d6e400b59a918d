//! Exhibit controller
//!
//! Drives one embedded viewer through its lifecycle: wait for the ready
//! signal, resolve the exhibit's target nodes once, then cycle visibility on
//! every click. Setup failures leave the exhibit permanently inert for the
//! session; there are no retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use vitrine_core::{
    resolve_nodes, CycleMode, Exhibit, ExhibitPhase, ExhibitStatus, FadePlan, MaterialState,
    NodeHandle, Resolution, SessionId, VisibilityState,
};

use crate::protocol::PickMode;
use crate::session::{SessionError, ViewerEvent, ViewerSession};

/// Opacity fade behavior for the translucent stage
#[derive(Debug, Clone)]
pub struct FadeSettings {
    /// When false the exhibit cycles show/hide only
    pub enabled: bool,
    pub steps: u32,
    pub duration: Duration,
    /// Opacity factor of the translucent stage
    pub translucent_opacity: f64,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            steps: 30,
            duration: Duration::from_millis(600),
            translucent_opacity: 0.03,
        }
    }
}

/// Controller tuning shared by all exhibits
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub pick: PickMode,
    /// Bound on waiting for the viewer's ready signal
    pub ready_timeout: Duration,
    pub fade: FadeSettings,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            pick: PickMode::Fast,
            ready_timeout: Duration::from_secs(30),
            fade: FadeSettings::default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("viewer initialization failed: {0}")]
    InitFailed(String),
    #[error("viewer not ready after {0:?}")]
    ReadyTimeout(Duration),
    #[error("node map unavailable: {0}")]
    NodeMapUnavailable(#[source] SessionError),
    #[error("viewer returned an empty node map")]
    EmptyScene,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Drives one exhibit over one bridge connection
pub struct ExhibitController {
    exhibit: Arc<Exhibit>,
    settings: ControllerSettings,
    session: ViewerSession,
    status: watch::Sender<ExhibitStatus>,
    session_id: SessionId,
    state: VisibilityState,
    cycle: CycleMode,
    nodes: Vec<NodeHandle>,
    materials: Vec<MaterialState>,
    clicks: u64,
    connected_at: DateTime<Utc>,
    last_click: Option<DateTime<Utc>>,
}

impl ExhibitController {
    pub fn new(
        exhibit: Arc<Exhibit>,
        settings: ControllerSettings,
        session: ViewerSession,
        status: watch::Sender<ExhibitStatus>,
        session_id: SessionId,
    ) -> Self {
        Self {
            exhibit,
            settings,
            session,
            status,
            session_id,
            state: VisibilityState::default(),
            cycle: CycleMode::ShowHide,
            nodes: Vec::new(),
            materials: Vec::new(),
            clicks: 0,
            connected_at: Utc::now(),
            last_click: None,
        }
    }

    /// Run the exhibit until the bridge disconnects
    ///
    /// Returns `Ok(())` on a normal disconnect and an error when setup
    /// failed and the exhibit went inert.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        if let Err(e) = self.setup().await {
            self.publish(ExhibitPhase::Inert {
                reason: e.to_string(),
            });
            return Err(e);
        }

        match self.drive().await {
            // Disconnect mid-command reads the same as a clean close
            Err(ControllerError::Session(SessionError::Closed)) | Ok(()) => {
                info!(mount = %self.exhibit.mount, "bridge disconnected");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn setup(&mut self) -> Result<(), ControllerError> {
        self.publish(ExhibitPhase::Initializing);
        info!(
            mount = %self.exhibit.mount,
            model = %self.exhibit.model_uid,
            label = %self.exhibit.label,
            "initializing embedded viewer"
        );

        self.session.init(self.exhibit.model_uid.clone()).await?;
        self.wait_ready().await?;
        self.session.start().await?;

        let nodes = match self.session.node_map().await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!(mount = %self.exhibit.mount, error = %e, "node map fetch failed");
                return Err(ControllerError::NodeMapUnavailable(e));
            }
        };

        match resolve_nodes(&nodes, &self.exhibit.targets) {
            Resolution::Matched { handles, missing } => {
                if !missing.is_empty() {
                    warn!(
                        mount = %self.exhibit.mount,
                        missing = ?missing,
                        "some target nodes were not found"
                    );
                }
                debug!(
                    mount = %self.exhibit.mount,
                    count = handles.len(),
                    "resolved target nodes"
                );
                self.nodes = handles;
            }
            Resolution::Fallback { handle, root_like } => {
                warn!(
                    mount = %self.exhibit.mount,
                    targets = ?self.exhibit.targets,
                    fallback = %handle,
                    root_like,
                    "no target node matched, controlling fallback node"
                );
                self.nodes = vec![handle];
            }
            Resolution::Empty => {
                error!(mount = %self.exhibit.mount, "viewer returned an empty node map");
                return Err(ControllerError::EmptyScene);
            }
        }

        self.cycle = self.pick_cycle().await;
        self.session.watch_clicks(self.settings.pick).await?;
        self.publish(ExhibitPhase::Active);
        info!(
            mount = %self.exhibit.mount,
            nodes = self.nodes.len(),
            cycle = ?self.cycle,
            "exhibit armed"
        );
        Ok(())
    }

    async fn wait_ready(&mut self) -> Result<(), ControllerError> {
        let deadline = Instant::now() + self.settings.ready_timeout;
        loop {
            let event = tokio::select! {
                event = self.session.next_event() => event,
                _ = sleep_until(deadline) => {
                    error!(
                        mount = %self.exhibit.mount,
                        timeout = ?self.settings.ready_timeout,
                        "viewer never became ready"
                    );
                    return Err(ControllerError::ReadyTimeout(self.settings.ready_timeout));
                }
            };
            match event {
                ViewerEvent::Ready => return Ok(()),
                ViewerEvent::InitFailed { message } => {
                    error!(
                        mount = %self.exhibit.mount,
                        error = %message,
                        "viewer initialization failed"
                    );
                    return Err(ControllerError::InitFailed(message));
                }
                ViewerEvent::Closed => return Err(SessionError::Closed.into()),
                // Clicks before ready have no armed handler
                other => debug!(?other, "event before ready ignored"),
            }
        }
    }

    /// Three-stage cycle needs the material list; degrade to show/hide when
    /// it cannot be fetched or nothing matches the configured names.
    async fn pick_cycle(&mut self) -> CycleMode {
        if !self.settings.fade.enabled {
            return CycleMode::ShowHide;
        }

        let materials = match self.session.material_list().await {
            Ok(materials) => materials,
            Err(e) => {
                warn!(
                    mount = %self.exhibit.mount,
                    error = %e,
                    "material list unavailable, translucent stage disabled"
                );
                return CycleMode::ShowHide;
            }
        };

        let wanted = &self.exhibit.fade_materials;
        self.materials = if wanted.is_empty() {
            materials
        } else {
            materials
                .into_iter()
                .filter(|m| wanted.iter().any(|w| w == &m.name))
                .collect()
        };

        if self.materials.is_empty() {
            warn!(
                mount = %self.exhibit.mount,
                "no controllable materials, translucent stage disabled"
            );
            return CycleMode::ShowHide;
        }
        CycleMode::ShowFadeHide
    }

    async fn drive(&mut self) -> Result<(), ControllerError> {
        let mut carried: Option<ViewerEvent> = None;
        loop {
            let event = match carried.take() {
                Some(event) => event,
                None => self.session.next_event().await,
            };
            match event {
                ViewerEvent::Click { node } => {
                    self.state = self.state.next(self.cycle);
                    self.clicks += 1;
                    self.last_click = Some(Utc::now());
                    debug!(
                        mount = %self.exhibit.mount,
                        ?node,
                        state = ?self.state,
                        "click advanced visibility state"
                    );
                    self.publish(ExhibitPhase::Active);
                    carried = self.apply_state().await?;
                }
                ViewerEvent::Closed => return Ok(()),
                other => debug!(mount = %self.exhibit.mount, ?other, "ignoring event"),
            }
        }
    }

    /// Apply the current state's effect; hands back a click that interrupted
    /// a fade so the event loop can process it next.
    async fn apply_state(&mut self) -> Result<Option<ViewerEvent>, ControllerError> {
        match self.state {
            VisibilityState::Shown => {
                for node in &self.nodes {
                    self.session.show(*node).await?;
                }
                if self.cycle == CycleMode::ShowFadeHide {
                    return self.fade_to(1.0, false).await;
                }
                Ok(None)
            }
            VisibilityState::Translucent => {
                // Nodes stay shown; only the materials thin out
                self.fade_to(self.settings.fade.translucent_opacity, true)
                    .await
            }
            VisibilityState::Hidden => {
                for node in &self.nodes {
                    self.session.hide(*node).await?;
                }
                Ok(None)
            }
        }
    }

    /// Fade every controlled material to `target`. A click arriving mid-fade
    /// cancels the remaining steps: the target factor is applied at once and
    /// the click is handed back to the caller.
    async fn fade_to(
        &mut self,
        target: f64,
        blending: bool,
    ) -> Result<Option<ViewerEvent>, ControllerError> {
        if self.materials.is_empty() {
            return Ok(None);
        }

        // Controlled materials move in lockstep, so the first one carries
        // the current factor.
        let from = self.materials[0].opacity();
        let plan = FadePlan::new(from, target, self.settings.fade.steps);
        let interval = plan.step_interval(self.settings.fade.duration);

        let mut next_step = Instant::now() + interval;
        for value in plan.values() {
            loop {
                tokio::select! {
                    _ = sleep_until(next_step) => break,
                    event = self.session.next_event() => match event {
                        click @ ViewerEvent::Click { .. } => {
                            self.set_opacity(target, blending).await?;
                            return Ok(Some(click));
                        }
                        ViewerEvent::Closed => return Err(SessionError::Closed.into()),
                        other => debug!(?other, "event during fade ignored"),
                    },
                }
            }
            self.set_opacity(value, blending).await?;
            next_step += interval;
        }
        Ok(None)
    }

    async fn set_opacity(&mut self, factor: f64, blending: bool) -> Result<(), ControllerError> {
        for material in &mut self.materials {
            material.apply_opacity(factor, blending);
            self.session.set_material(material).await?;
        }
        Ok(())
    }

    fn publish(&self, phase: ExhibitPhase) {
        self.status.send_replace(ExhibitStatus {
            phase,
            state: self.state,
            cycle: Some(self.cycle),
            resolved_nodes: self.nodes.len(),
            clicks: self.clicks,
            session: Some(self.session_id),
            connected_at: Some(self.connected_at),
            last_click: self.last_click,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{BridgeEvent, NodeRecord, ViewerCommand};
    use crate::session::{BridgeLink, ViewerSession, DEFAULT_QUERY_TIMEOUT};
    use vitrine_core::{ExhibitPhase, MaterialState, ModelUid, MountId};

    fn exhibit(targets: &[&str]) -> Arc<Exhibit> {
        Arc::new(Exhibit {
            model_uid: ModelUid("271bd5c6d9854fe6997f8a31475e9d2c".to_string()),
            mount: MountId("case-1".to_string()),
            label: "Cranium".to_string(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
            fade_materials: Vec::new(),
        })
    }

    fn skull_nodes() -> Vec<NodeRecord> {
        vec![
            NodeRecord {
                instance_id: 1,
                name: Some("Mandible".to_string()),
                parent_id: -1,
            },
            NodeRecord {
                instance_id: 2,
                name: Some("Maxilla".to_string()),
                parent_id: 1,
            },
        ]
    }

    fn bone_material() -> MaterialState {
        MaterialState {
            id: "mat-01".to_string(),
            name: "Bone".to_string(),
            transparent: false,
            channels: Default::default(),
        }
    }

    fn settings(fade: Option<FadeSettings>) -> ControllerSettings {
        ControllerSettings {
            fade: fade.unwrap_or(FadeSettings {
                enabled: false,
                ..FadeSettings::default()
            }),
            ..ControllerSettings::default()
        }
    }

    /// Scripted bridge: answers queries from fixtures, emits `clicks` click
    /// events once clicks are watched, and disconnects after seeing
    /// `expected` commands.
    fn spawn_bridge(
        mut link: BridgeLink,
        nodes: Vec<NodeRecord>,
        materials: Option<Vec<MaterialState>>,
        clicks: usize,
        expected: usize,
    ) -> tokio::task::JoinHandle<Vec<ViewerCommand>> {
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(command) = link.commands.recv().await {
                match &command {
                    ViewerCommand::Init { .. } => link.deliver(BridgeEvent::Ready).await,
                    ViewerCommand::QueryNodeMap { id } => {
                        link.deliver(BridgeEvent::NodeMap {
                            id: *id,
                            nodes: nodes.clone(),
                        })
                        .await
                    }
                    ViewerCommand::QueryMaterialList { id } => match materials.clone() {
                        Some(materials) => {
                            link.deliver(BridgeEvent::MaterialList {
                                id: *id,
                                materials,
                            })
                            .await
                        }
                        None => {
                            link.deliver(BridgeEvent::Failed {
                                id: *id,
                                message: "materials unavailable".to_string(),
                            })
                            .await
                        }
                    },
                    ViewerCommand::WatchClicks { .. } => {
                        for _ in 0..clicks {
                            link.deliver(BridgeEvent::Click {
                                node: None,
                                position: None,
                            })
                            .await;
                        }
                    }
                    _ => {}
                }
                seen.push(command);
                if seen.len() == expected {
                    break;
                }
            }
            seen
        })
    }

    fn controller(
        exhibit: Arc<Exhibit>,
        settings: ControllerSettings,
        session: ViewerSession,
    ) -> (ExhibitController, watch::Receiver<ExhibitStatus>) {
        let (status_tx, status_rx) = watch::channel(ExhibitStatus::waiting());
        let controller =
            ExhibitController::new(exhibit, settings, session, status_tx, SessionId::new());
        (controller, status_rx)
    }

    #[tokio::test]
    async fn test_click_cycle_touches_only_resolved_nodes() {
        let (session, link) = ViewerSession::pair(DEFAULT_QUERY_TIMEOUT);
        let bridge = spawn_bridge(link, skull_nodes(), None, 2, 6);
        let (controller, status) = controller(exhibit(&["Maxilla"]), settings(None), session);

        controller.run().await.unwrap();
        let seen = bridge.await.unwrap();

        assert!(matches!(seen[0], ViewerCommand::Init { .. }));
        assert!(matches!(seen[1], ViewerCommand::Start));
        assert!(matches!(seen[2], ViewerCommand::QueryNodeMap { .. }));
        assert!(matches!(seen[3], ViewerCommand::WatchClicks { .. }));
        // First click hides Maxilla, second shows it again
        assert!(matches!(seen[4], ViewerCommand::Hide { node } if node == NodeHandle(2)));
        assert!(matches!(seen[5], ViewerCommand::Show { node } if node == NodeHandle(2)));
        // Mandible is never touched
        for command in &seen {
            match command {
                ViewerCommand::Show { node } | ViewerCommand::Hide { node } => {
                    assert_ne!(*node, NodeHandle(1));
                }
                _ => {}
            }
        }

        let last = status.borrow();
        assert_eq!(last.phase, ExhibitPhase::Active);
        assert_eq!(last.state, VisibilityState::Shown);
        assert_eq!(last.clicks, 2);
        assert_eq!(last.resolved_nodes, 1);
    }

    #[tokio::test]
    async fn test_translucent_stage_fades_materials() {
        let fade = FadeSettings {
            enabled: true,
            steps: 2,
            duration: Duration::from_millis(4),
            translucent_opacity: 0.03,
        };
        let (session, link) = ViewerSession::pair(DEFAULT_QUERY_TIMEOUT);
        let bridge = spawn_bridge(link, skull_nodes(), Some(vec![bone_material()]), 1, 7);
        let (controller, status) =
            controller(exhibit(&["Maxilla"]), settings(Some(fade)), session);

        controller.run().await.unwrap();
        let seen = bridge.await.unwrap();

        assert!(matches!(seen[3], ViewerCommand::QueryMaterialList { .. }));
        let factors: Vec<f64> = seen
            .iter()
            .filter_map(|command| match command {
                ViewerCommand::SetMaterial { material } => {
                    assert!(material.transparent);
                    Some(material.opacity())
                }
                _ => None,
            })
            .collect();
        assert_eq!(factors.len(), 2);
        assert!((factors[0] - 0.515).abs() < 1e-12);
        assert_eq!(factors[1], 0.03);

        let last = status.borrow();
        assert_eq!(last.state, VisibilityState::Translucent);
        assert_eq!(last.cycle, Some(CycleMode::ShowFadeHide));
    }

    #[tokio::test]
    async fn test_material_failure_degrades_to_two_stage() {
        let fade = FadeSettings {
            enabled: true,
            ..FadeSettings::default()
        };
        let (session, link) = ViewerSession::pair(DEFAULT_QUERY_TIMEOUT);
        let bridge = spawn_bridge(link, skull_nodes(), None, 1, 6);
        let (controller, status) =
            controller(exhibit(&["Maxilla"]), settings(Some(fade)), session);

        controller.run().await.unwrap();
        let seen = bridge.await.unwrap();

        assert!(seen
            .iter()
            .all(|c| !matches!(c, ViewerCommand::SetMaterial { .. })));
        assert!(matches!(seen[5], ViewerCommand::Hide { node } if node == NodeHandle(2)));
        assert_eq!(status.borrow().cycle, Some(CycleMode::ShowHide));
    }

    #[tokio::test]
    async fn test_empty_node_map_leaves_exhibit_inert() {
        let (session, link) = ViewerSession::pair(DEFAULT_QUERY_TIMEOUT);
        let bridge = spawn_bridge(link, Vec::new(), None, 0, 3);
        let (controller, status) = controller(exhibit(&["Maxilla"]), settings(None), session);

        let err = controller.run().await.unwrap_err();
        assert!(matches!(err, ControllerError::EmptyScene));

        let seen = bridge.await.unwrap();
        // No click registration and no show/hide calls, ever
        assert!(seen.iter().all(|c| !matches!(
            c,
            ViewerCommand::WatchClicks { .. }
                | ViewerCommand::Show { .. }
                | ViewerCommand::Hide { .. }
        )));
        assert!(matches!(status.borrow().phase, ExhibitPhase::Inert { .. }));
    }

    #[tokio::test]
    async fn test_init_failure_leaves_exhibit_inert() {
        let (session, mut link) = ViewerSession::pair(DEFAULT_QUERY_TIMEOUT);
        let bridge = tokio::spawn(async move {
            let command = link.commands.recv().await.unwrap();
            assert!(matches!(command, ViewerCommand::Init { .. }));
            link.deliver(BridgeEvent::InitFailed {
                message: "embed quota exceeded".to_string(),
            })
            .await;
            link
        });
        let (controller, status) = controller(exhibit(&["Maxilla"]), settings(None), session);

        let err = controller.run().await.unwrap_err();
        assert!(matches!(err, ControllerError::InitFailed(_)));
        assert!(matches!(status.borrow().phase, ExhibitPhase::Inert { .. }));
        bridge.await.unwrap();
    }

    #[tokio::test]
    async fn test_unmatched_targets_fall_back_to_root() {
        let (session, link) = ViewerSession::pair(DEFAULT_QUERY_TIMEOUT);
        let bridge = spawn_bridge(link, skull_nodes(), None, 1, 5);
        let (controller, status) = controller(exhibit(&["Hyoid"]), settings(None), session);

        controller.run().await.unwrap();
        let seen = bridge.await.unwrap();

        // Mandible is the parentless stand-in
        assert!(matches!(seen[4], ViewerCommand::Hide { node } if node == NodeHandle(1)));
        assert_eq!(status.borrow().resolved_nodes, 1);
    }

    #[tokio::test]
    async fn test_click_mid_fade_snaps_to_target() {
        let fade = FadeSettings {
            enabled: true,
            steps: 50,
            duration: Duration::from_secs(5),
            translucent_opacity: 0.03,
        };
        let (session, link) = ViewerSession::pair(DEFAULT_QUERY_TIMEOUT);
        // Two queued clicks: the second lands while the first fade is
        // still on its opening step
        let bridge = spawn_bridge(link, skull_nodes(), Some(vec![bone_material()]), 2, 7);
        let (controller, status) =
            controller(exhibit(&["Maxilla"]), settings(Some(fade)), session);

        controller.run().await.unwrap();
        let seen = bridge.await.unwrap();

        let factors: Vec<f64> = seen
            .iter()
            .filter_map(|command| match command {
                ViewerCommand::SetMaterial { material } => Some(material.opacity()),
                _ => None,
            })
            .collect();
        // The interrupted fade collapses to a single snap at its target
        assert_eq!(factors, vec![0.03]);
        assert!(matches!(
            seen.last().unwrap(),
            ViewerCommand::Hide { node } if *node == NodeHandle(2)
        ));
        assert_eq!(status.borrow().state, VisibilityState::Hidden);
    }
}
