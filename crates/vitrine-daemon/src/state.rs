//! Application state management

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::debug;
use vitrine_core::{Exhibit, ExhibitStatus, MountId};
use vitrine_viewer::ControllerSettings;

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Controller tuning derived from the configuration
    pub settings: ControllerSettings,
    /// Configured exhibits in configuration order
    exhibits: Vec<Arc<Exhibit>>,
    /// Latest status per mount, fed by the exhibit controllers
    statuses: RwLock<HashMap<MountId, watch::Receiver<ExhibitStatus>>>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let exhibits = config.exhibits()?;
        let settings = config.controller_settings();
        Ok(Arc::new(Self {
            config,
            settings,
            exhibits,
            statuses: RwLock::new(HashMap::new()),
        }))
    }

    /// All configured exhibits
    pub fn exhibits(&self) -> &[Arc<Exhibit>] {
        &self.exhibits
    }

    /// Look up the exhibit configured for a mount
    pub fn exhibit_for_mount(&self, mount: &str) -> Option<Arc<Exhibit>> {
        self.exhibits
            .iter()
            .find(|e| e.mount.as_str() == mount)
            .cloned()
    }

    /// Track a new bridge session's status feed
    ///
    /// A reconnect (page reload) simply replaces the previous session's feed.
    pub async fn track_session(&self, mount: MountId, status: watch::Receiver<ExhibitStatus>) {
        debug!(mount = %mount, "tracking bridge session");
        self.statuses.write().await.insert(mount, status);
    }

    /// Latest status for a mount; `Waiting` until a bridge connects
    pub async fn status_of(&self, mount: &MountId) -> ExhibitStatus {
        match self.statuses.read().await.get(mount) {
            Some(rx) => rx.borrow().clone(),
            None => ExhibitStatus::waiting(),
        }
    }
}
