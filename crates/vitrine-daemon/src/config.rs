//! Configuration loading and validation

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use vitrine_core::{Exhibit, ModelUid, MountId};
use vitrine_viewer::{ControllerSettings, FadeSettings, PickMode};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub fade: FadeConfig,
    #[serde(default, rename = "exhibit")]
    pub exhibits: Vec<ExhibitConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory with the gallery page and bridge script
    #[serde(default = "default_web_root")]
    pub web_root: String,
    /// TLS configuration (optional - enables HTTPS when present)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            web_root: default_web_root(),
            tls: None,
        }
    }
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM format)
    pub cert: String,
    /// Path to private key file (PEM format)
    pub key: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_web_root() -> String {
    "./web".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// URL of the provider's embed client script
    #[serde(default = "default_embed_script")]
    pub embed_script: String,
    /// Hit-testing fidelity for click picking
    #[serde(default)]
    pub pick: PickMode,
    /// How long to wait for a viewer's ready signal, in seconds
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
    /// Bound on one bridge query, in milliseconds
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            embed_script: default_embed_script(),
            pick: PickMode::default(),
            ready_timeout_secs: default_ready_timeout(),
            query_timeout_ms: default_query_timeout(),
        }
    }
}

fn default_embed_script() -> String {
    "https://static.modelview.example/embed/1.12.1/embed-client.js".to_string()
}

fn default_ready_timeout() -> u64 {
    30
}

fn default_query_timeout() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FadeConfig {
    /// Whether exhibits get the translucent stage at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fade_steps")]
    pub steps: u32,
    #[serde(default = "default_fade_duration")]
    pub duration_ms: u64,
    /// Opacity factor of the translucent stage
    #[serde(default = "default_translucent_opacity")]
    pub translucent_opacity: f64,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            steps: default_fade_steps(),
            duration_ms: default_fade_duration(),
            translucent_opacity: default_translucent_opacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_fade_steps() -> u32 {
    30
}

fn default_fade_duration() -> u64 {
    600
}

fn default_translucent_opacity() -> f64 {
    0.03
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExhibitConfig {
    /// Provider-side model identifier
    pub model: String,
    /// Page mount point the viewer renders into
    pub mount: String,
    /// Human-readable label; defaults to the mount id
    pub label: Option<String>,
    /// Names of the scene nodes toggled by clicks
    #[serde(default)]
    pub targets: Vec<String>,
    /// Names of the materials faded during the translucent stage
    #[serde(default)]
    pub fade_materials: Vec<String>,
}

impl Config {
    /// Build and validate the exhibit descriptors
    pub fn exhibits(&self) -> Result<Vec<Arc<Exhibit>>> {
        let mut mounts = HashSet::new();
        let mut exhibits = Vec::with_capacity(self.exhibits.len());
        for entry in &self.exhibits {
            if !mounts.insert(entry.mount.clone()) {
                bail!("duplicate exhibit mount '{}'", entry.mount);
            }
            let exhibit = Exhibit {
                model_uid: ModelUid(entry.model.clone()),
                mount: MountId(entry.mount.clone()),
                label: entry.label.clone().unwrap_or_else(|| entry.mount.clone()),
                targets: entry.targets.clone(),
                fade_materials: entry.fade_materials.clone(),
            };
            exhibit.validate()?;
            exhibits.push(Arc::new(exhibit));
        }
        Ok(exhibits)
    }

    /// Convert to ControllerSettings
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            pick: self.viewer.pick,
            ready_timeout: Duration::from_secs(self.viewer.ready_timeout_secs),
            fade: FadeSettings {
                enabled: self.fade.enabled,
                steps: self.fade.steps,
                duration: Duration::from_millis(self.fade.duration_ms),
                translucent_opacity: self.fade.translucent_opacity,
            },
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.viewer.query_timeout_ms)
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config {
            daemon: DaemonConfig::default(),
            viewer: ViewerConfig::default(),
            fade: FadeConfig::default(),
            exhibits: Vec::new(),
        })
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = Config {
        daemon: DaemonConfig::default(),
        viewer: ViewerConfig::default(),
        fade: FadeConfig::default(),
        exhibits: vec![ExhibitConfig {
            model: "271bd5c6d9854fe6997f8a31475e9d2c".to_string(),
            mount: "cranium-case".to_string(),
            label: Some("Cranium".to_string()),
            targets: vec!["Calotte_v6_2".to_string()],
            fade_materials: Vec::new(),
        }],
    };

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [daemon]
            bind = "127.0.0.1:9000"

            [fade]
            steps = 12
            duration_ms = 240

            [[exhibit]]
            model = "271bd5c6d9854fe6997f8a31475e9d2c"
            mount = "cranium-case"
            label = "Cranium"
            targets = ["Calotte_v6_2"]

            [[exhibit]]
            model = "423318aa8fd14782976d528fd8e2a5d0"
            mount = "pelvis-case"
            "#,
        )
        .unwrap();

        assert_eq!(config.daemon.bind, "127.0.0.1:9000");
        assert_eq!(config.fade.steps, 12);
        assert_eq!(config.viewer.ready_timeout_secs, 30);

        let exhibits = config.exhibits().unwrap();
        assert_eq!(exhibits.len(), 2);
        assert_eq!(exhibits[0].targets, vec!["Calotte_v6_2".to_string()]);
        // Label falls back to the mount id
        assert_eq!(exhibits[1].label, "pelvis-case");
        assert!(exhibits[1].targets.is_empty());
    }

    #[test]
    fn test_duplicate_mounts_are_rejected() {
        let config: Config = toml::from_str(
            r#"
            [[exhibit]]
            model = "a"
            mount = "case"

            [[exhibit]]
            model = "b"
            mount = "case"
            "#,
        )
        .unwrap();
        assert!(config.exhibits().is_err());
    }

    #[test]
    fn test_blank_target_names_are_rejected() {
        let config: Config = toml::from_str(
            r#"
            [[exhibit]]
            model = "a"
            mount = "case"
            targets = [""]
            "#,
        )
        .unwrap();
        assert!(config.exhibits().is_err());
    }

    #[test]
    fn test_controller_settings_conversion() {
        let config: Config = toml::from_str(
            r#"
            [fade]
            enabled = false
            duration_ms = 150
            "#,
        )
        .unwrap();
        let settings = config.controller_settings();
        assert!(!settings.fade.enabled);
        assert_eq!(settings.fade.duration, Duration::from_millis(150));
        assert_eq!(settings.ready_timeout, Duration::from_secs(30));
    }
}
