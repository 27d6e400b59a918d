//! Material records mirrored from the provider's material list

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Channel name carrying the opacity factor
pub const OPACITY_CHANNEL: &str = "Opacity";

/// One material channel (opacity, albedo, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "default_factor")]
    pub factor: f64,
}

fn default_factor() -> f64 {
    1.0
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            enable: false,
            factor: default_factor(),
        }
    }
}

/// A material as reported by the viewer
///
/// Updates are sent back as the whole record, so channels this code never
/// touches survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialState {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Transparency blending flag
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub channels: BTreeMap<String, Channel>,
}

impl MaterialState {
    /// Current opacity factor; 1.0 when the material has no opacity channel
    pub fn opacity(&self) -> f64 {
        self.channels
            .get(OPACITY_CHANNEL)
            .map(|c| c.factor)
            .unwrap_or(1.0)
    }

    /// Set the opacity factor and transparency blending in one step
    pub fn apply_opacity(&mut self, factor: f64, blending: bool) {
        self.transparent = blending;
        let channel = self.channels.entry(OPACITY_CHANNEL.to_string()).or_default();
        channel.enable = blending;
        channel.factor = factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> MaterialState {
        MaterialState {
            id: "mat-01".to_string(),
            name: "Bone".to_string(),
            transparent: false,
            channels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_opacity_defaults_to_opaque() {
        assert_eq!(material().opacity(), 1.0);
    }

    #[test]
    fn test_apply_opacity_creates_the_channel() {
        let mut m = material();
        m.apply_opacity(0.03, true);
        assert!(m.transparent);
        let channel = &m.channels[OPACITY_CHANNEL];
        assert!(channel.enable);
        assert_eq!(channel.factor, 0.03);
        assert_eq!(m.opacity(), 0.03);
    }

    #[test]
    fn test_restore_disables_blending() {
        let mut m = material();
        m.apply_opacity(0.03, true);
        m.apply_opacity(1.0, false);
        assert!(!m.transparent);
        assert!(!m.channels[OPACITY_CHANNEL].enable);
        assert_eq!(m.opacity(), 1.0);
    }
}
