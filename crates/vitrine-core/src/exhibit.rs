//! Exhibit descriptors for tracking configured model embeds

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque model identifier assigned by the hosting provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelUid(pub String);

impl ModelUid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the page region an embedded viewer renders into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountId(pub String);

impl MountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised when validating an exhibit descriptor
#[derive(Error, Debug)]
pub enum ExhibitError {
    #[error("exhibit '{0}' has an empty model uid")]
    EmptyModelUid(String),
    #[error("exhibit '{0}' has an empty mount id")]
    EmptyMount(String),
    #[error("exhibit '{label}' has an empty target name at position {index}")]
    EmptyTarget { label: String, index: usize },
}

/// A configured model exhibit
///
/// Built once from configuration at startup and immutable afterwards. The
/// click handler for an exhibit only ever operates on nodes resolved from
/// `targets` at viewer-ready time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exhibit {
    /// Provider-side model identifier to load into the viewer
    pub model_uid: ModelUid,
    /// Page mount point the viewer renders into
    pub mount: MountId,
    /// Human-readable label shown in the gallery and in logs
    pub label: String,
    /// Names of the scene nodes controlled by the click cycle, in
    /// configuration order. Empty means "control the root-like node".
    pub targets: Vec<String>,
    /// Names of the materials faded during the translucent stage.
    /// Empty means all materials reported by the viewer.
    pub fade_materials: Vec<String>,
}

impl Exhibit {
    /// Check the descriptor for values that would fail at the point of use
    pub fn validate(&self) -> Result<(), ExhibitError> {
        if self.model_uid.as_str().trim().is_empty() {
            return Err(ExhibitError::EmptyModelUid(self.label.clone()));
        }
        if self.mount.as_str().trim().is_empty() {
            return Err(ExhibitError::EmptyMount(self.label.clone()));
        }
        for (index, target) in self.targets.iter().enumerate() {
            if target.trim().is_empty() {
                return Err(ExhibitError::EmptyTarget {
                    label: self.label.clone(),
                    index,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exhibit(targets: &[&str]) -> Exhibit {
        Exhibit {
            model_uid: ModelUid("271bd5c6d9854fe6997f8a31475e9d2c".to_string()),
            mount: MountId("case-1".to_string()),
            label: "Cranium".to_string(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
            fade_materials: Vec::new(),
        }
    }

    #[test]
    fn test_validate_accepts_zero_targets() {
        assert!(exhibit(&[]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_target() {
        let err = exhibit(&["Maxilla", "  "]).validate().unwrap_err();
        assert!(matches!(err, ExhibitError::EmptyTarget { index: 1, .. }));
    }

    #[test]
    fn test_validate_rejects_empty_model_uid() {
        let mut e = exhibit(&["Maxilla"]);
        e.model_uid = ModelUid(String::new());
        assert!(matches!(
            e.validate().unwrap_err(),
            ExhibitError::EmptyModelUid(_)
        ));
    }
}
