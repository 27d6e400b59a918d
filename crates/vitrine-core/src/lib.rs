//! Vitrine Core - Core types for embedded model exhibits
//!
//! This crate provides the foundational types for the Vitrine system:
//! - Exhibit descriptors binding a hosted model to a page mount point
//! - Scene node records and the target-name resolution policy
//! - The click-driven visibility cycle and opacity fade schedule
//! - Runtime status records for the daemon's status API

pub mod exhibit;
pub mod fade;
pub mod material;
pub mod scene;
pub mod status;
pub mod visibility;

pub use exhibit::{Exhibit, ExhibitError, ModelUid, MountId};
pub use fade::FadePlan;
pub use material::{Channel, MaterialState, OPACITY_CHANNEL};
pub use scene::{resolve_nodes, NodeHandle, Resolution, SceneNode};
pub use status::{ExhibitPhase, ExhibitStatus, SessionId};
pub use visibility::{CycleMode, VisibilityState};
