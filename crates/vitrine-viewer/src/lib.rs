//! Vitrine Viewer - Embedded viewer integration
//!
//! This crate talks to the provider's embed client through the page-side
//! bridge: the JSON wire protocol, a request/response session over message
//! channels, and the controller that drives one exhibit through resolution
//! and the click-driven visibility cycle.

pub mod controller;
pub mod protocol;
pub mod session;

pub use controller::{
    ControllerError, ControllerSettings, ExhibitController, FadeSettings,
};
pub use protocol::{BridgeEvent, NodeRecord, PickMode, ViewerCommand};
pub use session::{BridgeLink, SessionError, ViewerEvent, ViewerSession};
