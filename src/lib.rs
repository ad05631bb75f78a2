//! Footstep Effects
//!
//! Footstep sounds and fading ripple decals under a walking avatar, shared
//! with every other client in the space.
//!
//! ## Architecture
//!
//! ```text
//! FootstepController  (controller.rs)  ← poll timer, peer inbox, stats
//!   ├── StepDetector     (step.rs)     ← baseline + horizontal threshold
//!   ├── EffectPresenter  (effect.rs)   ← sound pick, ripple decal task
//!   │     └── RippleAnimation (ripple.rs)
//!   └── HostServices     (host.rs)     ← position / audio / objects / peers
//! ```
//!
//! The host platform is reached only through the traits in [`host`]; the
//! [`sim`] module provides an in-process implementation with a loopback
//! peer bus.

// Pure logic is always available (no runtime feature needed).
pub mod error;
pub mod protocol;
pub mod ripple;
pub mod step;
pub mod types;

// Async controller and host plumbing require the `runtime` feature.
#[cfg(feature = "runtime")]
pub mod controller;
#[cfg(feature = "runtime")]
pub mod effect;
#[cfg(feature = "runtime")]
pub mod host;
#[cfg(feature = "runtime")]
pub mod sim;

// Convenience re-exports (runtime only)
#[cfg(feature = "runtime")]
pub use controller::{FootstepController, ReceiveOutcome};
#[cfg(feature = "runtime")]
pub use effect::EffectPresenter;
#[cfg(feature = "runtime")]
pub use host::{
    AudioService, HostServices, ObjectService, PeerMessenger, PositionService,
};
pub use error::{FootstepError, Result};
pub use protocol::{FootstepEvent, PeerMessage};
pub use ripple::{RippleAnimation, RippleFrame, RippleState};
pub use step::{StepDetector, StepOutcome};
pub use types::{ControllerStats, FootstepConfig, Position, SessionId};
