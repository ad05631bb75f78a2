//! Host capabilities consumed by the controller.
//!
//! The hosting platform owns avatar tracking, spatial audio, scene objects
//! and peer messaging. Each is an injected trait object so the controller can
//! run against the real host, the in-process [`crate::sim`] host, or a test
//! double.
//!
//! ## Axis mapping
//!
//! | Host field | Source          |
//! |------------|-----------------|
//! | `x`        | `position.x`    |
//! | `height`   | `position.y`    |
//! | `y`        | `position.z`    |

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::types::Position;

// ---------------------------------------------------------------------------
// Host parameter types
// ---------------------------------------------------------------------------

/// Spatial playback parameters for [`AudioService::play`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackOptions {
    pub volume: f32,
    pub x: f64,
    pub height: f64,
    pub y: f64,
    pub radius: f32,
}

impl PlaybackOptions {
    pub fn at(position: Position, volume: f32, radius: f32) -> Self {
        Self {
            volume,
            x: position.x,
            height: position.y,
            y: position.z,
            radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Circle,
}

/// Spawn request for [`ObjectService::create`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub scale: f32,
    pub transparent: bool,
    pub opacity: f32,
    pub x: f64,
    pub height: f64,
    pub y: f64,
}

impl ObjectDescriptor {
    /// Invisible transparent circle `drop` units below `position`.
    pub fn ripple_at(position: Position, drop: f64) -> Self {
        Self {
            kind: ObjectKind::Circle,
            scale: 0.0,
            transparent: true,
            opacity: 1.0,
            x: position.x,
            height: position.y - drop,
            y: position.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectUpdate {
    pub scale: f32,
    pub opacity: f32,
}

/// Opaque id the host hands back for a spawned object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(pub String);

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PositionService: Send + Sync {
    /// Current position of the local user's avatar.
    async fn position(&self) -> Result<Position>;
}

#[async_trait]
pub trait AudioService: Send + Sync {
    async fn preload(&self, asset: &str) -> Result<()>;
    async fn play(&self, asset: &str, options: PlaybackOptions) -> Result<()>;
}

#[async_trait]
pub trait ObjectService: Send + Sync {
    async fn create(&self, descriptor: ObjectDescriptor) -> Result<ObjectHandle>;
    async fn update(&self, handle: &ObjectHandle, update: ObjectUpdate) -> Result<()>;
    async fn remove(&self, handle: &ObjectHandle) -> Result<()>;
}

#[async_trait]
pub trait PeerMessenger: Send + Sync {
    /// Broadcast `payload` to every other client. No acknowledgement.
    async fn send(&self, payload: Bytes, reliable: bool) -> Result<()>;
}

/// The full set of host capabilities a controller needs.
#[derive(Clone)]
pub struct HostServices {
    pub position: Arc<dyn PositionService>,
    pub audio: Arc<dyn AudioService>,
    pub objects: Arc<dyn ObjectService>,
    pub messenger: Arc<dyn PeerMessenger>,
}
