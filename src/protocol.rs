//! Peer wire protocol.
//!
//! Every client running the plugin shares one message shape over the host's
//! peer messaging channel:
//!
//! ```json
//! { "action": "footstep", "position": { "x": 2.0, "y": 0.0, "z": 0.0 }, "instanceID": "k3x9q0w1ab" }
//! ```
//!
//! ## Rules
//!
//! 1. `instanceID` is always present; receivers drop messages carrying their
//!    own id before looking at anything else.
//! 2. Only `action == "footstep"` is acted on. Other actions are ignored so
//!    the channel can be shared with future message kinds.
//! 3. Peers never relay: a received footstep is rendered, not re-sent.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Position, SessionId};

pub mod actions {
    pub const FOOTSTEP: &str = "footstep";
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Raw peer message as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerMessage {
    pub action: String,
    #[serde(rename = "instanceID")]
    pub instance_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl PeerMessage {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The footstep carried by this message, if it is one.
    pub fn into_footstep(self) -> Option<FootstepEvent> {
        if self.action != actions::FOOTSTEP {
            return None;
        }
        self.position.map(|position| FootstepEvent {
            origin_id: self.instance_id,
            position,
        })
    }
}

// ---------------------------------------------------------------------------
// Footstep event
// ---------------------------------------------------------------------------

/// A step taken by some client's avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct FootstepEvent {
    pub origin_id: SessionId,
    pub position: Position,
}

impl FootstepEvent {
    pub fn new(origin_id: SessionId, position: Position) -> Self {
        Self {
            origin_id,
            position,
        }
    }

    pub fn is_from(&self, session: &SessionId) -> bool {
        &self.origin_id == session
    }

    pub fn to_message(&self) -> PeerMessage {
        PeerMessage {
            action: actions::FOOTSTEP.to_string(),
            instance_id: self.origin_id.clone(),
            position: Some(self.position),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.to_message().encode()
    }
}
