//! In-process host – lets controllers run without the real platform.
//!
//! Used by the `footstep-sim` binary and by the test suite:
//!
//! ```text
//! LoopbackBus ──┬── LoopbackMessenger (client A) ── inbox A
//!               └── LoopbackMessenger (client B) ── inbox B
//! ```
//!
//! The bus delivers every broadcast to every attached client, sender
//! included, the way a naive host relay would. Controllers are expected to
//! filter their own echoes.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{FootstepError, Result};
use crate::host::{
    AudioService, HostServices, ObjectDescriptor, ObjectHandle, ObjectService, ObjectUpdate,
    PeerMessenger, PlaybackOptions, PositionService,
};
use crate::types::Position;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// One scripted answer from [`ScriptedPositions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionReading {
    At(Position),
    /// The host reports an error.
    Fail,
    /// The host never answers.
    Stall,
}

/// Replays a fixed list of readings, then repeats the last position forever.
pub struct ScriptedPositions {
    readings: Mutex<VecDeque<PositionReading>>,
    last: Mutex<Option<Position>>,
}

impl ScriptedPositions {
    pub fn new(readings: impl IntoIterator<Item = PositionReading>) -> Self {
        Self {
            readings: Mutex::new(readings.into_iter().collect()),
            last: Mutex::new(None),
        }
    }

    pub fn path(points: impl IntoIterator<Item = Position>) -> Self {
        Self::new(points.into_iter().map(PositionReading::At))
    }

    pub fn push(&self, reading: PositionReading) {
        self.readings.lock().push_back(reading);
    }

    pub fn remaining(&self) -> usize {
        self.readings.lock().len()
    }
}

#[async_trait]
impl PositionService for ScriptedPositions {
    async fn position(&self) -> Result<Position> {
        let next = self.readings.lock().pop_front();
        match next {
            Some(PositionReading::At(p)) => {
                *self.last.lock() = Some(p);
                Ok(p)
            }
            Some(PositionReading::Fail) => Err(FootstepError::PositionUnavailable(
                "scripted failure".into(),
            )),
            Some(PositionReading::Stall) => std::future::pending().await,
            None => (*self.last.lock()).ok_or_else(|| {
                FootstepError::PositionUnavailable("no position scripted".into())
            }),
        }
    }
}

/// Avatar walking in a straight line at constant velocity (units/second,
/// on the x/z plane) from the moment it is created.
pub struct WalkingAvatar {
    origin: Position,
    velocity: (f64, f64),
    started: Instant,
}

impl WalkingAvatar {
    pub fn new(origin: Position, vx: f64, vz: f64) -> Self {
        Self {
            origin,
            velocity: (vx, vz),
            started: Instant::now(),
        }
    }
}

#[async_trait]
impl PositionService for WalkingAvatar {
    async fn position(&self) -> Result<Position> {
        let t = self.started.elapsed().as_secs_f64();
        Ok(Position::new(
            self.origin.x + self.velocity.0 * t,
            self.origin.y,
            self.origin.z + self.velocity.1 * t,
        ))
    }
}

/// Avatar that never moves.
pub struct StandingAvatar(pub Position);

#[async_trait]
impl PositionService for StandingAvatar {
    async fn position(&self) -> Result<Position> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlayedSound {
    pub asset: String,
    pub options: PlaybackOptions,
}

#[derive(Default)]
pub struct RecordingAudio {
    preloaded: Mutex<Vec<String>>,
    played: Mutex<Vec<PlayedSound>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preloaded(&self) -> Vec<String> {
        self.preloaded.lock().clone()
    }

    pub fn played(&self) -> Vec<PlayedSound> {
        self.played.lock().clone()
    }
}

#[async_trait]
impl AudioService for RecordingAudio {
    async fn preload(&self, asset: &str) -> Result<()> {
        self.preloaded.lock().push(asset.to_string());
        Ok(())
    }

    async fn play(&self, asset: &str, options: PlaybackOptions) -> Result<()> {
        self.played.lock().push(PlayedSound {
            asset: asset.to_string(),
            options,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SceneLog {
    created: Vec<(ObjectHandle, ObjectDescriptor)>,
    updates: Vec<(ObjectHandle, ObjectUpdate)>,
    removed: Vec<ObjectHandle>,
    live: HashSet<ObjectHandle>,
}

/// Scene that records every create/update/remove it sees.
#[derive(Default)]
pub struct RecordingObjects {
    next_id: AtomicU64,
    log: Mutex<SceneLog>,
}

impl RecordingObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<(ObjectHandle, ObjectDescriptor)> {
        self.log.lock().created.clone()
    }

    pub fn updates_for(&self, handle: &ObjectHandle) -> Vec<ObjectUpdate> {
        self.log
            .lock()
            .updates
            .iter()
            .filter(|(h, _)| h == handle)
            .map(|(_, u)| *u)
            .collect()
    }

    pub fn removed(&self) -> Vec<ObjectHandle> {
        self.log.lock().removed.clone()
    }

    pub fn live_count(&self) -> usize {
        self.log.lock().live.len()
    }
}

#[async_trait]
impl ObjectService for RecordingObjects {
    async fn create(&self, descriptor: ObjectDescriptor) -> Result<ObjectHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = ObjectHandle(format!("obj-{id}"));
        let mut log = self.log.lock();
        log.live.insert(handle.clone());
        log.created.push((handle.clone(), descriptor));
        Ok(handle)
    }

    async fn update(&self, handle: &ObjectHandle, update: ObjectUpdate) -> Result<()> {
        let mut log = self.log.lock();
        if !log.live.contains(handle) {
            return Err(FootstepError::Host(format!("unknown object {handle}")));
        }
        log.updates.push((handle.clone(), update));
        Ok(())
    }

    async fn remove(&self, handle: &ObjectHandle) -> Result<()> {
        let mut log = self.log.lock();
        if !log.live.remove(handle) {
            return Err(FootstepError::Host(format!("unknown object {handle}")));
        }
        log.removed.push(handle.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Peer messaging
// ---------------------------------------------------------------------------

/// A payload as it was handed to the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct SentPayload {
    pub payload: Bytes,
    pub reliable: bool,
}

#[derive(Default)]
struct BusInner {
    inboxes: Vec<mpsc::UnboundedSender<Bytes>>,
    sent: Vec<SentPayload>,
}

/// Shared in-memory broadcast medium.
#[derive(Clone, Default)]
pub struct LoopbackBus {
    inner: Arc<Mutex<BusInner>>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the bus. The returned inbox receives every payload anyone sends.
    pub fn attach(&self) -> (Arc<LoopbackMessenger>, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().inboxes.push(tx);
        let messenger = Arc::new(LoopbackMessenger { bus: self.clone() });
        (messenger, rx)
    }

    /// Every payload sent so far, in order.
    pub fn sent(&self) -> Vec<SentPayload> {
        self.inner.lock().sent.clone()
    }

    fn deliver(&self, payload: Bytes, reliable: bool) {
        let mut inner = self.inner.lock();
        inner.sent.push(SentPayload {
            payload: payload.clone(),
            reliable,
        });
        // Closed inboxes belong to clients that went away.
        inner.inboxes.retain(|tx| tx.send(payload.clone()).is_ok());
    }
}

pub struct LoopbackMessenger {
    bus: LoopbackBus,
}

#[async_trait]
impl PeerMessenger for LoopbackMessenger {
    async fn send(&self, payload: Bytes, reliable: bool) -> Result<()> {
        self.bus.deliver(payload, reliable);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Client bundle
// ---------------------------------------------------------------------------

/// A complete simulated host for one client, with the recorders kept
/// reachable for inspection.
pub struct SimClient {
    pub audio: Arc<RecordingAudio>,
    pub objects: Arc<RecordingObjects>,
    pub messenger: Arc<LoopbackMessenger>,
    pub inbox: Option<mpsc::UnboundedReceiver<Bytes>>,
    position: Arc<dyn PositionService>,
}

impl SimClient {
    pub fn attach(bus: &LoopbackBus, position: Arc<dyn PositionService>) -> Self {
        let (messenger, inbox) = bus.attach();
        Self {
            audio: Arc::new(RecordingAudio::new()),
            objects: Arc::new(RecordingObjects::new()),
            messenger,
            inbox: Some(inbox),
            position,
        }
    }

    pub fn services(&self) -> HostServices {
        HostServices {
            position: self.position.clone(),
            audio: self.audio.clone(),
            objects: self.objects.clone(),
            messenger: self.messenger.clone(),
        }
    }

    /// Take the inbox, e.g. to hand it to `FootstepController::spawn_receiver`.
    pub fn take_inbox(&mut self) -> Option<mpsc::UnboundedReceiver<Bytes>> {
        self.inbox.take()
    }
}
