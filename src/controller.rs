//! FootstepController – samples the avatar, detects steps, shares them.
//!
//! ## Lifecycle
//!
//! 1. [`FootstepController::initialize`] draws a session id, preloads sounds.
//! 2. [`FootstepController::run`] samples the avatar every poll interval.
//! 3. [`FootstepController::spawn_receiver`] renders steps from other clients.
//!
//! Each effect runs as its own task, so sampling never waits on a ripple and
//! overlapping ripples never share state.

use bytes::Bytes;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::RngCore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::effect::{shared_rng, EffectPresenter};
use crate::error::{FootstepError, Result};
use crate::host::{HostServices, PeerMessenger, PositionService};
use crate::protocol::{FootstepEvent, PeerMessage};
use crate::step::{StepDetector, StepOutcome};
use crate::types::{ControllerStats, FootstepConfig, Position, SessionId};

/// What the controller did with one inbound peer payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome {
    /// Effect started at this position.
    Presented(Position),
    /// Our own broadcast came back.
    SelfEcho,
    /// Well-formed but not a footstep.
    Ignored,
    Malformed,
}

pub struct FootstepController {
    config: FootstepConfig,
    session_id: SessionId,
    detector: Mutex<StepDetector>,
    stats: Mutex<ControllerStats>,
    presenter: Arc<EffectPresenter>,
    position: Arc<dyn PositionService>,
    messenger: Arc<dyn PeerMessenger>,
}

impl FootstepController {
    /// Validate `config`, draw a session id from `rng` and preload sounds.
    ///
    /// `rng` is kept for sound selection; seed it for reproducible runs.
    pub async fn initialize(
        config: FootstepConfig,
        host: HostServices,
        rng: impl RngCore + Send + 'static,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let rng = shared_rng(rng);
        let session_id = SessionId::generate(&mut **rng.lock());
        let presenter = Arc::new(EffectPresenter::new(
            &config,
            host.audio,
            host.objects,
            rng,
        )?);
        presenter.preload().await;

        info!(
            "Footstep controller '{}' ready ({} sounds, threshold {}, every {}ms)",
            session_id,
            presenter.sounds().len(),
            config.step_threshold,
            config.poll_interval_ms,
        );

        Ok(Arc::new(Self {
            detector: Mutex::new(StepDetector::new(config.step_threshold)),
            stats: Mutex::new(ControllerStats::default()),
            config,
            session_id,
            presenter,
            position: host.position,
            messenger: host.messenger,
        }))
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn config(&self) -> &FootstepConfig {
        &self.config
    }

    pub fn last_position(&self) -> Option<Position> {
        self.detector.lock().last_position()
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats.lock().clone()
    }

    // -----------------------------------------------------------------------
    // Sampling
    // -----------------------------------------------------------------------

    /// Run one sample cycle.
    ///
    /// A fetch that errors, outlives one poll interval or yields a
    /// non-finite position is returned as an error and leaves the baseline
    /// untouched.
    pub async fn sample(&self) -> Result<StepOutcome> {
        let position = match self.fetch_position().await {
            Ok(p) => p,
            Err(e) => {
                self.stats.lock().fetch_failures += 1;
                debug!("Skipping sample cycle: {}", e);
                return Err(e);
            }
        };

        let outcome = self.detector.lock().observe(position);
        {
            let mut stats = self.stats.lock();
            stats.samples += 1;
            match outcome {
                StepOutcome::Baseline(_) => stats.baselines += 1,
                StepOutcome::Below { .. } => stats.ignored_samples += 1,
                StepOutcome::Step { .. } => stats.steps += 1,
            }
        }

        if let StepOutcome::Step { position, distance } = outcome {
            debug!("Step of {:.2} to {}", distance, position);
            self.presenter.spawn(position);
            self.broadcast(FootstepEvent::new(self.session_id.clone(), position))
                .await;
        }

        Ok(outcome)
    }

    async fn fetch_position(&self) -> Result<Position> {
        let limit = self.config.poll_interval();
        let position = tokio::time::timeout(limit, self.position.position())
            .await
            .map_err(|_| FootstepError::PositionTimeout(limit))??;
        if !position.is_finite() {
            return Err(FootstepError::NonFinitePosition(position));
        }
        Ok(position)
    }

    async fn broadcast(&self, event: FootstepEvent) {
        let payload = match event.encode() {
            Ok(p) => Bytes::from(p),
            Err(e) => {
                warn!("Failed to encode footstep: {}", e);
                return;
            }
        };

        match self
            .messenger
            .send(payload, self.config.reliable_broadcast)
            .await
        {
            Ok(()) => self.stats.lock().broadcasts += 1,
            Err(e) => warn!("Failed to broadcast footstep: {}", e),
        }
    }

    /// Sample forever at the configured cadence. Never returns on its own;
    /// drop or abort the task to stop it.
    pub async fn run(self: Arc<Self>) {
        let mut timer = tokio::time::interval(self.config.poll_interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            timer.tick().await;
            let _ = self.sample().await;
        }
    }

    // -----------------------------------------------------------------------
    // Peer events
    // -----------------------------------------------------------------------

    /// Decode and handle one raw peer payload.
    pub fn receive(&self, payload: &[u8]) -> ReceiveOutcome {
        let message = match PeerMessage::decode(payload) {
            Ok(m) => m,
            Err(e) => {
                self.stats.lock().malformed_messages += 1;
                debug!("Dropping malformed peer message: {}", e);
                return ReceiveOutcome::Malformed;
            }
        };

        if message.instance_id == self.session_id {
            self.stats.lock().echoes_ignored += 1;
            return ReceiveOutcome::SelfEcho;
        }

        match message.into_footstep() {
            Some(event) => self.handle_event(event),
            None => ReceiveOutcome::Ignored,
        }
    }

    /// Render a footstep from another client. Never touches the baseline and
    /// never re-broadcasts.
    pub fn handle_event(&self, event: FootstepEvent) -> ReceiveOutcome {
        if event.is_from(&self.session_id) {
            self.stats.lock().echoes_ignored += 1;
            return ReceiveOutcome::SelfEcho;
        }

        self.stats.lock().peer_effects += 1;
        self.presenter.spawn(event.position);
        ReceiveOutcome::Presented(event.position)
    }

    /// Route every payload from `inbox` through [`receive`](Self::receive)
    /// until the sending side closes.
    pub fn spawn_receiver(
        self: &Arc<Self>,
        mut inbox: mpsc::UnboundedReceiver<Bytes>,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(payload) = inbox.recv().await {
                controller.receive(&payload);
            }
            debug!("Peer inbox for '{}' closed", controller.session_id);
        })
    }
}
