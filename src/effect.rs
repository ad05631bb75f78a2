//! EffectPresenter – plays a footstep sound and drives one ripple decal.

use log::{debug, warn};
use parking_lot::Mutex;
use rand::{Rng, RngCore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{FootstepError, Result};
use crate::host::{AudioService, ObjectDescriptor, ObjectService, ObjectUpdate, PlaybackOptions};
use crate::ripple::RippleAnimation;
use crate::types::{FootstepConfig, Position};

/// Random source shared between session-id generation and sound selection.
pub type SharedRng = Arc<Mutex<Box<dyn RngCore + Send>>>;

pub fn shared_rng(rng: impl RngCore + Send + 'static) -> SharedRng {
    Arc::new(Mutex::new(Box::new(rng)))
}

pub struct EffectPresenter {
    audio: Arc<dyn AudioService>,
    objects: Arc<dyn ObjectService>,
    sounds: Vec<String>,
    volume: f32,
    audible_radius: f32,
    decal_drop: f64,
    ripple_duration: Duration,
    frame_interval: Duration,
    rng: SharedRng,
}

impl EffectPresenter {
    pub fn new(
        config: &FootstepConfig,
        audio: Arc<dyn AudioService>,
        objects: Arc<dyn ObjectService>,
        rng: SharedRng,
    ) -> Result<Self> {
        let sounds = config.resolved_sounds();
        if sounds.is_empty() {
            return Err(FootstepError::NoSoundAssets);
        }

        Ok(Self {
            audio,
            objects,
            sounds,
            volume: config.volume,
            audible_radius: config.audible_radius,
            decal_drop: config.decal_drop,
            ripple_duration: config.ripple_duration(),
            frame_interval: config.frame_interval()?,
            rng,
        })
    }

    pub fn sounds(&self) -> &[String] {
        &self.sounds
    }

    /// Ask the host to preload every candidate sound. Failures are logged;
    /// the asset is simply loaded lazily on first play.
    pub async fn preload(&self) {
        for sound in &self.sounds {
            if let Err(e) = self.audio.preload(sound).await {
                warn!("Failed to preload {}: {}", sound, e);
            }
        }
    }

    /// Uniformly random pick from the candidate sounds.
    pub fn pick_sound(&self) -> &str {
        let idx = self.rng.lock().gen_range(0..self.sounds.len());
        &self.sounds[idx]
    }

    /// Play a sound and run a full ripple at `position`.
    ///
    /// Resolves once the decal has been removed.
    pub async fn present(&self, position: Position) -> Result<()> {
        let sound = self.pick_sound();
        let options = PlaybackOptions::at(position, self.volume, self.audible_radius);
        if let Err(e) = self.audio.play(sound, options).await {
            warn!("Failed to play {} at {}: {}", sound, position, e);
        }

        let handle = self
            .objects
            .create(ObjectDescriptor::ripple_at(position, self.decal_drop))
            .await?;
        debug!("Ripple {} spawned at {}", handle, position);

        let started = Instant::now();
        let mut ripple = RippleAnimation::start(self.ripple_duration, Duration::ZERO);
        while let Some(frame) = ripple.advance(started.elapsed()) {
            let update = ObjectUpdate {
                scale: frame.scale,
                opacity: frame.opacity,
            };
            if let Err(e) = self.objects.update(&handle, update).await {
                debug!("Ripple {} frame update failed: {}", handle, e);
            }
            tokio::time::sleep(self.frame_interval).await;
        }

        self.objects.remove(&handle).await
    }

    /// Run [`present`](Self::present) as an independent task.
    pub fn spawn(self: &Arc<Self>, position: Position) -> JoinHandle<()> {
        let presenter = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = presenter.present(position).await {
                warn!("Footstep effect at {} failed: {}", position, e);
            }
        })
    }
}
