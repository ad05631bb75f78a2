//! Core footstep types shared across all modules.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{FootstepError, Result};

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

/// Avatar location in world space. `y` is the vertical (height) axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Euclidean distance on the ground plane (x, z). Height is ignored.
    pub fn horizontal_distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Session identity
// ---------------------------------------------------------------------------

const SESSION_ID_LEN: usize = 10;
const SESSION_ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque per-instance identifier stamped on every outbound footstep so the
/// sender can recognise its own broadcasts when they echo back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Draw a fresh lowercase base-36 id from `rng`, each character uniform.
    pub fn generate(rng: &mut dyn RngCore) -> Self {
        let id = (0..SESSION_ID_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..SESSION_ID_ALPHABET.len());
                char::from(SESSION_ID_ALPHABET[idx])
            })
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStats {
    /// Position samples that returned a value.
    pub samples: u64,
    /// Samples that only established the first baseline.
    pub baselines: u64,
    /// Samples that moved less than the step threshold.
    pub ignored_samples: u64,
    pub steps: u64,
    pub broadcasts: u64,
    /// Fetches that errored or stalled past one poll interval.
    pub fetch_failures: u64,
    /// Effects presented on behalf of other clients.
    pub peer_effects: u64,
    pub echoes_ignored: u64,
    pub malformed_messages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FootstepConfig {
    /// Position sampling cadence in milliseconds.
    pub poll_interval_ms: u64,
    /// Minimum horizontal displacement (world units) that counts as a step.
    pub step_threshold: f64,
    /// Candidate footstep sounds, resolved against `asset_base`.
    pub sound_assets: Vec<String>,
    /// Host asset root. Empty means asset names are passed through as-is.
    pub asset_base: String,
    pub volume: f32,
    /// Audible radius of the spatial sound in world units.
    pub audible_radius: f32,
    /// How far below the feet the ripple decal is placed.
    pub decal_drop: f64,
    pub ripple_duration_ms: u64,
    pub ripple_fps: f32,
    /// Whether peer broadcasts ask the host for reliable delivery.
    pub reliable_broadcast: bool,
}

impl Default for FootstepConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            step_threshold: 1.2,
            sound_assets: (1..=4).map(|i| format!("drip{i}.mp3")).collect(),
            asset_base: String::new(),
            volume: 0.075,
            audible_radius: 10.0,
            decal_drop: 0.1,
            ripple_duration_ms: 1000,
            ripple_fps: 30.0,
            reliable_broadcast: false,
        }
    }
}

impl FootstepConfig {
    /// Layer defaults, an optional TOML/JSON file and `FOOTSTEPS_*`
    /// environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// [`load`](Self::load) with the environment layer read from `vars`
    /// instead of the process environment when given.
    fn load_with_env(
        path: Option<&Path>,
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&FootstepConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let cfg: FootstepConfig = builder
            .add_source(
                config::Environment::with_prefix("FOOTSTEPS")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sound_assets")
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sound_assets.is_empty() {
            return Err(FootstepError::NoSoundAssets);
        }
        if self.poll_interval_ms == 0 {
            return Err(FootstepError::InvalidConfig(
                "poll_interval_ms must be positive".into(),
            ));
        }
        if !self.step_threshold.is_finite() || self.step_threshold <= 0.0 {
            return Err(FootstepError::InvalidConfig(
                "step_threshold must be finite and positive".into(),
            ));
        }
        if self.ripple_fps.is_nan() || self.ripple_fps <= 0.0 {
            return Err(FootstepError::InvalidConfig(
                "ripple_fps must be positive".into(),
            ));
        }
        self.frame_interval()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ripple_duration(&self) -> Duration {
        Duration::from_millis(self.ripple_duration_ms)
    }

    /// Delay between ripple frames (~33ms at 30fps).
    pub fn frame_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f32(1.0 / self.ripple_fps).map_err(|e| {
            FootstepError::InvalidConfig(format!(
                "ripple_fps {} is unusable: {}",
                self.ripple_fps, e
            ))
        })
    }

    /// Sound asset references with `asset_base` applied.
    pub fn resolved_sounds(&self) -> Vec<String> {
        let base = self.asset_base.trim_end_matches('/');
        self.sound_assets
            .iter()
            .map(|name| {
                if base.is_empty() {
                    name.clone()
                } else {
                    format!("{base}/{name}")
                }
            })
            .collect()
    }
}
