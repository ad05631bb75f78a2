//! Ripple decal animation as an explicit timed state machine.
//!
//! A ripple grows from scale 0 to 1 while fading from opacity 1 to 0 over a
//! fixed duration. The driver feeds it elapsed time; the machine owns the
//! decision of when it is finished, so tests can seek to any instant.

use std::time::Duration;

/// Values pushed to the decal for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleFrame {
    /// Elapsed fraction of the animation, clamped to `[0, 1]`.
    pub progress: f32,
    pub scale: f32,
    pub opacity: f32,
}

impl RippleFrame {
    pub fn at(progress: f32) -> Self {
        let progress = progress.clamp(0.0, 1.0);
        Self {
            progress,
            scale: progress,
            opacity: 1.0 - progress,
        }
    }

    pub fn is_final(&self) -> bool {
        self.progress >= 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RippleState {
    /// Animating; `started_at` is the elapsed offset the animation began at.
    Running { started_at: Duration },
    Completed,
}

#[derive(Debug, Clone)]
pub struct RippleAnimation {
    duration: Duration,
    state: RippleState,
}

impl RippleAnimation {
    /// Start an animation at `started_at` on the caller's clock.
    pub fn start(duration: Duration, started_at: Duration) -> Self {
        Self {
            duration,
            state: RippleState::Running { started_at },
        }
    }

    pub fn state(&self) -> RippleState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == RippleState::Completed
    }

    /// Frame for clock reading `now`.
    ///
    /// Returns `None` once completed. The frame that reaches progress 1 is
    /// still returned and moves the machine to [`RippleState::Completed`].
    pub fn advance(&mut self, now: Duration) -> Option<RippleFrame> {
        let RippleState::Running { started_at } = self.state else {
            return None;
        };

        let elapsed = now.saturating_sub(started_at);
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f32() / self.duration.as_secs_f32()
        };

        let frame = RippleFrame::at(progress);
        if frame.is_final() {
            self.state = RippleState::Completed;
        }
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_millis(1000);

    #[test]
    fn scale_and_opacity_follow_progress() {
        for f in [0.0f32, 0.25, 0.5, 0.75, 1.0] {
            let frame = RippleFrame::at(f);
            assert_eq!(frame.scale, f);
            assert_eq!(frame.opacity, 1.0 - f);
        }
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(RippleFrame::at(-0.5).progress, 0.0);
        assert_eq!(RippleFrame::at(3.0).progress, 1.0);
    }

    #[test]
    fn starts_invisible() {
        let mut anim = RippleAnimation::start(SECOND, Duration::ZERO);
        let first = anim.advance(Duration::ZERO).unwrap();
        assert_eq!(first.scale, 0.0);
        assert_eq!(first.opacity, 1.0);
        assert!(!anim.is_completed());
    }

    #[test]
    fn half_way_is_half_scale() {
        let start = Duration::from_millis(250);
        let mut anim = RippleAnimation::start(SECOND, start);
        let frame = anim.advance(start + Duration::from_millis(500)).unwrap();
        assert!((frame.scale - 0.5).abs() < 1e-6);
        assert!((frame.opacity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn completes_at_duration_then_yields_nothing() {
        let mut anim = RippleAnimation::start(SECOND, Duration::ZERO);
        let last = anim.advance(Duration::from_millis(1200)).unwrap();
        assert!(last.is_final());
        assert_eq!(last.scale, 1.0);
        assert_eq!(last.opacity, 0.0);
        assert_eq!(anim.state(), RippleState::Completed);
        assert!(anim.advance(Duration::from_millis(1300)).is_none());
    }

    #[test]
    fn clock_before_start_reads_as_zero() {
        let mut anim = RippleAnimation::start(SECOND, Duration::from_millis(500));
        assert_eq!(anim.advance(Duration::ZERO).unwrap().progress, 0.0);
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let mut anim = RippleAnimation::start(Duration::ZERO, Duration::ZERO);
        assert!(anim.advance(Duration::ZERO).unwrap().is_final());
        assert!(anim.is_completed());
    }
}
