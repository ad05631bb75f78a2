//! Step detection – turns a stream of position samples into discrete steps.

use crate::types::Position;

/// What a single position sample amounted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// First sample: recorded as the baseline, nothing else happens.
    Baseline(Position),
    /// Moved less than the threshold since the baseline. Baseline kept.
    Below { distance: f64 },
    /// Moved at least the threshold. `position` is the new baseline.
    Step { position: Position, distance: f64 },
}

/// Holds the last position at which a step was taken.
///
/// The baseline only ever moves forward: it is set by the first sample and
/// replaced by each qualifying step.
#[derive(Debug, Clone)]
pub struct StepDetector {
    threshold: f64,
    last_position: Option<Position>,
}

impl StepDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_position: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn last_position(&self) -> Option<Position> {
        self.last_position
    }

    pub fn observe(&mut self, position: Position) -> StepOutcome {
        let Some(last) = self.last_position else {
            self.last_position = Some(position);
            return StepOutcome::Baseline(position);
        };

        let distance = position.horizontal_distance(&last);
        if distance.is_nan() || distance < self.threshold {
            return StepOutcome::Below { distance };
        }

        self.last_position = Some(position);
        StepOutcome::Step { position, distance }
    }
}
