//! Volume fade planning.
//!
//! A fade is a series of absolute volume levels, each followed by the same
//! pause. The plan is pure; sending the levels is up to the caller
//! ([`Device::volume_fade_in`](crate::device::Device::volume_fade_in) for one
//! speaker, the zone coordinator for the group).

use std::time::Duration;

/// Default total fade duration.
pub const DEFAULT_FADE_DURATION: Duration = Duration::from_secs(20);

/// Parameters of a fade towards a target level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeOptions {
    /// Level the fade starts from. Not sent itself.
    pub start: u8,
    /// Total duration spread evenly over the steps.
    pub duration: Duration,
    /// Level change per step. Zero is treated as one.
    pub step: u8,
}

impl Default for FadeOptions {
    fn default() -> Self {
        Self {
            start: 0,
            duration: DEFAULT_FADE_DURATION,
            step: 1,
        }
    }
}

/// Levels and pacing of one fade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadePlan {
    start: u8,
    target: u8,
    step: u32,
    step_count: u32,
    step_duration: Duration,
}

impl FadePlan {
    /// Plans a fade from `options.start` to `target`.
    ///
    /// Works in both directions. The number of steps is
    /// `ceil(|target - start| / step)`; the last step lands exactly on
    /// `target`.
    pub fn new(target: u8, options: &FadeOptions) -> Self {
        let distance = u32::from(target.abs_diff(options.start));
        let step = u32::from(options.step.max(1));
        let step_count = distance.div_ceil(step);
        let step_duration = if step_count == 0 {
            Duration::ZERO
        } else {
            options.duration / step_count
        };

        Self {
            start: options.start,
            target,
            step,
            step_count,
            step_duration,
        }
    }

    /// Number of volume commands the fade sends.
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Pause after each level.
    pub fn step_duration(&self) -> Duration {
        self.step_duration
    }

    /// True when start already equals the target.
    pub fn is_empty(&self) -> bool {
        self.step_count == 0
    }

    pub fn target(&self) -> u8 {
        self.target
    }

    /// The levels to send, in order.
    pub fn levels(&self) -> impl Iterator<Item = u8> + '_ {
        let distance = u32::from(self.target.abs_diff(self.start));
        (1..=self.step_count).map(move |i| {
            let moved = (i * self.step).min(distance) as u8;
            if self.target >= self.start {
                self.start + moved
            } else {
                self.start - moved
            }
        })
    }
}
