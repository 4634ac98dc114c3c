//! Reveal animation timing.
//!
//! A cell scrambles through random glyphs until its reveal duration runs out.
//! Frame gaps grow linearly with elapsed time so the scramble slows down
//! before the final symbol lands.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

/// Longest reveal or frame gap a config may ask for (ms).
pub const MAX_REVEAL_MS: f64 = 600_000.0;
/// Shortest non-zero first frame gap (ms). Keeps the frame count of a reveal bounded.
pub const MIN_FRAME_GAP_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimingProfile {
    #[default]
    Normal,
    /// Quarter-length reveals.
    Turbo,
    /// No animation, every cell resolves immediately.
    Instant,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub profile: TimingProfile,
    /// Lower clamp of a cell's reveal duration (ms).
    pub min_reveal_ms: f64,
    /// A cell's duration is `max(min_reveal_ms, u * max_reveal_ms)`, `u` uniform in `[0, 1)`.
    pub max_reveal_ms: f64,
    /// Gap before the second frame (ms).
    pub first_frame_gap_ms: f64,
    /// Extra gap reached once the duration has fully elapsed (ms).
    pub frame_gap_growth_ms: f64,
}

impl TimingConfig {
    pub fn normal() -> Self {
        Self {
            profile: TimingProfile::Normal,
            min_reveal_ms: 2000.0,
            max_reveal_ms: 3000.0,
            first_frame_gap_ms: 10.0,
            frame_gap_growth_ms: 100.0,
        }
    }

    pub fn turbo() -> Self {
        Self {
            profile: TimingProfile::Turbo,
            ..Self::normal().scaled(0.25)
        }
    }

    pub fn instant() -> Self {
        Self {
            profile: TimingProfile::Instant,
            min_reveal_ms: 0.0,
            max_reveal_ms: 0.0,
            first_frame_gap_ms: 0.0,
            frame_gap_growth_ms: 0.0,
        }
    }

    pub fn from_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Normal | TimingProfile::Custom => Self::normal(),
            TimingProfile::Turbo => Self::turbo(),
            TimingProfile::Instant => Self::instant(),
        }
    }

    /// Scale every duration by `factor` (< 1.0 = faster).
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            profile: TimingProfile::Custom,
            min_reveal_ms: self.min_reveal_ms * factor,
            max_reveal_ms: self.max_reveal_ms * factor,
            first_frame_gap_ms: self.first_frame_gap_ms * factor,
            frame_gap_growth_ms: self.frame_gap_growth_ms * factor,
        }
    }

    pub fn reveal_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_reveal_ms <= 0.0 {
            return millis(self.min_reveal_ms);
        }
        let u: f64 = rng.gen();
        millis((u * self.max_reveal_ms).max(self.min_reveal_ms))
    }

    /// Gap after a frame shown at `elapsed` into a reveal of `duration`.
    pub fn frame_gap(&self, elapsed: Duration, duration: Duration) -> Duration {
        let progress = if duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f64() / duration.as_secs_f64()
        };
        millis(progress * self.frame_gap_growth_ms + self.first_frame_gap_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("min_reveal_ms", self.min_reveal_ms),
            ("max_reveal_ms", self.max_reveal_ms),
            ("first_frame_gap_ms", self.first_frame_gap_ms),
            ("frame_gap_growth_ms", self.frame_gap_growth_ms),
        ];
        for (name, value) in fields {
            if !(0.0..=MAX_REVEAL_MS).contains(&value) {
                return Err(SlotError::invalid(format!(
                    "timing.{name} must be within 0..={MAX_REVEAL_MS}, got {value}"
                )));
            }
        }
        if self.max_reveal_ms > 0.0 && self.min_reveal_ms > self.max_reveal_ms {
            return Err(SlotError::invalid(format!(
                "timing.min_reveal_ms {} exceeds max_reveal_ms {}",
                self.min_reveal_ms, self.max_reveal_ms
            )));
        }
        if self.first_frame_gap_ms > 0.0 && self.first_frame_gap_ms < MIN_FRAME_GAP_MS {
            return Err(SlotError::invalid(format!(
                "timing.first_frame_gap_ms must be 0 or at least {MIN_FRAME_GAP_MS}"
            )));
        }
        Ok(())
    }

    /// Offsets of the scramble frames of one reveal. Empty for zero-length
    /// reveals or a config whose gaps would never advance time.
    pub fn frame_offsets(&self, duration: Duration) -> Vec<Duration> {
        let mut offsets = Vec::new();
        if duration.is_zero() || self.first_frame_gap_ms <= 0.0 {
            return offsets;
        }
        let mut elapsed = Duration::ZERO;
        while elapsed < duration {
            offsets.push(elapsed);
            let gap = self.frame_gap(elapsed, duration);
            if gap.is_zero() {
                break;
            }
            elapsed += gap;
        }
        offsets
    }
}

// NaN and out-of-range values collapse into 0..=MAX_REVEAL_MS.
fn millis(ms: f64) -> Duration {
    Duration::try_from_secs_f64(ms.clamp(0.0, MAX_REVEAL_MS) / 1000.0).unwrap_or(Duration::ZERO)
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::normal()
    }
}
