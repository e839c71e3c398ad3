//! Frame-completeness classification.
//!
//! The expected sensor-ID set is auto-detected from recently observed IDs
//! and refreshed periodically, so a sensor that powers off stops being
//! "expected" within one refresh interval instead of marking every later
//! frame partial forever.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use contracts::{FrameCompleteness, QualityConfig};
use tracing::debug;

#[derive(Debug, Default)]
struct CategoryRate {
    hz: f64,
    last_at: Option<Instant>,
}

impl CategoryRate {
    fn observe(&mut self, now: Instant, alpha: f64) {
        if let Some(prev) = self.last_at {
            let dt = now.duration_since(prev).as_secs_f64();
            if dt > 0.0 {
                let instantaneous = 1.0 / dt;
                self.hz = alpha * instantaneous + (1.0 - alpha) * self.hz;
            }
        }
        self.last_at = Some(now);
    }

    /// Current estimate, halving per silence period once the timeout has
    /// elapsed so a stopped stream reads as (near) zero.
    fn current(&self, now: Instant, silence: Duration) -> f64 {
        let Some(last) = self.last_at else {
            return 0.0;
        };
        let elapsed = now.duration_since(last);
        if elapsed <= silence {
            return self.hz;
        }
        let periods = (elapsed - silence).as_secs_f64() / silence.as_secs_f64().max(1e-3);
        self.hz * 0.5f64.powf(periods)
    }

    fn reset(&mut self) {
        self.hz = 0.0;
        self.last_at = None;
    }
}

/// Classifies delivered frames as synced / partial / empty.
#[derive(Debug)]
pub struct CompletenessTracker {
    /// Last time each sensor ID appeared in a delivered frame
    seen: BTreeMap<u8, Instant>,
    expected: Vec<u8>,
    last_refresh: Option<Instant>,
    synced: CategoryRate,
    partial: CategoryRate,
    refresh_interval: Duration,
    silence: Duration,
    ema_alpha: f64,
}

impl CompletenessTracker {
    /// Create a tracker with the configured refresh interval and smoothing.
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            seen: BTreeMap::new(),
            expected: Vec::new(),
            last_refresh: None,
            synced: CategoryRate::default(),
            partial: CategoryRate::default(),
            refresh_interval: config.expected_refresh(),
            silence: config.silence_timeout(),
            ema_alpha: config.ema_alpha,
        }
    }

    /// Classify one delivered frame's valid sensor IDs.
    pub fn classify(&mut self, valid_ids: &[u8], now: Instant) -> FrameCompleteness {
        for &id in valid_ids {
            self.seen.insert(id, now);
        }
        self.maybe_refresh(now);

        if valid_ids.is_empty() {
            return FrameCompleteness::Empty;
        }

        let complete = self
            .expected
            .iter()
            .all(|id| valid_ids.contains(id));
        if complete {
            self.synced.observe(now, self.ema_alpha);
            FrameCompleteness::Synced
        } else {
            self.partial.observe(now, self.ema_alpha);
            FrameCompleteness::Partial
        }
    }

    /// Currently expected sensor IDs (sorted).
    pub fn expected_ids(&self) -> &[u8] {
        &self.expected
    }

    /// Smoothed rate of complete frames.
    pub fn synced_hz(&self, now: Instant) -> f64 {
        self.synced.current(now, self.silence)
    }

    /// Smoothed rate of partial frames.
    pub fn partial_hz(&self, now: Instant) -> f64 {
        self.partial.current(now, self.silence)
    }

    /// Clear all state (session boundary).
    pub fn reset(&mut self) {
        self.seen.clear();
        self.expected.clear();
        self.last_refresh = None;
        self.synced.reset();
        self.partial.reset();
    }

    fn maybe_refresh(&mut self, now: Instant) {
        let due = self
            .last_refresh
            .is_none_or(|at| now.duration_since(at) >= self.refresh_interval);
        if !due {
            return;
        }
        self.last_refresh = Some(now);

        let horizon = self.refresh_interval;
        self.seen
            .retain(|_, &mut last| now.duration_since(last) <= horizon);
        let refreshed: Vec<u8> = self.seen.keys().copied().collect();
        if refreshed != self.expected {
            debug!(?refreshed, previous = ?self.expected, "expected sensor set refreshed");
            self.expected = refreshed;
        }
    }
}
