//! Scheduler parameters and configuration
//!
//! Controls the review intervals and easiness bounds used by the SM-2 style
//! scheduler, plus the answer-time thresholds used to grade an answer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schedule::sm2::{EASINESS_STEP, MAX_EASINESS_STEPS};

/// Spaced-repetition parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerParams {
    /// Easiness given to an entry when it first becomes learnable
    pub initial_easiness: f64,

    /// Easiness floor
    pub min_easiness: f64,

    /// Easiness ceiling (must fit the 11-bit packed field)
    pub max_easiness: f64,

    /// Interval after the first correct answer, in minutes
    pub first_interval_minutes: u32,

    /// Base interval multiplied by easiness^(c-2), in minutes
    pub base_interval_minutes: u32,

    /// Longest interval ever scheduled, in days
    pub max_interval_days: u32,

    /// Answers faster than this grade 5
    pub fast_answer_secs: u64,

    /// Answers faster than this (but not fast) grade 4
    pub slow_answer_secs: u64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            initial_easiness: 2.5,
            min_easiness: 1.0,
            max_easiness: 1.0 + MAX_EASINESS_STEPS as f64 * EASINESS_STEP, // 3.047
            first_interval_minutes: 240,
            base_interval_minutes: 1440,
            max_interval_days: 365,
            fast_answer_secs: 30,
            slow_answer_secs: 60,
        }
    }
}

impl SchedulerParams {
    /// Create new params with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the easiness of newly learnable entries
    pub fn initial_easiness(mut self, easiness: f64) -> Self {
        self.initial_easiness = easiness;
        self
    }

    /// Set the interval after the first correct answer
    pub fn first_interval(mut self, minutes: u32) -> Self {
        self.first_interval_minutes = minutes;
        self
    }

    /// Set the base interval
    pub fn base_interval(mut self, minutes: u32) -> Self {
        self.base_interval_minutes = minutes;
        self
    }

    /// Set the maximum interval in days
    pub fn max_interval_days(mut self, days: u32) -> Self {
        self.max_interval_days = days;
        self
    }

    /// Set the answer-time thresholds in seconds
    pub fn answer_thresholds(mut self, fast_secs: u64, slow_secs: u64) -> Self {
        self.fast_answer_secs = fast_secs;
        self.slow_answer_secs = slow_secs;
        self
    }

    pub fn max_interval_minutes(&self) -> f64 {
        self.base_interval_minutes as f64 * self.max_interval_days as f64
    }

    /// Reject bounds the packed weight field cannot represent.
    pub fn validate(&self) -> Result<()> {
        let ceiling = 1.0 + MAX_EASINESS_STEPS as f64 * EASINESS_STEP;
        if self.min_easiness < 1.0 || self.max_easiness > ceiling + 1e-9 {
            return Err(Error::Config(format!(
                "easiness bounds [{}, {}] outside [1.0, {ceiling}]",
                self.min_easiness, self.max_easiness
            )));
        }
        if self.min_easiness > self.max_easiness {
            return Err(Error::Config("min_easiness exceeds max_easiness".into()));
        }
        if !(self.min_easiness..=self.max_easiness).contains(&self.initial_easiness) {
            return Err(Error::Config(format!(
                "initial_easiness {} outside bounds",
                self.initial_easiness
            )));
        }
        if self.fast_answer_secs > self.slow_answer_secs {
            return Err(Error::Config(
                "fast_answer_secs exceeds slow_answer_secs".into(),
            ));
        }
        Ok(())
    }
}
