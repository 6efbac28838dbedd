//! SM-2 style review scheduling
//!
//! A blend of SuperMemo's SM-2 with short fixed starting intervals. The
//! schedule of a record is the triple (easiness, consecutive correct answers,
//! next due time in minutes since the Unix epoch), bit-packed into the
//! record's weight and learn fields:
//!
//! weight = (easiness_steps << 4) | consecutive, learn = due
//!
//! where easiness_steps = round((easiness - 1) / 0.001) fits 11 bits.

use std::time::Duration;

use crate::schedule::params::SchedulerParams;

pub const EASINESS_STEP: f64 = 0.001;
pub const MAX_EASINESS_STEPS: u16 = 2047;
pub const MAX_CONSECUTIVE: u8 = 15;

/// Answer quality, 0 (forgotten) to 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const PERFECT: Quality = Quality(5);

    /// Clamps to 5.
    pub fn new(q: u8) -> Self {
        Quality(q.min(5))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Grade an answer from the wrong attempts before it and the time it took.
    ///
    /// More than two misses grades 0, two grades 1, one grades 2. A clean answer
    /// grades 5 under 30s, 4 under 60s, 3 otherwise.
    pub fn from_attempt(incorrect: u32, elapsed: Duration) -> Self {
        Self::from_attempt_with(incorrect, elapsed, &SchedulerParams::default())
    }

    pub fn from_attempt_with(incorrect: u32, elapsed: Duration, params: &SchedulerParams) -> Self {
        let q = match incorrect {
            0 if elapsed.as_secs_f64() < params.fast_answer_secs as f64 => 5,
            0 if elapsed.as_secs_f64() < params.slow_answer_secs as f64 => 4,
            0 => 3,
            1 => 2,
            2 => 1,
            _ => 0,
        };
        Quality(q)
    }

    pub fn is_pass(self) -> bool {
        self.0 >= 3
    }
}

/// Schedule state of one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerTriple {
    pub easiness: f64,
    pub consecutive: u8,
    /// Next review, minutes since the Unix epoch
    pub due: u32,
}

impl SchedulerTriple {
    pub fn new(easiness: f64, consecutive: u8, due: u32) -> Self {
        Self {
            easiness,
            consecutive,
            due,
        }
    }

    /// State of an entry that just became learnable: due immediately.
    pub fn fresh(params: &SchedulerParams, now_minutes: u32) -> Self {
        Self::new(params.initial_easiness, 0, now_minutes)
    }

    pub fn pack(&self) -> (u16, u32) {
        let steps = ((self.easiness - 1.0) / EASINESS_STEP).round();
        let steps = steps.clamp(0.0, MAX_EASINESS_STEPS as f64) as u16;
        let consecutive = u16::from(self.consecutive.min(MAX_CONSECUTIVE));
        ((steps << 4) | consecutive, self.due)
    }

    pub fn unpack(weight: u16, learn: u32) -> Self {
        let steps = weight >> 4;
        Self {
            easiness: 1.0 + steps as f64 * EASINESS_STEP,
            consecutive: (weight & 0xF) as u8,
            due: learn,
        }
    }

    pub fn update(&self, quality: Quality, now_minutes: u32) -> Self {
        self.update_with(quality, now_minutes, &SchedulerParams::default())
    }

    /// Apply one graded answer.
    ///
    /// A failed answer resets the streak and leaves `due` untouched, so the
    /// entry stays due.
    pub fn update_with(&self, quality: Quality, now_minutes: u32, params: &SchedulerParams) -> Self {
        let miss = f64::from(5 - quality.get());
        let easiness = (self.easiness + 0.1 - miss * (0.08 + miss * 0.02))
            .clamp(params.min_easiness, params.max_easiness);

        let consecutive = if quality.is_pass() {
            self.consecutive.saturating_add(1).min(MAX_CONSECUTIVE)
        } else {
            0
        };

        let now = f64::from(now_minutes);
        let due = if quality.is_pass() && consecutive >= 2 {
            let interval = params.base_interval_minutes as f64
                * easiness.powi(i32::from(consecutive) - 2);
            saturate(now + interval.min(params.max_interval_minutes()))
        } else if consecutive == 1 {
            saturate(now + f64::from(params.first_interval_minutes))
        } else {
            self.due
        };

        Self {
            easiness,
            consecutive,
            due,
        }
    }
}

fn saturate(minutes: f64) -> u32 {
    if minutes >= u32::MAX as f64 {
        log::warn!("due time {minutes} overflows the learn field, clamping");
        u32::MAX
    } else {
        minutes as u32
    }
}

/// Free-function form of [`SchedulerTriple::update`] over a bare triple.
pub fn update(e: f64, c: u8, n: u32, quality: Quality, now_minutes: u32) -> (f64, u8, u32) {
    let next = SchedulerTriple::new(e, c, n).update(quality, now_minutes);
    (next.easiness, next.consecutive, next.due)
}

pub fn pack(e: f64, c: u8, n: u32) -> (u16, u32) {
    SchedulerTriple::new(e, c, n).pack()
}

pub fn unpack(weight: u16, learn: u32) -> (f64, u8, u32) {
    let t = SchedulerTriple::unpack(weight, learn);
    (t.easiness, t.consecutive, t.due)
}

/// Current wall-clock time in minutes since the Unix epoch.
pub fn now_minutes() -> u32 {
    let minutes = chrono::Utc::now().timestamp() / 60;
    u32::try_from(minutes.max(0)).unwrap_or(u32::MAX)
}
