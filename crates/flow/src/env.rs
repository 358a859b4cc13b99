//! Clock and randomness used when minting bookings and tickets.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use rand::Rng;

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of uniformly distributed integers.
pub trait IdSource: Send + Sync + fmt::Debug {
    /// A value in `[0, upper)`. Returns 0 when `upper` is 0.
    fn below(&self, upper: u64) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngIds;

impl IdSource for ThreadRngIds {
    fn below(&self, upper: u64) -> u64 {
        if upper == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Replays a fixed list of values, wrapping around at the end.
#[derive(Debug, Default)]
pub struct SequenceIds {
    values: Vec<u64>,
    next: AtomicUsize,
}

impl SequenceIds {
    pub fn new(values: impl Into<Vec<u64>>) -> Self {
        Self {
            values: values.into(),
            next: AtomicUsize::new(0),
        }
    }
}

impl IdSource for SequenceIds {
    fn below(&self, upper: u64) -> u64 {
        if upper == 0 || self.values.is_empty() {
            return 0;
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values.get(i).copied().unwrap_or_default() % upper
    }
}
