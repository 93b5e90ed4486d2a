//! Time-based rate limiting for drag sampling.
//!
//! Nothing here reads the wall clock directly; every limiter takes `now`
//! from a [`Clock`], so tests drive time with a [`VirtualClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic time since an arbitrary origin.
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<Duration>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Lets at most one sample through per `interval`.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: Duration,
    last: Option<Duration>,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True if a sample may be taken at `now`; records it if so.
    pub fn ready(&mut self, now: Duration) -> bool {
        match self.last {
            Some(last) if now.saturating_sub(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Holds back a new value until it has been offered unchanged for `delay`.
///
/// Clearing (offering `None`) takes effect immediately; only a change to a
/// new value waits.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Duration)>,
    settled: Option<T>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            settled: None,
        }
    }

    /// Feed the latest raw value and return the settled one.
    pub fn update(&mut self, value: Option<T>, now: Duration) -> Option<&T> {
        match value {
            None => {
                self.pending = None;
                self.settled = None;
            }
            Some(v) if self.settled.as_ref() == Some(&v) => {
                self.pending = None;
            }
            Some(v) => {
                let unchanged = matches!(&self.pending, Some((p, _)) if *p == v);
                if !unchanged {
                    self.pending = Some((v, now));
                }
            }
        }
        self.poll(now)
    }

    /// Promote the pending value if it has been stable long enough.
    pub fn poll(&mut self, now: Duration) -> Option<&T> {
        let stable = matches!(
            &self.pending,
            Some((_, since)) if now.saturating_sub(*since) >= self.delay
        );
        if stable {
            self.settled = self.pending.take().map(|(v, _)| v);
        }
        self.settled.as_ref()
    }

    pub fn settled(&self) -> Option<&T> {
        self.settled.as_ref()
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.settled = None;
    }
}
