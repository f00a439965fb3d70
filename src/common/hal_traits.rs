// src/common/hal_traits.rs

use super::tag::TagId;
use core::fmt::{Debug, Display};
use core::time::Duration;
use std::time::Instant;

/// Abstraction for the clock and blocking delays used by the controller,
/// the command runner and the reader backends.
pub trait Timer {
    /// Monotonic time elapsed since the timer's own origin.
    fn now(&self) -> Duration;

    /// Block for at least `duration`.
    fn delay(&mut self, duration: Duration);
}

/// `Timer` backed by `std::time::Instant` and `std::thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct StdTimer {
    origin: Instant,
}

impl StdTimer {
    pub fn new() -> Self {
        StdTimer { origin: Instant::now() }
    }
}

impl Default for StdTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for StdTimer {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock that only advances when delayed. Every delay is recorded,
/// so tests can assert on the pacing of a run without sleeping.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    elapsed: Duration,
    delays: Vec<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.elapsed += by;
    }

    /// Every delay requested so far, in order.
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Number of recorded delays equal to `duration`.
    pub fn count_of(&self, duration: Duration) -> usize {
        self.delays.iter().filter(|d| **d == duration).count()
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> Duration {
        self.elapsed
    }

    fn delay(&mut self, duration: Duration) {
        self.elapsed += duration;
        self.delays.push(duration);
    }
}

/// Result of one probe of the reader's field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sensed {
    /// Nothing in the field.
    Empty,
    /// A tag and its identifier.
    Tag(TagId),
    /// A target is in the field but reported no identifier.
    Unsupported,
}

impl Sensed {
    /// Whether anything occupies the field.
    pub fn is_present(&self) -> bool {
        !matches!(self, Sensed::Empty)
    }

    /// The identifier, if the target reported one.
    pub fn into_tag(self) -> Option<TagId> {
        match self {
            Sensed::Tag(tag) => Some(tag),
            Sensed::Empty | Sensed::Unsupported => None,
        }
    }
}

/// Capability interface over a physical tag reader.
///
/// "No tag in the field" is a normal `Ok(None)` result; `Err` is reserved for
/// transport-level failures, after which the controller calls `reconnect`
/// until it succeeds.
pub trait TagReader {
    /// Transport error type.
    type Error: Debug + Display;

    /// Probe the field once.
    fn sense(&mut self) -> Result<Sensed, Self::Error>;

    /// Probe the field once and return the identifier of the tag found, if any.
    fn sense_once(&mut self) -> Result<Option<TagId>, Self::Error> {
        self.sense().map(Sensed::into_tag)
    }

    /// Same probe as [`sense`](Self::sense), discarding the identifier. A
    /// target without an identifier still counts as present.
    fn is_present(&mut self) -> Result<bool, Self::Error> {
        self.sense().map(|sensed| sensed.is_present())
    }

    /// (Re)open the underlying device. Called before the first sense and
    /// after every transport error.
    fn reconnect(&mut self) -> Result<(), Self::Error>;

    /// Release the underlying device.
    fn close(&mut self);

    /// Human readable description for log messages, e.g. "pn532 reader on /dev/ttyUSB0".
    fn label(&self) -> String;
}

impl<R: TagReader + ?Sized> TagReader for Box<R> {
    type Error = R::Error;

    fn sense(&mut self) -> Result<Sensed, Self::Error> {
        (**self).sense()
    }

    fn sense_once(&mut self) -> Result<Option<TagId>, Self::Error> {
        (**self).sense_once()
    }

    fn is_present(&mut self) -> Result<bool, Self::Error> {
        (**self).is_present()
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        (**self).reconnect()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn label(&self) -> String {
        (**self).label()
    }
}
