// src/reader/fake.rs

use crate::common::{
    hal_traits::{Sensed, TagReader},
    tag::TagId,
};
use std::collections::VecDeque;

/// One scripted answer of the fake reader's probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Tag(TagId),
    Empty,
    /// A target with no identifier.
    Unsupported,
    /// Transport failure.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("simulated transport failure")]
pub struct FakeTransportError;

/// Scripted reader used in tests.
///
/// `sense_once` and `is_present` share one probe script, like a real reader
/// sharing one RF poll. An exhausted script reads as an empty field.
#[derive(Debug, Default)]
pub struct FakeReader {
    script: VecDeque<Probe>,
    reconnect_failures: u32,
    probes: usize,
    reconnect_attempts: u32,
    open: bool,
    closed: bool,
}

impl FakeReader {
    pub fn new(script: impl IntoIterator<Item = Probe>) -> Self {
        FakeReader {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Makes the next `count` reconnect attempts fail.
    pub fn fail_reconnects(mut self, count: u32) -> Self {
        self.reconnect_failures = count;
        self
    }

    pub fn probes(&self) -> usize {
        self.probes
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn next_probe(&mut self) -> Result<Sensed, FakeTransportError> {
        self.probes += 1;
        match self.script.pop_front() {
            Some(Probe::Tag(tag)) => Ok(Sensed::Tag(tag)),
            Some(Probe::Unsupported) => Ok(Sensed::Unsupported),
            Some(Probe::Empty) | None => Ok(Sensed::Empty),
            Some(Probe::Fail) => {
                self.open = false;
                Err(FakeTransportError)
            }
        }
    }
}

impl TagReader for FakeReader {
    type Error = FakeTransportError;

    fn sense(&mut self) -> Result<Sensed, FakeTransportError> {
        self.next_probe()
    }

    fn reconnect(&mut self) -> Result<(), FakeTransportError> {
        self.reconnect_attempts += 1;
        if self.reconnect_failures > 0 {
            self.reconnect_failures -= 1;
            return Err(FakeTransportError);
        }
        self.open = true;
        self.closed = false;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.closed = true;
    }

    fn label(&self) -> String {
        "fake reader".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_reader_follows_script() {
        let tag = TagId::new(vec![0xaa]);
        let mut reader = FakeReader::new(vec![
            Probe::Tag(tag.clone()),
            Probe::Empty,
            Probe::Unsupported,
            Probe::Unsupported,
            Probe::Fail,
        ]);
        assert_eq!(reader.sense_once().unwrap(), Some(tag));
        assert!(!reader.is_present().unwrap());
        assert!(reader.is_present().unwrap());
        assert_eq!(reader.sense().unwrap(), Sensed::Unsupported);
        assert!(reader.sense_once().is_err());
        // exhausted script reads as an empty field
        assert_eq!(reader.sense_once().unwrap(), None);
        assert_eq!(reader.probes(), 6);
    }

    #[test]
    fn fake_reader_reconnect_failures() {
        let mut reader = FakeReader::default().fail_reconnects(2);
        assert!(reader.reconnect().is_err());
        assert!(reader.reconnect().is_err());
        assert!(reader.reconnect().is_ok());
        assert!(reader.is_open());
        assert_eq!(reader.reconnect_attempts(), 3);
        reader.close();
        assert!(reader.is_closed());
    }
}
