// src/runner/fake.rs

use super::CommandRunner;
use crate::common::error::RunnerError;
use std::io;

/// What a [`RecordingRunner`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Launch(String),
    ExitAction,
}

/// Runner that records requests instead of starting processes.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    events: Vec<RunnerEvent>,
    fail_launches: bool,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every launch fails with a spawn error (still recorded).
    pub fn failing_launches() -> Self {
        RecordingRunner {
            fail_launches: true,
            ..Default::default()
        }
    }

    pub fn events(&self) -> &[RunnerEvent] {
        &self.events
    }

    pub fn launches(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RunnerEvent::Launch(cmd) => Some(cmd.as_str()),
                RunnerEvent::ExitAction => None,
            })
            .collect()
    }

    pub fn exit_actions(&self) -> usize {
        self.events
            .iter()
            .filter(|event| **event == RunnerEvent::ExitAction)
            .count()
    }
}

impl CommandRunner for RecordingRunner {
    fn launch(&mut self, command_line: &str) -> Result<(), RunnerError> {
        self.events.push(RunnerEvent::Launch(command_line.to_string()));
        if self.fail_launches {
            return Err(RunnerError::Spawn {
                command: command_line.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "simulated spawn failure"),
            });
        }
        Ok(())
    }

    fn run_exit_action_and_wait(&mut self) -> Result<u32, RunnerError> {
        self.events.push(RunnerEvent::ExitAction);
        Ok(0)
    }
}
