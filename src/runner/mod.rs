// src/runner/mod.rs

pub mod fake;

pub use fake::{RecordingRunner, RunnerEvent};

use crate::common::{
    blocking::{block_with_timeout, WaitError},
    error::RunnerError,
    hal_traits::{StdTimer, Timer},
    timing,
};
use core::time::Duration;
use std::process::{Child, Command, ExitStatus};
use tracing::{debug, warn};

/// Starts tag commands and runs the exit action.
pub trait CommandRunner {
    /// Starts `command_line` in the background. Does not wait and does not
    /// inspect the outcome.
    fn launch(&mut self, command_line: &str) -> Result<(), RunnerError>;

    /// Starts the fixed exit action and blocks until it has exited.
    ///
    /// Waits in bounded attempts and retries the wait (never the launch) until
    /// the process completes. Returns the number of attempts that timed out.
    fn run_exit_action_and_wait(&mut self) -> Result<u32, RunnerError>;
}

/// Builds a `Command` running `command_line` through the platform shell.
pub fn shell_command(command_line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(command_line);
        command
    }
    #[cfg(not(windows))]
    {
        let mut command = Command::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}

fn spawn_shell(command_line: &str) -> Result<Child, RunnerError> {
    shell_command(command_line)
        .spawn()
        .map_err(|source| RunnerError::Spawn {
            command: command_line.to_string(),
            source,
        })
}

/// Waits for `child` in attempts of `per_attempt`, retrying the wait after
/// every timeout until the process exits.
///
/// Returns the exit status and the number of timed-out attempts.
pub fn wait_for_exit<T: Timer + ?Sized>(
    timer: &mut T,
    child: &mut Child,
    per_attempt: Duration,
    command_line: &str,
) -> Result<(ExitStatus, u32), RunnerError> {
    let mut timeouts = 0u32;
    loop {
        let attempt = block_with_timeout(&mut *timer, per_attempt, timing::CHILD_POLL_INTERVAL, || {
            match child.try_wait() {
                Ok(Some(status)) => Ok(status),
                Ok(None) => Err(nb::Error::WouldBlock),
                Err(e) => Err(nb::Error::Other(e)),
            }
        });

        match attempt {
            Ok(status) => return Ok((status, timeouts)),
            Err(WaitError::TimedOut) => {
                timeouts += 1;
                warn!("Exit action timed out. Retrying.");
            }
            Err(WaitError::Other(source)) => {
                return Err(RunnerError::Wait {
                    command: command_line.to_string(),
                    source,
                })
            }
        }
    }
}

/// [`CommandRunner`] that runs command lines through the system shell with
/// inherited stdio.
pub struct ShellRunner<T = StdTimer> {
    exit_command: String,
    wait_timeout: Duration,
    timer: T,
    // Launched commands, kept so they can be reaped once they exit.
    children: Vec<Child>,
}

impl ShellRunner<StdTimer> {
    pub fn new(exit_command: impl Into<String>) -> Self {
        Self::with_timer(exit_command, timing::EXIT_ACTION_WAIT, StdTimer::new())
    }
}

impl<T: Timer> ShellRunner<T> {
    pub fn with_timer(exit_command: impl Into<String>, wait_timeout: Duration, timer: T) -> Self {
        ShellRunner {
            exit_command: exit_command.into(),
            wait_timeout,
            timer,
            children: Vec::new(),
        }
    }

    /// Launched commands not yet seen to exit.
    pub fn tracked_children(&self) -> usize {
        self.children.len()
    }

    fn reap_finished(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = child.id(), %status, "launched command exited");
                false
            }
            Ok(None) => true,
            Err(_) => false,
        });
    }
}

impl<T: Timer> CommandRunner for ShellRunner<T> {
    fn launch(&mut self, command_line: &str) -> Result<(), RunnerError> {
        self.reap_finished();
        let child = spawn_shell(command_line)?;
        debug!(pid = child.id(), command = command_line, "launched");
        self.children.push(child);
        Ok(())
    }

    fn run_exit_action_and_wait(&mut self) -> Result<u32, RunnerError> {
        let mut child = spawn_shell(&self.exit_command)?;
        let (status, timeouts) =
            wait_for_exit(&mut self.timer, &mut child, self.wait_timeout, &self.exit_command)?;
        debug!(%status, timeouts, "exit action finished");
        self.reap_finished();
        Ok(timeouts)
    }
}
