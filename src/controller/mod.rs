// src/controller/mod.rs

//! Tag session controller: the poll loop tying a reader to a command runner.
//!
//! One poll cycle senses once, applies the session transition, and then
//! busy-polls the reader while a tag stays in the field. Everything runs on
//! the caller's thread; the exit action blocks the loop until it finishes.

pub mod session;

pub use session::{Countdown, Session, SessionState};

use crate::common::{
    hal_traits::{Sensed, TagReader, Timer},
    tag::{CommandTable, TagId},
    timing,
};
use crate::runner::CommandRunner;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// What a sensed result did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed (empty field while idle, or the tracked tag re-confirmed).
    Unchanged,
    /// A mapped tag arrived and its command was launched.
    Started { command: String },
    /// A tag with no configured command arrived.
    Unmapped,
    /// The tracked tag came back during the removal countdown.
    RemovalCancelled,
    /// A different tag replaced the tracked one. The exit action ran and the
    /// settle delay elapsed before `next` was applied.
    HotSwapped { next: Box<Transition> },
    /// One countdown step elapsed; `remaining` before the step.
    CountingDown { remaining: u32 },
    /// The countdown expired, the exit action ran, the session is idle.
    ExitActionRun,
    /// An unmapped tag left; nothing to clean up.
    Cleared,
    /// A target without a usable identifier is in the field. The session is
    /// left untouched while it stays there.
    Unsupported,
}

/// Outcome of one [`TagController::poll_once`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cycle {
    Evaluated(Transition),
    /// The reader failed; it will be reopened at the start of the next cycle.
    Disconnected,
    /// The shutdown flag was raised while connecting.
    Shutdown,
}

/// Owns the session and drives it from reader results.
pub struct TagController<R, C, T> {
    reader: R,
    runner: C,
    timer: T,
    table: CommandTable,
    remove_timeout: u32,
    session: Session,
    connected: bool,
}

impl<R, C, T> TagController<R, C, T>
where
    R: TagReader,
    C: CommandRunner,
    T: Timer,
{
    /// The reader is treated as disconnected until the first cycle opens it.
    pub fn new(reader: R, runner: C, timer: T, table: CommandTable, remove_timeout: u32) -> Self {
        TagController {
            reader,
            runner,
            timer,
            table,
            remove_timeout,
            session: Session::new(),
            connected: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn runner(&self) -> &C {
        &self.runner
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Polls until `shutdown` is raised, then closes the reader.
    ///
    /// A pending exit action is deliberately not run on shutdown.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            self.poll_once(shutdown);
        }
        info!("Exiting.");
        self.reader.close();
        self.connected = false;
    }

    /// Runs one poll cycle.
    pub fn poll_once(&mut self, shutdown: &AtomicBool) -> Cycle {
        if !self.connected && !self.connect(shutdown) {
            return Cycle::Shutdown;
        }

        let sensed = match self.reader.sense() {
            Ok(sensed) => sensed,
            Err(e) => {
                self.mark_disconnected(&e);
                return Cycle::Disconnected;
            }
        };

        let present = sensed.is_present();
        let transition = match sensed {
            Sensed::Tag(tag) => self.handle_sensed(Some(tag)),
            Sensed::Empty => self.handle_sensed(None),
            Sensed::Unsupported => {
                info!("Unsupported tag scanned.");
                Transition::Unsupported
            }
        };

        if present {
            self.dwell(shutdown);
        }
        Cycle::Evaluated(transition)
    }

    /// Applies one sensed result to the session.
    pub fn handle_sensed(&mut self, sensed: Option<TagId>) -> Transition {
        let transition = match sensed {
            Some(tag) => self.on_tag(tag),
            None => self.on_absent(),
        };
        debug_assert!(self.session.is_consistent());
        transition
    }

    // --- Transitions ---

    fn on_tag(&mut self, tag: TagId) -> Transition {
        info!("Tag scanned. ID: {tag}");

        if self.session.is_tracking(&tag) {
            return match self.session.state() {
                SessionState::Removing => {
                    info!("Prior tag scanned. Cancelling exit action.");
                    self.session.cancel_removal(self.remove_timeout);
                    Transition::RemovalCancelled
                }
                _ => Transition::Unchanged,
            };
        }

        if self.session.current_tag().is_some() {
            info!("Executing exit action before new command.");
            self.run_exit_action();
            self.timer.delay(timing::HOT_SWAP_SETTLE);
            self.session.clear();
            let next = Box::new(self.start_session(tag));
            return Transition::HotSwapped { next };
        }

        self.start_session(tag)
    }

    fn start_session(&mut self, tag: TagId) -> Transition {
        match self.table.lookup(&tag).map(str::to_owned) {
            Some(command) => {
                info!("Executing command: {command}");
                if let Err(e) = self.runner.launch(&command) {
                    error!("{e}");
                }
                self.session.begin(tag, Some(command.clone()), self.remove_timeout);
                Transition::Started { command }
            }
            None => {
                info!("No command defined for this tag.");
                self.session.begin(tag, None, self.remove_timeout);
                Transition::Unmapped
            }
        }
    }

    fn on_absent(&mut self) -> Transition {
        if self.session.current_tag().is_none() {
            return Transition::Unchanged;
        }

        if self.session.active_command().is_none() {
            info!("Tag removed.");
            self.session.clear();
            return Transition::Cleared;
        }

        if self.session.state() != SessionState::Removing {
            info!(
                "Tag removed. Waiting {} seconds before executing exit action.",
                self.remove_timeout
            );
        }

        match self.session.count_down() {
            Countdown::Waiting { remaining } => {
                info!("Remaining time: {remaining}");
                self.timer.delay(timing::REMOVAL_TICK);
                Transition::CountingDown { remaining }
            }
            Countdown::Expired => {
                self.run_exit_action();
                self.session.clear();
                Transition::ExitActionRun
            }
        }
    }

    fn run_exit_action(&mut self) {
        match self.runner.run_exit_action_and_wait() {
            Ok(timeouts) => debug!(timeouts, "exit action completed"),
            Err(e) => error!("{e}"),
        }
    }

    // --- Reader handling ---

    /// Busy-polls while a tag stays in the field.
    fn dwell(&mut self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            match self.reader.is_present() {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    self.mark_disconnected(&e);
                    return;
                }
            }
        }
    }

    /// Reopens the reader until it succeeds. Returns `false` if `shutdown` was
    /// raised first.
    fn connect(&mut self, shutdown: &AtomicBool) -> bool {
        let mut advised = false;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return false;
            }
            match self.reader.reconnect() {
                Ok(()) => {
                    info!("{} opened.", self.reader.label());
                    self.connected = true;
                    return true;
                }
                Err(e) => {
                    if !advised {
                        warn!(
                            "No {} detected. Waiting until it becomes available.",
                            self.reader.label()
                        );
                        advised = true;
                    }
                    debug!("reconnect failed: {e}");
                    self.timer.delay(timing::RECONNECT_BACKOFF);
                }
            }
        }
    }

    fn mark_disconnected(&mut self, e: &R::Error) {
        warn!("Error: {e}");
        warn!("Reconnecting reader.");
        self.connected = false;
    }
}
