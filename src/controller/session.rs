// src/controller/session.rs

use crate::common::tag::TagId;

/// Behavioural state of a [`Session`], derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No tag tracked.
    Idle,
    /// Tag present and its command launched.
    ActiveKnown,
    /// Tag present, no command configured for it.
    ActiveUnknown,
    /// Tracked tag reported absent; the exit countdown is running.
    Removing,
}

/// Result of one removal countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Still waiting; `remaining` is the value before this step's decrement.
    Waiting { remaining: u32 },
    /// Timer reached zero; the exit action is due.
    Expired,
}

/// Mutable state of the tag controller.
///
/// `active_command` is only ever set together with `current_tag`, and the
/// removal countdown only runs for a session with an active command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    current_tag: Option<TagId>,
    active_command: Option<String>,
    pending_exit_timer: u32,
    removing: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tag(&self) -> Option<&TagId> {
        self.current_tag.as_ref()
    }

    pub fn active_command(&self) -> Option<&str> {
        self.active_command.as_deref()
    }

    /// Countdown steps left before the exit action fires.
    pub fn pending_exit_timer(&self) -> u32 {
        self.pending_exit_timer
    }

    pub fn state(&self) -> SessionState {
        match (&self.current_tag, &self.active_command) {
            (None, _) => SessionState::Idle,
            (Some(_), None) => SessionState::ActiveUnknown,
            (Some(_), Some(_)) if self.removing => SessionState::Removing,
            (Some(_), Some(_)) => SessionState::ActiveKnown,
        }
    }

    pub fn is_tracking(&self, tag: &TagId) -> bool {
        self.current_tag.as_ref() == Some(tag)
    }

    pub fn is_consistent(&self) -> bool {
        let command_has_tag = self.active_command.is_none() || self.current_tag.is_some();
        let removal_has_command = !self.removing || self.active_command.is_some();
        command_has_tag && removal_has_command
    }

    /// Starts tracking `tag`. The countdown is armed only when a command runs.
    pub(crate) fn begin(&mut self, tag: TagId, command: Option<String>, remove_timeout: u32) {
        let pending_exit_timer = if command.is_some() { remove_timeout } else { 0 };
        *self = Session {
            current_tag: Some(tag),
            active_command: command,
            pending_exit_timer,
            removing: false,
        };
    }

    /// The tracked tag came back during the countdown.
    pub(crate) fn cancel_removal(&mut self, remove_timeout: u32) {
        self.pending_exit_timer = remove_timeout;
        self.removing = false;
    }

    /// Advances the removal countdown by one step.
    pub(crate) fn count_down(&mut self) -> Countdown {
        debug_assert!(self.active_command.is_some());
        self.removing = true;
        if self.pending_exit_timer > 0 {
            let remaining = self.pending_exit_timer;
            self.pending_exit_timer -= 1;
            Countdown::Waiting { remaining }
        } else {
            Countdown::Expired
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Session::default();
    }
}
