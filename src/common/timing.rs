// src/common/timing.rs

use core::time::Duration;

// === Session timing ===

/// Pacing of one removal countdown step. `remove_timeout` is counted in these.
pub const REMOVAL_TICK: Duration = Duration::from_secs(1);
/// Pause after a hot-swap exit action before the next tag's command starts,
/// covering external process cleanup.
pub const HOT_SWAP_SETTLE: Duration = Duration::from_secs(1);

// === Command runner ===

/// Per-attempt wait on the exit action. On expiry the wait is retried on the
/// same process, never relaunched.
pub const EXIT_ACTION_WAIT: Duration = Duration::from_secs(3);
/// Interval between `try_wait` probes while waiting on a child.
pub const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(20);

// === Reader connection ===

/// Fixed pause between reconnect attempts.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

// === PN532 (HSU) ===

/// Native baud rate of the PN532 high-speed UART.
pub const PN532_DEFAULT_BAUD: u32 = 115_200;
/// Read timeout configured on the serial port; bounds a single byte read.
pub const PN532_BYTE_READ_TIMEOUT: Duration = Duration::from_millis(5);
/// Pause between byte polls when nothing is buffered.
pub const PN532_BYTE_POLL: Duration = Duration::from_millis(1);
/// Time allowed for the ACK frame after a command is written.
pub const PN532_ACK_TIMEOUT: Duration = Duration::from_millis(50);
/// Time allowed for the response frame after an ACK.
/// A single passive activation attempt completes well within this.
pub const PN532_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);
/// Settle time after the HSU wake-up preamble.
pub const PN532_WAKEUP_SETTLE: Duration = Duration::from_millis(2);
