// src/common/blocking.rs

use super::error::TagError;
use super::hal_traits::Timer;
use core::fmt::Debug;
use core::time::Duration;

/// Why [`block_with_timeout`] gave up.
#[derive(Debug, PartialEq, Eq)]
pub enum WaitError<E> {
    /// The deadline passed while the operation kept returning `WouldBlock`.
    TimedOut,
    /// The operation failed outright.
    Other(E),
}

impl<E: Debug> From<WaitError<E>> for TagError<E> {
    fn from(err: WaitError<E>) -> Self {
        match err {
            WaitError::TimedOut => TagError::Timeout,
            WaitError::Other(e) => TagError::Io(e),
        }
    }
}

/// Executes a non-blocking operation (`op`) repeatedly until it stops
/// returning `WouldBlock`, sleeping `poll` between attempts.
///
/// Returns `WaitError::TimedOut` once `timeout` has elapsed on `timer`. The
/// operation is always attempted at least once.
pub fn block_with_timeout<TM, T, E, F>(
    timer: &mut TM,
    timeout: Duration,
    poll: Duration,
    mut op: F,
) -> Result<T, WaitError<E>>
where
    TM: Timer + ?Sized,
    F: FnMut() -> nb::Result<T, E>,
{
    let deadline = timer.now() + timeout;

    loop {
        match op() {
            Ok(result) => return Ok(result),
            Err(nb::Error::WouldBlock) => {
                if timer.now() >= deadline {
                    return Err(WaitError::TimedOut);
                }
                timer.delay(poll);
            }
            Err(nb::Error::Other(e)) => return Err(WaitError::Other(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::hal_traits::ManualTimer;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    struct MockCommError;

    #[test]
    fn test_completes_after_would_block() {
        let mut timer = ManualTimer::new();
        let mut calls = 0;
        let result: Result<i32, WaitError<MockCommError>> =
            block_with_timeout(&mut timer, Duration::from_millis(10), Duration::from_millis(1), || {
                calls += 1;
                if calls < 4 {
                    Err(nb::Error::WouldBlock)
                } else {
                    Ok(123)
                }
            });
        assert_eq!(result, Ok(123));
        assert_eq!(calls, 4);
        assert_eq!(timer.now(), Duration::from_millis(3));
    }

    #[test]
    fn test_times_out() {
        let mut timer = ManualTimer::new();
        let mut calls = 0;
        let result: Result<(), WaitError<MockCommError>> =
            block_with_timeout(&mut timer, Duration::from_millis(5), Duration::from_millis(2), || {
                calls += 1;
                Err(nb::Error::WouldBlock)
            });
        assert_eq!(result, Err(WaitError::TimedOut));
        // 0, 2, 4 are before the deadline; the probe at 6 ms gives up.
        assert_eq!(calls, 4);
        assert_eq!(timer.now(), Duration::from_millis(6));
    }

    #[test]
    fn test_propagates_other_error() {
        let mut timer = ManualTimer::new();
        let mut calls = 0;
        let result: Result<(), WaitError<MockCommError>> =
            block_with_timeout(&mut timer, Duration::from_millis(10), Duration::from_millis(1), || {
                calls += 1;
                if calls < 3 {
                    Err(nb::Error::WouldBlock)
                } else {
                    Err(nb::Error::Other(MockCommError))
                }
            });
        assert_eq!(result, Err(WaitError::Other(MockCommError)));
        assert_eq!(calls, 3);

        let tag_err: TagError<MockCommError> = WaitError::TimedOut.into();
        assert!(matches!(tag_err, TagError::Timeout));
    }
}
