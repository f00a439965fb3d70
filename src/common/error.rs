// src/common/error.rs

use std::io;

/// Errors raised while talking to a tag reader.
///
/// Generic over the transport error so that scripted test transports and the
/// serial backend share one type. Every variant is recoverable from the
/// controller's point of view: the reader is marked disconnected and reopened.
#[derive(Debug, thiserror::Error)]
pub enum TagError<E = io::Error>
where
    E: core::fmt::Debug,
{
    /// Underlying transport failure.
    #[error("I/O error: {0:?}")]
    Io(E),

    /// The reader did not answer in time.
    #[error("Operation timed out")]
    Timeout,

    /// A frame from the reader was structurally invalid.
    #[error("Malformed reader frame")]
    Frame,

    /// Length or data checksum of a received frame did not match.
    #[error("Checksum mismatch: expected {expected:#04x}, calculated {calculated:#04x}")]
    Checksum { expected: u8, calculated: u8 },

    /// The reader answered a command with a NACK frame.
    #[error("Reader rejected command {0:#04x}")]
    Nack(u8),

    /// The reader reported an application-level error frame.
    #[error("Reader reported an error frame")]
    ErrorFrame,

    /// Got a well-formed frame, but for a different command.
    #[error("Unexpected response: expected {expected:#04x}, got {got:#04x}")]
    UnexpectedResponse { expected: u8, got: u8 },

    /// Frame did not fit in the fixed buffer.
    #[error("Buffer overflow: needed {needed}, got {got}")]
    BufferOverflow { needed: usize, got: usize },

    /// Operation attempted on a reader that is not open.
    #[error("Reader is not connected")]
    NotConnected,
}

/// Errors raised by the command runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err: TagError = TagError::Checksum { expected: 0x0a, calculated: 0xf0 };
        assert_eq!(err.to_string(), "Checksum mismatch: expected 0x0a, calculated 0xf0");

        let err: TagError<()> = TagError::UnexpectedResponse { expected: 0x4b, got: 0x15 };
        assert_eq!(err.to_string(), "Unexpected response: expected 0x4b, got 0x15");

        let err = RunnerError::Spawn {
            command: "foo".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "failed to launch `foo`: missing");
    }
}
