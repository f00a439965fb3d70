// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod blocking;
pub mod error;
pub mod hal_traits;
pub mod tag;
pub mod timing;

// --- Re-export key types/traits/functions for easier access ---

// From blocking.rs
pub use blocking::{block_with_timeout, WaitError};

// From error.rs
pub use error::{RunnerError, TagError};

// From hal_traits.rs
pub use hal_traits::{ManualTimer, Sensed, StdTimer, TagReader, Timer};

// From tag.rs
pub use tag::{CommandTable, TagId};

// Timing constants stay under common::timing::*
