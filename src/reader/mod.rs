// src/reader/mod.rs

pub mod fake;
pub mod pn532;

pub use fake::{FakeReader, Probe};
pub use pn532::Pn532Reader;

use crate::common::{error::TagError, hal_traits::TagReader};
use crate::config::{Driver, ReaderConfig};

/// Reader selected by the configured driver name.
pub type DynReader = Box<dyn TagReader<Error = TagError>>;

/// Builds the backend for `config.driver`. The device is not opened until the
/// controller's first reconnect.
pub fn from_config(config: &ReaderConfig) -> DynReader {
    match config.driver {
        Driver::Pn532 => Box::new(Pn532Reader::new(config.port.device_path(), config.baud_rate)),
    }
}
