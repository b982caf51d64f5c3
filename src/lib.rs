//! Driver for the YDLIDAR X4 2-D laser rangefinder.
//!
//! Feeds a byte queue from a serial receive path, resynchronizes and
//! validates scan packets out of it, converts samples to angle/distance
//! pairs, and dispatches them to caller-supplied callbacks. See
//! [`Driver`] for the lifecycle entry points.

#![cfg_attr(not(test), no_std)]

mod config;
mod driver;
mod error;
mod log;
mod parser;
mod protocol;
mod queue;

pub use config::{DriverConfig, DriverConfigBuilder};
pub use driver::{Driver, Transport};
pub use error::DriverError;
pub use log::LogLevel;
pub use parser::{ParserFault, ParserState};
pub use protocol::{IndexReading, ScanPacket};
pub use queue::ByteQueue;
