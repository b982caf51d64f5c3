//! Runtime log-level gate sitting in front of `defmt`'s trace/debug/warn/error
//! macros. `defmt` itself is already the print sink (RTT, probe-rs, ...); the
//! only thing worth reimplementing here is the verbosity knob a caller can
//! turn down in production builds.

/// Minimum severity that gets logged. Errors/warnings about protocol faults
/// are always emitted regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    #[default]
    Off,
    Error,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn allows(self, level: LogLevel) -> bool {
        self >= level
    }
}

/// Emits a `defmt::debug!` call when `level` allows `Debug`.
macro_rules! log_debug {
    ($level:expr, $($arg:tt)*) => {
        if $crate::log::LogLevel::allows($level, $crate::log::LogLevel::Debug) {
            defmt::debug!($($arg)*);
        }
    };
}

/// Emits a `defmt::trace!` call when `level` allows `Trace`.
macro_rules! log_trace {
    ($level:expr, $($arg:tt)*) => {
        if $crate::log::LogLevel::allows($level, $crate::log::LogLevel::Trace) {
            defmt::trace!($($arg)*);
        }
    };
}

pub(crate) use log_debug;
pub(crate) use log_trace;
