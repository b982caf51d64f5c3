//! Builder-style configuration surface for [`crate::Driver`], mirroring the
//! structure this crate is grounded on's `YDLidarX4Builder`: sensible
//! defaults, one setter per knob, a final `build()`.

use embassy_time::Duration;

use crate::log::LogLevel;
use crate::queue;

/// Queue capacity recommended by the manufacturer doc this driver targets:
/// at least 3x a maximally-sized scan packet.
pub const DEFAULT_MAX_QUEUE_ELEMENTS: u16 = queue::DEFAULT_CAPACITY as u16;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub max_queue_elements: u16,
    pub timeout: Duration,
    pub auto_restart_on_timeout: bool,
    pub log_level: LogLevel,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_queue_elements: DEFAULT_MAX_QUEUE_ELEMENTS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            auto_restart_on_timeout: true,
            log_level: LogLevel::Off,
        }
    }
}

impl DriverConfig {
    pub fn builder() -> DriverConfigBuilder {
        DriverConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    pub fn max_queue_elements(mut self, value: u16) -> Self {
        self.config.max_queue_elements = value;
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.config.timeout = value;
        self
    }

    pub fn auto_restart_on_timeout(mut self, value: bool) -> Self {
        self.config.auto_restart_on_timeout = value;
        self
    }

    pub fn log_level(mut self, value: LogLevel) -> Self {
        self.config.log_level = value;
        self
    }

    pub fn build(self) -> DriverConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = DriverConfig::default();
        assert_eq!(cfg.max_queue_elements, 360);
        assert_eq!(cfg.timeout, Duration::from_millis(1000));
        assert!(cfg.auto_restart_on_timeout);
        assert_eq!(cfg.log_level, LogLevel::Off);
    }

    #[test]
    fn builder_overrides_individual_fields() {
        let cfg = DriverConfig::builder()
            .timeout(Duration::from_millis(500))
            .auto_restart_on_timeout(false)
            .log_level(LogLevel::Trace)
            .build();
        assert_eq!(cfg.timeout, Duration::from_millis(500));
        assert!(!cfg.auto_restart_on_timeout);
        assert_eq!(cfg.log_level, LogLevel::Trace);
        assert_eq!(cfg.max_queue_elements, 360);
    }
}
