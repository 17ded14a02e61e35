//! Settings file.
//!
//! Every key is optional; missing keys take the library defaults. Durations
//! are given in milliseconds.
//!
//! ```toml
//! backend = "pcsc"
//! device = "ACR122U"
//! poll_interval_ms = 1000
//!
//! catalog = [
//!     { type = "iso14443a", baud_rate = "106" },
//!     { type = "felica", baud_rate = "212" },
//! ]
//!
//! [reset]
//! pin = 19
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tagwatch_hardware::gpio::DEFAULT_SYSFS_GPIO_ROOT;
use tagwatch_reader::config::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT,
    DEFAULT_PUBLISH_TIMEOUT, DEFAULT_TARGET_COUNT,
};
use tagwatch_reader::{ModulationCatalog, ReaderConfig, ResetTimings};

use crate::args::{Args, Backend};

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Reader backend.
    pub backend: Backend,

    /// Reader connection string.
    pub device: String,

    /// Modulations to probe; the standard catalog when absent.
    pub catalog: Option<ModulationCatalog>,

    /// Targets requested per poll.
    pub target_count: u8,

    /// Poll timeout in milliseconds.
    pub poll_timeout_ms: u64,

    /// Delay between poll cycles in milliseconds.
    pub poll_interval_ms: u64,

    /// Identifier channel capacity.
    pub channel_capacity: usize,

    /// Time a full channel is waited on before an identifier is dropped.
    pub publish_timeout_ms: u64,

    /// Reset line.
    pub reset: ResetSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            device: String::new(),
            catalog: None,
            target_count: DEFAULT_TARGET_COUNT,
            poll_timeout_ms: duration_ms(DEFAULT_POLL_TIMEOUT),
            poll_interval_ms: duration_ms(DEFAULT_POLL_INTERVAL),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            publish_timeout_ms: duration_ms(DEFAULT_PUBLISH_TIMEOUT),
            reset: ResetSettings::default(),
        }
    }
}

/// Reset line settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetSettings {
    /// GPIO pin; no reset is attempted when unset.
    pub pin: Option<u32>,

    /// sysfs GPIO class directory.
    pub gpio_root: PathBuf,

    /// Hold after the first high write.
    pub high_hold_ms: u64,

    /// Hold after the low write.
    pub low_hold_ms: u64,

    /// Hold after the final high write.
    pub settle_ms: u64,
}

impl Default for ResetSettings {
    fn default() -> Self {
        let timings = ResetTimings::default();
        Self {
            pin: None,
            gpio_root: PathBuf::from(DEFAULT_SYSFS_GPIO_ROOT),
            high_hold_ms: duration_ms(timings.high_hold),
            low_hold_ms: duration_ms(timings.low_hold),
            settle_ms: duration_ms(timings.settle),
        }
    }
}

impl ResetSettings {
    /// Pulse hold times.
    pub fn timings(&self) -> ResetTimings {
        ResetTimings {
            high_hold: Duration::from_millis(self.high_hold_ms),
            low_hold: Duration::from_millis(self.low_hold_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Parse settings from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply command-line overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(backend) = args.backend {
            self.backend = backend;
        }
        if let Some(device) = &args.device {
            self.device.clone_from(device);
        }
        if let Some(pin) = args.reset_pin {
            self.reset.pin = Some(pin);
        }
        if let Some(gpio_root) = &args.gpio_root {
            self.reset.gpio_root.clone_from(gpio_root);
        }
        if let Some(interval_ms) = args.interval_ms {
            self.poll_interval_ms = interval_ms;
        }
        if let Some(timeout_ms) = args.timeout_ms {
            self.poll_timeout_ms = timeout_ms;
        }
    }

    /// Build and validate the reader configuration.
    pub fn reader_config(&self) -> Result<ReaderConfig> {
        let config = ReaderConfig::default()
            .with_connstring(self.device.clone())
            .with_catalog(self.catalog.clone().unwrap_or_default())
            .with_target_count(self.target_count)
            .with_poll_timeout(Duration::from_millis(self.poll_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_channel_capacity(self.channel_capacity)
            .with_publish_timeout(Duration::from_millis(self.publish_timeout_ms));

        config.validate()?;
        Ok(config)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tagwatch_hardware::{BaudRate, Modulation, ModulationType};

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());

        let config = settings.reader_config().unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(settings.reset.timings(), ResetTimings::default());
        assert_eq!(settings.reset.gpio_root, PathBuf::from("/sys/class/gpio"));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = Settings::parse(
            r#"
            backend = "mock"
            device = "ACR122U"
            poll_interval_ms = 250
            catalog = [
                { type = "iso14443a", baud_rate = "106" },
                { type = "felica", baud_rate = "424" },
            ]

            [reset]
            pin = 19
            settle_ms = 50
            "#,
        )
        .unwrap();

        assert_eq!(settings.backend, Backend::Mock);
        assert_eq!(settings.reset.pin, Some(19));
        assert_eq!(settings.reset.timings().settle, Duration::from_millis(50));
        assert_eq!(settings.reset.timings().low_hold, Duration::from_millis(400));

        let config = settings.reader_config().unwrap();
        assert_eq!(config.connstring, "ACR122U");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(
            config.catalog.as_slice(),
            &[
                Modulation::new(ModulationType::Iso14443a, BaudRate::Nbr106),
                Modulation::new(ModulationType::Felica, BaudRate::Nbr424),
            ]
        );
    }

    #[test]
    fn test_settings_rejects_bad_values() {
        assert!(Settings::parse("catalog = []").is_err());
        assert!(Settings::parse("backend = \"libnfc\"").is_err());

        let settings = Settings::parse("target_count = 0").unwrap();
        assert!(settings.reader_config().is_err());
    }

    #[test]
    fn test_args_override_settings() {
        let mut settings =
            Settings::parse("device = \"from-file\"\npoll_timeout_ms = 500").unwrap();
        let args = Args::try_parse_from([
            "tagwatch",
            "--device",
            "from-flag",
            "--interval-ms",
            "2000",
            "--reset-pin",
            "7",
        ])
        .unwrap();

        settings.apply_args(&args);

        assert_eq!(settings.device, "from-flag");
        assert_eq!(settings.poll_interval_ms, 2000);
        assert_eq!(settings.poll_timeout_ms, 500);
        assert_eq!(settings.reset.pin, Some(7));
    }

    #[test]
    fn test_settings_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagwatch.toml");
        std::fs::write(&path, "device = \"pcsc:0\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.device, "pcsc:0");

        assert!(Settings::load(&dir.path().join("missing.toml")).is_err());
    }
}
