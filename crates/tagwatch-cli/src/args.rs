//! Command-line interface definitions.
//!
//! Every flag can also be set through a `TAGWATCH_*` environment variable.
//! Values given here override the settings file.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Poll an NFC reader and print the identifiers of the tags it detects.
#[derive(Parser, Debug)]
#[command(name = "tagwatch")]
#[command(version)]
#[command(about = "Poll an NFC reader and print detected tag identifiers", long_about = None)]
pub struct Args {
    /// TOML settings file
    #[arg(short, long, value_name = "FILE", env = "TAGWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Reader connection string (empty selects the first reader found)
    #[arg(short, long, value_name = "CONNSTRING", env = "TAGWATCH_DEVICE")]
    pub device: Option<String>,

    /// Reader backend
    #[arg(short, long, value_enum, env = "TAGWATCH_BACKEND")]
    pub backend: Option<Backend>,

    /// GPIO pin wired to the reader's reset input
    #[arg(long, value_name = "PIN", env = "TAGWATCH_RESET_PIN")]
    pub reset_pin: Option<u32>,

    /// sysfs GPIO class directory
    #[arg(long, value_name = "PATH", env = "TAGWATCH_GPIO_ROOT")]
    pub gpio_root: Option<PathBuf>,

    /// Output format for identifiers
    #[arg(short, long, value_enum, default_value = "text", env = "TAGWATCH_FORMAT")]
    pub format: OutputFormat,

    /// Delay between poll cycles in milliseconds
    #[arg(long, value_name = "MS", env = "TAGWATCH_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Poll timeout in milliseconds
    #[arg(long, value_name = "MS", env = "TAGWATCH_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Reader backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Simulated reader fed with hex UIDs on stdin
    Mock,
    /// PN53x reader through PC/SC
    Pcsc,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "pcsc") {
            Self::Pcsc
        } else {
            Self::Mock
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Pcsc => write!(f, "pcsc"),
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `Tag ID: <hex>` lines
    Text,
    /// One JSON object per line
    Json,
}

impl Args {
    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["tagwatch"]).unwrap();

        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.verbose, 0);
        assert_eq!(args.log_level(), "info");
    }

    #[test]
    fn test_args_full() {
        let args = Args::try_parse_from([
            "tagwatch",
            "--device",
            "pcsc:ACR122U",
            "--backend",
            "mock",
            "--reset-pin",
            "19",
            "--format",
            "json",
            "--interval-ms",
            "500",
            "--timeout-ms",
            "200",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.device.as_deref(), Some("pcsc:ACR122U"));
        assert_eq!(args.backend, Some(Backend::Mock));
        assert_eq!(args.reset_pin, Some(19));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.interval_ms, Some(500));
        assert_eq!(args.timeout_ms, Some(200));
        assert_eq!(args.log_level(), "trace");
    }

    #[test]
    fn test_args_rejects_unknown_backend() {
        assert!(Args::try_parse_from(["tagwatch", "--backend", "libnfc"]).is_err());
    }
}
