//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::fs;
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::Parser;
use serde::Deserialize;

use crate::*;
use crate::capture::*;
use crate::prefix::*;

/// Command line.
#[derive(Parser, Debug)]
#[command(name = "dhcp-stats")]
#[command(version, about = "Monitor DHCP traffic and report IP prefix utilization", long_about = None)]
pub struct Args {
    /// Read frames from a capture file
    #[arg(short = 'r', long = "read", value_name = "FILE", conflicts_with = "interface")]
    pub file: Option<PathBuf>,

    /// Listen on a network interface
    #[arg(short = 'i', long, value_name = "IFACE")]
    pub interface: Option<String>,

    /// JSON configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print statistics as plain text instead of the interactive table
    #[arg(long)]
    pub no_tui: bool,

    /// Do not send alerts to syslog
    #[arg(long)]
    pub no_syslog: bool,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Prefixes to monitor, e.g. 192.168.1.0/24
    #[arg(value_name = "IP-PREFIX")]
    pub prefixes: Vec<String>,
}

/// Process exit status for a command line that did not parse.
///
/// Help and version requests succeed, every usage error is a configuration
/// error.
pub fn arg_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

/// JSON configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: ConfigGlobal,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, DhcpError> {
        let json = fs::read_to_string(path)
            .map_err(|e| DhcpError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Config::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Config, DhcpError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.global.debug.unwrap_or(false)
    }

    pub fn is_syslog_enabled(&self) -> bool {
        self.global.syslog.unwrap_or(true)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigGlobal {
    pub debug: Option<bool>,
    pub syslog: Option<bool>,
    pub log_file: Option<PathBuf>,
}

/// Validated settings the monitor runs with.
#[derive(Debug, PartialEq)]
pub struct Settings {
    pub capture: CaptureSpec,
    pub prefixes: Vec<Ipv4Prefix>,
    pub tui: bool,
    pub syslog: bool,
    pub debug: bool,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Merge the command line with the configuration file it names.
    pub fn from_args(args: Args) -> Result<Settings, DhcpError> {
        let config = match &args.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        Settings::from_parts(args, config)
    }

    /// Merge the command line with an already loaded configuration.
    ///
    /// Prefixes from the file come first, then the command line ones.
    pub fn from_parts(args: Args, config: Config) -> Result<Settings, DhcpError> {
        let capture = match (args.file, args.interface) {
            (Some(file), None) => CaptureSpec::File(file),
            (None, Some(interface)) => CaptureSpec::Interface(interface),
            (Some(_), Some(_)) => {
                return Err(DhcpError::ConfigError("-r and -i are mutually exclusive".to_string()))
            }
            (None, None) => {
                return Err(DhcpError::ConfigError("one of -r or -i is required".to_string()))
            }
        };

        let prefixes = config.prefixes.iter()
            .chain(args.prefixes.iter())
            .map(|s| s.parse::<Ipv4Prefix>())
            .collect::<Result<Vec<_>, _>>()?;
        if prefixes.is_empty() {
            return Err(DhcpError::ConfigError("no IP prefix given".to_string()))
        }

        Ok(Settings {
            capture,
            prefixes,
            tui: !args.no_tui,
            syslog: !args.no_syslog && config.is_syslog_enabled(),
            debug: args.debug || config.is_debug_enabled(),
            log_file: config.global.log_file,
        })
    }
}
