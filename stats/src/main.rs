//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::fs::OpenOptions;
use std::io;
use std::process;

use clap::Parser;
use env_logger::{Builder, Target};
use log::{error, info, LevelFilter};

use dhcp_stats::*;
use dhcp_stats::alert::*;
use dhcp_stats::capture::*;
use dhcp_stats::config::*;
use dhcp_stats::engine::*;
use dhcp_stats::monitor::*;
use dhcp_stats::view::*;

/// Log to the configured file, or stderr unless the terminal table owns it.
/// RUST_LOG overrides the level.
fn init_logger(settings: &Settings) -> Result<(), DhcpError> {
    let level = if settings.debug {
        LevelFilter::Debug
    } else if settings.tui && settings.log_file.is_none() {
        LevelFilter::Off
    } else {
        LevelFilter::Warn
    };

    let mut builder = Builder::new();
    builder.filter_level(level).parse_default_env();

    if let Some(path) = &settings.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)
            .map_err(|e| DhcpError::ConfigError(format!("{}: {}", path.display(), e)))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init()
        .map_err(|e| DhcpError::ConfigError(e.to_string()))
}

fn run_with_view<V: StatsSink>(settings: &Settings, capture: PcapSource, view: V) -> Result<RunSummary, DhcpError> {
    let stop = install_stop_handler()?;
    let engine = Engine::new(settings.prefixes.clone());
    let wait_at_end = settings.tui && settings.capture.is_file();

    if settings.syslog {
        let sink = SyslogSink::open(SYSLOG_IDENT)?;
        Monitor::new(engine, capture, sink, view, stop).run(wait_at_end)
    } else {
        Monitor::new(engine, capture, LogSink, view, stop).run(wait_at_end)
    }
}

fn start(settings: Settings) -> Result<RunSummary, DhcpError> {
    init_logger(&settings)?;
    info!("Starting DHCP stats, {} prefixes", settings.prefixes.len());

    let capture = PcapSource::open(&settings.capture)?;

    if settings.tui {
        run_with_view(&settings, capture, TerminalView::new()?)
    } else {
        run_with_view(&settings, capture, PlainView::new(io::stdout()))
    }
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = arg_exit_code(&e);
            let _ = e.print();
            process::exit(code);
        }
    };

    let res = Settings::from_args(args).and_then(start);
    match res {
        Ok(summary) => {
            info!("Exiting {:?}", summary);
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("dhcp-stats: {}", e);
            process::exit(1);
        }
    }
}
