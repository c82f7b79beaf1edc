//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::ffi::CString;
use std::fmt;

use log::warn;

use crate::*;
use crate::prefix::*;

/// Utilization percent a prefix has to exceed to raise an alert.
pub const ALERT_THRESHOLD: f64 = 50.0;

/// Syslog identity.
pub const SYSLOG_IDENT: &str = "dhcp-stats";

/// Threshold crossing notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Prefix that crossed the threshold.
    pub prefix: Ipv4Prefix,

    /// Utilization at the time of crossing.
    pub utilization: f64,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prefix {} exceeded 50% of allocations.", self.prefix)
    }
}

/// Fire a one-shot alert for every prefix above the threshold.
///
/// Once fired, the flag stays set for the rest of the run even if
/// utilization falls back.
pub fn check_alerts(entries: &mut [PrefixEntry]) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for entry in entries.iter_mut() {
        if entry.utilization > ALERT_THRESHOLD && !entry.alert_sent {
            entry.alert_sent = true;
            alerts.push(Alert {
                prefix: entry.prefix,
                utilization: entry.utilization,
            });
        }
    }

    alerts
}

/// Alert delivery.
pub trait AlertSink {
    fn notify(&mut self, alert: &Alert) -> Result<(), DhcpError>;
}

/// Deliver alerts to the system logger, LOCAL1 facility at NOTICE level.
pub struct SyslogSink {
    /// openlog(3) keeps the pointer, it must outlive the connection.
    _ident: CString,
}

impl SyslogSink {
    pub fn open(ident: &str) -> Result<SyslogSink, DhcpError> {
        let ident = CString::new(ident)
            .map_err(|e| DhcpError::SyslogError(e.to_string()))?;

        unsafe {
            libc::openlog(ident.as_ptr(), libc::LOG_CONS | libc::LOG_PID | libc::LOG_NDELAY, libc::LOG_LOCAL1);
        }

        Ok(SyslogSink { _ident: ident })
    }
}

impl AlertSink for SyslogSink {
    fn notify(&mut self, alert: &Alert) -> Result<(), DhcpError> {
        let msg = CString::new(alert.to_string())
            .map_err(|e| DhcpError::SyslogError(e.to_string()))?;

        unsafe {
            libc::syslog(libc::LOG_NOTICE, b"%s\0".as_ptr() as *const libc::c_char, msg.as_ptr());
        }

        Ok(())
    }
}

impl Drop for SyslogSink {
    fn drop(&mut self) {
        unsafe {
            libc::closelog();
        }
    }
}

/// Deliver alerts through the log facade.
#[derive(Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn notify(&mut self, alert: &Alert) -> Result<(), DhcpError> {
        warn!("{}", alert);
        Ok(())
    }
}
