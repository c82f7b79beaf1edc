//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::*;
use crate::alert::*;
use crate::capture::*;
use crate::engine::*;
use crate::view::*;

/// Key wait slice while holding the final table, bounds stop latency.
pub const HOLD_POLL_MS: u64 = 200;

/// Set by SIGINT/SIGTERM.
static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_stop(_signal: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

/// Install SIGINT and SIGTERM handlers and return the flag they set.
pub fn install_stop_handler() -> Result<&'static AtomicBool, DhcpError> {
    let action = SigAction::new(SigHandler::Handler(handle_stop), SaFlags::empty(), SigSet::empty());

    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        unsafe { sigaction(signal, &action) }?;
    }

    Ok(&STOP)
}

/// Frame counters for a run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    /// Frames read from the capture.
    pub frames: u64,

    /// Frames that failed to decode.
    pub malformed: u64,

    /// DHCPACK messages seen, new or not.
    pub acks: u64,

    /// Distinct addresses admitted.
    pub admitted: u64,

    /// Alerts raised.
    pub alerts: u64,

    /// Run ended by a stop request rather than end of input.
    pub interrupted: bool,
}

/// Capture loop driving the engine.
pub struct Monitor<'a, C: CaptureSource, A: AlertSink, V: StatsSink> {
    /// Prefix registry and utilization engine.
    engine: Engine,

    /// Frame source.
    capture: C,

    /// Alert delivery.
    alert: A,

    /// Statistics presentation.
    view: V,

    /// External stop request.
    stop: &'a AtomicBool,
}

impl<'a, C: CaptureSource, A: AlertSink, V: StatsSink> Monitor<'a, C, A, V> {
    pub fn new(engine: Engine, capture: C, alert: A, view: V, stop: &'a AtomicBool) -> Monitor<'a, C, A, V> {
        Monitor {
            engine,
            capture,
            alert,
            view,
            stop,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    fn stop_requested(&mut self) -> Result<bool, DhcpError> {
        Ok(self.stop.load(Ordering::SeqCst) || self.view.stop_requested()?)
    }

    /// Process one frame to completion.
    fn handle_frame(&mut self, frame: &Frame, summary: &mut RunSummary) -> Result<(), DhcpError> {
        summary.frames += 1;

        match self.engine.handle_frame(&frame.data, frame.caplen) {
            FrameOutcome::Malformed => summary.malformed += 1,
            FrameOutcome::Ignored(_) => {}
            FrameOutcome::NoAddress => summary.acks += 1,
            FrameOutcome::Duplicate(address) => {
                summary.acks += 1;
                debug!("DHCPACK {} already seen", address);
            }
            FrameOutcome::Admitted { address, alerts } => {
                summary.acks += 1;
                summary.admitted += 1;
                info!("DHCPACK {} at {:?}", address, frame.timestamp);

                self.view.refresh(&self.engine.snapshot())?;
                for alert in alerts {
                    summary.alerts += 1;
                    self.alert.notify(&alert)?;
                    self.view.notice(&alert)?;
                }
            }
        }

        Ok(())
    }

    fn run_loop(&mut self, summary: &mut RunSummary) -> Result<(), DhcpError> {
        self.view.refresh(&self.engine.snapshot())?;

        loop {
            if self.stop_requested()? {
                summary.interrupted = true;
                return Ok(())
            }

            match self.capture.next_frame()? {
                Delivery::Frame(frame) => self.handle_frame(&frame, summary)?,
                Delivery::Idle => {}
                Delivery::End => return Ok(()),
            }
        }
    }

    /// Keep the final table until a key press or a stop signal.
    fn hold(&mut self) -> Result<(), DhcpError> {
        while !self.stop.load(Ordering::SeqCst) {
            if self.view.wait_key(Duration::from_millis(HOLD_POLL_MS))? {
                break;
            }
        }
        Ok(())
    }

    /// Run until end of input or a stop request.
    ///
    /// The view is finished on every exit path.  After a clean end of input
    /// the view may hold the final table until a key press.
    pub fn run(&mut self, wait_at_end: bool) -> Result<RunSummary, DhcpError> {
        let mut summary = RunSummary::default();

        let result = self.run_loop(&mut summary);
        let held = if wait_at_end && result.is_ok() && !summary.interrupted {
            self.hold()
        } else {
            Ok(())
        };
        let finished = self.view.finish();
        result?;
        held?;
        finished?;

        info!("Capture done {:?}", summary);
        Ok(summary)
    }
}

///
/// Unit tests.
///
#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use crate::frame::tests::frame;
    use crate::prefix::PrefixStats;

    #[derive(Default)]
    struct RecordingAlerts {
        alerts: Vec<String>,
    }

    impl AlertSink for RecordingAlerts {
        fn notify(&mut self, alert: &Alert) -> Result<(), DhcpError> {
            self.alerts.push(alert.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingView {
        refreshes: Vec<Vec<PrefixStats>>,
        notices: usize,
        waits: usize,
        finished: bool,
        quit_after: Option<usize>,
    }

    impl StatsSink for RecordingView {
        fn refresh(&mut self, stats: &[PrefixStats]) -> Result<(), DhcpError> {
            self.refreshes.push(stats.to_vec());
            Ok(())
        }

        fn notice(&mut self, _alert: &Alert) -> Result<(), DhcpError> {
            self.notices += 1;
            Ok(())
        }

        fn stop_requested(&mut self) -> Result<bool, DhcpError> {
            Ok(self.quit_after.map_or(false, |n| self.refreshes.len() >= n))
        }

        fn wait_key(&mut self, _timeout: Duration) -> Result<bool, DhcpError> {
            self.waits += 1;
            Ok(true)
        }

        fn finish(&mut self) -> Result<(), DhcpError> {
            self.finished = true;
            Ok(())
        }
    }

    /// View holding the table with no key ever pressed, a signal arrives
    /// after a few waits.
    struct HoldingView<'a> {
        stop: &'a AtomicBool,
        signal_after: usize,
        waits: usize,
        finished: bool,
    }

    impl StatsSink for HoldingView<'_> {
        fn refresh(&mut self, _stats: &[PrefixStats]) -> Result<(), DhcpError> {
            Ok(())
        }

        fn notice(&mut self, _alert: &Alert) -> Result<(), DhcpError> {
            Ok(())
        }

        fn wait_key(&mut self, _timeout: Duration) -> Result<bool, DhcpError> {
            self.waits += 1;
            if self.waits == self.signal_after {
                self.stop.store(true, Ordering::SeqCst);
            }
            Ok(false)
        }

        fn finish(&mut self) -> Result<(), DhcpError> {
            self.finished = true;
            Ok(())
        }
    }

    struct FailingSource;

    impl CaptureSource for FailingSource {
        fn next_frame(&mut self) -> Result<Delivery, DhcpError> {
            Err(DhcpError::CaptureError("link down".to_string()))
        }
    }

    fn engine(prefixes: &[&str]) -> Engine {
        Engine::new(prefixes.iter().map(|s| s.parse().unwrap()).collect())
    }

    fn ack(addr: Ipv4Addr) -> Vec<u8> {
        frame(5, addr, &[53, 1, 5, 255])
    }

    #[test]
    pub fn test_monitor_run() {
        let mut source = MemorySource::new();
        source.push(ack(Ipv4Addr::new(192, 168, 1, 1)));
        source.push(ack(Ipv4Addr::new(192, 168, 1, 1)));
        source.push(frame(5, Ipv4Addr::new(192, 168, 1, 2), &[53, 1, 2, 255]));
        source.push(vec![0u8; 10]);
        source.push(ack(Ipv4Addr::new(192, 168, 1, 2)));
        source.push(ack(Ipv4Addr::UNSPECIFIED));

        let stop = AtomicBool::new(false);
        let mut monitor = Monitor::new(engine(&["192.168.1.0/30", "10.0.0.0/8"]), source,
                                       RecordingAlerts::default(), RecordingView::default(), &stop);
        let summary = monitor.run(true).unwrap();

        assert_eq!(summary, RunSummary {
            frames: 6,
            malformed: 1,
            acks: 4,
            admitted: 2,
            alerts: 1,
            interrupted: false,
        });
        assert_eq!(monitor.alert.alerts, vec!["prefix 192.168.1.0/30 exceeded 50% of allocations.".to_string()]);

        // Initial table plus one refresh per admitted address.
        let view = monitor.view();
        assert_eq!(view.refreshes.len(), 3);
        assert_eq!(view.refreshes[0][0].allocated, 0);
        assert_eq!(view.refreshes[2][0].allocated, 2);
        assert_eq!(view.refreshes[2][0].utilization, 100.0);
        assert_eq!(view.refreshes[2][1].allocated, 0);
        assert_eq!(view.notices, 1);
        assert_eq!(view.waits, 1);
        assert!(view.finished);
        assert_eq!(monitor.engine().recomputations(), 2);
    }

    #[test]
    pub fn test_monitor_stop_flag() {
        let mut source = MemorySource::new();
        source.push(ack(Ipv4Addr::new(192, 168, 1, 1)));

        let stop = AtomicBool::new(true);
        let mut monitor = Monitor::new(engine(&["192.168.1.0/24"]), source,
                                       RecordingAlerts::default(), RecordingView::default(), &stop);
        let summary = monitor.run(true).unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.frames, 0);
        assert_eq!(monitor.view().waits, 0);
        assert!(monitor.view().finished);
    }

    #[test]
    pub fn test_monitor_view_quit() {
        let mut source = MemorySource::new();
        source.push(ack(Ipv4Addr::new(192, 168, 1, 1)));
        source.push(ack(Ipv4Addr::new(192, 168, 1, 2)));
        source.push(ack(Ipv4Addr::new(192, 168, 1, 3)));

        let stop = AtomicBool::new(false);
        let view = RecordingView { quit_after: Some(2), ..Default::default() };
        let mut monitor = Monitor::new(engine(&["192.168.1.0/24"]), source,
                                       RecordingAlerts::default(), view, &stop);
        let summary = monitor.run(true).unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.admitted, 1);
        assert_eq!(monitor.engine().leases().len(), 1);
    }

    #[test]
    pub fn test_monitor_capture_error() {
        let stop = AtomicBool::new(false);
        let mut monitor = Monitor::new(engine(&["192.168.1.0/24"]), FailingSource,
                                       RecordingAlerts::default(), RecordingView::default(), &stop);

        assert!(matches!(monitor.run(true), Err(DhcpError::CaptureError(_))));
        // View released without waiting.
        assert_eq!(monitor.view().waits, 0);
        assert!(monitor.view().finished);
    }

    #[test]
    pub fn test_monitor_stop_while_holding() {
        let mut source = MemorySource::new();
        source.push(ack(Ipv4Addr::new(192, 168, 1, 1)));

        let stop = AtomicBool::new(false);
        let view = HoldingView { stop: &stop, signal_after: 3, waits: 0, finished: false };
        let mut monitor = Monitor::new(engine(&["192.168.1.0/24"]), source,
                                       RecordingAlerts::default(), view, &stop);
        let summary = monitor.run(true).unwrap();

        assert_eq!(summary.admitted, 1);
        assert_eq!(monitor.view().waits, 3);
        assert!(monitor.view().finished);
    }

    #[test]
    pub fn test_monitor_no_hold() {
        let mut source = MemorySource::new();
        source.push(ack(Ipv4Addr::new(192, 168, 1, 1)));

        let stop = AtomicBool::new(false);
        let mut monitor = Monitor::new(engine(&["192.168.1.0/24"]), source,
                                       RecordingAlerts::default(), RecordingView::default(), &stop);
        monitor.run(false).unwrap();

        assert_eq!(monitor.view().waits, 0);
        assert!(monitor.view().finished);
    }

    #[test]
    pub fn test_install_stop_handler() {
        let stop = install_stop_handler().unwrap();
        assert!(!stop.load(Ordering::SeqCst));
    }
}
