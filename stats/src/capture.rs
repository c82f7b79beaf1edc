//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};
use pcap::{Activated, Capture, Linktype};

use crate::*;

/// BPF filter restricting capture to DHCP server traffic.
pub const CAPTURE_FILTER: &str = "udp port 67";

/// Live capture snapshot length.
pub const CAPTURE_SNAPLEN: i32 = 65535;

/// Live capture read timeout, bounds how long a stop request waits.
pub const CAPTURE_TIMEOUT_MS: i32 = 1000;

/// Where frames come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureSpec {
    /// Replay a capture file.
    File(PathBuf),

    /// Listen on a network interface.
    Interface(String),
}

impl CaptureSpec {
    /// True when the input ends by itself.
    pub fn is_file(&self) -> bool {
        matches!(self, CaptureSpec::File(_))
    }
}

/// A captured frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Captured bytes.
    pub data: Vec<u8>,

    /// Captured length.
    pub caplen: usize,

    /// Arrival time since the epoch.
    pub timestamp: Duration,
}

/// Result of a read from a capture source.
#[derive(Debug)]
pub enum Delivery {
    Frame(Frame),

    /// Nothing arrived before the read timeout.
    Idle,

    /// No more input.
    End,
}

/// Record timestamp as a duration since the epoch.
///
/// Fields of a corrupt record are clamped, a negative time is zero.
pub fn packet_time(sec: i64, usec: i64) -> Duration {
    if sec < 0 {
        return Duration::ZERO
    }
    Duration::new(sec as u64, usec.clamp(0, 999_999) as u32 * 1000)
}

/// Capture source trait.
pub trait CaptureSource {
    fn next_frame(&mut self) -> Result<Delivery, DhcpError>;
}

/// Capture source backed by libpcap.
pub struct PcapSource {
    capture: Capture<dyn Activated>,
}

impl PcapSource {
    /// Open the capture and install the DHCP filter.
    pub fn open(spec: &CaptureSpec) -> Result<PcapSource, DhcpError> {
        let mut capture: Capture<dyn Activated> = match spec {
            CaptureSpec::File(path) => {
                Capture::from_file(path)
                    .map_err(|e| DhcpError::CaptureError(format!("{}: {}", path.display(), e)))?
                    .into()
            }
            CaptureSpec::Interface(name) => {
                Capture::from_device(name.as_str())
                    .map_err(|e| DhcpError::CaptureError(format!("{}: {}", name, e)))?
                    .promisc(false)
                    .snaplen(CAPTURE_SNAPLEN)
                    .timeout(CAPTURE_TIMEOUT_MS)
                    .open()
                    .map_err(|e| DhcpError::CaptureError(format!("{}: {}", name, e)))?
                    .into()
            }
        };

        let linktype = capture.get_datalink();
        if linktype != Linktype::ETHERNET {
            return Err(DhcpError::CaptureError(format!("unsupported link type {:?}", linktype)))
        }

        capture.filter(CAPTURE_FILTER, true)
            .map_err(|e| DhcpError::CaptureError(format!("filter \"{}\": {}", CAPTURE_FILTER, e)))?;

        info!("Capture opened {:?} filter \"{}\"", spec, CAPTURE_FILTER);

        Ok(PcapSource { capture })
    }
}

impl CaptureSource for PcapSource {
    fn next_frame(&mut self) -> Result<Delivery, DhcpError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                Ok(Delivery::Frame(Frame {
                    data: packet.data.to_vec(),
                    caplen: packet.header.caplen as usize,
                    timestamp: packet_time(ts.tv_sec as i64, ts.tv_usec as i64),
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(Delivery::Idle),
            Err(pcap::Error::NoMorePackets) => {
                debug!("Capture exhausted");
                Ok(Delivery::End)
            }
            Err(e) => Err(DhcpError::CaptureError(e.to_string())),
        }
    }
}

/// Capture source replaying frames held in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<Frame>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    /// Queue a frame, captured length is the full buffer.
    pub fn push(&mut self, data: Vec<u8>) {
        let caplen = data.len();
        self.frames.push_back(Frame { data, caplen, timestamp: Duration::ZERO });
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }
}

impl CaptureSource for MemorySource {
    fn next_frame(&mut self) -> Result<Delivery, DhcpError> {
        match self.frames.pop_front() {
            Some(frame) => Ok(Delivery::Frame(frame)),
            None => Ok(Delivery::End),
        }
    }
}
