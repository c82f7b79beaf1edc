//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::net::Ipv4Addr;

use log::debug;

use common::DhcpMessageType;

use crate::alert::*;
use crate::frame::*;
use crate::lease::*;
use crate::prefix::*;

/// What became of a single frame.
#[derive(Debug, PartialEq)]
pub enum FrameOutcome {
    /// Frame could not be decoded down to a DHCP message.
    Malformed,

    /// No message type, or a message type other than DHCPACK.
    Ignored(Option<u8>),

    /// DHCPACK without an assigned address.
    NoAddress,

    /// DHCPACK for an address seen before.
    Duplicate(Ipv4Addr),

    /// New address, statistics recomputed.
    Admitted {
        address: Ipv4Addr,
        alerts: Vec<Alert>,
    },
}

/// Prefix registry and utilization engine.
#[derive(Debug)]
pub struct Engine {
    /// Configured prefixes, in configuration order.
    entries: Vec<PrefixEntry>,

    /// Addresses confirmed by DHCPACK.
    leases: AddressSet,

    /// Number of full recomputations so far.
    recomputations: u64,
}

impl Engine {
    pub fn new(prefixes: Vec<Ipv4Prefix>) -> Engine {
        Engine {
            entries: prefixes.into_iter().map(PrefixEntry::new).collect(),
            leases: AddressSet::new(),
            recomputations: 0,
        }
    }

    pub fn entries(&self) -> &[PrefixEntry] {
        &self.entries
    }

    pub fn leases(&self) -> &AddressSet {
        &self.leases
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Admit an assigned address without touching the statistics.
    pub fn admit(&mut self, addr: Ipv4Addr) -> bool {
        self.leases.admit(addr)
    }

    /// Recount every prefix against the full address set.
    ///
    /// O(prefixes x addresses), run once per newly admitted address.
    pub fn recompute(&mut self) {
        for entry in self.entries.iter_mut() {
            let mask = entry.prefix.mask();
            let network = entry.prefix.network();
            let broadcast = entry.prefix.broadcast();

            let mut allocated = 0;
            for addr in self.leases.iter() {
                let addr = u32::from(*addr);
                if addr & mask == network && addr != network && addr != broadcast {
                    allocated += 1;
                }
            }

            entry.allocated = allocated;
            entry.utilization = 100.0 * allocated as f64 / entry.effective_capacity() as f64;
        }

        self.recomputations += 1;
    }

    /// Apply the alert policy to the current statistics.
    pub fn check_alerts(&mut self) -> Vec<Alert> {
        check_alerts(&mut self.entries)
    }

    /// Admit an address and, if it is new, recompute and evaluate alerts.
    pub fn record_lease(&mut self, addr: Ipv4Addr) -> Option<Vec<Alert>> {
        if !self.admit(addr) {
            return None
        }

        self.recompute();
        Some(self.check_alerts())
    }

    /// Run one captured frame through the pipeline.
    pub fn handle_frame(&mut self, buf: &[u8], caplen: usize) -> FrameOutcome {
        let msg = match decode_frame(buf, caplen) {
            Ok(msg) => msg,
            Err(err) => {
                debug!("Skip frame: {}", err);
                return FrameOutcome::Malformed
            }
        };

        let message_type = msg.message_type();
        if message_type != Some(DhcpMessageType::DHCPACK as u8) {
            return FrameOutcome::Ignored(message_type)
        }

        let address = msg.yiaddr();
        if address.is_unspecified() {
            return FrameOutcome::NoAddress
        }

        match self.record_lease(address) {
            Some(alerts) => {
                debug!("DHCPACK {:?}", msg);
                FrameOutcome::Admitted { address, alerts }
            }
            None => FrameOutcome::Duplicate(address),
        }
    }

    /// Current statistics, one row per prefix in configuration order.
    pub fn snapshot(&self) -> Vec<PrefixStats> {
        self.entries.iter().map(|e| e.stats()).collect()
    }
}

///
/// Unit tests.
///
#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::frame;

    fn engine(prefixes: &[&str]) -> Engine {
        Engine::new(prefixes.iter().map(|s| s.parse().unwrap()).collect())
    }

    fn ack(addr: Ipv4Addr) -> Vec<u8> {
        frame(5, addr, &[53, 1, 5, 255])
    }

    #[test]
    pub fn test_scenario_slash24() {
        let mut engine = engine(&["192.168.1.0/24"]);
        assert_eq!(engine.entries()[0].capacity, 254);

        for addr in [Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 1, 20)] {
            let buf = ack(addr);
            match engine.handle_frame(&buf, buf.len()) {
                FrameOutcome::Admitted { address, alerts } => {
                    assert_eq!(address, addr);
                    assert!(alerts.is_empty());
                }
                other => assert!(false, "Unexpected: {:?}", other),
            }
        }

        let entry = &engine.entries()[0];
        assert_eq!(entry.allocated, 2);
        assert!((entry.utilization - 0.787).abs() < 0.01);
        assert!(!entry.alert_sent);
        assert_eq!(engine.snapshot()[0].to_string(), "192.168.1.0/24 254 2 0.79%");
    }

    #[test]
    pub fn test_scenario_slash30_alert_once() {
        let mut engine = engine(&["192.168.1.0/30"]);
        assert_eq!(engine.entries()[0].capacity, 2);

        let buf = ack(Ipv4Addr::new(192, 168, 1, 1));
        match engine.handle_frame(&buf, buf.len()) {
            FrameOutcome::Admitted { alerts, .. } => assert!(alerts.is_empty()),
            other => assert!(false, "Unexpected: {:?}", other),
        }

        let buf = ack(Ipv4Addr::new(192, 168, 1, 2));
        match engine.handle_frame(&buf, buf.len()) {
            FrameOutcome::Admitted { alerts, .. } => {
                assert_eq!(alerts.len(), 1);
                assert_eq!(alerts[0].to_string(), "prefix 192.168.1.0/30 exceeded 50% of allocations.");
                assert_eq!(alerts[0].utilization, 100.0);
            }
            other => assert!(false, "Unexpected: {:?}", other),
        }
        assert_eq!(engine.entries()[0].utilization, 100.0);

        // Network and broadcast addresses are admitted but do not count, no new alert.
        for addr in [Ipv4Addr::new(192, 168, 1, 0), Ipv4Addr::new(192, 168, 1, 3)] {
            assert_eq!(engine.record_lease(addr), Some(vec![]));
        }
        assert_eq!(engine.entries()[0].allocated, 2);
    }

    #[test]
    pub fn test_scenario_slash32() {
        let mut engine = engine(&["10.0.0.5/32"]);
        assert_eq!(engine.entries()[0].capacity, 0);

        let buf = ack(Ipv4Addr::new(10, 0, 0, 5));
        assert!(matches!(engine.handle_frame(&buf, buf.len()), FrameOutcome::Admitted { .. }));

        let entry = &engine.entries()[0];
        assert_eq!(entry.allocated, 0);
        assert_eq!(entry.utilization, 0.0);
        assert!(entry.utilization.is_finite());
        assert!(!entry.alert_sent);
    }

    #[test]
    pub fn test_scenario_short_frame() {
        let mut engine = engine(&["192.168.1.0/24"]);
        let buf = ack(Ipv4Addr::new(192, 168, 1, 10));

        assert_eq!(engine.handle_frame(&buf, MIN_FRAME_LEN - 1), FrameOutcome::Malformed);
        assert_eq!(engine.handle_frame(&buf[..20], 20), FrameOutcome::Malformed);
        assert!(engine.leases().is_empty());
        assert_eq!(engine.recomputations(), 0);
        assert_eq!(engine.entries()[0].allocated, 0);
    }

    #[test]
    pub fn test_scenario_offer_ignored() {
        let mut engine = engine(&["192.168.1.0/24"]);
        let buf = frame(5, Ipv4Addr::new(192, 168, 1, 10), &[53, 1, 2, 255]);

        assert_eq!(engine.handle_frame(&buf, buf.len()), FrameOutcome::Ignored(Some(2)));
        assert!(engine.leases().is_empty());
        assert_eq!(engine.recomputations(), 0);

        let buf = frame(5, Ipv4Addr::new(192, 168, 1, 10), &[255]);
        assert_eq!(engine.handle_frame(&buf, buf.len()), FrameOutcome::Ignored(None));
    }

    #[test]
    pub fn test_no_address_and_duplicate() {
        let mut engine = engine(&["192.168.1.0/24"]);

        let buf = ack(Ipv4Addr::UNSPECIFIED);
        assert_eq!(engine.handle_frame(&buf, buf.len()), FrameOutcome::NoAddress);

        let buf = ack(Ipv4Addr::new(192, 168, 1, 10));
        assert!(matches!(engine.handle_frame(&buf, buf.len()), FrameOutcome::Admitted { .. }));
        assert_eq!(engine.handle_frame(&buf, buf.len()),
                   FrameOutcome::Duplicate(Ipv4Addr::new(192, 168, 1, 10)));

        // One recomputation per new address, none for the rest.
        assert_eq!(engine.recomputations(), 1);
        assert_eq!(engine.leases().len(), 1);
    }

    #[test]
    pub fn test_recompute_idempotent() {
        let mut engine = engine(&["192.168.1.0/24", "192.168.0.0/16", "10.0.0.0/8"]);
        for addr in [Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 7, 1), Ipv4Addr::new(10, 9, 9, 9)] {
            assert!(engine.admit(addr));
        }

        engine.recompute();
        let first = engine.snapshot();
        engine.recompute();
        assert_eq!(engine.snapshot(), first);

        assert_eq!(first[0].allocated, 1);
        assert_eq!(first[1].allocated, 2);
        assert_eq!(first[2].allocated, 1);
    }

    #[test]
    pub fn test_overlapping_and_disjoint_prefixes() {
        let mut engine = engine(&["192.168.1.0/24", "192.168.1.128/25", "172.16.0.0/12", "0.0.0.0/0"]);

        engine.record_lease(Ipv4Addr::new(192, 168, 1, 200));
        engine.record_lease(Ipv4Addr::new(192, 168, 1, 5));
        engine.record_lease(Ipv4Addr::new(8, 8, 8, 8));

        let stats = engine.snapshot();
        assert_eq!(stats[0].allocated, 2);
        assert_eq!(stats[1].allocated, 1);
        assert_eq!(stats[2].allocated, 0);
        assert_eq!(stats[3].allocated, 3);
        assert_eq!(stats[3].capacity, 4294967294);
    }

    #[test]
    pub fn test_host_bits_in_configured_prefix() {
        // Host bits in the configured address are masked off for matching
        // and kept for display.
        let mut engine = engine(&["192.168.1.77/24"]);
        engine.record_lease(Ipv4Addr::new(192, 168, 1, 10));

        let stats = engine.snapshot();
        assert_eq!(stats[0].allocated, 1);
        assert_eq!(stats[0].address, Ipv4Addr::new(192, 168, 1, 77));
    }
}
