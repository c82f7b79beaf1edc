//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Distinct addresses confirmed by DHCPACK, in first-seen order.
///
/// Addresses are never removed.
#[derive(Debug, Default)]
pub struct AddressSet {
    /// Addresses in the order they were admitted.
    order: Vec<Ipv4Addr>,

    /// Membership index.
    seen: HashSet<Ipv4Addr>,
}

impl AddressSet {
    pub fn new() -> AddressSet {
        AddressSet::default()
    }

    /// Admit an assigned address.
    ///
    /// Returns false and leaves the set untouched for 0.0.0.0 and for an
    /// address already present.
    pub fn admit(&mut self, addr: Ipv4Addr) -> bool {
        if addr.is_unspecified() || !self.seen.insert(addr) {
            return false;
        }
        self.order.push(addr);
        true
    }

    pub fn contains(&self, addr: &Ipv4Addr) -> bool {
        self.seen.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Ipv4Addr> {
        self.order.iter()
    }
}
