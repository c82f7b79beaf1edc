//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::*;

/// Maximum IPv4 prefix length.
pub const IPV4_MAX_PREFIXLEN: u8 = 32;

/// IPv4 prefix as configured, host bits are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Prefix {
    /// Address as given in configuration.
    address: Ipv4Addr,

    /// Prefix length, 0 to 32.
    length: u8,
}

impl Ipv4Prefix {
    pub fn new(address: Ipv4Addr, length: u8) -> Result<Ipv4Prefix, DhcpError> {
        if length > IPV4_MAX_PREFIXLEN {
            return Err(DhcpError::InvalidPrefix(format!("{}/{}: prefix length out of range", address, length)))
        }
        Ok(Ipv4Prefix { address, length })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    /// Subnet mask, top `length` bits set.
    pub fn mask(&self) -> u32 {
        match self.length {
            0 => 0,
            len => u32::MAX << (IPV4_MAX_PREFIXLEN - len),
        }
    }

    pub fn network(&self) -> u32 {
        u32::from(self.address) & self.mask()
    }

    pub fn broadcast(&self) -> u32 {
        u32::from(self.address) | !self.mask()
    }

    /// Number of usable host addresses, network and broadcast excluded.
    pub fn capacity(&self) -> u64 {
        match self.length {
            IPV4_MAX_PREFIXLEN => 0,
            len => (1u64 << (IPV4_MAX_PREFIXLEN - len)).saturating_sub(2),
        }
    }

    /// Return true if addr is a usable host address of this prefix.
    pub fn contains_host(&self, addr: Ipv4Addr) -> bool {
        let addr = u32::from(addr);
        addr & self.mask() == self.network() && addr != self.network() && addr != self.broadcast()
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.length)
    }
}

impl FromStr for Ipv4Prefix {
    type Err = DhcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split('/').collect();
        if tokens.len() != 2 {
            return Err(DhcpError::InvalidPrefix(format!("{}: expected IP/prefix", s)))
        }

        let address = tokens[0].parse::<Ipv4Addr>()
            .map_err(|_| DhcpError::InvalidPrefix(format!("{}: invalid IP address", s)))?;
        let length = tokens[1].parse::<u8>()
            .map_err(|_| DhcpError::InvalidPrefix(format!("{}: prefix length is not a valid integer", s)))?;

        Ipv4Prefix::new(address, length)
    }
}

/// Per prefix utilization state.
#[derive(Debug, Clone)]
pub struct PrefixEntry {
    /// Configured prefix.
    pub prefix: Ipv4Prefix,

    /// Usable host addresses.
    pub capacity: u64,

    /// Distinct admitted addresses within usable range.
    pub allocated: u64,

    /// 100 * allocated / max(capacity, 1).
    pub utilization: f64,

    /// Threshold alert has fired, never reset.
    pub alert_sent: bool,
}

impl PrefixEntry {
    pub fn new(prefix: Ipv4Prefix) -> PrefixEntry {
        PrefixEntry {
            prefix,
            capacity: prefix.capacity(),
            allocated: 0,
            utilization: 0.0,
            alert_sent: false,
        }
    }

    /// Capacity used as divisor, a degenerate prefix counts as one host.
    pub fn effective_capacity(&self) -> u64 {
        self.capacity.max(1)
    }

    pub fn stats(&self) -> PrefixStats {
        PrefixStats {
            address: self.prefix.address(),
            length: self.prefix.length(),
            capacity: self.capacity,
            allocated: self.allocated,
            utilization: self.utilization,
        }
    }
}

/// One row of the statistics table.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixStats {
    pub address: Ipv4Addr,
    pub length: u8,
    pub capacity: u64,
    pub allocated: u64,
    pub utilization: f64,
}

impl fmt::Display for PrefixStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {} {} {:.2}%", self.address, self.length, self.capacity, self.allocated, self.utilization)
    }
}
