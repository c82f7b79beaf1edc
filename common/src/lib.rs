//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

pub mod encode;

use std::convert::TryFrom;

use thiserror::Error;

/// DHCP magic cookie, first four bytes of the options field.
pub const DHCP_MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

#[derive(Error, Debug, PartialEq)]
pub enum WireError {
    #[error("Invalid BOOTP Message Type")]
    InvalidBootpMessageType,
    #[error("Insuffcient buffer size {0}")]
    InsufficientBufferSize(String),
    #[error("Invalid DHCP Message Type")]
    InvalidDhcpMessageType,
}

/// BOOTP op code.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum BootpMessageType {
    BOOTREQUEST = 1,
    BOOTREPLY = 2,
}

impl TryFrom<u8> for BootpMessageType {
    type Error = WireError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(BootpMessageType::BOOTREQUEST),
            2 => Ok(BootpMessageType::BOOTREPLY),
            _ => Err(WireError::InvalidBootpMessageType),
        }
    }
}

/// DHCP Message Type, value of option 53 (RFC 2132 9.6).
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum DhcpMessageType {
    DHCPDISCOVER = 1,
    DHCPOFFER = 2,
    DHCPREQUEST = 3,
    DHCPDECLINE = 4,
    DHCPACK = 5,
    DHCPNAK = 6,
    DHCPRELEASE = 7,
    DHCPINFORM = 8,
}

impl TryFrom<u8> for DhcpMessageType {
    type Error = WireError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        use DhcpMessageType::*;

        [DHCPDISCOVER, DHCPOFFER, DHCPREQUEST, DHCPDECLINE, DHCPACK, DHCPNAK, DHCPRELEASE, DHCPINFORM]
            .into_iter()
            .find(|t| *t as u8 == v)
            .ok_or(WireError::InvalidDhcpMessageType)
    }
}
