//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::fmt;
use std::net::Ipv4Addr;

use common::encode::*;
use common::BootpMessageType;
use common::DHCP_MAGIC_COOKIE;

use crate::*;
use crate::options::*;

/// Length of BOOTP compatible fields, op through file.
pub const DHCP_FIXED_LEN: usize = 236;

/// Offset of the options region, after the magic cookie.
pub const DHCP_OPTIONS_OFFSET: usize = DHCP_FIXED_LEN + DHCP_MAGIC_COOKIE.len();

/// DHCP message view over a received frame.
///
/// Nothing is copied, fields are decoded on access.  The buffer is
/// guaranteed to hold at least `DHCP_FIXED_LEN` bytes.
#[derive(Clone, Copy)]
pub struct DhcpMessage<'a> {
    buf: &'a [u8],
}

fn chaddr_str(hlen: u8, chaddr: &[u8]) -> String {
    let len = (hlen as usize).min(chaddr.len());
    chaddr[..len].iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

impl fmt::Debug for DhcpMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op: {:?}, htype: {}, hlen: {}, xid: {:#8x}, yiaddr: {}, chaddr: {}, message type: {:?}",
               self.op().ok(), self.htype(), self.hlen(), self.xid(), self.yiaddr(),
               chaddr_str(self.hlen(), self.chaddr()), self.message_type())
    }
}

/// DhcpMessage implementation.
impl<'a> DhcpMessage<'a> {
    /// Wrap a UDP payload.
    pub fn new_from(buf: &'a [u8]) -> Result<DhcpMessage<'a>, DhcpError> {
        if buf.len() < DHCP_FIXED_LEN {
            return Err(DhcpError::InsufficientBufferSize(
                format!("DHCP message {} < {}", buf.len(), DHCP_FIXED_LEN)))
        }

        Ok(DhcpMessage { buf })
    }

    /// Message op code.
    pub fn op(&self) -> Result<BootpMessageType, DhcpError> {
        Ok(BootpMessageType::try_from(self.buf[0])?)
    }

    /// Hardware type.
    pub fn htype(&self) -> u8 {
        self.buf[1]
    }

    /// Hardware address len.
    pub fn hlen(&self) -> u8 {
        self.buf[2]
    }

    /// Transaction ID.
    pub fn xid(&self) -> u32 {
        decode_u32(&self.buf[4..]).unwrap_or_default()
    }

    /// Your (client) IP address.
    pub fn yiaddr(&self) -> Ipv4Addr {
        decode_ipv4(&self.buf[16..]).unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    /// Client Hardware address.
    pub fn chaddr(&self) -> &'a [u8] {
        &self.buf[28..44]
    }

    /// Options region following the magic cookie.
    ///
    /// Empty if the cookie is absent, capped at `DHCP_OPTIONS_MAX_LEN`.
    pub fn options(&self) -> &'a [u8] {
        match self.buf.get(DHCP_FIXED_LEN..DHCP_OPTIONS_OFFSET) {
            Some(cookie) if cookie == DHCP_MAGIC_COOKIE => {
                let end = self.buf.len().min(DHCP_OPTIONS_OFFSET + DHCP_OPTIONS_MAX_LEN);
                &self.buf[DHCP_OPTIONS_OFFSET..end]
            }
            _ => &[],
        }
    }

    /// Value of the DHCP Message Type option, if any.
    pub fn message_type(&self) -> Option<u8> {
        scan_message_type(self.options())
    }

    /// Return true if this is a DHCPACK.
    pub fn is_ack(&self) -> bool {
        is_ack(self.options())
    }
}
