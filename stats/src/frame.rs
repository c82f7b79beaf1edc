//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Frame:
//  Strip Ethernet, IPv4 and UDP headers off a captured frame and expose
//  the DHCP message it carries.
//

use common::encode::*;

use crate::*;
use crate::message::*;

/// Ethernet II header length.
pub const ETHER_HLEN: usize = 14;

/// Minimum IPv4 header length, IHL of 5.
pub const IPV4_MIN_HLEN: usize = 20;

/// UDP header length.
pub const UDP_HLEN: usize = 8;

/// Smallest frame that can carry the fixed part of a DHCP message.
pub const MIN_FRAME_LEN: usize = ETHER_HLEN + IPV4_MIN_HLEN + UDP_HLEN + DHCP_FIXED_LEN;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const IPPROTO_UDP: u8 = 17;

/// Decode a captured frame down to its DHCP message.
///
/// Only the first `caplen` bytes of `buf` are considered.
pub fn decode_frame(buf: &[u8], caplen: usize) -> Result<DhcpMessage<'_>, DhcpError> {
    let buf = &buf[..caplen.min(buf.len())];
    if buf.len() < MIN_FRAME_LEN {
        return Err(DhcpError::InsufficientBufferSize(
            format!("frame {} < {}", buf.len(), MIN_FRAME_LEN)))
    }

    let ethertype = decode_u16(&buf[12..])?;
    if ethertype != ETHERTYPE_IPV4 {
        return Err(DhcpError::DecodeError(format!("ethertype {:#06x}", ethertype)))
    }

    let ip = &buf[ETHER_HLEN..];
    let version = ip[0] >> 4;
    let ihl = ((ip[0] & 0x0f) as usize) * 4;
    if version != 4 || ihl < IPV4_MIN_HLEN {
        return Err(DhcpError::DecodeError(format!("IP version {} header length {}", version, ihl)))
    }
    if ip[9] != IPPROTO_UDP {
        return Err(DhcpError::DecodeError(format!("IP protocol {}", ip[9])))
    }

    let offset = ETHER_HLEN + ihl + UDP_HLEN;
    match buf.get(offset..) {
        Some(payload) => DhcpMessage::new_from(payload),
        None => Err(DhcpError::InsufficientBufferSize(
            format!("IP header length {} exceeds frame {}", ihl, buf.len()))),
    }
}
