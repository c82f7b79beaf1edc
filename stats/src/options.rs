//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use common::DhcpMessageType;

/// DHCP Option header length, code and length bytes.
pub const DHCP_OPTION_HLEN: usize = 2;

/// Options field size after the magic cookie (RFC2131 312 octets minus cookie).
pub const DHCP_OPTIONS_MAX_LEN: usize = 308;

/// Option codes the scanner needs to know about.
pub const OPTION_PAD: u8 = 0;
pub const OPTION_MESSAGE_TYPE: u8 = 53;
pub const OPTION_END: u8 = 255;

/// Walk an options region and return the value of the DHCP Message Type option.
///
/// The region is walked as code/length/value triples.  Pad is a single byte,
/// End terminates the walk.  Every read is bounded by the region length, a
/// length byte pointing past the end terminates the walk with no result.
pub fn scan_message_type(region: &[u8]) -> Option<u8> {
    let mut offset = 0;

    while offset < region.len() {
        let code = region[offset];
        match code {
            OPTION_PAD => {
                offset += 1;
                continue;
            }
            OPTION_END => return None,
            OPTION_MESSAGE_TYPE => {
                // Length byte is not trusted, the value is the byte after it.
                return region.get(offset + DHCP_OPTION_HLEN).copied();
            }
            _ => {}
        }

        let len = *region.get(offset + 1)? as usize;
        offset += DHCP_OPTION_HLEN + len;
    }

    None
}

/// Return true if the region carries a DHCPACK message type.
pub fn is_ack(region: &[u8]) -> bool {
    scan_message_type(region) == Some(DhcpMessageType::DHCPACK as u8)
}
