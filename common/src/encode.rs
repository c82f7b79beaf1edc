//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Encode:
//  Bounds checked helpers to put/get network byte order values into/from
//  a buffer.  A short buffer is reported as an error, never a panic.
//

use std::mem::size_of;
use std::net::Ipv4Addr;

use crate::WireError;

fn check_len(have: usize, need: usize, what: &str) -> Result<(), WireError> {
    if have < need {
        Err(WireError::InsufficientBufferSize(format!("{} needs {} bytes, have {}", what, need, have)))
    } else {
        Ok(())
    }
}

/// Copy arbitrary number of bytes from a slice to other.
pub fn encode_data(buf: &mut [u8], data: &[u8]) -> Result<usize, WireError> {
    check_len(buf.len(), data.len(), "data")?;
    buf[..data.len()].copy_from_slice(data);
    Ok(data.len())
}

/// Encode u8 value into buffer.
pub fn encode_u8(buf: &mut [u8], v: u8) -> Result<usize, WireError> {
    encode_data(buf, &[v])
}

/// Encode u16 value into buffer.
pub fn encode_u16(buf: &mut [u8], v: u16) -> Result<usize, WireError> {
    encode_data(buf, &v.to_be_bytes())
}

/// Encode u32 value into buffer.
pub fn encode_u32(buf: &mut [u8], v: u32) -> Result<usize, WireError> {
    encode_data(buf, &v.to_be_bytes())
}

/// Encode IPv4 address into buffer.
pub fn encode_ipv4(buf: &mut [u8], v: Ipv4Addr) -> Result<usize, WireError> {
    encode_data(buf, &v.octets())
}

/// Return u8 value.
pub fn decode_u8(data: &[u8]) -> Result<u8, WireError> {
    check_len(data.len(), size_of::<u8>(), "u8")?;
    Ok(data[0])
}

/// Return u16 value in host byte order.
pub fn decode_u16(data: &[u8]) -> Result<u16, WireError> {
    check_len(data.len(), size_of::<u16>(), "u16")?;
    Ok((data[0] as u16) << 8 | data[1] as u16)
}

/// Return u32 value in host byte order.
pub fn decode_u32(data: &[u8]) -> Result<u32, WireError> {
    check_len(data.len(), size_of::<u32>(), "u32")?;
    Ok((data[0] as u32) << 24 | (data[1] as u32) << 16 | (data[2] as u32) << 8 | data[3] as u32)
}

/// Return Ipv4Addr.
pub fn decode_ipv4(data: &[u8]) -> Result<Ipv4Addr, WireError> {
    check_len(data.len(), size_of::<Ipv4Addr>(), "Ipv4Addr")?;
    Ok(Ipv4Addr::new(data[0], data[1], data[2], data[3]))
}
