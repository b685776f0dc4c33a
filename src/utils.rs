//! Utility functions for DNS wire format.
//!
//! Bounds-checked readers for big-endian integers and domain names, and the
//! matching writer for names. Every reader returns a `WireError` instead of
//! indexing past the end of the packet.

use crate::errors::WireError;
use crate::message::{Name, HEADER_LEN};

/// Maximum length of a single label.
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a name in wire format.
pub const MAX_NAME_LEN: usize = 255;

/// Return `packet[offset..offset + needed]` or a `Truncated` error.
pub fn take(packet: &[u8], offset: usize, needed: usize) -> Result<&[u8], WireError> {
    offset
        .checked_add(needed)
        .and_then(|end| packet.get(offset..end))
        .ok_or(WireError::Truncated {
            offset,
            needed,
            len: packet.len(),
        })
}

/// Read a big-endian `u16` at `offset`.
pub fn read_u16(packet: &[u8], offset: usize) -> Result<u16, WireError> {
    let bytes = take(packet, offset, 2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Read a big-endian `u32` at `offset`.
pub fn read_u32(packet: &[u8], offset: usize) -> Result<u32, WireError> {
    let bytes = take(packet, offset, 4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a possibly compressed domain name.
///
/// # Arguments
/// * `packet` - The whole DNS message; pointers are relative to its start
///   and may not point into the fixed header.
/// * `offset` - Where the name begins.
///
/// # Returns
/// The name and the offset of the first byte after it in the original
/// (uncompressed) position.
pub fn read_name(packet: &[u8], offset: usize) -> Result<(Name, usize), WireError> {
    let mut labels = Vec::new();
    let mut pos = offset;
    let mut end = None;
    let mut wire_len = 1;
    // Every pointer must land before the run of labels that contains it,
    // so the floor strictly decreases and the walk terminates.
    let mut floor = offset;

    loop {
        let len = take(packet, pos, 1)?[0];
        match len & 0xC0 {
            0x00 => {
                if len == 0 {
                    return Ok((Name::from_labels(labels), end.unwrap_or(pos + 1)));
                }
                let len = len as usize;
                if len > MAX_LABEL_LEN {
                    return Err(WireError::LabelTooLong(len));
                }
                wire_len += len + 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(WireError::NameTooLong);
                }
                labels.push(take(packet, pos + 1, len)?.to_vec());
                pos += len + 1;
            }
            0xC0 => {
                let target = (read_u16(packet, pos)? & 0x3FFF) as usize;
                if target < HEADER_LEN || target >= floor {
                    return Err(WireError::BadPointer { at: pos, target });
                }
                end.get_or_insert(pos + 2);
                floor = target;
                pos = target;
            }
            other => return Err(WireError::BadLabelType(other)),
        }
    }
}

/// Append `name` in uncompressed wire format.
pub fn write_name(name: &Name, out: &mut Vec<u8>) {
    for label in name.labels() {
        out.push(label.len() as u8);
        out.extend_from_slice(label);
    }
    out.push(0); // Root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_name() {
        let packet = b"\x07example\x03com\x00\xff";
        let (name, next) = read_name(packet, 0).unwrap();
        assert_eq!(name.to_string(), "example.com.");
        assert_eq!(next, 13);
    }

    #[test]
    fn follows_backward_pointer() {
        // Header, "com" at 12, then "www" + pointer to 12 at 17.
        let mut packet = vec![0u8; HEADER_LEN];
        packet.extend_from_slice(b"\x03com\x00\x03www\xc0\x0c");
        let (name, next) = read_name(&packet, 17).unwrap();
        assert_eq!(name.to_string(), "www.com.");
        assert_eq!(next, packet.len());
    }

    #[test]
    fn rejects_pointer_into_header() {
        let mut packet = vec![0u8; HEADER_LEN];
        packet.extend_from_slice(b"\xc0\x00");
        assert_eq!(
            read_name(&packet, HEADER_LEN),
            Err(WireError::BadPointer { at: 12, target: 0 })
        );
    }

    #[test]
    fn rejects_self_pointer() {
        let packet = b"\xc0\x00";
        assert_eq!(
            read_name(packet, 0),
            Err(WireError::BadPointer { at: 0, target: 0 })
        );
    }

    #[test]
    fn rejects_pointer_into_own_labels() {
        // "a" then a pointer back to the start of the same name.
        let packet = b"\x01a\xc0\x00";
        assert_eq!(
            read_name(packet, 0),
            Err(WireError::BadPointer { at: 2, target: 0 })
        );
    }

    #[test]
    fn rejects_truncated_label() {
        let packet = b"\x05abc";
        assert!(matches!(
            read_name(packet, 0),
            Err(WireError::Truncated { offset: 1, needed: 5, .. })
        ));
    }

    #[test]
    fn rejects_reserved_label_type() {
        assert_eq!(read_name(b"\x41", 0), Err(WireError::BadLabelType(0x40)));
    }

    #[test]
    fn rejects_overlong_name() {
        let mut packet = Vec::new();
        for _ in 0..5 {
            packet.push(63);
            packet.extend_from_slice(&[b'a'; 63]);
        }
        packet.push(0);
        assert_eq!(read_name(&packet, 0), Err(WireError::NameTooLong));
    }

    #[test]
    fn write_then_read_name() {
        let name = Name::from_ascii("ns1.example.org");
        let mut out = Vec::new();
        write_name(&name, &mut out);
        assert_eq!(out.len(), name.wire_len());
        assert_eq!(read_name(&out, 0).unwrap().0, name);
    }

    #[test]
    fn integer_reads_are_bounds_checked() {
        assert_eq!(read_u16(&[0x12, 0x34], 0), Ok(0x1234));
        assert!(read_u16(&[0x12], 0).is_err());
        assert!(read_u32(&[0, 0, 0], 0).is_err());
        assert!(take(&[], usize::MAX, 2).is_err());
    }
}
