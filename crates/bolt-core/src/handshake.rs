//! Magic preamble and version negotiation.
//!
//! The wire layout here is genuinely fixed-size, so it's expressed as
//! `zerocopy` structs the same way the rest of this lineage represents
//! fixed headers — `AsBytes`/`FromBytes` derives plus a
//! `static_assertions::assert_eq_size!` pinning the on-wire size, so a
//! future field addition that breaks layout fails to compile instead of
//! silently shipping a malformed handshake.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::config::ProtocolVersion;
use crate::error::HandshakeError;

pub const MAGIC_PREAMBLE: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// A single 4-byte candidate slot in the handshake request. Big-endian
/// by construction: byte 0 is the most significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct CandidateSlot {
    bytes: [u8; 4],
}

assert_eq_size!(CandidateSlot, [u8; 4]);

impl CandidateSlot {
    pub const ZERO: CandidateSlot = CandidateSlot { bytes: [0; 4] };

    /// A single exact version: major/minor in the low two bytes,
    /// range fields left zero (equivalent to a range of size 1).
    pub fn exact(version: ProtocolVersion) -> Self {
        CandidateSlot {
            bytes: [0, 0, version.major, version.minor],
        }
    }

    /// A range of minor versions `[version.minor - minor_count, version.minor]`
    /// at a fixed major, as introduced in 4.3 to let a client offer many
    /// minors without consuming four candidate slots.
    ///
    /// Per the spec the 32-bit big-endian word is laid out
    /// `[minor_count, minor, major, 0]`.
    pub fn range(version: ProtocolVersion, minor_count: u8) -> Self {
        CandidateSlot {
            bytes: [minor_count, version.minor, version.major, 0],
        }
    }

    pub fn as_u32(self) -> u32 {
        u32::from_be_bytes(self.bytes)
    }
}

/// The fixed 20-byte handshake request: the magic preamble followed by
/// four candidate slots (unused slots are zero-filled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct HandshakeRequest {
    magic: [u8; 4],
    candidates: [CandidateSlot; 4],
}

assert_eq_size!(HandshakeRequest, [u8; 20]);

impl HandshakeRequest {
    /// Builds a request from up to four candidates, highest priority
    /// first. Fewer than four candidates pads the remaining slots with
    /// zero (meaning "not offered").
    pub fn new(candidates: &[CandidateSlot]) -> Self {
        let mut slots = [CandidateSlot::ZERO; 4];
        for (slot, candidate) in slots.iter_mut().zip(candidates.iter()) {
            *slot = *candidate;
        }
        HandshakeRequest {
            magic: MAGIC_PREAMBLE,
            candidates: slots,
        }
    }

    pub fn to_bytes(self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out[0..4].copy_from_slice(&self.magic);
        for (i, slot) in self.candidates.iter().enumerate() {
            out[4 + i * 4..8 + i * 4].copy_from_slice(&slot.bytes);
        }
        out
    }
}

/// Builds the default handshake request offering the driver's
/// candidate versions, range-encoding consecutive same-major minors
/// from 4.3 onward to fit more coverage into the four slots.
pub fn build_request(candidate_versions: &[ProtocolVersion]) -> HandshakeRequest {
    let mut slots = Vec::with_capacity(4);
    let mut i = 0;
    while i < candidate_versions.len() && slots.len() < 4 {
        let head = candidate_versions[i];
        if head >= ProtocolVersion::new(4, 3) {
            let mut run_end = i;
            while run_end + 1 < candidate_versions.len() {
                let next = candidate_versions[run_end + 1];
                let current = candidate_versions[run_end];
                if next.major == head.major && current.minor == next.minor + 1 {
                    run_end += 1;
                } else {
                    break;
                }
            }
            let minor_count = (head.minor - candidate_versions[run_end].minor) as u8;
            slots.push(CandidateSlot::range(head, minor_count));
            i = run_end + 1;
        } else {
            slots.push(CandidateSlot::exact(head));
            i += 1;
        }
    }
    HandshakeRequest::new(&slots)
}

/// Parses the server's chosen-version reply: a single big-endian u32
/// whose low two bytes are `(major, minor)`. `0` means no candidate was
/// acceptable.
pub fn parse_response(bytes: [u8; 4]) -> Result<ProtocolVersion, HandshakeError> {
    let word = u32::from_be_bytes(bytes);
    if word == 0 {
        return Err(HandshakeError::NoAcceptableVersion);
    }
    if bytes[0] != 0 || bytes[1] != 0 {
        // A well-formed reply never sets the range-encoding bytes; a
        // server returning one is speaking a handshake dialect this
        // driver doesn't understand.
        return Err(HandshakeError::MalformedResponse);
    }
    Ok(ProtocolVersion::new(bytes[2], bytes[3]))
}

pub fn check_preamble(bytes: &[u8]) -> Result<(), HandshakeError> {
    if bytes != MAGIC_PREAMBLE {
        return Err(HandshakeError::BadPreamble);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_exactly_twenty_bytes() {
        let req = build_request(&[ProtocolVersion::new(5, 4)]);
        assert_eq!(req.to_bytes().len(), 20);
    }

    #[test]
    fn request_starts_with_magic_preamble() {
        let req = build_request(&[ProtocolVersion::new(5, 4)]);
        assert_eq!(&req.to_bytes()[0..4], &MAGIC_PREAMBLE);
    }

    #[test]
    fn range_encodes_consecutive_minors_from_4_3() {
        let versions = vec![
            ProtocolVersion::new(5, 4),
            ProtocolVersion::new(5, 3),
            ProtocolVersion::new(5, 2),
            ProtocolVersion::new(5, 1),
        ];
        let req = build_request(&versions);
        let bytes = req.to_bytes();
        // first candidate slot: minor_count=3, minor=4, major=5, 0
        assert_eq!(&bytes[4..8], &[3, 4, 5, 0]);
    }

    #[test]
    fn exact_encoding_below_4_3() {
        let req = build_request(&[ProtocolVersion::new(3, 0)]);
        let bytes = req.to_bytes();
        assert_eq!(&bytes[4..8], &[0, 0, 3, 0]);
    }

    #[test]
    fn parse_response_rejects_zero() {
        assert_eq!(
            parse_response([0, 0, 0, 0]),
            Err(HandshakeError::NoAcceptableVersion)
        );
    }

    #[test]
    fn parse_response_reads_major_minor() {
        assert_eq!(parse_response([0, 0, 5, 4]), Ok(ProtocolVersion::new(5, 4)));
    }

    #[test]
    fn parse_response_rejects_range_shaped_reply() {
        assert_eq!(
            parse_response([1, 4, 5, 0]),
            Err(HandshakeError::MalformedResponse)
        );
    }

    #[test]
    fn check_preamble_rejects_mismatch() {
        assert_eq!(
            check_preamble(&[0x60, 0x60, 0xB0, 0x00]),
            Err(HandshakeError::BadPreamble)
        );
        assert!(check_preamble(&MAGIC_PREAMBLE).is_ok());
    }
}
