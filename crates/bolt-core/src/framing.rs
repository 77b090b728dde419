//! Chunked transport framing: splitting a message payload into
//! length-prefixed chunks on the way out, and reassembling chunks back
//! into a message payload on the way in.
//!
//! This module is pure byte manipulation — no I/O. `bolt-connection`
//! drives these functions against the socket.

use bytes::{BufMut, BytesMut};

use crate::error::CodecError;

/// Chunks larger than this never occur in practice (PackStream values
/// this driver builds top out in the low megabytes), but the format
/// allows any `u16` length; 0xFFFF is the true wire maximum.
pub const MAX_CHUNK_SIZE: usize = 0xFFFF;

/// Splits `payload` into `u16`-length-prefixed chunks terminated by a
/// zero-length chunk, appending the result to `out`.
pub fn write_chunked(payload: &[u8], out: &mut BytesMut) {
    if payload.is_empty() {
        out.put_u16(0);
        return;
    }
    for chunk in payload.chunks(MAX_CHUNK_SIZE) {
        out.put_u16(chunk.len() as u16);
        out.put_slice(chunk);
    }
    out.put_u16(0);
}

/// Incrementally reassembles chunks into complete message payloads.
///
/// Call [`Dechunker::feed`] with bytes as they arrive; each call returns
/// the messages that became complete as a result, in order. Bytes that
/// don't yet form a full chunk header/body are retained internally.
#[derive(Debug, Default)]
pub struct Dechunker {
    pending: BytesMut,
    current_message: Vec<u8>,
}

impl Dechunker {
    pub fn new() -> Self {
        Dechunker::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
        self.pending.extend_from_slice(bytes);
        let mut completed = Vec::new();
        loop {
            if self.pending.len() < 2 {
                break;
            }
            let len = u16::from_be_bytes([self.pending[0], self.pending[1]]) as usize;
            if self.pending.len() < 2 + len {
                break;
            }
            let chunk = self.pending.split_to(2 + len);
            let body = &chunk[2..];
            if len == 0 {
                completed.push(std::mem::take(&mut self.current_message));
            } else {
                self.current_message.extend_from_slice(body);
            }
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_writes_single_zero_chunk() {
        let mut out = BytesMut::new();
        write_chunked(&[], &mut out);
        assert_eq!(&out[..], &[0, 0]);
    }

    #[test]
    fn small_payload_is_one_chunk_plus_terminator() {
        let mut out = BytesMut::new();
        write_chunked(&[1, 2, 3], &mut out);
        assert_eq!(&out[..], &[0, 3, 1, 2, 3, 0, 0]);
    }

    #[test]
    fn oversized_payload_splits_across_multiple_chunks() {
        let payload = vec![7u8; MAX_CHUNK_SIZE + 10];
        let mut out = BytesMut::new();
        write_chunked(&payload, &mut out);
        // first chunk: 0xFFFF bytes, second: 10 bytes, then terminator.
        assert_eq!(&out[0..2], &(MAX_CHUNK_SIZE as u16).to_be_bytes());
        let second_len_at = 2 + MAX_CHUNK_SIZE;
        assert_eq!(
            &out[second_len_at..second_len_at + 2],
            &(10u16).to_be_bytes()
        );
    }

    #[test]
    fn dechunker_reassembles_single_message_fed_whole() {
        let mut out = BytesMut::new();
        write_chunked(&[1, 2, 3], &mut out);
        let mut dechunker = Dechunker::new();
        let messages = dechunker.feed(&out).unwrap();
        assert_eq!(messages, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn dechunker_reassembles_message_fed_byte_at_a_time() {
        let mut out = BytesMut::new();
        write_chunked(&[9, 8, 7], &mut out);
        let mut dechunker = Dechunker::new();
        let mut all = Vec::new();
        for byte in out.iter() {
            all.extend(dechunker.feed(&[*byte]).unwrap());
        }
        assert_eq!(all, vec![vec![9, 8, 7]]);
    }

    #[test]
    fn dechunker_reassembles_message_split_across_multiple_chunks() {
        // two chunks of raw bytes making up one logical message
        let mut out = BytesMut::new();
        out.put_u16(2);
        out.put_slice(&[1, 2]);
        out.put_u16(2);
        out.put_slice(&[3, 4]);
        out.put_u16(0);
        let mut dechunker = Dechunker::new();
        let messages = dechunker.feed(&out).unwrap();
        assert_eq!(messages, vec![vec![1, 2, 3, 4]]);
    }

    #[test]
    fn dechunker_handles_back_to_back_messages_in_one_feed() {
        let mut out = BytesMut::new();
        write_chunked(&[1], &mut out);
        write_chunked(&[2], &mut out);
        let mut dechunker = Dechunker::new();
        let messages = dechunker.feed(&out).unwrap();
        assert_eq!(messages, vec![vec![1], vec![2]]);
    }
}
