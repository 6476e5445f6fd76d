//! Byte-stream framer for interleaved UBX binary frames and NMEA text sentences.
//!
//! The framer keeps its state between calls, so a stream may be delivered in chunks
//! of any size and produces the same messages as one large call.

use crate::error::FrameError;
use log::{debug, trace};

pub const UBX_SYNC_1: u8 = 0xB5;
pub const UBX_SYNC_2: u8 = 0x62;
/// Longest NMEA sentence, `$` through `\r\n` inclusive.
pub const MAX_SENTENCE_LEN: usize = 82;
pub const DEFAULT_MAX_UBX_PAYLOAD: usize = 8_192;

/// One complete, validated unit of the receiver stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawMessage {
    BinaryFrame { class: u8, id: u8, payload: Vec<u8> },
    TextSentence(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SearchingSync,
    SyncByte2,
    Class,
    Id,
    LengthLow,
    LengthHigh,
    Payload,
    ChecksumA,
    ChecksumB,
    SentenceBody,
}

// Partially received UBX frame. Checksum is accumulated as bytes arrive.
#[derive(Debug, Default)]
struct PendingFrame {
    class: u8,
    id: u8,
    length: usize,
    payload: Vec<u8>,
    ck_a: u8,
    ck_b: u8,
    received_a: u8,
}

impl PendingFrame {
    fn absorb(&mut self, byte: u8) {
        self.ck_a = self.ck_a.wrapping_add(byte);
        self.ck_b = self.ck_b.wrapping_add(self.ck_a);
    }
}

pub struct FrameParser {
    state: State,
    frame: PendingFrame,
    sentence: Vec<u8>,
    max_payload: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UBX_PAYLOAD)
    }
}

impl FrameParser {
    pub fn new(max_payload: usize) -> Self {
        Self {
            state: State::SearchingSync,
            frame: PendingFrame::default(),
            sentence: Vec::with_capacity(MAX_SENTENCE_LEN),
            max_payload,
        }
    }

    /// Consume a chunk and return every message it completes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<RawMessage> {
        let mut out = Vec::new();
        self.push_bytes(bytes, &mut out);
        out
    }

    /// Consume a chunk, appending completed messages to `out`.
    ///
    /// Returns the frames and sentences rejected while consuming this chunk.
    pub fn push_bytes(&mut self, bytes: &[u8], out: &mut Vec<RawMessage>) -> Vec<FrameError> {
        let mut rejected = Vec::new();
        for &byte in bytes {
            if let Err(err) = self.step(byte, out) {
                debug!("dropped candidate frame: {err}");
                rejected.push(err);
            }
        }
        rejected
    }

    pub fn reset(&mut self) {
        self.state = State::SearchingSync;
        self.frame = PendingFrame::default();
        self.sentence.clear();
    }

    fn step(&mut self, byte: u8, out: &mut Vec<RawMessage>) -> Result<(), FrameError> {
        match self.state {
            State::SearchingSync => self.search(byte),
            State::SyncByte2 => {
                if byte == UBX_SYNC_2 {
                    self.frame = PendingFrame::default();
                    self.state = State::Class;
                } else {
                    self.state = State::SearchingSync;
                    self.search(byte);
                }
            }
            State::Class => {
                self.frame.class = byte;
                self.frame.absorb(byte);
                self.state = State::Id;
            }
            State::Id => {
                self.frame.id = byte;
                self.frame.absorb(byte);
                self.state = State::LengthLow;
            }
            State::LengthLow => {
                self.frame.length = usize::from(byte);
                self.frame.absorb(byte);
                self.state = State::LengthHigh;
            }
            State::LengthHigh => {
                self.frame.length |= usize::from(byte) << 8;
                self.frame.absorb(byte);
                if self.frame.length > self.max_payload {
                    self.state = State::SearchingSync;
                    return Err(FrameError::OversizedPayload {
                        class: self.frame.class,
                        id: self.frame.id,
                        length: self.frame.length,
                    });
                }
                self.frame.payload = Vec::with_capacity(self.frame.length);
                self.state = if self.frame.length == 0 {
                    State::ChecksumA
                } else {
                    State::Payload
                };
            }
            State::Payload => {
                self.frame.payload.push(byte);
                self.frame.absorb(byte);
                if self.frame.payload.len() == self.frame.length {
                    self.state = State::ChecksumA;
                }
            }
            State::ChecksumA => {
                self.frame.received_a = byte;
                self.state = State::ChecksumB;
            }
            State::ChecksumB => {
                // Bytes of a rejected frame are never rescanned for sync.
                self.state = State::SearchingSync;
                let frame = std::mem::take(&mut self.frame);
                let expected = [frame.ck_a, frame.ck_b];
                let received = [frame.received_a, byte];
                if expected != received {
                    return Err(FrameError::ChecksumMismatch {
                        class: frame.class,
                        id: frame.id,
                        expected,
                        received,
                    });
                }
                trace!(
                    "UBX frame 0x{:02X}-0x{:02X} ({} bytes)",
                    frame.class,
                    frame.id,
                    frame.payload.len()
                );
                out.push(RawMessage::BinaryFrame {
                    class: frame.class,
                    id: frame.id,
                    payload: frame.payload,
                });
            }
            State::SentenceBody => return self.sentence_byte(byte, out),
        }
        Ok(())
    }

    fn search(&mut self, byte: u8) {
        match byte {
            UBX_SYNC_1 => self.state = State::SyncByte2,
            b'$' => self.start_sentence(),
            _ => {}
        }
    }

    fn start_sentence(&mut self) {
        self.sentence.clear();
        self.sentence.push(b'$');
        self.state = State::SentenceBody;
    }

    fn sentence_byte(&mut self, byte: u8, out: &mut Vec<RawMessage>) -> Result<(), FrameError> {
        match byte {
            b'\n' => {
                self.state = State::SearchingSync;
                // The body only ever holds printable ASCII, so this cannot fail.
                if let Ok(raw) = std::str::from_utf8(&self.sentence) {
                    let text = raw.trim().to_string();
                    trace!("NMEA sentence {text}");
                    out.push(RawMessage::TextSentence(text));
                }
                self.sentence.clear();
                Ok(())
            }
            b'$' => {
                // A new start inside a sentence means the old one lost its terminator.
                let interrupted = self.sentence.len() > 1;
                self.start_sentence();
                if interrupted {
                    Err(FrameError::SentenceInterrupted { byte })
                } else {
                    Ok(())
                }
            }
            _ if !is_sentence_byte(byte) => {
                self.sentence.clear();
                self.state = State::SearchingSync;
                self.search(byte);
                Err(FrameError::SentenceInterrupted { byte })
            }
            _ if self.sentence.len() >= MAX_SENTENCE_LEN - 1 => {
                let length = self.sentence.len() + 1;
                self.sentence.clear();
                self.state = State::SearchingSync;
                Err(FrameError::SentenceOverflow { length })
            }
            _ => {
                self.sentence.push(byte);
                Ok(())
            }
        }
    }
}

fn is_sentence_byte(byte: u8) -> bool {
    byte == b'\r' || (0x20..=0x7E).contains(&byte)
}

/// UBX Fletcher-like checksum over class, id, length and payload bytes.
pub fn ubx_checksum(data: &[u8]) -> (u8, u8) {
    let mut ck_a = 0_u8;
    let mut ck_b = 0_u8;
    for byte in data {
        ck_a = ck_a.wrapping_add(*byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    (ck_a, ck_b)
}

/// Build a complete UBX frame: sync, header, payload and checksum.
///
/// This is the outbound side of the boundary, used to hand command bytes to a transport.
/// Payloads longer than `u16::MAX` cannot be described by the length field.
pub fn encode_ubx_frame(class: u8, id: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let length = u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        class,
        id,
        length: payload.len(),
    })?;
    let mut packet = Vec::with_capacity(payload.len() + 8);
    packet.extend_from_slice(&[UBX_SYNC_1, UBX_SYNC_2, class, id]);
    packet.extend_from_slice(&length.to_le_bytes());
    packet.extend_from_slice(payload);
    let (ck_a, ck_b) = ubx_checksum(&packet[2..]);
    packet.push(ck_a);
    packet.push(ck_b);
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(class: u8, id: u8, payload: &[u8]) -> RawMessage {
        RawMessage::BinaryFrame {
            class,
            id,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn frame_in_one_call() {
        let payload = [1_u8, 2, 3, 4, 5];
        let mut parser = FrameParser::default();
        let out = parser.feed(&encode_ubx_frame(0x01, 0x07, &payload).unwrap());
        assert_eq!(out, vec![binary(0x01, 0x07, &payload)]);
    }

    #[test]
    fn payload_beyond_length_field_is_refused() {
        assert_eq!(
            encode_ubx_frame(0x06, 0x8A, &vec![0; 70_000]),
            Err(FrameError::PayloadTooLarge {
                class: 0x06,
                id: 0x8A,
                length: 70_000
            })
        );
        let largest = encode_ubx_frame(0x06, 0x8A, &vec![0; usize::from(u16::MAX)]).unwrap();
        assert_eq!(&largest[4..6], &[0xFF, 0xFF]);
    }

    #[test]
    fn frame_split_into_single_bytes() {
        let payload: Vec<u8> = (0..40).collect();
        let bytes = encode_ubx_frame(0x01, 0x35, &payload).unwrap();
        let mut parser = FrameParser::default();
        let mut out = Vec::new();
        for byte in &bytes {
            out.extend(parser.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(out, vec![binary(0x01, 0x35, &payload)]);
    }

    #[test]
    fn corrupted_checksum_then_recovery() {
        let mut bad = encode_ubx_frame(0x01, 0x04, &[9, 9, 9]).unwrap();
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        let good = encode_ubx_frame(0x01, 0x03, &[7; 16]).unwrap();

        let mut stream = bad;
        stream.extend_from_slice(&good);

        let mut parser = FrameParser::default();
        let mut out = Vec::new();
        let rejected = parser.push_bytes(&stream, &mut out);
        assert_eq!(out, vec![binary(0x01, 0x03, &[7; 16])]);
        assert_eq!(rejected.len(), 1);
        assert!(matches!(
            rejected[0],
            FrameError::ChecksumMismatch {
                class: 0x01,
                id: 0x04,
                ..
            }
        ));
    }

    #[test]
    fn sync_bytes_inside_payload_are_data() {
        let payload = [UBX_SYNC_1, UBX_SYNC_2, 0x01, 0x07, b'$', b'\n'];
        let mut parser = FrameParser::default();
        let out = parser.feed(&encode_ubx_frame(0x0A, 0x04, &payload).unwrap());
        assert_eq!(out, vec![binary(0x0A, 0x04, &payload)]);
    }

    #[test]
    fn zero_length_payload() {
        let mut parser = FrameParser::default();
        let bytes = encode_ubx_frame(0x0A, 0x04, &[]).unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(parser.feed(&bytes), vec![binary(0x0A, 0x04, &[])]);
    }

    #[test]
    fn oversized_length_resynchronises() {
        let mut parser = FrameParser::new(16);
        let mut stream = vec![UBX_SYNC_1, UBX_SYNC_2, 0x01, 0x07, 0xFF, 0x00];
        stream.extend_from_slice(&encode_ubx_frame(0x01, 0x04, &[1, 2]).unwrap());
        let mut out = Vec::new();
        let rejected = parser.push_bytes(&stream, &mut out);
        assert_eq!(out, vec![binary(0x01, 0x04, &[1, 2])]);
        assert!(matches!(
            rejected[..],
            [FrameError::OversizedPayload { length: 255, .. }]
        ));
    }

    #[test]
    fn sentence_terminated_by_crlf() {
        let mut parser = FrameParser::default();
        let out = parser.feed(b"noise$GPGLL,4916.45,N,12311.12,W,225444,A*1D\r\n");
        assert_eq!(
            out,
            vec![RawMessage::TextSentence(
                "$GPGLL,4916.45,N,12311.12,W,225444,A*1D".to_string()
            )]
        );
    }

    #[test]
    fn sentence_split_across_chunks() {
        let mut parser = FrameParser::default();
        assert!(parser.feed(b"$GPVTG,054.7,T,").is_empty());
        assert!(parser.feed(b"034.4,M,005.5,N,010.2,K\r").is_empty());
        let out = parser.feed(b"\n");
        assert_eq!(
            out,
            vec![RawMessage::TextSentence(
                "$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K".to_string()
            )]
        );
    }

    #[test]
    fn overlong_sentence_dropped_and_parsing_resumes() {
        let mut stream = b"$GPTXT,".to_vec();
        stream.extend(std::iter::repeat_n(b'A', 100));
        stream.extend_from_slice(b"\r\n$GPGLL,1,N,2,E\r\n");

        let mut parser = FrameParser::default();
        let mut out = Vec::new();
        let rejected = parser.push_bytes(&stream, &mut out);
        assert_eq!(
            out,
            vec![RawMessage::TextSentence("$GPGLL,1,N,2,E".to_string())]
        );
        assert!(matches!(
            rejected[..],
            [FrameError::SentenceOverflow { length: MAX_SENTENCE_LEN }]
        ));
    }

    #[test]
    fn sentence_of_maximum_length_is_kept() {
        let body = "A".repeat(MAX_SENTENCE_LEN - 3);
        let mut stream = format!("${body}").into_bytes();
        stream.extend_from_slice(b"\r\n");
        assert_eq!(stream.len(), MAX_SENTENCE_LEN);

        let mut parser = FrameParser::default();
        let out = parser.feed(&stream);
        assert_eq!(out, vec![RawMessage::TextSentence(format!("${body}"))]);
    }

    #[test]
    fn binary_frame_interrupts_unterminated_sentence() {
        let mut stream = b"$GPGGA,12".to_vec();
        stream.extend_from_slice(&encode_ubx_frame(0x01, 0x04, &[5; 4]).unwrap());
        stream.extend_from_slice(b"$GNGSA,A,3\r\n");

        let mut parser = FrameParser::default();
        let mut out = Vec::new();
        let rejected = parser.push_bytes(&stream, &mut out);
        assert_eq!(
            out,
            vec![
                binary(0x01, 0x04, &[5; 4]),
                RawMessage::TextSentence("$GNGSA,A,3".to_string()),
            ]
        );
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn chunking_does_not_change_output() {
        let mut stream = Vec::new();
        stream.extend_from_slice(
            b"$GPRMC,225446,A,4916.45,N,12311.12,W,000.5,054.7,191194,020.3,E\r\n",
        );
        stream.extend_from_slice(&encode_ubx_frame(0x01, 0x07, &[0x62; 92]).unwrap());
        stream.extend_from_slice(&[0x00, UBX_SYNC_1, 0x00]);
        stream.extend_from_slice(&encode_ubx_frame(0x01, 0x04, &[0xB5; 18]).unwrap());
        stream.extend_from_slice(b"$GPGSV,1,1,01,05,40,083,46\r\n");

        let whole = FrameParser::default().feed(&stream);
        assert_eq!(whole.len(), 4);

        for chunk_size in [1, 2, 3, 7, 13, 64] {
            let mut parser = FrameParser::default();
            let mut out = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                out.extend(parser.feed(chunk));
            }
            assert_eq!(out, whole, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn checksum_matches_reference_frame() {
        // MON-VER poll as emitted by u-center
        assert_eq!(
            encode_ubx_frame(0x0A, 0x04, &[]).unwrap(),
            vec![0xB5, 0x62, 0x0A, 0x04, 0x00, 0x00, 0x0E, 0x34]
        );
    }
}
