use thiserror::Error;

// Frame-level corruption seen by the byte-stream framer.
// These never stop the stream; the framer resynchronises and the processor counts them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error(
        "UBX checksum mismatch on 0x{class:02X}-0x{id:02X}: expected {expected:02X?}, received {received:02X?}"
    )]
    ChecksumMismatch {
        class: u8,
        id: u8,
        expected: [u8; 2],
        received: [u8; 2],
    },
    #[error("UBX 0x{class:02X}-0x{id:02X} declares {length} payload bytes, above the configured limit")]
    OversizedPayload { class: u8, id: u8, length: usize },
    #[error("UBX 0x{class:02X}-0x{id:02X} payload of {length} bytes does not fit a u16 length")]
    PayloadTooLarge { class: u8, id: u8, length: usize },
    #[error("NMEA sentence exceeded {length} bytes without a terminator")]
    SentenceOverflow { length: usize },
    #[error("NMEA sentence interrupted by non-text byte 0x{byte:02X}")]
    SentenceInterrupted { byte: u8 },
}

// Failures of a single decoder on an otherwise well-framed message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{message} payload truncated: need {expected} bytes, got {actual}")]
    Truncated {
        message: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("NMEA checksum mismatch: computed {expected:02X}, sentence carries {received:02X}")]
    NmeaChecksum { expected: u8, received: u8 },
    #[error("malformed NMEA sentence: {0}")]
    MalformedSentence(String),
    #[error("invalid GSV part {number}/{total} from talker {talker}")]
    InvalidGsvSequence {
        talker: String,
        number: u32,
        total: u32,
    },
}
