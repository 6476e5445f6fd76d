//! Message decoders and their dispatch tables.
//!
//! Every decoder is a pure function from one validated message to an optional
//! partial update. Adding a message kind means adding a decoder and one table row.

pub mod sentence;
pub mod ubx;

use crate::error::DecodeError;
use crate::frame::RawMessage;
use crate::gsv::GsvPart;
use crate::model::{AltitudeDatum, FixType, SatelliteInfo, SelectionMode};
use crate::nmea::Sentence;
use chrono::{NaiveDate, NaiveTime};

/// Message kind a position update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    NavPvt,
    NavDop,
    NavRelPosNed,
    Gga,
    Rmc,
    Gsa,
    Gll,
    Vtg,
    Gst,
    Gns,
}

impl Source {
    // Binary sources are authoritative for the fields they carry.
    pub fn is_binary(self) -> bool {
        matches!(self, Source::NavPvt | Source::NavDop | Source::NavRelPosNed)
    }
}

/// The subset of [`crate::Position`] fields one message supplies.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub source: Source,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub altitude_datum: AltitudeDatum,
    pub geoid_separation: Option<f64>,
    pub fix_type: Option<FixType>,
    pub satellites_used: Option<u32>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
    pub pdop: Option<f64>,
    pub horizontal_accuracy: Option<f64>,
    pub vertical_accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub course: Option<f64>,
    pub selection_mode: Option<SelectionMode>,
    pub utc_date: Option<NaiveDate>,
    pub utc_time: Option<NaiveTime>,
}

impl PositionUpdate {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            latitude: None,
            longitude: None,
            altitude: None,
            altitude_datum: AltitudeDatum::Unknown,
            geoid_separation: None,
            fix_type: None,
            satellites_used: None,
            hdop: None,
            vdop: None,
            pdop: None,
            horizontal_accuracy: None,
            vertical_accuracy: None,
            speed: None,
            course: None,
            selection_mode: None,
            utc_date: None,
            utc_time: None,
        }
    }
}

/// NAV-STATUS contents; reported for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavStatus {
    pub fix_type: FixType,
    pub fix_ok: bool,
    pub differential: bool,
    pub ttff_ms: u32,
    pub uptime_ms: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Position(PositionUpdate),
    /// Complete replacement of the satellite table (NAV-SAT).
    Satellites(Vec<SatelliteInfo>),
    GsvPart(GsvPart),
    Status(NavStatus),
}

pub type DecodeResult = Result<Option<Update>, DecodeError>;
pub type BinaryDecoder = fn(&[u8]) -> DecodeResult;
pub type SentenceDecoder = fn(&Sentence<'_>) -> DecodeResult;

pub struct BinaryKind {
    pub class: u8,
    pub id: u8,
    pub name: &'static str,
    pub decode: BinaryDecoder,
}

pub const BINARY_DECODERS: &[BinaryKind] = &[
    BinaryKind {
        class: 0x01,
        id: 0x03,
        name: "NAV-STATUS",
        decode: ubx::decode_nav_status,
    },
    BinaryKind {
        class: 0x01,
        id: 0x04,
        name: "NAV-DOP",
        decode: ubx::decode_nav_dop,
    },
    BinaryKind {
        class: 0x01,
        id: 0x07,
        name: "NAV-PVT",
        decode: ubx::decode_nav_pvt,
    },
    BinaryKind {
        class: 0x01,
        id: 0x35,
        name: "NAV-SAT",
        decode: ubx::decode_nav_sat,
    },
    BinaryKind {
        class: 0x01,
        id: 0x3C,
        name: "NAV-RELPOSNED",
        decode: ubx::decode_nav_relposned,
    },
];

// Keyed by the three-letter suffix after the talker prefix.
pub const SENTENCE_DECODERS: &[(&str, SentenceDecoder)] = &[
    ("GGA", sentence::decode_gga),
    ("RMC", sentence::decode_rmc),
    ("GSA", sentence::decode_gsa),
    ("GSV", sentence::decode_gsv),
    ("GLL", sentence::decode_gll),
    ("VTG", sentence::decode_vtg),
    ("GST", sentence::decode_gst),
    ("GNS", sentence::decode_gns),
];

pub fn binary_decoder(class: u8, id: u8) -> Option<&'static BinaryKind> {
    BINARY_DECODERS
        .iter()
        .find(|kind| kind.class == class && kind.id == id)
}

pub fn sentence_decoder(kind: &str) -> Option<SentenceDecoder> {
    SENTENCE_DECODERS
        .iter()
        .find(|(suffix, _)| *suffix == kind)
        .map(|(_, decode)| *decode)
}

/// Result of running one raw message through its decoder.
#[derive(Debug)]
pub struct Decoded {
    /// Message type label for statistics, e.g. `NAV-PVT` or `GPGGA`.
    pub label: String,
    pub result: DecodeResult,
}

// Unknown kinds decode to `Ok(None)`; they are not errors.
pub fn decode(message: &RawMessage) -> Decoded {
    match message {
        RawMessage::BinaryFrame { class, id, payload } => match binary_decoder(*class, *id) {
            Some(kind) => Decoded {
                label: kind.name.to_string(),
                result: (kind.decode)(payload),
            },
            None => Decoded {
                label: format!("UBX-{class:02X}-{id:02X}"),
                result: Ok(None),
            },
        },
        RawMessage::TextSentence(text) => {
            let label = sentence_label(text);
            let result = Sentence::parse(text).and_then(|sentence| {
                match sentence_decoder(sentence.kind) {
                    Some(decode) => decode(&sentence),
                    None => Ok(None),
                }
            });
            Decoded { label, result }
        }
    }
}

fn sentence_label(text: &str) -> String {
    let address = text
        .trim_start_matches('$')
        .split([',', '*'])
        .next()
        .unwrap_or_default();
    if address.is_empty() {
        "NMEA".to_string()
    } else {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::checksum;

    #[test]
    fn lookup_tables_resolve_known_kinds() {
        assert_eq!(binary_decoder(0x01, 0x07).map(|k| k.name), Some("NAV-PVT"));
        assert_eq!(binary_decoder(0x01, 0x35).map(|k| k.name), Some("NAV-SAT"));
        assert!(binary_decoder(0x02, 0x15).is_none());
        assert!(sentence_decoder("GSV").is_some());
        assert!(sentence_decoder("ZDA").is_none());
    }

    #[test]
    fn unknown_binary_kind_is_ignored_with_label() {
        let decoded = decode(&RawMessage::BinaryFrame {
            class: 0x0A,
            id: 0x04,
            payload: vec![],
        });
        assert_eq!(decoded.label, "UBX-0A-04");
        assert!(matches!(decoded.result, Ok(None)));
    }

    #[test]
    fn unknown_sentence_kind_is_ignored() {
        let body = "GPZDA,201530.00,04,07,2002,00,00";
        let text = format!("${}*{:02X}", body, checksum(body));
        let decoded = decode(&RawMessage::TextSentence(text));
        assert_eq!(decoded.label, "GPZDA");
        assert!(matches!(decoded.result, Ok(None)));
    }

    #[test]
    fn proprietary_sentence_is_ignored() {
        let body = "PUBX,40,GLL,0,0,0,0,0,0";
        let text = format!("${}*{:02X}", body, checksum(body));
        let decoded = decode(&RawMessage::TextSentence(text));
        assert_eq!(decoded.label, "PUBX");
        assert!(matches!(decoded.result, Ok(None)));
    }

    #[test]
    fn truncated_known_payload_is_an_error() {
        let decoded = decode(&RawMessage::BinaryFrame {
            class: 0x01,
            id: 0x07,
            payload: vec![0; 20],
        });
        assert_eq!(decoded.label, "NAV-PVT");
        assert!(matches!(
            decoded.result,
            Err(DecodeError::Truncated {
                expected: 92,
                actual: 20,
                ..
            })
        ));
    }

    #[test]
    fn bad_nmea_checksum_is_an_error() {
        let decoded = decode(&RawMessage::TextSentence(
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00".to_string(),
        ));
        assert_eq!(decoded.label, "GPGGA");
        assert!(matches!(
            decoded.result,
            Err(DecodeError::NmeaChecksum { received: 0, .. })
        ));
    }
}
