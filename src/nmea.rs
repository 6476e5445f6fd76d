//! NMEA 0183 sentence splitting and field helpers shared by the text decoders.

use crate::error::DecodeError;
use chrono::{NaiveDate, NaiveTime};

/// A checksum-verified NMEA sentence split into comma-separated fields.
///
/// Field 0 is the address (`GPGGA`); the `*hh` suffix is removed.
#[derive(Debug, Clone)]
pub struct Sentence<'a> {
    pub talker: &'a str,
    pub kind: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> Sentence<'a> {
    pub fn parse(text: &'a str) -> Result<Self, DecodeError> {
        let text = text.trim();
        if !text.is_ascii() {
            return Err(DecodeError::MalformedSentence(
                "sentence contains non-ASCII characters".to_string(),
            ));
        }
        let Some(core) = text.strip_prefix('$') else {
            return Err(DecodeError::MalformedSentence(format!(
                "missing '$' start: {text}"
            )));
        };

        let (body, declared) = match core.split_once('*') {
            Some((body, tail)) => (body, Some(tail)),
            None => (core, None),
        };
        if let Some(tail) = declared {
            let received = tail
                .get(..2)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| {
                    DecodeError::MalformedSentence(format!("unreadable checksum field: {tail}"))
                })?;
            let expected = checksum(body);
            if expected != received {
                return Err(DecodeError::NmeaChecksum { expected, received });
            }
        }

        let fields: Vec<&str> = body.split(',').collect();
        let address = fields.first().copied().unwrap_or_default();
        // Proprietary (`$PUBX`) and short addresses have no talker/kind split.
        let (talker, kind) = if address.starts_with('P') || address.len() < 5 {
            ("", "")
        } else {
            (&address[..2], &address[address.len() - 3..])
        };

        Ok(Self {
            talker,
            kind,
            fields,
        })
    }

    pub fn address(&self) -> &'a str {
        self.field(0)
    }

    // Missing trailing fields read as empty, matching how receivers omit them.
    pub fn field(&self, idx: usize) -> &'a str {
        self.fields.get(idx).copied().unwrap_or("")
    }

    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }

    pub fn f64_field(&self, idx: usize) -> Option<f64> {
        parse_f64(self.field(idx))
    }

    pub fn u32_field(&self, idx: usize) -> Option<u32> {
        parse_u32(self.field(idx))
    }

    pub fn coordinate(&self, value_idx: usize, hemisphere_idx: usize) -> Option<f64> {
        parse_coordinate(self.field(value_idx), self.field(hemisphere_idx))
    }
}

/// XOR of every byte between `$` and `*`.
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, byte| acc ^ byte)
}

// Plain decimal only; `inf`/`nan` spellings accepted by `str::parse` are rejected.
pub fn parse_f64(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty()
        || !raw
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'.' || b == b'-' || b == b'+')
    {
        return None;
    }
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn parse_u32(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<u32>().ok()
}

/// Parse `DDMM.MMMM` / `DDDMM.MMMM` with its hemisphere letter into signed degrees.
///
/// The hemisphere selects the degree width (N/S two digits, E/W three). Values whose
/// integer part is narrower than the degree width, minutes of 60 or more, and results
/// outside ±90 / ±180 are rejected.
pub fn parse_coordinate(value: &str, hemisphere: &str) -> Option<f64> {
    let (degree_digits, limit, negative) = match hemisphere.trim() {
        "N" => (2, 90.0, false),
        "S" => (2, 90.0, true),
        "E" => (3, 180.0, false),
        "W" => (3, 180.0, true),
        _ => return None,
    };

    let value = value.trim();
    if !value.is_ascii() {
        return None;
    }
    let integer_digits = value.find('.').unwrap_or(value.len());
    if integer_digits < degree_digits || value.len() <= degree_digits {
        return None;
    }

    let (deg_str, min_str) = value.split_at(degree_digits);
    if !deg_str.bytes().all(|b| b.is_ascii_digit())
        || !min_str.bytes().all(|b| b.is_ascii_digit() || b == b'.')
    {
        return None;
    }
    let degrees = deg_str.parse::<f64>().ok()?;
    let minutes = min_str.parse::<f64>().ok()?;
    if minutes >= 60.0 {
        return None;
    }

    let decimal = degrees + minutes / 60.0;
    if decimal > limit {
        return None;
    }
    Some(if negative { -decimal } else { decimal })
}

// `hhmmss` with an optional fractional part.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.len() < 6 || !raw.is_ascii() {
        return None;
    }
    let (whole, fraction) = raw.split_at(6);
    if !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour = whole[0..2].parse::<u32>().ok()?;
    let minute = whole[2..4].parse::<u32>().ok()?;
    let second = whole[4..6].parse::<u32>().ok()?;

    let millis = match fraction.strip_prefix('.') {
        Some(digits) if digits.bytes().all(|b| b.is_ascii_digit()) => {
            let mut padded: String = digits.chars().take(3).collect();
            while padded.len() < 3 {
                padded.push('0');
            }
            padded.parse::<u32>().ok()?
        }
        Some(_) => return None,
        None if fraction.is_empty() => 0,
        None => return None,
    };

    NaiveTime::from_hms_milli_opt(hour, minute, second, millis)
}

// `ddmmyy`; two-digit years from 80 upward are read as 19xx.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let day = raw[0..2].parse::<u32>().ok()?;
    let month = raw[2..4].parse::<u32>().ok()?;
    let yy = raw[4..6].parse::<i32>().ok()?;
    let year = if yy >= 80 { 1900 + yy } else { 2000 + yy };
    NaiveDate::from_ymd_opt(year, month, day)
}
