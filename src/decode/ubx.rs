// UBX NAV-class payload decoders. All multi-byte fields are little-endian.

use super::{DecodeResult, NavStatus, PositionUpdate, Source, Update};
use crate::error::DecodeError;
use crate::model::{AltitudeDatum, Constellation, FixType, SatelliteInfo};
use chrono::{NaiveDate, NaiveTime, TimeDelta};

pub const NAV_PVT_LEN: usize = 92;
pub const NAV_STATUS_LEN: usize = 16;
pub const NAV_DOP_LEN: usize = 18;
pub const NAV_SAT_HEADER_LEN: usize = 8;
pub const NAV_SAT_BLOCK_LEN: usize = 12;
pub const NAV_RELPOSNED_V0_LEN: usize = 40;
pub const NAV_RELPOSNED_V1_LEN: usize = 64;

fn require(payload: &[u8], expected: usize, message: &'static str) -> Result<(), DecodeError> {
    if payload.len() < expected {
        return Err(DecodeError::Truncated {
            message,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

// Readers below index without checks; callers run `require` first.
fn u16_at(p: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([p[offset], p[offset + 1]])
}

fn i16_at(p: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([p[offset], p[offset + 1]])
}

fn u32_at(p: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([p[offset], p[offset + 1], p[offset + 2], p[offset + 3]])
}

fn i32_at(p: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([p[offset], p[offset + 1], p[offset + 2], p[offset + 3]])
}

fn scaled_dop(raw: u16) -> f64 {
    f64::from(raw) * 0.01
}

// NAV-PVT: the authoritative navigation solution.
pub fn decode_nav_pvt(p: &[u8]) -> DecodeResult {
    require(p, NAV_PVT_LEN, "NAV-PVT")?;

    let mut update = PositionUpdate::new(Source::NavPvt);

    let valid = p[11];
    if valid & 0x01 != 0 {
        update.utc_date =
            NaiveDate::from_ymd_opt(i32::from(u16_at(p, 4)), u32::from(p[6]), u32::from(p[7]));
    }
    if valid & 0x02 != 0 {
        // nano is a signed correction of the rounded second, up to ±1 s.
        update.utc_time =
            NaiveTime::from_hms_opt(u32::from(p[8]), u32::from(p[9]), u32::from(p[10]))
                .map(|time| time + TimeDelta::nanoseconds(i64::from(i32_at(p, 16))));
    }

    update.fix_type = Some(FixType::from_ubx(p[20], p[21]));
    update.satellites_used = Some(u32::from(p[23]));
    update.longitude = Some(f64::from(i32_at(p, 24)) * 1e-7);
    update.latitude = Some(f64::from(i32_at(p, 28)) * 1e-7);

    let height = f64::from(i32_at(p, 32)) / 1000.0;
    let height_msl = f64::from(i32_at(p, 36)) / 1000.0;
    update.altitude = Some(height);
    update.altitude_datum = AltitudeDatum::Ellipsoid;
    update.geoid_separation = Some(height - height_msl);

    update.horizontal_accuracy = Some(f64::from(u32_at(p, 40)) / 1000.0);
    update.vertical_accuracy = Some(f64::from(u32_at(p, 44)) / 1000.0);
    update.speed = Some(f64::from(i32_at(p, 60)) / 1000.0);
    update.course = Some((f64::from(i32_at(p, 64)) * 1e-5).rem_euclid(360.0));
    update.pdop = Some(scaled_dop(u16_at(p, 76)));

    Ok(Some(Update::Position(update)))
}

// NAV-SAT: one 12-byte block per tracked satellite after an 8-byte header.
pub fn decode_nav_sat(p: &[u8]) -> DecodeResult {
    require(p, NAV_SAT_HEADER_LEN, "NAV-SAT")?;
    let count = usize::from(p[5]);
    require(p, NAV_SAT_HEADER_LEN + count * NAV_SAT_BLOCK_LEN, "NAV-SAT")?;

    let satellites = p[NAV_SAT_HEADER_LEN..]
        .chunks_exact(NAV_SAT_BLOCK_LEN)
        .take(count)
        .map(|block| {
            let elevation = i32::from(block[3] as i8);
            let azimuth = i16_at(block, 4);
            let flags = u32_at(block, 8);
            SatelliteInfo {
                id: u32::from(block[1]),
                constellation: Constellation::from_gnss_id(block[0]),
                elevation: (-90..=90).contains(&elevation).then_some(elevation),
                azimuth: u32::try_from(azimuth).ok().filter(|az| *az <= 360),
                snr: (block[2] > 0).then_some(u32::from(block[2])),
                used_in_fix: flags & 0x08 != 0,
            }
        })
        .collect();

    Ok(Some(Update::Satellites(satellites)))
}

// NAV-STATUS: receiver fix state, reported but not merged into the position.
pub fn decode_nav_status(p: &[u8]) -> DecodeResult {
    require(p, NAV_STATUS_LEN, "NAV-STATUS")?;

    let flags = p[5];
    let flags2 = p[7];
    // flags2 carries carrSoln in the same bit position as NAV-PVT flags.
    let fix_type = FixType::from_ubx(p[4], (flags & 0x01) | (flags2 & 0xC0));

    Ok(Some(Update::Status(NavStatus {
        fix_type,
        fix_ok: flags & 0x01 != 0,
        differential: flags & 0x02 != 0,
        ttff_ms: u32_at(p, 8),
        uptime_ms: u32_at(p, 12),
    })))
}

// NAV-DOP: gDOP, pDOP, tDOP, vDOP, hDOP, nDOP, eDOP at 0.01 scale.
pub fn decode_nav_dop(p: &[u8]) -> DecodeResult {
    require(p, NAV_DOP_LEN, "NAV-DOP")?;

    let mut update = PositionUpdate::new(Source::NavDop);
    update.pdop = Some(scaled_dop(u16_at(p, 6)));
    update.vdop = Some(scaled_dop(u16_at(p, 10)));
    update.hdop = Some(scaled_dop(u16_at(p, 12)));

    Ok(Some(Update::Position(update)))
}

// NAV-RELPOSNED: only the RTK carrier-solution state is used.
pub fn decode_nav_relposned(p: &[u8]) -> DecodeResult {
    require(p, 1, "NAV-RELPOSNED")?;
    let flags_offset = match p[0] {
        0x00 => {
            require(p, NAV_RELPOSNED_V0_LEN, "NAV-RELPOSNED")?;
            36
        }
        _ => {
            require(p, NAV_RELPOSNED_V1_LEN, "NAV-RELPOSNED")?;
            60
        }
    };

    let flags = u32_at(p, flags_offset);
    let fix_ok = flags & 0x01 != 0;
    let fix_type = match (flags >> 3) & 0x03 {
        1 => FixType::RtkFloat,
        2 => FixType::RtkFixed,
        _ => return Ok(None),
    };
    if !fix_ok {
        return Ok(None);
    }

    let mut update = PositionUpdate::new(Source::NavRelPosNed);
    update.fix_type = Some(fix_type);
    Ok(Some(Update::Position(update)))
}
