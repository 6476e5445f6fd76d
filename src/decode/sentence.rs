// NMEA 0183 sentence decoders.
// A field that fails to parse is treated as absent; the rest of the sentence still applies.

use super::{DecodeResult, PositionUpdate, Source, Update};
use crate::error::DecodeError;
use crate::gsv::{GsvPart, MAX_SATELLITES_PER_PART};
use crate::model::{AltitudeDatum, Constellation, FixType, SatelliteInfo, SelectionMode};
use crate::nmea::{Sentence, parse_date, parse_f64, parse_time, parse_u32};

pub const KNOTS_TO_MPS: f64 = 1852.0 / 3600.0;
const FEET_TO_METERS: f64 = 0.3048;

// Latitude and longitude are only useful together.
fn set_coordinates(update: &mut PositionUpdate, sentence: &Sentence<'_>, first: usize) {
    if let (Some(lat), Some(lon)) = (
        sentence.coordinate(first, first + 1),
        sentence.coordinate(first + 2, first + 3),
    ) {
        update.latitude = Some(lat);
        update.longitude = Some(lon);
    }
}

// Value plus unit letter; meters unless the receiver says feet.
fn length_in_meters(value: &str, unit: &str) -> Option<f64> {
    let value = parse_f64(value)?;
    match unit.trim() {
        "" | "M" => Some(value),
        "F" => Some(value * FEET_TO_METERS),
        _ => None,
    }
}

fn normalize_course(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

// GGA: time, position, fix quality, satellites used, HDOP, MSL altitude, geoid separation.
pub fn decode_gga(s: &Sentence<'_>) -> DecodeResult {
    let mut update = PositionUpdate::new(Source::Gga);
    update.utc_time = parse_time(s.field(1));
    set_coordinates(&mut update, s, 2);
    update.fix_type = s.u32_field(6).and_then(FixType::from_nmea_quality);
    update.satellites_used = s.u32_field(7);
    update.hdop = s.f64_field(8);

    if let Some(altitude) = length_in_meters(s.field(9), s.field(10)) {
        update.altitude = Some(altitude);
        update.altitude_datum = AltitudeDatum::MeanSeaLevel;
    }
    update.geoid_separation = length_in_meters(s.field(11), s.field(12));

    Ok(Some(Update::Position(update)))
}

// RMC: position, speed and course only when status is 'A'; date and time always.
pub fn decode_rmc(s: &Sentence<'_>) -> DecodeResult {
    let mut update = PositionUpdate::new(Source::Rmc);
    update.utc_time = parse_time(s.field(1));
    update.utc_date = parse_date(s.field(9));

    if s.field(2) == "A" {
        set_coordinates(&mut update, s, 3);
        update.speed = s.f64_field(7).map(|knots| knots * KNOTS_TO_MPS);
        update.course = s.f64_field(8).map(normalize_course);
    }

    Ok(Some(Update::Position(update)))
}

// GSA: selection mode, 1/2/3 navigation mode, PDOP/HDOP/VDOP.
pub fn decode_gsa(s: &Sentence<'_>) -> DecodeResult {
    let mut update = PositionUpdate::new(Source::Gsa);
    update.selection_mode = match s.field(1) {
        "A" => Some(SelectionMode::Automatic),
        "M" => Some(SelectionMode::Manual),
        _ => None,
    };
    update.fix_type = s.u32_field(2).and_then(FixType::from_gsa_mode);
    update.pdop = s.f64_field(15);
    update.hdop = s.f64_field(16);
    update.vdop = s.f64_field(17);

    Ok(Some(Update::Position(update)))
}

// GSV: one part of a multi-sentence satellites-in-view sequence.
pub fn decode_gsv(s: &Sentence<'_>) -> DecodeResult {
    let total = s.u32_field(1).unwrap_or(0);
    let number = s.u32_field(2).unwrap_or(0);
    if total == 0 || number == 0 || number > total {
        return Err(DecodeError::InvalidGsvSequence {
            talker: s.talker.to_string(),
            number,
            total,
        });
    }

    // Blocks are prn, elevation, azimuth, snr; NMEA 4.1 appends a hex signal id.
    let blocks = s.fields().get(4..).unwrap_or_default();
    let signal = match blocks.len() % 4 {
        1 => blocks
            .last()
            .and_then(|raw| u32::from_str_radix(raw.trim(), 16).ok()),
        _ => None,
    };
    let satellites = blocks
        .chunks_exact(4)
        .take(MAX_SATELLITES_PER_PART)
        .filter_map(|block| {
            let id = parse_u32(block[0])?;
            Some(SatelliteInfo {
                id,
                constellation: Constellation::from_talker(s.talker, id),
                elevation: block[1].trim().parse::<i32>().ok(),
                azimuth: parse_u32(block[2]),
                snr: parse_u32(block[3]),
                used_in_fix: false,
            })
        })
        .collect();

    Ok(Some(Update::GsvPart(GsvPart {
        talker: s.talker.to_string(),
        total,
        number,
        in_view: s.u32_field(3),
        signal,
        satellites,
    })))
}

// GLL: position with the same status gate as RMC.
pub fn decode_gll(s: &Sentence<'_>) -> DecodeResult {
    let mut update = PositionUpdate::new(Source::Gll);
    update.utc_time = parse_time(s.field(5));
    if s.field(6) == "A" {
        set_coordinates(&mut update, s, 1);
    }
    Ok(Some(Update::Position(update)))
}

// VTG: true course and ground speed, km/h preferred over knots.
pub fn decode_vtg(s: &Sentence<'_>) -> DecodeResult {
    if s.field(9) == "N" {
        return Ok(None);
    }

    let mut update = PositionUpdate::new(Source::Vtg);
    update.course = s.f64_field(1).map(normalize_course);
    update.speed = s
        .f64_field(7)
        .map(|kmh| kmh / 3.6)
        .or_else(|| s.f64_field(5).map(|knots| knots * KNOTS_TO_MPS));
    Ok(Some(Update::Position(update)))
}

// GST: 1-sigma position errors in meters.
pub fn decode_gst(s: &Sentence<'_>) -> DecodeResult {
    let mut update = PositionUpdate::new(Source::Gst);
    update.utc_time = parse_time(s.field(1));
    if let (Some(lat_sigma), Some(lon_sigma)) = (s.f64_field(6), s.f64_field(7)) {
        update.horizontal_accuracy = Some(lat_sigma.hypot(lon_sigma));
    }
    update.vertical_accuracy = s.f64_field(8);
    Ok(Some(Update::Position(update)))
}

// GNS: like GGA, with one mode character per constellation.
pub fn decode_gns(s: &Sentence<'_>) -> DecodeResult {
    let mut update = PositionUpdate::new(Source::Gns);
    update.utc_time = parse_time(s.field(1));
    set_coordinates(&mut update, s, 2);
    update.fix_type = s
        .field(6)
        .chars()
        .filter_map(FixType::from_gns_mode)
        .max_by_key(|fix| fix.rank());
    update.satellites_used = s.u32_field(7);
    update.hdop = s.f64_field(8);
    if let Some(altitude) = s.f64_field(9) {
        update.altitude = Some(altitude);
        update.altitude_datum = AltitudeDatum::MeanSeaLevel;
    }
    update.geoid_separation = s.f64_field(10);
    Ok(Some(Update::Position(update)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::checksum;
    use chrono::{NaiveDate, NaiveTime};

    fn framed(body: &str) -> String {
        format!("${}*{:02X}", body, checksum(body))
    }

    fn decode_with(decoder: fn(&Sentence<'_>) -> DecodeResult, body: &str) -> DecodeResult {
        let text = framed(body);
        let sentence = Sentence::parse(&text).expect("test sentence parses");
        decoder(&sentence)
    }

    fn position(result: DecodeResult) -> PositionUpdate {
        match result {
            Ok(Some(Update::Position(update))) => update,
            other => panic!("expected a position update, got {other:?}"),
        }
    }

    #[test]
    fn gga_full_fix() {
        let update = position(decode_with(
            decode_gga,
            "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,",
        ));
        assert!((update.latitude.unwrap() - 48.1173).abs() < 1e-6);
        assert!((update.longitude.unwrap() - 11.516_666_7).abs() < 1e-6);
        assert_eq!(update.fix_type, Some(FixType::Fix3D));
        assert_eq!(update.satellites_used, Some(8));
        assert_eq!(update.hdop, Some(0.9));
        assert_eq!(update.altitude, Some(545.4));
        assert_eq!(update.altitude_datum, AltitudeDatum::MeanSeaLevel);
        assert_eq!(update.geoid_separation, Some(46.9));
        assert_eq!(update.utc_time, NaiveTime::from_hms_opt(12, 35, 19));
    }

    #[test]
    fn gga_empty_fields_are_absent() {
        let update = position(decode_with(decode_gga, "GPGGA,,,,,,0,00,99.99,,,,,,"));
        assert_eq!(update.latitude, None);
        assert_eq!(update.longitude, None);
        assert_eq!(update.altitude, None);
        assert_eq!(update.fix_type, Some(FixType::NoFix));
        assert_eq!(update.satellites_used, Some(0));
    }

    #[test]
    fn gga_rtk_quality_and_feet() {
        let update = position(decode_with(
            decode_gga,
            "GNGGA,092750.000,5321.6802,N,00630.3372,W,4,12,0.6,100.0,F,55.2,M,1.0,0000",
        ));
        assert_eq!(update.fix_type, Some(FixType::RtkFixed));
        assert!((update.altitude.unwrap() - 30.48).abs() < 1e-9);
        assert!(update.longitude.unwrap() < 0.0);
    }

    #[test]
    fn gga_malformed_coordinate_keeps_other_fields() {
        let update = position(decode_with(
            decode_gga,
            "GPGGA,123519,48x7.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,",
        ));
        assert_eq!(update.latitude, None);
        assert_eq!(update.longitude, None);
        assert_eq!(update.satellites_used, Some(8));
        assert_eq!(update.altitude, Some(545.4));
    }

    #[test]
    fn rmc_active() {
        let update = position(decode_with(
            decode_rmc,
            "GPRMC,225446,A,4916.45,N,12311.12,W,000.5,054.7,191194,020.3,E",
        ));
        assert!((update.latitude.unwrap() - 49.274_166_7).abs() < 1e-6);
        assert!((update.longitude.unwrap() + 123.185_333_3).abs() < 1e-6);
        assert!((update.speed.unwrap() - 0.5 * KNOTS_TO_MPS).abs() < 1e-12);
        assert_eq!(update.course, Some(54.7));
        assert_eq!(update.utc_date, NaiveDate::from_ymd_opt(1994, 11, 19));
        assert_eq!(update.utc_time, NaiveTime::from_hms_opt(22, 54, 46));
        assert_eq!(update.fix_type, None);
    }

    #[test]
    fn rmc_void_status_skips_position_and_motion() {
        let update = position(decode_with(
            decode_rmc,
            "GPRMC,225446,V,4916.45,N,12311.12,W,000.5,054.7,191194,020.3,E",
        ));
        assert_eq!(update.latitude, None);
        assert_eq!(update.speed, None);
        assert_eq!(update.course, None);
        assert_eq!(update.fix_type, None);
        assert!(update.utc_date.is_some());
    }

    #[test]
    fn gsa_mode_and_dops() {
        let update = position(decode_with(
            decode_gsa,
            "GNGSA,A,3,05,12,25,29,,,,,,,,,1.8,1.0,1.5",
        ));
        assert_eq!(update.selection_mode, Some(SelectionMode::Automatic));
        assert_eq!(update.fix_type, Some(FixType::Fix3D));
        assert_eq!(update.pdop, Some(1.8));
        assert_eq!(update.hdop, Some(1.0));
        assert_eq!(update.vdop, Some(1.5));
        assert_eq!(update.satellites_used, None);
    }

    #[test]
    fn gsv_part_with_signal_id() {
        let result = decode_with(
            decode_gsv,
            "GAGSV,2,1,07,02,45,120,38,07,12,300,,11,78,010,44,30,05,200,21,7",
        );
        let Ok(Some(Update::GsvPart(part))) = result else {
            panic!("expected a GSV part");
        };
        assert_eq!(part.talker, "GA");
        assert_eq!((part.number, part.total), (1, 2));
        assert_eq!(part.in_view, Some(7));
        assert_eq!(part.signal, Some(7));
        assert_eq!(part.satellites.len(), 4);
        assert_eq!(part.satellites[1].snr, None);
        assert_eq!(part.satellites[2].elevation, Some(78));
        assert!(
            part.satellites
                .iter()
                .all(|sat| sat.constellation == Constellation::Galileo)
        );
    }

    #[test]
    fn gsv_signal_id_without_satellites() {
        let Ok(Some(Update::GsvPart(part))) = decode_with(decode_gsv, "GPGSV,1,1,00,B") else {
            panic!("expected a GSV part");
        };
        assert_eq!(part.signal, Some(11));
        assert!(part.satellites.is_empty());

        let Ok(Some(Update::GsvPart(legacy))) = decode_with(decode_gsv, "GPGSV,1,1,01,05,40,083,46")
        else {
            panic!("expected a GSV part");
        };
        assert_eq!(legacy.signal, None);
    }

    #[test]
    fn gsv_rejects_impossible_part_numbers() {
        assert!(matches!(
            decode_with(decode_gsv, "GPGSV,2,3,08,01,40,083,46"),
            Err(DecodeError::InvalidGsvSequence {
                number: 3,
                total: 2,
                ..
            })
        ));
        assert!(decode_with(decode_gsv, "GPGSV,,1,08").is_err());
    }

    #[test]
    fn gll_status_gate() {
        let active = position(decode_with(decode_gll, "GPGLL,4916.45,N,12311.12,W,225444,A,A"));
        assert!(active.latitude.is_some());

        let void = position(decode_with(decode_gll, "GPGLL,4916.45,N,12311.12,W,225444,V,N"));
        assert_eq!(void.latitude, None);
        assert_eq!(void.utc_time, NaiveTime::from_hms_opt(22, 54, 44));
    }

    #[test]
    fn vtg_prefers_kmh() {
        let update = position(decode_with(decode_vtg, "GPVTG,054.7,T,034.4,M,005.5,N,010.8,K,A"));
        assert_eq!(update.course, Some(54.7));
        assert!((update.speed.unwrap() - 3.0).abs() < 1e-12);

        let knots_only = position(decode_with(decode_vtg, "GPVTG,360.0,T,,M,002.0,N,,K,A"));
        assert!((knots_only.speed.unwrap() - 2.0 * KNOTS_TO_MPS).abs() < 1e-12);
        assert_eq!(knots_only.course, Some(0.0));

        assert_eq!(decode_with(decode_vtg, "GPVTG,,T,,M,,N,,K,N"), Ok(None));
    }

    #[test]
    fn gst_sigmas() {
        let update = position(decode_with(
            decode_gst,
            "GPGST,172814.0,0.006,0.023,0.020,273.6,0.03,0.04,0.05",
        ));
        assert!((update.horizontal_accuracy.unwrap() - 0.05).abs() < 1e-12);
        assert_eq!(update.vertical_accuracy, Some(0.05));
    }

    #[test]
    fn gns_best_mode_character() {
        let update = position(decode_with(
            decode_gns,
            "GNGNS,014035.00,4332.69262,S,17235.48549,E,RR,13,0.9,25.63,11.24,,",
        ));
        assert_eq!(update.fix_type, Some(FixType::RtkFixed));
        assert!(update.latitude.unwrap() < 0.0);
        assert_eq!(update.satellites_used, Some(13));

        let mixed = position(decode_with(decode_gns, "GNGNS,014035.00,,,,,NA,05,2.1,,,,"));
        assert_eq!(mixed.fix_type, Some(FixType::Fix3D));
    }
}
