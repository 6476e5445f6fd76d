use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::fmt;

/// Dilution-of-precision value used until a receiver reports one.
pub const UNKNOWN_DOP: f64 = 99.9;

/// Qualitative confidence of a position solution, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FixType {
    #[default]
    NoFix,
    Simulation,
    Manual,
    DeadReckoning,
    Fix2D,
    Fix3D,
    Dgps,
    RtkFloat,
    RtkFixed,
}

impl FixType {
    // Ordering used by the merge policy; simulated and manual inputs rank just above no fix.
    pub fn rank(self) -> u8 {
        match self {
            FixType::NoFix => 0,
            FixType::Simulation | FixType::Manual => 1,
            FixType::DeadReckoning => 2,
            FixType::Fix2D => 3,
            FixType::Fix3D => 4,
            FixType::Dgps => 5,
            FixType::RtkFloat => 6,
            FixType::RtkFixed => 7,
        }
    }

    // NAV-PVT fixType plus the carrier-solution override when gnssFixOK is set.
    pub fn from_ubx(raw_fix_type: u8, flags: u8) -> Self {
        let base = match raw_fix_type {
            1 => FixType::DeadReckoning,
            2 => FixType::Fix2D,
            3 => FixType::Fix3D,
            4 => FixType::Dgps,
            _ => FixType::NoFix,
        };

        let fix_ok = flags & 0x01 != 0;
        if !fix_ok {
            return base;
        }
        match (flags >> 6) & 0x03 {
            1 => FixType::RtkFloat,
            2 => FixType::RtkFixed,
            _ => base,
        }
    }

    // GGA fix-quality indicator 0-8.
    pub fn from_nmea_quality(quality: u32) -> Option<Self> {
        let fix = match quality {
            0 => FixType::NoFix,
            1 | 3 => FixType::Fix3D,
            2 => FixType::Dgps,
            4 => FixType::RtkFixed,
            5 => FixType::RtkFloat,
            6 => FixType::DeadReckoning,
            7 => FixType::Manual,
            8 => FixType::Simulation,
            _ => return None,
        };
        Some(fix)
    }

    // GSA navigation mode 1/2/3.
    pub fn from_gsa_mode(mode: u32) -> Option<Self> {
        match mode {
            1 => Some(FixType::NoFix),
            2 => Some(FixType::Fix2D),
            3 => Some(FixType::Fix3D),
            _ => None,
        }
    }

    // GNS per-constellation mode indicator character.
    pub fn from_gns_mode(mode: char) -> Option<Self> {
        match mode {
            'N' => Some(FixType::NoFix),
            'A' | 'P' => Some(FixType::Fix3D),
            'D' => Some(FixType::Dgps),
            'R' => Some(FixType::RtkFixed),
            'F' => Some(FixType::RtkFloat),
            'E' => Some(FixType::DeadReckoning),
            'M' => Some(FixType::Manual),
            'S' => Some(FixType::Simulation),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FixType::NoFix => "no-fix",
            FixType::Simulation => "simulation",
            FixType::Manual => "manual",
            FixType::DeadReckoning => "dead-reckoning",
            FixType::Fix2D => "2D",
            FixType::Fix3D => "3D",
            FixType::Dgps => "DGPS",
            FixType::RtkFloat => "RTK-float",
            FixType::RtkFixed => "RTK-fixed",
        }
    }
}

impl fmt::Display for FixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference surface of [`Position::altitude`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AltitudeDatum {
    #[default]
    Unknown,
    Ellipsoid,
    MeanSeaLevel,
}

/// GSA satellite selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Automatic,
    Manual,
}

/// Current navigation solution as published to readers.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub altitude_datum: AltitudeDatum,
    pub geoid_separation: Option<f64>,
    pub fix_type: FixType,
    pub satellites_used: u32,
    pub satellites_in_view: u32,
    pub hdop: f64,
    pub vdop: f64,
    pub pdop: f64,
    /// Meters; 0.0 until a source reports an estimate.
    pub horizontal_accuracy: f64,
    pub vertical_accuracy: f64,
    /// Ground speed in m/s.
    pub speed: f64,
    /// Course over ground in degrees, [0, 360).
    pub course: f64,
    pub selection_mode: Option<SelectionMode>,
    pub utc_date: Option<NaiveDate>,
    pub utc_time: Option<NaiveTime>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            altitude_datum: AltitudeDatum::Unknown,
            geoid_separation: None,
            fix_type: FixType::NoFix,
            satellites_used: 0,
            satellites_in_view: 0,
            hdop: UNKNOWN_DOP,
            vdop: UNKNOWN_DOP,
            pdop: UNKNOWN_DOP,
            horizontal_accuracy: 0.0,
            vertical_accuracy: 0.0,
            speed: 0.0,
            course: 0.0,
            selection_mode: None,
            utc_date: None,
            utc_time: None,
            last_update: None,
        }
    }
}

impl Position {
    pub fn has_fix(&self) -> bool {
        self.fix_type != FixType::NoFix
    }

    /// UTC time of the solution as ISO-8601, time-only when no date has been seen.
    pub fn utc_timestamp(&self) -> Option<String> {
        match (self.utc_date, self.utc_time) {
            (Some(date), Some(time)) => Some(
                NaiveDateTime::new(date, time)
                    .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                    .to_string(),
            ),
            (None, Some(time)) => Some(time.format("%H:%M:%S%.3f").to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constellation {
    Gps,
    Glonass,
    Galileo,
    BeiDou,
    Qzss,
    Sbas,
    Unknown,
}

impl Constellation {
    // UBX gnssId as used by NAV-SAT.
    pub fn from_gnss_id(gnss_id: u8) -> Self {
        match gnss_id {
            0 => Constellation::Gps,
            1 => Constellation::Sbas,
            2 => Constellation::Galileo,
            3 => Constellation::BeiDou,
            5 => Constellation::Qzss,
            6 => Constellation::Glonass,
            _ => Constellation::Unknown,
        }
    }

    // NMEA talker prefix; GPS talkers also carry SBAS in the 33-64 PRN range.
    pub fn from_talker(talker: &str, prn: u32) -> Self {
        match talker {
            "GP" if (33..=64).contains(&prn) => Constellation::Sbas,
            "GP" => Constellation::Gps,
            "GL" => Constellation::Glonass,
            "GA" => Constellation::Galileo,
            "GB" | "BD" => Constellation::BeiDou,
            "GQ" | "QZ" => Constellation::Qzss,
            _ => Constellation::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Constellation::Gps => "GPS",
            Constellation::Glonass => "GLONASS",
            Constellation::Galileo => "Galileo",
            Constellation::BeiDou => "BeiDou",
            Constellation::Qzss => "QZSS",
            Constellation::Sbas => "SBAS",
            Constellation::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Constellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One tracked or visible space vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteInfo {
    pub id: u32,
    pub constellation: Constellation,
    pub elevation: Option<i32>,
    pub azimuth: Option<u32>,
    /// Carrier-to-noise density in dB-Hz; `None` when not tracked.
    pub snr: Option<u32>,
    pub used_in_fix: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ubx_carrier_solution_overrides_base_fix() {
        assert_eq!(FixType::from_ubx(3, 0x01), FixType::Fix3D);
        assert_eq!(FixType::from_ubx(3, 0x01 | (1 << 6)), FixType::RtkFloat);
        assert_eq!(FixType::from_ubx(3, 0x01 | (2 << 6)), FixType::RtkFixed);
        // carrSoln without gnssFixOK is not trusted
        assert_eq!(FixType::from_ubx(3, 2 << 6), FixType::Fix3D);
        assert_eq!(FixType::from_ubx(5, 0x01), FixType::NoFix);
        assert_eq!(FixType::from_ubx(4, 0x00), FixType::Dgps);
    }

    #[test]
    fn nmea_quality_codes() {
        assert_eq!(FixType::from_nmea_quality(0), Some(FixType::NoFix));
        assert_eq!(FixType::from_nmea_quality(4), Some(FixType::RtkFixed));
        assert_eq!(FixType::from_nmea_quality(5), Some(FixType::RtkFloat));
        assert_eq!(FixType::from_nmea_quality(8), Some(FixType::Simulation));
        assert_eq!(FixType::from_nmea_quality(9), None);
    }

    #[test]
    fn rank_orders_fix_types() {
        assert!(FixType::RtkFixed.rank() > FixType::RtkFloat.rank());
        assert!(FixType::Fix3D.rank() > FixType::Fix2D.rank());
        assert!(FixType::Fix2D.rank() > FixType::NoFix.rank());
    }

    #[test]
    fn talker_mapping_splits_sbas_out_of_gps() {
        assert_eq!(Constellation::from_talker("GP", 12), Constellation::Gps);
        assert_eq!(Constellation::from_talker("GP", 46), Constellation::Sbas);
        assert_eq!(Constellation::from_talker("GL", 70), Constellation::Glonass);
        assert_eq!(Constellation::from_talker("GN", 3), Constellation::Unknown);
        assert_eq!(Constellation::from_gnss_id(6), Constellation::Glonass);
        assert_eq!(Constellation::from_gnss_id(4), Constellation::Unknown);
    }

    #[test]
    fn timestamp_formats() {
        let mut position = Position::default();
        assert_eq!(position.utc_timestamp(), None);

        position.utc_time = NaiveTime::from_hms_milli_opt(12, 35, 19, 500);
        assert_eq!(position.utc_timestamp().as_deref(), Some("12:35:19.500"));

        position.utc_date = NaiveDate::from_ymd_opt(1994, 3, 23);
        assert_eq!(
            position.utc_timestamp().as_deref(),
            Some("1994-03-23T12:35:19.500Z")
        );
    }
}
