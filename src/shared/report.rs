use crate::args::ReportFormat;
use gnss_stream::{Constellation, NavSnapshot, Position, SatelliteInfo, Statistics, UNKNOWN_DOP};
use log::info;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

// Periodically logs the latest navigation snapshot as [FIX]/[SAT]/[STAT] lines.
pub struct StatusReporter {
    interval: Option<Duration>,
    format: ReportFormat,
    satellites: bool,
    last_emit: Instant,
}

impl StatusReporter {
    pub fn new(interval_secs: u64, format: ReportFormat, satellites: bool) -> Self {
        let interval = if interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(interval_secs.max(1)))
        };

        Self {
            interval,
            format,
            satellites,
            last_emit: Instant::now(),
        }
    }

    // Emit a report only when the interval has elapsed since the last one.
    pub fn maybe_emit(&mut self, snapshot: &NavSnapshot, source: &str) {
        let Some(interval) = self.interval else {
            return;
        };
        if self.last_emit.elapsed() < interval {
            return;
        }
        self.emit(snapshot, source);
        self.last_emit = Instant::now();
    }

    pub fn emit(&self, snapshot: &NavSnapshot, source: &str) {
        info!("[FIX] {}", format_position(&snapshot.position));
        if self.satellites {
            for line in format_satellites(&snapshot.satellites, self.format) {
                info!("[SAT] {line}");
            }
        }
        info!("[STAT] {} {}", format_statistics(&snapshot.statistics), source);
    }
}

pub fn format_position(position: &Position) -> String {
    let (lat, lon) = if position.has_fix() {
        (
            format_coord(Some(position.latitude)),
            format_coord(Some(position.longitude)),
        )
    } else {
        (format_coord(None), format_coord(None))
    };
    format!(
        "fix={} time={} lat={} lon={} alt_m={:.2} datum={:?} sats={}/{} hdop={} vdop={} pdop={} hacc_m={:.3} vacc_m={:.3} speed_mps={:.2} course_deg={:.1}",
        position.fix_type,
        position.utc_timestamp().as_deref().unwrap_or("-"),
        lat,
        lon,
        position.altitude,
        position.altitude_datum,
        position.satellites_used,
        position.satellites_in_view,
        format_dop(position.hdop),
        format_dop(position.vdop),
        format_dop(position.pdop),
        position.horizontal_accuracy,
        position.vertical_accuracy,
        position.speed,
        position.course
    )
}

pub fn format_satellites(satellites: &[SatelliteInfo], format: ReportFormat) -> Vec<String> {
    match format {
        ReportFormat::Full => satellites
            .iter()
            .map(|sat| {
                format!(
                    "{:<8} id={:>3} elev={} az={} snr={} used={}",
                    sat.constellation.label(),
                    sat.id,
                    opt(sat.elevation),
                    opt(sat.azimuth),
                    opt(sat.snr),
                    sat.used_in_fix
                )
            })
            .collect(),
        ReportFormat::Summary => {
            let mut per_constellation: BTreeMap<Constellation, (usize, usize)> = BTreeMap::new();
            for sat in satellites {
                let entry = per_constellation.entry(sat.constellation).or_default();
                entry.0 += 1;
                if sat.used_in_fix {
                    entry.1 += 1;
                }
            }
            per_constellation
                .into_iter()
                .map(|(constellation, (visible, used))| {
                    format!("{:<8} visible={visible} used={used}", constellation.label())
                })
                .collect()
        }
    }
}

pub fn format_statistics(stats: &Statistics) -> String {
    format!(
        "{:>8} msgs ({} ubx / {} nmea) {:>4} errors {:>6.1} msg/s last={}",
        stats.total_messages,
        stats.binary_messages,
        stats.text_messages,
        stats.parse_errors,
        stats.messages_per_second,
        nz(&stats.last_message_type)
    )
}

fn format_coord(coord: Option<f64>) -> String {
    coord
        .map(|value| format!("{value:.7}"))
        .unwrap_or_else(|| "-".to_string())
}

fn format_dop(dop: f64) -> String {
    if dop >= UNKNOWN_DOP {
        "-".to_string()
    } else {
        format!("{dop:.2}")
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn nz(raw: &str) -> &str {
    if raw.is_empty() { "-" } else { raw }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnss_stream::FixType;

    fn sat(id: u32, constellation: Constellation, used: bool) -> SatelliteInfo {
        SatelliteInfo {
            id,
            constellation,
            elevation: Some(10),
            azimuth: None,
            snr: Some(30),
            used_in_fix: used,
        }
    }

    #[test]
    fn position_line_hides_coordinates_without_fix() {
        let line = format_position(&Position::default());
        assert!(line.starts_with("fix=no-fix time=- lat=- lon=-"));
        assert!(line.contains("hdop=-"));

        let fixed = Position {
            fix_type: FixType::RtkFixed,
            latitude: 45.1234567,
            longitude: 12.7654321,
            hdop: 0.7,
            ..Position::default()
        };
        let line = format_position(&fixed);
        assert!(line.contains("fix=RTK-fixed"));
        assert!(line.contains("lat=45.1234567 lon=12.7654321"));
        assert!(line.contains("hdop=0.70"));
    }

    #[test]
    fn satellite_summary_groups_by_constellation() {
        let sats = vec![
            sat(1, Constellation::Gps, true),
            sat(2, Constellation::Gps, false),
            sat(65, Constellation::Glonass, true),
        ];
        let summary = format_satellites(&sats, ReportFormat::Summary);
        assert_eq!(
            summary,
            vec![
                "GPS      visible=2 used=1".to_string(),
                "GLONASS  visible=1 used=1".to_string(),
            ]
        );

        let full = format_satellites(&sats, ReportFormat::Full);
        assert_eq!(full.len(), 3);
        assert!(full[0].contains("az=-"));
    }

    #[test]
    fn statistics_line_marks_missing_label() {
        let line = format_statistics(&Statistics::default());
        assert!(line.ends_with("last=-"));
    }
}
