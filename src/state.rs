//! Navigation state aggregation.
//!
//! [`NavState`] owns the current [`Position`] and satellite list and folds partial
//! updates into them. Binary UBX sources are authoritative for every field they carry.
//! NMEA sources only fill in what binary sources have not already settled:
//!
//! - within one batch that contained a NAV-PVT, sentences cannot touch the fields
//!   NAV-PVT carries;
//! - a fix set by a binary source is only replaced by a sentence fix that is at least
//!   as good, or that explicitly reports no fix in a later batch;
//! - empty or zero sentence values never overwrite known non-zero values;
//! - DOP values are only taken when they are real measurements, not the 99.x sentinel.

use crate::decode::{PositionUpdate, Source};
use crate::gsv::DEFAULT_MAX_PENDING_TALKERS;
use crate::model::{FixType, Position, SatelliteInfo, UNKNOWN_DOP};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FixOrigin {
    binary: bool,
    batch: u64,
}

#[derive(Debug)]
pub struct NavState {
    position: Position,
    satellites: Vec<SatelliteInfo>,
    // talker -> signal id -> satellites from that signal's last completed sweep
    talker_satellites: BTreeMap<String, BTreeMap<Option<u32>, Vec<SatelliteInfo>>>,
    binary_satellites: bool,
    batch: u64,
    fix_origin: Option<FixOrigin>,
    pvt_batch: Option<u64>,
    max_talkers: usize,
}

impl Default for NavState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING_TALKERS)
    }
}

fn usable_dop(value: Option<f64>) -> Option<f64> {
    value.filter(|dop| *dop > 0.0 && *dop < UNKNOWN_DOP)
}

// Sentence rule: a zero reading does not replace a known non-zero value.
fn keeps_known(current: f64, new: f64) -> bool {
    new == 0.0 && current != 0.0
}

impl NavState {
    pub fn new(max_talkers: usize) -> Self {
        Self {
            position: Position::default(),
            satellites: Vec::new(),
            talker_satellites: BTreeMap::new(),
            binary_satellites: false,
            batch: 0,
            fix_origin: None,
            pvt_batch: None,
            max_talkers: max_talkers.max(1),
        }
    }

    /// Start a new update cycle. Same-batch precedence rules are scoped to it.
    pub fn begin_batch(&mut self) {
        self.batch += 1;
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn satellites(&self) -> &[SatelliteInfo] {
        &self.satellites
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.max_talkers);
    }

    pub fn apply(&mut self, update: &PositionUpdate, now: DateTime<Utc>) -> &Position {
        let binary = update.source.is_binary();
        // Sentences in the same batch as a NAV-PVT describe the same epoch with less precision.
        let shadowed = !binary && self.pvt_batch == Some(self.batch);
        if update.source == Source::NavPvt {
            self.pvt_batch = Some(self.batch);
        }

        if !shadowed {
            self.apply_coordinates(update, binary);
            self.apply_altitude(update, binary);
            if let Some(used) = update.satellites_used {
                self.position.satellites_used = used;
            }
            self.apply_motion(update);
            self.apply_accuracy(update, binary);
            if let Some(date) = update.utc_date {
                self.position.utc_date = Some(date);
            }
            if let Some(time) = update.utc_time {
                self.position.utc_time = Some(time);
            }
        }

        if let Some(fix) = update.fix_type {
            self.apply_fix(update.source, fix);
        }

        if let Some(hdop) = usable_dop(update.hdop) {
            self.position.hdop = hdop;
        }
        if let Some(vdop) = usable_dop(update.vdop) {
            self.position.vdop = vdop;
        }
        if let Some(pdop) = usable_dop(update.pdop) {
            self.position.pdop = pdop;
        }
        if let Some(mode) = update.selection_mode {
            self.position.selection_mode = Some(mode);
        }

        self.position.last_update = Some(now);
        &self.position
    }

    fn apply_coordinates(&mut self, update: &PositionUpdate, binary: bool) {
        let (Some(lat), Some(lon)) = (update.latitude, update.longitude) else {
            return;
        };
        if !binary && lat == 0.0 && lon == 0.0 && self.position.has_coordinates() {
            return;
        }
        self.position.latitude = lat;
        self.position.longitude = lon;
    }

    fn apply_altitude(&mut self, update: &PositionUpdate, binary: bool) {
        if let Some(altitude) = update.altitude
            && (binary || !keeps_known(self.position.altitude, altitude))
        {
            self.position.altitude = altitude;
            self.position.altitude_datum = update.altitude_datum;
        }
        if let Some(separation) = update.geoid_separation
            && (binary || separation != 0.0 || self.position.geoid_separation.is_none())
        {
            self.position.geoid_separation = Some(separation);
        }
    }

    fn apply_motion(&mut self, update: &PositionUpdate) {
        if let Some(speed) = update.speed {
            self.position.speed = speed;
        }
        if let Some(course) = update.course {
            self.position.course = course;
        }
    }

    fn apply_accuracy(&mut self, update: &PositionUpdate, binary: bool) {
        if let Some(h) = update.horizontal_accuracy
            && (binary || h > 0.0)
        {
            self.position.horizontal_accuracy = h;
        }
        if let Some(v) = update.vertical_accuracy
            && (binary || v > 0.0)
        {
            self.position.vertical_accuracy = v;
        }
    }

    fn apply_fix(&mut self, source: Source, fix: FixType) {
        let current = self.position.fix_type;
        if !source.is_binary() {
            if let Some(origin) = self.fix_origin
                && origin.binary
            {
                if origin.batch == self.batch {
                    return;
                }
                if fix != FixType::NoFix && fix.rank() < current.rank() {
                    return;
                }
            }
            // GSA only distinguishes 2D and 3D, so it cannot describe DGPS or RTK.
            if source == Source::Gsa && fix != FixType::NoFix && fix.rank() < current.rank() {
                return;
            }
        }

        self.position.fix_type = fix;
        // A sentence confirming a binary fix leaves the binary origin in charge.
        let keeps_binary_origin = !source.is_binary()
            && fix != FixType::NoFix
            && self.fix_origin.is_some_and(|origin| origin.binary);
        if !keeps_binary_origin {
            self.fix_origin = Some(FixOrigin {
                binary: source.is_binary(),
                batch: self.batch,
            });
        }
    }

    /// Replace the whole satellite table from a binary source.
    pub fn replace_satellites(&mut self, satellites: Vec<SatelliteInfo>, now: DateTime<Utc>) {
        self.binary_satellites = true;
        self.talker_satellites.clear();
        self.satellites = satellites;
        self.position.satellites_in_view = count(&self.satellites);
        self.position.last_update = Some(now);
    }

    /// Replace one talker's contribution from a completed GSV sequence.
    ///
    /// A sweep tagged with a signal id only replaces that signal's satellites; the
    /// talker's list is the union of its signals by PRN. An untagged sweep replaces
    /// the talker's whole contribution. Returns false when a binary satellite table
    /// already owns the list.
    pub fn merge_talker_satellites(
        &mut self,
        talker: &str,
        signal: Option<u32>,
        satellites: Vec<SatelliteInfo>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.binary_satellites {
            return false;
        }
        if !self.talker_satellites.contains_key(talker)
            && self.talker_satellites.len() >= self.max_talkers
        {
            self.talker_satellites.pop_first();
        }
        let signals = self.talker_satellites.entry(talker.to_string()).or_default();
        match signal {
            Some(_) => {
                signals.remove(&None);
            }
            None => signals.clear(),
        }
        signals.insert(signal, satellites);
        self.satellites = self.talker_satellites.values().flat_map(union_by_prn).collect();
        self.position.satellites_in_view = count(&self.satellites);
        self.position.last_update = Some(now);
        true
    }
}

// Same satellite seen on several signals: keep one entry with the strongest SNR.
fn union_by_prn(signals: &BTreeMap<Option<u32>, Vec<SatelliteInfo>>) -> Vec<SatelliteInfo> {
    let mut merged: Vec<SatelliteInfo> = Vec::new();
    for satellite in signals.values().flatten() {
        match merged
            .iter_mut()
            .find(|seen| seen.id == satellite.id && seen.constellation == satellite.constellation)
        {
            Some(seen) => {
                seen.snr = seen.snr.max(satellite.snr);
                seen.elevation = seen.elevation.or(satellite.elevation);
                seen.azimuth = seen.azimuth.or(satellite.azimuth);
            }
            None => merged.push(satellite.clone()),
        }
    }
    merged
}

fn count(satellites: &[SatelliteInfo]) -> u32 {
    u32::try_from(satellites.len()).unwrap_or(u32::MAX)
}

impl Position {
    fn has_coordinates(&self) -> bool {
        self.latitude != 0.0 || self.longitude != 0.0
    }
}
