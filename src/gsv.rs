//! Reassembly of multi-part GSV (satellites in view) sequences, one per talker.
//!
//! NMEA 4.1 receivers send one sequence per signal for each talker; the signal id
//! travels with the sweep so the state can keep each signal's contribution.

use crate::model::SatelliteInfo;
use log::debug;
use std::collections::HashMap;

/// A GSV sentence carries at most four satellite blocks.
pub const MAX_SATELLITES_PER_PART: usize = 4;
pub const DEFAULT_MAX_PENDING_TALKERS: usize = 8;

/// One decoded GSV sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct GsvPart {
    pub talker: String,
    pub total: u32,
    pub number: u32,
    pub in_view: Option<u32>,
    /// NMEA 4.1 signal id, absent on older receivers.
    pub signal: Option<u32>,
    pub satellites: Vec<SatelliteInfo>,
}

/// All parts of one talker's sequence, delivered when the last part arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSweep {
    pub talker: String,
    pub signal: Option<u32>,
    pub in_view: Option<u32>,
    pub satellites: Vec<SatelliteInfo>,
}

impl CompletedSweep {
    /// False when the declared in-view count disagrees with the satellites received.
    pub fn matches_declared_count(&self) -> bool {
        self.in_view.is_none_or(|declared| {
            usize::try_from(declared).is_ok_and(|count| count == self.satellites.len())
        })
    }
}

#[derive(Debug)]
struct Pending {
    total: u32,
    next: u32,
    signal: Option<u32>,
    in_view: Option<u32>,
    satellites: Vec<SatelliteInfo>,
    started: u64,
}

#[derive(Debug)]
pub struct GsvReassembler {
    pending: HashMap<String, Pending>,
    max_talkers: usize,
    sequence: u64,
}

impl Default for GsvReassembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING_TALKERS)
    }
}

impl GsvReassembler {
    pub fn new(max_talkers: usize) -> Self {
        Self {
            pending: HashMap::new(),
            max_talkers: max_talkers.max(1),
            sequence: 0,
        }
    }

    // Part 1 always starts a fresh sequence; any other part must continue the one in progress.
    pub fn push(&mut self, part: GsvPart) -> Option<CompletedSweep> {
        let GsvPart {
            talker,
            total,
            number,
            in_view,
            signal,
            satellites,
        } = part;

        if number == 1 {
            if !self.pending.contains_key(&talker) {
                self.make_room();
            }
            self.sequence += 1;
            self.pending.insert(
                talker.clone(),
                Pending {
                    total,
                    next: 1,
                    signal,
                    in_view,
                    satellites: Vec::new(),
                    started: self.sequence,
                },
            );
        }

        let Some(pending) = self.pending.get_mut(&talker) else {
            debug!("GSV part {number}/{total} from {talker} without a sequence start, dropped");
            return None;
        };
        if pending.total != total || pending.next != number || pending.signal != signal {
            debug!(
                "GSV part {number}/{total} from {talker} breaks sequence (expected {}/{}), dropped",
                pending.next, pending.total
            );
            self.pending.remove(&talker);
            return None;
        }

        pending.satellites.extend(satellites);
        if in_view.is_some() {
            pending.in_view = in_view;
        }
        pending.next += 1;
        if number < total {
            return None;
        }

        let done = self.pending.remove(&talker)?;
        Some(CompletedSweep {
            talker,
            signal: done.signal,
            in_view: done.in_view,
            satellites: done.satellites,
        })
    }

    pub fn pending_talkers(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    // Evict the oldest unfinished sequence once the talker limit is reached.
    fn make_room(&mut self) {
        while self.pending.len() >= self.max_talkers {
            let Some(oldest) = self
                .pending
                .iter()
                .min_by_key(|(_, pending)| pending.started)
                .map(|(talker, _)| talker.clone())
            else {
                return;
            };
            debug!("GSV sequence from {oldest} evicted, too many talkers in progress");
            self.pending.remove(&oldest);
        }
    }
}
