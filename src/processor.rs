//! Thread-safe facade over the decoding pipeline.
//!
//! One producer calls [`NavProcessor::feed`]; any number of readers take
//! [`NavSnapshot`]s, which are immutable and swapped in whole after each call.

use crate::decode::{self, Update};
use crate::frame::{DEFAULT_MAX_UBX_PAYLOAD, FrameParser, RawMessage};
use crate::gsv::{DEFAULT_MAX_PENDING_TALKERS, GsvReassembler};
use crate::model::{Position, SatelliteInfo};
use crate::raw_buffer::{DEFAULT_RAW_BUFFER_CAPACITY, RawBuffer};
use crate::state::NavState;
use crate::stats::{Statistics, StatsTracker};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Bytes of raw stream kept for `raw_buffer`.
    pub raw_buffer_capacity: usize,
    /// Larger declared UBX payloads are treated as corruption.
    pub max_ubx_payload: usize,
    pub max_pending_talkers: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            raw_buffer_capacity: DEFAULT_RAW_BUFFER_CAPACITY,
            max_ubx_payload: DEFAULT_MAX_UBX_PAYLOAD,
            max_pending_talkers: DEFAULT_MAX_PENDING_TALKERS,
        }
    }
}

/// Everything a reader sees, published atomically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavSnapshot {
    pub position: Position,
    pub satellites: Vec<SatelliteInfo>,
    pub statistics: Statistics,
}

// Single-producer state. Only touched with the pipeline lock held.
struct Pipeline {
    framer: FrameParser,
    state: NavState,
    gsv: GsvReassembler,
    stats: StatsTracker,
}

impl Pipeline {
    fn new(config: &ProcessorConfig) -> Self {
        Self {
            framer: FrameParser::new(config.max_ubx_payload),
            state: NavState::new(config.max_pending_talkers),
            gsv: GsvReassembler::new(config.max_pending_talkers),
            stats: StatsTracker::new(),
        }
    }

    fn process(&mut self, bytes: &[u8], now: DateTime<Utc>) {
        self.state.begin_batch();

        let mut messages = Vec::new();
        let rejected = self.framer.push_bytes(bytes, &mut messages);
        self.stats.record_parse_errors(rejected.len() as u64);

        for message in &messages {
            let decoded = decode::decode(message);
            match message {
                RawMessage::BinaryFrame { .. } => self.stats.record_binary(&decoded.label),
                RawMessage::TextSentence(_) => self.stats.record_text(&decoded.label),
            }
            trace!("{} framed", decoded.label);

            match decoded.result {
                Ok(Some(update)) => self.apply(update, now),
                Ok(None) => {}
                Err(err) => {
                    debug!("{}: {err}", decoded.label);
                    self.stats.record_parse_errors(1);
                }
            }
        }
    }

    fn apply(&mut self, update: Update, now: DateTime<Utc>) {
        match update {
            Update::Position(position) => {
                self.state.apply(&position, now);
            }
            Update::Satellites(satellites) => self.state.replace_satellites(satellites, now),
            Update::GsvPart(part) => {
                let Some(sweep) = self.gsv.push(part) else {
                    return;
                };
                if !sweep.matches_declared_count() {
                    debug!(
                        "GSV sweep from {} declares {:?} in view, assembled {}",
                        sweep.talker,
                        sweep.in_view,
                        sweep.satellites.len()
                    );
                }
                let merged = self.state.merge_talker_satellites(
                    &sweep.talker,
                    sweep.signal,
                    sweep.satellites,
                    now,
                );
                if !merged {
                    trace!("GSV sweep from {} superseded by NAV-SAT", sweep.talker);
                }
            }
            Update::Status(status) => debug!(
                "NAV-STATUS fix={} fixOk={} diff={} ttff={}ms uptime={}ms",
                status.fix_type,
                status.fix_ok,
                status.differential,
                status.ttff_ms,
                status.uptime_ms
            ),
        }
    }

    fn reset(&mut self) {
        self.framer.reset();
        self.state.reset();
        self.gsv.clear();
        self.stats = StatsTracker::new();
    }

    fn snapshot(&self) -> NavSnapshot {
        NavSnapshot {
            position: self.state.position().clone(),
            satellites: self.state.satellites().to_vec(),
            statistics: self.stats.snapshot(),
        }
    }
}

pub struct NavProcessor {
    pipeline: Mutex<Pipeline>,
    raw: Mutex<RawBuffer>,
    published: RwLock<Arc<NavSnapshot>>,
}

impl Default for NavProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NavProcessor {
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        let pipeline = Pipeline::new(&config);
        let raw = RawBuffer::new(config.raw_buffer_capacity);
        Self {
            pipeline: Mutex::new(pipeline),
            raw: Mutex::new(raw),
            published: RwLock::new(Arc::new(NavSnapshot::default())),
        }
    }

    /// Feed one chunk of receiver bytes. Corrupt input is counted, never returned.
    pub fn feed(&self, bytes: &[u8]) {
        let mut pipeline = lock(&self.pipeline);
        lock(&self.raw).push(bytes);
        pipeline.process(bytes, Utc::now());
        self.publish(pipeline.snapshot());
    }

    pub fn snapshot(&self) -> Arc<NavSnapshot> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_position(&self) -> Position {
        self.snapshot().position.clone()
    }

    pub fn current_satellites(&self) -> Vec<SatelliteInfo> {
        self.snapshot().satellites.clone()
    }

    // Statistics carry a live rate, so they are recomputed rather than read from the last snapshot.
    pub fn current_statistics(&self) -> Statistics {
        lock(&self.pipeline).stats.snapshot()
    }

    pub fn raw_buffer(&self, max_bytes: usize) -> Vec<u8> {
        lock(&self.raw).tail(max_bytes)
    }

    pub fn buffer_size(&self) -> usize {
        lock(&self.raw).len()
    }

    pub fn clear_buffer(&self) {
        lock(&self.raw).clear();
    }

    /// Return every piece of session state to its defaults.
    pub fn reset(&self) {
        let mut pipeline = lock(&self.pipeline);
        pipeline.reset();
        lock(&self.raw).clear();
        self.publish(pipeline.snapshot());
        debug!("navigation session reset");
    }

    fn publish(&self, snapshot: NavSnapshot) {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *published = Arc::new(snapshot);
    }
}
