//! Streaming decoder for u-blox UBX binary frames interleaved with NMEA 0183 sentences.
//!
//! Bytes go in through [`NavProcessor::feed`] in chunks of any size; the current
//! position, satellite table and statistics come out as immutable snapshots.

pub mod decode;
pub mod error;
pub mod frame;
pub mod gsv;
pub mod model;
pub mod nmea;
pub mod processor;
pub mod raw_buffer;
pub mod state;
pub mod stats;

pub use error::{DecodeError, FrameError};
pub use frame::{FrameParser, RawMessage, encode_ubx_frame, ubx_checksum};
pub use model::{
    AltitudeDatum, Constellation, FixType, Position, SatelliteInfo, SelectionMode, UNKNOWN_DOP,
};
pub use processor::{NavProcessor, NavSnapshot, ProcessorConfig};
pub use stats::Statistics;
