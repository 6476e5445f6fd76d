use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use gnss_stream::ProcessorConfig;
use std::path::PathBuf;

// CLI root definition. Each subcommand feeds a byte source into one NavProcessor.
#[derive(Parser, Debug)]
#[command(name = "gnss-stream", version)]
#[command(about = "Decode interleaved UBX/NMEA receiver streams into live navigation state")]
pub struct Cli {
    #[command(subcommand)]
    pub command: AppCommand,
}

// Subcommands map directly to one module each under src/commands/.
#[derive(Subcommand, Debug)]
pub enum AppCommand {
    /// Decode a live receiver over serial or TCP and report periodically
    Monitor(MonitorArgs),
    /// Decode a captured raw stream file and print the final state
    Replay(ReplayArgs),
}

// How much of the satellite table each report prints.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// One line per constellation
    Summary,
    /// One line per satellite
    Full,
}

// Decoder limits shared by both subcommands.
#[derive(Args, Debug, Clone)]
pub struct DecoderArgs {
    #[arg(long, default_value_t = 10_000)]
    pub raw_buffer_bytes: usize,
    #[arg(long, default_value_t = 8_192)]
    pub max_ubx_payload: usize,
    #[arg(long, default_value_t = 8)]
    pub max_pending_talkers: usize,
}

impl DecoderArgs {
    pub fn to_processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            raw_buffer_capacity: self.raw_buffer_bytes,
            max_ubx_payload: self.max_ubx_payload,
            max_pending_talkers: self.max_pending_talkers,
        }
    }
}

// Live decoding configuration. `--tcp` takes precedence over the serial port.
#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    #[arg(long, default_value = "/dev/ttyACM0")]
    pub serial_port: String,
    #[arg(long, default_value_t = 115_200)]
    pub baud_rate: u32,
    /// Read from a TCP stream (HOST:PORT) instead of a serial port
    #[arg(long)]
    pub tcp: Option<String>,
    #[arg(long, default_value_t = 250)]
    pub read_timeout_ms: u64,
    #[arg(long, default_value_t = 8_192)]
    pub read_buffer_bytes: usize,
    /// Seconds between status reports; 0 disables them
    #[arg(long, default_value_t = 5)]
    pub report_interval_secs: u64,
    #[arg(long, value_enum, default_value_t = ReportFormat::Summary)]
    pub report_format: ReportFormat,
    #[arg(long = "no-satellites", action = ArgAction::SetFalse, default_value_t = true)]
    pub report_satellites: bool,
    #[arg(long, default_value = "gnss_stream.lock")]
    pub lock_file: PathBuf,
    #[command(flatten)]
    pub decoder: DecoderArgs,
}

impl MonitorArgs {
    pub fn to_processor_config(&self) -> ProcessorConfig {
        self.decoder.to_processor_config()
    }

    // Label used in status lines and lock errors.
    pub fn source_label(&self) -> String {
        match &self.tcp {
            Some(address) => format!("tcp://{address}"),
            None => format!("{} @ {}", self.serial_port, self.baud_rate),
        }
    }
}

// Offline decoding of a capture made by any raw serial logger.
#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    pub file: PathBuf,
    /// Bytes per feed call, to reproduce transport chunking
    #[arg(long, default_value_t = 4_096)]
    pub chunk_bytes: usize,
    #[arg(long, value_enum, default_value_t = ReportFormat::Full)]
    pub report_format: ReportFormat,
    /// Also dump the last N raw bytes as hex
    #[arg(long, default_value_t = 0)]
    pub dump_tail_bytes: usize,
    #[command(flatten)]
    pub decoder: DecoderArgs,
}

impl ReplayArgs {
    pub fn to_processor_config(&self) -> ProcessorConfig {
        self.decoder.to_processor_config()
    }
}
