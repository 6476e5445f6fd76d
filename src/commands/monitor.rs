use crate::args::MonitorArgs;
use crate::shared::lock::SourceLock;
use crate::shared::report::StatusReporter;
use crate::shared::signal::install_stop_handler;
use anyhow::{Context, Result};
use gnss_stream::NavProcessor;
use log::{info, warn};
use serialport::SerialPort;
use std::io::{self, Read};
use std::net::TcpStream;
use std::time::Duration;

// Byte source for the monitor loop.
enum ByteSource {
    Serial(Box<dyn SerialPort>),
    Tcp(TcpStream),
}

impl ByteSource {
    fn open(args: &MonitorArgs) -> Result<Self> {
        let timeout = Duration::from_millis(args.read_timeout_ms.max(1));
        match &args.tcp {
            Some(address) => {
                let stream = TcpStream::connect(address)
                    .with_context(|| format!("connecting to GNSS stream failed: {address}"))?;
                stream
                    .set_read_timeout(Some(timeout))
                    .context("setting TCP read timeout failed")?;
                Ok(ByteSource::Tcp(stream))
            }
            None => {
                let port = serialport::new(&args.serial_port, args.baud_rate)
                    .timeout(timeout)
                    .open()
                    .with_context(|| {
                        format!(
                            "opening serial port failed: {} @ {}",
                            args.serial_port, args.baud_rate
                        )
                    })?;
                Ok(ByteSource::Serial(port))
            }
        }
    }

    fn is_stream(&self) -> bool {
        matches!(self, ByteSource::Tcp(_))
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ByteSource::Serial(port) => port.read(buf),
            ByteSource::Tcp(stream) => stream.read(buf),
        }
    }
}

// Public monitor command entrypoint: read until Ctrl-C, reporting on an interval.
pub fn run_monitor(args: MonitorArgs) -> Result<()> {
    let stop = install_stop_handler()?;
    let source_label = args.source_label();
    let lock = SourceLock::acquire(&args.lock_file, &source_label)?;

    let mut source = ByteSource::open(&args)?;
    let processor = NavProcessor::with_config(args.to_processor_config());
    let mut reporter =
        StatusReporter::new(args.report_interval_secs, args.report_format, args.report_satellites);
    info!("Decoding {} (lock {})", source_label, lock.path().display());

    let mut buffer = vec![0_u8; args.read_buffer_bytes.max(1_024)];
    let mut total_bytes: u64 = 0;

    while stop.is_running() {
        match source.read(&mut buffer) {
            Ok(0) if source.is_stream() => {
                warn!("{source_label} closed the connection");
                break;
            }
            Ok(0) => {}
            Ok(size) => {
                processor.feed(&buffer[..size]);
                total_bytes += size as u64;
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading GNSS stream failed: {source_label}"));
            }
        }

        reporter.maybe_emit(&processor.snapshot(), &source_label);
    }

    let snapshot = processor.snapshot();
    reporter.emit(&snapshot, &source_label);
    if total_bytes == 0 {
        warn!("no bytes received from {source_label}");
    }
    info!("Monitor stopped after {total_bytes} bytes");
    Ok(())
}
