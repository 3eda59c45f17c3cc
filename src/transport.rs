//! # Transport
//!
//! The boundary between this crate and the host's device handle. Opening the device node,
//! owning the file descriptor, and noticing I/O readiness all belong to the caller; this
//! trait only models what the core itself needs - a blocking batch read, plus the
//! out-of-band capability queries the [prober](crate::probe) issues once at session start.

use crate::events::{parse_stream, EventKind, RawEvent, WIRE_RECORD_SIZE};

/// Errors surfaced by a transport. None of these are fatal to a session:
/// probe failures degrade calibration, read failures skip the cycle.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The underlying handle failed.
    #[error("device i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// A read yielded no bytes - the device is gone or the stream desynchronized.
    #[error("device read returned no data")]
    Closed,
    /// This transport cannot answer the query (e.g. a plain byte stream has no
    /// capability side-channel).
    #[error("query not supported by this transport")]
    Unsupported,
}

/// The distilled axis descriptor. Of the kernel's `input_absinfo`, only the range
/// matters for calibration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AbsRange {
    pub minimum: i32,
    /// Upper bound of the axis. Zero means the device declined to report one,
    /// which calibration treats as "uncalibrated", not as a zero-width axis.
    pub maximum: i32,
}

/// A readable USB tablet device handle.
///
/// Capability queries are synchronous request/response calls on the same handle as the
/// event stream - the `EVIOCG*` family in the real kernel interface.
pub trait Transport {
    /// The kernel-reported device name string.
    fn device_name(&mut self) -> Result<String, TransportError>;
    /// Bitmap of supported top-level event types, as a list of raw type numbers.
    fn supported_kinds(&mut self) -> Result<Vec<u16>, TransportError>;
    /// Bitmap of supported codes within one event type.
    fn supported_codes(&mut self, kind: EventKind) -> Result<Vec<u16>, TransportError>;
    /// Axis descriptor for one absolute-axis code.
    fn absolute_range(&mut self, code: u16) -> Result<AbsRange, TransportError>;
    /// Blocking batch read of decoded events into `buf`, returning how many were read.
    ///
    /// Implementations must report an empty read as [`TransportError::Closed`] rather
    /// than `Ok(0)` - the caller treats any failure here as "log and skip the cycle".
    fn read_events(&mut self, buf: &mut [RawEvent]) -> Result<usize, TransportError>;
}

/// A transport over any plain byte stream of wire records.
///
/// Useful for replaying captured `/dev/input` traffic, or for hosts that hand this crate
/// a pipe instead of the device node itself. A byte stream has no ioctl side-channel, so
/// every capability query answers [`TransportError::Unsupported`] and the session runs
/// with default calibration - the documented degraded mode.
pub struct StreamTransport<R> {
    reader: R,
}

impl<R: std::io::Read> StreamTransport<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
    /// Get back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: std::io::Read> Transport for StreamTransport<R> {
    fn device_name(&mut self) -> Result<String, TransportError> {
        Err(TransportError::Unsupported)
    }
    fn supported_kinds(&mut self) -> Result<Vec<u16>, TransportError> {
        Err(TransportError::Unsupported)
    }
    fn supported_codes(&mut self, _kind: EventKind) -> Result<Vec<u16>, TransportError> {
        Err(TransportError::Unsupported)
    }
    fn absolute_range(&mut self, _code: u16) -> Result<AbsRange, TransportError> {
        Err(TransportError::Unsupported)
    }
    fn read_events(&mut self, buf: &mut [RawEvent]) -> Result<usize, TransportError> {
        // One read call per cycle, like the kernel interface: whatever whole records
        // came back in this read form the batch.
        let mut bytes = vec![0u8; buf.len() * WIRE_RECORD_SIZE];
        let got = self.reader.read(&mut bytes)?;
        if got == 0 {
            return Err(TransportError::Closed);
        }
        let mut count = 0;
        for event in parse_stream(&bytes[..got]) {
            buf[count] = event;
            count += 1;
        }
        if count == 0 {
            // Bytes arrived but not one whole record among them.
            return Err(TransportError::Closed);
        }
        Ok(count)
    }
}
