//! # Raw events
//!
//! The kernel input subsystem delivers a stream of fixed-size records, each carrying a
//! `(type, code, value)` triple plus a timestamp this crate ignores. Everything the
//! [reducer](crate::reduce) consumes and everything the [prober](crate::probe) enumerates is
//! expressed in these terms, so the constants and the wire codec live here.

/// Kernel event code constants, as found in `<linux/input-event-codes.h>`.
///
/// Only the codes this crate actually matches on are listed - tablets report plenty more,
/// which pass through the staging buffer untouched.
pub mod codes {
    // Absolute axes.
    pub const ABS_X: u16 = 0x00;
    pub const ABS_Y: u16 = 0x01;
    pub const ABS_RZ: u16 = 0x05;
    pub const ABS_THROTTLE: u16 = 0x06;
    pub const ABS_WHEEL: u16 = 0x08;
    pub const ABS_PRESSURE: u16 = 0x18;
    pub const ABS_DISTANCE: u16 = 0x19;
    pub const ABS_TILT_X: u16 = 0x1a;
    pub const ABS_TILT_Y: u16 = 0x1b;

    // Relative axes.
    pub const REL_WHEEL: u16 = 0x08;

    // Mouse-style buttons, reported by cursor (puck) tools.
    pub const BTN_LEFT: u16 = 0x110;
    pub const BTN_RIGHT: u16 = 0x111;
    pub const BTN_MIDDLE: u16 = 0x112;
    pub const BTN_SIDE: u16 = 0x113;
    pub const BTN_EXTRA: u16 = 0x114;

    // Tool proximity keys. Which one fires tells us what's hovering.
    pub const BTN_TOOL_PEN: u16 = 0x140;
    pub const BTN_TOOL_RUBBER: u16 = 0x141;
    pub const BTN_TOOL_BRUSH: u16 = 0x142;
    pub const BTN_TOOL_PENCIL: u16 = 0x143;
    pub const BTN_TOOL_AIRBRUSH: u16 = 0x144;
    pub const BTN_TOOL_MOUSE: u16 = 0x146;
    pub const BTN_TOOL_LENS: u16 = 0x147;

    // Stylus contact and barrel buttons.
    pub const BTN_TOUCH: u16 = 0x14a;
    pub const BTN_STYLUS: u16 = 0x14b;
    pub const BTN_STYLUS2: u16 = 0x14c;

    // Miscellaneous channel. The serial report doubles as the frame terminator.
    pub const MSC_SERIAL: u16 = 0x00;
}

/// Top-level event types of the kernel input protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum EventKind {
    /// `EV_SYN` - synchronization markers. Not used by this protocol generation,
    /// which terminates frames on the serial report instead.
    Synchronization,
    /// `EV_KEY` - buttons and tool proximity keys.
    Key,
    /// `EV_REL` - relative axes. Tablets only ever send the wheel here.
    Relative,
    /// `EV_ABS` - absolute axes, the bulk of every report.
    Absolute,
    /// `EV_MSC` - miscellaneous, carries the tool serial number.
    Misc,
    /// Anything else. Carried opaquely so capability tables can still record it.
    Other(u16),
}

impl EventKind {
    #[must_use]
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x00 => Self::Synchronization,
            0x01 => Self::Key,
            0x02 => Self::Relative,
            0x03 => Self::Absolute,
            0x04 => Self::Misc,
            other => Self::Other(other),
        }
    }
    #[must_use]
    pub fn raw(self) -> u16 {
        match self {
            Self::Synchronization => 0x00,
            Self::Key => 0x01,
            Self::Relative => 0x02,
            Self::Absolute => 0x03,
            Self::Misc => 0x04,
            Self::Other(other) => other,
        }
    }
}

/// Size in bytes of one wire record - `struct input_event` on 64-bit kernels.
/// Two 64-bit timestamp words, then type, code, value.
pub const WIRE_RECORD_SIZE: usize = 24;

/// One `(type, code, value)` triple from the kernel event stream.
/// Read-only input to the reducer; timestamps are dropped at the decode boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    #[must_use]
    pub fn new(kind: EventKind, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }
    /// Decode one record from its wire form. `None` if the buffer is short.
    ///
    /// Fields are little-endian at fixed offsets past the 16 timestamp bytes.
    #[must_use]
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < WIRE_RECORD_SIZE {
            return None;
        }
        let kind = u16::from_le_bytes([buf[16], buf[17]]);
        let code = u16::from_le_bytes([buf[18], buf[19]]);
        let value = i32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]);
        Some(Self {
            kind: EventKind::from_raw(kind),
            code,
            value,
        })
    }
    /// Whether this event is the frame terminator - the tool serial number report.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.kind == EventKind::Misc && self.code == codes::MSC_SERIAL
    }
}

/// Iterate the whole records of a raw byte buffer. A trailing partial record is ignored.
pub fn parse_stream(buf: &[u8]) -> impl Iterator<Item = RawEvent> + '_ {
    buf.chunks_exact(WIRE_RECORD_SIZE)
        .filter_map(RawEvent::parse)
}
