//! # Capability probing
//!
//! Runs once per device session, before any reads. Queries the device name and the
//! bitmaps of supported event codes, and derives the axis extents and resolution
//! constants that calibrate later decoding. Everything here is write-once: a probe
//! failure leaves the [`Calibration`] at its defaults and the session carries on
//! degraded rather than dying.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::builder::Settings;
use crate::events::{codes, EventKind};
use crate::transport::{Transport, TransportError};

/// Units per unit of the high-end (Intuos) product line.
pub const RESOLUTION_HIGH: u32 = 2540;
/// Units per unit of everything else (Graphire-class devices).
pub const RESOLUTION_DEFAULT: u32 = 1016;

/// Name substring selecting the high-resolution tier. A hard-coded two-way
/// classification - extending it means adding new substring rules here.
const HIGH_RES_SUBSTRING: &str = "Intuos";

/// Probing failed partway. Non-fatal: whatever was set before the failure stays set,
/// the rest remains at defaults.
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("capability query failed: {0}")]
    Query(#[from] TransportError),
}

/// Which `(event type, code)` pairs the device claims to support.
///
/// The kernel reports this as per-type bitmaps; a map of sets keeps the
/// "is code X supported under type Y" query without fixed-capacity bit arithmetic.
#[derive(Clone, Debug, Default)]
pub struct CapabilityTable {
    by_kind: HashMap<u16, HashSet<u16>>,
}

impl CapabilityTable {
    pub fn insert(&mut self, kind: EventKind, code: u16) {
        self.by_kind.entry(kind.raw()).or_default().insert(code);
    }
    #[must_use]
    pub fn supports(&self, kind: EventKind, code: u16) -> bool {
        self.by_kind
            .get(&kind.raw())
            .is_some_and(|codes| codes.contains(&code))
    }
    #[must_use]
    pub fn supports_kind(&self, kind: EventKind) -> bool {
        self.by_kind.contains_key(&kind.raw())
    }
}

/// Per-device axis ranges and resolution constants, established once at session start.
/// Immutable after init from the reducer's point of view.
///
/// Axis maxima of zero mean "uncalibrated" - a device reporting a zero range leaves
/// the field unset rather than declaring a zero-width axis.
#[derive(Clone, Debug, Default)]
pub struct Calibration {
    pub max_x: i32,
    pub max_y: i32,
    pub max_pressure: i32,
    pub resolution_x: u32,
    pub resolution_y: u32,
    /// Whether tilt handling was requested by configuration. The USB transport offers
    /// no way to send the tilt-mode command to the tablet, so this records intent only.
    pub tilt_enabled: bool,
    pub capabilities: CapabilityTable,
}

impl Calibration {
    /// First non-zero write wins. Duplicate or conflicting reports for an axis that
    /// already calibrated are dropped.
    fn set_axis_max(slot: &mut i32, maximum: i32) {
        if *slot == 0 {
            *slot = maximum;
        }
    }
}

/// Query the device and fill `calibration` in place.
///
/// Filling in place (rather than returning a fresh value) is what makes repeated probes
/// harmless: already-set axis maxima are never overwritten.
///
/// # Errors
/// Any capability query failing aborts the probe. The caller may continue the session
/// with whatever calibration was accumulated so far.
pub fn probe<T: Transport>(
    transport: &mut T,
    settings: &Settings,
    calibration: &mut Calibration,
) -> Result<(), ProbeError> {
    let name = transport.device_name()?;
    debug!(name = %name, "kernel input device name");

    let resolution = if name.contains(HIGH_RES_SUBSTRING) {
        RESOLUTION_HIGH
    } else {
        RESOLUTION_DEFAULT
    };
    calibration.resolution_x = resolution;
    calibration.resolution_y = resolution;

    for raw_kind in transport.supported_kinds()? {
        let kind = EventKind::from_raw(raw_kind);
        for code in transport.supported_codes(kind)? {
            calibration.capabilities.insert(kind, code);
            if kind == EventKind::Absolute {
                let range = transport.absolute_range(code)?;
                match code {
                    codes::ABS_X => Calibration::set_axis_max(&mut calibration.max_x, range.maximum),
                    codes::ABS_Y => Calibration::set_axis_max(&mut calibration.max_y, range.maximum),
                    codes::ABS_PRESSURE => {
                        Calibration::set_axis_max(&mut calibration.max_pressure, range.maximum);
                    }
                    _ => (),
                }
            }
        }
    }

    debug!(
        max_x = calibration.max_x,
        max_y = calibration.max_y,
        max_pressure = calibration.max_pressure,
        resolution_x = calibration.resolution_x,
        resolution_y = calibration.resolution_y,
        "axis setup"
    );

    calibration.tilt_enabled = settings.tilt_enabled;
    if settings.tilt_enabled {
        // The tilt-mode order would need to be sent to the tablet here, but the USB
        // transport has no out-of-band command channel. Known limitation, not an error.
        warn!("tilt requested; transport cannot send the tilt-mode command, proceeding without");
    }

    Ok(())
}
