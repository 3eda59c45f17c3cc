//! # USB tablet event normalization
//!
//! Translates the raw kernel input-subsystem event stream of a USB HID tablet into
//! normalized [`TabletState`](state::TabletState) snapshots - position, pressure, tilt,
//! buttons, tool identity, proximity - ready for a downstream pointer-motion or
//! event-dispatch layer.
//!
//! The interesting part is the reduction protocol: the kernel delivers a heterogeneous,
//! order-dependent stream of typed events, and this crate accumulates them into one
//! coherent record per frame, calibrated by a one-shot [capability probe](probe) at
//! session start.
//!
//! To get started, implement (or reuse) a [`Transport`](transport::Transport) over your
//! device handle and create a [`Session`]. Drive [`Session::pump`] from your I/O
//! readiness notification - the read itself is the only blocking point.
//!
//! ```no_run
//! use wacom_usb::{builder::Settings, transport::StreamTransport, Session};
//!
//! let device = std::fs::File::open("/dev/input/event5").unwrap();
//! let mut session = Session::new(
//!     StreamTransport::new(device),
//!     Settings::new().pressure_threshold(40),
//! );
//! let _ = session.init();
//! loop {
//!     session.pump(&mut |channel: usize, state: &wacom_usb::state::TabletState| {
//!         println!("[{channel}] {state:?}");
//!     });
//! }
//! ```
//!
//! **Note:** tablet firmware has no shortage of quirks. Values are normalized in shape,
//! not cleaned in content: device-native units are reported as-is, and a dispatched
//! snapshot may describe an incomplete frame if the read ended before a terminator.
//! Guarantees are made only when explicitly stated so!

#![warn(clippy::pedantic)]

pub mod builder;
pub mod events;
pub mod probe;
pub mod reduce;
pub mod state;
pub mod transport;

use tracing::{debug, error, info};

use builder::Settings;
use events::{EventKind, RawEvent};
use probe::{Calibration, ProbeError};
use reduce::Reducer;
use state::TabletState;
use transport::Transport;

/// Capacity of the per-read event buffer. One kernel read never returns more than this
/// many records to a single cycle.
const READ_CAPACITY: usize = 64;

/// Receives completed snapshots. Owned by the host's event-routing subsystem.
///
/// The channel index is reserved for multi-device multiplexing and is always 0 for now.
pub trait EventSink {
    fn dispatch(&mut self, channel: usize, state: &TabletState);
}

impl<F: FnMut(usize, &TabletState)> EventSink for F {
    fn dispatch(&mut self, channel: usize, state: &TabletState) {
        self(channel, state);
    }
}

/// One device session: a transport, its calibration, and the running accumulator.
///
/// Single-threaded and synchronous by construction - the session owns everything it
/// touches, and nothing here suspends except the transport read itself. Teardown is the
/// host's job: closing the device handle makes the next read fail, which [`pump`]
/// absorbs as a logged, dispatch-free cycle.
///
/// [`pump`]: Session::pump
pub struct Session<T: Transport> {
    transport: T,
    settings: Settings,
    calibration: Calibration,
    reducer: Reducer,
}

impl<T: Transport> Session<T> {
    #[must_use]
    pub fn new(transport: T, settings: Settings) -> Self {
        let reducer = Reducer::new(&settings);
        Self {
            transport,
            settings,
            calibration: Calibration::default(),
            reducer,
        }
    }

    /// Run the capability probe once, before any reads.
    ///
    /// # Errors
    /// A failed capability query. Non-fatal: calibration keeps its defaults and the
    /// session may still pump, just uncalibrated.
    pub fn init(&mut self) -> Result<(), ProbeError> {
        debug!("initializing USB tablet");
        probe::probe(&mut self.transport, &self.settings, &mut self.calibration)?;
        if self.settings.verbose {
            info!(
                max_x = self.calibration.max_x,
                max_y = self.calibration.max_y,
                resolution_x = self.calibration.resolution_x,
                resolution_y = self.calibration.resolution_y,
                tilt = self.calibration.tilt_enabled,
                "tablet setup"
            );
        }
        Ok(())
    }

    /// One blocking read-reduce-dispatch cycle. Returns how many snapshots were
    /// dispatched to `sink`.
    ///
    /// A failed or empty read is logged and absorbed: no state mutation, no dispatch,
    /// zero returned. Retrying belongs to the host's polling loop, not here.
    pub fn pump<S: EventSink>(&mut self, sink: &mut S) -> usize {
        let mut buf = [RawEvent::new(EventKind::Synchronization, 0, 0); READ_CAPACITY];
        let len = match self.transport.read_events(&mut buf) {
            Ok(len) => len,
            Err(err) => {
                error!("error reading tablet device: {err}");
                return 0;
            }
        };
        debug!(events = len, "read batch");

        let snapshots = self.reducer.reduce(&buf[..len]);
        for snapshot in &snapshots {
            sink.dispatch(0, snapshot);
        }
        snapshots.len()
    }

    /// Calibration established by [`init`](Session::init). All-default until then.
    #[must_use]
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// The running accumulator, including any unflushed updates from partial frames.
    #[must_use]
    pub fn state(&self) -> &TabletState {
        self.reducer.state()
    }

    /// Tear the session apart, handing the transport back to the host.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }
}
