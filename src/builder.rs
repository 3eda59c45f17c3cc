//! Builder-style configuration for a device session.
//!
//! These knobs are owned by the host's configuration layer and read-only from the
//! core's perspective - construct once, hand to [`Session::new`](crate::Session::new).

/// When the reducer hands a snapshot to the dispatch sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchGranularity {
    /// One dispatch per read cycle, regardless of how many terminator events the read
    /// contained. This is the historical behavior: intermediate complete frames within
    /// one read are coalesced into the final state.
    #[default]
    PerRead,
    /// One dispatch per terminator event. Events staged after the last terminator still
    /// mutate the state but are only dispatched in a later cycle.
    PerTerminator,
}

/// Pre-construction configuration for a [`Session`](crate::Session).
#[derive(Clone, Debug)]
pub struct Settings {
    /// Pressure above this (device-native units) presses the tip button.
    pub pressure_threshold: i32,
    /// Ask the device for tilt reports. See the note on
    /// [`Calibration::tilt_enabled`](crate::probe::Calibration::tilt_enabled).
    pub tilt_enabled: bool,
    /// Emit the post-probe setup summary at info level instead of debug.
    pub verbose: bool,
    pub granularity: DispatchGranularity,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Hosts should derive this from the probed pressure range; a small positive
            // default keeps a resting nib from counting as a press.
            pressure_threshold: 10,
            tilt_enabled: false,
            verbose: false,
            granularity: DispatchGranularity::default(),
        }
    }
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn pressure_threshold(mut self, threshold: i32) -> Self {
        self.pressure_threshold = threshold;
        self
    }
    #[must_use]
    pub fn tilt(mut self, enabled: bool) -> Self {
        self.tilt_enabled = enabled;
        self
    }
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
    #[must_use]
    pub fn granularity(mut self, granularity: DispatchGranularity) -> Self {
        self.granularity = granularity;
        self
    }
}
