//! # Tablet state
//!
//! The normalized record every read cycle reduces into. One [`TabletState`] lives for the
//! whole device session and is mutated in place: the hardware only reports axes that
//! changed, so each new reduction starts from the previous snapshot, never from zero.
//! Fields that were silent in a batch simply keep their prior values.

bitflags::bitflags! {
    /// Button state bitmask, accumulated and cleared one event at a time.
    #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
    pub struct Buttons: u16 {
        /// Primary. Driven by the pressure threshold (and `BTN_LEFT` on cursor tools),
        /// *not* by the touch key.
        const TIP = 1;
        /// Secondary stylus barrel button, or middle on a cursor tool.
        const STYLUS = 2;
        /// Tertiary stylus barrel button, or right on a cursor tool.
        const STYLUS2 = 4;
        const SIDE = 8;
        const EXTRA = 16;
    }
}

impl Buttons {
    /// Set or clear one flag depending on the event value, leaving the rest alone.
    pub fn modify(&mut self, flag: Buttons, pressed: bool) {
        if pressed {
            self.insert(flag);
        } else {
            self.remove(flag);
        }
    }
}

/// Which physical tool last reported proximity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::AsRefStr)]
pub enum ToolType {
    #[default]
    Unknown,
    /// Pen, pencil, brush, or airbrush nib.
    Stylus,
    /// The reverse nib of a stylus.
    Eraser,
    /// Mouse or lens puck resting on the pad.
    Cursor,
}

/// Whether the tool is within sensing range of the pad surface.
///
/// The eraser reports a dedicated variant rather than plain "in", so downstream
/// consumers can tell eraser proximity apart from stylus proximity without
/// re-checking the tool type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::AsRefStr)]
pub enum Proximity {
    #[default]
    Out,
    In,
    /// The eraser sentinel. Distinct from [`Proximity::In`] by design.
    Eraser,
}

impl Proximity {
    /// Out-of-range always maps to `Out`; in-range maps to `In` or the eraser sentinel.
    #[must_use]
    pub fn in_range(self) -> bool {
        !matches!(self, Self::Out)
    }
}

/// The accumulated state of one tablet channel, in device-native units.
///
/// # Quirks
/// A snapshot handed to the dispatch sink is not guaranteed to be a *complete* logical
/// frame: dispatch is per read cycle, and a read may end before the terminator arrives.
/// Unflushed field updates carry forward into the next cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TabletState {
    /// Absolute position.
    pub x: i32,
    pub y: i32,
    /// Nib force, compared against the configured threshold to derive [`Buttons::TIP`].
    pub pressure: i32,
    pub tilt_x: i32,
    pub tilt_y: i32,
    /// Rotation around the tool's long axis (airbrush / art pen barrels).
    pub rotation: i32,
    /// Absolute-set by `ABS_WHEEL`, relative-accumulated by `REL_WHEEL`.
    pub wheel: i32,
    pub throttle: i32,
    pub buttons: Buttons,
    pub tool: ToolType,
    pub proximity: Proximity,
    /// Hardware serial of the tool, as carried by the last terminator event.
    pub serial: u32,
}
