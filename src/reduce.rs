//! # Event reduction
//!
//! Folds one read cycle's worth of raw events into the persistent [`TabletState`].
//! Events are staged first, then applied in order in a second pass; the tool serial
//! report acts as the frame terminator. Dispatch is per *read* by default, not per
//! terminator - see [`DispatchGranularity`] for the distinction and the configurable
//! alternative.

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::builder::{DispatchGranularity, Settings};
use crate::events::{codes, EventKind, RawEvent};
use crate::state::{Buttons, Proximity, TabletState, ToolType};

/// Capacity of the staging buffer, in events.
///
/// If a read would stage more than this before being consumed, the staging index resets
/// to zero and the overflowing prefix is silently discarded. Lossy, but bounded: a
/// malformed or desynchronized stream can't grow memory or wedge the session. The
/// semantic state record is *not* reset alongside - stale field values from the
/// discarded prefix may survive into the next snapshot.
pub const MAX_USB_EVENTS: usize = 32;

/// Sequence of completed snapshots produced by one reduction. Typically zero or one.
pub type Snapshots = SmallVec<[TabletState; 1]>;

/// The per-session event reducer.
///
/// Owns the staging buffer and the accumulator outright - there is no shared or global
/// slot behind this. The channel index seen by the dispatch sink is reserved for future
/// multi-device multiplexing and is always 0 today.
pub struct Reducer {
    /// Events observed since the start of the current read cycle. Never exceeds
    /// [`MAX_USB_EVENTS`], so it stays on the inline storage.
    staged: SmallVec<[RawEvent; MAX_USB_EVENTS]>,
    state: TabletState,
    pressure_threshold: i32,
    granularity: DispatchGranularity,
}

impl Reducer {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            staged: SmallVec::new(),
            state: TabletState::default(),
            pressure_threshold: settings.pressure_threshold,
            granularity: settings.granularity,
        }
    }

    /// The running accumulator, as of the last event applied.
    #[must_use]
    pub fn state(&self) -> &TabletState {
        &self.state
    }

    /// Consume one read cycle's batch, returning the completed snapshots.
    ///
    /// The whole batch is staged before anything is applied - terminator detection never
    /// early-exits the staging loop. Under [`DispatchGranularity::PerRead`] exactly one
    /// snapshot is produced per call, complete frame or not; under `PerTerminator`, one
    /// per terminator event, and trailing updates carry forward unemitted.
    pub fn reduce(&mut self, batch: &[RawEvent]) -> Snapshots {
        self.staged.clear();
        for event in batch {
            if self.staged.len() >= MAX_USB_EVENTS {
                debug!("staging buffer full, resetting index");
                self.staged.clear();
            }
            self.staged.push(*event);
        }

        let mut snapshots = Snapshots::new();
        for index in 0..self.staged.len() {
            let event = self.staged[index];
            trace!(
                index,
                kind = event.kind.as_ref(),
                code = event.code,
                value = event.value,
                "applying event"
            );
            self.apply(event);
            if self.granularity == DispatchGranularity::PerTerminator && event.is_terminator() {
                snapshots.push(self.state);
            }
        }
        if self.granularity == DispatchGranularity::PerRead {
            snapshots.push(self.state);
        }
        snapshots
    }

    /// Apply one event to the running state.
    #[allow(clippy::cast_sign_loss)]
    fn apply(&mut self, event: RawEvent) {
        let state = &mut self.state;
        match event.kind {
            EventKind::Absolute => match event.code {
                codes::ABS_X => state.x = event.value,
                codes::ABS_Y => state.y = event.value,
                codes::ABS_RZ => state.rotation = event.value,
                codes::ABS_TILT_X => state.tilt_x = event.value,
                codes::ABS_TILT_Y => state.tilt_y = event.value,
                codes::ABS_PRESSURE => {
                    state.pressure = event.value;
                    state
                        .buttons
                        .modify(Buttons::TIP, event.value > self.pressure_threshold);
                }
                // Reserved. Distance is sensed but carries nothing downstream yet.
                codes::ABS_DISTANCE => (),
                codes::ABS_WHEEL => state.wheel = event.value,
                codes::ABS_THROTTLE => state.throttle = event.value,
                _ => (),
            },
            EventKind::Relative => {
                if event.code == codes::REL_WHEEL {
                    state.wheel += event.value;
                } else {
                    // Tablets don't speak relative otherwise; worth noticing, not failing.
                    warn!(code = event.code, "unexpected relative event received");
                }
            }
            EventKind::Key => match event.code {
                codes::BTN_TOOL_PEN
                | codes::BTN_TOOL_PENCIL
                | codes::BTN_TOOL_BRUSH
                | codes::BTN_TOOL_AIRBRUSH => {
                    state.tool = ToolType::Stylus;
                    state.proximity = if event.value != 0 {
                        Proximity::In
                    } else {
                        Proximity::Out
                    };
                    debug!(code = event.code, "stylus detected");
                }
                codes::BTN_TOOL_RUBBER => {
                    state.tool = ToolType::Eraser;
                    // The distinct sentinel, so downstream can tell this apart
                    // from stylus proximity.
                    state.proximity = if event.value != 0 {
                        Proximity::Eraser
                    } else {
                        Proximity::Out
                    };
                    debug!(code = event.code, "eraser detected");
                }
                codes::BTN_TOOL_MOUSE | codes::BTN_TOOL_LENS => {
                    state.tool = ToolType::Cursor;
                    state.proximity = if event.value != 0 {
                        Proximity::In
                    } else {
                        Proximity::Out
                    };
                    debug!(code = event.code, "cursor detected");
                }
                // The pressure channel substitutes for this button.
                codes::BTN_TOUCH => (),
                codes::BTN_STYLUS | codes::BTN_MIDDLE => {
                    state.buttons.modify(Buttons::STYLUS, event.value != 0);
                }
                codes::BTN_STYLUS2 | codes::BTN_RIGHT => {
                    state.buttons.modify(Buttons::STYLUS2, event.value != 0);
                }
                codes::BTN_LEFT => state.buttons.modify(Buttons::TIP, event.value != 0),
                codes::BTN_SIDE => state.buttons.modify(Buttons::SIDE, event.value != 0),
                codes::BTN_EXTRA => state.buttons.modify(Buttons::EXTRA, event.value != 0),
                _ => (),
            },
            EventKind::Misc => {
                if event.code == codes::MSC_SERIAL {
                    state.serial = event.value as u32;
                    debug!(serial = state.serial, "tool serial number");
                }
            }
            EventKind::Synchronization | EventKind::Other(_) => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs(code: u16, value: i32) -> RawEvent {
        RawEvent::new(EventKind::Absolute, code, value)
    }
    fn key(code: u16, value: i32) -> RawEvent {
        RawEvent::new(EventKind::Key, code, value)
    }
    fn terminator(serial: i32) -> RawEvent {
        RawEvent::new(EventKind::Misc, codes::MSC_SERIAL, serial)
    }

    #[test]
    fn per_read_dispatches_once_despite_many_terminators() {
        let mut reducer = Reducer::new(&Settings::default());
        let batch = [
            abs(codes::ABS_X, 1),
            terminator(7),
            abs(codes::ABS_X, 2),
            terminator(7),
        ];
        let snapshots = reducer.reduce(&batch);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].x, 2, "intermediate frame coalesced away");
    }

    #[test]
    fn per_terminator_emits_each_frame() {
        let settings = Settings::new().granularity(DispatchGranularity::PerTerminator);
        let mut reducer = Reducer::new(&settings);
        let batch = [
            abs(codes::ABS_X, 1),
            terminator(7),
            abs(codes::ABS_X, 2),
            terminator(7),
            // Trailing update: applied, not emitted.
            abs(codes::ABS_X, 3),
        ];
        let snapshots = reducer.reduce(&batch);
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].x, 1);
        assert_eq!(snapshots[1].x, 2);
        assert_eq!(reducer.state().x, 3);
    }

    #[test]
    fn per_terminator_without_terminator_emits_nothing() {
        let settings = Settings::new().granularity(DispatchGranularity::PerTerminator);
        let mut reducer = Reducer::new(&settings);
        assert!(reducer.reduce(&[abs(codes::ABS_Y, 42)]).is_empty());
        assert_eq!(reducer.state().y, 42);
    }

    #[test]
    fn staging_overflow_discards_prefix_keeps_state() {
        let mut reducer = Reducer::new(&Settings::default());
        reducer.reduce(&[abs(codes::ABS_PRESSURE, 500)]);

        // One more than capacity: the first MAX_USB_EVENTS X updates are discarded,
        // leaving only the final Y update staged.
        let mut batch = vec![abs(codes::ABS_X, 999); MAX_USB_EVENTS];
        batch.push(abs(codes::ABS_Y, 5));
        let snapshots = reducer.reduce(&batch);

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].x, 0, "discarded prefix never applied");
        assert_eq!(snapshots[0].y, 5);
        assert_eq!(snapshots[0].pressure, 500, "semantic state not reset");
        assert!(reducer.staged.len() <= MAX_USB_EVENTS);
    }

    #[test]
    fn touch_key_is_ignored() {
        let mut reducer = Reducer::new(&Settings::default());
        let before = *reducer.state();
        reducer.reduce(&[key(codes::BTN_TOUCH, 1)]);
        assert_eq!(*reducer.state(), before);
    }

    #[test]
    fn unknown_relative_leaves_state_alone() {
        let mut reducer = Reducer::new(&Settings::default());
        reducer.reduce(&[abs(codes::ABS_WHEEL, 3)]);
        let before = *reducer.state();
        // REL_X
        reducer.reduce(&[RawEvent::new(EventKind::Relative, 0x00, 10)]);
        assert_eq!(*reducer.state(), before);
    }
}
