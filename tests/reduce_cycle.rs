use std::collections::VecDeque;

use wacom_usb::builder::{DispatchGranularity, Settings};
use wacom_usb::events::{codes, EventKind, RawEvent};
use wacom_usb::reduce::MAX_USB_EVENTS;
use wacom_usb::state::{Buttons, Proximity, TabletState, ToolType};
use wacom_usb::transport::{AbsRange, Transport, TransportError};
use wacom_usb::{EventSink, Session};

fn abs(code: u16, value: i32) -> RawEvent {
    RawEvent::new(EventKind::Absolute, code, value)
}
fn rel(code: u16, value: i32) -> RawEvent {
    RawEvent::new(EventKind::Relative, code, value)
}
fn key(code: u16, value: i32) -> RawEvent {
    RawEvent::new(EventKind::Key, code, value)
}
fn terminator(serial: i32) -> RawEvent {
    RawEvent::new(EventKind::Misc, codes::MSC_SERIAL, serial)
}

/// Replays scripted read batches. An empty scripted batch models a failed read.
struct ScriptedReads {
    batches: VecDeque<Vec<RawEvent>>,
}

impl ScriptedReads {
    fn new(batches: impl IntoIterator<Item = Vec<RawEvent>>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
        }
    }
}

impl Transport for ScriptedReads {
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
        let batch = self.batches.pop_front().ok_or(TransportError::Closed)?;
        if batch.is_empty() {
            return Err(TransportError::Closed);
        }
        buf[..batch.len()].copy_from_slice(&batch);
        Ok(batch.len())
    }
}

#[derive(Default)]
struct RecordingSink {
    dispatched: Vec<(usize, TabletState)>,
}

impl EventSink for RecordingSink {
    fn dispatch(&mut self, channel: usize, state: &TabletState) {
        self.dispatched.push((channel, *state));
    }
}

fn session_with(batches: impl IntoIterator<Item = Vec<RawEvent>>) -> Session<ScriptedReads> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Session::new(ScriptedReads::new(batches), Settings::default())
}

#[test]
fn full_frame_reduces_to_one_snapshot() {
    let mut session = session_with([vec![
        key(codes::BTN_TOOL_PEN, 1),
        abs(codes::ABS_X, 1200),
        abs(codes::ABS_Y, 3400),
        abs(codes::ABS_PRESSURE, 250),
        terminator(0),
    ]]);
    let mut sink = RecordingSink::default();
    assert_eq!(session.pump(&mut sink), 1);

    let (channel, state) = sink.dispatched[0];
    assert_eq!(channel, 0);
    assert_eq!(state.x, 1200);
    assert_eq!(state.y, 3400);
    assert_eq!(state.pressure, 250);
    assert_eq!(state.tool, ToolType::Stylus);
    assert_eq!(state.proximity, Proximity::In);
    assert!(state.buttons.contains(Buttons::TIP), "250 > default threshold");
}

#[test]
fn button_bits_accumulate_independently_of_interleaving() {
    // Side down, unrelated axis noise, extra down, stylus down then up again:
    // final mask is the OR of bits whose last event was a down.
    let mut session = session_with([vec![
        key(codes::BTN_SIDE, 1),
        abs(codes::ABS_X, 77),
        key(codes::BTN_EXTRA, 1),
        abs(codes::ABS_TILT_X, -10),
        key(codes::BTN_STYLUS, 1),
        key(codes::BTN_STYLUS, 0),
        terminator(1),
    ]]);
    let mut sink = RecordingSink::default();
    session.pump(&mut sink);
    assert_eq!(sink.dispatched[0].1.buttons, Buttons::SIDE | Buttons::EXTRA);
}

#[test]
fn pressure_threshold_drives_tip_bit_both_ways() {
    let settings = Settings::new().pressure_threshold(40);
    let mut session = Session::new(
        ScriptedReads::new([
            vec![abs(codes::ABS_PRESSURE, 41), terminator(1)],
            vec![abs(codes::ABS_PRESSURE, 40), terminator(1)],
            vec![abs(codes::ABS_PRESSURE, 500), terminator(1)],
        ]),
        settings,
    );
    let mut sink = RecordingSink::default();
    session.pump(&mut sink);
    session.pump(&mut sink);
    session.pump(&mut sink);
    assert!(sink.dispatched[0].1.buttons.contains(Buttons::TIP));
    assert!(
        !sink.dispatched[1].1.buttons.contains(Buttons::TIP),
        "exactly at threshold clears, regardless of prior tip state"
    );
    assert!(sink.dispatched[2].1.buttons.contains(Buttons::TIP));
}

#[test]
fn eraser_reports_the_sentinel_proximity() {
    let mut session = session_with([
        vec![key(codes::BTN_TOOL_RUBBER, 1), terminator(2)],
        vec![key(codes::BTN_TOOL_RUBBER, 0), terminator(2)],
    ]);
    let mut sink = RecordingSink::default();
    session.pump(&mut sink);
    session.pump(&mut sink);

    let entering = sink.dispatched[0].1;
    assert_eq!(entering.tool, ToolType::Eraser);
    assert_eq!(entering.proximity, Proximity::Eraser);
    assert_ne!(entering.proximity, Proximity::In, "distinct from stylus proximity");

    let leaving = sink.dispatched[1].1;
    assert_eq!(leaving.proximity, Proximity::Out);
}

#[test]
fn relative_wheel_accumulates_absolute_wheel_sets() {
    let mut session = session_with([
        vec![
            abs(codes::ABS_WHEEL, 5),
            rel(codes::REL_WHEEL, 3),
            rel(codes::REL_WHEEL, 2),
            terminator(3),
        ],
        vec![abs(codes::ABS_WHEEL, 0), terminator(3)],
    ]);
    let mut sink = RecordingSink::default();
    session.pump(&mut sink);
    assert_eq!(sink.dispatched[0].1.wheel, 10);
    session.pump(&mut sink);
    assert_eq!(sink.dispatched[1].1.wheel, 0, "absolute set wins over accumulation");
}

#[test]
fn failed_read_is_a_no_op() {
    let mut session = session_with([
        vec![abs(codes::ABS_X, 500), abs(codes::ABS_PRESSURE, 99), terminator(4)],
        // Scripted failure.
        vec![],
    ]);
    let mut sink = RecordingSink::default();
    session.pump(&mut sink);
    let before = *session.state();

    assert_eq!(session.pump(&mut sink), 0);
    assert_eq!(*session.state(), before, "state bit-identical across the failed read");
    assert_eq!(sink.dispatched.len(), 1, "no dispatch for the failed read");
}

#[test]
fn staging_overflow_resets_index_without_losing_the_record() {
    let mut session = session_with([
        vec![abs(codes::ABS_PRESSURE, 321), terminator(5)],
        {
            // More than the staging buffer holds, no terminator in sight: the prefix
            // is discarded, only post-reset events land.
            let mut batch = vec![abs(codes::ABS_X, 12345); MAX_USB_EVENTS];
            batch.push(abs(codes::ABS_Y, 42));
            batch
        },
    ]);
    let mut sink = RecordingSink::default();
    session.pump(&mut sink);
    session.pump(&mut sink);

    let after = sink.dispatched[1].1;
    assert_eq!(after.x, 0, "discarded prefix was never applied");
    assert_eq!(after.y, 42, "post-reset event applied");
    assert_eq!(after.pressure, 321, "semantic record survives the reset");
}

#[test]
fn unrefreshed_fields_persist_across_cycles() {
    let mut session = session_with([
        vec![
            key(codes::BTN_TOOL_PEN, 1),
            abs(codes::ABS_X, 800),
            abs(codes::ABS_Y, 600),
            abs(codes::ABS_PRESSURE, 300),
            terminator(6),
        ],
        // A lone tilt update, not even a terminator.
        vec![abs(codes::ABS_TILT_X, 25)],
    ]);
    let mut sink = RecordingSink::default();
    session.pump(&mut sink);
    session.pump(&mut sink);

    let second = sink.dispatched[1].1;
    assert_eq!(second.tilt_x, 25);
    assert_eq!(second.x, 800);
    assert_eq!(second.y, 600);
    assert_eq!(second.pressure, 300);
    assert_eq!(second.buttons, sink.dispatched[0].1.buttons);
    assert_eq!(second.proximity, Proximity::In);
}

#[test]
fn serial_number_rides_the_terminator() {
    let mut session = session_with([vec![abs(codes::ABS_X, 1), terminator(0x00d0_beef)]]);
    let mut sink = RecordingSink::default();
    session.pump(&mut sink);
    assert_eq!(sink.dispatched[0].1.serial, 0x00d0_beef);
}

#[test]
fn per_terminator_granularity_emits_every_frame() {
    let settings = Settings::new().granularity(DispatchGranularity::PerTerminator);
    let mut session = Session::new(
        ScriptedReads::new([vec![
            abs(codes::ABS_X, 1),
            terminator(7),
            abs(codes::ABS_X, 2),
            terminator(7),
        ]]),
        settings,
    );
    let mut sink = RecordingSink::default();
    assert_eq!(session.pump(&mut sink), 2);
    assert_eq!(sink.dispatched[0].1.x, 1);
    assert_eq!(sink.dispatched[1].1.x, 2);
}

#[test]
fn degraded_probe_leaves_defaults_and_session_continues() {
    let mut session = session_with([vec![abs(codes::ABS_X, 7), terminator(8)]]);
    assert!(session.init().is_err(), "stream transport cannot answer queries");
    assert_eq!(session.calibration().max_x, 0);
    assert_eq!(session.calibration().resolution_x, 0);

    let mut sink = RecordingSink::default();
    assert_eq!(session.pump(&mut sink), 1);
    assert_eq!(sink.dispatched[0].1.x, 7);
}
