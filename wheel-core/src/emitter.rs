//! Gamepad state owner that pushes a HID report on every change.

use wheel_proto::{GamepadReport, GamepadState, InputEvent};

use crate::transport::{ReportError, ReportSink};

/// Current gamepad state plus the sink its reports go to.
///
/// Every [`apply`](Self::apply) mutates the state and pushes exactly one
/// report reflecting the state at that instant. There is no coalescing: five
/// events produce five reports.
pub struct ReportEmitter<S> {
    state: GamepadState,
    sink: S,
}

impl<S: ReportSink> ReportEmitter<S> {
    /// Create an emitter with a neutral state. Nothing is pushed yet.
    pub fn new(sink: S) -> Self {
        Self {
            state: GamepadState::neutral(),
            sink,
        }
    }

    /// Apply one event and push the resulting report.
    ///
    /// The state change is kept even if the sink refuses the report.
    pub fn apply(&mut self, event: InputEvent) -> Result<(), ReportError> {
        self.state.apply(event);
        self.emit()
    }

    /// Push the current state without changing it.
    pub fn emit(&mut self) -> Result<(), ReportError> {
        let report = GamepadReport::from(&self.state);
        self.sink.push_report(&report.as_bytes())
    }

    /// Return to neutral and push the neutral report.
    pub fn reset(&mut self) -> Result<(), ReportError> {
        self.state = GamepadState::neutral();
        self.emit()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &GamepadState {
        &self.state
    }

    /// Get a reference to the report sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Get a mutable reference to the report sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Decompose the emitter into its state and sink.
    pub fn into_parts(self) -> (GamepadState, S) {
        (self.state, self.sink)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use wheel_proto::Axis;

    #[derive(Default)]
    struct RecordingSink {
        reports: Vec<[u8; GamepadReport::SIZE]>,
        refuse: bool,
    }

    impl ReportSink for RecordingSink {
        fn push_report(&mut self, report: &[u8; GamepadReport::SIZE]) -> Result<(), ReportError> {
            if self.refuse {
                return Err(ReportError::Dropped);
            }
            self.reports.push(*report);
            Ok(())
        }
    }

    #[test]
    fn test_each_apply_pushes_one_report() {
        let mut emitter = ReportEmitter::new(RecordingSink::default());
        emitter.apply(InputEvent::Button { button: 0, pressed: true }).unwrap();
        emitter.apply(InputEvent::Axis { axis: Axis::Z, value: -5 }).unwrap();
        emitter.apply(InputEvent::Button { button: 0, pressed: false }).unwrap();

        assert_eq!(
            emitter.sink().reports,
            [
                [0x01, 0x00, 0, 0, 0],
                [0x01, 0x00, 0, 0, (-5i8) as u8],
                [0x00, 0x00, 0, 0, (-5i8) as u8],
            ]
        );
    }

    #[test]
    fn test_identical_events_not_coalesced() {
        let mut emitter = ReportEmitter::new(RecordingSink::default());
        for _ in 0..3 {
            emitter.apply(InputEvent::Button { button: 9, pressed: true }).unwrap();
        }
        assert_eq!(emitter.sink().reports.len(), 3);
        assert!(emitter.sink().reports.iter().all(|r| *r == [0x00, 0x02, 0, 0, 0]));
    }

    #[test]
    fn test_state_kept_when_sink_refuses() {
        let mut emitter = ReportEmitter::new(RecordingSink {
            refuse: true,
            ..Default::default()
        });
        let result = emitter.apply(InputEvent::Axis { axis: Axis::X, value: 42 });
        assert_eq!(result, Err(ReportError::Dropped));
        assert_eq!(emitter.state().x, 42);
    }

    #[test]
    fn test_reset_pushes_neutral() {
        let mut emitter = ReportEmitter::new(RecordingSink::default());
        emitter.apply(InputEvent::Axis { axis: Axis::Y, value: 10 }).unwrap();
        emitter.reset().unwrap();
        assert_eq!(*emitter.state(), GamepadState::neutral());
        assert_eq!(emitter.sink().reports.last(), Some(&[0u8; GamepadReport::SIZE]));
    }

    #[test]
    fn test_into_parts_returns_state_and_sink() {
        let mut emitter = ReportEmitter::new(RecordingSink::default());
        emitter.apply(InputEvent::Axis { axis: Axis::X, value: -5 }).unwrap();
        emitter.sink_mut().refuse = true;

        let (state, sink) = emitter.into_parts();
        assert_eq!(state.x, -5);
        assert_eq!(sink.reports.len(), 1);
        assert!(sink.refuse);
    }
}
