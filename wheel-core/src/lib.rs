//! Platform-agnostic link management and protocol bridge for the wireless wheel hub.
//!
//! This crate sits between a wireless transport and a USB HID sink:
//!
//! - [`ConnectionSlots`]: fixed table of peer handles with lock-free claim/release
//! - [`WheelBridge`]: owning context that decodes inbound writes, tracks the
//!   gamepad state and pushes one HID report per applied event
//! - [`FeedbackDispatcher`]: periodic `[target_id, intensity]` notifications to
//!   every connected peer
//! - [`Diagnostics`]: counters for dropped input and failed delivery
//!
//! The radio and USB stacks are reached only through the [`WirelessTransport`]
//! and [`ReportSink`] traits, so everything here runs on the host under test.
//!
//! # Example
//!
//! ```
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use wheel_core::{
//!     BridgeConfig, Channel, GamepadReport, PeerHandle, ReportError, ReportSink, TransmitError,
//!     WheelBridge, WirelessTransport,
//! };
//!
//! struct Radio;
//! impl WirelessTransport for Radio {
//!     fn notify(&self, _: PeerHandle, _: Channel, _: &[u8]) -> Result<(), TransmitError> {
//!         Ok(())
//!     }
//!     fn set_discoverable(&self, _: Option<&'static str>) {}
//! }
//!
//! #[derive(Default)]
//! struct Usb(Option<[u8; GamepadReport::SIZE]>);
//! impl ReportSink for Usb {
//!     fn push_report(&mut self, report: &[u8; GamepadReport::SIZE]) -> Result<(), ReportError> {
//!         self.0 = Some(*report);
//!         Ok(())
//!     }
//! }
//!
//! let bridge: WheelBridge<NoopRawMutex, _, _> =
//!     WheelBridge::new(Radio, Usb::default(), BridgeConfig::default());
//! bridge.on_connect(PeerHandle(1));
//! bridge.on_write(Channel::Steering, b"b0:1");
//! assert_eq!(bridge.with_sink(|usb| usb.0), Some([0x01, 0x00, 0, 0, 0]));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through `defmt` and derive `defmt::Format` (embedded)
//! - **`log`**: Log through the `log` facade (host tools)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod bridge;
pub mod diagnostics;
pub mod emitter;
pub mod feedback;
pub mod slots;
pub mod transport;

pub use bridge::{BridgeConfig, WheelBridge, DEFAULT_ADVERTISED_NAME};
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot};
pub use emitter::ReportEmitter;
pub use feedback::{
    BroadcastSummary, ConstantIntensity, FeedbackDispatcher, FeedbackSchedule, IntensitySource,
    PeerBroadcast, RandomIntensity,
};
pub use slots::{ConnectOutcome, ConnectionSlots, OverflowPolicy, MAX_PEERS};
pub use transport::{
    discoverability_changed, PeerHandle, ReportError, ReportSink, TransmitError, WirelessTransport,
};

// Re-export the protocol crate so downstream users need only one dependency
pub use wheel_proto;
pub use wheel_proto::{
    AxisCalibration, Axis, Buttons, Channel, FeedbackCommand, GamepadReport, GamepadState,
    InputEvent,
};
