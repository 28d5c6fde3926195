//! Wire formats and gamepad types for the wireless wheel hub.
//!
//! The hub receives input from two wireless peers and exposes it to the host
//! as a single USB gamepad. This crate holds everything that is pure data:
//!
//! - **Types**: [`Buttons`], [`Axis`], [`InputEvent`], [`GamepadState`], [`Channel`]
//! - **Calibration**: [`AxisCalibration`] maps raw sensor readings onto `[-127, 127]`
//! - **Steering protocol**: [`decode_steering`] for `b3:1;b4:0` text frames
//! - **Pedals protocol**: [`decode_pedals`] for 3-byte `[id, hi, lo]` triplets
//! - **Feedback**: [`FeedbackCommand`] encodes `[target_id, intensity]` notifications
//! - **Report**: [`GamepadReport`] is the 5-byte `[buttons_lo, buttons_hi, x, y, z]` HID report
//!
//! # Example
//!
//! ```
//! use wheel_proto::{decode_steering, GamepadReport, GamepadState};
//!
//! let mut state = GamepadState::neutral();
//! for event in decode_steering(b"b0:1;b9:1").flatten() {
//!     state.apply(event);
//! }
//! assert_eq!(GamepadReport::from(&state).as_bytes(), [0x01, 0x02, 0, 0, 0]);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod calibration;
pub mod feedback;
pub mod pedals;
pub mod report;
pub mod steering;
pub mod types;

// Re-export types at crate root for convenience
pub use calibration::{AxisCalibration, CalibrationError, AXIS_MAX, AXIS_MIN};
pub use feedback::{FeedbackCommand, MAX_INTENSITY, PEDAL_MOTORS};
pub use pedals::{decode_pedals, PedalSample, PedalTriplets, PedalsError, TRIPLET_LEN};
pub use report::GamepadReport;
pub use steering::{decode_steering, SteeringTokens, TokenError, STEERING_BUFFER_LEN};
pub use types::{Axis, Buttons, Channel, GamepadState, InputEvent, BUTTON_COUNT};
