//! Wireless wheel hub for the Raspberry Pi Pico W.
//!
//! This crate wires the platform-agnostic [`wheel_core::WheelBridge`] to the
//! CYW43439 Bluetooth radio (GATT peripheral for the steering and pedal
//! units) and to the RP2040 USB device (HID gamepad plus a CDC-ACM console).

#![no_std]

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use wheel_core::{WheelBridge, MAX_PEERS};

// Re-export core types for convenience
pub use wheel_core::{
    BridgeConfig, ConstantIntensity, FeedbackDispatcher, FeedbackSchedule, GamepadReport,
    OverflowPolicy, RandomIntensity,
};

pub mod ble;
pub mod serial;
pub mod usb_output;

pub use ble::{BleLink, HubServer};
pub use serial::configure_usb_serial;
pub use usb_output::{configure_usb_hid, GamepadRequestHandler, ReportQueue, UsbReportSink};

/// The bridge as wired on this board, shared by every task.
pub type HubBridge = WheelBridge<CriticalSectionRawMutex, BleLink, UsbReportSink, MAX_PEERS>;

/// Bridge configuration selected by Cargo features.
#[must_use]
pub fn bridge_config() -> BridgeConfig {
    BridgeConfig {
        overflow: if cfg!(feature = "accept-overflow") {
            OverflowPolicy::AcceptUntracked
        } else {
            OverflowPolicy::Reject
        },
        ..BridgeConfig::default()
    }
}
