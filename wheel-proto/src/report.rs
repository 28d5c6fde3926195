//! Fixed 5-byte HID input report.

use crate::types::GamepadState;

/// HID gamepad input report: `[buttons_lo, buttons_hi, x, y, z]`.
///
/// Matches the report descriptor exposed by the USB interface
/// (16 one-bit buttons followed by three signed 8-bit axes).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct GamepadReport {
    /// Button bitfield (16 buttons)
    pub buttons: u16,
    /// Accelerator axis (-127 to 127)
    pub x: i8,
    /// Brake axis (-127 to 127)
    pub y: i8,
    /// Clutch axis (-127 to 127)
    pub z: i8,
}

impl GamepadReport {
    /// Size of the report in bytes.
    pub const SIZE: usize = 5;

    /// Convert the report to its wire bytes.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let [lo, hi] = self.buttons.to_le_bytes();
        [lo, hi, self.x as u8, self.y as u8, self.z as u8]
    }

    /// Neutral/zero report.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: 0,
            x: 0,
            y: 0,
            z: 0,
        }
    }
}

impl From<&GamepadState> for GamepadReport {
    fn from(state: &GamepadState) -> Self {
        Self {
            buttons: state.buttons.raw(),
            x: state.x,
            y: state.y,
            z: state.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Buttons;

    #[test]
    fn test_report_layout() {
        let state = GamepadState {
            buttons: Buttons(0x8001),
            x: -127,
            y: 0,
            z: 127,
        };
        let bytes = GamepadReport::from(&state).as_bytes();
        assert_eq!(bytes, [0x01, 0x80, 0x81, 0x00, 0x7F]);
    }

    #[test]
    fn test_neutral_report_is_zeroed() {
        assert_eq!(GamepadReport::neutral().as_bytes(), [0u8; GamepadReport::SIZE]);
        assert_eq!(
            GamepadReport::from(&GamepadState::neutral()),
            GamepadReport::neutral()
        );
    }
}
