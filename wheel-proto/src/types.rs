//! Core gamepad types: Buttons, Axis, InputEvent, GamepadState, Channel.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Number of buttons carried by the gamepad report.
pub const BUTTON_COUNT: u8 = 16;

/// Button state represented as a bitfield.
///
/// Bit `n` is button `n` (0-based), matching the HID report where
/// button 1 of the descriptor is bit 0 of the first report byte.
///
/// # Example
///
/// ```
/// use wheel_proto::Buttons;
///
/// let mut buttons = Buttons::NONE;
/// buttons.set_index(3, true);
/// assert!(buttons.is_index_pressed(3));
/// assert_eq!(buttons.raw(), 0b1000);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Bit for the button at `index`, or `None` if the index is past button 15.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < BUTTON_COUNT {
            Some(Self(1 << index))
        } else {
            None
        }
    }

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Check if the button at `index` is pressed. Out-of-range indices are never pressed.
    #[inline]
    #[must_use]
    pub const fn is_index_pressed(self, index: u8) -> bool {
        match Self::from_index(index) {
            Some(button) => self.contains(button),
            None => false,
        }
    }

    /// Set or clear button(s).
    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    /// Set or clear the button at `index`. Out-of-range indices are ignored.
    #[inline]
    pub fn set_index(&mut self, index: u8, pressed: bool) {
        if let Some(button) = Self::from_index(index) {
            self.set(button, pressed);
        }
    }

    /// Get the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// One of the three signed 8-bit gamepad axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// Accelerator pedal.
    X,
    /// Brake pedal.
    Y,
    /// Clutch / throttle pedal.
    Z,
}

impl Axis {
    /// Look up the axis addressed by a pedal unit triplet id.
    ///
    /// `0x01 -> X`, `0x02 -> Y`, `0x03 -> Z`; anything else is unknown.
    #[inline]
    #[must_use]
    pub const fn from_pedal_id(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(Axis::X),
            0x02 => Some(Axis::Y),
            0x03 => Some(Axis::Z),
            _ => None,
        }
    }
}

/// A single decoded input change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub enum InputEvent {
    /// Button `button` (0..=15) pressed or released.
    Button { button: u8, pressed: bool },
    /// Axis overwritten with an already-mapped report value.
    Axis { axis: Axis, value: i8 },
}

/// Logical data path a wireless write arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Steering unit: text `key:value;` frames.
    Steering,
    /// Pedal unit: 3-byte binary triplets in, 2-byte feedback out.
    Pedals,
}

/// Current-value gamepad model: 16 buttons and 3 signed axes.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadState {
    pub buttons: Buttons,
    pub x: i8,
    pub y: i8,
    pub z: i8,
}

impl GamepadState {
    /// Create a neutral state (no buttons pressed, axes centered).
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: Buttons::NONE,
            x: 0,
            y: 0,
            z: 0,
        }
    }

    /// Apply a single input event to this state.
    #[inline]
    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Button { button, pressed } => self.buttons.set_index(button, pressed),
            InputEvent::Axis { axis: Axis::X, value } => self.x = value,
            InputEvent::Axis { axis: Axis::Y, value } => self.y = value,
            InputEvent::Axis { axis: Axis::Z, value } => self.z = value,
        }
    }

    /// Read the current value of an axis.
    #[inline]
    #[must_use]
    pub const fn axis(&self, axis: Axis) -> i8 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons_bitwise_or() {
        let buttons = Buttons(1 << 0) | Buttons(1 << 1);
        assert!(buttons.is_index_pressed(0));
        assert!(buttons.is_index_pressed(1));
        assert!(!buttons.is_index_pressed(2));
    }

    #[test]
    fn test_buttons_set_clear_index() {
        let mut buttons = Buttons::NONE;
        buttons.set_index(15, true);
        assert_eq!(buttons.raw(), 0x8000);
        buttons.set_index(15, false);
        assert!(buttons.is_empty());
    }

    #[test]
    fn test_buttons_out_of_range_ignored() {
        let mut buttons = Buttons::NONE;
        buttons.set_index(16, true);
        assert!(buttons.is_empty());
        assert!(!buttons.is_index_pressed(16));
        assert_eq!(Buttons::from_index(16), None);
    }

    #[test]
    fn test_axis_from_pedal_id() {
        assert_eq!(Axis::from_pedal_id(0x01), Some(Axis::X));
        assert_eq!(Axis::from_pedal_id(0x02), Some(Axis::Y));
        assert_eq!(Axis::from_pedal_id(0x03), Some(Axis::Z));
        assert_eq!(Axis::from_pedal_id(0x00), None);
        assert_eq!(Axis::from_pedal_id(0x04), None);
    }

    #[test]
    fn test_gamepad_state_apply() {
        let mut state = GamepadState::neutral();
        state.apply(InputEvent::Button { button: 4, pressed: true });
        assert!(state.buttons.is_index_pressed(4));

        state.apply(InputEvent::Axis { axis: Axis::Y, value: -90 });
        assert_eq!(state.y, -90);
        assert_eq!(state.axis(Axis::Y), -90);
        assert_eq!(state.x, 0);
    }

    #[test]
    fn test_press_release_restores_buttons() {
        let mut state = GamepadState::neutral();
        state.buttons = Buttons(0b1010_0000);
        let before = state.buttons;
        state.apply(InputEvent::Button { button: 0, pressed: true });
        state.apply(InputEvent::Button { button: 0, pressed: false });
        assert_eq!(state.buttons, before);
    }
}
