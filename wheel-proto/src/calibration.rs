//! Raw sensor range to signed 8-bit axis mapping.
//!
//! Pedal units report hall-sensor readings as unsigned 16-bit values. The
//! usable travel of a sensor covers only part of that range, so each axis is
//! mapped through a calibration window onto `[-127, 127]`.

/// Lowest value an axis can be mapped to.
pub const AXIS_MIN: i8 = -127;

/// Highest value an axis can be mapped to.
pub const AXIS_MAX: i8 = 127;

/// Width of the report domain (`AXIS_MAX - AXIS_MIN`).
const AXIS_SPAN: i64 = 254;

/// Default hall-sensor window used by the pedal unit.
pub const HALL_RAW_MIN: i32 = 1860;

/// Default hall-sensor window used by the pedal unit.
pub const HALL_RAW_MAX: i32 = 3000;

/// Error returned when building an invalid calibration window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// `raw_max` does not exceed `raw_min`.
    EmptyRange { raw_min: i32, raw_max: i32 },
}

/// Validated `[raw_min, raw_max]` window for one axis.
///
/// Construction fails fast when the window is empty, so [`AxisCalibration::map`]
/// itself can never fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisCalibration {
    raw_min: i32,
    raw_max: i32,
}

impl AxisCalibration {
    /// Hall-sensor window `[1860, 3000]` of the reference pedal unit.
    pub const HALL_SENSOR: Self = Self {
        raw_min: HALL_RAW_MIN,
        raw_max: HALL_RAW_MAX,
    };

    /// Build a calibration window, rejecting `raw_max <= raw_min`.
    pub const fn new(raw_min: i32, raw_max: i32) -> Result<Self, CalibrationError> {
        if raw_max > raw_min {
            Ok(Self { raw_min, raw_max })
        } else {
            Err(CalibrationError::EmptyRange { raw_min, raw_max })
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw_min(&self) -> i32 {
        self.raw_min
    }

    #[inline]
    #[must_use]
    pub const fn raw_max(&self) -> i32 {
        self.raw_max
    }

    /// Map a raw reading onto `[-127, 127]`.
    ///
    /// The reading is clamped into the window first, then transformed with
    /// `floor((raw - min) * 254 / (max - min)) - 127`.
    ///
    /// # Example
    ///
    /// ```
    /// use wheel_proto::AxisCalibration;
    ///
    /// let cal = AxisCalibration::new(1860, 3000).unwrap();
    /// assert_eq!(cal.map(1860), -127);
    /// assert_eq!(cal.map(3000), 127);
    /// assert_eq!(cal.map(0), -127);
    /// assert_eq!(cal.map(65535), 127);
    /// ```
    #[inline]
    #[must_use]
    pub const fn map(&self, raw: i32) -> i8 {
        let clamped = if raw < self.raw_min {
            self.raw_min
        } else if raw > self.raw_max {
            self.raw_max
        } else {
            raw
        };

        // i64 keeps (raw - min) * 254 exact for any i32 window.
        let offset = clamped as i64 - self.raw_min as i64;
        let width = self.raw_max as i64 - self.raw_min as i64;
        (offset * AXIS_SPAN / width + AXIS_MIN as i64) as i8
    }
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self::HALL_SENSOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_bounds() {
        let cal = AxisCalibration::HALL_SENSOR;
        assert_eq!(cal.map(HALL_RAW_MIN), AXIS_MIN);
        assert_eq!(cal.map(HALL_RAW_MAX), AXIS_MAX);
    }

    #[test]
    fn test_map_clamps_below_and_above() {
        let cal = AxisCalibration::HALL_SENSOR;
        assert_eq!(cal.map(0), cal.map(HALL_RAW_MIN));
        assert_eq!(cal.map(-50_000), cal.map(HALL_RAW_MIN));
        assert_eq!(cal.map(3001), cal.map(HALL_RAW_MAX));
        assert_eq!(cal.map(i32::MAX), cal.map(HALL_RAW_MAX));
    }

    #[test]
    fn test_map_midpoint() {
        // (2430 - 1860) * 254 / 1140 = 127 -> 0
        let cal = AxisCalibration::HALL_SENSOR;
        assert_eq!(cal.map(2430), 0);
    }

    #[test]
    fn test_map_floor_division() {
        // (1861 - 1860) * 254 / 1140 = 0.22 -> floor 0 -> -127
        let cal = AxisCalibration::HALL_SENSOR;
        assert_eq!(cal.map(1861), -127);
        // (1865 - 1860) * 254 / 1140 = 1.11 -> 1 -> -126
        assert_eq!(cal.map(1865), -126);
    }

    #[test]
    fn test_map_monotonic() {
        let cal = AxisCalibration::HALL_SENSOR;
        let mut previous = cal.map(HALL_RAW_MIN);
        for raw in HALL_RAW_MIN..=HALL_RAW_MAX {
            let mapped = cal.map(raw);
            assert!(mapped >= previous, "map({}) decreased", raw);
            previous = mapped;
        }
    }

    #[test]
    fn test_map_wide_window_no_overflow() {
        let cal = AxisCalibration::new(i32::MIN, i32::MAX).unwrap();
        assert_eq!(cal.map(i32::MIN), -127);
        assert_eq!(cal.map(i32::MAX), 127);
    }

    #[test]
    fn test_empty_range_rejected() {
        assert_eq!(
            AxisCalibration::new(3000, 3000),
            Err(CalibrationError::EmptyRange {
                raw_min: 3000,
                raw_max: 3000
            })
        );
        assert!(AxisCalibration::new(3000, 1860).is_err());
    }

    #[test]
    fn test_single_step_window() {
        let cal = AxisCalibration::new(0, 1).unwrap();
        assert_eq!(cal.map(0), -127);
        assert_eq!(cal.map(1), 127);
    }
}
