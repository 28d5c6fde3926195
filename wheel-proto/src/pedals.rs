//! Pedal unit binary protocol.
//!
//! A pedal frame is a sequence of 3-byte triplets:
//!
//! ```text
//! [id, raw_hi, raw_lo] [id, raw_hi, raw_lo] ...
//! ```
//!
//! - `id` - axis selector (`0x01` X, `0x02` Y, `0x03` Z)
//! - `raw` - big-endian u16 sensor reading, mapped through an
//!   [`AxisCalibration`] onto the report domain
//!
//! A frame whose length is not a multiple of 3 is rejected as a whole.

use core::slice::ChunksExact;

use crate::calibration::AxisCalibration;
use crate::types::{Axis, InputEvent};

/// Size of one pedal triplet.
pub const TRIPLET_LEN: usize = 3;

/// Pedal frame decode errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PedalsError {
    /// Frame length is not a multiple of 3; nothing was decoded.
    Misaligned { len: usize },
    /// Triplet addressed an axis id outside the fixed table; skipped.
    UnknownAxis { id: u8 },
}

/// One raw pedal triplet before calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PedalSample {
    pub id: u8,
    pub raw: u16,
}

impl PedalSample {
    #[inline]
    fn from_triplet(triplet: &[u8]) -> Self {
        Self {
            id: triplet[0],
            raw: u16::from_be_bytes([triplet[1], triplet[2]]),
        }
    }
}

/// Validate a pedal frame and return an iterator over its triplets.
///
/// Each item is either the mapped [`InputEvent::Axis`] or
/// [`PedalsError::UnknownAxis`] for a triplet that should be skipped.
///
/// # Example
///
/// ```
/// use wheel_proto::{decode_pedals, Axis, AxisCalibration, InputEvent, PedalsError};
///
/// let cal = AxisCalibration::HALL_SENSOR;
/// let frame = [0x01, 0x07, 0x44, 0x02, 0x0B, 0xB8];
/// let events: Vec<_> = decode_pedals(&frame, &cal).unwrap().collect();
/// assert_eq!(events, [
///     Ok(InputEvent::Axis { axis: Axis::X, value: -127 }),
///     Ok(InputEvent::Axis { axis: Axis::Y, value: 127 }),
/// ]);
///
/// assert_eq!(
///     decode_pedals(&[0x01, 0x07, 0x44, 0x02], &cal).err(),
///     Some(PedalsError::Misaligned { len: 4 })
/// );
/// ```
pub fn decode_pedals<'a>(
    frame: &'a [u8],
    calibration: &AxisCalibration,
) -> Result<PedalTriplets<'a>, PedalsError> {
    if frame.len() % TRIPLET_LEN != 0 {
        return Err(PedalsError::Misaligned { len: frame.len() });
    }

    Ok(PedalTriplets {
        chunks: frame.chunks_exact(TRIPLET_LEN),
        calibration: *calibration,
    })
}

/// Iterator returned by [`decode_pedals`].
#[derive(Debug, Clone)]
pub struct PedalTriplets<'a> {
    chunks: ChunksExact<'a, u8>,
    calibration: AxisCalibration,
}

impl Iterator for PedalTriplets<'_> {
    type Item = Result<InputEvent, PedalsError>;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = PedalSample::from_triplet(self.chunks.next()?);
        Some(match Axis::from_pedal_id(sample.id) {
            Some(axis) => Ok(InputEvent::Axis {
                axis,
                value: self.calibration.map(sample.raw as i32),
            }),
            None => Err(PedalsError::UnknownAxis { id: sample.id }),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for PedalTriplets<'_> {}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    fn collect(frame: &[u8]) -> Result<Vec<Result<InputEvent, PedalsError>>, PedalsError> {
        decode_pedals(frame, &AxisCalibration::HALL_SENSOR).map(|it| it.collect())
    }

    #[test]
    fn test_two_axes_at_calibration_bounds() {
        let events = collect(&[0x01, 0x07, 0x44, 0x02, 0x0B, 0xB8]).unwrap();
        assert_eq!(
            events,
            [
                Ok(InputEvent::Axis { axis: Axis::X, value: -127 }),
                Ok(InputEvent::Axis { axis: Axis::Y, value: 127 }),
            ]
        );
    }

    #[test]
    fn test_raw_outside_window_is_clamped() {
        // 0x0000 below, 0xFFFF above the [1860, 3000] window
        let events = collect(&[0x03, 0x00, 0x00, 0x03, 0xFF, 0xFF]).unwrap();
        assert_eq!(
            events,
            [
                Ok(InputEvent::Axis { axis: Axis::Z, value: -127 }),
                Ok(InputEvent::Axis { axis: Axis::Z, value: 127 }),
            ]
        );
    }

    #[test]
    fn test_big_endian_raw() {
        // 0x097E = 2430 -> centre
        let events = collect(&[0x01, 0x09, 0x7E]).unwrap();
        assert_eq!(events, [Ok(InputEvent::Axis { axis: Axis::X, value: 0 })]);
    }

    #[test]
    fn test_misaligned_frame_rejected() {
        assert_eq!(collect(&[0x01, 0x07, 0x44, 0x02]), Err(PedalsError::Misaligned { len: 4 }));
        assert_eq!(collect(&[0x01]), Err(PedalsError::Misaligned { len: 1 }));
    }

    #[test]
    fn test_unknown_id_skipped_not_fatal() {
        let events = collect(&[0x09, 0x07, 0x44, 0x01, 0x0B, 0xB8]).unwrap();
        assert_eq!(
            events,
            [
                Err(PedalsError::UnknownAxis { id: 0x09 }),
                Ok(InputEvent::Axis { axis: Axis::X, value: 127 }),
            ]
        );
    }

    #[test]
    fn test_empty_frame_yields_nothing() {
        assert!(collect(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_custom_calibration() {
        let cal = AxisCalibration::new(0, 254).unwrap();
        let mut triplets = decode_pedals(&[0x02, 0x00, 0x7F], &cal).unwrap();
        assert_eq!(triplets.len(), 1);
        assert_eq!(
            triplets.next(),
            Some(Ok(InputEvent::Axis { axis: Axis::Y, value: 0 }))
        );
    }
}
