//! Outbound feedback (vibration) command encoding.

/// Highest intensity a pedal actuator accepts.
pub const MAX_INTENSITY: u8 = 100;

/// Actuator targets on the reference pedal unit (one motor per pedal).
pub const PEDAL_MOTORS: [u8; 3] = [0x01, 0x02, 0x03];

/// Instruction for a peer to actuate `target_id` at `intensity` percent.
///
/// Sent on the pedals channel as the two bytes `[target_id, intensity]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackCommand {
    target_id: u8,
    intensity: u8,
}

impl FeedbackCommand {
    /// Wire size of an encoded command.
    pub const SIZE: usize = 2;

    /// Build a command, clamping `intensity` to `0..=100`.
    #[inline]
    #[must_use]
    pub const fn new(target_id: u8, intensity: u8) -> Self {
        let intensity = if intensity > MAX_INTENSITY {
            MAX_INTENSITY
        } else {
            intensity
        };
        Self {
            target_id,
            intensity,
        }
    }

    #[inline]
    #[must_use]
    pub const fn target_id(&self) -> u8 {
        self.target_id
    }

    #[inline]
    #[must_use]
    pub const fn intensity(&self) -> u8 {
        self.intensity
    }

    /// Encode as `[target_id, intensity]`.
    #[inline]
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.target_id, self.intensity]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(FeedbackCommand::new(0x02, 55).to_bytes(), [0x02, 55]);
    }

    #[test]
    fn test_intensity_clamped() {
        let cmd = FeedbackCommand::new(0x01, 250);
        assert_eq!(cmd.intensity(), MAX_INTENSITY);
        assert_eq!(cmd.to_bytes(), [0x01, 100]);
    }
}
