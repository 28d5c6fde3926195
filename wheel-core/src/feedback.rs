//! Periodic feedback (vibration) dispatch to connected peers.

use embedded_hal_async::delay::DelayNs;
use rand_core::RngCore;
use wheel_proto::{Channel, FeedbackCommand, MAX_INTENSITY, PEDAL_MOTORS};

/// Outcome of sending one payload to every tracked peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BroadcastSummary {
    /// Peers the transport accepted the notification for.
    pub sent: usize,
    /// Peers the transport refused.
    pub failed: usize,
}

impl BroadcastSummary {
    /// Accumulate another summary into this one.
    #[inline]
    pub fn merge(&mut self, other: BroadcastSummary) {
        self.sent += other.sent;
        self.failed += other.failed;
    }
}

/// Fan-out of one payload to every connected peer.
///
/// A failure for one peer must not stop delivery to the others.
pub trait PeerBroadcast {
    fn broadcast(&self, channel: Channel, payload: &[u8]) -> BroadcastSummary;
}

impl<T: PeerBroadcast + ?Sized> PeerBroadcast for &T {
    fn broadcast(&self, channel: Channel, payload: &[u8]) -> BroadcastSummary {
        T::broadcast(self, channel, payload)
    }
}

/// Produces the intensity for the next command to `target_id`.
pub trait IntensitySource {
    fn intensity(&mut self, target_id: u8) -> u8;
}

/// Uniform random intensity in `0..=100` for every target.
pub struct RandomIntensity<R>(pub R);

impl<R: RngCore> IntensitySource for RandomIntensity<R> {
    fn intensity(&mut self, _target_id: u8) -> u8 {
        (self.0.next_u32() % (MAX_INTENSITY as u32 + 1)) as u8
    }
}

/// The same intensity for every target.
#[derive(Debug, Clone, Copy)]
pub struct ConstantIntensity(pub u8);

impl IntensitySource for ConstantIntensity {
    fn intensity(&mut self, _target_id: u8) -> u8 {
        self.0
    }
}

/// Timing and targets of the feedback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackSchedule {
    /// Quiet period before the first cycle.
    pub initial_delay_ms: u32,
    /// Pause after each target's command.
    pub target_spacing_ms: u32,
    /// Pause after each full cycle.
    pub cycle_spacing_ms: u32,
    /// Actuator ids addressed each cycle, in order.
    pub targets: &'static [u8],
}

impl Default for FeedbackSchedule {
    fn default() -> Self {
        Self {
            initial_delay_ms: 10_000,
            target_spacing_ms: 100,
            cycle_spacing_ms: 1_000,
            targets: &PEDAL_MOTORS,
        }
    }
}

/// Sends [`FeedbackCommand`]s to all connected peers on a fixed cadence.
///
/// Runs independently of inbound traffic. Delivery is fire-and-forget:
/// failed notifications are counted, never retried within a cycle.
pub struct FeedbackDispatcher<L, I> {
    link: L,
    intensity: I,
    schedule: FeedbackSchedule,
}

impl<L: PeerBroadcast, I: IntensitySource> FeedbackDispatcher<L, I> {
    pub fn new(link: L, intensity: I, schedule: FeedbackSchedule) -> Self {
        Self {
            link,
            intensity,
            schedule,
        }
    }

    /// Send one command to every connected peer on the pedals channel.
    pub fn broadcast(&self, command: FeedbackCommand) -> BroadcastSummary {
        self.link.broadcast(Channel::Pedals, &command.to_bytes())
    }

    /// One pass over every target, pausing `target_spacing_ms` after each.
    pub async fn run_cycle<D: DelayNs>(&mut self, delay: &mut D) -> BroadcastSummary {
        let mut summary = BroadcastSummary::default();
        for &target in self.schedule.targets {
            let command = FeedbackCommand::new(target, self.intensity.intensity(target));
            let result = self.broadcast(command);
            if result.failed > 0 {
                warn!(
                    "feedback to target {} failed for {} peer(s)",
                    target,
                    result.failed
                );
            }
            summary.merge(result);
            delay.delay_ms(self.schedule.target_spacing_ms).await;
        }
        summary
    }

    /// Run the feedback loop forever.
    ///
    /// Waits `initial_delay_ms`, then runs cycles `cycle_spacing_ms` apart.
    pub async fn run<D: DelayNs>(&mut self, delay: &mut D) -> ! {
        delay.delay_ms(self.schedule.initial_delay_ms).await;
        info!("feedback dispatcher started");
        loop {
            let summary = self.run_cycle(delay).await;
            trace!("feedback cycle: sent {}, failed {}", summary.sent, summary.failed);
            delay.delay_ms(self.schedule.cycle_spacing_ms).await;
        }
    }

    #[inline]
    #[must_use]
    pub fn schedule(&self) -> &FeedbackSchedule {
        &self.schedule
    }

    /// Get a reference to the broadcast link.
    pub fn link(&self) -> &L {
        &self.link
    }
}
