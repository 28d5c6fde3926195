//! WheelBridge: the single owning context between the wireless link and USB.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use wheel_proto::{
    decode_pedals, decode_steering, AxisCalibration, Channel, GamepadState, InputEvent,
};

use crate::diagnostics::Diagnostics;
use crate::emitter::ReportEmitter;
use crate::feedback::{BroadcastSummary, PeerBroadcast};
use crate::slots::{ConnectOutcome, ConnectionSlots, OverflowPolicy, MAX_PEERS};
use crate::transport::{PeerHandle, ReportError, ReportSink, WirelessTransport};

/// Name the steering and pedal units scan for.
pub const DEFAULT_ADVERTISED_NAME: &str = "ESP32-S3-NimBLE";

/// Construction-time configuration of a [`WheelBridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    /// Raw window applied to every pedal axis.
    pub calibration: AxisCalibration,
    /// What to do with a connection when every slot is taken.
    pub overflow: OverflowPolicy,
    /// Advertised identity while a slot is free.
    pub advertised_name: &'static str,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            calibration: AxisCalibration::HALL_SENSOR,
            overflow: OverflowPolicy::Reject,
            advertised_name: DEFAULT_ADVERTISED_NAME,
        }
    }
}

/// Bridges two wireless input peers to one USB gamepad.
///
/// Owns the connection slots, the gamepad state and its report sink, and the
/// outbound side of the wireless transport. The transport drives it by
/// calling [`on_connect`](Self::on_connect),
/// [`on_disconnect`](Self::on_disconnect) and [`on_write`](Self::on_write).
///
/// # Concurrency
///
/// The gamepad state and sink sit behind one blocking mutex `M`. A whole
/// inbound message is decoded and applied inside a single lock acquisition,
/// so two contexts never interleave partial updates; each event still pushes
/// its own report. Slots and diagnostics are lock-free atomics.
pub struct WheelBridge<M: RawMutex, T, S, const N: usize = MAX_PEERS> {
    emitter: Mutex<M, RefCell<ReportEmitter<S>>>,
    slots: ConnectionSlots<N>,
    transport: T,
    calibration: AxisCalibration,
    advertised_name: &'static str,
    diagnostics: Diagnostics,
}

impl<M, T, S, const N: usize> WheelBridge<M, T, S, N>
where
    M: RawMutex,
    T: WirelessTransport,
    S: ReportSink,
{
    /// Create a bridge with all slots free and a neutral gamepad.
    pub fn new(transport: T, sink: S, config: BridgeConfig) -> Self {
        Self {
            emitter: Mutex::new(RefCell::new(ReportEmitter::new(sink))),
            slots: ConnectionSlots::new(config.overflow),
            transport,
            calibration: config.calibration,
            advertised_name: config.advertised_name,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Push the initial neutral report and start advertising.
    pub fn start(&self) {
        self.emitter.lock(|cell| {
            let result = cell.borrow_mut().reset();
            self.record_report(result);
        });
        info!("bridge started, advertising as {}", self.advertised_name);
        self.refresh_discoverability();
    }

    /// A peer connected. Returns what the transport should do with the link.
    ///
    /// On [`ConnectOutcome::Rejected`] the transport must disconnect the peer.
    pub fn on_connect(&self, peer: PeerHandle) -> ConnectOutcome {
        let outcome = self.slots.connect(peer);
        match outcome {
            ConnectOutcome::Tracked { index } => {
                info!("peer {} connected in slot {}", peer.raw(), index);
                self.diagnostics.record_connection_accepted();
            }
            ConnectOutcome::Duplicate { index } => {
                debug!("peer {} already tracked in slot {}", peer.raw(), index);
            }
            ConnectOutcome::Untracked => {
                warn!("peer {} connected with no free slot, not tracked", peer.raw());
                self.diagnostics.record_connection_untracked();
            }
            ConnectOutcome::Rejected => {
                warn!("peer {} rejected, all {} slots occupied", peer.raw(), N);
                self.diagnostics.record_connection_rejected();
            }
        }
        self.refresh_discoverability();
        outcome
    }

    /// A peer disconnected. Frees the slot holding exactly this handle.
    pub fn on_disconnect(&self, peer: PeerHandle) -> Option<usize> {
        let freed = self.slots.disconnect(peer);
        match freed {
            Some(index) => info!("peer {} disconnected, slot {} free", peer.raw(), index),
            None => {
                debug!("disconnect for untracked peer {}", peer.raw());
                self.diagnostics.record_disconnect_unknown();
            }
        }
        self.refresh_discoverability();
        freed
    }

    /// A peer wrote `payload` to `channel`. Returns the number of events applied.
    ///
    /// Malformed input is dropped at the smallest granularity the channel
    /// allows (token for steering, whole frame for pedals), counted, and
    /// logged. Nothing here fails.
    pub fn on_write(&self, channel: Channel, payload: &[u8]) -> usize {
        match channel {
            Channel::Steering => {
                self.diagnostics.record_steering_frame();
                let events = decode_steering(payload).filter_map(|token| match token {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!("steering token dropped: {:?}", e);
                        self.diagnostics.record_token_dropped();
                        None
                    }
                });
                self.apply_all(events)
            }
            Channel::Pedals => {
                self.diagnostics.record_pedals_frame();
                let triplets = match decode_pedals(payload, &self.calibration) {
                    Ok(triplets) => triplets,
                    Err(e) => {
                        warn!("pedals frame rejected: {:?}", e);
                        self.diagnostics.record_frame_rejected();
                        return 0;
                    }
                };
                let events = triplets.filter_map(|triplet| match triplet {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!("pedals triplet skipped: {:?}", e);
                        self.diagnostics.record_unknown_axis();
                        None
                    }
                });
                self.apply_all(events)
            }
        }
    }

    /// Apply an event from a non-wireless context (local buttons, test harness).
    pub fn apply_local(&self, event: InputEvent) {
        self.apply_all(core::iter::once(event));
    }

    /// Return the gamepad to neutral and push the neutral report.
    pub fn reset_state(&self) {
        self.emitter.lock(|cell| {
            let result = cell.borrow_mut().reset();
            self.record_report(result);
        });
    }

    /// Notify every tracked peer with a raw payload on `channel`.
    pub fn forward_raw(&self, channel: Channel, payload: &[u8]) -> BroadcastSummary {
        let summary = self.broadcast(channel, payload);
        debug!(
            "forwarded {} byte(s) on {:?} to {} peer(s)",
            payload.len(),
            channel,
            summary.sent
        );
        summary
    }

    /// Copy of the current gamepad state.
    #[must_use]
    pub fn state(&self) -> GamepadState {
        self.emitter.lock(|cell| *cell.borrow().state())
    }

    /// Run `f` with exclusive access to the report sink.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        self.emitter.lock(|cell| f(cell.borrow_mut().sink_mut()))
    }

    #[inline]
    #[must_use]
    pub fn slots(&self) -> &ConnectionSlots<N> {
        &self.slots
    }

    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Get a reference to the wireless transport.
    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[inline]
    #[must_use]
    pub fn calibration(&self) -> &AxisCalibration {
        &self.calibration
    }

    /// Apply every event under one lock acquisition, one report per event.
    fn apply_all(&self, events: impl Iterator<Item = InputEvent>) -> usize {
        self.emitter.lock(|cell| {
            let mut emitter = cell.borrow_mut();
            let mut applied = 0;
            for event in events {
                trace!("applying {:?}", event);
                let result = emitter.apply(event);
                self.record_report(result);
                applied += 1;
            }
            applied
        })
    }

    fn record_report(&self, result: Result<(), ReportError>) {
        match result {
            Ok(()) => self.diagnostics.record_report_pushed(),
            Err(ReportError::NotReady) => {
                debug!("HID report dropped, host not ready");
                self.diagnostics.record_report_dropped();
            }
            Err(e) => {
                warn!("HID report dropped: {:?}", e);
                self.diagnostics.record_report_dropped();
            }
        }
    }

    /// Advertise while any slot is free, stop once all are occupied.
    fn refresh_discoverability(&self) {
        if self.slots.has_free_slot() {
            self.transport.set_discoverable(Some(self.advertised_name));
        } else {
            self.transport.set_discoverable(None);
        }
    }
}

impl<M, T, S, const N: usize> PeerBroadcast for WheelBridge<M, T, S, N>
where
    M: RawMutex,
    T: WirelessTransport,
    S: ReportSink,
{
    fn broadcast(&self, channel: Channel, payload: &[u8]) -> BroadcastSummary {
        let mut summary = BroadcastSummary::default();
        for peer in self.slots.peers() {
            match self.transport.notify(peer, channel, payload) {
                Ok(()) => {
                    summary.sent += 1;
                    self.diagnostics.record_notify_sent();
                }
                Err(e) => {
                    warn!("notify to peer {} failed: {:?}", peer.raw(), e);
                    summary.failed += 1;
                    self.diagnostics.record_notify_failed();
                }
            }
        }
        summary
    }
}
