//! Counters for everything the bridge drops, rejects or fails to deliver.
//!
//! Decoding and delivery are best-effort: bad input is discarded and
//! processing continues. These counters make that visible without a log
//! reader, and let tests assert on what was dropped.

use portable_atomic::{AtomicU32, Ordering};

/// Lock-free event counters shared by every bridge context.
#[derive(Debug, Default)]
pub struct Diagnostics {
    frames_steering: AtomicU32,
    frames_pedals: AtomicU32,
    tokens_dropped: AtomicU32,
    frames_rejected: AtomicU32,
    unknown_axis_ids: AtomicU32,
    reports_pushed: AtomicU32,
    reports_dropped: AtomicU32,
    connections_accepted: AtomicU32,
    connections_rejected: AtomicU32,
    connections_untracked: AtomicU32,
    disconnects_unknown: AtomicU32,
    notify_sent: AtomicU32,
    notify_failed: AtomicU32,
}

/// Point-in-time copy of [`Diagnostics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiagnosticsSnapshot {
    /// Steering frames received.
    pub frames_steering: u32,
    /// Pedal frames received.
    pub frames_pedals: u32,
    /// Steering tokens dropped (malformed, unknown key, button out of range).
    pub tokens_dropped: u32,
    /// Pedal frames rejected whole (length not a multiple of 3).
    pub frames_rejected: u32,
    /// Pedal triplets skipped for an unknown axis id.
    pub unknown_axis_ids: u32,
    /// HID reports accepted by the sink.
    pub reports_pushed: u32,
    /// HID reports the sink refused.
    pub reports_dropped: u32,
    /// Connections tracked in a slot.
    pub connections_accepted: u32,
    /// Connections refused because every slot was occupied.
    pub connections_rejected: u32,
    /// Connections accepted without a slot.
    pub connections_untracked: u32,
    /// Disconnects for a handle no slot held.
    pub disconnects_unknown: u32,
    /// Outbound notifications enqueued.
    pub notify_sent: u32,
    /// Outbound notifications the transport refused.
    pub notify_failed: u32,
}

macro_rules! counters {
    ($($name:ident => $inc:ident),* $(,)?) => {
        impl Diagnostics {
            $(
                #[inline]
                pub(crate) fn $inc(&self) {
                    self.$name.fetch_add(1, Ordering::Relaxed);
                }
            )*

            /// Read every counter.
            #[must_use]
            pub fn snapshot(&self) -> DiagnosticsSnapshot {
                DiagnosticsSnapshot {
                    $($name: self.$name.load(Ordering::Relaxed),)*
                }
            }

            /// Zero every counter.
            pub fn reset(&self) {
                $(self.$name.store(0, Ordering::Relaxed);)*
            }
        }
    };
}

counters! {
    frames_steering => record_steering_frame,
    frames_pedals => record_pedals_frame,
    tokens_dropped => record_token_dropped,
    frames_rejected => record_frame_rejected,
    unknown_axis_ids => record_unknown_axis,
    reports_pushed => record_report_pushed,
    reports_dropped => record_report_dropped,
    connections_accepted => record_connection_accepted,
    connections_rejected => record_connection_rejected,
    connections_untracked => record_connection_untracked,
    disconnects_unknown => record_disconnect_unknown,
    notify_sent => record_notify_sent,
    notify_failed => record_notify_failed,
}

impl Diagnostics {
    /// Create zeroed counters (usable in `static` items).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames_steering: AtomicU32::new(0),
            frames_pedals: AtomicU32::new(0),
            tokens_dropped: AtomicU32::new(0),
            frames_rejected: AtomicU32::new(0),
            unknown_axis_ids: AtomicU32::new(0),
            reports_pushed: AtomicU32::new(0),
            reports_dropped: AtomicU32::new(0),
            connections_accepted: AtomicU32::new(0),
            connections_rejected: AtomicU32::new(0),
            connections_untracked: AtomicU32::new(0),
            disconnects_unknown: AtomicU32::new(0),
            notify_sent: AtomicU32::new(0),
            notify_failed: AtomicU32::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let diag = Diagnostics::new();
        diag.record_token_dropped();
        diag.record_token_dropped();
        diag.record_notify_failed();

        let snap = diag.snapshot();
        assert_eq!(snap.tokens_dropped, 2);
        assert_eq!(snap.notify_failed, 1);
        assert_eq!(snap.reports_pushed, 0);

        diag.reset();
        assert_eq!(diag.snapshot(), DiagnosticsSnapshot::default());
    }
}
