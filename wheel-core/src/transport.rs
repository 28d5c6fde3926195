//! Capability traits the bridge is wired to: wireless link and USB report sink.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use wheel_proto::Channel;

/// Opaque connection handle assigned by the wireless transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerHandle(pub u16);

impl PeerHandle {
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// Error type for outbound wireless notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitError {
    /// The peer is no longer connected.
    NotConnected,
    /// The transport's outbound queue is full.
    QueueFull,
    /// The link layer refused the notification.
    Link,
}

/// Error type for USB report pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    /// Report dropped (host not polling fast enough, queue full).
    Dropped,
    /// Device not ready (e.g., USB not enumerated).
    NotReady,
}

/// Outbound side of the wireless link.
///
/// Inbound traffic (connect, disconnect, characteristic writes) is delivered
/// by the transport calling into [`WheelBridge`](crate::WheelBridge).
///
/// Both methods enqueue and return: they must not wait for the radio.
pub trait WirelessTransport {
    /// Send `payload` as a notification on `channel` to one peer.
    fn notify(&self, peer: PeerHandle, channel: Channel, payload: &[u8]) -> Result<(), TransmitError>;

    /// Advertise under `name` when `Some`, stop advertising when `None`.
    fn set_discoverable(&self, name: Option<&'static str>);
}

/// Fire-and-forget sink for HID input reports.
pub trait ReportSink {
    /// Push one 5-byte report toward the USB host without blocking.
    fn push_report(&mut self, report: &[u8; wheel_proto::GamepadReport::SIZE]) -> Result<(), ReportError>;
}

impl<T: WirelessTransport + ?Sized> WirelessTransport for &T {
    fn notify(&self, peer: PeerHandle, channel: Channel, payload: &[u8]) -> Result<(), TransmitError> {
        T::notify(self, peer, channel, payload)
    }

    fn set_discoverable(&self, name: Option<&'static str>) {
        T::set_discoverable(self, name)
    }
}

/// Wait until `signal` carries a discoverability different from `current`.
///
/// Repeated signals of the value already in effect are consumed and ignored,
/// so an advertiser racing against this future is only interrupted by a
/// real change of name or a request to stop.
pub async fn discoverability_changed<M: RawMutex>(
    signal: &Signal<M, Option<&'static str>>,
    current: Option<&'static str>,
) -> Option<&'static str> {
    loop {
        let update = signal.wait().await;
        if update != current {
            return update;
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::future::Future;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    fn noop_waker() -> Waker {
        fn noop_raw_waker() -> RawWaker {
            fn noop(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                noop_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(core::ptr::null(), &VTABLE)
        }
        unsafe { Waker::from_raw(noop_raw_waker()) }
    }

    #[test]
    fn test_same_name_does_not_end_wait() {
        let signal = Signal::<NoopRawMutex, Option<&'static str>>::new();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut wait = core::pin::pin!(discoverability_changed(&signal, Some("wheel")));

        assert!(wait.as_mut().poll(&mut cx).is_pending());
        signal.signal(Some("wheel"));
        assert!(wait.as_mut().poll(&mut cx).is_pending());
        signal.signal(Some("wheel"));
        assert!(wait.as_mut().poll(&mut cx).is_pending());

        signal.signal(None);
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Ready(None));
    }

    #[test]
    fn test_name_change_ends_wait() {
        let signal = Signal::<NoopRawMutex, Option<&'static str>>::new();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        signal.signal(Some("other"));
        let mut wait = core::pin::pin!(discoverability_changed(&signal, Some("wheel")));
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Ready(Some("other")));
    }

    #[test]
    fn test_resume_after_stop_ends_wait() {
        let signal = Signal::<NoopRawMutex, Option<&'static str>>::new();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut wait = core::pin::pin!(discoverability_changed(&signal, None));

        signal.signal(None);
        assert!(wait.as_mut().poll(&mut cx).is_pending());
        signal.signal(Some("wheel"));
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Ready(Some("wheel")));
        assert!(!signal.signaled());
    }
}
