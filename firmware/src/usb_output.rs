//! USB HID gamepad output implementation.

use defmt::{info, warn};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_usb::class::hid::{HidWriter, ReportId, RequestHandler, State};
use embassy_usb::control::OutResponse;
use embassy_usb::Builder;
use portable_atomic::{AtomicBool, Ordering};
use wheel_core::{GamepadReport, ReportError, ReportSink};

/// USB driver type used by every class on this device.
pub type UsbDriver = Driver<'static, USB>;

/// HID writer sized for one [`GamepadReport`].
pub type GamepadWriter = HidWriter<'static, UsbDriver, { GamepadReport::SIZE }>;

/// Reports waiting for the HID IN endpoint.
const REPORT_QUEUE_DEPTH: usize = 16;

/// Queue between the bridge (synchronous) and the HID writer task.
pub type ReportQueue = Channel<CriticalSectionRawMutex, [u8; GamepadReport::SIZE], REPORT_QUEUE_DEPTH>;

/// Gamepad Report Descriptor.
///
/// 16 buttons followed by X, Y and Z as signed 8-bit axes in `[-127, 127]`,
/// matching the 5-byte [`GamepadReport`] layout.
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    0xA1, 0x00, //   Collection (Physical)
    //
    // --- Buttons (16 buttons) ---
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x10, //     Usage Maximum (Button 16)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x10, //     Report Count (16)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    // --- Accelerator, brake, clutch ---
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x32, //     Usage (Z)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x03, //     Report Count (3)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Set once the host has enumerated the HID interface.
static HID_READY: AtomicBool = AtomicBool::new(false);

/// Non-blocking [`ReportSink`] that queues reports for [`hid_writer_task`].
///
/// Reports are refused with [`ReportError::NotReady`] until the host has
/// enumerated the device, and with [`ReportError::Dropped`] when the queue
/// is full.
pub struct UsbReportSink {
    queue: &'static ReportQueue,
}

impl UsbReportSink {
    pub fn new(queue: &'static ReportQueue) -> Self {
        Self { queue }
    }
}

impl ReportSink for UsbReportSink {
    fn push_report(&mut self, report: &[u8; GamepadReport::SIZE]) -> Result<(), ReportError> {
        if !HID_READY.load(Ordering::Acquire) {
            return Err(ReportError::NotReady);
        }
        self.queue.try_send(*report).map_err(|_| ReportError::Dropped)
    }
}

/// Drains the report queue into the HID IN endpoint.
#[embassy_executor::task]
pub async fn hid_writer_task(mut writer: GamepadWriter, queue: &'static ReportQueue) -> ! {
    writer.ready().await;
    HID_READY.store(true, Ordering::Release);
    info!("USB HID ready, forwarding gamepad reports...");

    // Host starts from a neutral gamepad
    if let Err(e) = writer.write(&GamepadReport::neutral().as_bytes()).await {
        warn!("HID write failed: {:?}", e);
    }

    loop {
        let report = queue.receive().await;
        if let Err(e) = writer.write(&report).await {
            warn!("HID write failed: {:?}", e);
        }
    }
}

/// HID request handler (handles SET_REPORT, etc.).
///
/// The gamepad has no output or feature reports.
pub struct GamepadRequestHandler;

impl RequestHandler for GamepadRequestHandler {
    fn get_report(&mut self, _id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    fn set_report(&mut self, _id: ReportId, _data: &[u8]) -> OutResponse {
        OutResponse::Accepted
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, _duration_ms: u32) {}

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        None
    }
}

/// Configure the USB HID class in the USB builder.
///
/// Returns the HID writer for [`hid_writer_task`].
pub fn configure_usb_hid(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
    handler: &'static mut GamepadRequestHandler,
) -> GamepadWriter {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: REPORT_DESCRIPTOR,
        request_handler: Some(handler),
        poll_ms: 10,
        max_packet_size: 16,
        hid_subclass: embassy_usb::class::hid::HidSubclass::No,
        hid_boot_protocol: embassy_usb::class::hid::HidBootProtocol::None,
    };

    HidWriter::new(builder, state, config)
}
