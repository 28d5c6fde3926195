#![no_std]
#![no_main]

use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::{info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIO0, USB};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::usb::Driver;
use embassy_time::Delay;
use embassy_usb::class::cdc_acm::State as CdcState;
use embassy_usb::class::hid::State as HidState;
use embassy_usb::{Builder, Config as UsbConfig};
use static_cell::StaticCell;
use trouble_host::prelude::*;
use wheel_hub::ble::{self, BleController, HubServer, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX};
use wheel_hub::usb_output::{self, UsbDriver};
use wheel_hub::{
    bridge_config, configure_usb_hid, configure_usb_serial, serial, BleLink, FeedbackDispatcher,
    FeedbackSchedule, GamepadRequestHandler, HubBridge, RandomIntensity, ReportQueue,
    UsbReportSink,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

// CYW43439 blobs are flashed separately from the application:
//   probe-rs download 43439A0.bin --binary-format bin --chip RP2040 --base-address 0x10100000
//   probe-rs download 43439A0_btfw.bin --binary-format bin --chip RP2040 --base-address 0x10140000
//   probe-rs download 43439A0_clm.bin --binary-format bin --chip RP2040 --base-address 0x10180000
const CYW43_FW_ADDR: usize = 0x1010_0000;
const CYW43_FW_LEN: usize = 230_321;
const CYW43_BTFW_ADDR: usize = 0x1014_0000;
const CYW43_BTFW_LEN: usize = 6_164;
const CYW43_CLM_ADDR: usize = 0x1018_0000;
const CYW43_CLM_LEN: usize = 4_752;

/// USB identity (pid.codes test VID/PID).
const USB_VID: u16 = 0x1209;
const USB_PID: u16 = 0x0001;
const USB_MANUFACTURER: &str = "Polilantes";
const USB_PRODUCT: &str = "Hub Polilante";
const USB_SERIAL: &str = "123456";

/// Radio state.
static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();

/// BLE host resources and GATT server.
static HOST_RESOURCES: StaticCell<
    HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX>,
> = StaticCell::new();
static STACK: StaticCell<Stack<'static, BleController, DefaultPacketPool>> = StaticCell::new();
static SERVER: StaticCell<HubServer<'static>> = StaticCell::new();

/// Bridge and the report queue feeding the HID endpoint.
static REPORT_QUEUE: StaticCell<ReportQueue> = StaticCell::new();
static BRIDGE: StaticCell<HubBridge> = StaticCell::new();

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// HID and CDC class state.
static HID_STATE: StaticCell<HidState> = StaticCell::new();
static HID_HANDLER: StaticCell<GamepadRequestHandler> = StaticCell::new();
static CDC_STATE: StaticCell<CdcState> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Wheel hub starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Radio Setup ---
    // SAFETY: the blobs live in flash at fixed addresses outside the
    // application image and are never written at runtime.
    let (fw, btfw, clm) = unsafe {
        (
            core::slice::from_raw_parts(CYW43_FW_ADDR as *const u8, CYW43_FW_LEN),
            core::slice::from_raw_parts(CYW43_BTFW_ADDR as *const u8, CYW43_BTFW_LEN),
            core::slice::from_raw_parts(CYW43_CLM_ADDR as *const u8, CYW43_CLM_LEN),
        )
    };

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24, // DIO
        p.PIN_29, // CLK
        p.DMA_CH0,
    );

    let cyw43_state = CYW43_STATE.init(cyw43::State::new());
    let (_net_device, bt_device, mut control, runner) =
        cyw43::new_with_bluetooth(cyw43_state, pwr, spi, fw, btfw).await;
    spawner.spawn(cyw43_task(runner).unwrap());
    control.init(clm).await;

    // --- BLE Host Setup ---
    let controller: BleController = BleController::new(bt_device);
    let resources = HOST_RESOURCES.init(HostResources::new());
    let address = Address::random([0xC0, 0x57, 0x1E, 0x11, 0x4B, 0xE1]);
    let stack = STACK.init(trouble_host::new(controller, resources).set_random_address(address));
    let Host {
        peripheral, runner, ..
    } = stack.build();

    let config = bridge_config();
    let server = SERVER.init(unwrap!(HubServer::new_with_config(GapConfig::Peripheral(
        PeripheralConfig {
            name: config.advertised_name,
            appearance: &appearance::human_interface_device::GAMEPAD,
        }
    ))));

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some(USB_MANUFACTURER);
    usb_config.product = Some(USB_PRODUCT);
    usb_config.serial_number = Some(USB_SERIAL);
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;
    // HID + CDC composite device
    usb_config.composite_with_iads = true;
    usb_config.device_class = 0xEF;
    usb_config.device_sub_class = 0x02;
    usb_config.device_protocol = 0x01;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );

    // Configure CDC (console) and HID (gamepad) classes
    let serial_class = configure_usb_serial(&mut builder, CDC_STATE.init(CdcState::new()));
    let hid_writer = configure_usb_hid(
        &mut builder,
        HID_STATE.init(HidState::new()),
        HID_HANDLER.init(GamepadRequestHandler),
    );

    // Build the USB device
    let usb_device = builder.build();

    // --- Bridge ---
    let report_queue = REPORT_QUEUE.init(ReportQueue::new());
    let bridge = BRIDGE.init(HubBridge::new(
        BleLink,
        UsbReportSink::new(report_queue),
        config,
    ));

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(usb_output::hid_writer_task(hid_writer, report_queue).unwrap());
    spawner.spawn(serial::serial_task(serial_class, bridge).unwrap());
    spawner.spawn(ble::ble_runner_task(runner).unwrap());
    spawner.spawn(ble::advertise_task(peripheral, server, bridge, spawner).unwrap());
    spawner.spawn(feedback_task(bridge).unwrap());

    bridge.start();
    info!("Wheel hub initialized, waiting for peers...");
}

/// CYW43 driver task - runs the radio.
#[embassy_executor::task]
async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, UsbDriver>) {
    device.run().await;
}

/// Feedback task - sends vibration commands to every connected peer.
#[embassy_executor::task]
async fn feedback_task(bridge: &'static HubBridge) -> ! {
    let mut dispatcher =
        FeedbackDispatcher::new(bridge, RandomIntensity(RoscRng), FeedbackSchedule::default());
    dispatcher.run(&mut Delay).await
}
