//! CDC-ACM serial console.
//!
//! Every packet received from the host is echoed back as
//! `Received: <text>\r\n` and forwarded verbatim as a pedals notification to
//! every connected peer, for exercising the actuators by hand.

use defmt::{debug, info};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::Builder;
use wheel_core::Channel;

use crate::usb_output::UsbDriver;
use crate::HubBridge;

/// Full-speed bulk packet size.
pub const SERIAL_PACKET_LEN: u16 = 64;

const ECHO_PREFIX: &[u8] = b"Received: ";
const ECHO_SUFFIX: &[u8] = b"\r\n";

pub type SerialClass = CdcAcmClass<'static, UsbDriver>;

/// Configure the CDC-ACM class in the USB builder.
pub fn configure_usb_serial(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
) -> SerialClass {
    CdcAcmClass::new(builder, state, SERIAL_PACKET_LEN)
}

#[embassy_executor::task]
pub async fn serial_task(mut class: SerialClass, bridge: &'static HubBridge) -> ! {
    loop {
        class.wait_connection().await;
        info!("serial console connected");
        if let Err(e) = echo_and_forward(&mut class, bridge).await {
            debug!("serial console stopped: {:?}", e);
        }
        info!("serial console disconnected");
    }
}

async fn echo_and_forward(class: &mut SerialClass, bridge: &HubBridge) -> Result<(), EndpointError> {
    let mut buf = [0u8; SERIAL_PACKET_LEN as usize];
    loop {
        let n = class.read_packet(&mut buf).await?;
        if n == 0 {
            continue;
        }
        let data = &buf[..n];
        info!("serial: {=[u8]:a}", data);

        class.write_packet(ECHO_PREFIX).await?;
        class.write_packet(data).await?;
        class.write_packet(ECHO_SUFFIX).await?;

        let summary = bridge.forward_raw(Channel::Pedals, data);
        debug!("serial bytes sent to {} peer(s), {} failed", summary.sent, summary.failed);
    }
}
