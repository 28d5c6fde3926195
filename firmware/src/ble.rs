//! Bluetooth LE peripheral: wheel GATT service, advertising and connection tasks.
//!
//! Inbound events (connect, disconnect, characteristic writes) are delivered
//! to the [`HubBridge`]. Outbound notifications and advertising changes go the
//! other way through [`BleLink`], which only enqueues: a [`PubSubChannel`]
//! fans notifications out to the per-connection tasks and a [`Signal`] carries
//! the latest discoverability request to the advertising task.

use bt_hci::controller::ExternalController;
use bt_hci::uuid::BluetoothUuid16;
use cyw43::bluetooth::BtDriver;
use defmt::{debug, error, info, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::PubSubChannel;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use heapless::Vec;
use trouble_host::prelude::*;
use wheel_core::{
    discoverability_changed, Channel, ConnectOutcome, PeerHandle, TransmitError, WirelessTransport,
    MAX_PEERS,
};

use crate::HubBridge;

/// HCI controller backed by the CYW43439 Bluetooth core.
pub type BleController = ExternalController<BtDriver<'static>, 10>;

pub type HubPeripheral = Peripheral<'static, BleController, DefaultPacketPool>;
pub type HubConnection = GattConnection<'static, 'static, DefaultPacketPool>;
pub type HubRunner = Runner<'static, BleController, DefaultPacketPool>;

/// Tracked peers plus one link that may be accepted untracked.
pub const CONNECTIONS_MAX: usize = MAX_PEERS + 1;

/// Signal + att.
pub const L2CAP_CHANNELS_MAX: usize = 2;

/// Largest characteristic value, matching the steering frame buffer.
pub const PAYLOAD_LEN: usize = 128;

pub type Payload = Vec<u8, PAYLOAD_LEN>;

const WHEEL_SERVICE_UUID: BluetoothUuid16 = BluetoothUuid16::new(0xAB10);
const STEERING_UUID: BluetoothUuid16 = BluetoothUuid16::new(0xAB11);
const PEDALS_UUID: BluetoothUuid16 = BluetoothUuid16::new(0xAB12);

/// Queued notifications shared by every connection task.
const OUTBOUND_DEPTH: usize = 8;

/// Pause before advertising again after a failed attempt.
const ADVERTISE_RETRY_MS: u64 = 500;

#[gatt_server]
pub struct HubServer {
    pub wheel: WheelService,
}

/// Steering and pedals characteristics, both writable and notifiable.
#[gatt_service(uuid = WHEEL_SERVICE_UUID)]
pub struct WheelService {
    /// Text frames from the steering unit (`b3:1;b4:0`).
    #[characteristic(uuid = STEERING_UUID, write, write_without_response, notify)]
    pub steering: Payload,

    /// Binary triplets from the pedal unit, feedback commands back to it.
    #[characteristic(uuid = PEDALS_UUID, write, write_without_response, notify)]
    pub pedals: Payload,
}

impl WheelService {
    /// Logical channel of the characteristic value at `handle`.
    fn channel_of(&self, handle: u16) -> Option<Channel> {
        if handle == self.steering.handle {
            Some(Channel::Steering)
        } else if handle == self.pedals.handle {
            Some(Channel::Pedals)
        } else {
            None
        }
    }
}

/// One notification addressed to one peer.
#[derive(Clone)]
struct Outbound {
    peer: PeerHandle,
    channel: Channel,
    payload: Payload,
}

static OUTBOUND: PubSubChannel<CriticalSectionRawMutex, Outbound, OUTBOUND_DEPTH, CONNECTIONS_MAX, 0> =
    PubSubChannel::new();

static DISCOVERABLE: Signal<CriticalSectionRawMutex, Option<&'static str>> = Signal::new();

/// Outbound half of the BLE link as seen by the bridge.
pub struct BleLink;

impl WirelessTransport for BleLink {
    fn notify(&self, peer: PeerHandle, channel: Channel, payload: &[u8]) -> Result<(), TransmitError> {
        let payload = Payload::from_slice(payload).map_err(|_| TransmitError::Link)?;
        OUTBOUND
            .immediate_publisher()
            .try_publish(Outbound {
                peer,
                channel,
                payload,
            })
            .map_err(|_| TransmitError::QueueFull)
    }

    fn set_discoverable(&self, name: Option<&'static str>) {
        DISCOVERABLE.signal(name);
    }
}

fn peer_of(conn: &HubConnection) -> PeerHandle {
    PeerHandle(conn.raw().handle().raw())
}

/// Runs the BLE host stack.
#[embassy_executor::task]
pub async fn ble_runner_task(mut runner: HubRunner) -> ! {
    info!("ble_runner_task: starting");
    loop {
        match runner.run().await {
            Ok(_) => warn!("ble_runner_task: run() completed unexpectedly"),
            Err(_) => error!("ble_runner_task: encountered an error"),
        }
    }
}

/// Advertises while the bridge asks for it and hands each accepted link
/// to a [`connection_task`].
#[embassy_executor::task]
pub async fn advertise_task(
    mut peripheral: HubPeripheral,
    server: &'static HubServer<'static>,
    bridge: &'static HubBridge,
    spawner: Spawner,
) -> ! {
    let mut advertised: Option<&'static str> = None;
    loop {
        if let Some(update) = DISCOVERABLE.try_take() {
            advertised = update;
        }
        let Some(name) = advertised else {
            debug!("advertising stopped, all slots occupied");
            advertised = discoverability_changed(&DISCOVERABLE, None).await;
            continue;
        };

        // Only a different name or a stop request interrupts the advertiser
        let change = discoverability_changed(&DISCOVERABLE, advertised);
        match select(advertise(name, &mut peripheral, server), change).await {
            Either::First(Some(conn)) => accept(conn, server, bridge, spawner),
            Either::First(None) => Timer::after_millis(ADVERTISE_RETRY_MS).await,
            Either::Second(update) => advertised = update,
        }
    }
}

/// Advertise once as a connectable peripheral and wait for a central.
async fn advertise(
    name: &str,
    peripheral: &mut HubPeripheral,
    server: &'static HubServer<'static>,
) -> Option<HubConnection> {
    let mut adv_data = [0; 31];
    let Ok(len) = AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
            AdStructure::ServiceUuids16(&[WHEEL_SERVICE_UUID.to_le_bytes()]),
            AdStructure::CompleteLocalName(name.as_bytes()),
        ],
        &mut adv_data[..],
    ) else {
        error!("advertising data for {} does not fit", name);
        return None;
    };

    info!("advertising as {}", name);
    let Ok(advertiser) = peripheral
        .advertise(
            &Default::default(),
            Advertisement::ConnectableScannableUndirected {
                adv_data: &adv_data[..len],
                scan_data: &[],
            },
        )
        .await
    else {
        error!("failed to start advertising");
        return None;
    };

    let Ok(conn) = advertiser.accept().await else {
        warn!("advertising ended without a connection");
        return None;
    };
    match conn.with_attribute_server(server) {
        Ok(conn) => Some(conn),
        Err(_) => {
            error!("failed to attach GATT server to new connection");
            None
        }
    }
}

/// Register a new link with the bridge and start serving it.
fn accept(
    conn: HubConnection,
    server: &'static HubServer<'static>,
    bridge: &'static HubBridge,
    spawner: Spawner,
) {
    let peer = peer_of(&conn);
    if bridge.on_connect(peer) == ConnectOutcome::Rejected {
        conn.raw().disconnect();
        return;
    }

    match connection_task(server, conn, bridge) {
        Ok(token) => spawner.spawn(token),
        Err(_) => {
            error!("no connection task free for peer {}", peer.raw());
            bridge.on_disconnect(peer);
        }
    }
}

/// Serves one connection: writes go to the bridge, queued notifications
/// addressed to this peer go out on their characteristic.
#[embassy_executor::task(pool_size = CONNECTIONS_MAX)]
pub async fn connection_task(
    server: &'static HubServer<'static>,
    conn: HubConnection,
    bridge: &'static HubBridge,
) {
    let peer = peer_of(&conn);
    let Ok(mut outbound) = OUTBOUND.subscriber() else {
        error!("no notification subscriber left for peer {}", peer.raw());
        conn.raw().disconnect();
        bridge.on_disconnect(peer);
        return;
    };

    let reason = loop {
        match select(conn.next(), outbound.next_message_pure()).await {
            Either::First(GattConnectionEvent::Disconnected { reason }) => break reason,
            Either::First(GattConnectionEvent::Gatt { event }) => {
                if let GattEvent::Write(write) = &event {
                    match server.wheel.channel_of(write.handle()) {
                        Some(channel) => {
                            bridge.on_write(channel, write.data());
                        }
                        None => debug!("write to unknown handle {}", write.handle()),
                    }
                }
                match event.accept() {
                    Ok(reply) => reply.send().await,
                    Err(_) => warn!("failed to respond to peer {}", peer.raw()),
                }
            }
            Either::First(_) => {}
            Either::Second(message) if message.peer == peer => {
                let characteristic = match message.channel {
                    Channel::Steering => &server.wheel.steering,
                    Channel::Pedals => &server.wheel.pedals,
                };
                if characteristic.notify(&conn, &message.payload).await.is_err() {
                    warn!("notify on {:?} to peer {} failed", message.channel, peer.raw());
                }
            }
            Either::Second(_) => {}
        }
    };

    info!("peer {} disconnected: {:?}", peer.raw(), reason);
    bridge.on_disconnect(peer);
}
