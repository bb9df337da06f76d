//! BLE task for the echo peripheral
//!
//! Builds the trouble-host stack and GATT server, then runs the host
//! runner alongside the peripheral controller's event loop.

use log::{error, info};
use trouble_host::prelude::*;

use crate::ble::radio::TroubleRadio;
use crate::ble::service::Server;
use crate::config::device;
use crate::config::host::{CONNECTIONS_MAX, L2CAP_CHANNELS_MAX};
use crate::peripheral::EchoPeripheral;

/// Build the random static address from the device ID
fn device_address(device_id: &[u8; 3]) -> Address {
    let suffix = device::ADDRESS_SUFFIX;
    Address::random([
        device_id[0], device_id[1], device_id[2],
        suffix[0], suffix[1], suffix[2],
    ])
}

/// Main BLE task that manages the Bluetooth stack and the echo peripheral
///
/// This task:
/// 1. Builds the host stack with an address derived from the device ID
/// 2. Registers the Nordic UART Service
/// 3. Advertises as `config::device::NAME`
/// 4. Echoes text written to RX back on TX, re-advertising after each disconnect
pub async fn ble_task<C: Controller>(controller: C, device_id: [u8; 3]) {
    info!("BLE: Starting as '{}'", device::NAME);

    // Create BLE host resources
    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();

    let stack = trouble_host::new(controller, &mut resources)
        .set_random_address(device_address(&device_id));

    let Host {
        peripheral,
        mut runner,
        ..
    } = stack.build();

    // Create GATT server with GAP configuration
    let gap = GapConfig::Peripheral(PeripheralConfig {
        name: device::NAME,
        appearance: &appearance::UNKNOWN,
    });
    let server: Server = match Server::new_with_config(gap) {
        Ok(s) => s,
        Err(e) => {
            error!("BLE: failed to build GATT server: {:?}", e);
            return;
        }
    };

    let radio = TroubleRadio::new(peripheral, &server);

    // Run both the BLE runner and peripheral logic concurrently using select
    let runner_task = runner.run();

    let peripheral_task = async {
        let mut echo = match EchoPeripheral::initialize(radio, device::NAME).await {
            Ok(p) => p,
            Err(e) => {
                error!("BLE: initialisation failed: {:?}", e);
                return;
            }
        };

        let e = echo.run().await;
        error!("BLE: peripheral stopped: {:?}", e);
    };

    embassy_futures::select::select(runner_task, peripheral_task).await;
}
