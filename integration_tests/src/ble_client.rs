//! BLE client for talking to the echo peripheral via Nordic UART Service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

/// Nordic UART Service UUIDs
pub const NUS_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);
const NUS_RX_UUID: Uuid = Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e); // Write to device
const NUS_TX_UUID: Uuid = Uuid::from_u128(0x6e400003_b5a3_f393_e0a9_e50e24dcca9e); // Notify from device

/// BLE client for the echo peripheral.
pub struct BleClient {
    peripheral: Peripheral,
    rx_char: Characteristic,
    tx_char: Characteristic,
    /// Buffer for accumulating notification data
    notification_buffer: Arc<Mutex<Vec<u8>>>,
}

impl BleClient {
    /// Scan for a device by name and connect.
    pub async fn connect_by_name(name: &str, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        adapter.start_scan(ScanFilter::default()).await?;
        let peripheral = Self::find_device_by_name(&adapter, name, scan_timeout).await?;
        adapter.stop_scan().await?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let services = peripheral.services();
        if !services.iter().any(|s| s.uuid == NUS_SERVICE_UUID) {
            return Err(anyhow!("NUS service not found"));
        }

        let characteristics = peripheral.characteristics();

        let rx_char = characteristics
            .iter()
            .find(|c| c.uuid == NUS_RX_UUID)
            .cloned()
            .ok_or_else(|| anyhow!("NUS RX characteristic not found"))?;

        let tx_char = characteristics
            .iter()
            .find(|c| c.uuid == NUS_TX_UUID)
            .cloned()
            .ok_or_else(|| anyhow!("NUS TX characteristic not found"))?;

        peripheral.subscribe(&tx_char).await?;

        let notification_buffer = Arc::new(Mutex::new(Vec::new()));

        // Spawn notification handler
        let buffer_clone = notification_buffer.clone();
        let peripheral_clone = peripheral.clone();
        tokio::spawn(async move {
            let mut stream = match peripheral_clone.notifications().await {
                Ok(s) => s,
                Err(_) => return,
            };

            while let Some(data) = stream.next().await {
                if data.uuid == NUS_TX_UUID {
                    let mut buf = buffer_clone.lock().await;
                    buf.extend_from_slice(&data.value);
                }
            }
        });

        Ok(Self {
            peripheral,
            rx_char,
            tx_char,
            notification_buffer,
        })
    }

    /// Find a device by name within the scan timeout.
    async fn find_device_by_name(
        adapter: &Adapter,
        name: &str,
        scan_timeout: Duration,
    ) -> Result<Peripheral> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            for peripheral in adapter.peripherals().await? {
                if let Some(props) = peripheral.properties().await? {
                    if props.local_name.as_deref() == Some(name) {
                        return Ok(peripheral);
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("Device '{}' not found within timeout", name))
    }

    /// Write raw bytes to RX.
    pub async fn write(&self, data: &[u8], write_type: WriteType) -> Result<()> {
        self.peripheral.write(&self.rx_char, data, write_type).await?;
        Ok(())
    }

    /// Write text to RX and wait for the echoed line on TX.
    pub async fn echo(&self, text: &str, response_timeout: Duration) -> Result<String> {
        self.clear_buffer().await;
        self.write(text.as_bytes(), WriteType::WithResponse).await?;
        self.wait_for_line(response_timeout).await
    }

    /// Wait for a newline-terminated notification, returned with its newline.
    pub async fn wait_for_line(&self, response_timeout: Duration) -> Result<String> {
        let result = timeout(response_timeout, async {
            loop {
                let mut buf = self.notification_buffer.lock().await;
                if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    return String::from_utf8(line).map_err(|e| anyhow!("Echo is not UTF-8: {}", e));
                }
                drop(buf);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        match result {
            Ok(line) => line,
            Err(_) => Err(anyhow!("Timeout waiting for echo")),
        }
    }

    /// Check that nothing arrives on TX within the given time.
    pub async fn expect_silence(&self, window: Duration) -> Result<()> {
        tokio::time::sleep(window).await;
        let buf = self.notification_buffer.lock().await;
        if buf.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Unexpected notification: {:?}", *buf))
        }
    }

    /// Disconnect from the device.
    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.unsubscribe(&self.tx_char).await?;
        self.peripheral.disconnect().await?;
        Ok(())
    }

    /// Clear any pending notifications from the buffer.
    pub async fn clear_buffer(&self) {
        let mut buf = self.notification_buffer.lock().await;
        buf.clear();
    }
}
