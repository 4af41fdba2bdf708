//! # Bluetooth LE Adapter
//!
//! This module connects the print pipeline to real hardware through
//! [`btleplug`]: scanning for printers, connecting to one, and performing the
//! acknowledged characteristic writes the [`Transport`](super::Transport)
//! drives.
//!
//! ## Discovery
//!
//! A scan is a finite stream. It yields each named peripheral once and ends
//! when the scan window closes, stopping the adapter's scan on the way out.
//! Starting a new scan starts discovery afresh.
//!
//! ```no_run
//! use futures::StreamExt;
//! use printy::printer::PrinterConfig;
//! use printy::transport::bluetooth::Scanner;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), printy::PrintyError> {
//! let config = PrinterConfig::default();
//! let scanner = Scanner::new(config.transport.clone()).await?;
//!
//! let mut devices = scanner.scan(Duration::from_secs(5)).await?;
//! while let Some(device) = devices.next().await {
//!     println!("{} {}", device.id, device.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Notes
//!
//! - **Linux**: requires BlueZ and membership in the `bluetooth` group (or
//!   equivalent D-Bus policy); otherwise adapter access fails with
//!   `PermissionDenied`.
//! - **macOS**: the terminal app needs Bluetooth permission in System
//!   Settings → Privacy & Security. Device addresses are not exposed, so
//!   printers are best selected by name.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::device::{DeviceHandle, GattWriter};
use crate::error::{PrintyError, TransportError};
use crate::printer::TransportConfig;

/// One peripheral seen during a scan.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Bluetooth address (XX:XX:XX:XX:XX:XX)
    pub id: String,
    /// Advertised local name
    pub name: String,
    /// Signal strength at discovery time, if reported
    pub rssi: Option<i16>,
    peripheral: PeripheralId,
}

impl DiscoveredDevice {
    /// Whether `query` selects this device.
    ///
    /// A MAC address must match exactly (case-insensitive); anything else is
    /// matched as a case-insensitive substring of the name.
    pub fn matches(&self, query: &str) -> bool {
        if is_valid_mac(query) {
            self.id.eq_ignore_ascii_case(query)
        } else {
            self.name.to_lowercase().contains(&query.to_lowercase())
        }
    }
}

/// Scans for and connects to BLE printers.
///
/// Owns the host adapter for its lifetime; create one per program and pass it
/// where needed.
pub struct Scanner {
    adapter: Adapter,
    config: TransportConfig,
}

impl Scanner {
    /// Open the first available Bluetooth adapter.
    pub async fn new(config: TransportConfig) -> Result<Self, PrintyError> {
        let manager = Manager::new().await.map_err(map_setup_error)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(map_setup_error)?
            .into_iter()
            .next()
            .ok_or_else(|| PrintyError::Connection("No Bluetooth adapter available".into()))?;

        if let Ok(info) = adapter.adapter_info().await {
            info!("Using Bluetooth adapter {}", info);
        }
        Ok(Self { adapter, config })
    }

    /// Scan for named peripherals for `window`.
    ///
    /// The returned stream yields each device at most once and ends when the
    /// window closes.
    pub async fn scan(
        &self,
        window: Duration,
    ) -> Result<BoxStream<'static, DiscoveredDevice>, PrintyError> {
        let events = self.adapter.events().await.map_err(map_setup_error)?;
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(map_setup_error)?;
        debug!("Scanning for {:?}", window);

        let adapter = self.adapter.clone();
        let mut seen = HashSet::new();
        let discovered = events
            .take_until(tokio::time::sleep(window))
            .filter_map(move |event| {
                let adapter = adapter.clone();
                async move {
                    match event {
                        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                            describe(&adapter, id).await
                        }
                        _ => None,
                    }
                }
            })
            .filter(move |device| future::ready(seen.insert(device.id.clone())))
            .inspect(|device| {
                debug!("Found {} [{}] rssi {:?}", device.name, device.id, device.rssi)
            });

        let adapter = self.adapter.clone();
        let stop = stream::once(async move {
            if let Err(e) = adapter.stop_scan().await {
                warn!("Failed to stop scan: {}", e);
            }
            None::<DiscoveredDevice>
        })
        .filter_map(future::ready);

        Ok(discovered.chain(stop).boxed())
    }

    /// Scan until a device matching `query` appears.
    ///
    /// ## Errors
    ///
    /// `ScanTimeout` if the configured scan window closes first.
    pub async fn find(&self, query: &str) -> Result<DiscoveredDevice, PrintyError> {
        let mut devices = self.scan(self.config.scan_timeout()).await?;
        while let Some(device) = devices.next().await {
            if device.matches(query) {
                drop(devices);
                if let Err(e) = self.adapter.stop_scan().await {
                    warn!("Failed to stop scan: {}", e);
                }
                return Ok(device);
            }
        }
        Err(PrintyError::ScanTimeout)
    }

    /// Connect to `device` and locate its print characteristic.
    pub async fn connect(
        &self,
        device: &DiscoveredDevice,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<DeviceHandle, PrintyError> {
        let peripheral = self
            .adapter
            .peripheral(&device.peripheral)
            .await
            .map_err(map_setup_error)?;

        if !peripheral.is_connected().await.unwrap_or(false) {
            info!("Connecting to {} [{}]", device.name, device.id);
            timeout(self.config.connect_timeout(), peripheral.connect())
                .await
                .map_err(|_| {
                    PrintyError::Connection(format!("Timed out connecting to {}", device.id))
                })?
                .map_err(map_setup_error)?;
        }

        peripheral.discover_services().await.map_err(map_setup_error)?;

        let target = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or_else(|| {
                PrintyError::Connection(format!(
                    "Characteristic {} not found in service {} on {}",
                    characteristic, service, device.id
                ))
            })?;

        info!("Connected to {} [{}]", device.name, device.id);
        let writer = BlePrinter {
            peripheral,
            characteristic: target,
        };
        Ok(DeviceHandle::new(
            device.id.clone(),
            Arc::new(writer),
            service,
            characteristic,
        ))
    }

    /// Disconnect from `device` if connected.
    pub async fn disconnect(&self, device: &DiscoveredDevice) -> Result<(), PrintyError> {
        let peripheral = self
            .adapter
            .peripheral(&device.peripheral)
            .await
            .map_err(map_setup_error)?;
        if peripheral.is_connected().await.unwrap_or(false) {
            peripheral.disconnect().await.map_err(map_setup_error)?;
            info!("Disconnected from {}", device.id);
        }
        Ok(())
    }
}

/// Properties of a discovered peripheral, if it advertises a name.
async fn describe(adapter: &Adapter, id: PeripheralId) -> Option<DiscoveredDevice> {
    let peripheral = adapter.peripheral(&id).await.ok()?;
    let props = peripheral.properties().await.ok()??;
    let name = props.local_name.filter(|n| !n.is_empty())?;
    Some(DiscoveredDevice {
        id: props.address.to_string(),
        name,
        rssi: props.rssi,
        peripheral: id,
    })
}

/// A connected printer's write characteristic.
struct BlePrinter {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

#[async_trait]
impl GattWriter for BlePrinter {
    async fn write_with_response(
        &self,
        _service: Uuid,
        _characteristic: Uuid,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        self.peripheral
            .write(&self.characteristic, payload, WriteType::WithResponse)
            .await
            .map_err(map_write_error)
    }
}

fn map_setup_error(e: btleplug::Error) -> PrintyError {
    match e {
        btleplug::Error::PermissionDenied => PrintyError::PermissionDenied,
        other => PrintyError::Connection(other.to_string()),
    }
}

fn map_write_error(e: btleplug::Error) -> TransportError {
    match e {
        btleplug::Error::NotConnected | btleplug::Error::DeviceNotFound => {
            TransportError::Disconnected
        }
        btleplug::Error::TimedOut(d) => TransportError::Timeout(d),
        other => TransportError::Link(other.to_string()),
    }
}

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_mac_addresses() {
        assert!(is_valid_mac("00:11:22:33:44:55"));
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_invalid_mac_addresses() {
        assert!(!is_valid_mac("00:11:22:33:44")); // too short
        assert!(!is_valid_mac("00:11:22:33:44:55:66")); // too long
        assert!(!is_valid_mac("00-11-22-33-44-55")); // wrong separator
        assert!(!is_valid_mac("GG:HH:II:JJ:KK:LL")); // invalid hex
        assert!(!is_valid_mac(""));
        assert!(!is_valid_mac("MX-06"));
    }

    #[test]
    fn test_write_error_mapping() {
        assert_eq!(
            map_write_error(btleplug::Error::NotConnected),
            TransportError::Disconnected
        );
        assert_eq!(
            map_write_error(btleplug::Error::TimedOut(Duration::from_secs(1))),
            TransportError::Timeout(Duration::from_secs(1))
        );
        assert!(map_write_error(btleplug::Error::RuntimeError("att".into())).is_transient());
    }

    #[test]
    fn test_setup_error_mapping() {
        assert!(matches!(
            map_setup_error(btleplug::Error::PermissionDenied),
            PrintyError::PermissionDenied
        ));
        assert!(matches!(
            map_setup_error(btleplug::Error::DeviceNotFound),
            PrintyError::Connection(_)
        ));
    }
}
