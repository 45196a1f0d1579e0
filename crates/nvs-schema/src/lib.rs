// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Projection of well-known NVS namespaces into typed device records.
//!
//! The `mas` namespace holds one count per record kind; record `i` of a kind
//! lives in namespace `<prefix><i>` for `i` in `1..=count`. An unset count
//! reads as zero. Every namespace a count promises must exist.

mod kinds;
mod records;

use std::fmt;

use nvs_core::{EditSession, Entry, Namespace, NvsError, Store};
use serde::Serialize;

pub use kinds::{BusType, IpMode, NetworkMode};
pub use records::{ipv4, Bus, Master, Network, SpiBus, Stm32, Stm32Bootloader, UartPort};

/// Name of the namespace carrying the group counts.
pub const MASTER_NAMESPACE: &str = "mas";
/// Prefix of SPI bus namespaces.
pub const SPI_PREFIX: &str = "a_cs";
/// Prefix of UART port namespaces.
pub const UART_PREFIX: &str = "a_cu";
/// Prefix of bootloader profile namespaces.
pub const BOOTLOADER_PREFIX: &str = "a_sb";
/// Prefix of STM32 descriptor namespaces.
pub const STM32_PREFIX: &str = "a_s3";
/// Prefix of network profile namespaces.
pub const NETWORK_PREFIX: &str = "a_nw";

/// Typed view over a device's configuration store.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceConfig {
    /// Group counts.
    pub master: Master,
    /// SPI buses, `a_cs1..`.
    pub spi_buses: Vec<SpiBus>,
    /// UART ports, `a_cu1..`.
    pub uart_ports: Vec<UartPort>,
    /// Bootloader profiles, `a_sb1..`.
    pub bootloaders: Vec<Stm32Bootloader>,
    /// STM32 descriptors, `a_s31..`.
    pub stm32: Vec<Stm32>,
    /// Network profiles, `a_nw1..`.
    pub networks: Vec<Network>,
}

impl DeviceConfig {
    /// Bind every record the master counts promise.
    ///
    /// Fails with [`NvsError::NamespaceNotFound`] when `mas` or one of the
    /// counted namespaces is missing.
    pub fn project(store: &Store) -> Result<Self, NvsError> {
        let master = Master::bind(&store.get_ns(MASTER_NAMESPACE)?)?;
        Ok(Self {
            spi_buses: indexed(store, SPI_PREFIX, &master.cds, SpiBus::bind)?,
            uart_ports: indexed(store, UART_PREFIX, &master.cdu, UartPort::bind)?,
            bootloaders: indexed(store, BOOTLOADER_PREFIX, &master.csb, Stm32Bootloader::bind)?,
            stm32: indexed(store, STM32_PREFIX, &master.cs3, Stm32::bind)?,
            networks: indexed(store, NETWORK_PREFIX, &master.cn, Network::bind)?,
            master,
        })
    }

    /// Project over the staged side of an edit session.
    pub fn project_session(session: &EditSession) -> Result<Self, NvsError> {
        Self::project(session.store())
    }
}

fn indexed<R>(
    store: &Store,
    prefix: &str,
    count: &Entry<u64>,
    bind: impl Fn(&Namespace) -> Result<R, NvsError>,
) -> Result<Vec<R>, NvsError> {
    let count = count.get().unwrap_or(0);
    (1..=count)
        .map(|i| bind(&store.get_ns(&format!("{prefix}{i}"))?))
        .collect()
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.master)?;
        for bus in &self.spi_buses {
            writeln!(f, "  {bus}")?;
        }
        for port in &self.uart_ports {
            writeln!(f, "  {port}")?;
        }
        for bootloader in &self.bootloaders {
            writeln!(f, "  {bootloader}")?;
        }
        for mcu in &self.stm32 {
            writeln!(f, "  {mcu}")?;
        }
        for network in &self.networks {
            writeln!(f, "  {network}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nvs_core::{TypeTag, Value};

    fn device() -> Store {
        let mut store = Store::new();
        let mut set = |ns: &str, key: &str, tag: TypeTag, value: Value| {
            store.set(ns, key, value, tag).unwrap();
        };
        set("mas", "cds", TypeTag::U8, Value::Uint(2));
        set("mas", "cdu", TypeTag::U8, Value::Uint(1));
        set("mas", "cn", TypeTag::U8, Value::Uint(1));
        set("a_cs1", "port", TypeTag::U8, Value::Uint(2));
        set("a_cs1", "miso", TypeTag::U8, Value::Uint(19));
        set("a_cs1", "mosi", TypeTag::U8, Value::Uint(23));
        set("a_cs1", "sclk", TypeTag::U8, Value::Uint(18));
        set("a_cs2", "port", TypeTag::U8, Value::Uint(3));
        set("a_cu1", "port", TypeTag::U8, Value::Uint(1));
        set("a_cu1", "tx", TypeTag::U8, Value::Uint(17));
        set("a_cu1", "rx", TypeTag::U8, Value::Uint(16));
        set("a_cu1", "rate", TypeTag::U32, Value::Uint(115_200));
        set("a_cu1", "prt", TypeTag::U8, Value::Uint(0));
        set("a_nw1", "mode", TypeTag::U8, Value::Uint(2));
        set("a_nw1", "ip_mode", TypeTag::U8, Value::Uint(1));
        set("a_nw1", "ssid", TypeTag::Str, Value::Text("bench".into()));
        set("a_nw1", "password", TypeTag::Str, Value::Text("hunter22".into()));
        set("a_nw1", "ip", TypeTag::U32, Value::Uint(0xC0A8_0401));
        store
    }

    #[test]
    fn counts_materialize_indexed_groups() {
        let store = device();
        let config = DeviceConfig::project(&store).unwrap();
        assert_eq!(config.spi_buses.len(), 2);
        assert_eq!(config.uart_ports.len(), 1);
        assert!(config.bootloaders.is_empty());
        assert!(config.stm32.is_empty());
        assert_eq!(config.networks.len(), 1);
        assert_eq!(config.spi_buses[1].port.get(), Some(3));
    }

    #[test]
    fn missing_master_is_fatal() {
        let store = Store::new();
        assert_eq!(
            DeviceConfig::project(&store).unwrap_err(),
            NvsError::NamespaceNotFound("mas".into())
        );
    }

    #[test]
    fn missing_counted_namespace_is_fatal() {
        let mut store = device();
        store.set("mas", "cs3", Value::Uint(1), TypeTag::U8).unwrap();
        assert_eq!(
            DeviceConfig::project(&store).unwrap_err(),
            NvsError::NamespaceNotFound("a_s31".into())
        );
    }

    #[test]
    fn records_render_like_the_device_ui() {
        let config = DeviceConfig::project(&device()).unwrap();
        assert_eq!(
            config.spi_buses[0].to_string(),
            "SPI2 (MISO: 19, MOSI: 23, SCLK: 18)"
        );
        assert_eq!(config.spi_buses[1].to_string(), "SPI3 (MISO: ?, MOSI: ?, SCLK: ?)");
        assert_eq!(config.uart_ports[0].to_string(), "UART1 (->17 <-16 spd:115200 prt:0)");
        let network = config.networks[0].to_string();
        assert!(network.contains("mode: AP"));
        assert!(network.contains("ip_mode: static"));
        assert!(network.contains("ip: 192.168.4.1"));
        assert!(!network.contains("hunter22"));
    }

    #[test]
    fn bindings_are_live() {
        let store = device();
        let config = DeviceConfig::project(&store).unwrap();
        store
            .entry::<u64>("a_cs1", "sclk", TypeTag::U8)
            .unwrap()
            .set(5);
        assert_eq!(config.spi_buses[0].sclk.get(), Some(5));
    }

    #[test]
    fn session_projection_is_isolated() {
        let store = device();
        let committed = DeviceConfig::project(&store).unwrap();
        let session = store.snapshot();
        let staged = DeviceConfig::project_session(&session).unwrap();
        staged.uart_ports[0].baud_rate.set(9_600);
        assert_eq!(committed.uart_ports[0].baud_rate.get(), Some(115_200));
        assert_eq!(session.changes().len(), 1);
    }

    #[test]
    fn serializes_values_and_hides_the_passphrase() {
        let config = DeviceConfig::project(&device()).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["master"]["cds"], 2);
        assert_eq!(json["networks"][0]["ip"], "192.168.4.1");
        assert!(json["networks"][0].get("password").is_none());
    }
}
