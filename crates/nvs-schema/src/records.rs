// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Device records bound to entries of one namespace each.
//!
//! Records hold live [`Entry`] handles, so a view bound to a field observes
//! edits made through any other handle to the same cell.

use std::fmt;
use std::net::Ipv4Addr;

use nvs_core::{Entry, EntryValue, Namespace, NvsError, TypeTag};
use serde::{Serialize, Serializer};

use crate::kinds::{BusType, IpMode, NetworkMode};

fn byte(ns: &Namespace, key: &str) -> Result<Entry<u64>, NvsError> {
    ns.entry(key, TypeTag::U8)
}

fn word(ns: &Namespace, key: &str) -> Result<Entry<u64>, NvsError> {
    ns.entry(key, TypeTag::U32)
}

fn text(ns: &Namespace, key: &str) -> Result<Entry<String>, NvsError> {
    ns.entry(key, TypeTag::Str)
}

fn current<T, S>(entry: &Entry<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: EntryValue + Serialize,
    S: Serializer,
{
    entry.get().serialize(serializer)
}

fn address<S: Serializer>(entry: &Entry<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    entry.get().map(ipv4).serialize(serializer)
}

/// Dotted-quad reading of a stored address (most significant byte first).
pub fn ipv4(raw: u64) -> Ipv4Addr {
    #[allow(clippy::cast_possible_truncation)]
    Ipv4Addr::from(raw as u32)
}

/// Displays an entry's value, or `?` while it is unset.
struct Shown<'a, T: EntryValue>(&'a Entry<T>);

impl<T: EntryValue + fmt::Display> fmt::Display for Shown<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("?"),
        }
    }
}

/// Counts of each indexed namespace group (`mas`).
#[derive(Debug, Clone, Serialize)]
pub struct Master {
    /// Number of `a_cs*` SPI buses.
    #[serde(serialize_with = "current")]
    pub cds: Entry<u64>,
    /// Number of `a_cu*` UART ports.
    #[serde(serialize_with = "current")]
    pub cdu: Entry<u64>,
    /// Number of `a_sb*` bootloader profiles.
    #[serde(serialize_with = "current")]
    pub csb: Entry<u64>,
    /// Number of `a_s3*` STM32 descriptors.
    #[serde(serialize_with = "current")]
    pub cs3: Entry<u64>,
    /// Number of `a_nw*` network profiles.
    #[serde(serialize_with = "current")]
    pub cn: Entry<u64>,
}

impl Master {
    /// Bind to the `mas` namespace.
    pub fn bind(ns: &Namespace) -> Result<Self, NvsError> {
        Ok(Self {
            cds: byte(ns, "cds")?,
            cdu: byte(ns, "cdu")?,
            csb: byte(ns, "csb")?,
            cs3: byte(ns, "cs3")?,
            cn: byte(ns, "cn")?,
        })
    }
}

impl fmt::Display for Master {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Master (cds: {}, cdu: {}, csb: {}, cs3: {}, cn: {})",
            Shown(&self.cds),
            Shown(&self.cdu),
            Shown(&self.csb),
            Shown(&self.cs3),
            Shown(&self.cn)
        )
    }
}

/// SPI bus pin assignment (`a_cs<i>`).
#[derive(Debug, Clone, Serialize)]
pub struct SpiBus {
    /// Peripheral number.
    #[serde(serialize_with = "current")]
    pub port: Entry<u64>,
    /// MISO GPIO.
    #[serde(serialize_with = "current")]
    pub miso: Entry<u64>,
    /// MOSI GPIO.
    #[serde(serialize_with = "current")]
    pub mosi: Entry<u64>,
    /// Clock GPIO.
    #[serde(serialize_with = "current")]
    pub sclk: Entry<u64>,
}

impl SpiBus {
    /// Bind to one `a_cs<i>` namespace.
    pub fn bind(ns: &Namespace) -> Result<Self, NvsError> {
        Ok(Self {
            port: byte(ns, "port")?,
            miso: byte(ns, "miso")?,
            mosi: byte(ns, "mosi")?,
            sclk: byte(ns, "sclk")?,
        })
    }
}

impl fmt::Display for SpiBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SPI{} (MISO: {}, MOSI: {}, SCLK: {})",
            Shown(&self.port),
            Shown(&self.miso),
            Shown(&self.mosi),
            Shown(&self.sclk)
        )
    }
}

/// UART port settings (`a_cu<i>`).
#[derive(Debug, Clone, Serialize)]
pub struct UartPort {
    /// Peripheral number.
    #[serde(serialize_with = "current")]
    pub port: Entry<u64>,
    /// TX GPIO.
    #[serde(serialize_with = "current")]
    pub tx: Entry<u64>,
    /// RX GPIO.
    #[serde(serialize_with = "current")]
    pub rx: Entry<u64>,
    /// Baud rate (`rate`, u32).
    #[serde(serialize_with = "current")]
    pub baud_rate: Entry<u64>,
    /// Parity (`prt`).
    #[serde(serialize_with = "current")]
    pub parity: Entry<u64>,
}

impl UartPort {
    /// Bind to one `a_cu<i>` namespace.
    pub fn bind(ns: &Namespace) -> Result<Self, NvsError> {
        Ok(Self {
            port: byte(ns, "port")?,
            tx: byte(ns, "tx")?,
            rx: byte(ns, "rx")?,
            baud_rate: word(ns, "rate")?,
            parity: byte(ns, "prt")?,
        })
    }
}

impl fmt::Display for UartPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UART{} (->{} <-{} spd:{} prt:{})",
            Shown(&self.port),
            Shown(&self.tx),
            Shown(&self.rx),
            Shown(&self.baud_rate),
            Shown(&self.parity)
        )
    }
}

/// Bus attachment shared by bootloader profiles.
#[derive(Debug, Clone, Serialize)]
pub struct Bus {
    /// Raw [`BusType`] byte.
    #[serde(serialize_with = "current")]
    pub bus_type: Entry<u64>,
    /// Index of the bus within its type.
    #[serde(serialize_with = "current")]
    pub bus_port: Entry<u64>,
    /// Chip-select GPIO.
    #[serde(serialize_with = "current")]
    pub cs: Entry<u64>,
}

impl Bus {
    /// Bind the bus fields of `ns`.
    pub fn bind(ns: &Namespace) -> Result<Self, NvsError> {
        Ok(Self {
            bus_type: byte(ns, "bus_type")?,
            bus_port: byte(ns, "bus_port")?,
            cs: byte(ns, "cs")?,
        })
    }

    /// Decoded bus type, if set and known.
    pub fn kind(&self) -> Option<BusType> {
        self.bus_type.get().and_then(BusType::from_raw)
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{kind}{}", Shown(&self.bus_port))?,
            None => write!(f, "bus{}[{}]", Shown(&self.bus_port), Shown(&self.bus_type))?,
        }
        write!(f, " cs: {}", Shown(&self.cs))
    }
}

/// STM32 bootloader profile (`a_sb<i>`).
#[derive(Debug, Clone, Serialize)]
pub struct Stm32Bootloader {
    /// Bus the bootloader is reached through.
    pub bus: Bus,
    /// Target STM32 descriptor index.
    #[serde(serialize_with = "current")]
    pub id: Entry<u64>,
}

impl Stm32Bootloader {
    /// Bind to one `a_sb<i>` namespace.
    pub fn bind(ns: &Namespace) -> Result<Self, NvsError> {
        Ok(Self {
            bus: Bus::bind(ns)?,
            id: byte(ns, "id")?,
        })
    }
}

impl fmt::Display for Stm32Bootloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STM32BL[{}] on {}", Shown(&self.id), self.bus)
    }
}

/// STM32 control pins (`a_s3<i>`).
#[derive(Debug, Clone, Serialize)]
pub struct Stm32 {
    /// Descriptor index.
    #[serde(serialize_with = "current")]
    pub id: Entry<u64>,
    /// Reset GPIO.
    #[serde(serialize_with = "current")]
    pub reset: Entry<u64>,
    /// BOOT0 GPIO.
    #[serde(serialize_with = "current")]
    pub boot0: Entry<u64>,
    /// Bootloader profile index.
    #[serde(serialize_with = "current")]
    pub bid: Entry<u64>,
    /// Remote-controller profile index.
    #[serde(serialize_with = "current")]
    pub rid: Entry<u64>,
}

impl Stm32 {
    /// Bind to one `a_s3<i>` namespace.
    pub fn bind(ns: &Namespace) -> Result<Self, NvsError> {
        Ok(Self {
            id: byte(ns, "id")?,
            reset: byte(ns, "reset")?,
            boot0: byte(ns, "boot0")?,
            bid: byte(ns, "bid")?,
            rid: byte(ns, "rid")?,
        })
    }
}

impl fmt::Display for Stm32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "STM32[{}] (reset: {}, boot0: {}, bid: {}, rid: {})",
            Shown(&self.id),
            Shown(&self.reset),
            Shown(&self.boot0),
            Shown(&self.bid),
            Shown(&self.rid)
        )
    }
}

/// Wi-Fi network profile (`a_nw<i>`).
#[derive(Debug, Clone, Serialize)]
pub struct Network {
    /// Profile index.
    #[serde(serialize_with = "current")]
    pub id: Entry<u64>,
    /// Raw [`NetworkMode`] byte.
    #[serde(serialize_with = "current")]
    pub mode: Entry<u64>,
    /// Raw [`IpMode`] byte.
    #[serde(serialize_with = "current")]
    pub ip_mode: Entry<u64>,
    /// SSID.
    #[serde(serialize_with = "current")]
    pub ssid: Entry<String>,
    /// Passphrase.
    #[serde(skip)]
    pub password: Entry<String>,
    /// mDNS hostname.
    #[serde(serialize_with = "current")]
    pub hostname: Entry<String>,
    /// Static address.
    #[serde(serialize_with = "address")]
    pub ip: Entry<u64>,
    /// Static netmask.
    #[serde(serialize_with = "address")]
    pub subnet: Entry<u64>,
    /// Static gateway.
    #[serde(serialize_with = "address")]
    pub gateway: Entry<u64>,
}

impl Network {
    /// Bind to one `a_nw<i>` namespace.
    pub fn bind(ns: &Namespace) -> Result<Self, NvsError> {
        Ok(Self {
            id: byte(ns, "id")?,
            mode: byte(ns, "mode")?,
            ip_mode: byte(ns, "ip_mode")?,
            ssid: text(ns, "ssid")?,
            password: text(ns, "password")?,
            hostname: text(ns, "hostname")?,
            ip: word(ns, "ip")?,
            subnet: word(ns, "subnet")?,
            gateway: word(ns, "gateway")?,
        })
    }

    /// Decoded Wi-Fi role.
    pub fn network_mode(&self) -> Option<NetworkMode> {
        self.mode.get().and_then(NetworkMode::from_raw)
    }

    /// Decoded address assignment.
    pub fn address_mode(&self) -> Option<IpMode> {
        self.ip_mode.get().and_then(IpMode::from_raw)
    }
}

struct Addr<'a>(&'a Entry<u64>);

impl fmt::Display for Addr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(raw) => write!(f, "{}", ipv4(raw)),
            None => f.write_str("?"),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = self
            .network_mode()
            .map_or_else(|| Shown(&self.mode).to_string(), |m| m.to_string());
        let ip_mode = self
            .address_mode()
            .map_or_else(|| Shown(&self.ip_mode).to_string(), |m| m.to_string());
        // The passphrase is never rendered.
        write!(
            f,
            "Network[{}] (mode: {mode}, ip_mode: {ip_mode}, ssid: {}, hostname: {}, ip: {}, subnet: {}, gateway: {})",
            Shown(&self.id),
            Shown(&self.ssid),
            Shown(&self.hostname),
            Addr(&self.ip),
            Addr(&self.subnet),
            Addr(&self.gateway)
        )
    }
}
