// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Enumerations the firmware stores as `u8` entries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport a bootloader profile is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    /// Not configured.
    None,
    /// SPI bus.
    Spi,
    /// UART port.
    Uart,
    /// Debug link.
    Debug,
}

impl BusType {
    /// Decode the stored byte; `None` for values the firmware does not define.
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Spi),
            2 => Some(Self::Uart),
            3 => Some(Self::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Spi => "SPI",
            Self::Uart => "UART",
            Self::Debug => "debug",
        })
    }
}

/// Wi-Fi role of a network profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkMode {
    /// Disabled.
    None,
    /// Station (joins an access point).
    Sta,
    /// Access point.
    Ap,
}

impl NetworkMode {
    /// Decode the stored byte.
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Sta),
            2 => Some(Self::Ap),
            _ => None,
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Sta => "STA",
            Self::Ap => "AP",
        })
    }
}

/// Address assignment of a network profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpMode {
    /// Address from DHCP.
    Dhcp,
    /// Fixed address from the `ip`/`subnet`/`gateway` entries.
    Static,
}

impl IpMode {
    /// Decode the stored byte.
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Self::Dhcp),
            1 => Some(Self::Static),
            _ => None,
        }
    }
}

impl fmt::Display for IpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dhcp => "DHCP",
            Self::Static => "static",
        })
    }
}
