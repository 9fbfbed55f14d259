//! Known device categories
//!
//! The set of categories is closed: every record is routed to exactly one of
//! the variants below, and anything else is an unknown category.

use serde::{Deserialize, Serialize, Serializer};
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use thiserror::Error;

/// Device identifier scheme, one store endpoint per variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Idfa,
    Gaid,
    Adid,
    Dvid,
}

impl DeviceType {
    pub const ALL: [DeviceType; 4] = [
        DeviceType::Idfa,
        DeviceType::Gaid,
        DeviceType::Adid,
        DeviceType::Dvid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Idfa => "idfa",
            DeviceType::Gaid => "gaid",
            DeviceType::Adid => "adid",
            DeviceType::Dvid => "dvid",
        }
    }

    fn index(self) -> usize {
        match self {
            DeviceType::Idfa => 0,
            DeviceType::Gaid => 1,
            DeviceType::Adid => 2,
            DeviceType::Dvid => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown device type: {0}")]
pub struct UnknownDeviceType(pub String);

impl FromStr for DeviceType {
    type Err = UnknownDeviceType;

    /// Exact, case-sensitive match on the tag used in input files
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idfa" => Ok(DeviceType::Idfa),
            "gaid" => Ok(DeviceType::Gaid),
            "adid" => Ok(DeviceType::Adid),
            "dvid" => Ok(DeviceType::Dvid),
            other => Err(UnknownDeviceType(other.to_string())),
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per [`DeviceType`], indexed without lookups or missing keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMap<T>([T; 4]);

impl<T> DeviceMap<T> {
    pub fn from_fn(mut f: impl FnMut(DeviceType) -> T) -> Self {
        DeviceMap(DeviceType::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceType, &T)> {
        DeviceType::ALL.into_iter().zip(self.0.iter())
    }

    pub fn map<U>(self, mut f: impl FnMut(DeviceType, T) -> U) -> DeviceMap<U> {
        let [idfa, gaid, adid, dvid] = self.0;
        DeviceMap([
            f(DeviceType::Idfa, idfa),
            f(DeviceType::Gaid, gaid),
            f(DeviceType::Adid, adid),
            f(DeviceType::Dvid, dvid),
        ])
    }
}

impl<T> Index<DeviceType> for DeviceMap<T> {
    type Output = T;

    fn index(&self, device: DeviceType) -> &T {
        &self.0[device.index()]
    }
}

impl<T> IndexMut<DeviceType> for DeviceMap<T> {
    fn index_mut(&mut self, device: DeviceType) -> &mut T {
        &mut self.0[device.index()]
    }
}

impl<T: Serialize> Serialize for DeviceMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(device, value)| (device.as_str(), value)))
    }
}
