//! Per-device conversion: raw inventory record + shared context → validated
//! configuration artifact.

mod model;
mod render;

pub use model::DeviceModel;
pub use render::{BgpConfig, BgpNeighborConfig, DeviceConfig, InterfaceConfig};
