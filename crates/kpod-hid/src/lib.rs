//! KPod HID - device command transport.
//!
//! This crate sends [`kpod_core::DeviceCommand`]s to an Elecraft KPod and
//! collects its replies. The [`Transport`] trait is the seam between the
//! command layer and the physical link; [`HidrawTransport`] implements it for
//! a Linux hidraw node opened by path.

pub mod device;
pub mod error;
#[cfg(target_os = "linux")]
pub mod hidraw;

pub use device::{KPod, Transport};
pub use error::{HidError, HidResult};
#[cfg(target_os = "linux")]
pub use hidraw::HidrawTransport;

