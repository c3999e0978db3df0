//! KPod rig link - rigctld protocol client.
//!
//! This crate talks to a Hamlib `rigctld` daemon using its line-oriented
//! extended response protocol, and defines the [`Rig`] seam the knob
//! controller tunes through.

pub mod client;
pub mod error;
pub mod response;

pub use client::RigClient;
pub use error::{RigError, RigResult};
pub use response::RigResponse;

/// Default rigctld host.
pub const DEFAULT_SERVER: &str = "127.0.0.1";

/// Default rigctld port.
pub const DEFAULT_PORT: u16 = 4532;

/// Frequency control of a rig.
#[allow(async_fn_in_trait)]
pub trait Rig {
    /// Read the current frequency in hertz.
    ///
    /// # Errors
    /// Returns an error if the exchange fails or the response carries no
    /// valid frequency.
    async fn get_frequency(&mut self) -> RigResult<i64>;

    /// Tune to `hz`.
    ///
    /// # Errors
    /// Returns an error if the exchange fails or the daemon rejects the
    /// frequency.
    async fn set_frequency(&mut self, hz: i64) -> RigResult<()>;
}
