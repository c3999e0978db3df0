//! KPod device commands.

use kpod_core::command::{is_update_report, parse_identify, parse_version};
use kpod_core::report::REPORT_LEN;
use kpod_core::{BeepLevel, DeviceCommand, EncoderScale, LedAux, RawReport, Tone};
use tracing::debug;

use crate::error::HidResult;

/// A link that carries one command packet to the device and returns its reply.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send a packet and wait for the device's reply.
    ///
    /// # Errors
    /// Returns an error if the write fails, the reply is short, or the device
    /// does not answer in time.
    async fn transact(&mut self, packet: &[u8; REPORT_LEN]) -> HidResult<RawReport>;
}

/// A connected KPod.
pub struct KPod<T> {
    transport: T,
}

impl<T: Transport> KPod<T> {
    /// Wrap a transport connected to a KPod.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send a command and return the raw reply.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    pub async fn send(&mut self, command: DeviceCommand) -> HidResult<RawReport> {
        let packet = command.encode();
        let reply = self.transport.transact(&packet).await?;
        debug!(?command, ?packet, ?reply, "Device command");
        Ok(reply)
    }

    /// Read the identification string (normally `"KPOD"`).
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    pub async fn identify(&mut self) -> HidResult<String> {
        let reply = self.send(DeviceCommand::Identify).await?;
        Ok(parse_identify(&reply))
    }

    /// Read the firmware version as `"major.minor"`.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    pub async fn version(&mut self) -> HidResult<String> {
        let reply = self.send(DeviceCommand::Version).await?;
        Ok(parse_version(&reply))
    }

    /// Sound the buzzer.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    pub async fn beep(&mut self, tone: Tone, level: BeepLevel, duration: u8) -> HidResult<()> {
        self.send(DeviceCommand::Beep { tone, level, duration }).await.map(|_| ())
    }

    /// Set the LED and auxiliary outputs.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    pub async fn led_aux(&mut self, leds: LedAux) -> HidResult<()> {
        self.send(DeviceCommand::LedAux(leds)).await.map(|_| ())
    }

    /// Set encoder resolution and click muting.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    pub async fn configure(&mut self, scale: EncoderScale, mute: bool) -> HidResult<()> {
        self.send(DeviceCommand::Configure { scale, mute }).await.map(|_| ())
    }

    /// Reset the device.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    pub async fn reset(&mut self) -> HidResult<()> {
        self.send(DeviceCommand::Reset).await.map(|_| ())
    }

    /// Poll for input. Returns the update report if the device has one.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    pub async fn poll(&mut self) -> HidResult<Option<RawReport>> {
        let packet = DeviceCommand::Update.encode();
        let reply = self.transport.transact(&packet).await?;
        Ok(is_update_report(&reply).then_some(reply))
    }

    /// Access the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
