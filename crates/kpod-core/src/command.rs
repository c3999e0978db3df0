//! Device command encoding and reply decoding.
//!
//! Commands are single-byte opcodes followed by opcode-specific parameter
//! bytes, zero padded to [`REPORT_LEN`]. The device answers each command with
//! one report of the same length.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::report::{RawReport, REPORT_LEN};
use crate::step::StepMultiplier;

/// Query the identification string.
pub const OP_IDENTIFY: u8 = 0x3d;
/// Set encoder scale and mute.
pub const OP_CONFIGURE: u8 = 0x43;
/// Set LED and auxiliary output state.
pub const OP_LED_AUX: u8 = 0x4f;
/// Sound the buzzer.
pub const OP_BEEP: u8 = 0x5a;
/// Reset the device.
pub const OP_RESET: u8 = 0x72;
/// Poll for an update report.
pub const OP_UPDATE: u8 = 0x75;
/// Query the firmware version.
pub const OP_VERSION: u8 = 0x76;

/// Buzzer tone. The discriminant is the tone id sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Hz1000 = 0,
    Hz1500 = 1,
    Hz2000 = 2,
    Hz500 = 3,
}

impl Tone {
    /// Feedback tone for a step multiplier, rising with the step size.
    #[must_use]
    pub fn for_step(step: StepMultiplier) -> Self {
        match step {
            StepMultiplier::X1 => Self::Hz500,
            StepMultiplier::X10 => Self::Hz1000,
            StepMultiplier::X100 => Self::Hz1500,
            StepMultiplier::X1000 => Self::Hz2000,
        }
    }
}

/// Buzzer level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BeepLevel {
    Low = 0,
    Medium = 1,
    #[default]
    High = 2,
}

/// Encoder resolution in counts per revolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u16", into = "u16")]
pub enum EncoderScale {
    Counts100,
    #[default]
    Counts200,
}

impl TryFrom<u16> for EncoderScale {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            100 => Ok(Self::Counts100),
            200 => Ok(Self::Counts200),
            other => Err(Error::InvalidScale(other)),
        }
    }
}

impl From<EncoderScale> for u16 {
    fn from(scale: EncoderScale) -> Self {
        match scale {
            EncoderScale::Counts100 => 100,
            EncoderScale::Counts200 => 200,
        }
    }
}

/// LED and auxiliary output state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct LedAux {
    pub led1: bool,
    pub led2: bool,
    pub led3: bool,
    pub led4: bool,
    pub rocker_led: bool,
    pub aux1: bool,
    pub aux2: bool,
    pub aux3: bool,
}

impl LedAux {
    /// Encode as the LED/aux bitfield.
    #[must_use]
    pub fn bits(&self) -> u8 {
        let flags = [
            (self.aux1, 0x01),
            (self.aux2, 0x02),
            (self.aux3, 0x04),
            (self.led1, 0x08),
            (self.led2, 0x10),
            (self.led3, 0x20),
            (self.led4, 0x40),
            (self.rocker_led, 0x80),
        ];
        flags.iter().filter(|(on, _)| *on).fold(0, |acc, (_, bit)| acc | bit)
    }
}

/// A command that can be sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Identify,
    Configure { scale: EncoderScale, mute: bool },
    LedAux(LedAux),
    Beep { tone: Tone, level: BeepLevel, duration: u8 },
    Reset,
    Update,
    Version,
}

impl DeviceCommand {
    /// The opcode byte for this command.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Identify => OP_IDENTIFY,
            Self::Configure { .. } => OP_CONFIGURE,
            Self::LedAux(_) => OP_LED_AUX,
            Self::Beep { .. } => OP_BEEP,
            Self::Reset => OP_RESET,
            Self::Update => OP_UPDATE,
            Self::Version => OP_VERSION,
        }
    }

    /// Encode into a zero-padded command packet.
    #[must_use]
    pub fn encode(&self) -> [u8; REPORT_LEN] {
        let mut packet = [0u8; REPORT_LEN];
        packet[0] = self.opcode();
        match *self {
            Self::Configure { scale, mute } => {
                let scale_bit = if scale == EncoderScale::Counts100 { 0x02 } else { 0x00 };
                packet[1] = scale_bit | u8::from(mute);
            }
            Self::LedAux(leds) => packet[1] = leds.bits(),
            Self::Beep { tone, level, duration } => {
                packet[1] = tone as u8;
                packet[2] = level as u8;
                packet[3] = duration;
            }
            Self::Identify | Self::Reset | Self::Update | Self::Version => {}
        }
        packet
    }
}

/// Whether a reply to [`DeviceCommand::Update`] carries new input.
#[must_use]
pub fn is_update_report(reply: &RawReport) -> bool {
    reply[0] == OP_UPDATE
}

/// Extract the identification string from an identify reply.
///
/// The string starts at byte 1 and ends at the first NUL or the end of the
/// reply.
#[must_use]
pub fn parse_identify(reply: &RawReport) -> String {
    reply[1..]
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

/// Extract the firmware version from a version reply.
///
/// The version is a 16-bit little endian fixed-point value in hundredths,
/// returned as `"major.minor"` text.
#[must_use]
pub fn parse_version(reply: &RawReport) -> String {
    let raw = u16::from_le_bytes([reply[1], reply[2]]);
    format!("{}.{:02}", raw / 100, raw % 100)
}
