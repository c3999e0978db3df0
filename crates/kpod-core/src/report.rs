//! Update report decoding.
//!
//! The KPod answers every command with an 8-byte report. For update reports
//! the layout is:
//!
//! | Byte | Meaning |
//! |------|---------|
//! | 0    | command echo (`'u'`) |
//! | 1-2  | encoder ticks, signed 16-bit little endian |
//! | 3    | bits 0-3 button, bit 4 hold, bits 5-6 rocker |
//! | 4-7  | spare |

/// Length of every report and command packet exchanged with the device.
pub const REPORT_LEN: usize = 8;

/// A raw report as delivered by the device.
pub type RawReport = [u8; REPORT_LEN];

const BUTTON_MASK: u8 = 0x0f;
const HOLD_MASK: u8 = 0x10;
const ROCKER_MASK: u8 = 0x60;
const ROCKER_SHIFT: u8 = 5;

/// Position of the three-way rocker switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rocker {
    #[default]
    Center,
    Right,
    Left,
    /// Both rocker bits set. The switch cannot physically be in this state.
    Error,
}

impl Rocker {
    fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Center,
            1 => Self::Right,
            2 => Self::Left,
            _ => Self::Error,
        }
    }
}

/// A decoded update report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputEvent {
    /// Encoder ticks since the previous report (negative is counter-clockwise)
    pub rotation_delta: i16,
    /// Button id, 0 when no button is pressed
    pub button: u8,
    /// Whether the button is held rather than tapped
    pub hold: bool,
    /// Rocker switch position
    pub rocker: Rocker,
}

/// Decode a raw update report.
///
/// Pure and total: every byte combination maps to exactly one event.
#[must_use]
pub fn decode(report: &RawReport) -> InputEvent {
    let controls = report[3];
    InputEvent {
        rotation_delta: i16::from_le_bytes([report[1], report[2]]),
        button: controls & BUTTON_MASK,
        hold: controls & HOLD_MASK != 0,
        rocker: Rocker::from_code((controls & ROCKER_MASK) >> ROCKER_SHIFT),
    }
}
