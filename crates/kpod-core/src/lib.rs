//! KPod Core - report decoding, device commands, and knob state.
//!
//! This crate holds the pure domain logic shared by the device layer and the
//! daemon: decoding raw update reports, encoding device commands, and the
//! per-device tuning state. Nothing in here performs I/O.

pub mod command;
pub mod error;
pub mod report;
pub mod state;
pub mod step;

pub use command::{BeepLevel, DeviceCommand, EncoderScale, LedAux, Tone};
pub use error::Error;
pub use report::{InputEvent, RawReport, Rocker, decode};
pub use state::{KnobState, SYNC_INTERVAL, frequency_utterance};
pub use step::StepMultiplier;
