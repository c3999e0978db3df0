//! Tuning step multiplier.

/// Factor applied to encoder ticks to produce a frequency change in hertz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepMultiplier {
    #[default]
    X1,
    X10,
    X100,
    X1000,
}

impl StepMultiplier {
    /// The multiplier as a number.
    #[must_use]
    pub fn factor(self) -> i64 {
        match self {
            Self::X1 => 1,
            Self::X10 => 10,
            Self::X100 => 100,
            Self::X1000 => 1000,
        }
    }

    /// The next coarser step, saturating at 1000.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::X1 => Self::X10,
            Self::X10 => Self::X100,
            Self::X100 | Self::X1000 => Self::X1000,
        }
    }
}
