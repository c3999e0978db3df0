//! rigctld extended response parsing.
//!
//! With the `+` prefix rigctld answers every command with an echo line,
//! zero or more `Key: value` lines, and a terminating `RPRT <code>` line:
//!
//! ```text
//! get_freq:
//! Frequency: 146520000
//! RPRT 0
//! ```

use crate::error::{RigError, RigResult};

/// Prefix of the line that terminates every response.
pub const TERMINATOR: &str = "RPRT";

/// Field name of the frequency in a `+f` response.
pub const FIELD_FREQUENCY: &str = "Frequency";

/// A successful rigctld response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RigResponse {
    /// First line of the response, echoing the command context
    pub echo: String,
    /// Fields in the order the daemon sent them
    pub fields: Vec<(String, String)>,
}

impl RigResponse {
    /// Parse a complete response to `command`.
    ///
    /// Lines without a `:` separator are skipped. The first line is the echo
    /// unless it is already the terminator.
    ///
    /// # Errors
    /// Returns [`RigError::ReturnCode`] for a nonzero return code and
    /// [`RigError::Protocol`] if the terminator is missing or unparsable.
    pub fn parse(command: &str, text: &str) -> RigResult<Self> {
        let mut lines = text.lines().peekable();
        // A bare terminator leaves the echo empty
        let echo = lines.next_if(|line| !is_terminator(line)).unwrap_or_default().to_string();
        let mut fields = Vec::new();

        for line in lines {
            if let Some(code) = line.strip_prefix(TERMINATOR) {
                let code: i32 = code.trim().parse().map_err(|_| {
                    RigError::Protocol(format!("invalid return code line {line:?}"))
                })?;
                if code != 0 {
                    return Err(RigError::ReturnCode { command: command.to_string(), code });
                }
                return Ok(Self { echo, fields });
            }

            if let Some((key, value)) = line.split_once(':') {
                fields.push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        Err(RigError::Protocol(format!("response to {command:?} has no {TERMINATOR} line")))
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// The `Frequency` field in hertz.
    ///
    /// # Errors
    /// Returns [`RigError::Protocol`] if the field is absent or not a number.
    pub fn frequency(&self) -> RigResult<i64> {
        let value = self
            .get(FIELD_FREQUENCY)
            .ok_or_else(|| RigError::Protocol(format!("missing {FIELD_FREQUENCY} field")))?;
        parse_hz(value)
            .ok_or_else(|| RigError::Protocol(format!("invalid {FIELD_FREQUENCY} value {value:?}")))
    }
}

/// Whether a received line terminates a response.
#[must_use]
pub fn is_terminator(line: &str) -> bool {
    line.starts_with(TERMINATOR)
}

#[allow(clippy::cast_possible_truncation)]
fn parse_hz(value: &str) -> Option<i64> {
    if let Ok(hz) = value.parse::<i64>() {
        return Some(hz);
    }
    // Some backends print the frequency with a fractional part
    let hz = value.parse::<f64>().ok()?;
    (hz.is_finite() && hz.abs() < 9.0e18).then(|| hz.round() as i64)
}
