//! Spoken frequency announcements.
//!
//! Announcing is fire-and-forget: the knob never waits for speech to finish
//! and a failing speech command does not affect tuning.

use tokio::process::Command;
use tracing::{debug, info, warn};

/// A sink for text to be spoken.
pub trait Announcer {
    /// Speak `text` without blocking the caller.
    fn announce(&self, text: &str);
}

/// Announces by running an external program with the text as its last
/// argument, or by logging when no program is configured.
pub struct CommandAnnouncer {
    argv: Vec<String>,
}

impl CommandAnnouncer {
    /// Create an announcer running `argv` (program followed by arguments).
    #[must_use]
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl Announcer for CommandAnnouncer {
    fn announce(&self, text: &str) {
        let Some((program, args)) = self.argv.split_first() else {
            info!(text, "Frequency");
            return;
        };

        let mut child = match Command::new(program).args(args).arg(text).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program, error = %e, "Failed to start announce command");
                return;
            }
        };

        let program = program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!(program = %program, "Announce command finished"),
                Ok(status) => warn!(program = %program, %status, "Announce command failed"),
                Err(e) => warn!(program = %program, error = %e, "Announce command failed"),
            }
        });
    }
}
