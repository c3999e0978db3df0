//! Linux hidraw transport.
//!
//! The KPod exposes a single unnumbered report, so a command is written to
//! the hidraw node as the raw 8-byte packet and the reply is read back the
//! same way.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

use kpod_core::RawReport;
use kpod_core::report::REPORT_LEN;
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tracing::info;

use crate::device::Transport;
use crate::error::{HidError, HidResult};

/// How long to wait for the device to answer a command.
pub const REPLY_TIMEOUT: Duration = Duration::from_millis(20);

/// Transport over a `/dev/hidrawN` node.
pub struct HidrawTransport {
    fd: AsyncFd<File>,
}

impl HidrawTransport {
    /// Open the hidraw node at `path`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the node does not exist, is not accessible, or
    /// cannot be registered with the runtime.
    pub fn open(path: &Path) -> HidResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => HidError::DeviceNotFound(path.display().to_string()),
                ErrorKind::PermissionDenied => HidError::PermissionDenied(path.display().to_string()),
                _ => HidError::IoError(e),
            })?;
        let fd = AsyncFd::new(file)?;
        info!(path = %path.display(), "Opened hidraw device");
        Ok(Self { fd })
    }
}

impl Transport for HidrawTransport {
    async fn transact(&mut self, packet: &[u8; REPORT_LEN]) -> HidResult<RawReport> {
        let sent = self.fd.async_io(Interest::WRITABLE, |mut file| file.write(packet)).await?;
        if sent != REPORT_LEN {
            return Err(HidError::ShortWrite { sent, expected: REPORT_LEN });
        }

        let mut reply = [0u8; REPORT_LEN];
        let got = tokio::time::timeout(
            REPLY_TIMEOUT,
            self.fd.async_io(Interest::READABLE, |mut file| file.read(&mut reply)),
        )
        .await
        .map_err(|_| HidError::Timeout)??;
        if got != REPORT_LEN {
            return Err(HidError::ShortRead { got, expected: REPORT_LEN });
        }
        Ok(reply)
    }
}
