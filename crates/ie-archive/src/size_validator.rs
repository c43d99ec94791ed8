use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::{error, info, warn};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

const READ_CHUNK_BYTES: usize = 64 * 1024;

enum Outcome {
    Finished(u64),
    CeilingExceeded(u64),
    TimedOut(u64),
    Cancelled(u64),
    Failed(String),
}

/// Streams an archive through `gzip -dc` and counts the output.
///
/// Nothing is written to disk. The decompressor runs in its own process
/// group so the whole group can be killed when the ceiling, the timeout
/// or the cancellation token trips.
pub struct DecompressedSizeValidator {
    max_bytes: Option<u64>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl DecompressedSizeValidator {
    pub fn new(max_bytes: Option<u64>, timeout: Duration) -> Self {
        Self {
            max_bytes,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// False when the archive decompresses past the ceiling, takes too long,
    /// is cancelled or cannot be decompressed at all. Never raises.
    pub async fn is_valid(&self, archive: &Path) -> bool {
        let Some(max_bytes) = self.max_bytes else {
            info!("Decompressed size check disabled: no ceiling configured");
            return true;
        };

        match self.measure(archive, max_bytes).await {
            Outcome::Finished(bytes) => {
                info!(
                    "Decompressed archive size: {} bytes (limit {} bytes)",
                    bytes, max_bytes
                );
                true
            }
            Outcome::CeilingExceeded(bytes) => {
                warn!(
                    "Decompressed archive size limit reached: {} bytes observed, limit {} bytes",
                    bytes, max_bytes
                );
                false
            }
            Outcome::TimedOut(bytes) => {
                warn!(
                    "Timeout reached during archive decompression after {:?}: {} bytes observed",
                    self.timeout, bytes
                );
                false
            }
            Outcome::Cancelled(bytes) => {
                warn!(
                    "Archive decompression cancelled: {} bytes observed",
                    bytes
                );
                false
            }
            Outcome::Failed(message) => {
                error!("Archive decompression failed: {}", message);
                false
            }
        }
    }

    async fn measure(&self, archive: &Path, max_bytes: u64) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled(0);
        }

        let mut cmd = Command::new("gzip");
        cmd.arg("-dc")
            .arg(archive)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return Outcome::Failed(format!("failed to spawn gzip: {}", e)),
        };
        let Some(mut stdout) = child.stdout.take() else {
            kill_group(&mut child);
            return Outcome::Failed("gzip stdout was not captured".into());
        };

        let mut bytes: u64 = 0;
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                read = stdout.read(&mut buf) => match read {
                    Ok(0) => break None,
                    Ok(n) => {
                        bytes = bytes.saturating_add(n as u64);
                        if bytes > max_bytes {
                            break Some(Outcome::CeilingExceeded(bytes));
                        }
                    }
                    Err(e) => break Some(Outcome::Failed(format!("reading gzip output: {}", e))),
                },
                _ = &mut deadline => break Some(Outcome::TimedOut(bytes)),
                _ = self.cancel.cancelled() => break Some(Outcome::Cancelled(bytes)),
            }
        };

        if let Some(aborted) = outcome {
            kill_group(&mut child);
            let _ = child.wait().await;
            return aborted;
        }

        match child.wait().await {
            Ok(status) if status.success() => Outcome::Finished(bytes),
            Ok(status) => Outcome::Failed(format!("gzip exited with {}", status)),
            Err(e) => Outcome::Failed(format!("waiting for gzip: {}", e)),
        }
    }
}

/// SIGKILL the decompressor's whole process group.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Some(pid) = child.id()
            && let Ok(pid) = i32::try_from(pid)
        {
            killpg(Pid::from_raw(pid), Signal::SIGKILL).ok();
        }
    }

    child.start_kill().ok();
}
