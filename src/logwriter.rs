//! Asynchronous, single-writer-per-file log fan-in.
//!
//! Any number of producers can `send` lines concurrently; they're
//! serialised onto an unbounded channel drained by one background task per
//! file. `wait` closes the channel and blocks until the writer has flushed
//! and closed the file, surfacing the first I/O error it hit rather than
//! aborting the process.

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::LoadError;

/// A running log-writer task plus the handles needed to feed it and to
/// wait for it to finish.
pub struct LogWriter {
    sender: mpsc::UnboundedSender<String>,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl LogWriter {
    /// Open `path` (append, create-if-missing) and start its background
    /// writer task. Parent directories are expected to already exist —
    /// callers create the log folder tree up front via `create_dir_all`.
    pub async fn start(path: impl Into<String>) -> Result<Self, LoadError> {
        let path = path.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await
            .map_err(|e| LoadError::LogIo(format!("{path}: {e}")))?;

        let task = tokio::spawn(async move {
            while let Some(line) = receiver.recv().await {
                file.write_all(line.as_bytes()).await?;
                file.write_all(b"\n").await?;
            }
            file.flush().await?;
            Ok(())
        });

        Ok(Self { sender, task })
    }

    /// Enqueue a line; fire-and-forget from the caller's point of view.
    /// Silently dropped if the writer has already stopped (e.g. it failed
    /// to open the file) — the failure itself surfaces from `wait`.
    pub fn send(&self, data: String) {
        let _ = self.sender.send(data);
    }

    /// Close the channel and block until the writer has flushed and closed
    /// the file, returning its first I/O error if any.
    pub async fn wait(self) -> Result<(), LoadError> {
        drop(self.sender);
        self.task
            .await
            .map_err(|e| LoadError::LogIo(format!("log writer task panicked: {e}")))?
            .map_err(|e| LoadError::LogIo(e.to_string()))
    }
}
