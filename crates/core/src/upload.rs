//! Upload orchestration
//!
//! [`Uploader`] drives a seekable source into an [`UploadStream`]. Before
//! every attempt it asks the server for the acknowledged offset and seeks the
//! source there, so acknowledged bytes are never resent and unacknowledged
//! bytes always are. Failed attempts are retried only when the error is
//! [retryable](Error::is_retryable), with a [`Backoff`] delay in between.

use std::io::SeekFrom;

use bytes::Bytes;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::{debug, error, warn};

use crate::backoff::{Backoff, FixedBackoff};
use crate::error::{Error, Result};
use crate::session::{UploadMetadata, UploadSession};
use crate::stream::UploadStream;
use crate::traits::TusTransport;

/// Default number of attempts per transfer
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default bytes read from the source per PATCH request: 8 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Where a transfer currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    Creating,
    Attempting,
    Retrying,
    Succeeded,
    Failed,
}

/// Summary of a completed transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    /// Server-assigned upload id
    pub upload_id: String,

    /// Logical storage path
    pub path: String,

    /// Total bytes stored on the server
    pub size_bytes: u64,

    /// Human-readable size
    pub size_human: String,

    /// Attempts used, including the successful one
    pub attempts: u32,

    pub completed_at: jiff::Timestamp,
}

type ProgressFn = Box<dyn Fn(u64) + Send + Sync>;

/// Resumable uploader with bounded retries
pub struct Uploader<'a, T: TusTransport + ?Sized> {
    transport: &'a T,
    max_attempts: u32,
    chunk_size: usize,
    backoff: Box<dyn Backoff>,
    progress: Option<ProgressFn>,
    state: UploadState,
}

impl<'a, T: TusTransport + ?Sized> Uploader<'a, T> {
    /// Create an uploader with default attempts, chunk size and backoff
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            backoff: Box::new(FixedBackoff::default()),
            progress: None,
            state: UploadState::Idle,
        }
    }

    /// Total attempts per transfer; 0 makes every transfer fail validation
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// Called with the acknowledged offset after every sync and write
    pub fn on_progress(mut self, progress: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Upload `size` bytes from `source` to the logical `path`
    ///
    /// A fresh session is created for every call. Creation failures are
    /// returned unchanged; permanent attempt failures are returned unchanged;
    /// a spent attempt budget yields [`Error::AttemptsExhausted`].
    pub async fn transfer<R>(
        &mut self,
        path: &str,
        source: &mut R,
        size: u64,
        metadata: UploadMetadata,
    ) -> Result<TransferReport>
    where
        R: AsyncRead + AsyncSeek + Unpin + ?Sized,
    {
        self.set_state(UploadState::Idle);

        if self.max_attempts == 0 {
            self.set_state(UploadState::Failed);
            return Err(Error::Validation(
                "Maximum attempts must be at least 1".into(),
            ));
        }

        self.set_state(UploadState::Creating);
        let session = match UploadSession::create(self.transport, path, size, metadata).await {
            Ok(session) => session,
            Err(err) => {
                self.set_state(UploadState::Failed);
                error!(path, error = %err, "Failed to create upload");
                return Err(err);
            }
        };

        let mut stream = UploadStream::new(self.transport, session);
        let mut buffer = vec![0u8; self.chunk_size.min(usize::try_from(size).unwrap_or(usize::MAX))];
        let mut remaining = self.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.set_state(UploadState::Attempting);

            let err = match self.attempt(&mut stream, source, &mut buffer).await {
                Ok(()) => {
                    self.set_state(UploadState::Succeeded);
                    return Ok(TransferReport {
                        upload_id: stream.session().id().to_string(),
                        path: path.to_string(),
                        size_bytes: size,
                        size_human: humansize::format_size(size, humansize::BINARY),
                        attempts: attempt,
                        completed_at: jiff::Timestamp::now(),
                    });
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                self.set_state(UploadState::Failed);
                error!(path, attempt, error = %err, "Upload failed permanently");
                return Err(err);
            }

            remaining -= 1;
            warn!(
                path,
                attempt,
                remaining,
                offset = stream.tell(),
                error = %err,
                "Upload attempt failed"
            );

            if remaining == 0 {
                self.set_state(UploadState::Failed);
                return Err(Error::AttemptsExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            self.set_state(UploadState::Retrying);
            let delay = self.backoff.delay(attempt);
            debug!(path, ?delay, "Waiting before retry");
            tokio::time::sleep(delay).await;
        }
    }

    /// One synchronize, seek and copy pass; each step short-circuits on failure
    async fn attempt<R>(
        &self,
        stream: &mut UploadStream<'_, T>,
        source: &mut R,
        buffer: &mut [u8],
    ) -> Result<()>
    where
        R: AsyncRead + AsyncSeek + Unpin + ?Sized,
    {
        let offset = stream.synchronize().await?;
        self.report(offset);

        source.seek(SeekFrom::Start(offset)).await?;

        while !stream.is_complete() {
            let want = buffer
                .len()
                .min(usize::try_from(stream.remaining()).unwrap_or(usize::MAX));
            let read = read_full(source, &mut buffer[..want]).await?;
            if read == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "source ended at byte {} of {}",
                        stream.tell(),
                        stream.session().declared_size()
                    ),
                )));
            }

            let mut chunk = Bytes::copy_from_slice(&buffer[..read]);
            while !chunk.is_empty() {
                let accepted = stream.write(chunk.clone()).await?;
                chunk = chunk.slice(accepted..);
                self.report(stream.tell());
            }
        }

        Ok(())
    }

    fn report(&self, offset: u64) {
        if let Some(progress) = &self.progress {
            progress(offset);
        }
    }

    fn set_state(&mut self, state: UploadState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Upload state changed");
            self.state = state;
        }
    }
}

/// Read until `buf` is full or the source is exhausted
async fn read_full<R>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
