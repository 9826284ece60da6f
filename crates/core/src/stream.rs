//! Resumable write stream
//!
//! Binds an [`UploadSession`] to a transport and tracks the acknowledged
//! offset. The cached offset is only authoritative right after
//! [`UploadStream::synchronize`].

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::session::UploadSession;
use crate::traits::TusTransport;

/// Write side of one upload
pub struct UploadStream<'a, T: TusTransport + ?Sized> {
    transport: &'a T,
    session: UploadSession,
    offset: u64,
}

impl<'a, T: TusTransport + ?Sized> UploadStream<'a, T> {
    /// Open a stream for a freshly created session, starting at offset 0
    pub fn new(transport: &'a T, session: UploadSession) -> Self {
        Self {
            transport,
            session,
            offset: 0,
        }
    }

    /// Refresh the cached offset from the server
    pub async fn synchronize(&mut self) -> Result<u64> {
        let offset = self.transport.upload_offset(self.session.id()).await?;
        if offset > self.session.declared_size() {
            return Err(Error::InvalidResponse(format!(
                "server reports offset {offset} beyond declared size {}",
                self.session.declared_size()
            )));
        }
        if offset != self.offset {
            debug!(
                upload_id = %self.session.id(),
                cached = self.offset,
                server = offset,
                "Offset resynchronized"
            );
        }
        self.offset = offset;
        Ok(offset)
    }

    /// Cached acknowledged offset
    pub fn tell(&self) -> u64 {
        self.offset
    }

    /// Bytes the server still needs
    pub fn remaining(&self) -> u64 {
        self.session.declared_size() - self.offset
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    /// Send bytes at the cached offset
    ///
    /// Returns how many bytes the server accepted, which may be fewer than
    /// `data.len()`; the caller resends the rest.
    pub async fn write(&mut self, data: Bytes) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let len = data.len() as u64;
        if len > self.remaining() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "{len} bytes at offset {} exceed declared size {}",
                    self.offset,
                    self.session.declared_size()
                ),
            )));
        }

        let new_offset = self
            .transport
            .patch(self.session.id(), self.offset, data)
            .await?;

        if new_offset <= self.offset || new_offset > self.offset + len {
            return Err(Error::InvalidResponse(format!(
                "server moved offset from {} to {new_offset} after {len} bytes",
                self.offset
            )));
        }

        let accepted = new_offset - self.offset;
        trace!(upload_id = %self.session.id(), offset = new_offset, accepted, "Chunk accepted");
        self.offset = new_offset;
        Ok(accepted as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UploadMetadata;
    use crate::traits::MockTusTransport;

    async fn session(transport: &MockTusTransport, size: u64) -> UploadSession {
        UploadSession::create(transport, "a.bin", size, UploadMetadata::new())
            .await
            .unwrap()
    }

    fn transport_with_upload() -> MockTusTransport {
        let mut transport = MockTusTransport::new();
        transport
            .expect_create_upload()
            .returning(|_, _| Ok("u1".to_string()));
        transport
    }

    #[tokio::test]
    async fn test_synchronize_updates_cached_offset() {
        let mut transport = transport_with_upload();
        transport
            .expect_upload_offset()
            .withf(|id| id == "u1")
            .times(1)
            .returning(|_| Ok(7));

        let session = session(&transport, 10).await;
        let mut stream = UploadStream::new(&transport, session);
        assert_eq!(stream.tell(), 0);

        assert_eq!(stream.synchronize().await.unwrap(), 7);
        assert_eq!(stream.tell(), 7);
        assert_eq!(stream.remaining(), 3);
    }

    #[tokio::test]
    async fn test_synchronize_rejects_offset_beyond_size() {
        let mut transport = transport_with_upload();
        transport.expect_upload_offset().returning(|_| Ok(11));

        let session = session(&transport, 10).await;
        let mut stream = UploadStream::new(&transport, session);

        let err = stream.synchronize().await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        assert_eq!(stream.tell(), 0);
    }

    #[tokio::test]
    async fn test_write_advances_offset() {
        let mut transport = transport_with_upload();
        transport
            .expect_patch()
            .withf(|id, offset, data| id == "u1" && *offset == 0 && data.len() == 4)
            .times(1)
            .returning(|_, _, _| Ok(4));

        let session = session(&transport, 10).await;
        let mut stream = UploadStream::new(&transport, session);

        let accepted = stream.write(Bytes::from_static(b"abcd")).await.unwrap();
        assert_eq!(accepted, 4);
        assert_eq!(stream.tell(), 4);
    }

    #[tokio::test]
    async fn test_write_partial_acceptance() {
        let mut transport = transport_with_upload();
        transport.expect_patch().returning(|_, offset, _| Ok(offset + 2));

        let session = session(&transport, 10).await;
        let mut stream = UploadStream::new(&transport, session);

        let accepted = stream.write(Bytes::from_static(b"abcd")).await.unwrap();
        assert_eq!(accepted, 2);
        assert_eq!(stream.tell(), 2);
    }

    #[tokio::test]
    async fn test_write_keeps_offset_on_checksum_mismatch() {
        let mut transport = transport_with_upload();
        transport
            .expect_patch()
            .returning(|_, _, _| Err(Error::ChecksumMismatch("sha256".into())));

        let session = session(&transport, 10).await;
        let mut stream = UploadStream::new(&transport, session);

        let err = stream.write(Bytes::from_static(b"abcd")).await.unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch(_)));
        assert_eq!(stream.tell(), 0);
    }

    #[tokio::test]
    async fn test_write_past_declared_size_is_local_error() {
        let mut transport = transport_with_upload();
        transport.expect_patch().never();

        let session = session(&transport, 3).await;
        let mut stream = UploadStream::new(&transport, session);

        let err = stream.write(Bytes::from_static(b"abcd")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_write_rejects_offset_going_backwards() {
        let mut transport = transport_with_upload();
        transport.expect_patch().returning(|_, _, _| Ok(0));

        let session = session(&transport, 10).await;
        let mut stream = UploadStream::new(&transport, session);

        let err = stream.write(Bytes::from_static(b"ab")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_write_empty_is_noop() {
        let mut transport = transport_with_upload();
        transport.expect_patch().never();

        let session = session(&transport, 10).await;
        let mut stream = UploadStream::new(&transport, session);
        assert_eq!(stream.write(Bytes::new()).await.unwrap(), 0);
    }
}
