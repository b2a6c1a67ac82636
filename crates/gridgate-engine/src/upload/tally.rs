//! Streaming reader that tallies size and content hash in flight.

use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, ReadBuf};

pin_project! {
    /// Wraps the incoming byte stream and records the SHA-256 digest and
    /// byte count of everything that flows through on its way to the
    /// backend, so the stored-file record carries both without a second
    /// pass over the payload.
    pub struct TallyReader<R> {
        #[pin]
        inner: R,
        hasher: Sha256,
        bytes: u64,
    }
}

impl<R> TallyReader<R> {
    /// Wrap `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    /// Bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }

    /// Consume the reader, returning the hex SHA-256 digest and the byte
    /// count of everything read through it.
    pub fn finalize(self) -> (String, u64) {
        (hex::encode(self.hasher.finalize()), self.bytes)
    }
}

impl<R: AsyncRead> AsyncRead for TallyReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.project();
        let before = buf.filled().len();

        match this.inner.poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let new_bytes = &buf.filled()[before..];
                if !new_bytes.is_empty() {
                    this.hasher.update(new_bytes);
                    *this.bytes += new_bytes.len() as u64;
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn tallies_digest_and_size() {
        let payload = b"Hello, World!";
        let mut reader = TallyReader::new(&payload[..]);

        let mut sink = Vec::new();
        reader.read_to_end(&mut sink).await.unwrap();
        assert_eq!(sink, payload);

        let (digest, bytes) = reader.finalize();
        assert_eq!(bytes, 13);
        // SHA-256 of "Hello, World!"
        assert_eq!(
            digest,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[tokio::test]
    async fn empty_stream_tallies_empty_digest() {
        let reader = TallyReader::new(&[][..] as &[u8]);
        let (digest, bytes) = reader.finalize();

        assert_eq!(bytes, 0);
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn chunked_reads_accumulate() {
        let payload = b"abcdefghij";
        let mut reader = TallyReader::new(&payload[..]);

        let mut buf = [0u8; 3];
        let mut total = 0;
        loop {
            let n = reader.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }

        assert_eq!(total, 10);
        assert_eq!(reader.bytes_read(), 10);
    }
}
