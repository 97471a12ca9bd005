//! Reader endpoint
//!
//! A [`CastReader`] is one fan-out endpoint of a
//! [`ReadCaster`](crate::ReadCaster). It implements [`AsyncRead`] over the
//! chunks the pump delivers to its inbox, with ordinary sequential-read
//! semantics: short reads are allowed, every read returns at least one byte
//! unless the stream has ended, and EOF is only reported once every
//! delivered byte has been handed to the caller.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

use crate::caster::{ReaderSlot, Shared};
use crate::error::CastError;

/// One independent reader over a caster's source.
///
/// The first read on any reader launches the caster's pump; from then on
/// each reader pulls chunks from its own bounded inbox at its own pace.
/// A reader that was evicted for stalling fails with
/// [`io::ErrorKind::TimedOut`] instead of reporting EOF.
pub struct CastReader {
    shared: Arc<Shared>,
    inbox: mpsc::Receiver<Bytes>,
    /// Most recently dequeued chunk, partially consumed. Never touched by
    /// the pump.
    pending: Bytes,
    slot: Arc<ReaderSlot>,
}

impl CastReader {
    pub(crate) fn new(
        shared: Arc<Shared>,
        inbox: mpsc::Receiver<Bytes>,
        slot: Arc<ReaderSlot>,
    ) -> Self {
        Self {
            shared,
            inbox,
            pending: Bytes::new(),
            slot,
        }
    }

    fn evicted_error() -> io::Error {
        io::Error::new(io::ErrorKind::TimedOut, CastError::ReaderEvicted)
    }
}

impl AsyncRead for CastReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        // the pump starts lazily on the first read from any reader
        this.shared.start();

        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if this.pending.is_empty() {
            // staged bytes always drain first; past this point an evicted
            // reader fails instead of handing out stale inbox backlog
            if this.slot.is_timed_out() {
                return Poll::Ready(Err(Self::evicted_error()));
            }
            match this.inbox.poll_recv(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(chunk)) => this.pending = chunk,
                Poll::Ready(None) => {
                    // eviction closes the inbox too; tell it apart from EOF
                    if this.slot.is_timed_out() {
                        return Poll::Ready(Err(Self::evicted_error()));
                    }
                    return Poll::Ready(Ok(()));
                }
            }
        }

        let n = this.pending.len().min(buf.remaining());
        buf.put_slice(&this.pending.split_to(n));
        Poll::Ready(Ok(()))
    }
}

impl std::fmt::Debug for CastReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CastReader")
            .field("staged_bytes", &self.pending.len())
            .field("evicted", &self.slot.is_timed_out())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::io::AsyncReadExt;

    use crate::{CasterConfig, ReadCaster};

    #[tokio::test]
    async fn test_short_reads_walk_through_a_chunk() {
        let config = CasterConfig::default().chunk_size(8);
        let caster =
            ReadCaster::with_config(Cursor::new(b"abcdefgh".to_vec()), config).unwrap();
        let mut reader = caster.new_reader().unwrap();

        // destination smaller than the staged chunk: served from the front,
        // remainder stays staged
        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf, b"abc");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf, b"def");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"gh");

        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_destination_larger_than_chunk() {
        let config = CasterConfig::default().chunk_size(4);
        let caster =
            ReadCaster::with_config(Cursor::new(b"abcdefgh".to_vec()), config).unwrap();
        let mut reader = caster.new_reader().unwrap();

        // a read never spans chunks: a big destination still gets at most
        // one staged chunk per call
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf[..4], b"abcd");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf[..4], b"efgh");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_destination_consumes_nothing() {
        let caster = ReadCaster::new(Cursor::new(b"abc".to_vec()));
        let mut reader = caster.new_reader().unwrap();

        let mut empty = [0u8; 0];
        assert_eq!(reader.read(&mut empty).await.unwrap(), 0);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"abc");
    }
}
