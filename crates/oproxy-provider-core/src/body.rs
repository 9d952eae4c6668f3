use std::fmt;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;

pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

type ReleaseFn = Box<dyn FnOnce() -> io::Result<()> + Send>;

/// An upstream response body: a chunked byte stream plus the routine that
/// releases the underlying connection.
///
/// Whoever consumes the body calls [`BodyRelease::release`] exactly once,
/// whatever way the read ended.
pub struct UpstreamBody {
    stream: ByteStream,
    release: ReleaseFn,
}

impl UpstreamBody {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
            release: Box::new(|| Ok(())),
        }
    }

    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() -> io::Result<()> + Send + 'static,
    {
        self.release = Box::new(release);
        self
    }

    pub fn into_parts(self) -> (ByteStream, BodyRelease) {
        (self.stream, BodyRelease(self.release))
    }
}

impl fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamBody").finish_non_exhaustive()
    }
}

pub struct BodyRelease(ReleaseFn);

impl BodyRelease {
    pub fn release(self) -> io::Result<()> {
        (self.0)()
    }
}

impl fmt::Debug for BodyRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BodyRelease")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::StreamExt;
    use futures_util::stream;

    use super::*;

    #[tokio::test]
    async fn parts_yield_stream_and_release() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let body = UpstreamBody::new(stream::iter(vec![Ok(Bytes::from_static(b"abc"))]))
            .with_release(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        let (mut stream, release) = body.into_parts();
        assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from_static(b"abc"));
        assert!(stream.next().await.is_none());
        release.release().unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
