use std::fmt::{self, Display};
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use reqwest::Response;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error(pub(crate) String);

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// An adapter for streaming byte chunks.
pub struct Chunks {
    inner: ByteStream,
}

impl Chunks {
    pub fn from_response(response: Response) -> Self {
        Self::from_stream(
            response
                .bytes_stream()
                .map_err(|err| Error(err.to_string())),
        )
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, Error>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    #[cfg(test)]
    pub fn from_static(
        chunks: impl IntoIterator<Item = &'static [u8]>,
    ) -> Self {
        let chunks: Vec<_> =
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))).collect();
        Self::from_stream(futures_util::stream::iter(chunks))
    }

    #[cfg(test)]
    pub fn failing_after(chunks: Vec<&'static [u8]>) -> Self {
        let items = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .chain([Err(Error("connection reset".to_owned()))])
            .collect::<Vec<_>>();
        Self::from_stream(futures_util::stream::iter(items))
    }

    /// Returns the next chunk, or `None` once the body is exhausted.
    #[inline]
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        self.inner.next().await.transpose()
    }
}
