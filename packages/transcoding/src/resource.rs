//! Chunked readers over a served resource: a file on disk or a running
//! transcoder.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt as _;
use thiserror::Error;
use tokio::io::{AsyncReadExt as _, AsyncSeekExt as _};
use tokio_util::io::ReaderStream;

use crate::{
    BytesStream,
    range::{Range, UnsatisfiableRangeError},
    transcoder::{TranscodeError, Transcoder},
};

pub const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Range(#[from] UnsatisfiableRangeError),
}

#[async_trait]
pub trait ResourceHandler: Send {
    /// Next chunk of the resource, `None` once everything was read.
    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ResourceError>;

    fn mime_type(&self) -> &str;

    /// Bytes that will be served, when known or estimated.
    fn content_length(&self) -> Option<u64>;

    fn finished(&mut self) -> bool;
}

/// Serves a file, or a byte range of it.
pub struct FileResourceHandler {
    mime_type: String,
    size: u64,
    range: Option<(u64, u64)>,
    reader: ReaderStream<tokio::io::Take<tokio::fs::File>>,
    remaining: u64,
}

impl std::fmt::Debug for FileResourceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileResourceHandler")
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .field("range", &self.range)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl FileResourceHandler {
    /// # Errors
    ///
    /// * If the file cannot be opened or seeked
    /// * If the range is not satisfiable for the file's size
    pub async fn open(
        path: &Path,
        mime_type: impl Into<String>,
        range: Option<Range>,
    ) -> Result<Self, ResourceError> {
        let mut file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();

        let range = range.map(|x| x.resolve(size)).transpose()?;
        let (first, last) = match range {
            Some(range) => range,
            None if size == 0 => (0, 0),
            None => (0, size - 1),
        };
        let remaining = if size == 0 { 0 } else { last - first + 1 };

        if first > 0 {
            file.seek(std::io::SeekFrom::Start(first)).await?;
        }

        log::debug!(
            "FileResourceHandler::open: path={} size={size} range={range:?}",
            path.display()
        );

        Ok(Self {
            mime_type: mime_type.into(),
            size,
            range,
            reader: ReaderStream::with_capacity(file.take(remaining), CHUNK_SIZE),
            remaining,
        })
    }

    /// Total size of the file.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Served byte range, inclusive, when a range was requested.
    #[must_use]
    pub const fn range(&self) -> Option<(u64, u64)> {
        self.range
    }
}

#[async_trait]
impl ResourceHandler for FileResourceHandler {
    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ResourceError> {
        let Some(bytes) = self.reader.next().await.transpose()? else {
            self.remaining = 0;
            return Ok(None);
        };

        self.remaining = self.remaining.saturating_sub(bytes.len() as u64);

        Ok(Some(bytes))
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.range.map_or(self.size, |(first, last)| last - first + 1))
    }

    fn finished(&mut self) -> bool {
        self.remaining == 0
    }
}

/// Serves the output of a running transcoder.
#[derive(Debug)]
pub struct TranscodeResourceHandler {
    transcoder: Transcoder,
    estimated_content_length: Option<u64>,
    buf: Vec<u8>,
    done: bool,
}

impl TranscodeResourceHandler {
    #[must_use]
    pub fn new(transcoder: Transcoder, estimated_content_length: Option<u64>) -> Self {
        Self {
            transcoder,
            estimated_content_length,
            buf: vec![0; CHUNK_SIZE],
            done: false,
        }
    }

    #[must_use]
    pub const fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }
}

#[async_trait]
impl ResourceHandler for TranscodeResourceHandler {
    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ResourceError> {
        if self.done {
            return Ok(None);
        }

        let count = self.transcoder.read_some(&mut self.buf).await?;
        if count == 0 {
            log::debug!(
                "[{}] TranscodeResourceHandler: end of stream",
                self.transcoder.debug_id()
            );
            self.done = true;
            return Ok(None);
        }

        Ok(Some(Bytes::copy_from_slice(&self.buf[..count])))
    }

    fn mime_type(&self) -> &str {
        self.transcoder.output_mime_type()
    }

    fn content_length(&self) -> Option<u64> {
        self.estimated_content_length
    }

    fn finished(&mut self) -> bool {
        self.done
    }
}

/// Adapts a resource handler to a byte stream for the HTTP layer. A read
/// error ends the stream after being yielded.
#[must_use]
pub fn into_byte_stream(handler: Box<dyn ResourceHandler>) -> BytesStream {
    Box::pin(futures::stream::unfold(Some(handler), |handler| async move {
        let mut handler = handler?;

        match handler.read_chunk().await {
            Ok(Some(bytes)) => Some((Ok(bytes), Some(handler))),
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to read resource: {e:?}");
                Some((Err(std::io::Error::other(e)), None))
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use futures::TryStreamExt as _;
    use pretty_assertions::assert_eq;

    use super::*;

    fn file_with(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    async fn read_all(handler: Box<dyn ResourceHandler>) -> Vec<u8> {
        into_byte_stream(handler)
            .try_fold(vec![], |mut acc, bytes| async move {
                acc.extend_from_slice(&bytes);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn serves_whole_file() {
        let file = file_with(b"0123456789");
        let mut handler = FileResourceHandler::open(file.path(), "audio/flac", None)
            .await
            .unwrap();

        assert_eq!(handler.content_length(), Some(10));
        assert_eq!(handler.mime_type(), "audio/flac");
        assert!(!handler.finished());

        assert_eq!(read_all(Box::new(handler)).await, b"0123456789");
    }

    #[test_log::test(tokio::test)]
    async fn serves_requested_range() {
        let file = file_with(b"0123456789");
        let mut handler = FileResourceHandler::open(
            file.path(),
            "audio/mpeg",
            Some(Range {
                start: Some(2),
                end: Some(5),
            }),
        )
        .await
        .unwrap();

        assert_eq!(handler.range(), Some((2, 5)));
        assert_eq!(handler.size(), 10);
        assert_eq!(handler.content_length(), Some(4));
        assert_eq!(
            handler.read_chunk().await.unwrap(),
            Some(Bytes::from_static(b"2345"))
        );
        assert_eq!(handler.read_chunk().await.unwrap(), None);
        assert!(handler.finished());
    }

    #[test_log::test(tokio::test)]
    async fn serves_suffix_range() {
        let file = file_with(b"0123456789");
        let handler = FileResourceHandler::open(
            file.path(),
            "audio/mpeg",
            Some(Range {
                start: None,
                end: Some(3),
            }),
        )
        .await
        .unwrap();

        assert_eq!(read_all(Box::new(handler)).await, b"789");
    }

    #[test_log::test(tokio::test)]
    async fn rejects_unsatisfiable_range() {
        let file = file_with(b"0123456789");

        assert!(matches!(
            FileResourceHandler::open(
                file.path(),
                "audio/mpeg",
                Some(Range {
                    start: Some(10),
                    end: None,
                }),
            )
            .await,
            Err(ResourceError::Range(_))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn missing_file_is_an_io_error() {
        assert!(matches!(
            FileResourceHandler::open(Path::new("/does/not/exist"), "audio/mpeg", None).await,
            Err(ResourceError::IO(_))
        ));
    }
}
