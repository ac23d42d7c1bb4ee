use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use serde_json::json;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// A pass-through byte stream, as produced by the transport or supplied by
/// an uploader
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Wrap an in-memory buffer as a single-chunk stream
pub fn once(data: impl Into<Bytes>) -> ByteStream {
    stream::once(futures::future::ready(Ok::<Bytes, io::Error>(data.into()))).boxed()
}

/// Drain a byte stream into one buffer
pub async fn collect(stream: ByteStream) -> io::Result<Bytes> {
    let buf = stream
        .try_fold(BytesMut::new(), |mut buf, chunk| async move {
            buf.extend_from_slice(&chunk);
            Ok(buf)
        })
        .await?;
    Ok(buf.freeze())
}

/// Streaming body of a downloaded file.
///
/// Nothing is buffered: the caller either consumes the stream or drops it
/// to cancel the transfer.
pub struct DownloadStream {
    inner: ByteStream,
    /// Content length, when the remote reported one
    size: Option<u64>,
}

impl DownloadStream {
    pub fn new(inner: ByteStream, size: Option<u64>) -> Self {
        DownloadStream { inner, size }
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn into_inner(self) -> ByteStream {
        self.inner
    }

    /// Adapt into a tokio reader (e.g. for `tokio::io::copy`)
    pub fn into_async_read(self) -> impl AsyncRead + Send + Unpin {
        StreamReader::new(self.inner)
    }

    /// Read the whole body into memory
    pub async fn collect_bytes(self) -> io::Result<Bytes> {
        collect(self.inner).await
    }
}

impl Stream for DownloadStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for DownloadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadStream")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Multipart upload body: a JSON `attributes` part naming the file and its
/// parent folder, plus one binary `file` part
pub struct FormDataStream {
    attributes: String,
    file_name: String,
    file: ByteStream,
}

impl FormDataStream {
    pub fn new(name: &str, parent_id: &str, file: ByteStream) -> Self {
        let attributes = json!({
            "name": name,
            "parent": {"id": parent_id},
        })
        .to_string();

        FormDataStream {
            attributes,
            file_name: name.to_string(),
            file,
        }
    }

    pub fn attributes(&self) -> &str {
        &self.attributes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn into_parts(self) -> (String, String, ByteStream) {
        (self.attributes, self.file_name, self.file)
    }
}

impl std::fmt::Debug for FormDataStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormDataStream")
            .field("attributes", &self.attributes)
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn chunked() -> ByteStream {
        stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"box")),
        ])
        .boxed()
    }

    #[tokio::test]
    async fn test_collect_joins_chunks() {
        let body = DownloadStream::new(chunked(), Some(9));
        assert_eq!(body.size(), Some(9));
        assert_eq!(&body.collect_bytes().await.unwrap()[..], b"hello box");
    }

    #[tokio::test]
    async fn test_async_read_adapter() {
        let mut reader = DownloadStream::new(chunked(), None).into_async_read();
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello box");
    }

    #[tokio::test]
    async fn test_stream_error_surfaces() {
        let failing: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::other("connection reset")),
        ])
        .boxed();
        assert!(collect(failing).await.is_err());
    }

    #[test]
    fn test_form_attributes() {
        let form = FormDataStream::new("report.txt", "0", once("data"));
        let attrs: serde_json::Value = serde_json::from_str(form.attributes()).unwrap();
        assert_eq!(attrs["name"], "report.txt");
        assert_eq!(attrs["parent"]["id"], "0");
        assert_eq!(form.file_name(), "report.txt");
    }
}
