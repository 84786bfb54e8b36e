//! Bounded remote fetch.
//!
//! Streams an HTTP(S) response while tracking a running total; the moment
//! the total crosses the cap the transfer is abandoned with
//! [`MediaError::PayloadTooLarge`], bounding memory and bandwidth against
//! hostile or oversized sources. A Content-Length that already exceeds the
//! cap short-circuits before any body bytes move.

use crate::errors::{MediaError, MediaResult};
use crate::services::hashing::HashingReader;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt;
use std::time::Duration;

/// Result of a successful bounded fetch.
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub bytes: Bytes,
    /// MD5 hex digest computed while the body streamed in.
    pub hash: String,
    /// Content-Type from the response headers, if present.
    pub content_type: Option<String>,
}

/// HTTP fetcher with a per-request size cap.
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    client: reqwest::Client,
}

impl MediaFetcher {
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| MediaError::Fetch(format!("building HTTP client: {err}")))?;
        Ok(Self { client })
    }

    /// Fetch `url`, failing with `PayloadTooLarge` as soon as the body
    /// exceeds `max_bytes`. No partial payload is ever returned.
    pub async fn fetch(&self, url: &str, max_bytes: u64) -> MediaResult<FetchedPayload> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        if let Some(length) = response.content_length() {
            if length > max_bytes {
                return Err(MediaError::PayloadTooLarge {
                    size: length,
                    max: max_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut reader = HashingReader::new(Box::pin(response.bytes_stream()));
        let body = collect_limited(&mut reader, max_bytes).await?;

        Ok(FetchedPayload {
            bytes: Bytes::from(body),
            hash: reader.digest(),
            content_type,
        })
    }
}

/// Accumulate a chunk stream, enforcing the cap on the running total.
/// Returning early drops the stream, which releases the connection.
async fn collect_limited<S, E>(stream: &mut S, max_bytes: u64) -> MediaResult<Vec<u8>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: fmt::Display,
{
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| MediaError::Fetch(err.to_string()))?;
        let total = body.len() as u64 + chunk.len() as u64;
        if total > max_bytes {
            return Err(MediaError::PayloadTooLarge {
                size: total,
                max: max_bytes,
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn chunks(sizes: &[usize]) -> Vec<Result<Bytes, Infallible>> {
        sizes
            .iter()
            .map(|&n| Ok(Bytes::from(vec![1u8; n])))
            .collect()
    }

    #[tokio::test]
    async fn cap_is_enforced_mid_stream() {
        let mut stream = stream::iter(chunks(&[400, 400, 400]));
        let err = collect_limited(&mut stream, 1000).await.unwrap_err();
        assert!(matches!(
            err,
            MediaError::PayloadTooLarge { size: 1200, max: 1000 }
        ));
    }

    #[tokio::test]
    async fn payload_at_exactly_the_cap_passes() {
        let mut stream = stream::iter(chunks(&[500, 500]));
        let body = collect_limited(&mut stream, 1000).await.unwrap();
        assert_eq!(body.len(), 1000);
    }

    /// Serve one canned HTTP/1.1 response, then close.
    async fn one_shot_server(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            use tokio::io::AsyncReadExt;
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
        });
        format!("http://{}/img.png", addr)
    }

    #[tokio::test]
    async fn fetch_returns_bytes_and_digest() {
        let payload = b"not really a png".to_vec();
        let url = one_shot_server(payload.clone()).await;

        let fetcher = MediaFetcher::new(Duration::from_secs(5)).unwrap();
        let fetched = fetcher.fetch(&url, 1024).await.unwrap();

        assert_eq!(fetched.bytes.as_ref(), payload.as_slice());
        assert_eq!(fetched.hash, format!("{:x}", md5::compute(&payload)));
        assert_eq!(fetched.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn oversized_content_length_fails_before_body() {
        let url = one_shot_server(vec![0u8; 2048]).await;
        let fetcher = MediaFetcher::new(Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch(&url, 100).await.unwrap_err();
        assert!(matches!(err, MediaError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn http_errors_surface_as_fetch_failures() {
        let fetcher = MediaFetcher::new(Duration::from_millis(500)).unwrap();
        // nothing listens here
        let err = fetcher.fetch("http://127.0.0.1:9/none.png", 1024).await.unwrap_err();
        assert!(matches!(err, MediaError::Fetch(_)));
    }
}
