//! Remote image probing by streamed header decode.
//!
//! The response body is read chunk by chunk. After each chunk the bytes seen
//! so far are handed to the `image` crate's format sniffing and header
//! decoder; as soon as dimensions come back the response is dropped, which
//! closes the connection. A body that ends (or hits the byte cap) before the
//! header is decodable leaves only that image unresolved.

use super::probe::{Dimensions, ProbeError};
use std::io::Cursor;
use std::time::Duration;

/// Streaming header reader with a per-request timeout and a byte cap.
pub struct RemoteProbe {
    client: reqwest::Client,
    max_bytes: usize,
}

impl RemoteProbe {
    pub fn new(timeout_ms: u64, max_bytes: usize) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self::with_client(client, max_bytes))
    }

    pub fn with_client(client: reqwest::Client, max_bytes: usize) -> Self {
        Self { client, max_bytes }
    }

    pub async fn dimensions(&self, url: &str) -> Option<Dimensions> {
        let mut response = match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::debug!(url, status = %resp.status(), "image probe rejected");
                return None;
            }
            Err(err) => {
                tracing::debug!(url, error = %err, "image probe failed");
                return None;
            }
        };

        let mut buf: Vec<u8> = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    buf.extend_from_slice(&chunk);
                    if let Some(dims) = decode_header(&buf) {
                        tracing::debug!(url, bytes = buf.len(), "image header decoded");
                        return Some(dims);
                    }
                    if buf.len() >= self.max_bytes {
                        tracing::debug!(url, bytes = buf.len(), "image probe byte cap reached");
                        return None;
                    }
                }
                Ok(None) => return None,
                Err(err) => {
                    tracing::debug!(url, error = %err, "image probe stream failed");
                    return None;
                }
            }
        }
    }
}

/// Try to read dimensions from a (possibly truncated) image prefix.
pub fn decode_header(bytes: &[u8]) -> Option<Dimensions> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    reader.format()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some(Dimensions { width, height })
}
