use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use super::{CaptureError, FrameSource};
use crate::frame::Frame;

const BOUNDARY: &[u8] = b"--frame\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Parse state for the MJPEG multipart stream.
enum ParseState {
    /// Looking for the boundary marker `--frame\r\n`.
    SeekingBoundary,
    /// Found boundary, now looking for end of headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next boundary.
    CollectingJpeg,
}

/// Incremental splitter for `multipart/x-mixed-replace` bodies.
pub struct MultipartParser {
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
}

impl MultipartParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Returns the next complete JPEG body, if the buffer holds one.
    pub fn next_jpeg(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, BOUNDARY) {
                        let _ = self.buffer.split_to(pos + BOUNDARY.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep the tail in case the boundary spans chunks
                        if self.buffer.len() > BOUNDARY.len() {
                            let _ = self.buffer.split_to(self.buffer.len() - BOUNDARY.len());
                        }
                        return None;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    let pos = find_subsequence(&self.buffer, HEADER_END)?;
                    let _ = self.buffer.split_to(pos + HEADER_END.len());
                    self.jpeg_start = 0;
                    self.state = ParseState::CollectingJpeg;
                }
                ParseState::CollectingJpeg => {
                    let Some(pos) = find_subsequence(&self.buffer[self.jpeg_start..], BOUNDARY)
                    else {
                        // Skip already-scanned bytes on the next call
                        self.jpeg_start = self.buffer.len().saturating_sub(BOUNDARY.len());
                        return None;
                    };

                    let jpeg_end = self.jpeg_start + pos;
                    // Strip trailing \r\n before boundary
                    let end = if jpeg_end >= 2
                        && self.buffer[jpeg_end - 2] == b'\r'
                        && self.buffer[jpeg_end - 1] == b'\n'
                    {
                        jpeg_end - 2
                    } else {
                        jpeg_end
                    };
                    let jpeg_data = self.buffer[..end].to_vec();
                    let _ = self.buffer.split_to(jpeg_end + BOUNDARY.len());
                    self.state = ParseState::SeekingHeaderEnd;

                    if !jpeg_data.is_empty() {
                        return Some(jpeg_data);
                    }
                }
            }
        }
    }
}

impl Default for MultipartParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera exposed as an HTTP MJPEG stream.
///
/// The stream ending or erroring is a capture failure; there is no reconnect.
pub struct MjpegSource {
    url: String,
    stream: Option<ByteStream>,
    parser: MultipartParser,
    frames: u64,
}

impl MjpegSource {
    pub async fn connect(url: &str) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(CaptureError::HttpConnect)?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(CaptureError::HttpConnect)?;

        if !response.status().is_success() {
            return Err(CaptureError::HttpStatus(response.status().as_u16()));
        }

        info!(url, status = %response.status(), "connected to MJPEG stream");

        Ok(Self {
            url: url.to_string(),
            stream: Some(Box::pin(response.bytes_stream())),
            parser: MultipartParser::new(),
            frames: 0,
        })
    }
}

#[async_trait]
impl FrameSource for MjpegSource {
    async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            if let Some(jpeg) = self.parser.next_jpeg() {
                match image::load_from_memory(&jpeg) {
                    Ok(img) => {
                        self.frames += 1;
                        debug!(frames = self.frames, bytes = jpeg.len(), "MJPEG frame decoded");
                        return Some(Frame::new(img.to_rgb8()));
                    }
                    Err(e) => {
                        warn!(error = %e, bytes = jpeg.len(), "failed to decode MJPEG part, skipping");
                        continue;
                    }
                }
            }

            let stream = self.stream.as_mut()?;
            match stream.next().await {
                Some(Ok(chunk)) => self.parser.push(&chunk),
                Some(Err(e)) => {
                    error!(error = %e, url = self.url, "MJPEG stream error");
                    self.stream = None;
                    return None;
                }
                None => {
                    warn!(url = self.url, frames = self.frames, "MJPEG stream ended");
                    self.stream = None;
                    return None;
                }
            }
        }
    }

    fn release(&mut self) {
        self.stream = None;
        info!(url = self.url, frames = self.frames, "MJPEG stream released");
    }

    fn name(&self) -> &str {
        "mjpeg"
    }
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(BOUNDARY);
        out.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        out.extend_from_slice(body);
        out.extend_from_slice(b"\r\n");
        out
    }

    #[test]
    fn splits_consecutive_parts() {
        let mut parser = MultipartParser::new();
        let mut body = part(b"first");
        body.extend(part(b"second"));
        body.extend_from_slice(BOUNDARY);
        parser.push(&body);

        assert_eq!(parser.next_jpeg().as_deref(), Some(&b"first"[..]));
        assert_eq!(parser.next_jpeg().as_deref(), Some(&b"second"[..]));
        assert_eq!(parser.next_jpeg(), None);
    }

    #[test]
    fn part_split_across_chunks() {
        let mut parser = MultipartParser::new();
        let mut body = part(b"0123456789");
        body.extend_from_slice(BOUNDARY);

        let (a, b) = body.split_at(body.len() / 2);
        parser.push(a);
        assert_eq!(parser.next_jpeg(), None);
        parser.push(b);
        assert_eq!(parser.next_jpeg().as_deref(), Some(&b"0123456789"[..]));
    }

    #[test]
    fn leading_garbage_is_discarded() {
        let mut parser = MultipartParser::new();
        let mut body = b"HTTP preamble junk".to_vec();
        body.extend(part(b"jpeg"));
        body.extend_from_slice(BOUNDARY);
        parser.push(&body);
        assert_eq!(parser.next_jpeg().as_deref(), Some(&b"jpeg"[..]));
    }

    #[test]
    fn incomplete_part_waits_for_boundary() {
        let mut parser = MultipartParser::new();
        parser.push(&part(b"partial"));
        assert_eq!(parser.next_jpeg(), None);
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        image::RgbImage::from_pixel(width, height, image::Rgb([120, 120, 120]))
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Jpeg)
            .unwrap();
        out
    }

    /// Serve one multipart response with `body`, then close the connection.
    async fn serve_once(body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while find_subsequence(&request, HEADER_END).is_none() {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = "HTTP/1.1 200 OK\r\n\
                        Content-Type: multipart/x-mixed-replace; boundary=frame\r\n\
                        Connection: close\r\n\r\n";
            stream.write_all(head.as_bytes()).await.unwrap();
            stream.write_all(&body).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        format!("http://{addr}/stream")
    }

    #[tokio::test]
    async fn corrupt_part_skipped_and_stream_end_is_capture_failure() {
        let mut body = part(&jpeg(8, 6));
        body.extend(part(b"definitely not a jpeg"));
        body.extend(part(&jpeg(16, 12)));
        body.extend_from_slice(BOUNDARY);
        let url = serve_once(body).await;

        let mut source = MjpegSource::connect(&url).await.unwrap();
        let first = source.next_frame().await.unwrap();
        assert_eq!(first.image.dimensions(), (8, 6));
        let second = source.next_frame().await.unwrap();
        assert_eq!(second.image.dimensions(), (16, 12));
        assert!(source.next_frame().await.is_none());
        assert!(source.next_frame().await.is_none(), "stays failed after the end");
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = MjpegSource::connect(&format!("http://{addr}/stream")).await;
        assert!(matches!(result, Err(CaptureError::HttpConnect(_))));
    }

    #[test]
    fn find_subsequence_positions() {
        assert_eq!(find_subsequence(b"abcdef", b"cd"), Some(2));
        assert_eq!(find_subsequence(b"abcdef", b"xy"), None);
        assert_eq!(find_subsequence(b"ab", b"abc"), None);
    }
}
