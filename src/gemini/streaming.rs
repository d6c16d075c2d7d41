// Gemini SSE stream parsing
// Author: kelexine (https://github.com/kelexine)

use crate::error::{ClientError, Result};
use crate::models::gemini::GenerateContentResponse;
use bytes::Bytes;
use futures::stream::Stream;
use tracing::{debug, warn};

/// Parse an SSE byte stream into GenerateContentResponse chunks.
///
/// Bytes are buffered until a blank line closes an event, so multi-byte
/// characters split across network chunks are decoded intact. A transport
/// error is yielded once and ends the stream.
pub fn parse_sse_stream<S, E>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    use futures::StreamExt;

    async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();

        futures::pin_mut!(byte_stream);

        while let Some(chunk_result) = byte_stream.next().await {
            match chunk_result {
                Ok(chunk) => {
                    debug!("Received SSE chunk: {} bytes", chunk.len());
                    buffer.extend_from_slice(&chunk);

                    // Process complete events (ends with a blank line)
                    while let Some((event_end, delimiter_len)) = find_event_boundary(&buffer) {
                        let event_bytes: Vec<u8> = buffer.drain(..event_end + delimiter_len).collect();
                        let event_data = String::from_utf8_lossy(&event_bytes[..event_end]);

                        if let Some(response) = parse_sse_event(&event_data) {
                            yield Ok(response);
                        }
                    }
                }
                Err(e) => {
                    let error: ClientError = e.into();
                    warn!("Stream error: {}", error);
                    yield Err(error);
                    return;
                }
            }
        }

        // This handles cases where the final event doesn't have a trailing blank line
        let remainder = String::from_utf8_lossy(&buffer);
        if !remainder.trim().is_empty() {
            debug!("Processing remaining buffer: {} chars", remainder.len());
            if let Some(response) = parse_sse_event(&remainder) {
                yield Ok(response);
            }
        }

        debug!("Gemini SSE stream ended");
    }
}

/// Locate the first event delimiter (`\n\n` or `\r\n\r\n`); returns its
/// offset and length.
fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Parse a single SSE event into GenerateContentResponse.
///
/// Multiple `data:` lines are joined with newlines. Some proxies wrap the
/// payload in a `{"response": {...}}` envelope, which is unwrapped.
pub(crate) fn parse_sse_event(event_data: &str) -> Option<GenerateContentResponse> {
    let data: Vec<&str> = event_data
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data).trim_end_matches('\r'))
        .collect();

    if data.is_empty() {
        return None;
    }
    let data = data.join("\n");

    // Skip empty data or "[DONE]" marker
    if data.trim().is_empty() || data.trim() == "[DONE]" {
        debug!("Skipping empty or DONE marker");
        return None;
    }

    let parsed: serde_json::Value = match serde_json::from_str(&data) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse SSE JSON: {}", e);
            debug!("Raw data: {}", data.chars().take(200).collect::<String>());
            return None;
        }
    };

    let response_data = match parsed {
        serde_json::Value::Object(mut map) if map.contains_key("response") && !map.contains_key("candidates") => {
            map.remove("response").unwrap_or_default()
        }
        other => other,
    };

    match serde_json::from_value::<GenerateContentResponse>(response_data) {
        Ok(response) => Some(response),
        Err(e) => {
            warn!("Failed to convert to GenerateContentResponse: {}", e);
            None
        }
    }
}
