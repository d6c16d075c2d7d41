// Streaming generation
// Author: kelexine (https://github.com/kelexine)

use super::{instrumented, GenerativeClient, RequestContext};
use crate::error::Result;
use crate::metrics;
use crate::models::gemini::{GenerateContentResponse, Part};
use crate::models::options::RequestOptions;
use crate::models::streaming::{ChunkMetadata, StreamChunk};
use crate::utils::retry::with_retry;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use tracing::debug;

/// Chunks of one `generate_stream` call.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

impl GenerativeClient {
    /// Stream a generation as [`StreamChunk`]s.
    ///
    /// Nothing happens until the stream is polled. One admission permit is
    /// held from the first poll until the stream ends or is dropped. Retries
    /// only cover opening the upstream stream; an error after the first byte
    /// is yielded once and ends the stream.
    ///
    /// A stream that ends normally yields exactly one chunk with
    /// `is_complete == true`, and it is the last one.
    pub fn generate_stream(&self, prompt: &str, options: &RequestOptions) -> ChunkStream {
        let client = self.clone();
        let ctx = RequestContext::new("generateStream", prompt, options);
        let model = self.resolve_model(options);
        let request = self.build_request(prompt, options);

        Box::pin(async_stream::stream! {
            if let Err(e) = client.ensure_alive() {
                client.report(&e, &ctx);
                yield Err(e);
                return;
            }

            // Released on every exit path, including the consumer dropping us
            let _permit = match client.inner.gate.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    client.report(&e, &ctx);
                    yield Err(e);
                    return;
                }
            };

            let transport = client.inner.transport.clone();
            let opened = with_retry(
                "stream",
                &client.inner.retry_policy,
                Some(client.inner.request_timeout),
                || instrumented("stream", transport.stream(&model, &request)),
            )
            .await;

            let mut upstream = match opened {
                Ok(upstream) => upstream,
                Err(e) => {
                    client.report(&e, &ctx);
                    yield Err(e);
                    return;
                }
            };

            debug!("Stream opened for {} [{}]", model, ctx.request_id);
            let mut metadata = ChunkMetadata::default();

            while let Some(item) = upstream.next().await {
                let response = match item {
                    Ok(response) => response,
                    Err(e) => {
                        metrics::record_stream_chunk("error");
                        client.report(&e, &ctx);
                        yield Err(e);
                        return;
                    }
                };

                for chunk in chunks_from(response, &mut metadata) {
                    metrics::record_stream_chunk(if chunk.text.is_some() { "text" } else { "function_call" });
                    yield Ok(chunk);
                }
            }

            metrics::record_stream_chunk("complete");
            debug!(
                "Stream complete [{}]: finish_reason={:?}, tokens={:?}",
                ctx.request_id, metadata.finish_reason, metadata.token_count
            );
            yield Ok(StreamChunk::complete(metadata));
        })
    }
}

/// Turn one upstream response into delta chunks, folding its finish reason
/// and token usage into `metadata`.
fn chunks_from(response: GenerateContentResponse, metadata: &mut ChunkMetadata) -> Vec<StreamChunk> {
    if let Some(usage) = &response.usage_metadata {
        if let Some(count) = usage.total_token_count.or(usage.candidates_token_count) {
            metadata.token_count = Some(count);
        }
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Vec::new();
    };
    if candidate.finish_reason.is_some() {
        metadata.finish_reason = candidate.finish_reason;
    }

    candidate
        .content
        .parts
        .into_iter()
        .filter_map(|part| match part {
            Part::Text { text, thought } if thought != Some(true) && !text.is_empty() => {
                Some(StreamChunk::text(text))
            }
            Part::FunctionCall { function_call, .. } => Some(StreamChunk::function_call(function_call)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gemini::{Candidate, Content, FunctionCall, UsageMetadata};
    use serde_json::json;

    fn response(parts: Vec<Part>, finish: Option<&str>, tokens: Option<u32>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content::model(parts),
                finish_reason: finish.map(str::to_string),
                ..Default::default()
            }],
            usage_metadata: tokens.map(|total| UsageMetadata {
                total_token_count: Some(total),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_thoughts_and_empty_text_skipped() {
        let mut metadata = ChunkMetadata::default();
        let parts = vec![
            Part::Text {
                text: "planning".into(),
                thought: Some(true),
            },
            Part::text(""),
            Part::text("Hello"),
        ];
        let chunks = chunks_from(response(parts, None, None), &mut metadata);
        assert_eq!(chunks, vec![StreamChunk::text("Hello")]);
        assert_eq!(metadata, ChunkMetadata::default());
    }

    #[test]
    fn test_metadata_folded_across_responses() {
        let mut metadata = ChunkMetadata::default();
        chunks_from(response(vec![Part::text("a")], None, Some(3)), &mut metadata);
        let call = Part::FunctionCall {
            function_call: FunctionCall {
                name: "search".into(),
                args: json!({}),
            },
            thought_signature: None,
        };
        let chunks = chunks_from(response(vec![call], Some("STOP"), Some(9)), &mut metadata);

        assert_eq!(chunks[0].function_call.as_ref().unwrap().name, "search");
        assert_eq!(metadata.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(metadata.token_count, Some(9));
    }
}
