// Stream chunk types delivered by generate_stream
// Author: kelexine (https://github.com/kelexine)

use super::gemini::FunctionCall;
use serde::{Deserialize, Serialize};

/// One unit of a streamed response.
///
/// Every stream ends with exactly one chunk where `is_complete` is true, and
/// that chunk is always the last one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChunkMetadata>,
}

/// Completion details attached to the terminal chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Default::default()
        }
    }

    pub fn complete(metadata: ChunkMetadata) -> Self {
        Self {
            is_complete: true,
            metadata: Some(metadata),
            ..Default::default()
        }
    }
}
