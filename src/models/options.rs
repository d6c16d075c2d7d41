// Per-call request options
// Author: kelexine (https://github.com/kelexine)

use super::gemini::{Content, FunctionDeclaration, InlineData};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generation parameters that override the client defaults for one call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

/// Options accepted by every public client operation.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub generation: GenerationOptions,
    /// `Some(false)` bypasses the response cache for this call.
    pub cache: Option<bool>,
    /// TTL for the entry written back by this call.
    pub cache_ttl: Option<Duration>,
    /// Correlation id; generated when absent.
    pub request_id: Option<String>,
    /// Prior conversation turns sent before the prompt.
    pub history: Vec<Content>,
    /// Inline attachments appended to the prompt turn.
    pub attachments: Vec<InlineData>,
    /// Function calling mode for tool turns ("AUTO", "ANY", "NONE").
    pub function_calling_mode: Option<String>,
    /// Tools re-attached when continuing a function-call conversation.
    pub functions: Vec<FunctionDeclaration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.generation.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.generation.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.generation.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.generation.top_k = Some(top_k);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.generation.top_p = Some(top_p);
        self
    }

    pub fn stop_sequences(mut self, stops: Vec<String>) -> Self {
        self.generation.stop_sequences = Some(stops);
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.generation.system_instruction = Some(instruction.into());
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = Some(enabled);
        self
    }

    pub fn no_cache(self) -> Self {
        self.cache(false)
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    pub fn attachment(mut self, data: InlineData) -> Self {
        self.attachments.push(data);
        self
    }

    pub fn function_calling_mode(mut self, mode: impl Into<String>) -> Self {
        self.function_calling_mode = Some(mode.into());
        self
    }

    pub fn functions(mut self, functions: Vec<FunctionDeclaration>) -> Self {
        self.functions = functions;
        self
    }
}
