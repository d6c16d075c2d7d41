//! Data models for the Gemini API and the client surface.
//!
//! This module contains the type definitions for:
//! - The upstream Gemini REST API (`gemini`)
//! - Chunks produced by streaming generation (`streaming`)
//! - Per-call request options (`options`)

// Author: kelexine (https://github.com/kelexine)

pub mod gemini;
pub mod options;
pub mod streaming;

pub use gemini::{
    Candidate, Content, FunctionCall, FunctionDeclaration, FunctionResponse,
    GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
    UsageMetadata,
};
pub use options::{GenerationOptions, RequestOptions};
pub use streaming::{ChunkMetadata, StreamChunk};
