// gemguard - Resilient Gemini client with caching, admission control and retries
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod limiter;
pub mod metrics;
pub mod models;
pub mod utils;

pub use client::{ClientBuilder, ClientStats, ErrorObserver, GenerativeClient, RequestContext};
pub use error::{ClientError, Result};
pub use models::options::RequestOptions;
