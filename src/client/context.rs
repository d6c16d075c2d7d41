// Per-call context and error observer hook
// Author: kelexine (https://github.com/kelexine)

use crate::error::ClientError;
use crate::models::options::{GenerationOptions, RequestOptions};
use crate::utils::logging::sanitize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};

/// Describes one public call; used for error reporting and discarded afterwards.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub operation: &'static str,
    pub prompt: String,
    pub options: GenerationOptions,
    pub request_id: String,
}

impl RequestContext {
    pub fn new(operation: &'static str, prompt: &str, options: &RequestOptions) -> Self {
        Self {
            operation,
            prompt: prompt.to_string(),
            options: options.generation.clone(),
            request_id: options
                .request_id
                .clone()
                .unwrap_or_else(|| format!("req_{}", uuid::Uuid::new_v4().simple())),
        }
    }
}

/// Receives a best-effort notification for every failed call and every
/// swallowed cache failure.
pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, error: &ClientError, context: &RequestContext);
}

impl<F> ErrorObserver for F
where
    F: Fn(&ClientError, &RequestContext) + Send + Sync,
{
    fn on_error(&self, error: &ClientError, context: &RequestContext) {
        self(error, context)
    }
}

/// Log the failure and notify the observer. A panicking observer is contained
/// here so it can never replace the error being reported.
pub(crate) fn report(observer: Option<&Arc<dyn ErrorObserver>>, err: &ClientError, ctx: &RequestContext) {
    error!(
        "{} failed [{}] ({}): {}",
        ctx.operation,
        ctx.request_id,
        err.kind(),
        sanitize(&err.to_string())
    );

    if let Some(observer) = observer {
        if catch_unwind(AssertUnwindSafe(|| observer.on_error(err, ctx))).is_err() {
            warn!("Error observer panicked while handling {}", ctx.request_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_request_id_generated_when_absent() {
        let ctx = RequestContext::new("generateText", "hi", &RequestOptions::default());
        assert!(ctx.request_id.starts_with("req_"));

        let ctx = RequestContext::new("generateText", "hi", &RequestOptions::new().request_id("abc"));
        assert_eq!(ctx.request_id, "abc");
    }

    #[test]
    fn test_panicking_observer_is_contained() {
        let observer: Arc<dyn ErrorObserver> =
            Arc::new(|_: &ClientError, _: &RequestContext| panic!("observer bug"));
        let ctx = RequestContext::new("generateText", "hi", &RequestOptions::default());
        report(Some(&observer), &ClientError::NoCandidate, &ctx);
    }

    #[test]
    fn test_closure_observer_receives_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: Arc<dyn ErrorObserver> = Arc::new(move |e: &ClientError, ctx: &RequestContext| {
            sink.lock().push((e.kind(), ctx.operation));
        });
        let ctx = RequestContext::new("executeFunctionCall", "hi", &RequestOptions::default());
        report(Some(&observer), &ClientError::NoFunctionCall, &ctx);
        assert_eq!(*seen.lock(), vec![("no_function_call", "executeFunctionCall")]);
    }
}
