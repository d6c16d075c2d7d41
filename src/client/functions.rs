// Function-call negotiation
// Author: kelexine (https://github.com/kelexine)

use super::{GenerativeClient, RequestContext};
use crate::error::{ClientError, Result};
use crate::models::gemini::{
    Content, FunctionCall, FunctionCallingConfig, FunctionDeclaration, FunctionResponse,
    GenerateContentRequest, GenerateContentResponse, Part, Tool, ToolConfig,
};
use crate::models::options::RequestOptions;
use serde_json::Value;
use tracing::debug;

/// JSON-Schema keywords the function-calling schema subset rejects.
const UNSUPPORTED_SCHEMA_KEYS: &[&str] = &[
    "$schema",
    "$id",
    "$ref",
    "$comment",
    "definitions",
    "$defs",
    "additionalProperties",
    "additionalItems",
    "patternProperties",
    "propertyNames",
    "unevaluatedProperties",
    "default",
    "examples",
    "const",
    "contentMediaType",
    "contentEncoding",
];

impl GenerativeClient {
    /// Offer `functions` to the model and return the call it chose.
    ///
    /// Neither a missing candidate nor a text-only answer is retried; they are
    /// surfaced as [`ClientError::NoCandidate`] and [`ClientError::NoFunctionCall`].
    pub async fn execute_function_call(
        &self,
        prompt: &str,
        functions: &[FunctionDeclaration],
        options: &RequestOptions,
    ) -> Result<FunctionCall> {
        let ctx = RequestContext::new("executeFunctionCall", prompt, options);

        let result = if functions.is_empty() {
            Err(ClientError::InvalidRequest(
                "executeFunctionCall requires at least one function declaration".into(),
            ))
        } else {
            match self.ensure_alive() {
                Ok(()) => {
                    let mut request = self.build_request(prompt, options);
                    attach_tools(&mut request, functions, options);
                    self.call_tools(&request, options)
                        .await
                        .and_then(|response| extract_function_call(&response).cloned())
                }
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(call) => {
                debug!("Model requested function '{}' [{}]", call.name, ctx.request_id);
                Ok(call)
            }
            Err(e) => {
                self.report(&e, &ctx);
                Err(e)
            }
        }
    }

    /// Continue a tool conversation with the caller's function result.
    ///
    /// The request is `options.history` followed by a model-role turn carrying
    /// `response`. Tools in `options.functions` are attached again so the model
    /// may chain another call. Never cached.
    pub async fn send_function_response(
        &self,
        response: FunctionResponse,
        options: &RequestOptions,
    ) -> Result<GenerateContentResponse> {
        let ctx = RequestContext::new("sendFunctionResponse", &response.name, options);

        let result = match self.ensure_alive() {
            Ok(()) => {
                let mut request = self.build_request("", options);
                request.contents.push(Content::model(vec![Part::FunctionResponse {
                    function_response: response,
                }]));
                if !options.functions.is_empty() {
                    attach_tools(&mut request, &options.functions, options);
                }
                self.call_tools(&request, options).await
            }
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            self.report(&e, &ctx);
            e
        })
    }

    async fn call_tools(
        &self,
        request: &GenerateContentRequest,
        options: &RequestOptions,
    ) -> Result<GenerateContentResponse> {
        let model = self.resolve_model(options);
        let transport = &self.inner.transport;
        self.call_guarded("function_call", || transport.generate(&model, request))
            .await
    }
}

fn attach_tools(
    request: &mut GenerateContentRequest,
    functions: &[FunctionDeclaration],
    options: &RequestOptions,
) {
    let function_declarations = functions
        .iter()
        .map(|function| FunctionDeclaration {
            name: function.name.clone(),
            description: function.description.clone(),
            parameters: function.parameters.clone().map(sanitize_parameters),
        })
        .collect();

    request.tools = Some(vec![Tool {
        function_declarations,
    }]);
    request.tool_config = options
        .function_calling_mode
        .as_ref()
        .map(|mode| ToolConfig {
            function_calling_config: FunctionCallingConfig {
                mode: mode.to_ascii_uppercase(),
                allowed_function_names: None,
            },
        });
}

/// First function-call part of the first candidate.
pub(crate) fn extract_function_call(response: &GenerateContentResponse) -> Result<&FunctionCall> {
    let candidate = response.first_candidate().ok_or(ClientError::NoCandidate)?;
    candidate
        .content
        .function_call()
        .ok_or(ClientError::NoFunctionCall)
}

/// Strip schema keywords the API rejects.
///
/// Keys directly under `properties` are user-chosen property names, so a
/// property called `default` survives while the keyword does not.
pub fn sanitize_parameters(schema: Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !UNSUPPORTED_SCHEMA_KEYS.contains(&key.as_str()))
                .map(|(key, value)| {
                    let value = match (key.as_str(), value) {
                        ("properties", Value::Object(props)) => Value::Object(
                            props
                                .into_iter()
                                .map(|(name, prop)| (name, sanitize_parameters(prop)))
                                .collect(),
                        ),
                        (_, other) => sanitize_parameters(other),
                    };
                    (key, value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_parameters).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gemini::Candidate;
    use serde_json::json;

    #[test]
    fn test_sanitize_parameters_nested() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "default": {"type": "string", "default": "x"},
                "tags": {
                    "type": "array",
                    "items": {"type": "string", "$ref": "#/defs/tag"}
                }
            },
            "required": ["default"]
        });

        let clean = sanitize_parameters(schema);
        assert!(clean.get("$schema").is_none());
        assert!(clean.get("additionalProperties").is_none());
        assert_eq!(clean["properties"]["default"], json!({"type": "string"}));
        assert_eq!(clean["properties"]["tags"]["items"], json!({"type": "string"}));
        assert_eq!(clean["required"], json!(["default"]));
    }

    #[test]
    fn test_extract_function_call() {
        let empty = GenerateContentResponse::default();
        assert!(matches!(extract_function_call(&empty), Err(ClientError::NoCandidate)));

        let text_only = GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content::model(vec![Part::text("no tools needed")]),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(extract_function_call(&text_only), Err(ClientError::NoFunctionCall)));

        let with_call = GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content::model(vec![
                    Part::text("let me check"),
                    Part::FunctionCall {
                        function_call: FunctionCall {
                            name: "get_weather".into(),
                            args: json!({"city": "Lagos"}),
                        },
                        thought_signature: None,
                    },
                ]),
                ..Default::default()
            }],
            ..Default::default()
        };
        let call = extract_function_call(&with_call).unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.args["city"], "Lagos");
    }

    #[test]
    fn test_attach_tools_sets_mode() {
        let mut request = GenerateContentRequest::default();
        let functions = vec![FunctionDeclaration::new("lookup", "Look something up")
            .with_parameters(json!({"type": "object", "$id": "x"}))];
        attach_tools(&mut request, &functions, &RequestOptions::new().function_calling_mode("any"));

        let tools = request.tools.unwrap();
        assert_eq!(tools[0].function_declarations[0].parameters, Some(json!({"type": "object"})));
        assert_eq!(request.tool_config.unwrap().function_calling_config.mode, "ANY");
    }
}
