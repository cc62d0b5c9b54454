//! Gemini API client and the gateway seam
//!
//! Every generative call in the assistant goes through [`LlmGateway`]:
//! plain completion, completion with tool calling enabled, and the
//! follow-up turn that feeds a tool result back to the model.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::AssistantError;
use crate::models::{ToolAwareReply, ToolCall, ToolDeclaration};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

/// Seam for the external generative model.
///
/// The orchestrator treats the gateway as best-effort: no retries are
/// issued here and every failure is absorbed by the caller's fallback
/// chain.
#[async_trait::async_trait]
pub trait LlmGateway: Send + Sync {
    /// Plain text completion.
    async fn generate(&self, prompt: &str) -> crate::Result<String>;

    /// Completion with tool calling enabled. The model may answer with
    /// text, or request one of the declared tools.
    async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &[ToolDeclaration],
    ) -> crate::Result<ToolAwareReply>;

    /// Second-turn completion: the original prompt, the model's tool-call
    /// turn, and the executed tool's JSON payload as a function response.
    async fn complete_tool_exchange(
        &self,
        prompt: &str,
        call: &ToolCall,
        tool_result: &Value,
    ) -> crate::Result<String>;
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent".to_string(),
        }
    }

    async fn send(&self, request: &GeminiRequest) -> crate::Result<GeminiResponse> {
        if self.api_key.is_empty() {
            return Err(AssistantError::LlmError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                AssistantError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(AssistantError::LlmError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AssistantError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        if gemini_response.candidates.is_empty() {
            return Err(AssistantError::LlmError(
                "No response from Gemini API".to_string(),
            ));
        }

        Ok(gemini_response)
    }
}

#[async_trait::async_trait]
impl LlmGateway for GeminiClient {
    async fn generate(&self, prompt: &str) -> crate::Result<String> {
        let request = GeminiRequest {
            contents: vec![Content::user_text(prompt)],
            generation_config: GenerationConfig::default(),
            tools: None,
            tool_config: None,
        };

        let response = self.send(&request).await?;
        extract_text(&response)
    }

    async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &[ToolDeclaration],
    ) -> crate::Result<ToolAwareReply> {
        let request = GeminiRequest {
            contents: vec![Content::user_text(prompt)],
            generation_config: GenerationConfig::default(),
            tools: Some(vec![ToolPayload {
                function_declarations: tools.to_vec(),
            }]),
            tool_config: Some(ToolConfig {
                function_calling_config: FunctionCallingConfig {
                    mode: "AUTO".to_string(),
                },
            }),
        };

        let response = self.send(&request).await?;

        let parts = &response.candidates[0].content.parts;
        let tool_call = parts.iter().find_map(|part| {
            part.function_call.as_ref().map(|fc| ToolCall {
                name: fc.name.clone(),
                arguments: fc.args.clone().unwrap_or(Value::Null),
            })
        });
        let text = parts.iter().find_map(|part| part.text.clone());

        Ok(ToolAwareReply { text, tool_call })
    }

    async fn complete_tool_exchange(
        &self,
        prompt: &str,
        call: &ToolCall,
        tool_result: &Value,
    ) -> crate::Result<String> {
        let request = GeminiRequest {
            contents: vec![
                Content::user_text(prompt),
                Content {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: None,
                        function_call: Some(FunctionCall {
                            name: call.name.clone(),
                            args: Some(call.arguments.clone()),
                        }),
                        function_response: None,
                    }],
                },
                Content {
                    role: Some("user".to_string()),
                    parts: vec![Part {
                        text: None,
                        function_call: None,
                        function_response: Some(FunctionResponse {
                            name: call.name.clone(),
                            response: serde_json::json!({ "result": tool_result }),
                        }),
                    }],
                },
            ],
            generation_config: GenerationConfig::default(),
            tools: None,
            tool_config: None,
        };

        let response = self.send(&request).await?;
        extract_text(&response)
    }
}

fn extract_text(response: &GeminiResponse) -> crate::Result<String> {
    response.candidates[0]
        .content
        .parts
        .iter()
        .find_map(|part| part.text.clone())
        .ok_or_else(|| AssistantError::LlmError("Empty response from Gemini".to_string()))
}

//
// ================= Wire types =================
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

impl Content {
    fn user_text(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
                function_call: None,
                function_response: None,
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolPayload {
    function_declarations: Vec<ToolDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct FunctionCallingConfig {
    mode: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolKind;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content::user_text("Làm sao tiết kiệm được?")],
            generation_config: GenerationConfig::default(),
            tools: None,
            tool_config: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("Làm sao tiết kiệm được?"));
        assert!(json.contains("generationConfig"));
        assert!(!json.contains("tools"));
    }

    #[test]
    fn test_tool_request_carries_declarations() {
        let request = GeminiRequest {
            contents: vec![Content::user_text("Phân tích chi tiêu của tôi")],
            generation_config: GenerationConfig::default(),
            tools: Some(vec![ToolPayload {
                function_declarations: ToolKind::declarations(),
            }]),
            tool_config: Some(ToolConfig {
                function_calling_config: FunctionCallingConfig {
                    mode: "AUTO".to_string(),
                },
            }),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("functionDeclarations"));
        assert!(json.contains("financial_summary"));
        assert!(json.contains("functionCallingConfig"));
    }

    #[test]
    fn test_response_parsing_extracts_function_call() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "category_expense",
                            "args": { "category_name": "Ăn uống", "days": 30 }
                        }
                    }]
                },
                "finishReason": "STOP"
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        let part = &response.candidates[0].content.parts[0];
        let call = part.function_call.as_ref().unwrap();
        assert_eq!(call.name, "category_expense");
        assert_eq!(call.args.as_ref().unwrap()["category_name"], "Ăn uống");
    }
}
