//! OpenAI-compatible chat-completions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::{ImageAnalysis, ImageRef, ReportGenerator, ReportInput, SceneAnalyzer, SecurityReport};
use crate::config::AiConfig;
use crate::error::AiError;

const ANALYZE_IMAGE_PROMPT: &str = "You are a security surveillance AI. Analyze the provided image from a security camera. \
Describe the scene in detail. Identify all relevant objects, people, and animals. \
Determine what action is taking place. \
Assess the primary emotion of any person present (e.g., happy, sad, angry, neutral). If no person is visible, the emotion must be \"N/A\". \
Answer with a JSON object with the keys \"description\" (string), \"objects\" (array of strings), \"action\" (string) and \"emotion\" (string).";

const REPORT_PROMPT: &str = "You are a security expert responsible for generating security reports. \
Summarize detected anomalies, system performance, and configuration changes for the given period. \
Provide a concise summary including potential vulnerabilities and compliance with security policies. \
Answer with a JSON object with the string keys \"summary\", \"anomalies\", \"systemPerformance\" and \"configurationChanges\".";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Scene analyzer and report generator backed by a chat-completions API
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| AiError::Transport("no API key configured".to_string()))?;

        // a little slack over the engine-side cap so the engine reports the timeout
        let client = Client::builder()
            .timeout(config.timeout() + Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format: json!({ "type": "json_object" }),
        };

        debug!(model = %self.model, "Calling chat completions API");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Chat completions request failed");
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::Malformed("empty response".to_string()))
    }
}

#[async_trait]
impl SceneAnalyzer for OpenAiClient {
    async fn analyze_image(&self, image: &ImageRef) -> Result<ImageAnalysis, AiError> {
        let messages = vec![ChatMessage {
            role: "user",
            content: json!([
                { "type": "text", "text": ANALYZE_IMAGE_PROMPT },
                { "type": "image_url", "image_url": { "url": image.as_str() } },
            ]),
        }];

        let content = self.complete(messages).await?;
        let analysis: ImageAnalysis = serde_json::from_str(&content)?;
        Ok(analysis.normalized())
    }
}

#[async_trait]
impl ReportGenerator for OpenAiClient {
    async fn generate_report(&self, input: &ReportInput) -> Result<SecurityReport, AiError> {
        let user = format!(
            "Period: {} to {}\n\nAnomalies:\n{}\n\nSystem Performance:\n{}\n\nConfiguration Changes:\n{}",
            input.start_date,
            input.end_date,
            input.anomalies,
            input.system_performance,
            input.configuration_changes
        );
        let messages = vec![
            ChatMessage {
                role: "system",
                content: Value::String(REPORT_PROMPT.to_string()),
            },
            ChatMessage {
                role: "user",
                content: Value::String(user),
            },
        ];

        let content = self.complete(messages).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        if std::env::var(crate::config::AI_KEY_ENV).is_ok() {
            return;
        }
        let config = AiConfig::default();
        assert!(matches!(OpenAiClient::new(&config), Err(AiError::Transport(_))));
    }

    #[test]
    fn test_trims_base_url() {
        let config = AiConfig {
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:8080/v1/".to_string(),
            ..AiConfig::default()
        };
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1");
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_reply_parsing() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"{\"description\":\"Hallway\",\"objects\":[\"door\"],\"action\":\"walking\",\"emotion\":\"neutral\"}"}}]}"#;
        let chat: ChatResponse = serde_json::from_str(body).unwrap();
        let content = chat.choices[0].message.content.clone().unwrap();
        let analysis: ImageAnalysis = serde_json::from_str(&content).unwrap();
        assert_eq!(analysis.action, "walking");
        assert_eq!(analysis.objects, vec!["door".to_string()]);
    }
}
