//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url），供团队型 Hub 的成员使用。

use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::config::AppConfig;
use crate::llm::{LlmClient, Message, MockLlmClient, Role};

/// OpenAI 兼容客户端：持有 Client、model 名与单次请求超时
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, String> {
        messages
            .iter()
            .map(|m| {
                let msg = match m.role {
                    Role::System => ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(|e| e.to_string())?,
                    ),
                    Role::User => ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(|e| e.to_string())?,
                    ),
                    Role::Assistant => ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(|e| e.to_string())?,
                    ),
                };
                Ok(msg)
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.to_openai_messages(messages)?)
            .build()
            .map_err(|e| e.to_string())?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| format!("LLM request timeout after {}s", self.timeout.as_secs()))?
            .map_err(|e| e.to_string())?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }

    fn for_model(&self, model: &str) -> Option<Arc<dyn LlmClient>> {
        Some(Arc::new(Self {
            client: self.client.clone(),
            model: model.to_string(),
            timeout: self.timeout,
        }))
    }
}

/// 按 [llm].provider 选择团队成员使用的 LLM：openai 需要 OPENAI_API_KEY，缺失时与 mock 一样回退到 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    match cfg.llm.provider.to_lowercase().as_str() {
        "openai" => match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => {
                let model = cfg.llm.model.clone();
                tracing::info!("Using OpenAI-compatible LLM ({})", model);
                Arc::new(
                    OpenAiClient::new(cfg.llm.base_url.as_deref(), &model, Some(&key))
                        .with_timeout(cfg.llm.timeouts.request),
                )
            }
            _ => {
                tracing::warn!("No OPENAI_API_KEY set, hub teams will use Mock LLM");
                Arc::new(MockLlmClient)
            }
        },
        "mock" => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient)
        }
        other => {
            tracing::warn!("unknown llm provider '{}', hub teams will use Mock LLM", other);
            Arc::new(MockLlmClient)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn reply(cfg: &AppConfig) -> String {
        create_llm_from_config(cfg)
            .complete(&[Message::user("ping")])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_mock_provider_selected_by_config() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "Mock".to_string();
        assert_eq!(reply(&cfg).await, "Echo from Mock: ping");
    }

    #[tokio::test]
    async fn test_unknown_provider_falls_back_to_mock() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "carrier-pigeon".to_string();
        assert_eq!(reply(&cfg).await, "Echo from Mock: ping");
    }

    #[test]
    fn test_for_model_keeps_backend_settings() {
        let client = OpenAiClient::new(Some("http://localhost:9/v1"), "gpt-4", Some("sk-test"))
            .with_timeout(5);
        assert!(client.for_model("gpt-3.5-turbo").is_some());
    }
}
