//! 远程嵌入后端：文本进、定长向量出
//!
//! - `OpenAiEmbedder`：async-openai 调用 OpenAI 兼容的 /embeddings 端点
//! - `JinaEmbedder`：reqwest 直接调用 Jina 风格端点（`input: [{"text": ..}]`），容忍多种响应信封
//!
//! 返回值与输入按位置对齐；服务端漏掉或格式错误的条目为 None，由上层从结果中剔除。

use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::embeddings::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::EmbeddingSection;
use crate::core::ExchangeError;

/// 远程嵌入服务
#[async_trait]
pub trait RemoteEmbedder: Send + Sync {
    /// 模型名（同一模型产生的向量才可比较）
    fn model(&self) -> &str;

    /// 一次远程调用编码整批文本；整体失败返回 Err，单条缺失为 None
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, ExchangeError>;
}

/// 使用 async-openai 调用 OpenAI 兼容的 embeddings API
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl RemoteEmbedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, ExchangeError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .build()
            .map_err(|e| ExchangeError::Embedding(e.to_string()))?;
        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| ExchangeError::Embedding(e.to_string()))?;

        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for (pos, item) in response.data.into_iter().enumerate() {
            let idx = item.index as usize;
            let slot = if idx < texts.len() { idx } else { pos };
            if slot < out.len() && !item.embedding.is_empty() {
                out[slot] = Some(item.embedding);
            }
        }
        Ok(out)
    }
}

/// Jina 风格 embeddings 端点
pub struct JinaEmbedder {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

pub const JINA_EMBEDDINGS_URL: &str = "https://api.jina.ai/v1/embeddings";

impl JinaEmbedder {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Embedding(format!("http client: {}", e)))?;
        Ok(Self {
            http,
            url: base_url.unwrap_or(JINA_EMBEDDINGS_URL).to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl RemoteEmbedder for JinaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, ExchangeError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({
            "model": self.model,
            "input": texts.iter().map(|t| json!({ "text": t })).collect::<Vec<_>>(),
        });
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExchangeError::Embedding(format!("request timeout: {}", e))
                } else {
                    ExchangeError::Embedding(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Embedding(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ExchangeError::Embedding(format!("malformed response: {}", e)))?;
        parse_embedding_envelope(&value, texts.len())
    }
}

/// 解析常见的响应信封：
/// - `{"data": [{"index": 0, "embedding": [..]}, ..]}`（OpenAI / Jina）
/// - `{"embeddings": [[..], ..]}`
/// - `[[..], ..]`
pub fn parse_embedding_envelope(
    value: &Value,
    expected: usize,
) -> Result<Vec<Option<Vec<f32>>>, ExchangeError> {
    let items: &Vec<Value> = if let Some(data) = value.get("data").and_then(Value::as_array) {
        data
    } else if let Some(list) = value.get("embeddings").and_then(Value::as_array) {
        list
    } else if let Some(list) = value.as_array() {
        list
    } else {
        return Err(ExchangeError::Embedding(format!(
            "unrecognized response envelope: {}",
            value.to_string().chars().take(200).collect::<String>()
        )));
    };

    let mut out: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (pos, item) in items.iter().enumerate() {
        let (slot, raw) = match item {
            Value::Array(_) => (pos, item),
            Value::Object(obj) => {
                let slot = obj
                    .get("index")
                    .and_then(Value::as_u64)
                    .map(|i| i as usize)
                    .unwrap_or(pos);
                match obj.get("embedding") {
                    Some(raw) => (slot, raw),
                    None => continue,
                }
            }
            _ => continue,
        };
        if slot >= expected {
            continue;
        }
        if let Some(vector) = parse_vector(raw) {
            out[slot] = Some(vector);
        }
    }
    Ok(out)
}

fn parse_vector(raw: &Value) -> Option<Vec<f32>> {
    let arr = raw.as_array()?;
    let vector: Option<Vec<f32>> = arr.iter().map(|v| v.as_f64().map(|f| f as f32)).collect();
    vector.filter(|v| !v.is_empty())
}

/// 从应用配置创建嵌入后端；未启用或缺少 API Key 时返回 None（语义匹配关闭，走关键词匹配）
pub fn create_embedder_from_config(cfg: &EmbeddingSection) -> Option<Arc<dyn RemoteEmbedder>> {
    if !cfg.enabled {
        tracing::debug!("embedding disabled by config");
        return None;
    }
    let provider = cfg.provider.to_lowercase();
    let env_key = match provider.as_str() {
        "openai" => "OPENAI_API_KEY",
        _ => "JINA_API_KEY",
    };
    let key = cfg
        .api_key
        .clone()
        .or_else(|| std::env::var(env_key).ok())
        .filter(|k| !k.is_empty());
    let Some(key) = key else {
        tracing::debug!("embedding skipped: no {}", env_key);
        return None;
    };

    match provider.as_str() {
        "openai" => {
            tracing::info!("Using OpenAI-compatible embeddings ({})", cfg.model);
            Some(Arc::new(OpenAiEmbedder::new(
                cfg.base_url.as_deref(),
                &cfg.model,
                &key,
            )))
        }
        "jina" => match JinaEmbedder::new(cfg.base_url.as_deref(), &cfg.model, &key, cfg.timeout_secs) {
            Ok(embedder) => {
                tracing::info!("Using Jina embeddings ({})", cfg.model);
                Some(Arc::new(embedder))
            }
            Err(e) => {
                tracing::warn!("embedding backend unavailable: {}", e);
                None
            }
        },
        other => {
            tracing::warn!("unknown embedding provider '{}', semantic matching disabled", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_envelope_respects_index() {
        let value = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });
        let out = parse_embedding_envelope(&value, 2).unwrap();
        assert_eq!(out[0], Some(vec![1.0, 0.0]));
        assert_eq!(out[1], Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_parse_short_response_leaves_missing_slots() {
        let value = json!({"data": [{"embedding": [0.5, 0.5]}]});
        let out = parse_embedding_envelope(&value, 3).unwrap();
        assert!(out[0].is_some());
        assert!(out[1].is_none());
        assert!(out[2].is_none());
    }

    #[test]
    fn test_parse_bare_and_embeddings_envelopes() {
        let bare = json!([[1.0, 2.0], [3.0, 4.0]]);
        let out = parse_embedding_envelope(&bare, 2).unwrap();
        assert_eq!(out[1], Some(vec![3.0, 4.0]));

        let named = json!({"embeddings": [[1.0], "oops"]});
        let out = parse_embedding_envelope(&named, 2).unwrap();
        assert_eq!(out[0], Some(vec![1.0]));
        assert!(out[1].is_none());
    }

    #[test]
    fn test_parse_unknown_envelope_is_error() {
        let value = json!({"detail": "invalid api key"});
        assert!(parse_embedding_envelope(&value, 1).is_err());
    }

    #[test]
    fn test_disabled_config_yields_no_embedder() {
        let cfg = EmbeddingSection {
            enabled: false,
            ..EmbeddingSection::default()
        };
        assert!(create_embedder_from_config(&cfg).is_none());
    }
}
