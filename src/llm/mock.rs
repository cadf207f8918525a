//! Mock 后端（用于测试与离线运行，无需 API）
//!
//! - `MockLlmClient`：回显最后一条 User 消息
//! - `MockEmbedder`：确定性向量，可预置向量、模拟整体失败、单条缺失或迟迟不响应，并统计远程调用次数

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::ExchangeError;
use crate::llm::{LlmClient, Message, RemoteEmbedder, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Echo from Mock: {}", last_user))
    }
}

/// Mock 嵌入后端
pub struct MockEmbedder {
    model: String,
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
    omitted: HashSet<String>,
    delay: Option<Duration>,
    failing: AtomicBool,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            model: "mock-embedding".to_string(),
            dim: dim.max(1),
            vectors: HashMap::new(),
            omitted: HashSet::new(),
            delay: None,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// 始终失败的后端（模拟网络错误）
    pub fn failing() -> Self {
        let mock = Self::new(8);
        mock.set_failing(true);
        mock
    }

    /// 每次请求先等待 delay 再响应（模拟挂起的后端）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 为指定文本预置向量
    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// 服务端对该文本不返回向量（模拟部分批量失败）
    pub fn omitting(mut self, text: &str) -> Self {
        self.omitted.insert(text.to_string());
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 远程调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 所有发往“远程”的文本（按请求顺序）
    pub async fn requested_texts(&self) -> Vec<String> {
        self.requested.lock().await.clone()
    }

    /// 未预置时按字符分桶计数，字符重叠越多越相似
    fn default_vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            v[(c as usize) % self.dim] += 1.0;
        }
        v
    }
}

#[async_trait]
impl RemoteEmbedder for MockEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().await.extend(texts.iter().cloned());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ExchangeError::Embedding("mock network failure".to_string()));
        }
        Ok(texts
            .iter()
            .map(|t| {
                if self.omitted.contains(t) {
                    None
                } else {
                    Some(
                        self.vectors
                            .get(t)
                            .cloned()
                            .unwrap_or_else(|| self.default_vector(t)),
                    )
                }
            })
            .collect())
    }
}
