//! 嵌入服务：先查 VectorCache，只把未命中的文本一次性批量发给远程后端，结果回写缓存
//!
//! 远程调用失败（网络、非 2xx、格式错误、超时）只影响本次调用：失败的文本不入缓存，也不出现在返回结果中。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::core::ExchangeError;
use crate::embedding::VectorCache;
use crate::llm::RemoteEmbedder;

/// 余弦相似度；任一向量范数为 0（或维度不一致）时返回 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// 带缓存的嵌入服务
pub struct EmbeddingService {
    remote: Arc<dyn RemoteEmbedder>,
    cache: Arc<VectorCache>,
    /// 串行化“查缺 -> 远程 -> 回写”，并发调用不会重复请求同一文本
    fetch_lock: Mutex<()>,
    timeout: Duration,
}

impl EmbeddingService {
    pub fn new(remote: Arc<dyn RemoteEmbedder>, cache: Arc<VectorCache>) -> Self {
        Self {
            remote,
            cache,
            fetch_lock: Mutex::new(()),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn cache(&self) -> Arc<VectorCache> {
        Arc::clone(&self.cache)
    }

    pub fn model(&self) -> &str {
        self.remote.model()
    }

    /// 单条文本的嵌入；远程失败或服务端未返回该条时为 Err
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ExchangeError> {
        if let Some(v) = self.cache.get(text).await {
            return Ok(v);
        }
        let texts = [text.to_string()];
        let mut found = self.fetch_missing(&texts).await?;
        found
            .remove(text)
            .ok_or_else(|| ExchangeError::Embedding("provider returned no vector".to_string()))
    }

    /// 批量嵌入：返回 文本 -> 向量；失败的文本直接缺席
    pub async fn embed_batch(&self, texts: &[String]) -> HashMap<String, Vec<f32>> {
        let mut results = HashMap::new();
        let mut missing = Vec::new();
        for text in texts {
            if results.contains_key(text) {
                continue;
            }
            match self.cache.get(text).await {
                Some(v) => {
                    results.insert(text.clone(), v);
                }
                None => missing.push(text.clone()),
            }
        }

        if !missing.is_empty() {
            match self.fetch_missing(&missing).await {
                Ok(found) => results.extend(found),
                Err(e) => {
                    tracing::warn!(count = missing.len(), "batch embedding failed: {}", e);
                }
            }
        }
        results
    }

    /// 查询文本与候选文本的相似度，按相似度降序取前 top_k；查询本身无法嵌入时为 Err
    pub async fn find_most_similar(
        &self,
        query: &str,
        candidates: &[String],
        top_k: usize,
    ) -> Result<Vec<(String, f32)>, ExchangeError> {
        let query_vec = self.embed(query).await?;
        let candidate_vecs = self.embed_batch(candidates).await;

        let mut seen = HashSet::new();
        let mut scored: Vec<(String, f32)> = candidates
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .filter_map(|c| {
                candidate_vecs
                    .get(c)
                    .map(|v| (c.clone(), cosine_similarity(&query_vec, v)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// 在锁内重新确认缺失项，再发一次远程批量请求
    async fn fetch_missing(
        &self,
        texts: &[String],
    ) -> Result<HashMap<String, Vec<f32>>, ExchangeError> {
        let _guard = self.fetch_lock.lock().await;

        let mut found = HashMap::new();
        let mut to_fetch = Vec::new();
        let mut seen = HashSet::new();
        for text in texts {
            if !seen.insert(text.as_str()) {
                continue;
            }
            if let Some(v) = self.cache.get(text).await {
                found.insert(text.clone(), v);
            } else if text.trim().is_empty() {
                tracing::debug!("skip embedding for empty text");
            } else {
                to_fetch.push(text.clone());
            }
        }
        if to_fetch.is_empty() {
            return Ok(found);
        }

        let vectors = tokio::time::timeout(self.timeout, self.remote.embed_batch(&to_fetch))
            .await
            .map_err(|_| ExchangeError::EmbeddingTimeout(self.timeout.as_secs()))??;

        let mut fresh = Vec::new();
        for (text, vector) in to_fetch.into_iter().zip(vectors.into_iter()) {
            match vector {
                Some(v) => fresh.push((text, v)),
                None => tracing::debug!(text = %text, "provider returned no vector"),
            }
        }
        self.cache.put_many(fresh.iter().cloned()).await;
        found.extend(fresh);
        Ok(found)
    }
}
