//! 向量缓存：文本摘要 -> 嵌入向量，避免重复的远程调用
//!
//! 键为 UTF-8 文本的 SHA-256 前 128 位（十六进制），只做精确匹配；条目永不过期。
//! 持久化为单个 JSON 文件，记录生成向量的模型名，模型不一致的文件在加载时被忽略。

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::core::ExchangeError;

/// 文本的内容寻址键（跨进程稳定）
pub fn cache_key(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..16])
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    model: String,
    saved_at: String,
    entries: HashMap<String, Vec<f32>>,
}

/// 持久化向量缓存
#[derive(Debug)]
pub struct VectorCache {
    path: Option<PathBuf>,
    model: String,
    entries: RwLock<HashMap<String, Vec<f32>>>,
    dirty: AtomicBool,
}

impl VectorCache {
    /// 绑定到持久化文件（不自动加载，需调用 load）
    pub fn new(path: impl AsRef<Path>, model: &str) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            model: model.to_string(),
            entries: RwLock::new(HashMap::new()),
            dirty: AtomicBool::new(false),
        }
    }

    /// 仅内存缓存，flush 为空操作
    pub fn in_memory(model: &str) -> Self {
        Self {
            path: None,
            model: model.to_string(),
            entries: RwLock::new(HashMap::new()),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.entries.read().await.get(&cache_key(text)).cloned()
    }

    pub async fn contains(&self, text: &str) -> bool {
        self.entries.read().await.contains_key(&cache_key(text))
    }

    pub async fn put(&self, text: &str, vector: Vec<f32>) {
        self.entries.write().await.insert(cache_key(text), vector);
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// 批量写入（一次获取写锁）
    pub async fn put_many(&self, items: impl IntoIterator<Item = (String, Vec<f32>)>) {
        let mut entries = self.entries.write().await;
        let mut any = false;
        for (text, vector) in items {
            entries.insert(cache_key(&text), vector);
            any = true;
        }
        if any {
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// 是否有未持久化的写入
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// 从持久化文件合并条目；文件缺失、损坏或属于其他模型时记录日志并保持原状，返回加载条数
    pub async fn load(&self) -> usize {
        let Some(path) = self.path.as_ref() else {
            return 0;
        };
        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no vector cache file yet");
                return 0;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to read vector cache: {}", e);
                return 0;
            }
        };
        let file: CacheFile = match serde_json::from_str(&data) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path.display(), "vector cache corrupt, starting empty: {}", e);
                return 0;
            }
        };
        if file.model != self.model {
            tracing::warn!(
                cached = %file.model,
                current = %self.model,
                "vector cache was written by another model, ignoring it"
            );
            return 0;
        }

        let count = file.entries.len();
        let mut entries = self.entries.write().await;
        for (key, vector) in file.entries {
            entries.entry(key).or_insert(vector);
        }
        tracing::info!("Loaded {} cached vectors", count);
        count
    }

    /// 将当前内存条目写入持久化文件（先写临时文件再重命名），返回写入条数
    pub async fn flush(&self) -> Result<usize, ExchangeError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(0);
        };
        let file = {
            let entries = self.entries.read().await;
            CacheFile {
                model: self.model.clone(),
                saved_at: chrono::Local::now().to_rfc3339(),
                entries: entries.clone(),
            }
        };
        let count = file.entries.len();
        let json =
            serde_json::to_string(&file).map_err(|e| ExchangeError::CacheIo(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ExchangeError::CacheIo(e.to_string()))?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| ExchangeError::CacheIo(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| ExchangeError::CacheIo(e.to_string()))?;

        self.dirty.store(false, Ordering::SeqCst);
        tracing::info!("Saved {} vectors to cache", count);
        Ok(count)
    }

    /// 执行 f，并在其返回后（无论 Ok 还是 Err）flush；flush 失败只记日志，不覆盖 f 的结果
    pub async fn with_flush<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let result = f().await;
        if let Err(e) = self.flush().await {
            tracing::warn!("vector cache flush failed: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_is_stable_and_exact() {
        let a = cache_key("研究 AI Agent");
        assert_eq!(a, cache_key("研究 AI Agent"));
        assert_eq!(a.len(), 32);
        assert_ne!(a, cache_key("研究 AI Agent "));
    }

    #[tokio::test]
    async fn test_put_flush_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("embeddings.json");

        let cache = VectorCache::new(&path, "jina-clip-v2");
        cache.put("hello", vec![0.1, 0.2, 0.3]).await;
        assert!(cache.is_dirty());
        assert_eq!(cache.flush().await.unwrap(), 1);
        assert!(!cache.is_dirty());

        let fresh = VectorCache::new(&path, "jina-clip-v2");
        assert_eq!(fresh.load().await, 1);
        assert_eq!(fresh.get("hello").await, Some(vec![0.1, 0.2, 0.3]));
        assert_eq!(fresh.get("world").await, None);
    }

    #[tokio::test]
    async fn test_load_missing_or_corrupt_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.json");

        let cache = VectorCache::new(&path, "m");
        assert_eq!(cache.load().await, 0);

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(cache.load().await, 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_ignores_other_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.json");

        let cache = VectorCache::new(&path, "model-a");
        cache.put("x", vec![1.0]).await;
        cache.flush().await.unwrap();

        let other = VectorCache::new(&path, "model-b");
        assert_eq!(other.load().await, 0);
        assert!(other.get("x").await.is_none());
    }

    #[tokio::test]
    async fn test_load_merges_without_clobbering() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.json");

        let writer = VectorCache::new(&path, "m");
        writer.put("a", vec![1.0]).await;
        writer.put("b", vec![2.0]).await;
        writer.flush().await.unwrap();

        let reader = VectorCache::new(&path, "m");
        reader.put("b", vec![9.0]).await;
        reader.load().await;
        assert_eq!(reader.get("a").await, Some(vec![1.0]));
        assert_eq!(reader.get("b").await, Some(vec![9.0]));
    }

    #[tokio::test]
    async fn test_with_flush_persists_on_error_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.json");
        let cache = VectorCache::new(&path, "m");

        let result: Result<(), String> = cache
            .with_flush(|| async {
                cache.put("kept", vec![3.0]).await;
                Err("task failed".to_string())
            })
            .await;
        assert!(result.is_err());

        let fresh = VectorCache::new(&path, "m");
        fresh.load().await;
        assert_eq!(fresh.get("kept").await, Some(vec![3.0]));
    }

    #[tokio::test]
    async fn test_in_memory_flush_is_noop() {
        let cache = VectorCache::in_memory("m");
        cache.put("a", vec![1.0]).await;
        assert_eq!(cache.flush().await.unwrap(), 0);
        assert_eq!(cache.len().await, 1);
    }
}
