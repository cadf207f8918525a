//! 能力提取器：从任务文本得到所需能力集合
//!
//! 语义路径：任务文本与每个能力描述做余弦相似度，保留 >= 阈值的能力；
//! 没有能力过阈值、或嵌入调用失败时，回退到关键词路径。关键词路径保证结果非空。

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::capability::CapabilityCatalog;
use crate::core::ExchangeError;
use crate::embedding::EmbeddingService;

/// 语义匹配默认阈值
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.3;

const WRITING_INDICATORS: &[&str] = &["写", "生成", "创作", "撰写", "write", "draft"];
const RESEARCH_INDICATORS: &[&str] = &["研究", "调研", "分析", "了解", "research", "analy"];
const DEFAULT_CAPABILITIES: &[&str] = &["research", "writing"];

/// 提取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Semantic,
    Keyword,
    /// 关键词也没有命中，使用启发式默认规则
    Heuristic,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Semantic => "semantic",
            ExtractionMethod::Keyword => "keyword",
            ExtractionMethod::Heuristic => "heuristic",
        }
    }
}

/// 提取结果
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub capabilities: BTreeSet<String>,
    pub method: ExtractionMethod,
    /// 语义路径命中的 (能力, 相似度)，按相似度降序
    pub similarities: Vec<(String, f32)>,
}

/// 能力提取器
pub struct CapabilityExtractor {
    catalog: RwLock<CapabilityCatalog>,
    embeddings: Option<Arc<EmbeddingService>>,
    threshold: f32,
}

impl CapabilityExtractor {
    pub fn new(catalog: CapabilityCatalog, embeddings: Option<Arc<EmbeddingService>>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            embeddings,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// 是否具备语义匹配能力
    pub fn has_semantic(&self) -> bool {
        self.embeddings.is_some()
    }

    /// 运行时注册新能力
    pub async fn register_capability(
        &self,
        tag: &str,
        description: &str,
        keywords: Vec<String>,
    ) -> Result<(), ExchangeError> {
        self.catalog.write().await.register(tag, description, keywords)
    }

    /// 以 Hub 声明扩展目录（见 CapabilityCatalog::extend_from_hubs）
    pub async fn extend_catalog<'a, I>(&self, hubs: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        self.catalog.write().await.extend_from_hubs(hubs)
    }

    /// 当前目录快照
    pub async fn catalog(&self) -> CapabilityCatalog {
        self.catalog.read().await.clone()
    }

    /// 提取任务所需能力（不会返回空集合）
    pub async fn extract(&self, task_text: &str, use_semantic: bool) -> BTreeSet<String> {
        self.extract_detailed(task_text, use_semantic)
            .await
            .capabilities
    }

    /// 提取能力并返回所用方式与相似度明细
    pub async fn extract_detailed(&self, task_text: &str, use_semantic: bool) -> Extraction {
        if use_semantic && self.embeddings.is_some() {
            match self.extract_semantic(task_text).await {
                Ok(similarities) if !similarities.is_empty() => {
                    for (tag, score) in &similarities {
                        tracing::debug!(capability = %tag, similarity = format!("{:.3}", score), "semantic match");
                    }
                    return Extraction {
                        capabilities: similarities.iter().map(|(t, _)| t.clone()).collect(),
                        method: ExtractionMethod::Semantic,
                        similarities,
                    };
                }
                Ok(_) => {
                    tracing::info!("no capability cleared the similarity threshold, using keywords");
                }
                Err(e) => {
                    tracing::warn!("semantic extraction failed, using keywords: {}", e);
                }
            }
        }

        let catalog = self.catalog.read().await;
        let (capabilities, method) = keyword_capabilities(&catalog, task_text);
        Extraction {
            capabilities,
            method,
            similarities: Vec::new(),
        }
    }

    /// 语义路径：返回过阈值的 (能力, 相似度)，降序；未配置嵌入服务或任务文本无法嵌入时为 Err
    pub async fn extract_semantic(
        &self,
        task_text: &str,
    ) -> Result<Vec<(String, f32)>, ExchangeError> {
        let embeddings = self
            .embeddings
            .as_ref()
            .ok_or_else(|| ExchangeError::Embedding("semantic matching not configured".into()))?;

        let pairs: Vec<(String, String)> = {
            let catalog = self.catalog.read().await;
            catalog
                .iter()
                .map(|d| (d.tag.clone(), d.description.clone()))
                .collect()
        };
        let descriptions: Vec<String> = pairs.iter().map(|(_, d)| d.clone()).collect();

        let query = embeddings.embed(task_text).await?;
        let vectors = embeddings.embed_batch(&descriptions).await;

        let mut matched: Vec<(String, f32)> = pairs
            .into_iter()
            .filter_map(|(tag, desc)| {
                vectors
                    .get(&desc)
                    .map(|v| (tag, crate::embedding::cosine_similarity(&query, v)))
            })
            .filter(|(_, score)| *score >= self.threshold)
            .collect();
        matched.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(matched)
    }

    /// 关键词路径（纯函数，基于当前目录）
    pub async fn extract_keywords(&self, task_text: &str) -> BTreeSet<String> {
        let catalog = self.catalog.read().await;
        keyword_capabilities(&catalog, task_text).0
    }
}

/// 关键词匹配：大小写归一后子串匹配；无命中时按写作/研究指示词补充，仍为空则默认 {research, writing}
pub fn keyword_capabilities(
    catalog: &CapabilityCatalog,
    task_text: &str,
) -> (BTreeSet<String>, ExtractionMethod) {
    let text = task_text.to_lowercase();

    let matched: BTreeSet<String> = catalog
        .iter()
        .filter(|d| {
            d.keywords
                .iter()
                .map(|k| k.to_lowercase())
                .any(|k| !k.is_empty() && text.contains(&k))
        })
        .map(|d| d.tag.clone())
        .collect();
    if !matched.is_empty() {
        return (matched, ExtractionMethod::Keyword);
    }

    let mut fallback = BTreeSet::new();
    if WRITING_INDICATORS.iter().any(|w| text.contains(w)) {
        fallback.insert("writing".to_string());
    }
    if RESEARCH_INDICATORS.iter().any(|w| text.contains(w)) {
        fallback.insert("research".to_string());
    }
    if fallback.is_empty() {
        fallback.extend(DEFAULT_CAPABILITIES.iter().map(|s| s.to_string()));
    }
    (fallback, ExtractionMethod::Heuristic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::VectorCache;
    use crate::llm::MockEmbedder;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn semantic_extractor(mock: MockEmbedder) -> CapabilityExtractor {
        let cache = Arc::new(VectorCache::in_memory("mock-embedding"));
        let service = Arc::new(EmbeddingService::new(Arc::new(mock), cache));
        CapabilityExtractor::new(CapabilityCatalog::builtin(), Some(service))
    }

    #[tokio::test]
    async fn test_embedding_timeout_falls_back_to_keywords() {
        let cache = Arc::new(VectorCache::in_memory("mock-embedding"));
        let mock = MockEmbedder::new(8).with_delay(std::time::Duration::from_secs(3600));
        let service = EmbeddingService::new(Arc::new(mock), cache).with_timeout(1);
        let extractor =
            CapabilityExtractor::new(CapabilityCatalog::builtin(), Some(Arc::new(service)));

        let text = "优化数据库性能";
        let detailed = extractor.extract_detailed(text, true).await;
        let expected = keyword_capabilities(&CapabilityCatalog::builtin(), text);
        assert_eq!(detailed.capabilities, expected.0);
        assert_eq!(detailed.method, expected.1);
        assert!(detailed.capabilities.contains("optimization"));
    }

    #[tokio::test]
    async fn test_keyword_path_matches_substrings() {
        let extractor = CapabilityExtractor::new(CapabilityCatalog::builtin(), None);
        let caps = extractor
            .extract("请帮我调试这段代码，修复一个 bug", false)
            .await;
        assert!(caps.contains("coding"));
        assert!(caps.contains("debugging"));
    }

    #[tokio::test]
    async fn test_keyword_path_is_case_insensitive() {
        let extractor = CapabilityExtractor::new(CapabilityCatalog::builtin(), None);
        let caps = extractor.extract("Please DEBUG my Rust service", false).await;
        assert!(caps.contains("debugging"));
    }

    #[test]
    fn test_default_pair_when_nothing_matches() {
        let (caps, method) = keyword_capabilities(&CapabilityCatalog::builtin(), "你好");
        assert_eq!(caps, set(&["research", "writing"]));
        assert_eq!(method, ExtractionMethod::Heuristic);
    }

    #[test]
    fn test_indicator_rules_with_empty_catalog() {
        let empty = CapabilityCatalog::new();
        let (caps, _) = keyword_capabilities(&empty, "帮我写一首诗");
        assert_eq!(caps, set(&["writing"]));
        let (caps, _) = keyword_capabilities(&empty, "了解一下量子计算");
        assert_eq!(caps, set(&["research"]));
        let (caps, _) = keyword_capabilities(&empty, "");
        assert_eq!(caps, set(&["research", "writing"]));
    }

    #[tokio::test]
    async fn test_semantic_path_keeps_tags_above_threshold() {
        let catalog = CapabilityCatalog::builtin();
        let coding = catalog.get("coding").unwrap().description.clone();
        let debugging = catalog.get("debugging").unwrap().description.clone();

        // 其余描述使用与查询正交的向量
        let mut mock = MockEmbedder::new(3).with_vector("修一下崩溃", vec![1.0, 0.0, 0.0]);
        for d in catalog.iter() {
            mock = mock.with_vector(&d.description, vec![0.0, 1.0, 0.0]);
        }
        let mock = mock
            .with_vector(&coding, vec![0.8, 0.6, 0.0])
            .with_vector(&debugging, vec![1.0, 0.1, 0.0]);

        let extractor = semantic_extractor(mock);
        let out = extractor.extract_detailed("修一下崩溃", true).await;
        assert_eq!(out.method, ExtractionMethod::Semantic);
        assert_eq!(out.capabilities, set(&["coding", "debugging"]));
        assert_eq!(out.similarities[0].0, "debugging");
    }

    #[tokio::test]
    async fn test_semantic_nothing_above_threshold_falls_back() {
        let catalog = CapabilityCatalog::builtin();
        let mut mock = MockEmbedder::new(2).with_vector("调试代码", vec![1.0, 0.0]);
        for d in catalog.iter() {
            mock = mock.with_vector(&d.description, vec![0.0, 1.0]);
        }
        let extractor = semantic_extractor(mock);
        let out = extractor.extract_detailed("调试代码", true).await;
        assert_eq!(out.method, ExtractionMethod::Keyword);
        assert_eq!(
            out.capabilities,
            extractor.extract_keywords("调试代码").await
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_equals_keyword_path() {
        let extractor = semantic_extractor(MockEmbedder::failing());
        for text in ["写一份市场调研报告", "优化数据库性能", "hello", "做个演示原型"] {
            let semantic = extractor.extract(text, true).await;
            let keywords = extractor.extract(text, false).await;
            assert_eq!(semantic, keywords, "text: {}", text);
            assert!(!semantic.is_empty());
        }
    }

    #[tokio::test]
    async fn test_runtime_registration_feeds_keyword_path() {
        let extractor = CapabilityExtractor::new(CapabilityCatalog::builtin(), None);
        extractor
            .register_capability("translation", "多语言翻译与本地化", vec!["翻译".into()])
            .await
            .unwrap();
        let caps = extractor.extract("把这段话翻译成英文", false).await;
        assert!(caps.contains("translation"));
    }
}
