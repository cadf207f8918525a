//! 编排器构建器：从 AppConfig 组装 LLM、嵌入服务、能力目录、Hub 注册表
//!
//! 各组件都可以被显式覆盖（测试注入 Mock，前端注入自己的 Reporter）。

use std::path::PathBuf;
use std::sync::Arc;

use crate::capability::{CapabilityCatalog, CapabilityExtractor};
use crate::config::{AppConfig, CatalogSource};
use crate::core::{ExchangeOrchestrator, Reporter};
use crate::embedding::{EmbeddingService, VectorCache};
use crate::hubs::{HubCandidate, HubRegistry};
use crate::llm::{create_embedder_from_config, create_llm_from_config, LlmClient, RemoteEmbedder};

pub struct ExchangeBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    embedder: Option<Arc<dyn RemoteEmbedder>>,
    reporter: Option<Arc<dyn Reporter>>,
    builtin_hubs: bool,
    extra_hubs: Vec<HubCandidate>,
}

impl ExchangeBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            embedder: None,
            reporter: None,
            builtin_hubs: true,
            extra_hubs: Vec::new(),
        }
    }

    /// 团队 Hub 使用的 LLM；未设置时按配置与环境变量选择
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 远程嵌入后端；未设置时按 [embedding] 段创建
    pub fn with_embedder(mut self, embedder: Arc<dyn RemoteEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// 是否注册内置团队 Hub
    pub fn with_builtin_hubs(mut self, enable: bool) -> Self {
        self.builtin_hubs = enable;
        self
    }

    /// 额外注册一个候选实现
    pub fn register_hub(mut self, candidate: HubCandidate) -> Self {
        self.extra_hubs.push(candidate);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build_llm(&self) -> Arc<dyn LlmClient> {
        self.llm
            .clone()
            .unwrap_or_else(|| create_llm_from_config(&self.config))
    }

    /// 嵌入服务（含缓存）；未启用或无可用后端时为 None
    pub async fn build_embedding_service(&self) -> Option<Arc<EmbeddingService>> {
        if !self.config.matching.use_semantic {
            return None;
        }
        let remote = match &self.embedder {
            Some(embedder) => embedder.clone(),
            None => create_embedder_from_config(&self.config.embedding)?,
        };
        let cache = Arc::new(VectorCache::new(self.config.cache_path(), remote.model()));
        let loaded = cache.load().await;
        tracing::info!(
            entries = loaded,
            path = %self.config.cache_path().display(),
            "embedding cache loaded"
        );
        Some(Arc::new(
            EmbeddingService::new(remote, cache).with_timeout(self.config.embedding.timeout_secs),
        ))
    }

    /// 内置能力目录 + 可选覆盖文件
    pub fn build_catalog(&self) -> CapabilityCatalog {
        let mut catalog = CapabilityCatalog::builtin();
        if let Some(path) = &self.config.matching.capabilities_file {
            let merged = catalog.load(path);
            tracing::info!(merged, path = %path.display(), "capability overlay loaded");
        }
        catalog
    }

    pub fn build_registry(&self, llm: Arc<dyn LlmClient>) -> HubRegistry {
        let mut registry = HubRegistry::new().with_plugin_dir(self.config.hubs.plugin_dir.clone());
        if self.builtin_hubs {
            registry = registry.with_builtin(llm);
        }
        for candidate in &self.extra_hubs {
            registry.register(candidate.clone());
        }
        registry
    }

    pub async fn build(self) -> ExchangeOrchestrator {
        let llm = self.build_llm();
        let embeddings = self.build_embedding_service().await;
        let registry = self.build_registry(llm);
        let mut catalog = self.build_catalog();

        if self.config.matching.catalog_source == CatalogSource::Discovered {
            let implementations = registry.discover_implementations().await;
            let added = catalog.extend_from_hubs(
                implementations
                    .values()
                    .map(|imp| (imp.description.as_str(), imp.capabilities.as_slice())),
            );
            tracing::info!(added, total = catalog.len(), "capability catalog derived from hubs");
        }

        let extractor = CapabilityExtractor::new(catalog, embeddings.clone())
            .with_threshold(self.config.matching.similarity_threshold);
        let mut orchestrator =
            ExchangeOrchestrator::new(extractor, registry, self.config.hubs.config_file.clone())
                .with_semantic(self.config.matching.use_semantic)
                .with_embeddings(embeddings);
        if let Some(reporter) = self.reporter {
            orchestrator = orchestrator.with_reporter(reporter);
        }
        tracing::info!(
            app = %self.config.app.name,
            semantic = self.config.matching.use_semantic,
            "exchange ready"
        );
        orchestrator
    }
}

/// 便捷函数：加载配置（失败时使用默认配置）并创建构建器
pub fn create_exchange_builder(config_path: Option<PathBuf>) -> ExchangeBuilder {
    let config = crate::config::load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    ExchangeBuilder::new(config)
}
