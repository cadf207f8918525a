//! 交换流程集成测试：能力提取 → 发现 → 选择 → 执行，及缓存与插件发现

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use aex::capability::{keyword_capabilities, CapabilityCatalog, CapabilityExtractor};
    use aex::config::AppConfig;
    use aex::core::{ChannelReporter, ExchangeBuilder, ExchangeEvent};
    use aex::embedding::{EmbeddingService, VectorCache};
    use aex::hubs::{Hub, HubCandidate, HubRegistry, Team, MANIFEST_FILE};
    use aex::llm::{MockEmbedder, MockLlmClient};
    use aex::ExchangeError;
    use async_trait::async_trait;
    use tempfile::TempDir;

    const HUBS: &str = r#"[
        {"hub_id": "content", "name": "内容创作团队", "description": "研究与写作",
         "capabilities": ["research", "writing", "summary", "analysis", "report"], "hub_class": "ContentCreationHub"},
        {"hub_id": "code", "name": "代码工匠团队", "description": "编写、测试和调试代码",
         "capabilities": ["coding", "debugging", "testing", "documentation", "code_review"], "hub_class": "CodeCraftersHub"},
        {"hub_id": "test", "name": "测试团队", "description": "用于测试自动扫描功能的简单团队",
         "capabilities": ["test", "demo", "example"], "hub_class": "TestHub"}
    ]"#;

    fn write_plugin(root: &Path, sub: &str, body: &str) {
        let dir = root.join(sub);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), body).unwrap();
    }

    fn plugin_manifest(class: &str) -> String {
        format!(
            "[hub]\nclass = \"{}\"\nname = \"{}\"\ncapabilities = [\"demo\"]\nprogram = \"echo\"\nargs = [\"{{{{task}}}}\"]\n",
            class, class
        )
    }

    fn config(dir: &TempDir, hubs: &str) -> AppConfig {
        let hubs_path = dir.path().join("hubs_config.json");
        std::fs::write(&hubs_path, hubs).unwrap();
        let mut cfg = AppConfig::default();
        cfg.app.data_dir = dir.path().join("cache");
        cfg.hubs.config_file = hubs_path;
        cfg.hubs.plugin_dir = dir.path().join("plugins");
        cfg
    }

    #[tokio::test]
    async fn test_keyword_routing_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(&tmp, HUBS);
        cfg.matching.use_semantic = false;
        let (reporter, mut rx) = ChannelReporter::new();
        let orchestrator = ExchangeBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient))
            .with_reporter(Arc::new(reporter))
            .build()
            .await;

        let outcome = orchestrator.run_task("请帮我调试这段代码").await.unwrap();
        let selected = outcome.selected.unwrap();
        assert_eq!(selected.hub.hub_id, "code");
        assert_eq!(selected.score, 1.0);
        let result = outcome.result.unwrap();
        assert!(result.contains("资深开发者"));
        assert!(result.contains("QA测试工程师"));

        let events: Vec<ExchangeEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(matches!(events.first(), Some(ExchangeEvent::TaskParsed { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, ExchangeEvent::HubsRanked { rows } if rows.len() == 3)));
    }

    #[tokio::test]
    async fn test_default_hub_when_nothing_matches() {
        let tmp = TempDir::new().unwrap();
        let hubs = r#"[
            {"hub_id": "market", "name": "营销", "description": "", "capabilities": ["marketing"], "hub_class": "SocialSparkHub"},
            {"hub_id": "finance", "name": "财务", "description": "", "capabilities": ["finance"], "hub_class": "StrategyForgeHub"}
        ]"#;
        let mut cfg = config(&tmp, hubs);
        cfg.matching.use_semantic = false;
        let (reporter, mut rx) = ChannelReporter::new();
        let orchestrator = ExchangeBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient))
            .with_reporter(Arc::new(reporter))
            .build()
            .await;

        let outcome = orchestrator.run_task("hello there").await.unwrap();
        let selected = outcome.selected.unwrap();
        assert_eq!(selected.hub.hub_id, "market");
        assert_eq!(selected.score, 0.0);
        assert!(outcome.result.is_some());
        assert!(std::iter::from_fn(|| rx.try_recv().ok()).any(|e| matches!(
            e,
            ExchangeEvent::NoMatchingHub { ref default_hub_id } if default_hub_id == "market"
        )));
    }

    /// 组建团队总是失败的 Hub
    struct UnstaffedHub;

    #[async_trait]
    impl Hub for UnstaffedHub {
        fn name(&self) -> &str {
            "空壳团队"
        }

        fn description(&self) -> &str {
            "招不到成员"
        }

        fn get_capabilities(&self) -> Vec<String> {
            vec!["demo".to_string()]
        }

        async fn setup_team(&self) -> Result<Box<dyn Team>, ExchangeError> {
            Err(ExchangeError::Instantiation("no members available".to_string()))
        }
    }

    #[tokio::test]
    async fn test_team_setup_failure_yields_none() {
        let tmp = TempDir::new().unwrap();
        let hubs = r#"[
            {"hub_id": "hollow", "name": "空壳团队", "description": "", "capabilities": ["demo"], "hub_class": "UnstaffedHub"}
        ]"#;
        let mut cfg = config(&tmp, hubs);
        cfg.matching.use_semantic = false;
        let orchestrator = ExchangeBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient))
            .with_builtin_hubs(false)
            .register_hub(HubCandidate::new("UnstaffedHub", "test", || {
                Ok(Box::new(UnstaffedHub) as Box<dyn Hub>)
            }))
            .build()
            .await;
        assert_eq!(orchestrator.execute("做一个原型").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_builtin_test_hub_produces_result() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(&tmp, HUBS);
        cfg.matching.use_semantic = false;
        let orchestrator = ExchangeBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient))
            .build()
            .await;
        // 只命中 demo，选中测试团队
        let outcome = orchestrator.run_task("做一个原型").await.unwrap();
        assert_eq!(outcome.selected.unwrap().hub.hub_id, "test");
        assert!(outcome.result.unwrap().contains("## 测试员"));
    }

    #[tokio::test]
    async fn test_missing_hub_config_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(&tmp, HUBS);
        cfg.hubs.config_file = tmp.path().join("absent.json");
        cfg.matching.use_semantic = false;
        let orchestrator = ExchangeBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient))
            .build()
            .await;
        let err = orchestrator.execute("写一篇文章").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_semantic_extraction_with_prepared_vectors() {
        let mut catalog = CapabilityCatalog::new();
        catalog.register("coding", "编写程序代码", vec![]).unwrap();
        catalog.register("marketing", "品牌推广营销", vec![]).unwrap();
        let task = "实现一个排序函数";
        let embedder = MockEmbedder::new(3)
            .with_vector("编写程序代码", vec![1.0, 0.0, 0.0])
            .with_vector("品牌推广营销", vec![0.0, 1.0, 0.0])
            .with_vector(task, vec![0.9, 0.1, 0.0]);
        let service = EmbeddingService::new(
            Arc::new(embedder),
            Arc::new(VectorCache::in_memory("mock-embedding")),
        );
        let extractor = CapabilityExtractor::new(catalog, Some(Arc::new(service)));
        let caps = extractor.extract(task, true).await;
        assert_eq!(caps.into_iter().collect::<Vec<_>>(), vec!["coding".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_embeddings_match_keyword_path() {
        let catalog = CapabilityCatalog::builtin();
        let service = EmbeddingService::new(
            Arc::new(MockEmbedder::failing()),
            Arc::new(VectorCache::in_memory("mock-embedding")),
        );
        let extractor = CapabilityExtractor::new(catalog.clone(), Some(Arc::new(service)));
        for text in [
            "帮我写一份市场调研报告",
            "优化这个程序的性能",
            "hello",
            "Summarize the quarterly dataset",
        ] {
            let semantic = extractor.extract(text, true).await;
            assert!(!semantic.is_empty());
            assert_eq!(semantic, keyword_capabilities(&catalog, text).0);
        }
    }

    #[tokio::test]
    async fn test_discovery_skips_one_corrupt_plugin() {
        let tmp = TempDir::new().unwrap();
        for class in ["AlphaHub", "BetaHub", "GammaHub"] {
            write_plugin(tmp.path(), &class.to_lowercase(), &plugin_manifest(class));
        }
        write_plugin(tmp.path(), "corrupt", "[hub]\nclass = \"Corrupt\"\nname = ");

        let registry = HubRegistry::new().with_plugin_dir(tmp.path());
        let found = registry.discover_implementations().await;
        assert_eq!(
            found.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            vec!["AlphaHub", "BetaHub", "GammaHub"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_plugin_hub_executes() {
        let tmp = TempDir::new().unwrap();
        let hubs = r#"[
            {"hub_id": "echo", "name": "回显", "description": "", "capabilities": ["demo"], "hub_class": "EchoHub"}
        ]"#;
        let mut cfg = config(&tmp, hubs);
        cfg.matching.use_semantic = false;
        write_plugin(&cfg.hubs.plugin_dir, "echo", &plugin_manifest("EchoHub"));
        let orchestrator = ExchangeBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient))
            .with_builtin_hubs(false)
            .build()
            .await;
        assert_eq!(
            orchestrator.execute("演示 demo").await.unwrap(),
            Some("演示 demo".to_string())
        );
    }

    #[tokio::test]
    async fn test_embedding_cache_survives_restart() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp, HUBS);
        let cache_path = cfg.cache_path();

        let embedder = Arc::new(MockEmbedder::new(16));
        let orchestrator = ExchangeBuilder::new(cfg.clone())
            .with_llm(Arc::new(MockLlmClient))
            .with_embedder(embedder.clone())
            .build()
            .await;
        orchestrator.execute("写一篇关于 Rust 的文章").await.unwrap();
        orchestrator.shutdown().await.unwrap();
        assert!(cache_path.exists());
        let first_calls = embedder.call_count();
        assert!(first_calls > 0);

        // 重启后同样的文本全部命中缓存
        let embedder2 = Arc::new(MockEmbedder::new(16));
        let orchestrator = ExchangeBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient))
            .with_embedder(embedder2.clone())
            .build()
            .await;
        orchestrator.execute("写一篇关于 Rust 的文章").await.unwrap();
        assert_eq!(embedder2.call_count(), 0);
    }
}
