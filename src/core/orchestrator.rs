//! 交换编排器：任务文本 → 能力提取 → Hub 发现与描述加载 → 打分选择 → 实例获取 → 执行
//!
//! 只有配置错误（Hub 描述文件缺失或无法解析）会以 Err 返回；
//! 实例化失败与执行失败都降级为空结果，并通过 Reporter 报告。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capability::{CapabilityExtractor, ExtractionMethod};
use crate::core::{ExchangeError, ExchangeEvent, RankRow, Reporter, TaskRequest, TracingReporter};
use crate::embedding::EmbeddingService;
use crate::hubs::HubRegistry;
use crate::matching::{HubSelector, ScoredHub};

/// 一次编排的完整结果
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub task: TaskRequest,
    pub method: ExtractionMethod,
    /// 选中的 Hub；Hub 列表为空时为 None
    pub selected: Option<ScoredHub>,
    pub result: Option<String>,
}

pub struct ExchangeOrchestrator {
    extractor: CapabilityExtractor,
    registry: HubRegistry,
    selector: HubSelector,
    reporter: Arc<dyn Reporter>,
    hubs_config: PathBuf,
    use_semantic: bool,
    embeddings: Option<Arc<EmbeddingService>>,
}

impl ExchangeOrchestrator {
    pub fn new(
        extractor: CapabilityExtractor,
        registry: HubRegistry,
        hubs_config: impl Into<PathBuf>,
    ) -> Self {
        let use_semantic = extractor.has_semantic();
        Self {
            extractor,
            registry,
            selector: HubSelector::new(),
            reporter: Arc::new(TracingReporter),
            hubs_config: hubs_config.into(),
            use_semantic,
            embeddings: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_semantic(mut self, use_semantic: bool) -> Self {
        self.use_semantic = use_semantic;
        self
    }

    /// 关联嵌入服务，shutdown 时落盘其缓存
    pub fn with_embeddings(mut self, embeddings: Option<Arc<EmbeddingService>>) -> Self {
        self.embeddings = embeddings;
        self
    }

    pub fn extractor(&self) -> &CapabilityExtractor {
        &self.extractor
    }

    pub fn registry(&self) -> &HubRegistry {
        &self.registry
    }

    pub fn hubs_config(&self) -> &Path {
        &self.hubs_config
    }

    /// 解析任务文本，生成 TaskRequest
    pub async fn create_task_request(&self, task_text: &str) -> (TaskRequest, ExtractionMethod) {
        let extraction = self
            .extractor
            .extract_detailed(task_text, self.use_semantic)
            .await;
        let task = TaskRequest::new(task_text, extraction.capabilities);
        self.reporter.report(&ExchangeEvent::TaskParsed {
            task_id: task.id().to_string(),
            capabilities: task.required_capabilities().iter().cloned().collect(),
            method: extraction.method.as_str().to_string(),
        });
        (task, extraction.method)
    }

    /// 发现实现、加载描述并为任务选出 Hub；描述加载失败为配置错误
    pub async fn select_hub(&self, task: &TaskRequest) -> Result<Option<ScoredHub>, ExchangeError> {
        let implementations = self.registry.implementations().await;
        self.reporter.report(&ExchangeEvent::ImplementationsDiscovered {
            names: implementations.keys().cloned().collect(),
        });

        let descriptors = HubRegistry::load_descriptors(&self.hubs_config)?;
        self.reporter.report(&ExchangeEvent::DescriptorsLoaded {
            count: descriptors.len(),
        });

        let ranked = self.selector.rank(task, &descriptors);
        self.reporter.report(&ExchangeEvent::HubsRanked {
            rows: ranked
                .iter()
                .map(|s| RankRow {
                    hub_id: s.hub.hub_id.clone(),
                    name: s.hub.name.clone(),
                    score: s.score,
                    matched: s.breakdown.matched.clone(),
                })
                .collect(),
        });

        let Some(best) = ranked.into_iter().next() else {
            tracing::warn!(config = %self.hubs_config.display(), "no hubs configured");
            return Ok(None);
        };
        if best.is_default_choice() {
            self.reporter.report(&ExchangeEvent::NoMatchingHub {
                default_hub_id: best.hub.hub_id.clone(),
            });
        }
        self.reporter.report(&ExchangeEvent::HubSelected {
            hub_id: best.hub.hub_id.clone(),
            name: best.hub.name.clone(),
            score: best.score,
        });
        Ok(Some(best))
    }

    /// 完整流程，返回任务、选择与结果
    pub async fn run_task(&self, task_text: &str) -> Result<ExchangeOutcome, ExchangeError> {
        let (task, method) = self.create_task_request(task_text).await;
        let selected = self.select_hub(&task).await?;

        let result = match &selected {
            Some(best) => self.run_on(best, task.original_text()).await,
            None => None,
        };
        Ok(ExchangeOutcome {
            task,
            method,
            selected,
            result,
        })
    }

    /// 执行任务：仅配置错误返回 Err，其余失败为 Ok(None)
    pub async fn execute(&self, task_text: &str) -> Result<Option<String>, ExchangeError> {
        Ok(self.run_task(task_text).await?.result)
    }

    async fn run_on(&self, best: &ScoredHub, task_text: &str) -> Option<String> {
        let hub_id = best.hub.hub_id.clone();
        let Some(instance) = self.registry.instance_for(&best.hub).await else {
            self.reporter.report(&ExchangeEvent::ExecutionFailed {
                hub_id,
                reason: format!("implementation '{}' unavailable", best.hub.hub_class),
            });
            return None;
        };

        self.reporter.report(&ExchangeEvent::ExecutionStarted {
            hub_id: hub_id.clone(),
        });
        // 在独立任务中运行，Hub 内部 panic 只会让本次执行失败
        let task = task_text.to_string();
        let handle = tokio::spawn(async move { instance.run(&task).await });
        let reason = match handle.await {
            Ok(Ok(result)) => {
                self.reporter.report(&ExchangeEvent::ExecutionFinished {
                    hub_id,
                    has_result: result.is_some(),
                });
                return result;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("hub task aborted: {}", e),
        };
        self.reporter.report(&ExchangeEvent::ExecutionFailed { hub_id, reason });
        None
    }

    /// 退出前落盘向量缓存
    pub async fn shutdown(&self) -> Result<(), ExchangeError> {
        if let Some(embeddings) = &self.embeddings {
            let written = embeddings.cache().flush().await?;
            tracing::info!(entries = written, "embedding cache flushed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityCatalog;
    use crate::core::ChannelReporter;
    use crate::hubs::{Hub, HubCandidate, Team};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct StaticHub {
        reply: Option<&'static str>,
        fail: bool,
    }

    struct StaticTeam {
        reply: Option<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl Team for StaticTeam {
        async fn run(&self, _task: &str) -> Result<Option<String>, ExchangeError> {
            if self.fail {
                return Err(ExchangeError::Execution("boom".to_string()));
            }
            Ok(self.reply.map(|s| s.to_string()))
        }
    }

    #[async_trait]
    impl Hub for StaticHub {
        fn name(&self) -> &str {
            "static"
        }

        fn description(&self) -> &str {
            "static replies"
        }

        fn get_capabilities(&self) -> Vec<String> {
            vec!["coding".to_string()]
        }

        async fn setup_team(&self) -> Result<Box<dyn Team>, ExchangeError> {
            Ok(Box::new(StaticTeam {
                reply: self.reply,
                fail: self.fail,
            }))
        }
    }

    struct PanickingTeam;

    #[async_trait]
    impl Team for PanickingTeam {
        async fn run(&self, _task: &str) -> Result<Option<String>, ExchangeError> {
            panic!("team crashed");
        }
    }

    struct PanickingHub;

    #[async_trait]
    impl Hub for PanickingHub {
        fn name(&self) -> &str {
            "panicking"
        }

        fn description(&self) -> &str {
            "crashes on every task"
        }

        fn get_capabilities(&self) -> Vec<String> {
            vec!["coding".to_string()]
        }

        async fn setup_team(&self) -> Result<Box<dyn Team>, ExchangeError> {
            Ok(Box::new(PanickingTeam))
        }
    }

    const HUBS: &str = r#"[
        {"hub_id": "writer", "name": "写作", "description": "", "capabilities": ["writing", "research"], "hub_class": "OkHub"},
        {"hub_id": "coder", "name": "编程", "description": "", "capabilities": ["coding", "debugging"], "hub_class": "OkHub"},
        {"hub_id": "broken", "name": "故障", "description": "", "capabilities": ["test", "demo"], "hub_class": "FailHub"},
        {"hub_id": "ghost", "name": "幽灵", "description": "", "capabilities": ["example"], "hub_class": "MissingHub"}
    ]"#;

    fn registry() -> HubRegistry {
        let mut registry = HubRegistry::new();
        registry.register(HubCandidate::new("OkHub", "test", || {
            Ok(Box::new(StaticHub {
                reply: Some("done"),
                fail: false,
            }) as Box<dyn Hub>)
        }));
        registry.register(HubCandidate::new("FailHub", "test", || {
            Ok(Box::new(StaticHub {
                reply: None,
                fail: true,
            }) as Box<dyn Hub>)
        }));
        registry
    }

    fn orchestrator(dir: &TempDir) -> ExchangeOrchestrator {
        let path = dir.path().join("hubs_config.json");
        std::fs::write(&path, HUBS).unwrap();
        let extractor = CapabilityExtractor::new(CapabilityCatalog::builtin(), None);
        ExchangeOrchestrator::new(extractor, registry(), path)
    }

    #[tokio::test]
    async fn test_execute_routes_to_best_hub() {
        let tmp = TempDir::new().unwrap();
        let (reporter, mut rx) = ChannelReporter::new();
        let orch = orchestrator(&tmp).with_reporter(Arc::new(reporter));
        let outcome = orch.run_task("帮我调试这段代码的 bug").await.unwrap();
        assert_eq!(outcome.selected.unwrap().hub.hub_id, "coder");
        assert_eq!(outcome.result, Some("done".to_string()));

        let mut saw_finished = false;
        while let Ok(event) = rx.try_recv() {
            if let ExchangeEvent::ExecutionFinished { hub_id, has_result } = event {
                assert_eq!(hub_id, "coder");
                assert!(has_result);
                saw_finished = true;
            }
        }
        assert!(saw_finished);
    }

    #[tokio::test]
    async fn test_missing_config_is_fatal() {
        let extractor = CapabilityExtractor::new(CapabilityCatalog::builtin(), None);
        let tmp = TempDir::new().unwrap();
        let orch = ExchangeOrchestrator::new(extractor, registry(), tmp.path().join("none.json"));
        let err = orch.execute("写一篇文章").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_execution_failure_becomes_none() {
        let tmp = TempDir::new().unwrap();
        let orch = orchestrator(&tmp);
        let outcome = orch.run_task("做一个原型演示").await.unwrap();
        assert_eq!(outcome.selected.unwrap().hub.hub_id, "broken");
        assert_eq!(outcome.result, None);
    }

    #[tokio::test]
    async fn test_panicking_team_becomes_none() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hubs_config.json");
        std::fs::write(
            &path,
            r#"[{"hub_id": "crash", "name": "崩溃", "description": "", "capabilities": ["coding"], "hub_class": "PanickingHub"}]"#,
        )
        .unwrap();
        let mut registry = HubRegistry::new();
        registry.register(HubCandidate::new("PanickingHub", "test", || {
            Ok(Box::new(PanickingHub) as Box<dyn Hub>)
        }));
        let extractor = CapabilityExtractor::new(CapabilityCatalog::builtin(), None);
        let (reporter, mut rx) = ChannelReporter::new();
        let orch = ExchangeOrchestrator::new(extractor, registry, path).with_reporter(Arc::new(reporter));

        assert_eq!(orch.execute("写一段代码").await.unwrap(), None);
        let failed = std::iter::from_fn(|| rx.try_recv().ok())
            .any(|e| matches!(e, ExchangeEvent::ExecutionFailed { ref hub_id, .. } if hub_id == "crash"));
        assert!(failed);

        // 崩溃后编排器仍可继续处理任务
        assert_eq!(orch.execute("写一段代码").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unresolved_implementation_becomes_none() {
        let tmp = TempDir::new().unwrap();
        let (reporter, mut rx) = ChannelReporter::new();
        let orch = orchestrator(&tmp).with_reporter(Arc::new(reporter));
        assert_eq!(orch.execute("给几个样例").await.unwrap(), None);
        let failed = std::iter::from_fn(|| rx.try_recv().ok())
            .any(|e| matches!(e, ExchangeEvent::ExecutionFailed { ref hub_id, .. } if hub_id == "ghost"));
        assert!(failed);
    }

    #[tokio::test]
    async fn test_shutdown_without_embeddings_is_ok() {
        let tmp = TempDir::new().unwrap();
        assert!(orchestrator(&tmp).shutdown().await.is_ok());
    }
}
