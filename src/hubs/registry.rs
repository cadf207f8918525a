//! Hub 注册表
//!
//! - 实现发现：显式注册的候选（含内置表）在前，插件目录扫描结果在后；按实现类名去重，先到先得
//! - 描述加载：hubs_config.json，文件缺失、解析失败、hub_id 重复均为配置错误
//! - 实例缓存：每个 hub_id 至多一个实例，创建过程在互斥锁内串行

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::core::ExchangeError;
use crate::hubs::{builtin_candidates, scan_plugin_dir, Hub, HubDescriptor, HubInstance};
use crate::llm::LlmClient;

/// 无参构造 Hub 的工厂
pub type HubFactory = Arc<dyn Fn() -> Result<Box<dyn Hub>, ExchangeError> + Send + Sync>;

/// 待探测的候选实现
#[derive(Clone)]
pub struct HubCandidate {
    class: String,
    origin: String,
    factory: HubFactory,
}

impl HubCandidate {
    pub fn new<F>(class: impl Into<String>, origin: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Hub>, ExchangeError> + Send + Sync + 'static,
    {
        Self {
            class: class.into(),
            origin: origin.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn instantiate(&self) -> Result<Box<dyn Hub>, ExchangeError> {
        (self.factory)()
    }
}

impl std::fmt::Debug for HubCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubCandidate")
            .field("class", &self.class)
            .field("origin", &self.origin)
            .finish()
    }
}

/// 探测通过的实现：记录声明的名称、描述与能力
#[derive(Clone)]
pub struct Implementation {
    pub class: String,
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub origin: String,
    factory: HubFactory,
}

impl Implementation {
    pub fn instantiate(&self) -> Result<Box<dyn Hub>, ExchangeError> {
        (self.factory)()
    }

    /// 构造一次并读取声明；名称为空视为畸形实现
    fn probe(candidate: &HubCandidate) -> Result<Self, ExchangeError> {
        let hub = candidate.instantiate()?;
        if hub.name().trim().is_empty() {
            return Err(ExchangeError::Discovery(format!(
                "{}: implementation declares an empty name",
                candidate.class
            )));
        }
        Ok(Self {
            class: candidate.class.clone(),
            name: hub.name().to_string(),
            description: hub.description().to_string(),
            capabilities: hub.get_capabilities(),
            origin: candidate.origin.clone(),
            factory: candidate.factory.clone(),
        })
    }
}

impl std::fmt::Debug for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Implementation")
            .field("class", &self.class)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("origin", &self.origin)
            .finish()
    }
}

pub type ImplementationMap = BTreeMap<String, Implementation>;

#[derive(Default)]
pub struct HubRegistry {
    candidates: Vec<HubCandidate>,
    plugin_dir: Option<PathBuf>,
    implementations: RwLock<Option<Arc<ImplementationMap>>>,
    instances: Mutex<HashMap<String, Arc<HubInstance>>>,
}

impl HubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入内置团队 Hub
    pub fn with_builtin(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.candidates.extend(builtin_candidates(llm));
        self
    }

    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = Some(dir.into());
        self
    }

    /// 显式注册一个候选实现；已缓存的发现结果作废
    pub fn register(&mut self, candidate: HubCandidate) {
        tracing::debug!(class = %candidate.class, origin = %candidate.origin, "hub candidate registered");
        self.candidates.push(candidate);
        *self.implementations.get_mut() = None;
    }

    pub fn plugin_dir(&self) -> Option<&Path> {
        self.plugin_dir.as_deref()
    }

    /// 重新扫描全部候选；单个候选失败只记录日志并跳过
    pub async fn discover_implementations(&self) -> Arc<ImplementationMap> {
        let mut found = ImplementationMap::new();
        let mut skipped = 0usize;

        let plugin_results = match &self.plugin_dir {
            Some(dir) => scan_plugin_dir(dir),
            None => Vec::new(),
        };
        let registered = self.candidates.iter().cloned().map(Ok);

        for result in registered.chain(plugin_results) {
            let candidate = match result {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("hub candidate skipped: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            if let Some(existing) = found.get(&candidate.class) {
                // 同名类视为再导出，保留先发现的
                tracing::warn!(
                    class = %candidate.class,
                    kept = %existing.origin,
                    ignored = %candidate.origin,
                    "duplicate hub implementation ignored"
                );
                continue;
            }
            match Implementation::probe(&candidate) {
                Ok(imp) => {
                    tracing::debug!(class = %imp.class, name = %imp.name, "hub implementation discovered");
                    found.insert(imp.class.clone(), imp);
                }
                Err(e) => {
                    tracing::warn!(class = %candidate.class, origin = %candidate.origin, "hub candidate skipped: {}", e);
                    skipped += 1;
                }
            }
        }

        tracing::info!(
            discovered = found.len(),
            skipped,
            "hub implementation discovery finished"
        );
        let found = Arc::new(found);
        *self.implementations.write().await = Some(found.clone());
        found
    }

    /// 已发现的实现；尚未发现时先执行一次发现
    pub async fn implementations(&self) -> Arc<ImplementationMap> {
        if let Some(map) = self.implementations.read().await.as_ref() {
            return map.clone();
        }
        self.discover_implementations().await
    }

    /// 读取 Hub 描述文件（JSON 数组）
    pub fn load_descriptors(path: &Path) -> Result<Vec<HubDescriptor>, ExchangeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ExchangeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse_descriptors(&text)
            .map_err(|e| ExchangeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// 解析描述列表；保持文件中的顺序
    pub fn parse_descriptors(text: &str) -> Result<Vec<HubDescriptor>, ExchangeError> {
        let descriptors: Vec<HubDescriptor> =
            serde_json::from_str(text).map_err(|e| ExchangeError::Config(e.to_string()))?;
        let mut seen = HashSet::new();
        for d in &descriptors {
            if d.hub_id.trim().is_empty() {
                return Err(ExchangeError::Config("empty hub_id".to_string()));
            }
            if !seen.insert(d.hub_id.as_str()) {
                return Err(ExchangeError::Config(format!("duplicate hub_id: {}", d.hub_id)));
            }
        }
        Ok(descriptors)
    }

    /// 取得（必要时创建）描述对应的实例；实现类无法解析或构造失败时返回 None
    pub async fn instance_for(&self, descriptor: &HubDescriptor) -> Option<Arc<HubInstance>> {
        let mut instances = self.instances.lock().await;
        if let Some(instance) = instances.get(&descriptor.hub_id) {
            return Some(instance.clone());
        }

        let implementations = self.implementations().await;
        let Some(imp) = implementations.get(&descriptor.hub_class) else {
            tracing::error!(
                hub_id = %descriptor.hub_id,
                hub_class = %descriptor.hub_class,
                available = ?implementations.keys().collect::<Vec<_>>(),
                "hub implementation not found"
            );
            return None;
        };

        match imp.instantiate() {
            Ok(hub) => {
                tracing::info!(hub_id = %descriptor.hub_id, class = %imp.class, "hub instance created");
                let instance = Arc::new(HubInstance::new(descriptor.hub_id.clone(), hub));
                instances.insert(descriptor.hub_id.clone(), instance.clone());
                Some(instance)
            }
            Err(e) => {
                tracing::error!(hub_id = %descriptor.hub_id, class = %imp.class, "hub instantiation failed: {}", e);
                None
            }
        }
    }

    pub async fn instance_count(&self) -> usize {
        self.instances.lock().await.len()
    }
}
