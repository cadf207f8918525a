//! Hub 系统
//!
//! Hub 是一组能力及其背后可执行任务的团队：
//! - `HubDescriptor`：外部配置中的静态描述（hub_id / 能力 / 绑定的实现类）
//! - `Hub` trait：实现类（名称、描述、声明的能力、组建团队）
//! - `HubInstance`：运行期实例，首次 run 前组建一次团队并复用
//! - `registry`：实现发现（内置表 + 插件目录 + 显式注册）、描述加载、实例缓存

mod builtin;
mod plugin;
mod registry;
mod team;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::core::ExchangeError;

pub use builtin::{builtin_candidates, TEAM_SPECS};
pub use plugin::{scan_plugin_dir, CommandHub, HubManifest, MANIFEST_FILE};
pub use registry::{HubCandidate, HubFactory, HubRegistry, Implementation, ImplementationMap};
pub use team::{MemberSpec, PromptTeam, TeamHub, TeamMember, TeamSpec};

/// Hub 配置记录（hubs_config.json 中的一项）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubDescriptor {
    pub hub_id: String,
    pub name: String,
    pub description: String,
    pub capabilities: BTreeSet<String>,
    /// 绑定的实现类名
    pub hub_class: String,
}

/// 运行期团队：接收任务文本，返回结果（可能为空）
#[async_trait]
pub trait Team: Send + Sync {
    async fn run(&self, task: &str) -> Result<Option<String>, ExchangeError>;
}

/// Hub 实现：构造无需参数，由 HubFactory 创建
#[async_trait]
pub trait Hub: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 声明的能力标签
    fn get_capabilities(&self) -> Vec<String>;

    /// 组建运行期团队
    async fn setup_team(&self) -> Result<Box<dyn Team>, ExchangeError>;
}

/// 与 hub_id 一一绑定的运行期实例
pub struct HubInstance {
    hub_id: String,
    hub: Box<dyn Hub>,
    team: OnceCell<Box<dyn Team>>,
}

impl HubInstance {
    pub fn new(hub_id: impl Into<String>, hub: Box<dyn Hub>) -> Self {
        Self {
            hub_id: hub_id.into(),
            hub,
            team: OnceCell::new(),
        }
    }

    pub fn hub_id(&self) -> &str {
        &self.hub_id
    }

    pub fn name(&self) -> &str {
        self.hub.name()
    }

    pub fn capabilities(&self) -> Vec<String> {
        self.hub.get_capabilities()
    }

    pub fn is_initialized(&self) -> bool {
        self.team.initialized()
    }

    /// 组建团队（只做一次）
    pub async fn initialize(&self) -> Result<(), ExchangeError> {
        self.team
            .get_or_try_init(|| async {
                let team = self.hub.setup_team().await?;
                tracing::info!(hub = %self.hub.name(), "hub team ready");
                Ok::<_, ExchangeError>(team)
            })
            .await?;
        Ok(())
    }

    /// 执行任务：必要时先组建团队
    pub async fn run(&self, task: &str) -> Result<Option<String>, ExchangeError> {
        self.initialize().await?;
        let team = self
            .team
            .get()
            .ok_or_else(|| ExchangeError::Execution(format!("{}: team not initialized", self.hub_id)))?;
        tracing::info!(hub = %self.hub.name(), "hub run started");
        let result = team.run(task).await;
        match &result {
            Ok(_) => tracing::info!(hub = %self.hub.name(), "hub run finished"),
            Err(e) => tracing::warn!(hub = %self.hub.name(), "hub run failed: {}", e),
        }
        result
    }
}

impl std::fmt::Debug for HubInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubInstance")
            .field("hub_id", &self.hub_id)
            .field("name", &self.hub.name())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
