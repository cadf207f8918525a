//! 命令插件 Hub：插件目录下每个含 hub.toml 的子目录即一个候选实现
//!
//! ```toml
//! [hub]
//! class = "EchoHub"
//! name = "回显团队"
//! description = "..."
//! capabilities = ["test", "demo"]
//! program = "echo"
//! args = ["{{task}}"]
//! timeout_secs = 60
//! ```
//!
//! args 中 {{task}} 替换为任务文本，{{dir}} 替换为插件目录；无 shell，直接 exec program + args，带超时。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::core::ExchangeError;
use crate::hubs::{Hub, HubCandidate, Team};

pub const MANIFEST_FILE: &str = "hub.toml";

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestFile {
    hub: HubManifest,
}

/// hub.toml 中的 [hub] 段
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HubManifest {
    pub class: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HubManifest {
    /// 读取并校验插件目录下的 hub.toml
    pub fn load(dir: &Path) -> Result<Self, ExchangeError> {
        let path = dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ExchangeError::Discovery(format!("{}: {}", path.display(), e)))?;
        let file: ManifestFile = toml::from_str(&text)
            .map_err(|e| ExchangeError::Discovery(format!("{}: {}", path.display(), e)))?;
        let manifest = file.hub;
        if manifest.class.trim().is_empty() {
            return Err(ExchangeError::Discovery(format!(
                "{}: empty class",
                path.display()
            )));
        }
        if manifest.program.trim().is_empty() {
            return Err(ExchangeError::Discovery(format!(
                "{}: empty program",
                path.display()
            )));
        }
        Ok(manifest)
    }
}

/// 运行外部程序的 Hub
#[derive(Debug, Clone)]
pub struct CommandHub {
    manifest: HubManifest,
    dir: PathBuf,
}

impl CommandHub {
    pub fn new(manifest: HubManifest, dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            dir: dir.into(),
        }
    }

    pub fn manifest(&self) -> &HubManifest {
        &self.manifest
    }
}

#[async_trait]
impl Hub for CommandHub {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn description(&self) -> &str {
        &self.manifest.description
    }

    fn get_capabilities(&self) -> Vec<String> {
        self.manifest.capabilities.clone()
    }

    async fn setup_team(&self) -> Result<Box<dyn Team>, ExchangeError> {
        if !self.dir.is_dir() {
            return Err(ExchangeError::Instantiation(format!(
                "{}: plugin directory missing: {}",
                self.manifest.name,
                self.dir.display()
            )));
        }
        Ok(Box::new(CommandTeam {
            name: self.manifest.name.clone(),
            program: self.manifest.program.clone(),
            args_template: self.manifest.args.clone(),
            dir: self.dir.clone(),
            timeout_secs: self.manifest.timeout_secs,
        }))
    }
}

struct CommandTeam {
    name: String,
    program: String,
    args_template: Vec<String>,
    dir: PathBuf,
    timeout_secs: u64,
}

impl CommandTeam {
    fn substitute(&self, task: &str) -> Vec<String> {
        let dir = self.dir.to_string_lossy();
        self.args_template
            .iter()
            .map(|tpl| tpl.replace("{{dir}}", &dir).replace("{{task}}", task))
            .collect()
    }
}

#[async_trait]
impl Team for CommandTeam {
    async fn run(&self, task: &str) -> Result<Option<String>, ExchangeError> {
        let args = self.substitute(task);
        tracing::info!(hub = %self.name, program = %self.program, "plugin hub invoke");
        let child = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.dir)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExchangeError::Execution(format!("{}: spawn failed: {}", self.name, e)))?;
        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            ExchangeError::Execution(format!("{}: timeout after {}s", self.name, self.timeout_secs))
        })?
        .map_err(|e| ExchangeError::Execution(format!("{}: wait failed: {}", self.name, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExchangeError::Execution(format!(
                "{}: exit {:?}: {}",
                self.name,
                output.status.code(),
                stderr.trim()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if stdout.is_empty() { None } else { Some(stdout) })
    }
}

/// 扫描插件目录：每个含 hub.toml 的子目录产生一个结果，按目录名排序
///
/// 目录不存在时返回空；单个清单的错误只影响该条目。
pub fn scan_plugin_dir(dir: &Path) -> Vec<Result<HubCandidate, ExchangeError>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), "plugin dir not readable: {}", e);
            return Vec::new();
        }
    };
    let mut subdirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && p.join(MANIFEST_FILE).is_file())
        .collect();
    subdirs.sort();

    subdirs
        .into_iter()
        .map(|sub| -> Result<HubCandidate, ExchangeError> {
            let manifest = HubManifest::load(&sub)?;
            let origin = sub.display().to_string();
            let class = manifest.class.clone();
            Ok(HubCandidate::new(class, origin, move || {
                Ok(Box::new(CommandHub::new(manifest.clone(), sub.clone())) as Box<dyn Hub>)
            }))
        })
        .collect()
}
