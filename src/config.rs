//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AEX__*` 覆盖（双下划线表示嵌套，如 `AEX__MATCHING__SIMILARITY_THRESHOLD=0.4`）。
//! 每个字段都有默认值，空配置也是合法配置。

use std::path::PathBuf;

use serde::Deserialize;

use crate::capability::DEFAULT_SIMILARITY_THRESHOLD;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub hubs: HubsSection,
    pub embedding: EmbeddingSection,
    pub matching: MatchingSection,
    pub llm: LlmSection,
}

impl AppConfig {
    /// 向量缓存文件：未配置时为 `<data_dir>/embeddings.json`
    pub fn cache_path(&self) -> PathBuf {
        self.embedding
            .cache_file
            .clone()
            .unwrap_or_else(|| self.app.data_dir.join("embeddings.json"))
    }
}

/// [app] 段：应用名（日志中标识实例）、数据目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub data_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "aex".to_string(),
            data_dir: PathBuf::from("cache"),
        }
    }
}

/// [hubs] 段：Hub 描述文件与插件目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubsSection {
    pub config_file: PathBuf,
    pub plugin_dir: PathBuf,
}

impl Default for HubsSection {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("hubs_config.json"),
            plugin_dir: PathBuf::from("config/hubs"),
        }
    }
}

/// [embedding] 段：远程嵌入后端（jina / openai）与缓存
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub enabled: bool,
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时读 JINA_API_KEY / OPENAI_API_KEY
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub cache_file: Option<PathBuf>,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "jina".to_string(),
            model: "jina-clip-v2".to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 30,
            cache_file: None,
        }
    }
}

/// 能力目录来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// 内置静态表
    #[default]
    Builtin,
    /// 内置表 + 已发现 Hub 声明的能力
    Discovered,
}

/// [matching] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingSection {
    pub use_semantic: bool,
    pub similarity_threshold: f32,
    pub catalog_source: CatalogSource,
    /// 能力描述/关键词覆盖文件（JSON）
    pub capabilities_file: Option<PathBuf>,
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            use_semantic: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            catalog_source: CatalogSource::default(),
            capabilities_file: None,
        }
    }
}

/// [llm] 段：内置团队 Hub 使用的对话模型
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai | mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// 从 config 目录加载配置，环境变量 AEX__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AEX__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AEX")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
