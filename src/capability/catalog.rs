//! 能力目录：能力标签 -> 描述文本（语义匹配用）+ 关键词（回退匹配用）
//!
//! 目录可以静态构建（内置表），也可以从已发现 Hub 声明的能力动态扩展；运行时可注册新能力，不会自动删除。
//! 覆盖文件格式：`{"descriptions": {tag: text}, "keywords": {tag: [..]}}`。

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::ExchangeError;

/// 单个能力的描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub tag: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

const BUILTIN_DESCRIPTIONS: &[(&str, &str)] = &[
    ("research", "信息搜索、调研、资料收集、数据分析、市场研究、学术研究、背景调查"),
    ("analysis", "数据分析、趋势分析、统计分析、内容分析、比较分析、深度分析"),
    ("writing", "文章撰写、内容创作、文案写作、报告编写、博客写作、创意写作"),
    ("summary", "内容总结、摘要提取、要点归纳、信息整理、精华提炼"),
    ("report", "报告生成、文档制作、方案撰写、总结报告、分析报告"),
    ("coding", "编程开发、代码编写、软件开发、脚本编写、算法实现、程序设计"),
    ("debugging", "代码调试、错误修复、问题诊断、bug修复、程序调试"),
    ("optimization", "性能优化、代码优化、系统优化、效率提升、速度优化"),
    ("technical", "技术咨询、技术支持、技术分析、架构设计、技术方案"),
    ("data_analysis", "数据处理、数据挖掘、数据可视化、统计分析、数据科学"),
    ("test", "软件测试、功能测试、性能测试、自动化测试、测试用例设计"),
    ("demo", "演示制作、原型开发、概念验证、示例创建、展示设计"),
    ("example", "示例代码、使用案例、教程制作、样例开发、参考实现"),
    ("creative", "创意设计、艺术创作、创新思维、概念设计、视觉设计"),
    ("design", "界面设计、用户体验、产品设计、视觉设计、交互设计"),
    ("business", "商业分析、市场策略、商业计划、竞争分析、商业咨询"),
    ("marketing", "市场营销、品牌推广、营销策略、广告创意、社交媒体"),
    ("education", "教学设计、课程开发、培训材料、学习指导、知识传授"),
    ("tutorial", "教程制作、指导文档、学习资料、操作指南、培训内容"),
];

const BUILTIN_KEYWORDS: &[(&str, &[&str])] = &[
    ("research", &["调研", "研究", "搜索", "查找", "了解", "分析", "调查", "research", "investigate", "look up"]),
    ("writing", &["写", "撰写", "生成", "创作", "编写", "写作", "write", "draft", "compose"]),
    ("summary", &["总结", "汇总", "概括", "整理", "归纳", "summarize", "summary", "tl;dr"]),
    ("report", &["报告", "文档", "方案", "总结报告", "report", "document", "proposal"]),
    ("coding", &["代码", "编程", "开发", "程序", "算法", "code", "coding", "program", "implement", "algorithm"]),
    ("debugging", &["调试", "修复", "错误", "bug", "debug", "fix"]),
    ("optimization", &["优化", "性能", "提升", "改进", "optimiz", "performance", "speed up"]),
    ("technical", &["技术", "架构", "系统", "工程", "architecture", "technical", "engineering"]),
    ("data_analysis", &["数据", "统计", "分析", "挖掘", "data", "statistic", "dataset"]),
    ("test", &["测试", "验证", "检验", "unit test", "testing", "verify"]),
    ("demo", &["演示", "展示", "原型", "demo", "prototype", "showcase"]),
    ("example", &["示例", "例子", "案例", "样例", "example", "sample"]),
];

/// 能力目录
#[derive(Debug, Clone, Default)]
pub struct CapabilityCatalog {
    entries: BTreeMap<String, CapabilityDescriptor>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    descriptions: BTreeMap<String, String>,
    #[serde(default)]
    keywords: BTreeMap<String, Vec<String>>,
}

impl CapabilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置静态目录
    pub fn builtin() -> Self {
        let keywords: HashMap<&str, &[&str]> = BUILTIN_KEYWORDS.iter().copied().collect();
        let entries = BUILTIN_DESCRIPTIONS
            .iter()
            .map(|(tag, desc)| {
                let kws: Vec<String> = keywords
                    .get(tag)
                    .map(|k| k.iter().map(|s| s.to_string()).collect())
                    .unwrap_or_default();
                (
                    tag.to_string(),
                    CapabilityDescriptor {
                        tag: tag.to_string(),
                        description: desc.to_string(),
                        keywords: kws,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// 注册（或覆盖）一个能力；描述为空时拒绝。keywords 为空时保留已有关键词
    pub fn register(
        &mut self,
        tag: &str,
        description: &str,
        keywords: Vec<String>,
    ) -> Result<(), ExchangeError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ExchangeError::InvalidCapability("empty tag".to_string()));
        }
        if description.trim().is_empty() {
            return Err(ExchangeError::InvalidCapability(format!(
                "{}: description must not be empty",
                tag
            )));
        }
        let keywords = if keywords.is_empty() {
            self.entries
                .get(tag)
                .map(|d| d.keywords.clone())
                .unwrap_or_default()
        } else {
            keywords
        };
        self.entries.insert(
            tag.to_string(),
            CapabilityDescriptor {
                tag: tag.to_string(),
                description: description.trim().to_string(),
                keywords,
            },
        );
        tracing::debug!(capability = %tag, "capability registered");
        Ok(())
    }

    /// 从 Hub 声明的能力动态扩展：目录中没有的标签用声明它的 Hub 描述拼成描述文本，返回新增数量
    pub fn extend_from_hubs<'a, I>(&mut self, hubs: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let mut derived: BTreeMap<String, Vec<&'a str>> = BTreeMap::new();
        for (hub_description, capabilities) in hubs {
            for cap in capabilities {
                let cap = cap.trim();
                if cap.is_empty() || self.entries.contains_key(cap) {
                    continue;
                }
                let descs = derived.entry(cap.to_string()).or_default();
                if !hub_description.is_empty() && !descs.contains(&hub_description) {
                    descs.push(hub_description);
                }
            }
        }

        let added = derived.len();
        for (tag, descs) in derived {
            let readable = tag.replace('_', " ");
            let description = if descs.is_empty() {
                readable.clone()
            } else {
                format!("{}：{}", readable, descs.join("；"))
            };
            let mut keywords = vec![tag.clone()];
            if readable != tag {
                keywords.push(readable);
            }
            self.entries.insert(
                tag.clone(),
                CapabilityDescriptor {
                    tag,
                    description,
                    keywords,
                },
            );
        }
        if added > 0 {
            tracing::info!("Derived {} capabilities from hub declarations", added);
        }
        added
    }

    pub fn get(&self, tag: &str) -> Option<&CapabilityDescriptor> {
        self.entries.get(tag)
    }

    /// 能力描述；未知标签返回标签本身
    pub fn description_of<'a>(&'a self, tag: &'a str) -> &'a str {
        self.entries
            .get(tag)
            .map(|d| d.description.as_str())
            .unwrap_or(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.entries.values()
    }

    pub fn tags(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 保存描述与关键词到 JSON 文件
    pub fn save(&self, path: &Path) -> Result<(), ExchangeError> {
        let file = CatalogFile {
            descriptions: self
                .entries
                .iter()
                .map(|(k, d)| (k.clone(), d.description.clone()))
                .collect(),
            keywords: self
                .entries
                .iter()
                .filter(|(_, d)| !d.keywords.is_empty())
                .map(|(k, d)| (k.clone(), d.keywords.clone()))
                .collect(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExchangeError::CacheIo(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| ExchangeError::CacheIo(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| ExchangeError::CacheIo(e.to_string()))?;
        tracing::info!(path = %path.display(), "capability catalog saved");
        Ok(())
    }

    /// 从 JSON 文件合并描述与关键词；文件缺失或损坏时记日志并返回 0
    pub fn load(&mut self, path: &Path) -> usize {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) => {
                if path.exists() {
                    tracing::warn!(path = %path.display(), "failed to read capability file: {}", e);
                }
                return 0;
            }
        };
        let file: CatalogFile = match serde_json::from_str(&data) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path.display(), "capability file corrupt: {}", e);
                return 0;
            }
        };

        let mut merged = 0;
        for (tag, description) in file.descriptions {
            let keywords = file.keywords.get(&tag).cloned().unwrap_or_default();
            match self.register(&tag, &description, keywords) {
                Ok(()) => merged += 1,
                Err(e) => tracing::warn!("skip capability from file: {}", e),
            }
        }
        // 只有关键词、没有描述的条目：补充到已有能力
        for (tag, keywords) in file.keywords {
            match self.entries.get_mut(&tag) {
                Some(entry) => entry.keywords = keywords,
                None => tracing::warn!(
                    path = %path.display(),
                    capability = %tag,
                    "skip keywords for capability without description"
                ),
            }
        }
        tracing::info!(path = %path.display(), "Loaded {} capabilities from file", merged);
        merged
    }
}
