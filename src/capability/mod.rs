//! 能力系统
//!
//! 能力（Capability）是描述技能的抽象标签：任务需要能力，Hub 提供能力。
//! - `catalog`：能力目录（描述 + 关键词），静态内置或由 Hub 声明动态派生
//! - `extractor`：从任务文本提取能力（语义相似度优先，关键词回退）

mod catalog;
mod extractor;

pub use catalog::{CapabilityCatalog, CapabilityDescriptor};
pub use extractor::{
    keyword_capabilities, CapabilityExtractor, Extraction, ExtractionMethod,
    DEFAULT_SIMILARITY_THRESHOLD,
};
