//! 交换平台错误类型
//!
//! 只有配置错误会中断整条流水线；其余错误都降级处理（关键词回退、批量结果缺项、默认 Hub、空结果）。

use thiserror::Error;

/// 能力匹配与 Hub 调度过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    /// Hub 配置文件缺失或格式错误：本次编排无法继续
    #[error("Config error: {0}")]
    Config(String),

    /// 单个插件候选加载失败：跳过该候选，继续发现
    #[error("Hub discovery failed: {0}")]
    Discovery(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding timeout after {0}s")]
    EmbeddingTimeout(u64),

    /// implementation_ref 无法解析或构造失败
    #[error("Hub instantiation failed: {0}")]
    Instantiation(String),

    #[error("Hub execution failed: {0}")]
    Execution(String),

    #[error("Cache I/O error: {0}")]
    CacheIo(String),

    #[error("Invalid capability: {0}")]
    InvalidCapability(String),
}

impl ExchangeError {
    /// 是否为致命错误（只有配置错误会中止编排）
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExchangeError::Config(_))
    }

    /// 是否可通过关键词匹配回退
    pub fn is_embedding_failure(&self) -> bool {
        matches!(
            self,
            ExchangeError::Embedding(_) | ExchangeError::EmbeddingTimeout(_)
        )
    }
}
