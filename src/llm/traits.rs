//! LLM 客户端抽象
//!
//! 团队型 Hub 通过 LlmClient 与模型对话；所有后端（OpenAI 兼容 / Mock）实现 complete。

use std::sync::Arc;

use async_trait::async_trait;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 单条对话消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 同一后端换用另一个模型；不支持切换模型的后端返回 None，调用方沿用自身
    fn for_model(&self, _model: &str) -> Option<Arc<dyn LlmClient>> {
        None
    }
}
