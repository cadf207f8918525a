//! 任务请求：每个用户任务创建一次，创建后不可变

use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

/// 用户任务及其所需能力
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRequest {
    id: String,
    original_text: String,
    required_capabilities: BTreeSet<String>,
}

impl TaskRequest {
    pub fn new(
        original_text: impl Into<String>,
        required_capabilities: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_text: original_text.into(),
            required_capabilities: required_capabilities.into_iter().collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn required_capabilities(&self) -> &BTreeSet<String> {
        &self.required_capabilities
    }
}
