//! AEX - 智能体交换平台
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、编排事件、任务请求、交换编排器
//! - **llm**: 对话客户端与远程嵌入后端（OpenAI 兼容 / Jina / Mock）
//! - **embedding**: 向量缓存与嵌入服务
//! - **capability**: 能力目录与能力提取
//! - **hubs**: Hub / Team 抽象、内置团队、命令插件、注册表
//! - **matching**: 匹配打分与 Hub 选择
//! - **observability**: 日志初始化

pub mod capability;
pub mod config;
pub mod core;
pub mod embedding;
pub mod hubs;
pub mod llm;
pub mod matching;
pub mod observability;

pub use crate::core::{ExchangeError, ExchangeOrchestrator};
