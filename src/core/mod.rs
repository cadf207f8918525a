//! 核心编排层：错误分类、编排事件、任务请求、构建器与交换编排器

pub mod builder;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod task;

pub use builder::{create_exchange_builder, ExchangeBuilder};
pub use error::ExchangeError;
pub use events::{ChannelReporter, ExchangeEvent, RankRow, Reporter, TracingReporter};
pub use orchestrator::{ExchangeOrchestrator, ExchangeOutcome};
pub use task::TaskRequest;
