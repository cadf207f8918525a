//! 编排过程事件：替代全局控制台输出，由注入的 Reporter 消费（日志、前端展示、测试断言）

use serde::Serialize;
use tokio::sync::mpsc;

/// Hub 排名表中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankRow {
    pub hub_id: String,
    pub name: String,
    pub score: f64,
    /// 与任务所需能力的交集
    pub matched: Vec<String>,
}

/// 单步编排事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeEvent {
    /// 任务解析完成
    TaskParsed {
        task_id: String,
        capabilities: Vec<String>,
        method: String,
    },
    /// 发现的 Hub 实现
    ImplementationsDiscovered { names: Vec<String> },
    /// 加载的 Hub 描述数量
    DescriptorsLoaded { count: usize },
    /// 按分数排序后的全部 Hub
    HubsRanked { rows: Vec<RankRow> },
    /// 选中的 Hub
    HubSelected {
        hub_id: String,
        name: String,
        score: f64,
    },
    /// 没有任何 Hub 得分大于 0，使用默认 Hub
    NoMatchingHub { default_hub_id: String },
    ExecutionStarted { hub_id: String },
    ExecutionFinished { hub_id: String, has_result: bool },
    ExecutionFailed { hub_id: String, reason: String },
}

/// 事件接收方
pub trait Reporter: Send + Sync {
    fn report(&self, event: &ExchangeEvent);
}

/// 默认 Reporter：写入 tracing 日志
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &ExchangeEvent) {
        match event {
            ExchangeEvent::NoMatchingHub { default_hub_id } => {
                tracing::warn!(hub = %default_hub_id, "no hub matched the task, using default hub");
            }
            ExchangeEvent::ExecutionFailed { hub_id, reason } => {
                tracing::error!(hub = %hub_id, reason = %reason, "hub execution failed");
            }
            ExchangeEvent::HubsRanked { rows } => {
                for (i, row) in rows.iter().enumerate() {
                    tracing::info!(
                        rank = i + 1,
                        hub = %row.hub_id,
                        name = %row.name,
                        score = format!("{:.2}", row.score),
                        matched = ?row.matched,
                        "hub ranking"
                    );
                }
            }
            other => {
                let json = serde_json::to_string(other).unwrap_or_default();
                tracing::info!(event = %json, "exchange");
            }
        }
    }
}

/// 通过 mpsc 通道转发事件（供前端或测试订阅）
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ExchangeEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExchangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, event: &ExchangeEvent) {
        // 接收端已关闭时丢弃
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ExchangeEvent::HubSelected {
            hub_id: "code".into(),
            name: "代码工匠团队".into(),
            score: 1.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "hub_selected");
        assert_eq!(json["hub_id"], "code");
    }

    #[test]
    fn test_channel_reporter_forwards_events() {
        let (reporter, mut rx) = ChannelReporter::new();
        reporter.report(&ExchangeEvent::DescriptorsLoaded { count: 3 });
        assert_eq!(
            rx.try_recv().unwrap(),
            ExchangeEvent::DescriptorsLoaded { count: 3 }
        );
    }

    #[test]
    fn test_channel_reporter_ignores_closed_receiver() {
        let (reporter, rx) = ChannelReporter::new();
        drop(rx);
        reporter.report(&ExchangeEvent::DescriptorsLoaded { count: 0 });
    }
}
