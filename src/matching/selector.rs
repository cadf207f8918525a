//! Hub 选择器：对全部 Hub 打分、降序排序（稳定排序，同分时保持注册顺序），取第一名
//!
//! 即使最高分为 0 也返回第一名（默认 Hub），由调用方决定是否提示用户。

use crate::core::TaskRequest;
use crate::hubs::HubDescriptor;
use crate::matching::{MatchScorer, ScoreBreakdown};

/// 打过分的 Hub
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHub {
    pub hub: HubDescriptor,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl ScoredHub {
    /// 分数为 0：没有任何能力匹配，只是默认选择
    pub fn is_default_choice(&self) -> bool {
        self.score <= 0.0
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HubSelector;

impl HubSelector {
    pub fn new() -> Self {
        Self
    }

    /// 所有 Hub 按分数降序排列；同分保持原顺序
    pub fn rank(&self, task: &TaskRequest, hubs: &[HubDescriptor]) -> Vec<ScoredHub> {
        let mut scored: Vec<ScoredHub> = hubs
            .iter()
            .map(|hub| {
                let breakdown =
                    MatchScorer::breakdown(&hub.capabilities, task.required_capabilities());
                ScoredHub {
                    hub: hub.clone(),
                    score: breakdown.score,
                    breakdown,
                }
            })
            .collect();
        // sort_by 是稳定排序
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored
    }

    /// 最佳 Hub；Hub 列表为空时为 None
    pub fn select(&self, task: &TaskRequest, hubs: &[HubDescriptor]) -> Option<ScoredHub> {
        let best = self.rank(task, hubs).into_iter().next();
        if best.is_none() {
            tracing::warn!("no hubs available for selection");
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub(id: &str, caps: &[&str]) -> HubDescriptor {
        HubDescriptor {
            hub_id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            capabilities: caps.iter().map(|s| s.to_string()).collect(),
            hub_class: "TestHub".to_string(),
        }
    }

    fn task(caps: &[&str]) -> TaskRequest {
        TaskRequest::new("task", caps.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_selects_highest_score() {
        let hubs = vec![
            hub("content", &["research", "writing", "summary", "analysis", "report"]),
            hub("code", &["coding", "debugging", "testing"]),
        ];
        let best = HubSelector::new()
            .select(&task(&["coding", "debugging"]), &hubs)
            .unwrap();
        assert_eq!(best.hub.hub_id, "code");
        assert_eq!(best.score, 1.0);
        assert!(!best.is_default_choice());
    }

    #[test]
    fn test_tie_goes_to_first_registered() {
        let hubs = vec![
            hub("first", &["coding", "docs"]),
            hub("second", &["coding", "review"]),
        ];
        let selector = HubSelector::new();
        let best = selector.select(&task(&["coding", "research"]), &hubs).unwrap();
        assert_eq!(best.hub.hub_id, "first");

        let ranked = selector.rank(&task(&["coding", "research"]), &hubs);
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[1].hub.hub_id, "second");
    }

    #[test]
    fn test_zero_score_returns_first_hub_as_default() {
        let hubs = vec![hub("a", &["marketing"]), hub("b", &["finance"])];
        let best = HubSelector::new().select(&task(&["coding"]), &hubs).unwrap();
        assert_eq!(best.hub.hub_id, "a");
        assert_eq!(best.score, 0.0);
        assert!(best.is_default_choice());
    }

    #[test]
    fn test_empty_hub_list() {
        assert!(HubSelector::new().select(&task(&["coding"]), &[]).is_none());
    }

    #[test]
    fn test_selection_is_deterministic() {
        let hubs = vec![
            hub("a", &["research", "writing"]),
            hub("b", &["research", "report"]),
            hub("c", &["writing", "summary", "report"]),
        ];
        let t = task(&["research", "report"]);
        let selector = HubSelector::new();
        let first = selector.select(&t, &hubs).unwrap();
        for _ in 0..10 {
            let again = selector.select(&t, &hubs).unwrap();
            assert_eq!(again.hub.hub_id, first.hub.hub_id);
            assert_eq!(again.score, first.score);
        }
        assert_eq!(first.hub.hub_id, "b");
    }
}
