//! Hub 匹配打分
//!
//! score = min(base + 0.3 * coverage + perfect_bonus, 1.0)，其中
//! base = |交集| / |所需能力|，coverage = |交集| / |Hub 能力|（Hub 无能力时为 0），
//! perfect_bonus = 0.2（Hub 覆盖全部所需能力时）。所需能力为空时得分为 0。

use std::collections::BTreeSet;

use serde::Serialize;

/// 覆盖率权重
pub const COVERAGE_WEIGHT: f64 = 0.3;
/// 完全覆盖奖励
pub const PERFECT_MATCH_BONUS: f64 = 0.2;

/// 打分明细
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub matched: Vec<String>,
    pub base: f64,
    pub coverage: f64,
    pub perfect_bonus: f64,
    /// 截断前的原始分
    pub raw: f64,
    pub score: f64,
}

/// 能力集合匹配打分器
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchScorer;

impl MatchScorer {
    /// [0, 1] 区间的匹配分数
    pub fn score(hub_capabilities: &BTreeSet<String>, required: &BTreeSet<String>) -> f64 {
        Self::breakdown(hub_capabilities, required).score
    }

    pub fn breakdown(hub_capabilities: &BTreeSet<String>, required: &BTreeSet<String>) -> ScoreBreakdown {
        if required.is_empty() {
            return ScoreBreakdown {
                matched: Vec::new(),
                base: 0.0,
                coverage: 0.0,
                perfect_bonus: 0.0,
                raw: 0.0,
                score: 0.0,
            };
        }

        let matched: Vec<String> = hub_capabilities.intersection(required).cloned().collect();
        let i = matched.len() as f64;
        let base = i / required.len() as f64;
        let coverage = if hub_capabilities.is_empty() {
            0.0
        } else {
            i / hub_capabilities.len() as f64
        };
        let perfect_bonus = if matched.len() == required.len() {
            PERFECT_MATCH_BONUS
        } else {
            0.0
        };
        let raw = base + COVERAGE_WEIGHT * coverage + perfect_bonus;

        ScoreBreakdown {
            matched,
            base,
            coverage,
            perfect_bonus,
            raw,
            score: raw.min(1.0),
        }
    }
}
