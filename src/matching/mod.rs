//! 匹配层：能力集合打分与 Hub 选择

mod scorer;
mod selector;

pub use scorer::{MatchScorer, ScoreBreakdown, COVERAGE_WEIGHT, PERFECT_MATCH_BONUS};
pub use selector::{HubSelector, ScoredHub};
