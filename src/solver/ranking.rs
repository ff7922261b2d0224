//! Candidate ranking for open seats.
//!
//! Composes [`CandidateRule`]s into a [`RankingEngine`] that orders the
//! employees offered a seat. Ranking only decides the order in which
//! candidates are tried; feasibility is the evaluator's job.
//!
//! # Score Convention
//! **Lower score = preferred.** A rule returns smaller values for
//! employees that should be tried first.
//!
//! # Example
//! ```
//! use u_roster::solver::{RankingEngine, rules};
//!
//! let engine = RankingEngine::new()
//!     .with_rule(rules::FewestShifts)
//!     .with_rule(rules::LongestRest);
//! assert_eq!(engine.rule_names(), vec!["fewest_shifts", "longest_rest"]);
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::models::{Employee, TimeWindow};

/// Score returned by a candidate rule. Lower = preferred.
pub type RankScore = f64;

/// A rule that scores how strongly a candidate should be preferred.
pub trait CandidateRule: Send + Sync + Debug {
    /// Rule name (e.g., "fewest_shifts").
    fn name(&self) -> &'static str;

    /// Scores a candidate for the seat described by `context`.
    fn evaluate(&self, employee: &Employee, context: &RankingContext) -> RankScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

/// Running workload state consulted by candidate rules.
///
/// The solver records every committed assignment here, so rules see the
/// schedule as it stands before the current seat.
#[derive(Debug, Clone)]
pub struct RankingContext {
    /// Start of the seat being filled.
    pub at: NaiveDateTime,
    /// Shifts committed so far per employee.
    pub shift_counts: HashMap<String, usize>,
    /// Windows worked so far per employee.
    pub worked: HashMap<String, Vec<TimeWindow>>,
}

impl RankingContext {
    /// Creates an empty context positioned at `at`.
    pub fn at_time(at: NaiveDateTime) -> Self {
        Self {
            at,
            shift_counts: HashMap::new(),
            worked: HashMap::new(),
        }
    }

    /// Moves the context to a new seat start.
    pub fn set_time(&mut self, at: NaiveDateTime) {
        self.at = at;
    }

    /// Records a committed shift.
    pub fn record(&mut self, employee_id: &str, window: TimeWindow) {
        *self.shift_counts.entry(employee_id.to_string()).or_insert(0) += 1;
        self.worked
            .entry(employee_id.to_string())
            .or_default()
            .push(window);
    }

    /// Shifts committed so far.
    pub fn shift_count(&self, employee_id: &str) -> usize {
        self.shift_counts.get(employee_id).copied().unwrap_or(0)
    }

    /// Time between the end of the employee's latest shift ending at or
    /// before `at` and `at`. `None` if no such shift exists.
    pub fn rest_before(&self, employee_id: &str) -> Option<Duration> {
        self.worked
            .get(employee_id)?
            .iter()
            .filter(|w| w.end <= self.at)
            .map(|w| self.at - w.end)
            .min()
    }
}

/// How multiple rules are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RankingMode {
    /// Apply rules in sequence; use next rule only on ties.
    #[default]
    Sequential,
    /// Compute weighted sum of all rule scores.
    Weighted,
}

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreaker {
    /// Keep input order.
    #[default]
    InputOrder,
    /// Deterministic by employee id (lexicographic).
    ById,
}

#[derive(Clone)]
struct WeightedRule {
    rule: Arc<dyn CandidateRule>,
    weight: f64,
}

/// A composable engine that orders candidates for a seat.
#[derive(Clone)]
pub struct RankingEngine {
    rules: Vec<WeightedRule>,
    mode: RankingMode,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl RankingEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            mode: RankingMode::Sequential,
            tie_breaker: TieBreaker::InputOrder,
            epsilon: 1e-9,
        }
    }

    /// Fewest shifts, then longest rest, then employee id.
    pub fn fairness() -> Self {
        Self::new()
            .with_rule(rules::FewestShifts)
            .with_rule(rules::LongestRest)
            .with_final_tie_breaker(TieBreaker::ById)
    }

    /// Adds a rule (weight 1.0).
    pub fn with_rule<R: CandidateRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 1.0,
        });
        self
    }

    /// Adds a weighted rule.
    pub fn with_weighted_rule<R: CandidateRule + 'static>(mut self, rule: R, weight: f64) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Sets the evaluation mode.
    pub fn with_mode(mut self, mode: RankingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Names of the configured rules.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.rule.name()).collect()
    }

    /// Orders candidates, most preferred first.
    pub fn rank<'a>(&self, candidates: &[&'a Employee], context: &RankingContext) -> Vec<&'a Employee> {
        let mut indices: Vec<usize> = (0..candidates.len()).collect();

        match self.mode {
            RankingMode::Sequential => {
                let scores: Vec<Vec<RankScore>> = candidates
                    .iter()
                    .map(|e| self.rules.iter().map(|wr| wr.rule.evaluate(e, context)).collect())
                    .collect();
                indices.sort_by(|&a, &b| {
                    self.compare_sequential(&scores[a], &scores[b])
                        .then_with(|| self.break_tie(candidates[a], candidates[b]))
                });
            }
            RankingMode::Weighted => {
                let scores: Vec<RankScore> = candidates
                    .iter()
                    .map(|e| self.weighted_score(e, context))
                    .collect();
                indices.sort_by(|&a, &b| {
                    scores[a]
                        .partial_cmp(&scores[b])
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| self.break_tie(candidates[a], candidates[b]))
                });
            }
        }

        indices.into_iter().map(|i| candidates[i]).collect()
    }

    fn compare_sequential(&self, a: &[RankScore], b: &[RankScore]) -> std::cmp::Ordering {
        for (score_a, score_b) in a.iter().zip(b) {
            if (score_a - score_b).abs() > self.epsilon {
                return score_a
                    .partial_cmp(score_b)
                    .unwrap_or(std::cmp::Ordering::Equal);
            }
        }
        std::cmp::Ordering::Equal
    }

    fn break_tie(&self, a: &Employee, b: &Employee) -> std::cmp::Ordering {
        match self.tie_breaker {
            TieBreaker::InputOrder => std::cmp::Ordering::Equal,
            TieBreaker::ById => a.id.cmp(&b.id),
        }
    }

    fn weighted_score(&self, employee: &Employee, context: &RankingContext) -> RankScore {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(employee, context) * wr.weight)
            .sum()
    }
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::fairness()
    }
}

impl Debug for RankingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .field("tie_breaker", &self.tie_breaker)
            .finish()
    }
}

/// Built-in candidate rules.
pub mod rules {
    use super::{CandidateRule, RankScore, RankingContext};
    use crate::models::Employee;

    /// Fewest shifts so far first.
    #[derive(Debug, Clone, Copy)]
    pub struct FewestShifts;

    impl CandidateRule for FewestShifts {
        fn name(&self) -> &'static str {
            "fewest_shifts"
        }

        fn evaluate(&self, employee: &Employee, context: &RankingContext) -> RankScore {
            context.shift_count(&employee.id) as f64
        }

        fn description(&self) -> &'static str {
            "Fewest shifts assigned so far"
        }
    }

    /// Longest rest since the last shift first. Never worked ranks first.
    #[derive(Debug, Clone, Copy)]
    pub struct LongestRest;

    impl CandidateRule for LongestRest {
        fn name(&self) -> &'static str {
            "longest_rest"
        }

        fn evaluate(&self, employee: &Employee, context: &RankingContext) -> RankScore {
            match context.rest_before(&employee.id) {
                Some(rest) => -(rest.num_minutes() as f64),
                None => f64::MIN,
            }
        }

        fn description(&self) -> &'static str {
            "Longest time since the previous shift ended"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn window(day: u32, from: u32, to: u32) -> TimeWindow {
        TimeWindow::new(at(day, from), at(day, to))
    }

    fn ids(ranked: &[&Employee]) -> Vec<String> {
        ranked.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_fewest_shifts_first() {
        let (a, b, c) = (Employee::nurse("A"), Employee::nurse("B"), Employee::nurse("C"));
        let mut ctx = RankingContext::at_time(at(5, 7));
        ctx.record("A", window(1, 7, 15));
        ctx.record("A", window(2, 7, 15));
        ctx.record("C", window(3, 7, 15));

        let engine = RankingEngine::fairness();
        let ranked = engine.rank(&[&a, &b, &c], &ctx);
        assert_eq!(ids(&ranked), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_longest_rest_breaks_count_ties() {
        let (a, b) = (Employee::nurse("A"), Employee::nurse("B"));
        let mut ctx = RankingContext::at_time(at(5, 7));
        ctx.record("A", window(4, 7, 15));
        ctx.record("B", window(2, 7, 15));

        let ranked = RankingEngine::fairness().rank(&[&a, &b], &ctx);
        assert_eq!(ids(&ranked), vec!["B", "A"]);
    }

    #[test]
    fn test_id_breaks_remaining_ties() {
        let (a, b) = (Employee::nurse("A"), Employee::nurse("B"));
        let ctx = RankingContext::at_time(at(1, 7));
        let ranked = RankingEngine::fairness().rank(&[&b, &a], &ctx);
        assert_eq!(ids(&ranked), vec!["A", "B"]);
    }

    #[test]
    fn test_input_order_tie_breaker() {
        let (a, b) = (Employee::nurse("A"), Employee::nurse("B"));
        let ctx = RankingContext::at_time(at(1, 7));
        let engine = RankingEngine::new().with_rule(rules::FewestShifts);
        assert_eq!(ids(&engine.rank(&[&b, &a], &ctx)), vec!["B", "A"]);
    }

    #[test]
    fn test_rest_before_ignores_later_shifts() {
        let mut ctx = RankingContext::at_time(at(3, 7));
        ctx.record("A", window(1, 7, 15));
        ctx.record("A", window(4, 7, 15));
        assert_eq!(ctx.rest_before("A"), Some(Duration::hours(40)));
        assert_eq!(ctx.rest_before("B"), None);
    }

    #[test]
    fn test_weighted_mode() {
        let (a, b) = (Employee::nurse("A"), Employee::nurse("B"));
        let mut ctx = RankingContext::at_time(at(5, 7));
        ctx.record("A", window(1, 7, 15));

        let engine = RankingEngine::new()
            .with_weighted_rule(rules::FewestShifts, 1.0)
            .with_mode(RankingMode::Weighted)
            .with_final_tie_breaker(TieBreaker::ById);
        assert_eq!(ids(&engine.rank(&[&a, &b], &ctx)), vec!["B", "A"]);
    }

    #[test]
    fn test_empty_candidates() {
        let ctx = RankingContext::at_time(at(1, 7));
        assert!(RankingEngine::fairness().rank(&[], &ctx).is_empty());
    }
}
