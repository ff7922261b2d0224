//! Assignment solvers.
//!
//! A [`Solver`] turns a [`Problem`] into a [`Solution`]: the best schedule
//! it could build plus every seat it could not fill. Unfilled seats are
//! [`UnmetDemand`], which is a reported outcome rather than an error.
//!
//! # Strategies
//!
//! - [`GreedySolver`]: single forward pass, fairness-ranked candidates,
//!   no backtracking. Deterministic.
//!
//! # Usage
//!
//! ```
//! use u_roster::solver::{GreedySolver, RankingEngine, Solver};
//!
//! let solver = GreedySolver::new().with_ranking(RankingEngine::fairness());
//! assert_eq!(solver.name(), "greedy");
//! // let solution = solver.solve(&problem);
//! ```

mod greedy;
mod ranking;

pub use greedy::GreedySolver;
pub use ranking::{
    rules, CandidateRule, RankScore, RankingContext, RankingEngine, RankingMode, TieBreaker,
};

use std::fmt::{self, Debug};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Assignment, ConstraintViolation, Role, Schedule};
use crate::problem::Problem;

/// An assignment strategy.
pub trait Solver: Send + Sync + Debug {
    /// Strategy name (e.g., "greedy").
    fn name(&self) -> &'static str;

    /// Builds a schedule for the problem.
    fn solve(&self, problem: &Problem) -> Solution;
}

/// Output of a solver run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Committed assignments.
    pub schedule: Schedule,
    /// Seats left unfilled, in solve order.
    pub unmet_demand: Vec<UnmetDemand>,
    /// Pinned assignments that were not committed.
    pub rejected_pins: Vec<RejectedPin>,
    /// Whether the time limit cut the run short.
    pub terminated_early: bool,
}

impl Solution {
    /// Whether every seat was filled.
    pub fn is_complete(&self) -> bool {
        self.unmet_demand.is_empty()
    }

    /// Total unfilled seats.
    pub fn unmet_seats(&self) -> usize {
        self.unmet_demand.len()
    }
}

/// One seat that could not be filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmetDemand {
    /// Slot with the open seat.
    pub slot_id: String,
    /// Seat number within the slot (1-based).
    pub seat: u32,
    /// Slot date.
    pub date: NaiveDate,
    /// Role the seat requires.
    pub role: Role,
    /// Why the seat stayed open.
    pub reason: UnmetReason,
    /// Why each candidate was turned down.
    pub rejections: Vec<CandidateRejection>,
}

/// Why a seat stayed open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmetReason {
    /// Every candidate violated at least one rule.
    NoFeasibleCandidate,
    /// The solver stopped before reaching the slot.
    TimeLimit,
    /// The seat is empty in an externally supplied schedule.
    Unassigned,
}

impl fmt::Display for UnmetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnmetReason::NoFeasibleCandidate => "no feasible candidate",
            UnmetReason::TimeLimit => "time limit reached",
            UnmetReason::Unassigned => "unassigned",
        })
    }
}

/// Violations that disqualified one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRejection {
    pub employee_id: String,
    pub violations: Vec<ConstraintViolation>,
}

/// A pinned assignment that failed the rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedPin {
    pub assignment: Assignment,
    pub violations: Vec<ConstraintViolation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_completeness() {
        let mut solution = Solution::default();
        assert!(solution.is_complete());

        solution.unmet_demand.push(UnmetDemand {
            slot_id: "S1".into(),
            seat: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            role: Role::Nurse,
            reason: UnmetReason::NoFeasibleCandidate,
            rejections: Vec::new(),
        });
        assert!(!solution.is_complete());
        assert_eq!(solution.unmet_seats(), 1);
    }

    #[test]
    fn test_unmet_reason_display() {
        assert_eq!(UnmetReason::TimeLimit.to_string(), "time limit reached");
        assert_eq!(
            UnmetReason::NoFeasibleCandidate.to_string(),
            "no feasible candidate"
        );
    }
}
