//! Constraint evaluation for candidate assignments.
//!
//! Each scheduling rule is an independent [`ConstraintRule`]. The
//! [`ConstraintEvaluator`] runs a list of rules against one candidate
//! assignment and the schedule it would join, returning the violations it
//! would cause. Evaluation is pure: neither the schedule nor the problem is
//! modified, so the solver can call it speculatively.
//!
//! # Usage
//!
//! ```
//! use u_roster::constraints::{ConstraintEvaluator, EvaluationMode};
//! use u_roster::constraints::rules;
//!
//! let evaluator = ConstraintEvaluator::new()
//!     .with_rule(rules::RoleEligibility)
//!     .with_rule(rules::Overlap);
//! assert_eq!(evaluator.rule_names(), vec!["role_eligibility", "overlap"]);
//!
//! // let violations = evaluator.evaluate(&candidate, &schedule, &problem, EvaluationMode::Accumulate);
//! ```

pub mod rules;

use std::fmt::Debug;
use std::sync::Arc;

use crate::models::{Assignment, ConstraintViolation, Employee, Schedule, ShiftSlot, ViolationKind};
use crate::problem::{EmployeePolicy, Problem};

/// Whether evaluation stops at the first violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Return as soon as one violation is found (speculative checks).
    #[default]
    ShortCircuit,
    /// Run every rule and collect every violation (validation, diagnostics).
    Accumulate,
}

/// Everything a rule needs to judge one candidate.
#[derive(Debug, Clone)]
pub struct CandidateContext<'a> {
    /// The assignment under test.
    pub assignment: &'a Assignment,
    /// Candidate employee.
    pub employee: &'a Employee,
    /// Resolved workload limits of the employee.
    pub policy: &'a EmployeePolicy,
    /// Target slot.
    pub slot: &'a ShiftSlot,
    /// Slots the employee already holds in the schedule, ordered by start.
    pub existing: Vec<&'a ShiftSlot>,
    /// Seats of the target slot already filled in the schedule.
    pub slot_fill: usize,
    /// Known employees already seated in the target slot.
    pub seated: Vec<&'a Employee>,
    /// The run's inputs.
    pub problem: &'a Problem,
}

impl<'a> CandidateContext<'a> {
    /// Builds the context, or `None` if the employee or slot is unknown.
    pub fn build(
        assignment: &'a Assignment,
        schedule: &'a Schedule,
        problem: &'a Problem,
    ) -> Option<Self> {
        let employee = problem.employee(&assignment.employee_id)?;
        let policy = problem.policy(&assignment.employee_id)?;
        let slot = problem.slot(&assignment.slot_id)?;

        let mut existing: Vec<&ShiftSlot> = schedule
            .assignments_for_employee(&assignment.employee_id)
            .filter_map(|a| problem.slot(&a.slot_id))
            .collect();
        existing.sort_by(|a, b| a.start().cmp(&b.start()).then_with(|| a.id.cmp(&b.id)));

        let seated = schedule
            .assignments_for_slot(&assignment.slot_id)
            .filter_map(|a| problem.employee(&a.employee_id))
            .collect();

        Some(Self {
            assignment,
            employee,
            policy,
            slot,
            existing,
            slot_fill: schedule.filled_count(&assignment.slot_id),
            seated,
            problem,
        })
    }

    /// Starts a violation for the candidate.
    pub fn violation(&self, kind: ViolationKind, message: impl Into<String>) -> ConstraintViolation {
        ConstraintViolation::new(kind, self.assignment, message)
    }
}

/// A scheduling rule that judges one candidate assignment.
///
/// Rules report violations; they never mutate state. An empty result means
/// the candidate satisfies the rule.
pub trait ConstraintRule: Send + Sync + Debug {
    /// Rule name (e.g., "overlap").
    fn name(&self) -> &'static str;

    /// Kind of violation this rule produces.
    fn kind(&self) -> ViolationKind;

    /// Checks the candidate.
    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation>;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

/// Runs a list of rules against candidate assignments.
#[derive(Clone, Default)]
pub struct ConstraintEvaluator {
    rules: Vec<Arc<dyn ConstraintRule>>,
}

impl ConstraintEvaluator {
    /// Creates an evaluator with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Creates an evaluator with every built-in rule, cheapest first.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(rules::RoleEligibility)
            .with_rule(rules::LeaveConflict)
            .with_rule(rules::Availability)
            .with_rule(rules::Staffing)
            .with_rule(rules::SkillMix)
            .with_rule(rules::PeriodCap)
            .with_rule(rules::WeeklyCap)
            .with_rule(rules::DailyLimit)
            .with_rule(rules::WorkDays)
            .with_rule(rules::Overlap)
            .with_rule(rules::RestPeriod)
    }

    /// Appends a rule.
    pub fn with_rule<R: ConstraintRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Evaluates `candidate` as if it were added to `schedule`.
    ///
    /// References to unknown employees or slots yield a single
    /// [`ViolationKind::UnknownReference`] violation.
    pub fn evaluate(
        &self,
        candidate: &Assignment,
        schedule: &Schedule,
        problem: &Problem,
        mode: EvaluationMode,
    ) -> Vec<ConstraintViolation> {
        let ctx = match CandidateContext::build(candidate, schedule, problem) {
            Some(ctx) => ctx,
            None => return vec![unknown_reference(candidate, problem)],
        };

        let mut violations = Vec::new();
        for rule in &self.rules {
            let found = rule.check(&ctx);
            if found.is_empty() {
                continue;
            }
            if mode == EvaluationMode::ShortCircuit {
                violations.extend(found.into_iter().take(1));
                return violations;
            }
            violations.extend(found);
        }
        violations
    }

    /// Whether the candidate passes every rule.
    pub fn is_feasible(&self, candidate: &Assignment, schedule: &Schedule, problem: &Problem) -> bool {
        self.evaluate(candidate, schedule, problem, EvaluationMode::ShortCircuit)
            .is_empty()
    }
}

impl Debug for ConstraintEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintEvaluator")
            .field("rules", &self.rule_names())
            .finish()
    }
}

fn unknown_reference(candidate: &Assignment, problem: &Problem) -> ConstraintViolation {
    let message = match (
        problem.employee(&candidate.employee_id).is_some(),
        problem.slot(&candidate.slot_id).is_some(),
    ) {
        (false, false) => format!(
            "unknown employee '{}' and slot '{}'",
            candidate.employee_id, candidate.slot_id
        ),
        (false, true) => format!("unknown employee '{}'", candidate.employee_id),
        _ => format!("unknown slot '{}'", candidate.slot_id),
    };
    ConstraintViolation::new(ViolationKind::UnknownReference, candidate, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyDefaults;
    use crate::models::{Employee, LeaveRecord, PlanningPeriod, Role, Settings, ShiftTemplate};
    use chrono::{NaiveDate, NaiveTime};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn problem() -> Problem {
        let settings = Settings::new(PlanningPeriod::try_new(d(1), d(2)).unwrap())
            .with_template(ShiftTemplate::new("early", time(7), time(15), Role::Nurse))
            .with_template(ShiftTemplate::new("mid", time(11), time(19), Role::Nurse));
        let roster = vec![Employee::nurse("A"), Employee::doctor("D")];
        let leave = vec![LeaveRecord::day("D", d(1))];
        Problem::new(&settings, &roster, &leave, &PolicyDefaults::default()).unwrap()
    }

    #[test]
    fn test_feasible_candidate() {
        let p = problem();
        let evaluator = ConstraintEvaluator::standard();
        let candidate = Assignment::new("A", "2024-03-01/early");
        assert!(evaluator.is_feasible(&candidate, &Schedule::new(), &p));
    }

    #[test]
    fn test_short_circuit_returns_first_violation() {
        let p = problem();
        let evaluator = ConstraintEvaluator::standard();
        // D is a doctor on leave: role and leave both fail.
        let candidate = Assignment::new("D", "2024-03-01/early");

        let first = evaluator.evaluate(&candidate, &Schedule::new(), &p, EvaluationMode::ShortCircuit);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, ViolationKind::RoleIneligible);

        let all = evaluator.evaluate(&candidate, &Schedule::new(), &p, EvaluationMode::Accumulate);
        let kinds: Vec<_> = all.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ViolationKind::RoleIneligible, ViolationKind::LeaveConflict]);
    }

    #[test]
    fn test_evaluation_is_pure() {
        let p = problem();
        let evaluator = ConstraintEvaluator::standard();
        let mut schedule = Schedule::new();
        schedule.add_assignment(Assignment::new("A", "2024-03-01/early"));
        let before = schedule.clone();

        let candidate = Assignment::new("A", "2024-03-01/mid");
        let v = evaluator.evaluate(&candidate, &schedule, &p, EvaluationMode::Accumulate);
        assert_eq!(v[0].kind, ViolationKind::Overlap);
        assert_eq!(schedule, before);
    }

    #[test]
    fn test_unknown_references() {
        let p = problem();
        let evaluator = ConstraintEvaluator::standard();

        let v = evaluator.evaluate(
            &Assignment::new("Z", "2024-03-01/early"),
            &Schedule::new(),
            &p,
            EvaluationMode::Accumulate,
        );
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::UnknownReference);
        assert!(v[0].message.contains("employee 'Z'"));

        let v = evaluator.evaluate(
            &Assignment::new("A", "nowhere"),
            &Schedule::new(),
            &p,
            EvaluationMode::ShortCircuit,
        );
        assert!(v[0].message.contains("slot 'nowhere'"));
    }

    #[test]
    fn test_empty_evaluator_accepts_everything() {
        let p = problem();
        let evaluator = ConstraintEvaluator::new();
        let candidate = Assignment::new("D", "2024-03-01/early");
        assert!(evaluator.is_feasible(&candidate, &Schedule::new(), &p));
    }

    #[test]
    fn test_standard_rule_order() {
        assert_eq!(
            ConstraintEvaluator::standard().rule_names(),
            vec![
                "role_eligibility",
                "leave_conflict",
                "availability",
                "staffing",
                "skill_mix",
                "period_cap",
                "weekly_cap",
                "daily_limit",
                "work_days",
                "overlap",
                "rest_period",
            ]
        );
    }
}
