//! Fairness-ranked greedy solver.
//!
//! # Algorithm
//!
//! 1. Commit pinned assignments that pass every rule.
//! 2. Order slots by date, then slack (feasible-looking employees minus
//!    headcount, tightest first), then start time, then id.
//! 3. For each open seat, rank the employees not already in the slot and
//!    commit the first that passes the evaluator.
//! 4. A seat nobody can take becomes [`UnmetDemand`] with every
//!    candidate's violations. Committed assignments are never revisited.
//!
//! # Complexity
//! O(s * e * r) where s=seats, e=employees, r=rules.

use std::time::{Duration, Instant};

use chrono::NaiveTime;
use tracing::{debug, info, trace, warn};

use super::{
    CandidateRejection, RankingContext, RankingEngine, RejectedPin, Solution, Solver, UnmetDemand,
    UnmetReason,
};
use crate::constraints::{ConstraintEvaluator, EvaluationMode};
use crate::models::{Assignment, Employee, Schedule, ShiftSlot};
use crate::problem::Problem;

/// Single forward-pass greedy solver.
///
/// # Example
///
/// ```
/// use u_roster::config::PolicyDefaults;
/// use u_roster::models::{Employee, PlanningPeriod, Role, Settings, ShiftTemplate};
/// use u_roster::problem::Problem;
/// use u_roster::solver::{GreedySolver, Solver};
/// use chrono::{NaiveDate, NaiveTime};
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let settings = Settings::new(PlanningPeriod::try_new(day, day).unwrap())
///     .with_template(ShiftTemplate::new(
///         "early",
///         NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
///         NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
///         Role::Nurse,
///     ));
/// let roster = vec![Employee::nurse("A"), Employee::nurse("B")];
/// let problem = Problem::new(&settings, &roster, &[], &PolicyDefaults::default()).unwrap();
///
/// let solution = GreedySolver::new().solve(&problem);
/// assert_eq!(solution.schedule.assignment_count(), 1);
/// assert!(solution.is_complete());
/// ```
#[derive(Debug, Clone)]
pub struct GreedySolver {
    evaluator: ConstraintEvaluator,
    ranking: RankingEngine,
    time_limit: Option<Duration>,
}

impl GreedySolver {
    /// Creates a solver with the standard rules and fairness ranking.
    pub fn new() -> Self {
        Self {
            evaluator: ConstraintEvaluator::standard(),
            ranking: RankingEngine::fairness(),
            time_limit: None,
        }
    }

    /// Replaces the constraint evaluator.
    pub fn with_evaluator(mut self, evaluator: ConstraintEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Replaces the candidate ranking.
    pub fn with_ranking(mut self, ranking: RankingEngine) -> Self {
        self.ranking = ranking;
        self
    }

    /// Sets a wall-clock budget, checked between slots.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Order in which slots are filled.
    pub fn slot_order<'a>(&self, problem: &'a Problem) -> Vec<&'a ShiftSlot> {
        let mut keyed: Vec<(i64, &ShiftSlot)> = problem
            .slots()
            .iter()
            .map(|slot| (slack(problem, slot), slot))
            .collect();
        keyed.sort_by(|(slack_a, a), (slack_b, b)| {
            a.date
                .cmp(&b.date)
                .then_with(|| slack_a.cmp(slack_b))
                .then_with(|| a.start().cmp(&b.start()))
                .then_with(|| a.id.cmp(&b.id))
        });
        keyed.into_iter().map(|(_, slot)| slot).collect()
    }

    fn commit_pins(
        &self,
        problem: &Problem,
        schedule: &mut Schedule,
        context: &mut RankingContext,
    ) -> Vec<RejectedPin> {
        let mut rejected = Vec::new();
        for pin in problem.pinned() {
            let violations =
                self.evaluator
                    .evaluate(pin, schedule, problem, EvaluationMode::Accumulate);
            if violations.is_empty() {
                if let Some(slot) = problem.slot(&pin.slot_id) {
                    context.record(&pin.employee_id, slot.window);
                }
                schedule.add_assignment(pin.clone());
                continue;
            }
            warn!(
                event = "pin_rejected",
                employee = %pin.employee_id,
                slot = %pin.slot_id,
                violations = violations.len(),
            );
            rejected.push(RejectedPin {
                assignment: pin.clone(),
                violations,
            });
        }
        rejected
    }

    fn pick<'a>(
        &self,
        slot: &ShiftSlot,
        ranked: &[&'a Employee],
        schedule: &Schedule,
        problem: &Problem,
    ) -> Option<&'a Employee> {
        ranked.iter().copied().find(|employee| {
            let candidate = Assignment::new(&employee.id, &slot.id);
            let violations =
                self.evaluator
                    .evaluate(&candidate, schedule, problem, EvaluationMode::ShortCircuit);
            match violations.first() {
                Some(v) => {
                    trace!(
                        event = "candidate_rejected",
                        employee = %employee.id,
                        slot = %slot.id,
                        kind = %v.kind,
                    );
                    false
                }
                None => true,
            }
        })
    }

    fn rejections(
        &self,
        slot: &ShiftSlot,
        candidates: &[&Employee],
        schedule: &Schedule,
        problem: &Problem,
    ) -> Vec<CandidateRejection> {
        candidates
            .iter()
            .map(|employee| CandidateRejection {
                employee_id: employee.id.clone(),
                violations: self.evaluator.evaluate(
                    &Assignment::new(&employee.id, &slot.id),
                    schedule,
                    problem,
                    EvaluationMode::Accumulate,
                ),
            })
            .collect()
    }
}

impl Default for GreedySolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn solve(&self, problem: &Problem) -> Solution {
        let started = Instant::now();
        let deadline = self.time_limit.map(|limit| started + limit);

        info!(
            event = "solve_start",
            solver = self.name(),
            employees = problem.employees().len(),
            slots = problem.slots().len(),
            seats = problem.total_seats(),
            pinned = problem.pinned().len(),
        );

        let mut schedule = Schedule::new();
        let mut context = RankingContext::at_time(problem.period().start.and_time(NaiveTime::default()));
        let rejected_pins = self.commit_pins(problem, &mut schedule, &mut context);

        let mut unmet_demand = Vec::new();
        let mut terminated_early = false;

        for slot in self.slot_order(problem) {
            let filled = schedule.filled_count(&slot.id) as u32;
            if filled >= slot.headcount {
                continue;
            }

            if !terminated_early && deadline.is_some_and(|d| Instant::now() >= d) {
                terminated_early = true;
                warn!(
                    event = "time_limit",
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    slot = %slot.id,
                );
            }
            if terminated_early {
                unmet_demand.extend(
                    (filled + 1..=slot.headcount)
                        .map(|seat| unmet(slot, seat, UnmetReason::TimeLimit, Vec::new())),
                );
                continue;
            }

            context.set_time(slot.start());
            for seat in filled + 1..=slot.headcount {
                let candidates: Vec<&Employee> = problem
                    .employees()
                    .iter()
                    .filter(|e| !schedule.contains(&Assignment::new(&e.id, &slot.id)))
                    .collect();
                let ranked = self.ranking.rank(&candidates, &context);

                if let Some(employee) = self.pick(slot, &ranked, &schedule, problem) {
                    debug!(
                        event = "seat_filled",
                        slot = %slot.id,
                        seat,
                        employee = %employee.id,
                    );
                    context.record(&employee.id, slot.window);
                    schedule.add_assignment(Assignment::new(&employee.id, &slot.id));
                    continue;
                }

                // Nothing changes until the next slot, so the remaining seats
                // fail for the same reasons.
                let rejections = self.rejections(slot, &candidates, &schedule, problem);
                debug!(
                    event = "seat_unmet",
                    slot = %slot.id,
                    seat,
                    open = slot.headcount - seat + 1,
                    candidates = candidates.len(),
                );
                unmet_demand.extend((seat..=slot.headcount).map(|s| {
                    unmet(slot, s, UnmetReason::NoFeasibleCandidate, rejections.clone())
                }));
                break;
            }
        }

        info!(
            event = "solve_end",
            solver = self.name(),
            duration_ms = started.elapsed().as_millis() as u64,
            assignments = schedule.assignment_count(),
            unmet = unmet_demand.len(),
            rejected_pins = rejected_pins.len(),
            terminated_early,
        );

        Solution {
            schedule,
            unmet_demand,
            rejected_pins,
            terminated_early,
        }
    }
}

/// Employees who could plausibly take the slot, minus its headcount.
fn slack(problem: &Problem, slot: &ShiftSlot) -> i64 {
    let available = problem
        .employees()
        .iter()
        .filter(|e| {
            e.can_fill(&slot.role)
                && e.is_available_on(slot.weekday(), slot.template_id.as_deref())
                && !problem.is_on_leave_during(&e.id, slot)
        })
        .count();
    available as i64 - i64::from(slot.headcount)
}

fn unmet(
    slot: &ShiftSlot,
    seat: u32,
    reason: UnmetReason,
    rejections: Vec<CandidateRejection>,
) -> UnmetDemand {
    UnmetDemand {
        slot_id: slot.id.clone(),
        seat,
        date: slot.date,
        role: slot.role.clone(),
        reason,
        rejections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyDefaults;
    use crate::models::{
        LeaveRecord, PlanningPeriod, Role, Settings, ShiftTemplate, SkillRequirement, ViolationKind,
    };
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn nurse_days(days: u32) -> Settings {
        Settings::new(PlanningPeriod::try_new(d(1), d(days)).unwrap())
            .with_template(ShiftTemplate::new("day", time(8), time(16), Role::Nurse))
    }

    fn solve(settings: &Settings, roster: &[Employee], leave: &[LeaveRecord]) -> Solution {
        let problem = Problem::new(settings, roster, leave, &PolicyDefaults::default()).unwrap();
        GreedySolver::new().solve(&problem)
    }

    fn days_of(solution: &Solution, employee: &str) -> Vec<String> {
        let mut slots: Vec<String> = solution
            .schedule
            .assignments_for_employee(employee)
            .map(|a| a.slot_id.clone())
            .collect();
        slots.sort();
        slots
    }

    #[test]
    fn test_fills_with_fair_rotation() {
        let roster = vec![Employee::nurse("A"), Employee::nurse("B"), Employee::nurse("C")];
        let solution = solve(&nurse_days(6), &roster, &[]);

        assert!(solution.is_complete());
        let counts = solution.schedule.shift_counts();
        assert_eq!(counts.values().copied().collect::<Vec<_>>(), vec![2, 2, 2]);
        assert_eq!(days_of(&solution, "A"), vec!["2024-03-01/day", "2024-03-04/day"]);
    }

    #[test]
    fn test_leave_and_cap_scenario() {
        let roster = vec![
            Employee::nurse("A").with_max_shifts(3),
            Employee::nurse("B").with_max_shifts(3),
            Employee::nurse("C").with_max_shifts(3),
        ];
        let leave = vec![LeaveRecord::approved("B", d(2), d(3))];
        let solution = solve(&nurse_days(5), &roster, &leave);

        assert!(solution.is_complete());
        assert_eq!(days_of(&solution, "A"), vec!["2024-03-01/day", "2024-03-03/day"]);
        assert_eq!(days_of(&solution, "B"), vec!["2024-03-04/day"]);
        assert_eq!(days_of(&solution, "C"), vec!["2024-03-02/day", "2024-03-05/day"]);
    }

    #[test]
    fn test_unmet_seat_carries_rejections() {
        let settings = Settings::new(PlanningPeriod::try_new(d(1), d(1)).unwrap())
            .with_template(ShiftTemplate::new("day", time(8), time(16), Role::Nurse).with_headcount(2));
        let roster = vec![Employee::nurse("A"), Employee::doctor("D")];
        let solution = solve(&settings, &roster, &[]);

        assert_eq!(solution.schedule.assignment_count(), 1);
        assert_eq!(solution.unmet_demand.len(), 1);

        let unmet = &solution.unmet_demand[0];
        assert_eq!(unmet.seat, 2);
        assert_eq!(unmet.reason, UnmetReason::NoFeasibleCandidate);
        // A already holds the slot and is not offered again.
        assert_eq!(unmet.rejections.len(), 1);
        assert_eq!(unmet.rejections[0].employee_id, "D");
        assert_eq!(unmet.rejections[0].violations[0].kind, ViolationKind::RoleIneligible);
    }

    #[test]
    fn test_never_assigns_overlapping_shifts() {
        let settings = Settings::new(PlanningPeriod::try_new(d(1), d(1)).unwrap())
            .with_template(ShiftTemplate::new("early", time(7), time(15), Role::Nurse))
            .with_template(ShiftTemplate::new("mid", time(11), time(19), Role::Nurse));
        let solution = solve(&settings, &[Employee::nurse("A")], &[]);

        assert_eq!(solution.schedule.assignment_count(), 1);
        assert_eq!(solution.unmet_demand.len(), 1);
        assert_eq!(
            solution.unmet_demand[0].rejections[0].violations[0].kind,
            ViolationKind::Overlap
        );
    }

    #[test]
    fn test_tight_slots_first() {
        // Same day: "clinic" only has one doctor-eligible nurse, so it goes first.
        let settings = Settings::new(PlanningPeriod::try_new(d(1), d(1)).unwrap())
            .with_template(ShiftTemplate::new("ward", time(8), time(12), Role::Nurse))
            .with_template(ShiftTemplate::new("clinic", time(9), time(13), Role::Doctor));
        let roster = vec![
            Employee::nurse("A").with_eligible_role(Role::Doctor),
            Employee::nurse("B"),
        ];
        let problem = Problem::new(&settings, &roster, &[], &PolicyDefaults::default()).unwrap();
        let solver = GreedySolver::new();

        let order: Vec<_> = solver.slot_order(&problem).iter().map(|s| s.id.clone()).collect();
        assert_eq!(order, vec!["2024-03-01/clinic", "2024-03-01/ward"]);

        let solution = solver.solve(&problem);
        assert!(solution.is_complete());
        assert!(solution.schedule.contains(&Assignment::new("A", "2024-03-01/clinic")));
        assert!(solution.schedule.contains(&Assignment::new("B", "2024-03-01/ward")));
    }

    #[test]
    fn test_keeps_last_seat_for_required_skill() {
        let settings = Settings::new(PlanningPeriod::try_new(d(1), d(1)).unwrap()).with_template(
            ShiftTemplate::new("day", time(8), time(16), Role::Nurse)
                .with_headcount(2)
                .with_skill_requirement(SkillRequirement::new("leader", 1)),
        );
        let roster = vec![
            Employee::nurse("A"),
            Employee::nurse("B"),
            Employee::nurse("L").with_skill("leader"),
        ];
        let solution = solve(&settings, &roster, &[]);

        assert!(solution.is_complete());
        assert!(solution.schedule.contains(&Assignment::new("A", "2024-03-01/day")));
        assert!(solution.schedule.contains(&Assignment::new("L", "2024-03-01/day")));
    }

    #[test]
    fn test_missing_skill_leaves_seat_unmet() {
        let settings = Settings::new(PlanningPeriod::try_new(d(1), d(1)).unwrap()).with_template(
            ShiftTemplate::new("day", time(8), time(16), Role::Nurse)
                .with_headcount(2)
                .with_skill_requirement(SkillRequirement::new("injector", 1)),
        );
        let roster = vec![Employee::nurse("A"), Employee::nurse("B")];
        let solution = solve(&settings, &roster, &[]);

        assert_eq!(solution.schedule.assignment_count(), 1);
        assert_eq!(solution.unmet_demand.len(), 1);
        let unmet = &solution.unmet_demand[0];
        assert_eq!(unmet.seat, 2);
        assert_eq!(unmet.rejections[0].employee_id, "B");
        assert_eq!(
            unmet.rejections[0].violations[0].kind,
            ViolationKind::SkillShortfall
        );
    }

    #[test]
    fn test_pins_committed_first() {
        let settings = nurse_days(2)
            .with_pinned(Assignment::new("B", "2024-03-01/day"))
            .with_pinned(Assignment::new("A", "2024-03-01/day"));
        let roster = vec![Employee::nurse("A"), Employee::nurse("B")];
        let solution = solve(&settings, &roster, &[]);

        assert!(solution.schedule.contains(&Assignment::new("B", "2024-03-01/day")));
        assert_eq!(solution.rejected_pins.len(), 1);
        assert_eq!(solution.rejected_pins[0].assignment.employee_id, "A");
        assert_eq!(
            solution.rejected_pins[0].violations[0].kind,
            ViolationKind::Overstaffed
        );
        // A gets day 2 because B already worked day 1.
        assert!(solution.schedule.contains(&Assignment::new("A", "2024-03-02/day")));
    }

    #[test]
    fn test_zero_time_limit_leaves_everything_open() {
        let problem = Problem::new(
            &nurse_days(3),
            &[Employee::nurse("A")],
            &[],
            &PolicyDefaults::default(),
        )
        .unwrap();
        let solution = GreedySolver::new()
            .with_time_limit(Duration::ZERO)
            .solve(&problem);

        assert!(solution.terminated_early);
        assert!(solution.schedule.is_empty());
        assert_eq!(solution.unmet_demand.len(), 3);
        assert!(solution
            .unmet_demand
            .iter()
            .all(|u| u.reason == UnmetReason::TimeLimit));
    }

    #[test]
    fn test_deterministic() {
        let roster = vec![Employee::nurse("C"), Employee::nurse("A"), Employee::nurse("B")];
        let a = solve(&nurse_days(10), &roster, &[]);
        let b = solve(&nurse_days(10), &roster, &[]);
        assert_eq!(a, b);
    }
}
