//! Whole-schedule validation.
//!
//! Re-checks a finished schedule (solver output or an externally edited
//! one) against every rule. Assignments are replayed in chronological order
//! (slot start, slot id, employee id) and each is evaluated against the
//! assignments before it, so a conflict between two assignments is reported
//! once, on the later one.

use tracing::debug;

use crate::constraints::{ConstraintEvaluator, EvaluationMode};
use crate::models::{Assignment, ConstraintViolation, Schedule, ShiftSlot};
use crate::problem::Problem;
use crate::solver::{UnmetDemand, UnmetReason};

/// Checks complete schedules.
#[derive(Debug, Clone)]
pub struct ScheduleValidator {
    evaluator: ConstraintEvaluator,
}

impl ScheduleValidator {
    /// Creates a validator with the standard rules.
    pub fn new() -> Self {
        Self {
            evaluator: ConstraintEvaluator::standard(),
        }
    }

    /// Replaces the constraint evaluator.
    pub fn with_evaluator(mut self, evaluator: ConstraintEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Returns every violation in `schedule`. Never modifies it.
    pub fn validate(&self, schedule: &Schedule, problem: &Problem) -> Vec<ConstraintViolation> {
        let mut ordered: Vec<&Assignment> = schedule.assignments.iter().collect();
        ordered.sort_by(|a, b| {
            let start_a = problem.slot(&a.slot_id).map(ShiftSlot::start);
            let start_b = problem.slot(&b.slot_id).map(ShiftSlot::start);
            start_a
                .cmp(&start_b)
                .then_with(|| a.slot_id.cmp(&b.slot_id))
                .then_with(|| a.employee_id.cmp(&b.employee_id))
        });

        let mut prefix = Schedule::new();
        let mut violations = Vec::new();
        for assignment in ordered {
            violations.extend(self.evaluator.evaluate(
                assignment,
                &prefix,
                problem,
                EvaluationMode::Accumulate,
            ));
            prefix.add_assignment(assignment.clone());
        }

        debug!(
            event = "validated",
            assignments = schedule.assignment_count(),
            violations = violations.len(),
        );
        violations
    }

    /// Seats of the problem's slots that `schedule` leaves empty, in
    /// chronological order.
    pub fn unfilled_seats(&self, schedule: &Schedule, problem: &Problem) -> Vec<UnmetDemand> {
        let mut slots: Vec<&ShiftSlot> = problem.slots().iter().collect();
        slots.sort_by(|a, b| a.start().cmp(&b.start()).then_with(|| a.id.cmp(&b.id)));

        slots
            .into_iter()
            .flat_map(|slot| {
                let filled = schedule.filled_count(&slot.id) as u32;
                (filled + 1..=slot.headcount).map(move |seat| UnmetDemand {
                    slot_id: slot.id.clone(),
                    seat,
                    date: slot.date,
                    role: slot.role.clone(),
                    reason: UnmetReason::Unassigned,
                    rejections: Vec::new(),
                })
            })
            .collect()
    }
}

impl Default for ScheduleValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyDefaults;
    use crate::models::{Employee, LeaveRecord, PlanningPeriod, Role, Settings, ShiftTemplate, ViolationKind};
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
            .with_template(ShiftTemplate::new("mid", time(11), time(19), Role::Nurse))
            .with_template(ShiftTemplate::new("late", time(15), time(23), Role::Nurse).with_headcount(2));
        let roster = vec![Employee::nurse("A"), Employee::nurse("B"), Employee::doctor("D")];
        let leave = vec![LeaveRecord::day("B", d(2))];
        Problem::new(&settings, &roster, &leave, &PolicyDefaults::default()).unwrap()
    }

    fn schedule_of(pairs: &[(&str, &str)]) -> Schedule {
        Schedule::from_assignments(pairs.iter().map(|(e, s)| Assignment::new(*e, *s)).collect())
    }

    #[test]
    fn test_clean_schedule() {
        let p = problem();
        let schedule = schedule_of(&[("A", "2024-03-01/early"), ("B", "2024-03-01/late")]);
        assert!(ScheduleValidator::new().validate(&schedule, &p).is_empty());
    }

    #[test]
    fn test_overlap_reported_once() {
        let p = problem();
        // Listed in reverse order: replay is chronological regardless.
        let schedule = schedule_of(&[("A", "2024-03-01/mid"), ("A", "2024-03-01/early")]);
        let violations = ScheduleValidator::new().validate(&schedule, &p);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Overlap);
        assert_eq!(violations[0].slot_id, "2024-03-01/mid");
        assert_eq!(violations[0].related, vec!["2024-03-01/early".to_string()]);
    }

    #[test]
    fn test_reports_every_kind_present() {
        let p = problem();
        let schedule = schedule_of(&[
            ("D", "2024-03-01/early"),
            ("B", "2024-03-02/early"),
            ("A", "2024-03-02/mid"),
            ("B", "2024-03-02/mid"),
        ]);
        let kinds: Vec<_> = ScheduleValidator::new()
            .validate(&schedule, &p)
            .into_iter()
            .map(|v| v.kind)
            .collect();

        assert_eq!(
            kinds,
            vec![
                ViolationKind::RoleIneligible,
                ViolationKind::LeaveConflict,
                ViolationKind::LeaveConflict,
                ViolationKind::Overstaffed,
                ViolationKind::Overlap,
            ]
        );
    }

    #[test]
    fn test_does_not_mutate() {
        let p = problem();
        let schedule = schedule_of(&[("A", "2024-03-01/mid"), ("A", "2024-03-01/early")]);
        let before = schedule.clone();
        let validator = ScheduleValidator::new();
        let first = validator.validate(&schedule, &p);
        let second = validator.validate(&schedule, &p);
        assert_eq!(schedule, before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_references() {
        let p = problem();
        let schedule = schedule_of(&[("Z", "2024-03-01/early"), ("A", "2024-03-09/early")]);
        let violations = ScheduleValidator::new().validate(&schedule, &p);
        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .all(|v| v.kind == ViolationKind::UnknownReference));
    }

    #[test]
    fn test_unfilled_seats() {
        let p = problem();
        let schedule = schedule_of(&[("A", "2024-03-01/early"), ("B", "2024-03-01/late")]);
        let open = ScheduleValidator::new().unfilled_seats(&schedule, &p);

        // 6 slots, 8 seats, 2 filled.
        assert_eq!(open.len(), 6);
        assert_eq!(open[0].slot_id, "2024-03-01/mid");
        assert_eq!(open[1].slot_id, "2024-03-01/late");
        assert_eq!(open[1].seat, 2);
        assert!(open.iter().all(|u| u.reason == UnmetReason::Unassigned));
    }
}
