//! Schedule (solution) model.
//!
//! A schedule is the set of employee-to-slot assignments for a planning
//! period. Constraint violations are diagnostic values produced by the
//! evaluator; they are never stored on the schedule itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A roster for one planning period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Assignments in commit order.
    pub assignments: Vec<Assignment>,
}

/// One filled seat: an employee working a slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned employee ID.
    pub employee_id: String,
    /// Filled slot ID.
    pub slot_id: String,
}

/// A detected breach of a scheduling rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Which rule was broken.
    pub kind: ViolationKind,
    /// Employee of the offending assignment.
    pub employee_id: String,
    /// Slot of the offending assignment.
    pub slot_id: String,
    /// Other entities involved (conflicting slots, leave ranges, ...).
    pub related: Vec<String>,
    /// Human-readable description.
    pub message: String,
}

/// Classification of constraint violations.
///
/// Variant order is the order used when grouping violations in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Two assignments of one employee overlap in time.
    Overlap,
    /// Assignment falls on an approved leave day.
    LeaveConflict,
    /// Employee is not eligible for the slot's role.
    RoleIneligible,
    /// Period, weekly or daily shift cap, or weekly working-day limit, exceeded.
    CapExceeded,
    /// Too little rest between two shifts.
    RestPeriodViolated,
    /// Outside the employee's weekly availability pattern.
    Unavailable,
    /// Slot already holds its full headcount.
    Overstaffed,
    /// The seat is needed for an employee with a required skill.
    SkillShortfall,
    /// Assignment references an unknown employee or slot.
    UnknownReference,
}

impl ViolationKind {
    /// All kinds in report order.
    pub const ALL: [ViolationKind; 9] = [
        ViolationKind::Overlap,
        ViolationKind::LeaveConflict,
        ViolationKind::RoleIneligible,
        ViolationKind::CapExceeded,
        ViolationKind::RestPeriodViolated,
        ViolationKind::Unavailable,
        ViolationKind::Overstaffed,
        ViolationKind::SkillShortfall,
        ViolationKind::UnknownReference,
    ];

    /// Short label used in rendered reports.
    pub fn label(&self) -> &'static str {
        match self {
            ViolationKind::Overlap => "overlap",
            ViolationKind::LeaveConflict => "leave conflict",
            ViolationKind::RoleIneligible => "role ineligible",
            ViolationKind::CapExceeded => "cap exceeded",
            ViolationKind::RestPeriodViolated => "rest period violated",
            ViolationKind::Unavailable => "unavailable",
            ViolationKind::Overstaffed => "overstaffed",
            ViolationKind::SkillShortfall => "skill shortfall",
            ViolationKind::UnknownReference => "unknown reference",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Assignment {
    /// Creates a new assignment.
    pub fn new(employee_id: impl Into<String>, slot_id: impl Into<String>) -> Self {
        Self {
            employee_id: employee_id.into(),
            slot_id: slot_id.into(),
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.employee_id, self.slot_id)
    }
}

impl ConstraintViolation {
    /// Creates a violation for `assignment`.
    pub fn new(kind: ViolationKind, assignment: &Assignment, message: impl Into<String>) -> Self {
        Self {
            kind,
            employee_id: assignment.employee_id.clone(),
            slot_id: assignment.slot_id.clone(),
            related: Vec::new(),
            message: message.into(),
        }
    }

    /// Adds a related entity id.
    pub fn with_related(mut self, id: impl Into<String>) -> Self {
        self.related.push(id.into());
        self
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {}: {}",
            self.kind, self.employee_id, self.slot_id, self.message
        )
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schedule from assignments.
    pub fn from_assignments(assignments: Vec<Assignment>) -> Self {
        Self { assignments }
    }

    /// Adds an assignment.
    pub fn add_assignment(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    /// Removes one occurrence of an assignment. Returns whether it existed.
    pub fn remove_assignment(&mut self, assignment: &Assignment) -> bool {
        match self.assignments.iter().position(|a| a == assignment) {
            Some(idx) => {
                self.assignments.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether the schedule contains the assignment.
    pub fn contains(&self, assignment: &Assignment) -> bool {
        self.assignments.iter().any(|a| a == assignment)
    }

    /// Returns all assignments for a given employee.
    pub fn assignments_for_employee<'a>(
        &'a self,
        employee_id: &'a str,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments
            .iter()
            .filter(move |a| a.employee_id == employee_id)
    }

    /// Returns all assignments for a given slot.
    pub fn assignments_for_slot<'a>(
        &'a self,
        slot_id: &'a str,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments.iter().filter(move |a| a.slot_id == slot_id)
    }

    /// Number of seats filled in a slot.
    pub fn filled_count(&self, slot_id: &str) -> usize {
        self.assignments_for_slot(slot_id).count()
    }

    /// Number of shifts assigned to an employee.
    pub fn shift_count(&self, employee_id: &str) -> usize {
        self.assignments_for_employee(employee_id).count()
    }

    /// Shift counts for every employee that has at least one assignment.
    pub fn shift_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for a in &self.assignments {
            *counts.entry(a.employee_id.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Employee ids seated in a slot, in commit order.
    pub fn employees_in_slot(&self, slot_id: &str) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|a| a.slot_id == slot_id)
            .map(|a| a.employee_id.as_str())
            .collect()
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.add_assignment(Assignment::new("A", "d1/early"));
        s.add_assignment(Assignment::new("B", "d1/early"));
        s.add_assignment(Assignment::new("A", "d2/late"));
        s
    }

    #[test]
    fn test_counts() {
        let s = sample_schedule();
        assert_eq!(s.assignment_count(), 3);
        assert_eq!(s.filled_count("d1/early"), 2);
        assert_eq!(s.filled_count("d2/late"), 1);
        assert_eq!(s.filled_count("d3/late"), 0);
        assert_eq!(s.shift_count("A"), 2);
        assert_eq!(s.shift_count("C"), 0);

        let counts = s.shift_counts();
        assert_eq!(counts["A"], 2);
        assert_eq!(counts["B"], 1);
        assert!(!counts.contains_key("C"));
    }

    #[test]
    fn test_employees_in_slot() {
        let s = sample_schedule();
        assert_eq!(s.employees_in_slot("d1/early"), vec!["A", "B"]);
        assert!(s.employees_in_slot("d9/night").is_empty());
    }

    #[test]
    fn test_employees_in_slot_outlives_id() {
        let s = sample_schedule();
        let seated = {
            let id = format!("d{}/early", 1);
            s.employees_in_slot(&id)
        };
        assert_eq!(seated, vec!["A", "B"]);
    }

    #[test]
    fn test_remove_assignment() {
        let mut s = sample_schedule();
        let a = Assignment::new("A", "d2/late");
        assert!(s.contains(&a));
        assert!(s.remove_assignment(&a));
        assert!(!s.contains(&a));
        assert!(!s.remove_assignment(&a));
        assert_eq!(s.assignment_count(), 2);
    }

    #[test]
    fn test_empty_schedule() {
        let s = Schedule::new();
        assert!(s.is_empty());
        assert!(s.shift_counts().is_empty());
    }

    #[test]
    fn test_violation_display() {
        let v = ConstraintViolation::new(
            ViolationKind::LeaveConflict,
            &Assignment::new("B", "d2/early"),
            "on approved leave",
        )
        .with_related("leave:2024-03-02..2024-03-03");

        assert_eq!(v.related.len(), 1);
        assert_eq!(v.to_string(), "[leave conflict] B @ d2/early: on approved leave");
    }

    #[test]
    fn test_kind_order() {
        let mut kinds = ViolationKind::ALL.to_vec();
        kinds.reverse();
        kinds.sort();
        assert_eq!(kinds, ViolationKind::ALL.to_vec());
    }
}
