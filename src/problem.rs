//! Per-run problem snapshot.
//!
//! A [`Problem`] is built once per scheduling run from the boundary inputs.
//! It validates them, materializes slots, resolves each employee's workload
//! policy (employee value → role default → config default) and indexes
//! everything by id. It is immutable afterwards; the solver, evaluator and
//! validator only ever read from it.

use chrono::Duration;
use std::collections::HashMap;

use crate::config::PolicyDefaults;
use crate::error::RosterError;
use crate::models::{Assignment, Employee, LeaveRecord, PlanningPeriod, Settings, ShiftSlot};
use crate::validation::validate_input;

/// Resolved workload limits for one employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeePolicy {
    /// Per-period shift cap.
    pub max_shifts: Option<u32>,
    /// Per-ISO-week shift cap.
    pub max_shifts_per_week: Option<u32>,
    /// Per-day shift limit.
    pub max_shifts_per_day: Option<u32>,
    /// Distinct working days per ISO week.
    pub max_work_days_per_week: Option<u32>,
    /// Target shifts over the period.
    pub min_shifts: Option<u32>,
    /// Target shifts per full ISO week.
    pub min_shifts_per_week: Option<u32>,
    /// Minimum rest between shifts.
    pub min_rest: Duration,
}

/// Validated, indexed inputs of one scheduling run.
#[derive(Debug, Clone)]
pub struct Problem {
    period: PlanningPeriod,
    employees: Vec<Employee>,
    policies: Vec<EmployeePolicy>,
    slots: Vec<ShiftSlot>,
    pinned: Vec<Assignment>,
    employee_index: HashMap<String, usize>,
    slot_index: HashMap<String, usize>,
    approved_leave: HashMap<String, Vec<LeaveRecord>>,
}

impl Problem {
    /// Builds a problem snapshot.
    ///
    /// # Errors
    /// - [`RosterError::EmptyRoster`] if `roster` is empty
    /// - [`RosterError::InvalidInput`] with every validation error found
    /// - [`RosterError::EmptySlots`] if the period produces no slots
    pub fn new(
        settings: &Settings,
        roster: &[Employee],
        leave: &[LeaveRecord],
        defaults: &PolicyDefaults,
    ) -> Result<Self, RosterError> {
        if roster.is_empty() {
            return Err(RosterError::EmptyRoster);
        }

        let slots = settings.generate_slots();
        validate_input(settings, roster, &slots, leave)?;

        if slots.is_empty() {
            return Err(RosterError::EmptySlots {
                start: settings.period.start,
                end: settings.period.end,
            });
        }

        let mut employees = roster.to_vec();
        employees.sort_by(|a, b| a.id.cmp(&b.id));

        let policies = employees
            .iter()
            .map(|e| resolve_policy(e, settings, defaults))
            .collect();

        let employee_index = employees
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        let slot_index = slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        let mut approved_leave: HashMap<String, Vec<LeaveRecord>> = HashMap::new();
        for record in leave.iter().filter(|l| l.is_approved()) {
            approved_leave
                .entry(record.employee_id.clone())
                .or_default()
                .push(record.clone());
        }
        for records in approved_leave.values_mut() {
            records.sort_by_key(|r| (r.start, r.end));
        }

        Ok(Self {
            period: settings.period,
            employees,
            policies,
            slots,
            pinned: settings.pinned.clone(),
            employee_index,
            slot_index,
            approved_leave,
        })
    }

    pub fn period(&self) -> PlanningPeriod {
        self.period
    }

    /// Employees sorted by id.
    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    /// Slots in generation order.
    pub fn slots(&self) -> &[ShiftSlot] {
        &self.slots
    }

    /// Pinned pre-assignments, in input order.
    pub fn pinned(&self) -> &[Assignment] {
        &self.pinned
    }

    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employee_index.get(id).map(|&i| &self.employees[i])
    }

    pub fn slot(&self, id: &str) -> Option<&ShiftSlot> {
        self.slot_index.get(id).map(|&i| &self.slots[i])
    }

    /// Resolved workload policy for an employee.
    pub fn policy(&self, employee_id: &str) -> Option<&EmployeePolicy> {
        self.employee_index
            .get(employee_id)
            .map(|&i| &self.policies[i])
    }

    /// Approved leave of an employee, ordered by start date.
    pub fn leave_for(&self, employee_id: &str) -> &[LeaveRecord] {
        self.approved_leave
            .get(employee_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether an employee has approved leave on any day the slot touches.
    pub fn is_on_leave_during(&self, employee_id: &str, slot: &ShiftSlot) -> bool {
        let records = self.leave_for(employee_id);
        !records.is_empty()
            && slot
                .window
                .dates()
                .into_iter()
                .any(|d| records.iter().any(|r| r.covers(d)))
    }

    /// Sum of headcounts over all slots.
    pub fn total_seats(&self) -> usize {
        self.slots.iter().map(|s| s.headcount as usize).sum()
    }
}

fn resolve_policy(
    employee: &Employee,
    settings: &Settings,
    defaults: &PolicyDefaults,
) -> EmployeePolicy {
    let role = settings.defaults_for(&employee.role);
    let min_rest_hours = employee
        .min_rest_hours
        .or_else(|| role.and_then(|r| r.min_rest_hours))
        .unwrap_or(defaults.min_rest_hours);

    EmployeePolicy {
        max_shifts: employee
            .max_shifts
            .or_else(|| role.and_then(|r| r.max_shifts))
            .or(defaults.max_shifts_per_period),
        max_shifts_per_week: employee
            .max_shifts_per_week
            .or_else(|| role.and_then(|r| r.max_shifts_per_week))
            .or(defaults.max_shifts_per_week),
        max_shifts_per_day: defaults.max_shifts_per_day,
        max_work_days_per_week: employee
            .max_work_days_per_week
            .or_else(|| role.and_then(|r| r.max_work_days_per_week))
            .or(defaults.max_work_days_per_week),
        min_shifts: employee
            .min_shifts
            .or_else(|| role.and_then(|r| r.min_shifts))
            .or(defaults.min_shifts_per_period),
        min_shifts_per_week: employee
            .min_shifts_per_week
            .or_else(|| role.and_then(|r| r.min_shifts_per_week))
            .or(defaults.min_shifts_per_week),
        min_rest: Duration::hours(i64::from(min_rest_hours)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeaveStatus, Role, RoleDefaults, ShiftTemplate};
    use chrono::{NaiveDate, NaiveTime};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn settings() -> Settings {
        Settings::new(PlanningPeriod::try_new(d(1), d(3)).unwrap())
            .with_template(ShiftTemplate::new("night", time(22), time(6), Role::Nurse))
    }

    #[test]
    fn test_indexes_and_sorting() {
        let roster = vec![Employee::nurse("C"), Employee::nurse("A"), Employee::nurse("B")];
        let p = Problem::new(&settings(), &roster, &[], &PolicyDefaults::default()).unwrap();

        let ids: Vec<_> = p.employees().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(p.slots().len(), 3);
        assert_eq!(p.total_seats(), 3);
        assert!(p.employee("B").is_some());
        assert!(p.slot("2024-03-02/night").is_some());
        assert!(p.slot("2024-03-09/night").is_none());
    }

    #[test]
    fn test_policy_resolution_order() {
        let settings = settings().with_role_defaults(
            Role::Nurse,
            RoleDefaults {
                max_shifts: Some(10),
                min_rest_hours: Some(8),
                ..Default::default()
            },
        );
        let defaults = PolicyDefaults {
            max_shifts_per_week: Some(4),
            max_shifts_per_day: Some(2),
            ..PolicyDefaults::default()
        };
        let roster = vec![
            Employee::nurse("A").with_max_shifts(3),
            Employee::nurse("B"),
            Employee::doctor("C"),
        ];
        let p = Problem::new(&settings, &roster, &[], &defaults).unwrap();

        let a = p.policy("A").unwrap();
        assert_eq!(a.max_shifts, Some(3));
        assert_eq!(a.min_rest, Duration::hours(8));
        assert_eq!(a.max_shifts_per_week, Some(4));
        assert_eq!(a.max_shifts_per_day, Some(2));

        let b = p.policy("B").unwrap();
        assert_eq!(b.max_shifts, Some(10));

        let c = p.policy("C").unwrap();
        assert_eq!(c.max_shifts, None);
        assert_eq!(c.min_rest, Duration::hours(11));
    }

    #[test]
    fn test_minimums_and_work_days_resolution() {
        let settings = settings().with_role_defaults(
            Role::Nurse,
            RoleDefaults {
                min_shifts_per_week: Some(3),
                max_work_days_per_week: Some(5),
                ..Default::default()
            },
        );
        let defaults = PolicyDefaults {
            min_shifts_per_period: Some(2),
            max_work_days_per_week: Some(6),
            ..PolicyDefaults::default()
        };
        let roster = vec![
            Employee::nurse("A").with_min_shifts(4).with_max_work_days_per_week(4),
            Employee::doctor("D"),
        ];
        let p = Problem::new(&settings, &roster, &[], &defaults).unwrap();

        let a = p.policy("A").unwrap();
        assert_eq!(a.min_shifts, Some(4));
        assert_eq!(a.min_shifts_per_week, Some(3));
        assert_eq!(a.max_work_days_per_week, Some(4));

        let d = p.policy("D").unwrap();
        assert_eq!(d.min_shifts, Some(2));
        assert_eq!(d.min_shifts_per_week, None);
        assert_eq!(d.max_work_days_per_week, Some(6));
    }

    #[test]
    fn test_only_approved_leave_is_kept() {
        let roster = vec![Employee::nurse("A")];
        let leave = vec![
            LeaveRecord::day("A", d(2)),
            LeaveRecord::day("A", d(3)).with_status(LeaveStatus::Rejected),
        ];
        let p = Problem::new(&settings(), &roster, &leave, &PolicyDefaults::default()).unwrap();
        assert_eq!(p.leave_for("A").len(), 1);
        assert!(p.leave_for("nobody").is_empty());
    }

    #[test]
    fn test_overnight_slot_touches_next_day_leave() {
        let roster = vec![Employee::nurse("A")];
        let leave = vec![LeaveRecord::day("A", d(2))];
        let p = Problem::new(&settings(), &roster, &leave, &PolicyDefaults::default()).unwrap();

        // Night of the 1st runs into the morning of the 2nd.
        let night1 = p.slot("2024-03-01/night").unwrap();
        let night3 = p.slot("2024-03-03/night").unwrap();
        assert!(p.is_on_leave_during("A", night1));
        assert!(!p.is_on_leave_during("A", night3));
    }

    #[test]
    fn test_empty_roster() {
        let err = Problem::new(&settings(), &[], &[], &PolicyDefaults::default()).unwrap_err();
        assert!(matches!(err, RosterError::EmptyRoster));
    }

    #[test]
    fn test_empty_slots() {
        let settings = Settings::new(PlanningPeriod::try_new(d(1), d(3)).unwrap());
        let roster = vec![Employee::nurse("A")];
        let err = Problem::new(&settings, &roster, &[], &PolicyDefaults::default()).unwrap_err();
        assert!(matches!(err, RosterError::EmptySlots { .. }));
    }

    #[test]
    fn test_invalid_input() {
        let roster = vec![Employee::nurse("A"), Employee::nurse("A")];
        let err = Problem::new(&settings(), &roster, &[], &PolicyDefaults::default()).unwrap_err();
        match err {
            RosterError::InvalidInput(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }
}
