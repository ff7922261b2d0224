//! Employee model.
//!
//! Employees are the staff members that fill shift seats. Each employee has
//! a primary role, a set of roles they are eligible to cover, skill tags
//! (e.g. "leader", "injector"), optional workload caps and minimums, a
//! minimum rest period, and an optional weekly availability pattern.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::validation::ValidationError;

/// A staff member that can be assigned to shift slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    /// Unique employee identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Primary role.
    pub role: Role,
    /// Roles this employee may fill. Always contains `role`.
    pub eligible_roles: BTreeSet<Role>,
    /// Maximum shifts over the planning period (`None` = role/config default).
    pub max_shifts: Option<u32>,
    /// Maximum shifts per ISO week (`None` = role/config default).
    pub max_shifts_per_week: Option<u32>,
    /// Target minimum shifts over the planning period.
    pub min_shifts: Option<u32>,
    /// Target minimum shifts per full ISO week of the period.
    pub min_shifts_per_week: Option<u32>,
    /// Maximum distinct working days per ISO week (7 minus required days off).
    pub max_work_days_per_week: Option<u32>,
    /// Minimum hours between the end of one shift and the start of the next.
    pub min_rest_hours: Option<u32>,
    /// Weekly availability: weekday → template ids the employee can work.
    ///
    /// Empty = available every day for every shift. When non-empty, weekdays
    /// missing from the map are unavailable.
    #[serde(default)]
    pub availability: HashMap<Weekday, BTreeSet<String>>,
    /// Qualifications counted by slot skill requirements.
    #[serde(default)]
    pub skills: BTreeSet<String>,
}

/// Staff role classification.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Doctor,
    Nurse,
    Assistant,
    /// Administrative / front-desk cover.
    Admin,
    /// Clinic-specific role.
    Custom(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Assistant => "assistant",
            Role::Admin => "admin",
            Role::Custom(name) => name.as_str(),
        };
        f.pad(name)
    }
}

impl Employee {
    /// Creates a new employee eligible only for its primary role.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        let mut eligible_roles = BTreeSet::new();
        eligible_roles.insert(role.clone());
        Self {
            id: id.into(),
            name: String::new(),
            role,
            eligible_roles,
            max_shifts: None,
            max_shifts_per_week: None,
            min_shifts: None,
            min_shifts_per_week: None,
            max_work_days_per_week: None,
            min_rest_hours: None,
            availability: HashMap::new(),
            skills: BTreeSet::new(),
        }
    }

    /// Creates an employee, rejecting structurally invalid data.
    pub fn try_new(id: impl Into<String>, role: Role) -> Result<Self, ValidationError> {
        let employee = Self::new(id, role);
        employee.validate()?;
        Ok(employee)
    }

    /// Creates a nurse.
    pub fn nurse(id: impl Into<String>) -> Self {
        Self::new(id, Role::Nurse)
    }

    /// Creates a doctor.
    pub fn doctor(id: impl Into<String>) -> Self {
        Self::new(id, Role::Doctor)
    }

    /// Creates an assistant.
    pub fn assistant(id: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant)
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds an additional eligible role.
    pub fn with_eligible_role(mut self, role: Role) -> Self {
        self.eligible_roles.insert(role);
        self
    }

    /// Sets the per-period shift cap.
    pub fn with_max_shifts(mut self, max_shifts: u32) -> Self {
        self.max_shifts = Some(max_shifts);
        self
    }

    /// Sets the per-week shift cap.
    pub fn with_max_shifts_per_week(mut self, max_shifts: u32) -> Self {
        self.max_shifts_per_week = Some(max_shifts);
        self
    }

    /// Sets the per-period shift minimum.
    pub fn with_min_shifts(mut self, min_shifts: u32) -> Self {
        self.min_shifts = Some(min_shifts);
        self
    }

    /// Sets the per-week shift minimum.
    pub fn with_min_shifts_per_week(mut self, min_shifts: u32) -> Self {
        self.min_shifts_per_week = Some(min_shifts);
        self
    }

    /// Sets the most days per week the employee may work.
    pub fn with_max_work_days_per_week(mut self, days: u32) -> Self {
        self.max_work_days_per_week = Some(days);
        self
    }

    /// Adds a skill tag.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    /// Sets the minimum rest between shifts.
    pub fn with_min_rest_hours(mut self, hours: u32) -> Self {
        self.min_rest_hours = Some(hours);
        self
    }

    /// Declares the templates the employee can work on a weekday.
    pub fn with_availability<I, S>(mut self, weekday: Weekday, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.availability
            .entry(weekday)
            .or_default()
            .extend(templates.into_iter().map(Into::into));
        self
    }

    /// Whether this employee may fill a seat requiring `role`.
    pub fn can_fill(&self, role: &Role) -> bool {
        self.role == *role || self.eligible_roles.contains(role)
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }

    /// Whether the weekly pattern allows working `template_id` on `weekday`.
    ///
    /// Slots without a template are checked at weekday granularity only.
    pub fn is_available_on(&self, weekday: Weekday, template_id: Option<&str>) -> bool {
        if self.availability.is_empty() {
            return true;
        }
        match (self.availability.get(&weekday), template_id) {
            (None, _) => false,
            (Some(templates), Some(id)) => templates.contains(id),
            (Some(templates), None) => !templates.is_empty(),
        }
    }

    /// Checks structural well-formedness.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::malformed(&self.id, "id", "employee id is empty"));
        }
        if let (Some(min), Some(max)) = (self.min_shifts, self.max_shifts) {
            if min > max {
                return Err(ValidationError::malformed(
                    &self.id,
                    "min_shifts",
                    format!("minimum of {min} shifts exceeds the cap of {max}"),
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_shifts_per_week, self.max_shifts_per_week) {
            if min > max {
                return Err(ValidationError::malformed(
                    &self.id,
                    "min_shifts_per_week",
                    format!("weekly minimum of {min} shifts exceeds the weekly cap of {max}"),
                ));
            }
        }
        if self.max_work_days_per_week.is_some_and(|days| days > 7) {
            return Err(ValidationError::malformed(
                &self.id,
                "max_work_days_per_week",
                "a week has only 7 days",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_builder() {
        let e = Employee::nurse("N1")
            .with_name("Kim")
            .with_eligible_role(Role::Assistant)
            .with_max_shifts(20)
            .with_max_shifts_per_week(5)
            .with_min_rest_hours(12);

        assert_eq!(e.id, "N1");
        assert_eq!(e.name, "Kim");
        assert_eq!(e.role, Role::Nurse);
        assert!(e.can_fill(&Role::Nurse));
        assert!(e.can_fill(&Role::Assistant));
        assert!(!e.can_fill(&Role::Doctor));
        assert_eq!(e.max_shifts, Some(20));
        assert_eq!(e.max_shifts_per_week, Some(5));
        assert_eq!(e.min_rest_hours, Some(12));
    }

    #[test]
    fn test_try_new_rejects_empty_id() {
        let err = Employee::try_new("  ", Role::Doctor).unwrap_err();
        assert_eq!(err.field, "id");
        assert!(Employee::try_new("D1", Role::Doctor).is_ok());
    }

    #[test]
    fn test_skills_and_minimums() {
        let e = Employee::nurse("N1")
            .with_skill("leader")
            .with_skill("injector")
            .with_min_shifts(8)
            .with_min_shifts_per_week(2)
            .with_max_work_days_per_week(5);

        assert!(e.has_skill("leader"));
        assert!(!e.has_skill("triage"));
        assert_eq!(e.min_shifts, Some(8));
        assert_eq!(e.min_shifts_per_week, Some(2));
        assert_eq!(e.max_work_days_per_week, Some(5));
        assert!(e.validate().is_ok());
    }

    #[test]
    fn test_minimum_above_cap_is_malformed() {
        let err = Employee::nurse("N1").with_max_shifts(4).with_min_shifts(5).validate().unwrap_err();
        assert_eq!(err.field, "min_shifts");

        let err = Employee::nurse("N1")
            .with_max_shifts_per_week(3)
            .with_min_shifts_per_week(4)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "min_shifts_per_week");

        let err = Employee::nurse("N1").with_max_work_days_per_week(8).validate().unwrap_err();
        assert_eq!(err.field, "max_work_days_per_week");
    }

    #[test]
    fn test_availability_default_is_open() {
        let e = Employee::nurse("N1");
        assert!(e.is_available_on(Weekday::Sun, None));
        assert!(e.is_available_on(Weekday::Mon, Some("early")));
    }

    #[test]
    fn test_availability_pattern() {
        let e = Employee::nurse("N1")
            .with_availability(Weekday::Mon, ["early", "late"])
            .with_availability(Weekday::Tue, ["early"]);

        assert!(e.is_available_on(Weekday::Mon, Some("late")));
        assert!(!e.is_available_on(Weekday::Tue, Some("late")));
        assert!(e.is_available_on(Weekday::Tue, None));
        assert!(!e.is_available_on(Weekday::Wed, Some("early")));
        assert!(!e.is_available_on(Weekday::Wed, None));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Nurse.to_string(), "nurse");
        assert_eq!(Role::Custom("radiographer".into()).to_string(), "radiographer");
    }
}
