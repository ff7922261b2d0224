//! Planning settings: period bounds, shift templates, role defaults and
//! pinned pre-assignments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Assignment, Role, ShiftSlot, ShiftTemplate};
use crate::validation::ValidationError;

/// Inclusive range of calendar dates being planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningPeriod {
    /// First planned day.
    pub start: NaiveDate,
    /// Last planned day (inclusive).
    pub end: NaiveDate,
}

impl PlanningPeriod {
    /// Creates a period, rejecting an inverted range.
    pub fn try_new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        let period = Self { start, end };
        period.validate()?;
        Ok(period)
    }

    /// Whether `date` lies inside the period.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date of the period, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .collect()
    }

    /// Number of days in the period.
    pub fn day_count(&self) -> usize {
        if self.end < self.start {
            return 0;
        }
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start > self.end {
            return Err(ValidationError::malformed(
                "period",
                "end",
                format!("period ends ({}) before it starts ({})", self.end, self.start),
            ));
        }
        Ok(())
    }
}

/// Defaults applied to every employee whose primary role matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefaults {
    /// Default seats for templates of this role.
    pub headcount: Option<u32>,
    /// Default per-period shift cap.
    pub max_shifts: Option<u32>,
    /// Default per-week shift cap.
    pub max_shifts_per_week: Option<u32>,
    /// Default per-period shift minimum.
    pub min_shifts: Option<u32>,
    /// Default per-week shift minimum.
    pub min_shifts_per_week: Option<u32>,
    /// Default working-day limit per week.
    pub max_work_days_per_week: Option<u32>,
    /// Default minimum rest between shifts.
    pub min_rest_hours: Option<u32>,
}

/// Everything about a planning run that is not the roster or leave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Dates being planned.
    pub period: PlanningPeriod,
    /// Recurring shift patterns, expanded over the period.
    #[serde(default)]
    pub templates: Vec<ShiftTemplate>,
    /// Additional one-off slots.
    #[serde(default)]
    pub slots: Vec<ShiftSlot>,
    /// Per-role defaults.
    #[serde(default)]
    pub role_defaults: BTreeMap<Role, RoleDefaults>,
    /// Assignments that must be honored before automatic filling.
    #[serde(default)]
    pub pinned: Vec<Assignment>,
}

impl Settings {
    /// Creates settings for a period with no templates.
    pub fn new(period: PlanningPeriod) -> Self {
        Self {
            period,
            templates: Vec::new(),
            slots: Vec::new(),
            role_defaults: BTreeMap::new(),
            pinned: Vec::new(),
        }
    }

    /// Adds a shift template.
    pub fn with_template(mut self, template: ShiftTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Adds an explicit slot.
    pub fn with_slot(mut self, slot: ShiftSlot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Sets defaults for a role.
    pub fn with_role_defaults(mut self, role: Role, defaults: RoleDefaults) -> Self {
        self.role_defaults.insert(role, defaults);
        self
    }

    /// Pins an assignment.
    pub fn with_pinned(mut self, assignment: Assignment) -> Self {
        self.pinned.push(assignment);
        self
    }

    /// Defaults for `role`, if configured.
    pub fn defaults_for(&self, role: &Role) -> Option<&RoleDefaults> {
        self.role_defaults.get(role)
    }

    /// Expands templates over the period and appends explicit slots.
    ///
    /// Template slots come first, ordered by date then template order.
    pub fn generate_slots(&self) -> Vec<ShiftSlot> {
        let mut slots = Vec::new();
        for date in self.period.dates() {
            for template in self.templates.iter().filter(|t| t.applies_on(date)) {
                let headcount = template
                    .headcount
                    .or_else(|| self.defaults_for(&template.role).and_then(|d| d.headcount))
                    .unwrap_or(1);
                slots.push(template.slot_on(date, headcount));
            }
        }
        slots.extend(self.slots.iter().cloned());
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_period() {
        let p = PlanningPeriod::try_new(d(1), d(5)).unwrap();
        assert_eq!(p.day_count(), 5);
        assert_eq!(p.dates().len(), 5);
        assert!(p.contains(d(3)));
        assert!(!p.contains(d(6)));

        assert!(PlanningPeriod::try_new(d(5), d(1)).is_err());
    }

    #[test]
    fn test_generate_slots_from_templates() {
        // 2024-03-04 (Mon) .. 2024-03-10 (Sun)
        let settings = Settings::new(PlanningPeriod::try_new(d(4), d(10)).unwrap())
            .with_template(ShiftTemplate::new("early", time(7), time(15), Role::Nurse))
            .with_template(
                ShiftTemplate::new("clinic", time(9), time(13), Role::Doctor)
                    .on_days([Weekday::Mon, Weekday::Thu]),
            );

        let slots = settings.generate_slots();
        assert_eq!(slots.len(), 7 + 2);
        assert_eq!(slots[0].id, "2024-03-04/early");
        assert_eq!(slots[1].id, "2024-03-04/clinic");
        assert!(slots.iter().all(|s| s.headcount == 1));
    }

    #[test]
    fn test_role_default_headcount() {
        let settings = Settings::new(PlanningPeriod::try_new(d(1), d(1)).unwrap())
            .with_template(ShiftTemplate::new("early", time(7), time(15), Role::Nurse))
            .with_template(
                ShiftTemplate::new("late", time(15), time(23), Role::Nurse).with_headcount(1),
            )
            .with_role_defaults(
                Role::Nurse,
                RoleDefaults {
                    headcount: Some(3),
                    ..Default::default()
                },
            );

        let slots = settings.generate_slots();
        assert_eq!(slots[0].headcount, 3);
        assert_eq!(slots[1].headcount, 1); // template value wins
    }

    #[test]
    fn test_explicit_slots_appended() {
        let extra = ShiftSlot::try_new(
            d(1).and_time(time(18)),
            d(1).and_time(time(20)),
            Role::Doctor,
            1,
        )
        .unwrap()
        .with_id("evening-clinic");

        let settings =
            Settings::new(PlanningPeriod::try_new(d(1), d(2)).unwrap()).with_slot(extra);
        let slots = settings.generate_slots();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, "evening-clinic");
    }
}
