//! Shift slot, template and time window models.
//!
//! A [`ShiftSlot`] is one dated staffing requirement: a time window, the role
//! that must cover it, how many people are needed and, optionally, a skill
//! mix those people must include ([`SkillRequirement`]). Slots are usually
//! generated from recurring [`ShiftTemplate`]s crossed with the dates of the
//! planning period.
//!
//! # Time Model
//! Windows are half-open `[start, end)` intervals of local clinic time.
//! A template whose end time is not after its start time crosses midnight
//! and ends on the following calendar day.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::{Employee, Role};
use crate::validation::ValidationError;

/// A time interval [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: NaiveDateTime,
    /// Interval end (exclusive).
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Length of the window.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether two windows overlap. Touching windows do not.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Idle time between two non-overlapping windows, `None` if they overlap.
    pub fn gap(&self, other: &Self) -> Option<Duration> {
        if self.overlaps(other) {
            None
        } else if self.end <= other.start {
            Some(other.start - self.end)
        } else {
            Some(self.start - other.end)
        }
    }

    /// Calendar dates touched by the window.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let first = self.start.date();
        let last = if self.end > self.start {
            (self.end - Duration::nanoseconds(1)).date()
        } else {
            first
        };
        first.iter_days().take_while(|d| *d <= last).collect()
    }
}

/// At least `min` seats of a slot must go to employees holding any of `skills`.
///
/// Several requirements on one slot are independent: a "leader" minimum of 1,
/// an "injector" minimum of 1 and a "leader or injector" minimum of 2 are
/// three requirements, and one employee may count toward all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRequirement {
    /// Qualifying skills; holding any one of them counts.
    pub skills: BTreeSet<String>,
    /// Seats that must be held by qualifying employees.
    pub min: u32,
}

impl SkillRequirement {
    /// Requires `min` holders of `skill`.
    pub fn new(skill: impl Into<String>, min: u32) -> Self {
        Self::any_of([skill], min)
    }

    /// Requires `min` employees holding at least one of `skills`.
    pub fn any_of<I, S>(skills: I, min: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skills: skills.into_iter().map(Into::into).collect(),
            min,
        }
    }

    /// Whether `employee` counts toward this requirement.
    pub fn is_met_by(&self, employee: &Employee) -> bool {
        employee.skills.iter().any(|s| self.skills.contains(s))
    }

    /// Skill names joined with " or ", e.g. "injector or leader".
    pub fn label(&self) -> String {
        self.skills.iter().map(String::as_str).collect::<Vec<_>>().join(" or ")
    }

    fn validate(&self, owner: &str) -> Result<(), ValidationError> {
        if self.skills.iter().all(|s| s.trim().is_empty()) {
            return Err(ValidationError::malformed(
                owner,
                "skill_requirements",
                "skill requirement names no skill",
            ));
        }
        Ok(())
    }
}

/// A dated staffing requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftSlot {
    /// Unique slot identifier.
    pub id: String,
    /// Calendar date the shift belongs to (the start date).
    pub date: NaiveDate,
    /// When the shift runs.
    pub window: TimeWindow,
    /// Role every seat requires.
    pub role: Role,
    /// Number of seats (≥ 1).
    pub headcount: u32,
    /// Template this slot was generated from.
    pub template_id: Option<String>,
    /// Skill mix the seated employees must include.
    #[serde(default)]
    pub skill_requirements: Vec<SkillRequirement>,
}

impl ShiftSlot {
    /// Creates a slot, deriving its id from date, start time and role.
    ///
    /// Fails with `MalformedInput` if `start >= end` or `headcount == 0`.
    pub fn try_new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        role: Role,
        headcount: u32,
    ) -> Result<Self, ValidationError> {
        let id = format!("{}-{}", start.format("%Y-%m-%dT%H:%M"), role);
        let slot = Self {
            id,
            date: start.date(),
            window: TimeWindow::new(start, end),
            role,
            headcount,
            template_id: None,
            skill_requirements: Vec::new(),
        };
        slot.validate()?;
        Ok(slot)
    }

    /// Overrides the derived id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Records the originating template.
    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    /// Adds a skill requirement.
    pub fn with_skill_requirement(mut self, requirement: SkillRequirement) -> Self {
        self.skill_requirements.push(requirement);
        self
    }

    #[inline]
    pub fn start(&self) -> NaiveDateTime {
        self.window.start
    }

    #[inline]
    pub fn end(&self) -> NaiveDateTime {
        self.window.end
    }

    /// Weekday of the slot date.
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    /// Shift length in hours.
    pub fn hours(&self) -> f64 {
        self.window.duration().num_minutes() as f64 / 60.0
    }

    /// Checks structural well-formedness.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::malformed(&self.id, "id", "slot id is empty"));
        }
        if self.window.start >= self.window.end {
            return Err(ValidationError::malformed(
                &self.id,
                "window",
                format!(
                    "start {} is not before end {}",
                    self.window.start, self.window.end
                ),
            ));
        }
        if self.date != self.window.start.date() {
            return Err(ValidationError::malformed(
                &self.id,
                "date",
                format!(
                    "date {} does not match window start {}",
                    self.date, self.window.start
                ),
            ));
        }
        if self.headcount == 0 {
            return Err(ValidationError::malformed(
                &self.id,
                "headcount",
                "headcount must be at least 1",
            ));
        }
        for requirement in &self.skill_requirements {
            requirement.validate(&self.id)?;
            if requirement.min > self.headcount {
                return Err(ValidationError::malformed(
                    &self.id,
                    "skill_requirements",
                    format!(
                        "needs {} {} but has only {} seats",
                        requirement.min,
                        requirement.label(),
                        self.headcount
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// A recurring weekly shift pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftTemplate {
    /// Unique template identifier (e.g. "early").
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Weekdays the template applies to. Empty = every day.
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    /// Local start time.
    pub start: NaiveTime,
    /// Local end time; not after `start` means the next day.
    pub end: NaiveTime,
    /// Required role.
    pub role: Role,
    /// Seats per generated slot (`None` = role default, else 1).
    #[serde(default)]
    pub headcount: Option<u32>,
    /// Skill mix copied onto every generated slot.
    #[serde(default)]
    pub skill_requirements: Vec<SkillRequirement>,
}

impl ShiftTemplate {
    /// Creates a template that applies every day.
    pub fn new(id: impl Into<String>, start: NaiveTime, end: NaiveTime, role: Role) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            weekdays: Vec::new(),
            start,
            end,
            role,
            headcount: None,
            skill_requirements: Vec::new(),
        }
    }

    /// Sets the template name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the number of seats.
    pub fn with_headcount(mut self, headcount: u32) -> Self {
        self.headcount = Some(headcount);
        self
    }

    /// Adds a skill requirement.
    pub fn with_skill_requirement(mut self, requirement: SkillRequirement) -> Self {
        self.skill_requirements.push(requirement);
        self
    }

    /// Restricts the template to the given weekdays.
    pub fn on_days(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays = weekdays.into_iter().collect();
        self
    }

    /// Whether the template produces a slot on `date`.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.weekdays.is_empty() || self.weekdays.contains(&date.weekday())
    }

    /// Whether the shift ends on the day after it starts.
    pub fn is_overnight(&self) -> bool {
        self.end <= self.start
    }

    /// Checks structural well-formedness.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::malformed(&self.id, "id", "template id is empty"));
        }
        if self.headcount == Some(0) {
            return Err(ValidationError::malformed(
                &self.id,
                "headcount",
                "headcount must be at least 1",
            ));
        }
        for requirement in &self.skill_requirements {
            requirement.validate(&self.id)?;
        }
        Ok(())
    }

    /// Materializes the template on `date` with `headcount` seats.
    ///
    /// Slot ids have the form `{date}/{template_id}`.
    pub fn slot_on(&self, date: NaiveDate, headcount: u32) -> ShiftSlot {
        let start = date.and_time(self.start);
        let end_date = if self.is_overnight() {
            date + Duration::days(1)
        } else {
            date
        };
        ShiftSlot {
            id: format!("{}/{}", date, self.id),
            date,
            window: TimeWindow::new(start, end_date.and_time(self.end)),
            role: self.role.clone(),
            headcount,
            template_id: Some(self.id.clone()),
            skill_requirements: self.skill_requirements.clone(),
        }
    }
}
