//! Built-in scheduling rules.
//!
//! # Categories
//!
//! - **Eligibility**: role, approved leave, weekly availability
//! - **Capacity**: slot headcount and skill mix, period/weekly/daily shift
//!   caps, weekly working days
//! - **Time**: overlap, minimum rest between shifts
//!
//! Every rule returns one violation per offending fact (e.g. one per
//! overlapping shift), so accumulated diagnostics name each conflict.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use super::{CandidateContext, ConstraintRule};
use crate::models::{ConstraintViolation, ViolationKind};

// ======================== Eligibility ========================

/// The employee must be eligible for the slot's role.
#[derive(Debug, Clone, Copy)]
pub struct RoleEligibility;

impl ConstraintRule for RoleEligibility {
    fn name(&self) -> &'static str {
        "role_eligibility"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::RoleIneligible
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        if ctx.employee.can_fill(&ctx.slot.role) {
            return Vec::new();
        }
        let eligible: Vec<String> = ctx.employee.eligible_roles.iter().map(|r| r.to_string()).collect();
        vec![ctx.violation(
            self.kind(),
            format!(
                "slot requires {}; employee is eligible for {}",
                ctx.slot.role,
                eligible.join(", ")
            ),
        )]
    }

    fn description(&self) -> &'static str {
        "Employee must hold an eligible role"
    }
}

/// The employee must not be on approved leave on any day the shift touches.
#[derive(Debug, Clone, Copy)]
pub struct LeaveConflict;

impl ConstraintRule for LeaveConflict {
    fn name(&self) -> &'static str {
        "leave_conflict"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::LeaveConflict
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        let records = ctx.problem.leave_for(&ctx.employee.id);
        if records.is_empty() {
            return Vec::new();
        }
        let dates = ctx.slot.window.dates();
        records
            .iter()
            .filter(|r| dates.iter().any(|d| r.covers(*d)))
            .map(|r| {
                ctx.violation(
                    self.kind(),
                    format!("on approved leave {}..={}", r.start, r.end),
                )
                .with_related(format!("leave:{}..{}", r.start, r.end))
            })
            .collect()
    }

    fn description(&self) -> &'static str {
        "No shifts during approved leave"
    }
}

/// The shift must fit the employee's weekly availability pattern.
#[derive(Debug, Clone, Copy)]
pub struct Availability;

impl ConstraintRule for Availability {
    fn name(&self) -> &'static str {
        "availability"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::Unavailable
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        let weekday = ctx.slot.weekday();
        if ctx
            .employee
            .is_available_on(weekday, ctx.slot.template_id.as_deref())
        {
            return Vec::new();
        }
        let shift = ctx.slot.template_id.as_deref().unwrap_or("any shift");
        vec![ctx.violation(
            self.kind(),
            format!("not available for {shift} on {weekday}"),
        )]
    }

    fn description(&self) -> &'static str {
        "Shift must match weekly availability"
    }
}

// ======================== Capacity ========================

/// The slot must still have an open seat.
#[derive(Debug, Clone, Copy)]
pub struct Staffing;

impl ConstraintRule for Staffing {
    fn name(&self) -> &'static str {
        "staffing"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::Overstaffed
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        let headcount = ctx.slot.headcount as usize;
        if ctx.slot_fill < headcount {
            return Vec::new();
        }
        vec![ctx.violation(
            self.kind(),
            format!("slot already has {} of {} seats filled", ctx.slot_fill, headcount),
        )]
    }

    fn description(&self) -> &'static str {
        "Filled seats must not exceed headcount"
    }
}

/// Seats must stay available for the slot's skill mix.
///
/// A candidate without a required skill is turned away when the seats left
/// after it could no longer cover that skill's shortfall. Filling a slot
/// seat by seat this way leaves every full slot with its skill mix.
#[derive(Debug, Clone, Copy)]
pub struct SkillMix;

impl ConstraintRule for SkillMix {
    fn name(&self) -> &'static str {
        "skill_mix"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::SkillShortfall
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        let headcount = ctx.slot.headcount as usize;
        // A full slot is the staffing rule's concern.
        if ctx.slot_fill >= headcount {
            return Vec::new();
        }
        let open_after = headcount - ctx.slot_fill - 1;
        ctx.slot
            .skill_requirements
            .iter()
            .filter(|req| !req.is_met_by(ctx.employee))
            .filter_map(|req| {
                let held = ctx.seated.iter().filter(|e| req.is_met_by(e)).count();
                let missing = (req.min as usize).saturating_sub(held);
                (missing > open_after).then(|| {
                    ctx.violation(
                        self.kind(),
                        format!(
                            "lacks {}; slot still needs {} such employee(s) and only {} seat(s) would remain",
                            req.label(),
                            missing,
                            open_after
                        ),
                    )
                    .with_related(format!("skill:{}", req.label()))
                })
            })
            .collect()
    }

    fn description(&self) -> &'static str {
        "Seated employees must cover the slot's skill mix"
    }
}

/// The employee's total shifts must stay within the period cap.
#[derive(Debug, Clone, Copy)]
pub struct PeriodCap;

impl ConstraintRule for PeriodCap {
    fn name(&self) -> &'static str {
        "period_cap"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::CapExceeded
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        let cap = match ctx.policy.max_shifts {
            Some(cap) => cap as usize,
            None => return Vec::new(),
        };
        let worked = ctx.existing.len();
        if worked < cap {
            return Vec::new();
        }
        vec![ctx.violation(
            self.kind(),
            format!("would be shift {} against a period cap of {}", worked + 1, cap),
        )]
    }

    fn description(&self) -> &'static str {
        "Shifts per period must not exceed the cap"
    }
}

/// The employee's shifts in the slot's ISO week must stay within the weekly cap.
#[derive(Debug, Clone, Copy)]
pub struct WeeklyCap;

impl ConstraintRule for WeeklyCap {
    fn name(&self) -> &'static str {
        "weekly_cap"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::CapExceeded
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        let cap = match ctx.policy.max_shifts_per_week {
            Some(cap) => cap as usize,
            None => return Vec::new(),
        };
        let week = ctx.slot.date.iso_week();
        let worked = ctx
            .existing
            .iter()
            .filter(|s| s.date.iso_week() == week)
            .count();
        if worked < cap {
            return Vec::new();
        }
        vec![ctx.violation(
            self.kind(),
            format!(
                "would be shift {} in week {}-W{:02} against a weekly cap of {}",
                worked + 1,
                week.year(),
                week.week(),
                cap
            ),
        )]
    }

    fn description(&self) -> &'static str {
        "Shifts per week must not exceed the weekly cap"
    }
}

/// The employee's shifts starting on the slot's date must stay within the daily limit.
#[derive(Debug, Clone, Copy)]
pub struct DailyLimit;

impl ConstraintRule for DailyLimit {
    fn name(&self) -> &'static str {
        "daily_limit"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::CapExceeded
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        let limit = match ctx.policy.max_shifts_per_day {
            Some(limit) => limit as usize,
            None => return Vec::new(),
        };
        let worked = ctx
            .existing
            .iter()
            .filter(|s| s.date == ctx.slot.date)
            .count();
        if worked < limit {
            return Vec::new();
        }
        vec![ctx.violation(
            self.kind(),
            format!(
                "would be shift {} on {} against a daily limit of {}",
                worked + 1,
                ctx.slot.date,
                limit
            ),
        )]
    }

    fn description(&self) -> &'static str {
        "Shifts per day must not exceed the daily limit"
    }
}

/// The employee's distinct working days in the slot's ISO week must stay
/// within the weekly limit, leaving the remaining days off.
#[derive(Debug, Clone, Copy)]
pub struct WorkDays;

impl ConstraintRule for WorkDays {
    fn name(&self) -> &'static str {
        "work_days"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::CapExceeded
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        let limit = match ctx.policy.max_work_days_per_week {
            Some(limit) => limit as usize,
            None => return Vec::new(),
        };
        let week = ctx.slot.date.iso_week();
        let days: BTreeSet<NaiveDate> = ctx
            .existing
            .iter()
            .filter(|s| s.date.iso_week() == week)
            .map(|s| s.date)
            .collect();
        if days.contains(&ctx.slot.date) || days.len() < limit {
            return Vec::new();
        }
        vec![ctx.violation(
            self.kind(),
            format!(
                "would be working day {} in week {}-W{:02} against a limit of {}",
                days.len() + 1,
                week.year(),
                week.week(),
                limit
            ),
        )]
    }

    fn description(&self) -> &'static str {
        "Working days per week must leave the required days off"
    }
}

// ======================== Time ========================

/// The shift must not overlap another shift of the same employee.
#[derive(Debug, Clone, Copy)]
pub struct Overlap;

impl ConstraintRule for Overlap {
    fn name(&self) -> &'static str {
        "overlap"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::Overlap
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        ctx.existing
            .iter()
            .filter(|s| s.window.overlaps(&ctx.slot.window))
            .map(|s| {
                ctx.violation(
                    self.kind(),
                    format!(
                        "overlaps {} ({} - {})",
                        s.id,
                        s.start().format("%Y-%m-%d %H:%M"),
                        s.end().format("%Y-%m-%d %H:%M")
                    ),
                )
                .with_related(s.id.clone())
            })
            .collect()
    }

    fn description(&self) -> &'static str {
        "No two overlapping shifts for one employee"
    }
}

/// Non-overlapping shifts of the same employee must be separated by the
/// minimum rest period.
#[derive(Debug, Clone, Copy)]
pub struct RestPeriod;

impl ConstraintRule for RestPeriod {
    fn name(&self) -> &'static str {
        "rest_period"
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::RestPeriodViolated
    }

    fn check(&self, ctx: &CandidateContext<'_>) -> Vec<ConstraintViolation> {
        let min_rest = ctx.policy.min_rest;
        if min_rest <= chrono::Duration::zero() {
            return Vec::new();
        }
        ctx.existing
            .iter()
            .filter_map(|s| {
                let gap = s.window.gap(&ctx.slot.window)?;
                (gap < min_rest).then(|| {
                    ctx.violation(
                        self.kind(),
                        format!(
                            "only {}h{:02} rest next to {} (minimum {}h)",
                            gap.num_hours(),
                            gap.num_minutes() % 60,
                            s.id,
                            min_rest.num_hours()
                        ),
                    )
                    .with_related(s.id.clone())
                })
            })
            .collect()
    }

    fn description(&self) -> &'static str {
        "Minimum rest between consecutive shifts"
    }
}
