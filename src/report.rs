//! Roster diagnostics.
//!
//! Shapes a schedule, its violations and its unmet demand into a
//! [`Report`]: totals, per-employee workload against caps and minimums,
//! per-slot fill state and skill shortfalls, violations grouped by kind,
//! and quality indicators. Purely a
//! data-shaping step; no rule is re-evaluated here.
//!
//! # Indicators
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Coverage | Filled seats (capped at headcount) / required seats |
//! | Fairness spread | Most shifts − fewest shifts over the roster |
//! | Mean shifts | Assignments per employee |
//! | Double-shift days | (employee, day) pairs with exactly two shifts |

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Duration, IsoWeek, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::{
    ConstraintViolation, Employee, PlanningPeriod, Role, Schedule, ViolationKind,
};
use crate::problem::Problem;
use crate::solver::{RejectedPin, Solution, UnmetDemand};

/// Complete diagnostics for one schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Dates covered.
    pub period: PlanningPeriod,
    /// Headline totals.
    pub summary: ReportSummary,
    /// Workload per employee, ordered by id.
    pub employees: Vec<EmployeeLoad>,
    /// Fill state per slot, in chronological order.
    pub slots: Vec<SlotStatus>,
    /// Violations grouped by kind, in [`ViolationKind::ALL`] order.
    pub violations: Vec<ViolationGroup>,
    /// Seats left open.
    pub unmet_demand: Vec<UnmetDemand>,
    /// Pinned assignments that were not honored.
    pub rejected_pins: Vec<RejectedPin>,
    /// Quality indicators.
    pub kpi: RosterKpi,
}

/// Headline totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub employees: usize,
    pub slots: usize,
    /// Seats required over all slots.
    pub seats: usize,
    /// Seats filled (capped at each slot's headcount).
    pub filled_seats: usize,
    pub unmet_seats: usize,
    pub violations: usize,
    pub rejected_pins: usize,
    /// Employees below a period or weekly minimum.
    pub underworked: usize,
    /// Slots whose seated employees miss a skill requirement.
    pub skill_shortfalls: usize,
    /// Whether the solver hit its time limit.
    pub terminated_early: bool,
}

/// One employee's workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeLoad {
    pub employee_id: String,
    pub name: String,
    pub role: Role,
    /// Assigned shifts.
    pub shifts: usize,
    /// Assigned hours.
    pub hours: f64,
    /// Resolved period cap.
    pub cap: Option<u32>,
    /// Resolved period minimum.
    pub minimum: Option<u32>,
    /// More shifts than the cap allows.
    pub overworked: bool,
    /// Below the period minimum, or below the weekly minimum in a full week.
    pub underworked: bool,
    /// Full ISO weeks of the period below the weekly minimum.
    pub short_weeks: Vec<WeekShortfall>,
}

/// A full ISO week in which an employee worked fewer shifts than required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekShortfall {
    /// ISO week, e.g. "2024-W10".
    pub week: String,
    pub shifts: usize,
    pub minimum: u32,
}

/// How full a slot is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillState {
    Filled,
    Partial,
    Empty,
    Overstaffed,
}

impl FillState {
    fn of(filled: usize, headcount: usize) -> Self {
        if filled == 0 {
            FillState::Empty
        } else if filled < headcount {
            FillState::Partial
        } else if filled == headcount {
            FillState::Filled
        } else {
            FillState::Overstaffed
        }
    }
}

impl fmt::Display for FillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FillState::Filled => "filled",
            FillState::Partial => "partial",
            FillState::Empty => "empty",
            FillState::Overstaffed => "overstaffed",
        })
    }
}

/// One slot's fill state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub slot_id: String,
    pub date: NaiveDate,
    pub role: Role,
    pub headcount: u32,
    /// Assigned employee ids, sorted.
    pub assigned: Vec<String>,
    pub state: FillState,
    /// Skill requirements the assigned employees do not cover.
    pub skill_shortfall: Vec<SkillShortfall>,
}

/// One unmet skill requirement of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillShortfall {
    /// Qualifying skills, e.g. "injector or leader".
    pub skills: String,
    pub required: u32,
    pub held: u32,
}

/// Violations of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationGroup {
    pub kind: ViolationKind,
    pub violations: Vec<ConstraintViolation>,
}

/// Roster quality indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterKpi {
    /// Filled seats / required seats (0.0..1.0).
    pub coverage: f64,
    /// Fewest shifts of any employee.
    pub min_shifts: usize,
    /// Most shifts of any employee.
    pub max_shifts: usize,
    /// `max_shifts - min_shifts`.
    pub fairness_spread: usize,
    /// Mean shifts per employee.
    pub mean_shifts: f64,
    /// (employee, day) pairs with exactly two shifts.
    pub double_shift_days: usize,
}

impl Report {
    /// Whether the schedule has no violations and no open seats.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.unmet_demand.is_empty()
    }

    /// Total violations across all groups.
    pub fn violation_count(&self) -> usize {
        self.violations.iter().map(|g| g.violations.len()).sum()
    }

    /// Violations of one kind.
    pub fn violations_of(&self, kind: ViolationKind) -> &[ConstraintViolation] {
        self.violations
            .iter()
            .find(|g| g.kind == kind)
            .map(|g| g.violations.as_slice())
            .unwrap_or(&[])
    }

    /// Workload of one employee.
    pub fn load_of(&self, employee_id: &str) -> Option<&EmployeeLoad> {
        self.employees.iter().find(|l| l.employee_id == employee_id)
    }
}

/// Assembles a [`Report`] for a problem.
///
/// # Example
///
/// ```
/// use u_roster::config::PolicyDefaults;
/// use u_roster::models::{Employee, PlanningPeriod, Role, Settings, ShiftTemplate};
/// use u_roster::problem::Problem;
/// use u_roster::report::ReportBuilder;
/// use u_roster::solver::{GreedySolver, Solver};
/// use u_roster::validator::ScheduleValidator;
/// use chrono::{NaiveDate, NaiveTime};
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let settings = Settings::new(PlanningPeriod::try_new(day, day).unwrap())
///     .with_template(
///         ShiftTemplate::new(
///             "early",
///             NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
///             NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
///             Role::Nurse,
///         )
///         .with_headcount(2),
///     );
/// let roster = vec![Employee::nurse("A")];
/// let problem = Problem::new(&settings, &roster, &[], &PolicyDefaults::default()).unwrap();
///
/// let solution = GreedySolver::new().solve(&problem);
/// let violations = ScheduleValidator::new().validate(&solution.schedule, &problem);
/// let report = ReportBuilder::new(&problem)
///     .with_solution(&solution)
///     .with_violations(violations)
///     .build();
///
/// assert_eq!(report.summary.seats, 2);
/// assert_eq!(report.summary.filled_seats, 1);
/// assert_eq!(report.unmet_demand.len(), 1);
/// assert!(report.violations.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ReportBuilder<'a> {
    problem: &'a Problem,
    schedule: Schedule,
    violations: Vec<ConstraintViolation>,
    unmet_demand: Vec<UnmetDemand>,
    rejected_pins: Vec<RejectedPin>,
    terminated_early: bool,
}

impl<'a> ReportBuilder<'a> {
    /// Starts a report with an empty schedule.
    pub fn new(problem: &'a Problem) -> Self {
        Self {
            problem,
            schedule: Schedule::new(),
            violations: Vec::new(),
            unmet_demand: Vec::new(),
            rejected_pins: Vec::new(),
            terminated_early: false,
        }
    }

    /// Takes schedule, unmet demand, rejected pins and the early-stop flag
    /// from a solver run.
    pub fn with_solution(mut self, solution: &Solution) -> Self {
        self.schedule = solution.schedule.clone();
        self.unmet_demand = solution.unmet_demand.clone();
        self.rejected_pins = solution.rejected_pins.clone();
        self.terminated_early = solution.terminated_early;
        self
    }

    /// Sets the schedule being reported.
    pub fn with_schedule(mut self, schedule: &Schedule) -> Self {
        self.schedule = schedule.clone();
        self
    }

    /// Sets the violations found in the schedule.
    pub fn with_violations(mut self, violations: Vec<ConstraintViolation>) -> Self {
        self.violations = violations;
        self
    }

    /// Sets the open seats.
    pub fn with_unmet_demand(mut self, unmet: Vec<UnmetDemand>) -> Self {
        self.unmet_demand = unmet;
        self
    }

    /// Builds the report.
    pub fn build(self) -> Report {
        let problem = self.problem;
        let schedule = &self.schedule;
        let weeks = full_weeks(problem.period());

        let employees: Vec<EmployeeLoad> = problem
            .employees()
            .iter()
            .map(|e| {
                let (shifts, hours) = schedule
                    .assignments_for_employee(&e.id)
                    .fold((0, 0.0), |(n, h), a| {
                        (n + 1, h + problem.slot(&a.slot_id).map_or(0.0, |s| s.hours()))
                    });
                let policy = problem.policy(&e.id);
                let cap = policy.and_then(|p| p.max_shifts);
                let minimum = policy.and_then(|p| p.min_shifts);
                let short_weeks = match policy.and_then(|p| p.min_shifts_per_week) {
                    Some(weekly) => weeks_below(schedule, problem, &e.id, &weeks, weekly),
                    None => Vec::new(),
                };
                EmployeeLoad {
                    employee_id: e.id.clone(),
                    name: e.name.clone(),
                    role: e.role.clone(),
                    shifts,
                    hours,
                    cap,
                    minimum,
                    overworked: cap.is_some_and(|c| shifts > c as usize),
                    underworked: minimum.is_some_and(|m| shifts < m as usize)
                        || !short_weeks.is_empty(),
                    short_weeks,
                }
            })
            .collect();

        let mut ordered_slots: Vec<_> = problem.slots().iter().collect();
        ordered_slots.sort_by(|a, b| a.start().cmp(&b.start()).then_with(|| a.id.cmp(&b.id)));
        let slots: Vec<SlotStatus> = ordered_slots
            .into_iter()
            .map(|slot| {
                let mut assigned: Vec<String> = schedule
                    .employees_in_slot(&slot.id)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                assigned.sort();
                let seated: Vec<&Employee> =
                    assigned.iter().filter_map(|id| problem.employee(id)).collect();
                let skill_shortfall = slot
                    .skill_requirements
                    .iter()
                    .filter_map(|req| {
                        let held = seated.iter().filter(|e| req.is_met_by(e)).count() as u32;
                        (held < req.min).then(|| SkillShortfall {
                            skills: req.label(),
                            required: req.min,
                            held,
                        })
                    })
                    .collect();
                SlotStatus {
                    slot_id: slot.id.clone(),
                    date: slot.date,
                    role: slot.role.clone(),
                    headcount: slot.headcount,
                    state: FillState::of(assigned.len(), slot.headcount as usize),
                    assigned,
                    skill_shortfall,
                }
            })
            .collect();

        let seats = problem.total_seats();
        let filled_seats: usize = slots
            .iter()
            .map(|s| s.assigned.len().min(s.headcount as usize))
            .sum();

        let violation_total = self.violations.len();
        let mut by_kind: BTreeMap<ViolationKind, Vec<ConstraintViolation>> = BTreeMap::new();
        for v in self.violations {
            by_kind.entry(v.kind).or_default().push(v);
        }
        let violations = ViolationKind::ALL
            .iter()
            .filter_map(|kind| {
                by_kind.remove(kind).map(|violations| ViolationGroup {
                    kind: *kind,
                    violations,
                })
            })
            .collect();

        let kpi = RosterKpi::calculate(schedule, problem, &employees, filled_seats, seats);

        Report {
            period: problem.period(),
            summary: ReportSummary {
                employees: employees.len(),
                slots: slots.len(),
                seats,
                filled_seats,
                unmet_seats: self.unmet_demand.len(),
                violations: violation_total,
                rejected_pins: self.rejected_pins.len(),
                underworked: employees.iter().filter(|l| l.underworked).count(),
                skill_shortfalls: slots.iter().filter(|s| !s.skill_shortfall.is_empty()).count(),
                terminated_early: self.terminated_early,
            },
            employees,
            slots,
            violations,
            unmet_demand: self.unmet_demand,
            rejected_pins: self.rejected_pins,
            kpi,
        }
    }
}

/// ISO weeks whose Monday through Sunday all lie inside the period.
fn full_weeks(period: PlanningPeriod) -> Vec<IsoWeek> {
    period
        .dates()
        .into_iter()
        .filter(|d| d.weekday() == Weekday::Mon && period.contains(*d + Duration::days(6)))
        .map(|d| d.iso_week())
        .collect()
}

fn weeks_below(
    schedule: &Schedule,
    problem: &Problem,
    employee_id: &str,
    weeks: &[IsoWeek],
    minimum: u32,
) -> Vec<WeekShortfall> {
    weeks
        .iter()
        .filter_map(|week| {
            let shifts = schedule
                .assignments_for_employee(employee_id)
                .filter(|a| problem.slot(&a.slot_id).is_some_and(|s| s.date.iso_week() == *week))
                .count();
            (shifts < minimum as usize).then(|| WeekShortfall {
                week: format!("{}-W{:02}", week.year(), week.week()),
                shifts,
                minimum,
            })
        })
        .collect()
}

impl RosterKpi {
    fn calculate(
        schedule: &Schedule,
        problem: &Problem,
        loads: &[EmployeeLoad],
        filled_seats: usize,
        seats: usize,
    ) -> Self {
        let min_shifts = loads.iter().map(|l| l.shifts).min().unwrap_or(0);
        let max_shifts = loads.iter().map(|l| l.shifts).max().unwrap_or(0);
        let mean_shifts = if loads.is_empty() {
            0.0
        } else {
            loads.iter().map(|l| l.shifts).sum::<usize>() as f64 / loads.len() as f64
        };

        let mut per_day: BTreeMap<(&str, NaiveDate), usize> = BTreeMap::new();
        for a in &schedule.assignments {
            if let Some(slot) = problem.slot(&a.slot_id) {
                *per_day.entry((a.employee_id.as_str(), slot.date)).or_insert(0) += 1;
            }
        }
        let double_shift_days = per_day.values().filter(|&&n| n == 2).count();

        let coverage = if seats == 0 {
            1.0
        } else {
            filled_seats as f64 / seats as f64
        };

        Self {
            coverage,
            min_shifts,
            max_shifts,
            fairness_spread: max_shifts - min_shifts,
            mean_shifts,
            double_shift_days,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "Roster {} .. {}", self.period.start, self.period.end)?;
        writeln!(
            f,
            "  seats: {}/{} filled ({:.1}%), {} unmet",
            s.filled_seats,
            s.seats,
            self.kpi.coverage * 100.0,
            s.unmet_seats
        )?;
        writeln!(
            f,
            "  violations: {}, rejected pins: {}",
            s.violations, s.rejected_pins
        )?;
        writeln!(
            f,
            "  shifts per employee: {}..{} (mean {:.2}), double-shift days: {}",
            self.kpi.min_shifts, self.kpi.max_shifts, self.kpi.mean_shifts, self.kpi.double_shift_days
        )?;
        if s.underworked > 0 || s.skill_shortfalls > 0 {
            writeln!(
                f,
                "  underworked employees: {}, slots short of skills: {}",
                s.underworked, s.skill_shortfalls
            )?;
        }
        if s.terminated_early {
            writeln!(f, "  stopped early: time limit reached")?;
        }

        writeln!(f, "\nEmployees:")?;
        for load in &self.employees {
            let cap = load.cap.map_or_else(|| "-".to_string(), |c| c.to_string());
            let min = load.minimum.map_or_else(|| "-".to_string(), |m| m.to_string());
            let mut flags = String::new();
            if load.overworked {
                flags.push_str("  OVERWORKED");
            }
            if load.underworked {
                flags.push_str("  UNDERWORKED");
            }
            writeln!(
                f,
                "  {:<12} {:<10} {:>3} shifts {:>6.1}h  min {} cap {}{}",
                load.employee_id, load.role, load.shifts, load.hours, min, cap, flags
            )?;
            for week in &load.short_weeks {
                writeln!(
                    f,
                    "    {}: {} of {} shifts",
                    week.week, week.shifts, week.minimum
                )?;
            }
        }

        let open: Vec<_> = self
            .slots
            .iter()
            .filter(|st| st.state != FillState::Filled || !st.skill_shortfall.is_empty())
            .collect();
        if !open.is_empty() {
            writeln!(f, "\nSlots needing attention:")?;
            for st in open {
                let short: Vec<String> = st
                    .skill_shortfall
                    .iter()
                    .map(|sk| format!(" short of {} {}/{}", sk.skills, sk.held, sk.required))
                    .collect();
                writeln!(
                    f,
                    "  {:<24} {}/{} {} [{}]{}",
                    st.slot_id,
                    st.assigned.len(),
                    st.headcount,
                    st.state,
                    st.assigned.join(", "),
                    short.concat()
                )?;
            }
        }

        if !self.violations.is_empty() {
            writeln!(f, "\nViolations:")?;
            for group in &self.violations {
                writeln!(f, "  {} ({})", group.kind, group.violations.len())?;
                for v in &group.violations {
                    writeln!(f, "    {v}")?;
                }
            }
        }

        if !self.unmet_demand.is_empty() {
            writeln!(f, "\nUnmet demand:")?;
            for u in &self.unmet_demand {
                writeln!(f, "  {} seat {} ({}): {}", u.slot_id, u.seat, u.role, u.reason)?;
                for r in &u.rejections {
                    let kinds: Vec<String> = r.violations.iter().map(|v| v.kind.to_string()).collect();
                    writeln!(f, "    {}: {}", r.employee_id, kinds.join(", "))?;
                }
            }
        }

        if !self.rejected_pins.is_empty() {
            writeln!(f, "\nRejected pins:")?;
            for pin in &self.rejected_pins {
                writeln!(f, "  {}", pin.assignment)?;
                for v in &pin.violations {
                    writeln!(f, "    {v}")?;
                }
            }
        }

        Ok(())
    }
}
