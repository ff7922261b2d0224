//! Boundary operations.
//!
//! [`RosterEngine`] ties configuration, a solver, the validator and the
//! report builder together behind three operations:
//!
//! - [`generate_schedule`](RosterEngine::generate_schedule): build a roster
//! - [`validate_schedule`](RosterEngine::validate_schedule): check a roster
//! - [`explain_slot`](RosterEngine::explain_slot): why each employee can or
//!   cannot take a slot
//!
//! The free functions of the same names run a default-configured engine.
//!
//! # Example
//!
//! ```
//! use u_roster::engine::generate_schedule;
//! use u_roster::models::{Employee, PlanningPeriod, Role, Settings, ShiftTemplate};
//! use chrono::{NaiveDate, NaiveTime};
//!
//! let period = PlanningPeriod::try_new(
//!     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
//! ).unwrap();
//! let settings = Settings::new(period).with_template(ShiftTemplate::new(
//!     "day",
//!     NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
//!     NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
//!     Role::Nurse,
//! ));
//! let roster = vec![Employee::nurse("A"), Employee::nurse("B")];
//!
//! let (schedule, report) = generate_schedule(&settings, &roster, &[]).unwrap();
//! assert_eq!(schedule.assignment_count(), 7);
//! assert!(report.is_clean());
//! ```

use tracing::info;

use crate::config::{RosterConfig, SolverStrategy};
use crate::constraints::{ConstraintEvaluator, EvaluationMode};
use crate::error::{Result, RosterError};
use crate::models::{Assignment, ConstraintViolation, Employee, LeaveRecord, Schedule, Settings};
use crate::problem::Problem;
use crate::report::{Report, ReportBuilder};
use crate::solver::{GreedySolver, Solver};
use crate::validator::ScheduleValidator;

/// Configured rostering engine.
#[derive(Debug)]
pub struct RosterEngine {
    config: RosterConfig,
    solver: Box<dyn Solver>,
    evaluator: ConstraintEvaluator,
}

impl RosterEngine {
    /// Creates an engine for `config`, choosing the solver it names.
    pub fn new(config: RosterConfig) -> Self {
        let evaluator = ConstraintEvaluator::standard();
        let solver: Box<dyn Solver> = match config.solver.strategy {
            SolverStrategy::Greedy => {
                let mut greedy = GreedySolver::new().with_evaluator(evaluator.clone());
                if let Some(limit) = config.time_limit() {
                    greedy = greedy.with_time_limit(limit);
                }
                Box::new(greedy)
            }
        };
        Self {
            config,
            solver,
            evaluator,
        }
    }

    /// Creates an engine from a TOML configuration file.
    pub fn from_config_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(RosterConfig::load(path)?))
    }

    /// Replaces the solver.
    pub fn with_solver(mut self, solver: impl Solver + 'static) -> Self {
        self.solver = Box::new(solver);
        self
    }

    /// Replaces the rules used for validation and explanation.
    pub fn with_evaluator(mut self, evaluator: ConstraintEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    /// Builds the problem snapshot for one run.
    pub fn problem(
        &self,
        settings: &Settings,
        roster: &[Employee],
        leave: &[LeaveRecord],
    ) -> Result<Problem> {
        Problem::new(settings, roster, leave, &self.config.defaults)
    }

    /// Generates a schedule and its report.
    ///
    /// Unfilled seats and rejected pins are reported, not returned as errors.
    ///
    /// # Errors
    /// Invalid input, an empty roster, or a period without slots.
    pub fn generate_schedule(
        &self,
        settings: &Settings,
        roster: &[Employee],
        leave: &[LeaveRecord],
    ) -> Result<(Schedule, Report)> {
        let problem = self.problem(settings, roster, leave)?;
        let solution = self.solver.solve(&problem);
        let violations = self.validator().validate(&solution.schedule, &problem);
        if !violations.is_empty() {
            info!(
                event = "generated_with_violations",
                solver = self.solver.name(),
                violations = violations.len(),
            );
        }

        let report = ReportBuilder::new(&problem)
            .with_solution(&solution)
            .with_violations(violations)
            .build();
        Ok((solution.schedule, report))
    }

    /// Validates an existing schedule.
    ///
    /// Empty seats are reported as unassigned demand.
    pub fn validate_schedule(
        &self,
        schedule: &Schedule,
        settings: &Settings,
        roster: &[Employee],
        leave: &[LeaveRecord],
    ) -> Result<Report> {
        let problem = self.problem(settings, roster, leave)?;
        let validator = self.validator();
        let violations = validator.validate(schedule, &problem);
        let unmet = validator.unfilled_seats(schedule, &problem);

        Ok(ReportBuilder::new(&problem)
            .with_schedule(schedule)
            .with_violations(violations)
            .with_unmet_demand(unmet)
            .build())
    }

    /// Lists what would go wrong if each employee not yet in the slot
    /// were added to it, given the rest of `schedule`.
    ///
    /// Candidates that would be accepted contribute nothing, so an empty
    /// result means every remaining employee could take the slot.
    ///
    /// # Errors
    /// [`RosterError::UnknownSlot`] if `slot_id` names no slot.
    pub fn explain_slot(
        &self,
        slot_id: &str,
        schedule: &Schedule,
        settings: &Settings,
        roster: &[Employee],
        leave: &[LeaveRecord],
    ) -> Result<Vec<ConstraintViolation>> {
        let problem = self.problem(settings, roster, leave)?;
        if problem.slot(slot_id).is_none() {
            return Err(RosterError::UnknownSlot(slot_id.to_string()));
        }

        let seated = schedule.employees_in_slot(slot_id);
        Ok(problem
            .employees()
            .iter()
            .filter(|e| !seated.contains(&e.id.as_str()))
            .flat_map(|e| {
                self.evaluator.evaluate(
                    &Assignment::new(&e.id, slot_id),
                    schedule,
                    &problem,
                    EvaluationMode::Accumulate,
                )
            })
            .collect())
    }

    fn validator(&self) -> ScheduleValidator {
        ScheduleValidator::new().with_evaluator(self.evaluator.clone())
    }
}

impl Default for RosterEngine {
    fn default() -> Self {
        Self::new(RosterConfig::default())
    }
}

/// Generates a schedule with the default configuration.
pub fn generate_schedule(
    settings: &Settings,
    roster: &[Employee],
    leave: &[LeaveRecord],
) -> Result<(Schedule, Report)> {
    RosterEngine::default().generate_schedule(settings, roster, leave)
}

/// Validates a schedule with the default configuration.
pub fn validate_schedule(
    schedule: &Schedule,
    settings: &Settings,
    roster: &[Employee],
    leave: &[LeaveRecord],
) -> Result<Report> {
    RosterEngine::default().validate_schedule(schedule, settings, roster, leave)
}

/// Explains a slot with the default configuration.
pub fn explain_slot(
    slot_id: &str,
    schedule: &Schedule,
    settings: &Settings,
    roster: &[Employee],
    leave: &[LeaveRecord],
) -> Result<Vec<ConstraintViolation>> {
    RosterEngine::default().explain_slot(slot_id, schedule, settings, roster, leave)
}
