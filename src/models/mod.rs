//! Rostering domain models.
//!
//! Provides the core data types for describing a staffing problem
//! (employees, shift slots, leave, settings) and its solution (schedule,
//! assignments). Constraint violations are diagnostic values, never
//! persisted domain state.
//!
//! # Input lifecycle
//!
//! | Type | Origin | Mutability during a run |
//! |------|--------|-------------------------|
//! | Employee | Roster import | Immutable |
//! | ShiftSlot | Templates × period dates, or explicit | Immutable |
//! | LeaveRecord | Leave import | Immutable |
//! | Schedule | Solver output, or externally edited | Owned by the run |

mod employee;
mod leave;
mod schedule;
mod settings;
mod shift;

pub use employee::{Employee, Role};
pub use leave::{LeaveRecord, LeaveStatus};
pub use schedule::{Assignment, ConstraintViolation, Schedule, ViolationKind};
pub use settings::{PlanningPeriod, RoleDefaults, Settings};
pub use shift::{ShiftSlot, ShiftTemplate, SkillRequirement, TimeWindow};
