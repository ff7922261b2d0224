//! Clinic staff rostering engine.
//!
//! Assigns employees to shift slots over a planning period, respecting
//! role eligibility, approved leave, weekly availability, skill mix,
//! workload caps, days off and minimum rest, and explains precisely why any
//! seat stays open.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Employee`, `ShiftTemplate`, `ShiftSlot`,
//!   `LeaveRecord`, `Settings`, `Schedule`, `Assignment`, `ConstraintViolation`
//! - **`validation`**: Input integrity checks (malformed records, duplicate IDs,
//!   unknown references)
//! - **`problem`**: Validated, indexed snapshot of one run's inputs
//! - **`constraints`**: Scheduling rules and the evaluator that runs them
//! - **`solver`**: Assignment strategies (greedy) and candidate ranking
//! - **`validator`**: Whole-schedule checks
//! - **`report`**: Diagnostics and quality indicators
//! - **`engine`**: Boundary operations (`generate_schedule`,
//!   `validate_schedule`, `explain_slot`)
//! - **`config`**: TOML-backed engine configuration
//!
//! # Architecture
//!
//! Every run builds its own immutable `Problem`; the solver, evaluator and
//! validator only read from it. There is no global state and no I/O outside
//! configuration loading. Logging goes through `tracing`; installing a
//! subscriber is left to the caller.

pub mod config;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod models;
pub mod problem;
pub mod report;
pub mod solver;
pub mod validation;
pub mod validator;

pub use engine::{explain_slot, generate_schedule, validate_schedule, RosterEngine};
pub use error::RosterError;
