//! Input validation for rostering problems.
//!
//! This is the only place malformed external data is rejected. Checks:
//! - Structural well-formedness of every record (non-empty ids,
//!   `start < end`, slot date matching its window, headcount ≥ 1, skill
//!   minimums within headcount, minimums within caps, leave ranges not
//!   inverted)
//! - Duplicate IDs
//! - Leave records and pinned assignments referencing unknown
//!   employees or slots
//! - Explicit slots dated outside the planning period
//!
//! All problems are collected, not just the first.

use std::collections::HashSet;
use thiserror::Error;

use crate::models::{Employee, LeaveRecord, Settings, ShiftSlot};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} in '{entity_id}' ({field}): {message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Offending record.
    pub entity_id: String,
    /// Offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A record is structurally invalid.
    MalformedInput,
    /// Two entities share the same ID.
    DuplicateId,
    /// A record references an employee or slot that doesn't exist.
    UnknownReference,
}

impl ValidationError {
    pub fn new(
        kind: ValidationErrorKind,
        entity_id: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a `MalformedInput` error.
    pub fn malformed(
        entity_id: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ValidationErrorKind::MalformedInput, entity_id, field, message)
    }
}

/// Validates the inputs of a planning run.
///
/// `slots` are the materialized slots (see [`Settings::generate_slots`]).
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(
    settings: &Settings,
    employees: &[Employee],
    slots: &[ShiftSlot],
    leave: &[LeaveRecord],
) -> ValidationResult {
    let mut errors = Vec::new();

    if let Err(e) = settings.period.validate() {
        errors.push(e);
    }

    let mut template_ids = HashSet::new();
    for t in &settings.templates {
        if let Err(e) = t.validate() {
            errors.push(e);
        }
        if !template_ids.insert(t.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                &t.id,
                "id",
                format!("Duplicate template ID: {}", t.id),
            ));
        }
    }

    let mut employee_ids = HashSet::new();
    for e in employees {
        if let Err(err) = e.validate() {
            errors.push(err);
        }
        if !employee_ids.insert(e.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                &e.id,
                "id",
                format!("Duplicate employee ID: {}", e.id),
            ));
        }
    }

    let mut slot_ids = HashSet::new();
    for s in slots {
        if let Err(err) = s.validate() {
            errors.push(err);
        }
        if !slot_ids.insert(s.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                &s.id,
                "id",
                format!("Duplicate slot ID: {}", s.id),
            ));
        }
    }

    for s in &settings.slots {
        if !settings.period.contains(s.date) {
            errors.push(ValidationError::malformed(
                &s.id,
                "date",
                format!(
                    "Slot date {} is outside the period {}..={}",
                    s.date, settings.period.start, settings.period.end
                ),
            ));
        }
    }

    for l in leave {
        if let Err(err) = l.validate() {
            errors.push(err);
        }
        if !employee_ids.contains(l.employee_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReference,
                &l.employee_id,
                "employee_id",
                format!("Leave record references unknown employee '{}'", l.employee_id),
            ));
        }
    }

    for p in &settings.pinned {
        if !employee_ids.contains(p.employee_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReference,
                &p.employee_id,
                "employee_id",
                format!("Pinned assignment references unknown employee '{}'", p.employee_id),
            ));
        }
        if !slot_ids.contains(p.slot_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReference,
                &p.slot_id,
                "slot_id",
                format!("Pinned assignment references unknown slot '{}'", p.slot_id),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
