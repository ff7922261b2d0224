//! Leave and unavailability records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// A leave request covering an inclusive date range.
///
/// Only [`LeaveStatus::Approved`] records constrain scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRecord {
    /// Employee on leave.
    pub employee_id: String,
    /// First day of leave (inclusive).
    pub start: NaiveDate,
    /// Last day of leave (inclusive).
    pub end: NaiveDate,
    /// Approval state.
    pub status: LeaveStatus,
    /// Free-form reason. Never interpreted.
    #[serde(default)]
    pub reason: String,
}

/// Approval state of a leave record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LeaveStatus {
    Approved,
    #[default]
    Pending,
    Rejected,
}

impl LeaveRecord {
    /// Creates an approved leave record.
    pub fn approved(employee_id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            employee_id: employee_id.into(),
            start,
            end,
            status: LeaveStatus::Approved,
            reason: String::new(),
        }
    }

    /// Creates a single-day approved leave record.
    pub fn day(employee_id: impl Into<String>, date: NaiveDate) -> Self {
        Self::approved(employee_id, date, date)
    }

    /// Creates a leave record, rejecting an inverted date range.
    pub fn try_new(
        employee_id: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        status: LeaveStatus,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            status,
            ..Self::approved(employee_id, start, end)
        };
        record.validate()?;
        Ok(record)
    }

    /// Sets the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: LeaveStatus) -> Self {
        self.status = status;
        self
    }

    #[inline]
    pub fn is_approved(&self) -> bool {
        self.status == LeaveStatus::Approved
    }

    /// Whether `date` falls inside the leave range.
    #[inline]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Checks structural well-formedness.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.employee_id.trim().is_empty() {
            return Err(ValidationError::malformed(
                &self.employee_id,
                "employee_id",
                "leave record has no employee",
            ));
        }
        if self.start > self.end {
            return Err(ValidationError::malformed(
                &self.employee_id,
                "end",
                format!("leave ends ({}) before it starts ({})", self.end, self.start),
            ));
        }
        Ok(())
    }
}
