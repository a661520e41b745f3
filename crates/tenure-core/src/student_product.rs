//! # StudentProduct: One Entitlement Interval
//!
//! A StudentProduct row records that a student holds a product over a
//! contiguous date interval. Rows for the same entitlement form a chain:
//!
//! ```text
//!   root ──updated_to──▶ segment 2 ──updated_to──▶ segment 3 (tail)
//!        ◀─updated_from─            ◀─updated_from─
//! ```
//!
//! Every non-root row carries `root_student_product_id` so the whole
//! history can be fetched with one query. Rows are linked by identifier,
//! never by reference, so each request can load and lock the rows it needs.
//!
//! ## Invariants
//!
//! - At most one row per chain has no `updated_to` link (the tail).
//! - Consecutive segments are contiguous: the successor starts the day
//!   after its predecessor ends.
//! - `version_number` grows by one per persisted mutation.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identity::{LocationId, ProductId, StudentId, StudentProductId};

// ─── Status ─────────────────────────────────────────────────────────

/// Whether an interval is commercially active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// The interval is ordered and billable.
    Ordered,
    /// The interval was cancelled or voided.
    Cancelled,
}

impl ProductStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ordered => "ORDERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDERED" => Ok(Self::Ordered),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

// ─── Label ──────────────────────────────────────────────────────────

/// Lifecycle stage of a StudentProduct row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentProductLabel {
    /// Freshly created segment with no pending change.
    Created,
    /// Changed in place (one-time update, cancel on day one).
    Updated,
    /// Split: a successor segment takes over after this one's end date.
    UpdateScheduled,
    /// Withdrawal pending at the end date.
    WithdrawalScheduled,
    /// Graduation pending at the end date.
    GraduationScheduled,
    /// Leave of absence pending at the end date.
    PauseScheduled,
    /// Leave of absence in effect.
    Paused,
}

impl StudentProductLabel {
    /// All labels, in declaration order.
    pub const ALL: [StudentProductLabel; 7] = [
        Self::Created,
        Self::Updated,
        Self::UpdateScheduled,
        Self::WithdrawalScheduled,
        Self::GraduationScheduled,
        Self::PauseScheduled,
        Self::Paused,
    ];

    /// Wire name of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::UpdateScheduled => "UPDATE_SCHEDULED",
            Self::WithdrawalScheduled => "WITHDRAWAL_SCHEDULED",
            Self::GraduationScheduled => "GRADUATION_SCHEDULED",
            Self::PauseScheduled => "PAUSE_SCHEDULED",
            Self::Paused => "PAUSED",
        }
    }
}

impl std::fmt::Display for StudentProductLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentProductLabel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| CoreError::UnknownLabel(s.to_string()))
    }
}

// ─── StudentProduct ─────────────────────────────────────────────────

/// One contiguous interval of a student's entitlement to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProduct {
    /// Immutable row identifier.
    pub student_product_id: StudentProductId,
    /// Owning student.
    pub student_id: StudentId,
    /// Product held.
    pub product_id: ProductId,
    /// Location the order was placed at.
    pub location_id: LocationId,
    /// First day of the interval (inclusive). Unset while pending or voided.
    pub start_date: Option<NaiveDate>,
    /// Last day of the interval (inclusive). Unset while pending or voided.
    pub end_date: Option<NaiveDate>,
    /// Commercial status.
    pub product_status: ProductStatus,
    /// Lifecycle stage.
    pub label: StudentProductLabel,
    /// Predecessor in time.
    pub updated_from_student_product_id: Option<StudentProductId>,
    /// Successor in time.
    pub updated_to_student_product_id: Option<StudentProductId>,
    /// First row of the chain. Unset on the root itself.
    pub root_student_product_id: Option<StudentProductId>,
    /// Optimistic-concurrency token.
    pub version_number: u32,
    /// Copied from the product at creation.
    pub is_unique: bool,
    /// Whether this row is a bundled component of a package.
    pub is_associated: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl StudentProduct {
    /// The chain's grouping key: the root link if set, else this row's id.
    pub fn root_id(&self) -> StudentProductId {
        self.root_student_product_id
            .unwrap_or(self.student_product_id)
    }

    /// Whether the row is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.product_status == ProductStatus::Cancelled
    }

    /// Whether the row is the open tail of its chain.
    pub fn is_tail(&self) -> bool {
        self.updated_to_student_product_id.is_none()
    }

    /// Whether the row was voided at creation: cancelled, never linked, no dates.
    pub fn is_voided(&self) -> bool {
        self.is_cancelled() && self.end_date.is_none()
    }

    /// Whether `date` falls inside `[start_date, end_date]`.
    ///
    /// Rows missing either date contain no day.
    pub fn covers(&self, date: NaiveDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}

// ─── StudentAssociatedProduct ───────────────────────────────────────

/// Edge from a package's StudentProduct to one of its bundled components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentAssociatedProduct {
    /// The package's StudentProduct.
    pub student_product_id: StudentProductId,
    /// The component's StudentProduct.
    pub associated_product_id: StudentProductId,
}
