//! # Lifecycle Engine
//!
//! [`LifecycleEngine`] holds what every operation shares: the calendar
//! that turns instants into dates, the clock, and the configuration. It
//! holds no records. Every operation takes the caller's transaction
//! handle as its first argument and issues all of its reads and writes
//! through it, so a multi-row mutation commits or rolls back as one unit
//! with the caller's transaction.
//!
//! The operations themselves are spread over sibling modules:
//!
//! - [`crate::lifecycle`]: create, update, cancel, withdraw, graduate,
//!   leave of absence, resume, revert, pause
//! - [`crate::void`]: undoing an order
//! - [`crate::chain`]: resolving a chain to its current record
//! - [`crate::association`]: package bundling
//! - [`crate::uniqueness`]: unique-product enforcement
//! - [`crate::dispatch`]: routing an order item to one of the above

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use tenure_core::{
    BillingScheduleId, BusinessCalendar, Clock, Product, StudentProduct, StudentProductId,
    SystemClock,
};
use tenure_store::RecordStore;

use crate::config::EngineConfig;
use crate::error::LifecycleError;
use crate::metrics;
use crate::version::check_version;

/// Result of a mutation that may rewrite a predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mutation {
    /// The row produced or modified: the new tail after a split, otherwise
    /// the modified row itself.
    pub student_product: StudentProduct,
    /// The predecessor rewritten by a split or resume, if any.
    pub predecessor: Option<StudentProduct>,
}

impl Mutation {
    pub(crate) fn single(student_product: StudentProduct) -> Self {
        Self {
            student_product,
            predecessor: None,
        }
    }

    pub(crate) fn chained(student_product: StudentProduct, predecessor: StudentProduct) -> Self {
        Self {
            student_product,
            predecessor: Some(predecessor),
        }
    }
}

/// The student-product lifecycle engine.
pub struct LifecycleEngine {
    config: EngineConfig,
    calendar: BusinessCalendar,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("config", &self.config)
            .field("calendar", &self.calendar)
            .finish_non_exhaustive()
    }
}

impl LifecycleEngine {
    /// Build an engine from a validated configuration.
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, LifecycleError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(LifecycleError::Config(errors.join("; ")));
        }
        let calendar = config.calendar()?;
        Ok(Self {
            config,
            calendar,
            clock,
        })
    }

    /// Build an engine reading the system clock.
    pub fn with_system_clock(config: EngineConfig) -> Result<Self, LifecycleError> {
        Self::new(config, Arc::new(SystemClock))
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine's calendar.
    pub fn calendar(&self) -> BusinessCalendar {
        self.calendar
    }

    /// Today in the operational timezone.
    pub fn today(&self) -> NaiveDate {
        self.calendar.today(self.clock.as_ref())
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Shared steps ─────────────────────────────────────────────────

    /// Lock `id` and check the caller's version against it.
    pub(crate) fn lock_checked<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        id: StudentProductId,
        expected: u32,
    ) -> Result<StudentProduct, LifecycleError> {
        let row = store.get_student_product_for_update(id)?;
        check_version(&row, expected)?;
        Ok(row)
    }

    /// Write `row` back over the version it was read at.
    pub(crate) fn persist<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        row: &StudentProduct,
        expected: u32,
    ) -> Result<StudentProduct, LifecycleError> {
        Ok(store.update_student_product_with_version(row, expected)?)
    }

    /// End date of the latest period of the product's billing schedule.
    pub(crate) fn latest_period_end<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        product: &Product,
    ) -> Result<NaiveDate, LifecycleError> {
        let schedule = schedule_of(product)?;
        Ok(store.latest_billing_period(schedule)?.end_date)
    }

    /// Log and count a rejected request, handing the error back.
    pub(crate) fn rejected(&self, operation: &'static str, err: LifecycleError) -> LifecycleError {
        tracing::warn!(operation, code = ?err.code(), error = %err, "student product request rejected");
        metrics::record_rejection(operation, err.kind());
        err
    }
}

/// The product's billing schedule, required for recurring operations.
pub(crate) fn schedule_of(product: &Product) -> Result<&BillingScheduleId, LifecycleError> {
    product.billing_schedule_id.as_ref().ok_or_else(|| {
        LifecycleError::precondition(format!(
            "product {} has no billing schedule",
            product.product_id
        ))
    })
}
