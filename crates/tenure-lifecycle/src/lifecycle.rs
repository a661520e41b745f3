//! # Lifecycle Mutations
//!
//! Effective-dated mutations of a student's entitlement chain.
//!
//! ## Split
//!
//! Update and cancel orders split the current record at the effective date:
//!
//! ```text
//! before:  [start ─────────────────────────── end]  CREATED
//! after:   [start ── effective-1] ──▶ [effective ── end]
//!           UPDATE_SCHEDULED           CREATED (ORDERED or CANCELLED)
//! ```
//!
//! The predecessor keeps its identifier and gains a forward link; the
//! successor is a fresh row carrying the chain's root. Both writes go
//! through the caller's transaction, the predecessor as a compare-and-swap
//! on the version the caller observed.
//!
//! ## Deferred mutations
//!
//! Withdrawal, graduation and leave of absence do not split. They label the
//! record `*_SCHEDULED` and move its end date to the day after the
//! effective date.
//!
//! ## Revert
//!
//! A pending split is undone by restoring the predecessor's label, end date
//! and forward link and cancelling the successor. A new update against an
//! `UPDATE_SCHEDULED` record reverts first, so the chain never carries two
//! pending branches.

use chrono::NaiveDate;

use tenure_core::{
    day_after, day_before, OrderItemData, Product, ProductStatus, ProductType, StudentProduct,
    StudentProductId, StudentProductLabel,
};
use tenure_store::RecordStore;

use crate::engine::{LifecycleEngine, Mutation};
use crate::error::LifecycleError;
use crate::metrics;
use crate::version::check_version;

/// The rows touched by a revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reverted {
    /// The restored predecessor, again the open tail of its chain.
    pub predecessor: StudentProduct,
    /// The cancelled former successor.
    pub successor: StudentProduct,
}

/// How the effective date may relate to the record's start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartBound {
    /// The effective date must fall after the start date.
    After,
    /// The effective date may equal the start date.
    OnOrAfter,
}

impl LifecycleEngine {
    // ─── Create ──────────────────────────────────────────────────────

    /// Create the first record of a new chain for an order item.
    ///
    /// One-time packages take the package's fixed window; other one-time
    /// products are undated. Recurring products start on the item's start
    /// date and run to the end of the latest billing period.
    #[tracing::instrument(skip_all, fields(student_id = %item.student_id, product_id = %item.product.product_id))]
    pub fn create_student_product<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<StudentProduct, LifecycleError> {
        self.create_inner(store, item)
            .map_err(|e| self.rejected("create", e))
    }

    fn create_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<StudentProduct, LifecycleError> {
        let (start_date, end_date) = self.initial_interval(store, item)?;
        if self.config().enforce_unique_products {
            self.check_unique(store, item, start_date)?;
        }

        let now = self.now();
        let row = StudentProduct {
            student_product_id: StudentProductId::new(),
            student_id: item.student_id.clone(),
            product_id: item.product.product_id.clone(),
            location_id: item.location_id.clone(),
            start_date,
            end_date,
            product_status: ProductStatus::Ordered,
            label: StudentProductLabel::Created,
            updated_from_student_product_id: None,
            updated_to_student_product_id: None,
            root_student_product_id: None,
            version_number: 0,
            is_unique: item.product.is_unique,
            is_associated: item.is_associated(),
            created_at: now,
            updated_at: now,
        };
        store.create_student_product(&row)?;

        tracing::debug!(student_product_id = %row.student_product_id, ?start_date, ?end_date, "student product created");
        metrics::record_mutation("create");
        Ok(row)
    }

    /// Start and end dates for a freshly created record.
    fn initial_interval<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        item: &OrderItemData,
    ) -> Result<(Option<NaiveDate>, Option<NaiveDate>), LifecycleError> {
        if item.is_one_time_product() {
            if item.product.product_type != ProductType::Package {
                return Ok((None, None));
            }
            let package = store.package(&item.product.product_id)?;
            return Ok((
                Some(package.package_start_date),
                Some(package.package_end_date),
            ));
        }
        let start = item
            .start_date
            .ok_or_else(|| LifecycleError::precondition("missing start date of order item"))?;
        let end = self.latest_period_end(store, &item.product)?;
        Ok((Some(start), Some(end)))
    }

    // ─── Update ──────────────────────────────────────────────────────

    /// Split the targeted record at the item's effective date.
    ///
    /// One-time products are relabelled `UPDATED` without a split. A record
    /// already carrying a pending update is reverted first.
    #[tracing::instrument(skip_all, fields(student_product_id = ?item.student_product_id))]
    pub fn mutate_for_update_order<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<Mutation, LifecycleError> {
        self.update_inner(store, item)
            .map_err(|e| self.rejected("update", e))
    }

    fn update_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<Mutation, LifecycleError> {
        let id = target_id(item, "updating")?;
        let expected = item.student_product_version;
        let mut current = self.lock_checked(store, id, expected)?;

        if item.is_one_time_product() {
            current.label = StudentProductLabel::Updated;
            current.updated_at = self.now();
            let persisted = self.persist(store, &current, expected)?;
            metrics::record_mutation("update");
            return Ok(Mutation::single(persisted));
        }

        let effective = self.check_effective_date(item, &current, StartBound::After)?;
        match current.label {
            StudentProductLabel::WithdrawalScheduled
            | StudentProductLabel::GraduationScheduled
            | StudentProductLabel::Paused => return Err(pending_order(&current)),
            StudentProductLabel::UpdateScheduled => {
                self.revert_in_place(store, &mut current, &item.product)?;
            }
            _ => {}
        }

        let status = if item.cancellation_date.is_some() {
            ProductStatus::Cancelled
        } else {
            ProductStatus::Ordered
        };
        let mutation = self.split(
            store,
            current,
            expected,
            item,
            effective,
            SuccessorEnd::Inherit(status),
        )?;
        metrics::record_mutation("update");
        Ok(mutation)
    }

    // ─── Cancel ──────────────────────────────────────────────────────

    /// Cancel the targeted record from the item's effective date.
    ///
    /// Cancelling on the record's first day cancels it in place. Any later
    /// date splits it, with the successor created already cancelled.
    #[tracing::instrument(skip_all, fields(student_product_id = ?item.student_product_id))]
    pub fn mutate_for_cancel_order<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<Mutation, LifecycleError> {
        self.cancel_inner(store, item)
            .map_err(|e| self.rejected("cancel", e))
    }

    fn cancel_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<Mutation, LifecycleError> {
        let id = target_id(item, "cancelling")?;
        let expected = item.student_product_version;
        let mut current = self.lock_checked(store, id, expected)?;

        if item.is_one_time_product() {
            current.label = StudentProductLabel::Updated;
            current.product_status = ProductStatus::Cancelled;
            if item.product.product_type == ProductType::Package {
                current.end_date = Some(self.today());
            }
            current.updated_at = self.now();
            let persisted = self.persist(store, &current, expected)?;
            metrics::record_mutation("cancel");
            return Ok(Mutation::single(persisted));
        }

        let effective = self.check_effective_date(item, &current, StartBound::OnOrAfter)?;
        match current.label {
            StudentProductLabel::WithdrawalScheduled | StudentProductLabel::GraduationScheduled => {
                return Err(pending_order(&current))
            }
            StudentProductLabel::UpdateScheduled => {
                self.revert_in_place(store, &mut current, &item.product)?;
            }
            _ => {}
        }

        if current.start_date == Some(effective) {
            current.product_status = ProductStatus::Cancelled;
            current.end_date = Some(effective);
            current.label = StudentProductLabel::Updated;
            current.updated_at = self.now();
            let persisted = self.persist(store, &current, expected)?;
            tracing::debug!(student_product_id = %persisted.student_product_id, %effective, "cancelled in place");
            metrics::record_mutation("cancel");
            return Ok(Mutation::single(persisted));
        }

        let mutation = self.split(
            store,
            current,
            expected,
            item,
            effective,
            SuccessorEnd::EffectiveDate,
        )?;
        metrics::record_mutation("cancel");
        Ok(mutation)
    }

    // ─── Split ───────────────────────────────────────────────────────

    fn split<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        mut current: StudentProduct,
        expected: u32,
        item: &OrderItemData,
        effective: NaiveDate,
        successor_end: SuccessorEnd,
    ) -> Result<Mutation, LifecycleError> {
        let now = self.now();
        let successor_id = StudentProductId::new();

        let (end_date, product_status) = match successor_end {
            SuccessorEnd::Inherit(status) => (current.end_date, status),
            SuccessorEnd::EffectiveDate => (Some(effective), ProductStatus::Cancelled),
        };
        let successor = StudentProduct {
            student_product_id: successor_id,
            start_date: Some(effective),
            end_date,
            product_status,
            label: StudentProductLabel::Created,
            updated_from_student_product_id: Some(current.student_product_id),
            updated_to_student_product_id: None,
            root_student_product_id: Some(current.root_id()),
            version_number: 0,
            is_associated: item.is_associated(),
            created_at: now,
            updated_at: now,
            ..current.clone()
        };

        current.end_date = Some(day_before(effective));
        current.label = StudentProductLabel::UpdateScheduled;
        current.updated_to_student_product_id = Some(successor_id);
        current.updated_at = now;

        store.create_student_product(&successor)?;
        let predecessor = self.persist(store, &current, expected)?;

        tracing::debug!(
            predecessor = %predecessor.student_product_id,
            successor = %successor.student_product_id,
            %effective,
            status = %successor.product_status,
            "student product split"
        );
        Ok(Mutation::chained(successor, predecessor))
    }

    // ─── Withdrawal / Graduation ─────────────────────────────────────

    /// Schedule a withdrawal at the item's effective date.
    #[tracing::instrument(skip_all, fields(student_product_id = ?item.student_product_id))]
    pub fn mutate_for_withdrawal_order<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<StudentProduct, LifecycleError> {
        self.schedule_termination(store, item, StudentProductLabel::WithdrawalScheduled)
            .map_err(|e| self.rejected("withdraw", e))
    }

    /// Schedule a graduation at the item's effective date.
    #[tracing::instrument(skip_all, fields(student_product_id = ?item.student_product_id))]
    pub fn mutate_for_graduate_order<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<StudentProduct, LifecycleError> {
        self.schedule_termination(store, item, StudentProductLabel::GraduationScheduled)
            .map_err(|e| self.rejected("graduate", e))
    }

    fn schedule_termination<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
        label: StudentProductLabel,
    ) -> Result<StudentProduct, LifecycleError> {
        let what = match label {
            StudentProductLabel::GraduationScheduled => "graduate",
            _ => "withdraw",
        };
        if item.is_one_time_product() {
            return Err(LifecycleError::Unsupported(format!(
                "{what} order for one-time product {} is unimplemented",
                item.product.product_id
            )));
        }
        let id = target_id(item, what)?;
        let expected = item.student_product_version;
        let mut current = self.lock_checked(store, id, expected)?;
        let effective = self.check_effective_date(item, &current, StartBound::OnOrAfter)?;
        if matches!(
            current.label,
            StudentProductLabel::UpdateScheduled
                | StudentProductLabel::WithdrawalScheduled
                | StudentProductLabel::GraduationScheduled
        ) {
            return Err(pending_order(&current));
        }

        current.label = label;
        current.end_date = Some(day_after(effective));
        current.updated_at = self.now();
        let persisted = self.persist(store, &current, expected)?;

        tracing::debug!(student_product_id = %persisted.student_product_id, %label, %effective, "termination scheduled");
        metrics::record_mutation(what);
        Ok(persisted)
    }

    // ─── Leave of Absence ────────────────────────────────────────────

    /// Schedule a leave of absence.
    ///
    /// The leave runs from the item's start date to its end date. The
    /// record's end date moves to the day after the effective date, which
    /// defaults to the leave's start.
    #[tracing::instrument(skip_all, fields(student_product_id = ?item.student_product_id))]
    pub fn mutate_for_loa_order<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<StudentProduct, LifecycleError> {
        self.loa_inner(store, item)
            .map_err(|e| self.rejected("loa", e))
    }

    fn loa_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<StudentProduct, LifecycleError> {
        if item.is_one_time_product() {
            return Err(LifecycleError::Unsupported(format!(
                "LOA order for one-time product {} is unimplemented",
                item.product.product_id
            )));
        }
        let id = target_id(item, "pausing")?;
        let expected = item.student_product_version;
        let mut current = store.get_student_product_for_update(id)?;
        if current.label == StudentProductLabel::UpdateScheduled {
            return Err(pending_order(&current));
        }
        check_version(&current, expected)?;
        let leave_start = self.check_loa_duration(item, &current)?;
        let effective = item.effective_date.unwrap_or(leave_start);

        current.label = StudentProductLabel::PauseScheduled;
        current.end_date = Some(day_after(effective));
        current.updated_at = self.now();
        let persisted = self.persist(store, &current, expected)?;

        tracing::debug!(student_product_id = %persisted.student_product_id, %leave_start, "leave of absence scheduled");
        metrics::record_mutation("loa");
        Ok(persisted)
    }

    /// Mark a record whose scheduled leave has begun as `PAUSED`.
    #[tracing::instrument(skip_all, fields(student_product_id = %student_product_id))]
    pub fn pause_student_product<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        student_product_id: StudentProductId,
    ) -> Result<StudentProduct, LifecycleError> {
        let row = self
            .pause_inner(store, student_product_id)
            .map_err(|e| self.rejected("pause", e))?;
        metrics::record_mutation("pause");
        Ok(row)
    }

    fn pause_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        student_product_id: StudentProductId,
    ) -> Result<StudentProduct, LifecycleError> {
        let mut row = store.get_student_product_for_update(student_product_id)?;
        if row.label != StudentProductLabel::PauseScheduled {
            return Err(LifecycleError::precondition(format!(
                "{student_product_id} has no scheduled leave of absence (label {})",
                row.label
            )));
        }
        let expected = row.version_number;
        row.label = StudentProductLabel::Paused;
        row.updated_at = self.now();
        self.persist(store, &row, expected)
    }

    // ─── Resume ──────────────────────────────────────────────────────

    /// Start a new record chained after a paused one.
    #[tracing::instrument(skip_all, fields(student_product_id = ?item.student_product_id))]
    pub fn mutate_for_resume_order<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<Mutation, LifecycleError> {
        self.resume_inner(store, item)
            .map_err(|e| self.rejected("resume", e))
    }

    fn resume_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<Mutation, LifecycleError> {
        if item.is_one_time_product() {
            return Err(LifecycleError::Unsupported(format!(
                "resume order for one-time product {} is unimplemented",
                item.product.product_id
            )));
        }
        let id = target_id(item, "resuming")?;
        let expected = item.student_product_version;
        let mut paused = self.lock_checked(store, id, expected)?;
        if !matches!(
            paused.label,
            StudentProductLabel::Paused | StudentProductLabel::PauseScheduled
        ) {
            return Err(LifecycleError::precondition(format!(
                "{id} is not on leave of absence (label {})",
                paused.label
            )));
        }
        if let Some(next) = paused.updated_to_student_product_id {
            return Err(LifecycleError::precondition(format!(
                "{id} was already resumed as {next}"
            )));
        }

        let (start_date, end_date) = self.initial_interval(store, item)?;
        if self.config().enforce_unique_products {
            self.check_unique(store, item, start_date)?;
        }

        let now = self.now();
        let resumed = StudentProduct {
            student_product_id: StudentProductId::new(),
            student_id: item.student_id.clone(),
            product_id: item.product.product_id.clone(),
            location_id: item.location_id.clone(),
            start_date,
            end_date,
            product_status: ProductStatus::Ordered,
            label: StudentProductLabel::Created,
            updated_from_student_product_id: Some(paused.student_product_id),
            updated_to_student_product_id: None,
            root_student_product_id: Some(paused.root_id()),
            version_number: 0,
            is_unique: item.product.is_unique,
            is_associated: item.package_associated_id.is_some(),
            created_at: now,
            updated_at: now,
        };
        paused.updated_to_student_product_id = Some(resumed.student_product_id);
        paused.updated_at = now;

        store.create_student_product(&resumed)?;
        let paused = self.persist(store, &paused, expected)?;

        tracing::debug!(paused = %paused.student_product_id, resumed = %resumed.student_product_id, "student product resumed");
        metrics::record_mutation("resume");
        Ok(Mutation::chained(resumed, paused))
    }

    // ─── Revert ──────────────────────────────────────────────────────

    /// Undo the pending split after `student_product_id`.
    ///
    /// The predecessor becomes the open tail again with its end date
    /// restored; the successor is cancelled and unlinked.
    #[tracing::instrument(skip_all, fields(student_product_id = %student_product_id))]
    pub fn revert_update_student_product<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        student_product_id: StudentProductId,
        product: &Product,
    ) -> Result<Reverted, LifecycleError> {
        let reverted = self
            .revert_inner(store, student_product_id, product)
            .map_err(|e| self.rejected("revert", e))?;
        metrics::record_mutation("revert");
        Ok(reverted)
    }

    fn revert_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        student_product_id: StudentProductId,
        product: &Product,
    ) -> Result<Reverted, LifecycleError> {
        let mut predecessor = store.get_student_product_for_update(student_product_id)?;
        let expected = predecessor.version_number;
        let successor = self.revert_in_place(store, &mut predecessor, product)?;
        let predecessor = self.persist(store, &predecessor, expected)?;
        Ok(Reverted {
            predecessor,
            successor,
        })
    }

    /// Revert `predecessor` in memory and persist its cancelled successor.
    ///
    /// The caller persists `predecessor`, so the predecessor takes a single
    /// versioned write even when the revert is one step of a larger mutation.
    pub(crate) fn revert_in_place<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        predecessor: &mut StudentProduct,
        product: &Product,
    ) -> Result<StudentProduct, LifecycleError> {
        let successor_id = predecessor.updated_to_student_product_id.ok_or_else(|| {
            LifecycleError::precondition(format!(
                "cannot revert {} without updated_to_student_product_id",
                predecessor.student_product_id
            ))
        })?;
        let mut successor = store.get_student_product_for_update(successor_id)?;

        let restored_end = if successor.is_cancelled() {
            Some(self.latest_period_end(store, product)?)
        } else {
            successor.end_date
        };
        let now = self.now();

        predecessor.label = StudentProductLabel::Created;
        predecessor.end_date = restored_end;
        predecessor.updated_to_student_product_id = None;
        predecessor.updated_at = now;

        let successor_version = successor.version_number;
        successor.updated_from_student_product_id = None;
        successor.product_status = ProductStatus::Cancelled;
        successor.updated_at = now;
        let successor = self.persist(store, &successor, successor_version)?;

        tracing::debug!(
            predecessor = %predecessor.student_product_id,
            successor = %successor.student_product_id,
            ?restored_end,
            "pending update reverted"
        );
        Ok(successor)
    }

    // ─── Bulk status changes ─────────────────────────────────────────

    /// Cancel a record outright and reset its label to `CREATED`.
    #[tracing::instrument(skip_all, fields(student_product_id = %student_product_id))]
    pub fn cancel_student_product<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        student_product_id: StudentProductId,
    ) -> Result<StudentProduct, LifecycleError> {
        let row = self
            .cancel_outright(store, student_product_id)
            .map_err(|e| self.rejected("cancel_student_product", e))?;
        metrics::record_mutation("cancel_student_product");
        Ok(row)
    }

    fn cancel_outright<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        student_product_id: StudentProductId,
    ) -> Result<StudentProduct, LifecycleError> {
        let mut row = store.get_student_product_for_update(student_product_id)?;
        let expected = row.version_number;
        row.product_status = ProductStatus::Cancelled;
        row.label = StudentProductLabel::Created;
        row.updated_at = self.now();
        self.persist(store, &row, expected)
    }

    // ─── Reads ───────────────────────────────────────────────────────

    /// Read one record.
    pub fn get_student_product_by_id<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        student_product_id: StudentProductId,
    ) -> Result<StudentProduct, LifecycleError> {
        Ok(store.get_student_product(student_product_id)?)
    }

    /// Read one record and hold its lock for the rest of the transaction.
    pub fn get_student_product_for_update<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        student_product_id: StudentProductId,
    ) -> Result<StudentProduct, LifecycleError> {
        Ok(store.get_student_product_for_update(student_product_id)?)
    }

    /// Read several records. Missing ids are skipped.
    pub fn get_student_products_by_ids<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        ids: &[StudentProductId],
    ) -> Result<Vec<StudentProduct>, LifecycleError> {
        Ok(store.get_student_products_by_ids(ids)?)
    }

    /// Lock and return every record carrying one of `labels`.
    ///
    /// Labels arrive as wire strings; an unknown label fails the whole call.
    pub fn get_student_products_by_labels<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        labels: &[&str],
    ) -> Result<Vec<StudentProduct>, LifecycleError> {
        let parsed = labels
            .iter()
            .map(|raw| {
                raw.parse::<StudentProductLabel>().map_err(|_| {
                    LifecycleError::precondition(format!("invalid student product label {raw}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(store.list_student_products_by_labels_for_update(&parsed)?)
    }

    // ─── Validation ──────────────────────────────────────────────────

    /// The item's effective date, checked against `row`'s interval and today.
    fn check_effective_date(
        &self,
        item: &OrderItemData,
        row: &StudentProduct,
        bound: StartBound,
    ) -> Result<NaiveDate, LifecycleError> {
        let effective = item
            .effective_date
            .ok_or_else(|| LifecycleError::precondition("missing effective date of order"))?;
        let (Some(start), Some(end)) = (row.start_date, row.end_date) else {
            return Err(LifecycleError::precondition(format!(
                "start date or end date of {} is empty",
                row.student_product_id
            )));
        };
        let before_start = match bound {
            StartBound::After => effective <= start,
            StartBound::OnOrAfter => effective < start,
        };
        let today = self.today();
        if before_start || effective < today || effective >= end {
            return Err(LifecycleError::precondition(format!(
                "invalid effective date {effective} for interval [{start}, {end}] on {today}"
            )));
        }
        Ok(effective)
    }

    /// The leave's start date, after checking the leave against `row`.
    fn check_loa_duration(
        &self,
        item: &OrderItemData,
        row: &StudentProduct,
    ) -> Result<NaiveDate, LifecycleError> {
        let leave_start = item
            .start_date
            .ok_or_else(|| LifecycleError::precondition("missing start date of LOA"))?;
        let leave_end = item
            .end_date
            .ok_or_else(|| LifecycleError::precondition("missing end date of LOA"))?;
        let (Some(start), Some(end)) = (row.start_date, row.end_date) else {
            return Err(LifecycleError::precondition(format!(
                "start date or end date of {} is empty",
                row.student_product_id
            )));
        };
        if leave_start < start || leave_start < self.today() || leave_start >= end {
            return Err(LifecycleError::precondition(format!(
                "invalid start date {leave_start} of LOA"
            )));
        }
        if leave_end <= leave_start {
            return Err(LifecycleError::precondition(format!(
                "invalid end date {leave_end} of LOA"
            )));
        }
        Ok(leave_start)
    }
}

/// Where a split's successor ends.
#[derive(Debug, Clone, Copy)]
enum SuccessorEnd {
    /// Keep the predecessor's end date, with the given status.
    Inherit(ProductStatus),
    /// End on the effective date (a cancellation segment).
    EffectiveDate,
}

fn target_id(item: &OrderItemData, what: &str) -> Result<StudentProductId, LifecycleError> {
    item.student_product_id.ok_or_else(|| {
        LifecycleError::precondition(format!("{what} student product without student product id"))
    })
}

fn pending_order(row: &StudentProduct) -> LifecycleError {
    LifecycleError::precondition(format!(
        "unable to change {} due to pending {} order",
        row.student_product_id, row.label
    ))
}
