//! # Void
//!
//! Undoing an order before it takes effect. What "undo" means depends on
//! the order type that produced the record:
//!
//! | Order type | Effect |
//! |---|---|
//! | NEW, ENROLLMENT, RESUME | record cancelled in place, dates cleared |
//! | WITHDRAWAL, GRADUATE, LOA | record restored to `ORDERED`/`CREATED`, end date from the latest billing period |
//! | UPDATE, record cancelled, no predecessor | record restored to `ORDERED`/`CREATED`, end date from the latest billing period |
//! | UPDATE, record cancelled, with predecessor | record voided, predecessor restored with the latest billing period's end date |
//! | UPDATE, record active | record voided, predecessor restored with the record's original end date |
//!
//! Voiding an UPDATE rewinds exactly one hop: the immediate predecessor.
//!
//! A void is refused when the record's label shows the chain has already
//! moved past the order being voided.

use chrono::NaiveDate;
use serde::Serialize;

use tenure_core::{
    OrderType, Product, ProductStatus, StudentProduct, StudentProductId, StudentProductLabel,
};
use tenure_store::RecordStore;

use crate::engine::LifecycleEngine;
use crate::error::LifecycleError;
use crate::metrics;

/// Result of a void.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voided {
    /// The record left in force: the restored predecessor when one was
    /// restored, otherwise the voided record itself.
    pub student_product: StudentProduct,
    /// The product the voided record belongs to.
    pub product: Product,
    /// Whether the voided order was a cancellation.
    pub is_cancel: bool,
}

impl LifecycleEngine {
    /// Undo the `order_type` order that produced `student_product_id`.
    #[tracing::instrument(skip_all, fields(student_product_id = %student_product_id, order_type = %order_type))]
    pub fn void_student_product<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        student_product_id: StudentProductId,
        order_type: OrderType,
    ) -> Result<Voided, LifecycleError> {
        let voided = self
            .void_inner(store, student_product_id, order_type)
            .map_err(|e| self.rejected("void", e))?;
        metrics::record_void(order_type.as_str());
        Ok(voided)
    }

    fn void_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        student_product_id: StudentProductId,
        order_type: OrderType,
    ) -> Result<Voided, LifecycleError> {
        let row = store.get_student_product_for_update(student_product_id)?;
        let product = store.product(&row.product_id)?;
        check_label_for_void(&row, order_type)?;

        let mut is_cancel = false;
        let student_product = match order_type {
            OrderType::Withdrawal | OrderType::Graduate | OrderType::Loa => {
                if product.is_one_time() {
                    return Err(LifecycleError::Unsupported(format!(
                        "cannot void {order_type} order for one-time product {}",
                        product.product_id
                    )));
                }
                self.void_scheduled(store, row, &product)?
            }
            OrderType::Update => {
                if product.is_one_time() {
                    return Err(LifecycleError::Unsupported(format!(
                        "cannot void {order_type} order for one-time product {}",
                        product.product_id
                    )));
                }
                if row.is_cancelled() {
                    is_cancel = true;
                    self.void_cancel(store, row, &product)?
                } else {
                    self.void_update(store, row)?
                }
            }
            OrderType::New | OrderType::Resume | OrderType::Enrollment => {
                self.void_create(store, row)?
            }
            OrderType::CustomBilling => {
                return Err(LifecycleError::Unimplemented(format!(
                    "voiding {order_type} order is unimplemented"
                )))
            }
        };

        Ok(Voided {
            student_product,
            product,
            is_cancel,
        })
    }

    /// Undo a withdrawal, graduation or leave of absence.
    fn void_scheduled<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        mut row: StudentProduct,
        product: &Product,
    ) -> Result<StudentProduct, LifecycleError> {
        let expected = row.version_number;
        row.product_status = ProductStatus::Ordered;
        row.label = StudentProductLabel::Created;
        row.end_date = Some(self.latest_period_end(store, product)?);
        row.updated_at = self.now();
        let row = self.persist(store, &row, expected)?;
        tracing::debug!(student_product_id = %row.student_product_id, end_date = ?row.end_date, "scheduled termination voided");
        Ok(row)
    }

    /// Undo the creation of a record.
    fn void_create<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        mut row: StudentProduct,
    ) -> Result<StudentProduct, LifecycleError> {
        let expected = row.version_number;
        row.product_status = ProductStatus::Cancelled;
        row.start_date = None;
        row.end_date = None;
        row.updated_at = self.now();
        let row = self.persist(store, &row, expected)?;
        tracing::debug!(student_product_id = %row.student_product_id, "creation voided");
        Ok(row)
    }

    /// Undo an update: void the successor, restore its predecessor.
    fn void_update<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        row: StudentProduct,
    ) -> Result<StudentProduct, LifecycleError> {
        let original_end = row.end_date;
        let predecessor_id = row.updated_from_student_product_id.ok_or_else(|| {
            LifecycleError::precondition(format!(
                "cannot void update of {} without a predecessor",
                row.student_product_id
            ))
        })?;
        self.clear_successor(store, row)?;
        self.restore_predecessor(store, predecessor_id, original_end)
    }

    /// Undo a cancellation.
    fn void_cancel<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        mut row: StudentProduct,
        product: &Product,
    ) -> Result<StudentProduct, LifecycleError> {
        let latest_end = self.latest_period_end(store, product)?;
        let Some(predecessor_id) = row.updated_from_student_product_id else {
            let expected = row.version_number;
            row.product_status = ProductStatus::Ordered;
            row.label = StudentProductLabel::Created;
            row.end_date = Some(latest_end);
            row.updated_at = self.now();
            let row = self.persist(store, &row, expected)?;
            tracing::debug!(student_product_id = %row.student_product_id, "in-place cancellation voided");
            return Ok(row);
        };
        self.clear_successor(store, row)?;
        self.restore_predecessor(store, predecessor_id, Some(latest_end))
    }

    /// Cancel `row`, clear its dates and detach it from its predecessor.
    fn clear_successor<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        mut row: StudentProduct,
    ) -> Result<StudentProduct, LifecycleError> {
        let expected = row.version_number;
        row.product_status = ProductStatus::Cancelled;
        row.start_date = None;
        row.end_date = None;
        row.updated_from_student_product_id = None;
        row.updated_at = self.now();
        self.persist(store, &row, expected)
    }

    /// Make `predecessor_id` the open tail again, ending on `end_date`.
    fn restore_predecessor<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        predecessor_id: StudentProductId,
        end_date: Option<NaiveDate>,
    ) -> Result<StudentProduct, LifecycleError> {
        let mut predecessor = store.get_student_product_for_update(predecessor_id)?;
        let expected = predecessor.version_number;
        predecessor.end_date = end_date;
        predecessor.product_status = ProductStatus::Ordered;
        predecessor.label = StudentProductLabel::Created;
        predecessor.updated_to_student_product_id = None;
        predecessor.updated_at = self.now();
        let predecessor = self.persist(store, &predecessor, expected)?;
        tracing::debug!(student_product_id = %predecessor.student_product_id, end_date = ?predecessor.end_date, "predecessor restored");
        Ok(predecessor)
    }
}

/// Refuse to void when the record's label shows a later mutation.
fn check_label_for_void(row: &StudentProduct, order_type: OrderType) -> Result<(), LifecycleError> {
    use StudentProductLabel::*;
    let blocked = match order_type {
        OrderType::Withdrawal | OrderType::Graduate => matches!(row.label, Updated | UpdateScheduled),
        _ => matches!(
            row.label,
            Updated | UpdateScheduled | WithdrawalScheduled | GraduationScheduled
        ),
    };
    if blocked {
        return Err(LifecycleError::VoidRejected {
            student_product_id: row.student_product_id,
            label: row.label,
            order_type,
        });
    }
    Ok(())
}
