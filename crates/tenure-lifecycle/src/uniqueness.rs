//! # Uniqueness Engine
//!
//! A product flagged unique may be held at most once at a time per student.
//! The check looks only at the student's most recent record for the product
//! (latest end date):
//!
//! - one-time products pass only when that record is cancelled;
//! - recurring products pass only when the new record starts after that
//!   record ends.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use tenure_core::{OrderItemData, ProductId, StudentId, StudentProduct};
use tenure_store::RecordStore;

use crate::engine::{schedule_of, LifecycleEngine};
use crate::error::LifecycleError;

impl LifecycleEngine {
    /// Reject the item if the student already holds a conflicting instance
    /// of a unique product. Non-unique products always pass.
    pub fn check_unique<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        item: &OrderItemData,
        candidate_start: Option<NaiveDate>,
    ) -> Result<(), LifecycleError> {
        if !item.product.is_unique {
            return Ok(());
        }
        let Some(latest) =
            store.latest_student_product_by_end_date(&item.student_id, &item.product.product_id)?
        else {
            return Ok(());
        };

        let conflict = |reason: &str| LifecycleError::UniquenessConflict {
            student_id: item.student_id.clone(),
            product_id: item.product.product_id.clone(),
            existing_student_product_id: latest.student_product_id,
            reason: reason.to_string(),
        };

        if item.is_one_time_product() {
            if latest.is_cancelled() {
                return Ok(());
            }
            return Err(conflict(
                "unique one-time product already has an active student product",
            ));
        }

        match (candidate_start, latest.end_date) {
            (Some(start), Some(end)) if start > end => Ok(()),
            (Some(_), None) => Ok(()),
            (Some(_), Some(_)) => Err(conflict(
                "unique recurring product overlaps the previous student product",
            )),
            (None, _) => Err(conflict("unique recurring product has no start date")),
        }
    }

    /// The student's unique products, one record per product, most recent
    /// first. Voided records are skipped.
    pub fn get_unique_products_by_student_id<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        student_id: &StudentId,
    ) -> Result<Vec<StudentProduct>, LifecycleError> {
        let rows = store.list_unique_student_products(std::slice::from_ref(student_id))?;
        let mut seen: HashSet<ProductId> = HashSet::new();
        let mut out = Vec::new();
        for row in rows {
            if seen.contains(&row.product_id) || row.is_voided() {
                continue;
            }
            seen.insert(row.product_id.clone());
            out.push(row);
        }
        Ok(out)
    }

    /// [`Self::get_unique_products_by_student_id`] for several students at once.
    pub fn get_unique_products_by_student_ids<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        student_ids: &[StudentId],
    ) -> Result<HashMap<StudentId, Vec<StudentProduct>>, LifecycleError> {
        let rows = store.list_unique_student_products(student_ids)?;
        let mut seen: HashSet<(StudentId, ProductId)> = HashSet::new();
        let mut out: HashMap<StudentId, Vec<StudentProduct>> = HashMap::new();
        for row in rows {
            let key = (row.student_id.clone(), row.product_id.clone());
            if seen.contains(&key) || row.is_voided() {
                continue;
            }
            seen.insert(key);
            out.entry(row.student_id.clone()).or_default().push(row);
        }
        Ok(out)
    }

    /// The end date a unique recurring product actually runs to.
    ///
    /// Products that disable pro-rating run to the end of the billing
    /// period containing `end_date`; others end on `end_date`.
    pub fn end_date_of_unique_recurring_product<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        product_id: &ProductId,
        end_date: NaiveDate,
    ) -> Result<NaiveDate, LifecycleError> {
        let product = store.product(product_id)?;
        if !product.disable_pro_rating {
            return Ok(end_date);
        }
        let schedule = schedule_of(&product)?;
        Ok(store.billing_period_containing(schedule, end_date)?.end_date)
    }
}
