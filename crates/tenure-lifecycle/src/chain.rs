//! # Chain Resolution
//!
//! A chain is every record sharing one root, ordered by start date. The
//! record that represents "the student's current state of this product" is:
//!
//! 1. the first record, if it has not started yet;
//! 2. otherwise the first record in force today, or a paused record that
//!    was never resumed;
//! 3. otherwise the last record.
//!
//! Listings resolve every dated record they return through this rule.

use serde::Serialize;

use tenure_core::{LocationId, StudentId, StudentProduct, StudentProductId, StudentProductLabel};
use tenure_store::{RecordStore, StoreError};

use crate::engine::LifecycleEngine;
use crate::error::LifecycleError;

/// A page of resolved records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentProductPage {
    /// Identifiers of the returned records, in order.
    pub student_product_ids: Vec<StudentProductId>,
    /// The returned records.
    pub student_products: Vec<StudentProduct>,
    /// Number of entries across all pages.
    pub total: usize,
}

impl LifecycleEngine {
    /// The current record of the chain rooted at `root`.
    pub fn get_student_product_with_root_id<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        root: StudentProductId,
    ) -> Result<StudentProduct, LifecycleError> {
        let chain = store.list_student_products_by_root(root)?;
        let today = self.today();

        let Some(first) = chain.first() else {
            return Err(StoreError::student_product_not_found(root).into());
        };
        if let (Some(start), Some(end)) = (first.start_date, first.end_date) {
            if start > today && start <= end {
                return Ok(first.clone());
            }
        }

        let current = chain.iter().find(|row| {
            if row.label == StudentProductLabel::Paused {
                row.updated_to_student_product_id.is_none()
            } else {
                row.covers(today)
            }
        });
        match current
            .or_else(|| linked_tail(&chain, root))
            .or_else(|| chain.last())
        {
            Some(row) => Ok(row.clone()),
            None => Err(StoreError::student_product_not_found(root).into()),
        }
    }

    /// A page of the student's chains at `location_ids`, newest first, each
    /// dated chain resolved to its current record.
    pub fn get_student_products_by_student_and_locations<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        student_id: &StudentId,
        location_ids: &[LocationId],
        offset: usize,
        limit: usize,
    ) -> Result<StudentProductPage, LifecycleError> {
        let total = store.count_student_products_by_locations(student_id, location_ids)?;
        let roots =
            store.list_student_products_by_locations(student_id, location_ids, offset, limit)?;
        let mut page = self.resolve_page(store, roots)?;
        page.total = total;
        Ok(page)
    }

    /// A page of the components bundled under a package record, each dated
    /// component resolved to its current record.
    pub fn get_associated_student_products<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        package_student_product_id: StudentProductId,
        offset: usize,
        limit: usize,
    ) -> Result<StudentProductPage, LifecycleError> {
        let total = store.count_associations(package_student_product_id)?;
        let ids = store.list_association_ids(package_student_product_id, offset, limit)?;
        let components = store.get_student_products_by_ids(&ids)?;
        let mut page = self.resolve_page(store, components)?;
        page.total = total;
        Ok(page)
    }

    fn resolve_page<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        rows: Vec<StudentProduct>,
    ) -> Result<StudentProductPage, LifecycleError> {
        let mut page = StudentProductPage::default();
        for row in rows {
            let resolved = if row.start_date.is_some() && row.end_date.is_some() {
                self.get_student_product_with_root_id(store, row.student_product_id)?
            } else {
                row
            };
            page.student_product_ids.push(resolved.student_product_id);
            page.student_products.push(resolved);
        }
        Ok(page)
    }
}

/// The last row reached by following forward links from `root`.
///
/// Rows unlinked by a revert or void keep their root id but drop out of
/// the walk.
fn linked_tail(chain: &[StudentProduct], root: StudentProductId) -> Option<&StudentProduct> {
    let find = move |id: StudentProductId| chain.iter().find(|row| row.student_product_id == id);
    let mut tail = find(root)?;
    for _ in 0..chain.len() {
        match tail.updated_to_student_product_id.and_then(find) {
            Some(next) => tail = next,
            None => break,
        }
    }
    Some(tail)
}

