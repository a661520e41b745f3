//! # Repository Traits
//!
//! The storage contract the lifecycle engine is written against. Every
//! method runs inside the caller's transaction; implementations are
//! transaction handles, not connection pools.
//!
//! ## Write Discipline
//!
//! Existing StudentProduct rows are only ever written through
//! [`StudentProductStore::update_student_product_with_version`], which is a
//! compare-and-swap on `version_number`. There is no unconditional update.

use std::collections::HashMap;

use chrono::NaiveDate;

use tenure_core::{
    BillingScheduleId, BillingSchedulePeriod, LocationId, Package, Product, ProductId,
    StudentAssociatedProduct, StudentId, StudentProduct, StudentProductId, StudentProductLabel,
};

use crate::error::StoreError;

/// StudentProduct rows: point reads, locked reads, inserts, versioned updates and scans.
pub trait StudentProductStore {
    /// Read one row.
    fn get_student_product(&self, id: StudentProductId) -> Result<StudentProduct, StoreError>;

    /// Read one row and hold its lock until the transaction ends.
    fn get_student_product_for_update(
        &mut self,
        id: StudentProductId,
    ) -> Result<StudentProduct, StoreError>;

    /// Read the rows with the given ids. Missing ids are skipped.
    fn get_student_products_by_ids(
        &self,
        ids: &[StudentProductId],
    ) -> Result<Vec<StudentProduct>, StoreError>;

    /// Insert a new row.
    fn create_student_product(&mut self, row: &StudentProduct) -> Result<(), StoreError>;

    /// Overwrite a row if its stored version equals `expected_version`.
    ///
    /// The persisted row carries `version_number = expected_version + 1`
    /// and is returned.
    fn update_student_product_with_version(
        &mut self,
        row: &StudentProduct,
        expected_version: u32,
    ) -> Result<StudentProduct, StoreError>;

    /// The student's row for `product` with the latest end date.
    ///
    /// Rows without an end date rank below every dated row.
    fn latest_student_product_by_end_date(
        &self,
        student_id: &StudentId,
        product_id: &ProductId,
    ) -> Result<Option<StudentProduct>, StoreError>;

    /// The chain rooted at `root`: the root row plus every row carrying it
    /// as root, ordered by start date with undated rows last.
    fn list_student_products_by_root(
        &self,
        root: StudentProductId,
    ) -> Result<Vec<StudentProduct>, StoreError>;

    /// Rows carrying any of `labels`, locked for update.
    fn list_student_products_by_labels_for_update(
        &mut self,
        labels: &[StudentProductLabel],
    ) -> Result<Vec<StudentProduct>, StoreError>;

    /// Rows of unique products for the given students, ordered by student,
    /// then product, then end date descending.
    fn list_unique_student_products(
        &self,
        student_ids: &[StudentId],
    ) -> Result<Vec<StudentProduct>, StoreError>;

    /// Number of chain roots a student holds at the given locations.
    fn count_student_products_by_locations(
        &self,
        student_id: &StudentId,
        location_ids: &[LocationId],
    ) -> Result<usize, StoreError>;

    /// A page of chain roots a student holds at the given locations,
    /// newest first.
    fn list_student_products_by_locations(
        &self,
        student_id: &StudentId,
        location_ids: &[LocationId],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<StudentProduct>, StoreError>;
}

/// Package ↔ component edges.
pub trait StudentAssociatedProductStore {
    /// Insert an edge.
    fn create_association(&mut self, edge: &StudentAssociatedProduct) -> Result<(), StoreError>;

    /// Remove an edge. Returns whether an edge was removed.
    fn delete_association(&mut self, edge: &StudentAssociatedProduct) -> Result<bool, StoreError>;

    /// Component product id → component StudentProduct id, for one package row.
    fn associated_product_map(
        &self,
        package_student_product_id: StudentProductId,
    ) -> Result<HashMap<ProductId, StudentProductId>, StoreError>;

    /// Number of components under a package row.
    fn count_associations(
        &self,
        package_student_product_id: StudentProductId,
    ) -> Result<usize, StoreError>;

    /// A page of component StudentProduct ids under a package row.
    fn list_association_ids(
        &self,
        package_student_product_id: StudentProductId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<StudentProductId>, StoreError>;
}

/// Billing-schedule periods (read-only collaborator).
pub trait BillingScheduleStore {
    /// The period with the latest end date.
    fn latest_billing_period(
        &self,
        schedule_id: &BillingScheduleId,
    ) -> Result<BillingSchedulePeriod, StoreError>;

    /// The period whose range contains `date`.
    fn billing_period_containing(
        &self,
        schedule_id: &BillingScheduleId,
        date: NaiveDate,
    ) -> Result<BillingSchedulePeriod, StoreError>;
}

/// Product and package metadata (read-only collaborator).
pub trait CatalogStore {
    /// Look up a product.
    fn product(&self, product_id: &ProductId) -> Result<Product, StoreError>;

    /// Look up a package's validity window.
    fn package(&self, package_id: &ProductId) -> Result<Package, StoreError>;
}

/// Everything the lifecycle engine reads and writes within one transaction.
pub trait RecordStore:
    StudentProductStore + StudentAssociatedProductStore + BillingScheduleStore + CatalogStore
{
}

impl<T> RecordStore for T where
    T: StudentProductStore + StudentAssociatedProductStore + BillingScheduleStore + CatalogStore
{
}

/// A transaction handle. Writes become visible to others only on commit;
/// dropping the handle rolls back.
pub trait Transaction: RecordStore {
    /// Apply every staged write atomically, or none of them.
    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;
}
