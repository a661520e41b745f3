//! # In-Memory Record Store
//!
//! A transactional, in-process implementation of the repository traits.
//! Used by the CLI and the test suites; it reproduces the behaviour the
//! lifecycle engine relies on from a relational backend:
//!
//! - **Isolation.** A transaction sees committed state overlaid with its
//!   own staged writes. Other transactions see nothing until commit.
//! - **Row locks.** `get_student_product_for_update` takes a no-wait lock.
//!   A row locked by another open transaction yields [`StoreError::RowLocked`].
//! - **Compare-and-swap.** Versioned updates are checked when staged and
//!   re-checked against committed state at commit.
//! - **Atomic commit.** Every staged write is validated before any is
//!   applied. One failure aborts the whole commit.
//!
//! Dropping a transaction without committing rolls it back and releases
//! its locks.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;

use tenure_core::{
    BillingScheduleId, BillingSchedulePeriod, LocationId, Package, Product, ProductId,
    StudentAssociatedProduct, StudentId, StudentProduct, StudentProductId, StudentProductLabel,
};

use crate::error::StoreError;
use crate::repository::{
    BillingScheduleStore, CatalogStore, StudentAssociatedProductStore, StudentProductStore,
    Transaction,
};

// ─── Shared State ───────────────────────────────────────────────────

#[derive(Debug, Default)]
struct State {
    student_products: HashMap<StudentProductId, StudentProduct>,
    associations: Vec<StudentAssociatedProduct>,
    products: HashMap<ProductId, Product>,
    packages: HashMap<ProductId, Package>,
    periods: HashMap<BillingScheduleId, Vec<BillingSchedulePeriod>>,
    locks: HashMap<StudentProductId, u64>,
    next_tx_id: u64,
}

impl State {
    fn release_locks(&mut self, tx_id: u64) {
        self.locks.retain(|_, holder| *holder != tx_id);
    }

    fn locked_by_other(&self, id: StudentProductId, tx_id: u64) -> bool {
        self.locks.get(&id).is_some_and(|holder| *holder != tx_id)
    }
}

/// Shared handle to the committed state. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction.
    pub fn begin(&self) -> MemoryTransaction {
        let tx_id = {
            let mut state = self.state.lock();
            state.next_tx_id += 1;
            state.next_tx_id
        };
        tracing::trace!(tx_id, "transaction opened");
        MemoryTransaction {
            state: Arc::clone(&self.state),
            tx_id,
            staged: HashMap::new(),
            staged_order: Vec::new(),
            association_ops: Vec::new(),
            closed: false,
        }
    }

    // ── Seeding ─────────────────────────────────────────────────────

    /// Register a product in the catalog.
    pub fn insert_product(&self, product: Product) {
        self.state
            .lock()
            .products
            .insert(product.product_id.clone(), product);
    }

    /// Register a package window in the catalog.
    pub fn insert_package(&self, package: Package) {
        self.state
            .lock()
            .packages
            .insert(package.package_id.clone(), package);
    }

    /// Add a billing-schedule period.
    pub fn insert_billing_period(&self, period: BillingSchedulePeriod) {
        let mut state = self.state.lock();
        let periods = state
            .periods
            .entry(period.billing_schedule_id.clone())
            .or_default();
        periods.push(period);
        periods.sort_by_key(|p| p.start_date);
    }

    /// Write a StudentProduct row directly into committed state.
    pub fn insert_student_product(&self, row: StudentProduct) {
        self.state
            .lock()
            .student_products
            .insert(row.student_product_id, row);
    }

    /// Write an association edge directly into committed state.
    pub fn insert_association(&self, edge: StudentAssociatedProduct) {
        let mut state = self.state.lock();
        if !state.associations.contains(&edge) {
            state.associations.push(edge);
        }
    }

    // ── Inspection ──────────────────────────────────────────────────

    /// Committed copy of one row.
    pub fn student_product(&self, id: StudentProductId) -> Option<StudentProduct> {
        self.state.lock().student_products.get(&id).cloned()
    }

    /// Committed copies of every row, ordered by creation time.
    pub fn student_products(&self) -> Vec<StudentProduct> {
        let mut rows: Vec<_> = self
            .state
            .lock()
            .student_products
            .values()
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.student_product_id.cmp(&b.student_product_id))
        });
        rows
    }

    /// Committed association edges, in insertion order.
    pub fn associations(&self) -> Vec<StudentAssociatedProduct> {
        self.state.lock().associations.clone()
    }
}

// ─── Transaction ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Staged {
    Insert(StudentProduct),
    Update {
        row: StudentProduct,
        base_version: u32,
    },
}

impl Staged {
    fn row(&self) -> &StudentProduct {
        match self {
            Self::Insert(row) | Self::Update { row, .. } => row,
        }
    }
}

#[derive(Debug, Clone)]
enum AssociationOp {
    Create(StudentAssociatedProduct),
    Delete(StudentAssociatedProduct),
}

/// An open transaction against a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    state: Arc<Mutex<State>>,
    tx_id: u64,
    staged: HashMap<StudentProductId, Staged>,
    staged_order: Vec<StudentProductId>,
    association_ops: Vec<AssociationOp>,
    closed: bool,
}

impl MemoryTransaction {
    /// This transaction's identifier.
    pub fn id(&self) -> u64 {
        self.tx_id
    }

    /// Discard every staged write and release locks.
    pub fn rollback(self) {
        drop(self);
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::TransactionClosed);
        }
        Ok(())
    }

    fn visible_row(&self, state: &State, id: StudentProductId) -> Option<StudentProduct> {
        match self.staged.get(&id) {
            Some(staged) => Some(staged.row().clone()),
            None => state.student_products.get(&id).cloned(),
        }
    }

    fn visible_rows(&self, state: &State) -> Vec<StudentProduct> {
        let mut rows: HashMap<StudentProductId, StudentProduct> = state.student_products.clone();
        for (id, staged) in &self.staged {
            rows.insert(*id, staged.row().clone());
        }
        rows.into_values().collect()
    }

    fn visible_associations(&self, state: &State) -> Vec<StudentAssociatedProduct> {
        let mut edges = state.associations.clone();
        apply_association_ops(&mut edges, &self.association_ops);
        edges
    }

    fn stage(&mut self, id: StudentProductId, staged: Staged) {
        if self.staged.insert(id, staged).is_none() {
            self.staged_order.push(id);
        }
    }
}

fn apply_association_ops(edges: &mut Vec<StudentAssociatedProduct>, ops: &[AssociationOp]) {
    for op in ops {
        match op {
            AssociationOp::Create(edge) => {
                if !edges.contains(edge) {
                    edges.push(edge.clone());
                }
            }
            AssociationOp::Delete(edge) => edges.retain(|e| e != edge),
        }
    }
}

/// Ascending start date, undated rows last, ties broken by creation time.
fn by_start_date(a: &StudentProduct, b: &StudentProduct) -> Ordering {
    let dates = match (a.start_date, b.start_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    dates.then_with(|| a.created_at.cmp(&b.created_at))
}

/// Descending end date, undated rows last.
fn by_end_date_desc(a: &StudentProduct, b: &StudentProduct) -> Ordering {
    match (a.end_date, b.end_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.closed {
            self.state.lock().release_locks(self.tx_id);
            if !self.staged.is_empty() || !self.association_ops.is_empty() {
                tracing::debug!(
                    tx_id = self.tx_id,
                    staged = self.staged.len(),
                    "transaction rolled back"
                );
            }
        }
    }
}

impl Transaction for MemoryTransaction {
    fn commit(mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let shared = Arc::clone(&self.state);
        let mut state = shared.lock();

        // Validate everything before touching committed state.
        for id in &self.staged_order {
            let Some(staged) = self.staged.get(id) else {
                continue;
            };
            match staged {
                Staged::Insert(_) => {
                    if state.student_products.contains_key(id) {
                        return Err(StoreError::AlreadyExists {
                            kind: "student product",
                            id: id.to_string(),
                        });
                    }
                }
                Staged::Update { base_version, .. } => {
                    let committed = state
                        .student_products
                        .get(id)
                        .ok_or_else(|| StoreError::student_product_not_found(*id))?;
                    if committed.version_number != *base_version {
                        return Err(StoreError::VersionConflict {
                            id: *id,
                            expected: *base_version,
                            actual: committed.version_number,
                        });
                    }
                    if state.locked_by_other(*id, self.tx_id) {
                        return Err(StoreError::RowLocked { id: *id });
                    }
                }
            }
        }
        let mut edges = state.associations.clone();
        for op in &self.association_ops {
            if let AssociationOp::Create(edge) = op {
                if edges.contains(edge) {
                    return Err(StoreError::AlreadyExists {
                        kind: "student associated product",
                        id: format!("{}->{}", edge.student_product_id, edge.associated_product_id),
                    });
                }
            }
            apply_association_ops(&mut edges, std::slice::from_ref(op));
        }

        // Apply.
        let rows = self.staged_order.len();
        for id in std::mem::take(&mut self.staged_order) {
            if let Some(staged) = self.staged.remove(&id) {
                let row = match staged {
                    Staged::Insert(row) | Staged::Update { row, .. } => row,
                };
                state.student_products.insert(id, row);
            }
        }
        state.associations = edges;
        state.release_locks(self.tx_id);
        self.closed = true;
        tracing::debug!(tx_id = self.tx_id, rows, "transaction committed");
        Ok(())
    }
}

// ─── Repository Implementations ─────────────────────────────────────

impl StudentProductStore for MemoryTransaction {
    fn get_student_product(&self, id: StudentProductId) -> Result<StudentProduct, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        self.visible_row(&state, id)
            .ok_or_else(|| StoreError::student_product_not_found(id))
    }

    fn get_student_product_for_update(
        &mut self,
        id: StudentProductId,
    ) -> Result<StudentProduct, StoreError> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        let row = self
            .visible_row(&state, id)
            .ok_or_else(|| StoreError::student_product_not_found(id))?;
        if state.locked_by_other(id, self.tx_id) {
            return Err(StoreError::RowLocked { id });
        }
        state.locks.insert(id, self.tx_id);
        Ok(row)
    }

    fn get_student_products_by_ids(
        &self,
        ids: &[StudentProductId],
    ) -> Result<Vec<StudentProduct>, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        Ok(ids
            .iter()
            .filter_map(|id| self.visible_row(&state, *id))
            .collect())
    }

    fn create_student_product(&mut self, row: &StudentProduct) -> Result<(), StoreError> {
        self.ensure_open()?;
        let exists = {
            let state = self.state.lock();
            self.visible_row(&state, row.student_product_id).is_some()
        };
        if exists {
            return Err(StoreError::AlreadyExists {
                kind: "student product",
                id: row.student_product_id.to_string(),
            });
        }
        self.stage(row.student_product_id, Staged::Insert(row.clone()));
        Ok(())
    }

    fn update_student_product_with_version(
        &mut self,
        row: &StudentProduct,
        expected_version: u32,
    ) -> Result<StudentProduct, StoreError> {
        self.ensure_open()?;
        let id = row.student_product_id;
        let (current, committed_version) = {
            let state = self.state.lock();
            let current = self
                .visible_row(&state, id)
                .ok_or_else(|| StoreError::student_product_not_found(id))?;
            if state.locked_by_other(id, self.tx_id) {
                return Err(StoreError::RowLocked { id });
            }
            let committed_version = state
                .student_products
                .get(&id)
                .map(|r| r.version_number);
            (current, committed_version)
        };
        if current.version_number != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                actual: current.version_number,
            });
        }

        let mut persisted = row.clone();
        persisted.version_number = expected_version + 1;
        let staged = match (self.staged.get(&id), committed_version) {
            (Some(Staged::Insert(_)), _) | (None, None) => Staged::Insert(persisted.clone()),
            (Some(Staged::Update { base_version, .. }), _) => Staged::Update {
                row: persisted.clone(),
                base_version: *base_version,
            },
            (None, Some(base_version)) => Staged::Update {
                row: persisted.clone(),
                base_version,
            },
        };
        self.stage(id, staged);
        Ok(persisted)
    }

    fn latest_student_product_by_end_date(
        &self,
        student_id: &StudentId,
        product_id: &ProductId,
    ) -> Result<Option<StudentProduct>, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        let mut rows: Vec<_> = self
            .visible_rows(&state)
            .into_iter()
            .filter(|r| &r.student_id == student_id && &r.product_id == product_id)
            .collect();
        rows.sort_by(by_end_date_desc);
        Ok(rows.into_iter().next())
    }

    fn list_student_products_by_root(
        &self,
        root: StudentProductId,
    ) -> Result<Vec<StudentProduct>, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        let mut rows: Vec<_> = self
            .visible_rows(&state)
            .into_iter()
            .filter(|r| r.student_product_id == root || r.root_student_product_id == Some(root))
            .collect();
        rows.sort_by(by_start_date);
        Ok(rows)
    }

    fn list_student_products_by_labels_for_update(
        &mut self,
        labels: &[StudentProductLabel],
    ) -> Result<Vec<StudentProduct>, StoreError> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        let mut rows: Vec<_> = self
            .visible_rows(&state)
            .into_iter()
            .filter(|r| labels.contains(&r.label))
            .collect();
        if let Some(locked) = rows
            .iter()
            .find(|r| state.locked_by_other(r.student_product_id, self.tx_id))
        {
            return Err(StoreError::RowLocked {
                id: locked.student_product_id,
            });
        }
        for row in &rows {
            state.locks.insert(row.student_product_id, self.tx_id);
        }
        rows.sort_by(by_start_date);
        Ok(rows)
    }

    fn list_unique_student_products(
        &self,
        student_ids: &[StudentId],
    ) -> Result<Vec<StudentProduct>, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        let mut rows: Vec<_> = self
            .visible_rows(&state)
            .into_iter()
            .filter(|r| r.is_unique && student_ids.contains(&r.student_id))
            .collect();
        rows.sort_by(|a, b| {
            a.student_id
                .cmp(&b.student_id)
                .then_with(|| a.product_id.cmp(&b.product_id))
                .then_with(|| by_end_date_desc(a, b))
        });
        Ok(rows)
    }

    fn count_student_products_by_locations(
        &self,
        student_id: &StudentId,
        location_ids: &[LocationId],
    ) -> Result<usize, StoreError> {
        Ok(self
            .list_student_products_by_locations(student_id, location_ids, 0, usize::MAX)?
            .len())
    }

    fn list_student_products_by_locations(
        &self,
        student_id: &StudentId,
        location_ids: &[LocationId],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<StudentProduct>, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        let mut rows: Vec<_> = self
            .visible_rows(&state)
            .into_iter()
            .filter(|r| {
                &r.student_id == student_id
                    && location_ids.contains(&r.location_id)
                    && r.root_student_product_id.is_none()
            })
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.student_product_id.cmp(&b.student_product_id))
        });
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }
}

impl StudentAssociatedProductStore for MemoryTransaction {
    fn create_association(&mut self, edge: &StudentAssociatedProduct) -> Result<(), StoreError> {
        self.ensure_open()?;
        let exists = {
            let state = self.state.lock();
            self.visible_associations(&state).contains(edge)
        };
        if exists {
            return Err(StoreError::AlreadyExists {
                kind: "student associated product",
                id: format!("{}->{}", edge.student_product_id, edge.associated_product_id),
            });
        }
        self.association_ops.push(AssociationOp::Create(edge.clone()));
        Ok(())
    }

    fn delete_association(&mut self, edge: &StudentAssociatedProduct) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let exists = {
            let state = self.state.lock();
            self.visible_associations(&state).contains(edge)
        };
        if exists {
            self.association_ops.push(AssociationOp::Delete(edge.clone()));
        }
        Ok(exists)
    }

    fn associated_product_map(
        &self,
        package_student_product_id: StudentProductId,
    ) -> Result<HashMap<ProductId, StudentProductId>, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        let mut map = HashMap::new();
        for edge in self.visible_associations(&state) {
            if edge.student_product_id != package_student_product_id {
                continue;
            }
            if let Some(component) = self.visible_row(&state, edge.associated_product_id) {
                map.insert(component.product_id, edge.associated_product_id);
            }
        }
        Ok(map)
    }

    fn count_associations(
        &self,
        package_student_product_id: StudentProductId,
    ) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        Ok(self
            .visible_associations(&state)
            .iter()
            .filter(|e| e.student_product_id == package_student_product_id)
            .count())
    }

    fn list_association_ids(
        &self,
        package_student_product_id: StudentProductId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<StudentProductId>, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        Ok(self
            .visible_associations(&state)
            .into_iter()
            .filter(|e| e.student_product_id == package_student_product_id)
            .map(|e| e.associated_product_id)
            .skip(offset)
            .take(limit)
            .collect())
    }
}

impl BillingScheduleStore for MemoryTransaction {
    fn latest_billing_period(
        &self,
        schedule_id: &BillingScheduleId,
    ) -> Result<BillingSchedulePeriod, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        state
            .periods
            .get(schedule_id)
            .and_then(|periods| periods.iter().max_by_key(|p| p.end_date))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "billing schedule period",
                id: schedule_id.to_string(),
            })
    }

    fn billing_period_containing(
        &self,
        schedule_id: &BillingScheduleId,
        date: NaiveDate,
    ) -> Result<BillingSchedulePeriod, StoreError> {
        self.ensure_open()?;
        let state = self.state.lock();
        state
            .periods
            .get(schedule_id)
            .and_then(|periods| {
                periods
                    .iter()
                    .find(|p| p.start_date <= date && date <= p.end_date)
            })
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "billing schedule period",
                id: format!("{schedule_id} @ {date}"),
            })
    }
}

impl CatalogStore for MemoryTransaction {
    fn product(&self, product_id: &ProductId) -> Result<Product, StoreError> {
        self.ensure_open()?;
        self.state
            .lock()
            .products
            .get(product_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "product",
                id: product_id.to_string(),
            })
    }

    fn package(&self, package_id: &ProductId) -> Result<Package, StoreError> {
        self.ensure_open()?;
        self.state
            .lock()
            .packages
            .get(package_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "package",
                id: package_id.to_string(),
            })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tenure_core::{ProductStatus, ProductType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(start: Option<NaiveDate>, end: Option<NaiveDate>) -> StudentProduct {
        let now = Utc::now();
        StudentProduct {
            student_product_id: StudentProductId::new(),
            student_id: StudentId::new("s-1"),
            product_id: ProductId::new("p-1"),
            location_id: LocationId::new("l-1"),
            start_date: start,
            end_date: end,
            product_status: ProductStatus::Ordered,
            label: StudentProductLabel::Created,
            updated_from_student_product_id: None,
            updated_to_student_product_id: None,
            root_student_product_id: None,
            version_number: 0,
            is_unique: false,
            is_associated: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn seeded() -> (MemoryStore, StudentProduct) {
        let store = MemoryStore::new();
        let r = row(Some(date(2024, 1, 1)), Some(date(2024, 12, 31)));
        store.insert_student_product(r.clone());
        (store, r)
    }

    // ── Isolation and commit ─────────────────────────────────────────

    #[test]
    fn test_uncommitted_insert_invisible_to_others() {
        let store = MemoryStore::new();
        let r = row(None, None);
        let mut tx = store.begin();
        tx.create_student_product(&r).unwrap();
        assert!(tx.get_student_product(r.student_product_id).is_ok());

        let other = store.begin();
        assert!(other.get_student_product(r.student_product_id).is_err());
        assert!(store.student_product(r.student_product_id).is_none());

        tx.commit().unwrap();
        assert!(store.student_product(r.student_product_id).is_some());
    }

    #[test]
    fn test_drop_rolls_back() {
        let (store, r) = seeded();
        {
            let mut tx = store.begin();
            let mut changed = r.clone();
            changed.label = StudentProductLabel::Updated;
            tx.update_student_product_with_version(&changed, 0).unwrap();
        }
        let stored = store.student_product(r.student_product_id).unwrap();
        assert_eq!(stored.label, StudentProductLabel::Created);
        assert_eq!(stored.version_number, 0);
    }

    #[test]
    fn test_versioned_update_bumps_version() {
        let (store, r) = seeded();
        let mut tx = store.begin();
        let persisted = tx.update_student_product_with_version(&r, 0).unwrap();
        assert_eq!(persisted.version_number, 1);
        tx.commit().unwrap();
        assert_eq!(
            store.student_product(r.student_product_id).unwrap().version_number,
            1
        );
    }

    #[test]
    fn test_stale_version_rejected_at_write() {
        let (store, r) = seeded();
        let mut tx = store.begin();
        let err = tx.update_student_product_with_version(&r, 3).unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                id: r.student_product_id,
                expected: 3,
                actual: 0
            }
        );
    }

    #[test]
    fn test_second_write_in_same_tx_sees_bumped_version() {
        let (store, r) = seeded();
        let mut tx = store.begin();
        let once = tx.update_student_product_with_version(&r, 0).unwrap();
        assert!(tx.update_student_product_with_version(&r, 0).is_err());
        let twice = tx.update_student_product_with_version(&once, 1).unwrap();
        assert_eq!(twice.version_number, 2);
        tx.commit().unwrap();
        assert_eq!(
            store.student_product(r.student_product_id).unwrap().version_number,
            2
        );
    }

    #[test]
    fn test_concurrent_writers_loser_fails_at_commit() {
        let (store, r) = seeded();
        let mut a = store.begin();
        let mut b = store.begin();
        a.update_student_product_with_version(&r, 0).unwrap();
        b.update_student_product_with_version(&r, 0).unwrap();
        a.commit().unwrap();
        let err = b.commit().unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { actual: 1, .. }));
        assert_eq!(
            store.student_product(r.student_product_id).unwrap().version_number,
            1
        );
    }

    #[test]
    fn test_commit_is_all_or_nothing() {
        let (store, r) = seeded();
        let fresh = row(None, None);

        let mut a = store.begin();
        let mut b = store.begin();
        b.create_student_product(&fresh).unwrap();
        b.update_student_product_with_version(&r, 0).unwrap();
        a.update_student_product_with_version(&r, 0).unwrap();
        a.commit().unwrap();

        assert!(b.commit().is_err());
        assert!(store.student_product(fresh.student_product_id).is_none());
    }

    // ── Row locks ────────────────────────────────────────────────────

    #[test]
    fn test_row_lock_blocks_other_transaction() {
        let (store, r) = seeded();
        let mut a = store.begin();
        a.get_student_product_for_update(r.student_product_id).unwrap();

        let mut b = store.begin();
        assert_eq!(
            b.get_student_product_for_update(r.student_product_id)
                .unwrap_err(),
            StoreError::RowLocked {
                id: r.student_product_id
            }
        );
        assert!(b.update_student_product_with_version(&r, 0).is_err());
        // Plain reads are not blocked.
        assert!(b.get_student_product(r.student_product_id).is_ok());
    }

    #[test]
    fn test_row_lock_released_on_commit_and_drop() {
        let (store, r) = seeded();
        let mut a = store.begin();
        a.get_student_product_for_update(r.student_product_id).unwrap();
        a.commit().unwrap();

        let mut b = store.begin();
        b.get_student_product_for_update(r.student_product_id).unwrap();
        drop(b);

        let mut c = store.begin();
        assert!(c.get_student_product_for_update(r.student_product_id).is_ok());
    }

    // ── Scans ────────────────────────────────────────────────────────

    #[test]
    fn test_list_by_root_orders_by_start_date_undated_last() {
        let store = MemoryStore::new();
        let root = row(Some(date(2024, 1, 1)), Some(date(2024, 5, 31)));
        let mut late = row(Some(date(2024, 6, 1)), Some(date(2024, 12, 31)));
        late.root_student_product_id = Some(root.student_product_id);
        let mut undated = row(None, None);
        undated.root_student_product_id = Some(root.student_product_id);
        undated.created_at = root.created_at - Duration::days(1);
        let unrelated = row(Some(date(2023, 1, 1)), None);

        for r in [&late, &undated, &root, &unrelated] {
            store.insert_student_product(r.clone());
        }
        let tx = store.begin();
        let chain = tx
            .list_student_products_by_root(root.student_product_id)
            .unwrap();
        let ids: Vec<_> = chain.iter().map(|r| r.student_product_id).collect();
        assert_eq!(
            ids,
            vec![
                root.student_product_id,
                late.student_product_id,
                undated.student_product_id
            ]
        );
    }

    #[test]
    fn test_latest_by_end_date_ignores_undated() {
        let store = MemoryStore::new();
        let older = row(Some(date(2023, 1, 1)), Some(date(2023, 12, 31)));
        let newer = row(Some(date(2024, 1, 1)), Some(date(2024, 12, 31)));
        let voided = row(None, None);
        for r in [&older, &newer, &voided] {
            store.insert_student_product(r.clone());
        }
        let tx = store.begin();
        let latest = tx
            .latest_student_product_by_end_date(&StudentId::new("s-1"), &ProductId::new("p-1"))
            .unwrap()
            .unwrap();
        assert_eq!(latest.student_product_id, newer.student_product_id);
    }

    #[test]
    fn test_associations_map_and_paging() {
        let store = MemoryStore::new();
        let package = row(None, None);
        let mut c1 = row(None, None);
        c1.product_id = ProductId::new("course-a");
        let mut c2 = row(None, None);
        c2.product_id = ProductId::new("course-b");
        for r in [&package, &c1, &c2] {
            store.insert_student_product(r.clone());
        }

        let mut tx = store.begin();
        for c in [&c1, &c2] {
            tx.create_association(&StudentAssociatedProduct {
                student_product_id: package.student_product_id,
                associated_product_id: c.student_product_id,
            })
            .unwrap();
        }
        let map = tx.associated_product_map(package.student_product_id).unwrap();
        assert_eq!(map.get(&ProductId::new("course-a")), Some(&c1.student_product_id));
        assert_eq!(tx.count_associations(package.student_product_id).unwrap(), 2);
        assert_eq!(
            tx.list_association_ids(package.student_product_id, 1, 10).unwrap(),
            vec![c2.student_product_id]
        );
        tx.commit().unwrap();
        assert_eq!(store.associations().len(), 2);
    }

    #[test]
    fn test_duplicate_association_rejected_and_delete() {
        let store = MemoryStore::new();
        let edge = StudentAssociatedProduct {
            student_product_id: StudentProductId::new(),
            associated_product_id: StudentProductId::new(),
        };
        store.insert_association(edge.clone());
        let mut tx = store.begin();
        assert!(matches!(
            tx.create_association(&edge),
            Err(StoreError::AlreadyExists { .. })
        ));
        assert!(tx.delete_association(&edge).unwrap());
        assert!(!tx.delete_association(&edge).unwrap());
        tx.commit().unwrap();
        assert!(store.associations().is_empty());
    }

    #[test]
    fn test_billing_periods() {
        let store = MemoryStore::new();
        let schedule = BillingScheduleId::new("monthly");
        for (s, e) in [((2024, 2, 1), (2024, 2, 29)), ((2024, 1, 1), (2024, 1, 31))] {
            store.insert_billing_period(BillingSchedulePeriod {
                billing_schedule_period_id: format!("{s:?}"),
                billing_schedule_id: schedule.clone(),
                start_date: date(s.0, s.1, s.2),
                end_date: date(e.0, e.1, e.2),
            });
        }
        let tx = store.begin();
        assert_eq!(
            tx.latest_billing_period(&schedule).unwrap().end_date,
            date(2024, 2, 29)
        );
        assert_eq!(
            tx.billing_period_containing(&schedule, date(2024, 1, 15))
                .unwrap()
                .end_date,
            date(2024, 1, 31)
        );
        assert!(tx
            .billing_period_containing(&schedule, date(2024, 3, 1))
            .is_err());
        assert!(tx
            .latest_billing_period(&BillingScheduleId::new("none"))
            .is_err());
    }

    #[test]
    fn test_catalog_lookup() {
        let store = MemoryStore::new();
        store.insert_product(Product {
            product_id: ProductId::new("fee"),
            product_type: ProductType::Fee,
            billing_schedule_id: None,
            is_unique: true,
            disable_pro_rating: false,
        });
        let tx = store.begin();
        assert!(tx.product(&ProductId::new("fee")).unwrap().is_unique);
        assert!(matches!(
            tx.package(&ProductId::new("fee")),
            Err(StoreError::NotFound { kind: "package", .. })
        ));
    }
}
