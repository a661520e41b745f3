//! Shared fixture for the lifecycle integration tests.
//!
//! A [`MemoryStore`] seeded with a small catalog and a monthly billing
//! schedule covering 2024, plus an engine whose clock is frozen on
//! [`today()`].

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;

use tenure_core::{
    day_before, BillingScheduleId, BillingSchedulePeriod, FixedClock, LocationId, OrderItemData,
    OrderType, Package, Product, ProductId, ProductSetting, ProductType, StudentId,
    StudentProduct, StudentProductId,
};
use tenure_lifecycle::{EngineConfig, LifecycleEngine, LifecycleError, Mutation};
use tenure_store::{MemoryStore, Transaction};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The date every default engine believes it is.
pub fn today() -> NaiveDate {
    date(2024, 5, 20)
}

/// Last day of the monthly schedule.
pub fn schedule_end() -> NaiveDate {
    date(2024, 12, 31)
}

pub fn student() -> StudentId {
    StudentId::new("student-1")
}

pub fn location() -> LocationId {
    LocationId::new("location-1")
}

pub fn monthly() -> BillingScheduleId {
    BillingScheduleId::new("monthly")
}

// ── Catalog ─────────────────────────────────────────────────────────

pub fn course() -> Product {
    Product {
        product_id: ProductId::new("course-math"),
        product_type: ProductType::Fee,
        billing_schedule_id: Some(monthly()),
        is_unique: false,
        disable_pro_rating: false,
    }
}

pub fn unique_course() -> Product {
    Product {
        product_id: ProductId::new("course-unique"),
        is_unique: true,
        ..course()
    }
}

pub fn snapped_course() -> Product {
    Product {
        product_id: ProductId::new("course-snapped"),
        is_unique: true,
        disable_pro_rating: true,
        ..course()
    }
}

pub fn registration_fee() -> Product {
    Product {
        product_id: ProductId::new("fee-registration"),
        product_type: ProductType::Fee,
        billing_schedule_id: None,
        is_unique: false,
        disable_pro_rating: false,
    }
}

pub fn unique_material() -> Product {
    Product {
        product_id: ProductId::new("material-kit"),
        product_type: ProductType::Material,
        is_unique: true,
        ..registration_fee()
    }
}

pub fn summer_package() -> Product {
    Product {
        product_id: ProductId::new("package-summer"),
        product_type: ProductType::Package,
        billing_schedule_id: None,
        is_unique: false,
        disable_pro_rating: false,
    }
}

pub fn unique_package() -> Product {
    Product {
        product_id: ProductId::new("package-unique"),
        is_unique: true,
        ..summer_package()
    }
}

fn seed(store: &MemoryStore) {
    for product in [
        course(),
        unique_course(),
        snapped_course(),
        registration_fee(),
        unique_material(),
        summer_package(),
        unique_package(),
    ] {
        store.insert_product(product);
    }
    for package in [summer_package(), unique_package()] {
        store.insert_package(Package {
            package_id: package.product_id,
            package_start_date: date(2024, 6, 1),
            package_end_date: date(2024, 8, 31),
        });
    }
    for month in 1..=12 {
        let start = date(2024, month, 1);
        let next = if month == 12 {
            date(2025, 1, 1)
        } else {
            date(2024, month + 1, 1)
        };
        store.insert_billing_period(BillingSchedulePeriod {
            billing_schedule_period_id: format!("2024-{month:02}"),
            billing_schedule_id: monthly(),
            start_date: start,
            end_date: day_before(next),
        });
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub store: MemoryStore,
    pub engine: LifecycleEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::at(today())
    }

    pub fn at(today: NaiveDate) -> Self {
        Self::with_config(today, EngineConfig::default())
    }

    pub fn with_config(today: NaiveDate, config: EngineConfig) -> Self {
        let store = MemoryStore::new();
        seed(&store);
        let engine = LifecycleEngine::new(config, Arc::new(FixedClock::at_date(today))).unwrap();
        Self { store, engine }
    }

    /// A second engine over the same store, frozen on another day.
    pub fn engine_at(&self, today: NaiveDate) -> LifecycleEngine {
        LifecycleEngine::new(
            EngineConfig::default(),
            Arc::new(FixedClock::at_date(today)),
        )
        .unwrap()
    }

    /// Apply one item in its own transaction, committing on success.
    pub fn apply(&self, item: &mut OrderItemData) -> Result<Mutation, LifecycleError> {
        let mut tx = self.store.begin();
        let mutation = self.engine.apply_order_item(&mut tx, item)?;
        tx.commit()?;
        Ok(mutation)
    }

    /// Create a recurring product for the default student.
    pub fn enroll(&self, product: &Product, start: NaiveDate) -> StudentProduct {
        let mut order = item(OrderType::New, product);
        order.start_date = Some(start);
        self.apply(&mut order).unwrap().student_product
    }

    /// Committed copy of a row.
    pub fn row(&self, id: StudentProductId) -> StudentProduct {
        self.store.student_product(id).unwrap()
    }
}

// ── Order items ─────────────────────────────────────────────────────

pub fn item(order_type: OrderType, product: &Product) -> OrderItemData {
    OrderItemData {
        order_type,
        is_cancel: false,
        student_id: student(),
        location_id: location(),
        product: product.clone(),
        product_setting: ProductSetting::default(),
        is_enrolled_in_location: true,
        student_product_id: None,
        student_product_version: 0,
        start_date: None,
        effective_date: None,
        end_date: None,
        cancellation_date: None,
        package_associated_id: None,
        associated_student_product_id: None,
        student_product: None,
        root_student_product: None,
    }
}

/// An item targeting `row` at the version last observed.
pub fn targeting(order_type: OrderType, product: &Product, row: &StudentProduct) -> OrderItemData {
    OrderItemData {
        student_product_id: Some(row.student_product_id),
        student_product_version: row.version_number,
        ..item(order_type, product)
    }
}

pub fn update_at(product: &Product, row: &StudentProduct, effective: NaiveDate) -> OrderItemData {
    OrderItemData {
        effective_date: Some(effective),
        ..targeting(OrderType::Update, product, row)
    }
}

pub fn cancel_at(product: &Product, row: &StudentProduct, effective: NaiveDate) -> OrderItemData {
    OrderItemData {
        is_cancel: true,
        effective_date: Some(effective),
        cancellation_date: Some(effective),
        ..targeting(OrderType::Update, product, row)
    }
}

/// Rows of the chain rooted at `root`, walked along forward links.
pub fn walk_chain(store: &MemoryStore, root: StudentProductId) -> Vec<StudentProduct> {
    let mut rows = Vec::new();
    let mut next = Some(root);
    while let Some(id) = next {
        let row = store.student_product(id).unwrap();
        next = row.updated_to_student_product_id;
        rows.push(row);
    }
    rows
}
