//! # Scenario Files
//!
//! A scenario seeds a catalog and then lists the steps to replay, each
//! naming the StudentProduct it acts on by the name of the step that
//! produced it:
//!
//! ```yaml
//! today: 2024-05-20
//! student_id: student-1
//! location_id: location-1
//! products:
//!   - product_id: course-math
//!     product_type: FEE
//!     billing_schedule_id: monthly
//! billing_periods:
//!   - billing_schedule_period_id: 2024-h2
//!     billing_schedule_id: monthly
//!     start_date: 2024-07-01
//!     end_date: 2024-12-31
//! steps:
//!   - name: enroll
//!     order:
//!       order_type: ORDER_TYPE_NEW
//!       product: course-math
//!       start_date: 2024-01-01
//!   - name: upgrade
//!     order:
//!       order_type: ORDER_TYPE_UPDATE
//!       product: course-math
//!       target: enroll
//!       effective_date: 2024-06-01
//!   - name: undo-enroll
//!     void:
//!       target: enroll
//!       order_type: ORDER_TYPE_NEW
//!     expect_error: FailedPrecondition
//! ```
//!
//! A step that carries `expect_error` must fail with that error code; any
//! other failure aborts the replay.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use tenure_core::{
    BillingSchedulePeriod, LocationId, OrderType, Package, Product, ProductId, ProductSetting,
    StudentId,
};

/// A replayable scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// The date the engine believes it is.
    pub today: NaiveDate,
    /// Student every order defaults to.
    pub student_id: StudentId,
    /// Location every order defaults to.
    pub location_id: LocationId,
    /// Catalog products.
    pub products: Vec<Product>,
    /// Package windows for one-time packages.
    #[serde(default)]
    pub packages: Vec<Package>,
    /// Billing-schedule periods.
    #[serde(default)]
    pub billing_periods: Vec<BillingSchedulePeriod>,
    /// Steps, replayed in order.
    pub steps: Vec<Step>,
}

/// One replay step. Exactly one of the action fields must be set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Name later steps use to refer to this step's StudentProduct.
    pub name: String,
    /// Apply an order item.
    #[serde(default)]
    pub order: Option<OrderStep>,
    /// Void the order that produced a StudentProduct.
    #[serde(default)]
    pub void: Option<VoidStep>,
    /// Revert a pending split.
    #[serde(default)]
    pub revert: Option<TargetStep>,
    /// Mark a scheduled leave as begun.
    #[serde(default)]
    pub pause: Option<TargetStep>,
    /// Error code the step must fail with (e.g. `FailedPrecondition`).
    #[serde(default)]
    pub expect_error: Option<String>,
}

/// The action a [`Step`] performs.
#[derive(Debug, Clone, Copy)]
pub enum StepAction<'a> {
    Order(&'a OrderStep),
    Void(&'a VoidStep),
    Revert(&'a TargetStep),
    Pause(&'a TargetStep),
}

impl Step {
    /// The step's single action.
    pub fn action(&self) -> Result<StepAction<'_>> {
        let mut actions = Vec::new();
        if let Some(order) = &self.order {
            actions.push(StepAction::Order(order));
        }
        if let Some(void) = &self.void {
            actions.push(StepAction::Void(void));
        }
        if let Some(revert) = &self.revert {
            actions.push(StepAction::Revert(revert));
        }
        if let Some(pause) = &self.pause {
            actions.push(StepAction::Pause(pause));
        }
        match actions.as_slice() {
            [action] => Ok(*action),
            [] => bail!("step {:?} has no action", self.name),
            _ => bail!("step {:?} has more than one action", self.name),
        }
    }
}

/// An order item, with StudentProducts referenced by step name.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderStep {
    pub order_type: OrderType,
    #[serde(default)]
    pub is_cancel: bool,
    pub product: ProductId,
    /// Overrides the scenario's student.
    #[serde(default)]
    pub student_id: Option<StudentId>,
    /// Overrides the scenario's location.
    #[serde(default)]
    pub location_id: Option<LocationId>,
    /// Step whose StudentProduct this order changes.
    #[serde(default)]
    pub target: Option<String>,
    /// Overrides the target's current version.
    #[serde(default)]
    pub version: Option<u32>,
    /// Step whose package StudentProduct this item is added to.
    #[serde(default)]
    pub package: Option<String>,
    /// Package product this item is ordered alongside.
    #[serde(default)]
    pub package_associated_id: Option<ProductId>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub cancellation_date: Option<NaiveDate>,
    #[serde(default)]
    pub product_setting: ProductSetting,
    #[serde(default = "enrolled")]
    pub is_enrolled_in_location: bool,
}

fn enrolled() -> bool {
    true
}

/// A void of the order that produced a StudentProduct.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoidStep {
    pub target: String,
    pub order_type: OrderType,
}

/// An action on one StudentProduct.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetStep {
    pub target: String,
}

impl Scenario {
    /// Parse a scenario document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(yaml).context("malformed scenario")?;
        scenario.check_names()?;
        Ok(scenario)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("in scenario {}", path.display()))
    }

    /// Every step has a unique name and refers only to earlier steps.
    fn check_names(&self) -> Result<()> {
        let mut seen: Vec<&str> = Vec::new();
        for step in &self.steps {
            for reference in step.references() {
                if !seen.contains(&reference) {
                    bail!(
                        "step {:?} refers to {reference:?}, which is not an earlier step",
                        step.name
                    );
                }
            }
            if seen.contains(&step.name.as_str()) {
                bail!("duplicate step name {:?}", step.name);
            }
            seen.push(&step.name);
        }
        Ok(())
    }
}

impl Step {
    fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        if let Some(order) = &self.order {
            refs.extend(order.target.as_deref());
            refs.extend(order.package.as_deref());
        }
        if let Some(void) = &self.void {
            refs.push(void.target.as_str());
        }
        for step in [&self.revert, &self.pause].into_iter().flatten() {
            refs.push(step.target.as_str());
        }
        refs
    }
}
