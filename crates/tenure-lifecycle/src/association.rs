//! # Association Engine
//!
//! Bundling of component products under a package's StudentProduct.
//!
//! A component product may appear under a package at most once while its
//! existing bundle entry is live. An existing entry stops blocking once its
//! component record is cancelled and has either no start date (a voided
//! one-time product) or a start date that has already arrived.
//!
//! Components reach a package two ways:
//!
//! - ordered together with the package, in one order
//!   ([`LifecycleEngine::create_associated_student_products`]);
//! - added to a package the student already holds
//!   ([`LifecycleEngine::create_associated_student_product_by_associated_id`]).

use chrono::NaiveDate;

use tenure_core::{
    OrderItemData, ProductAssociation, ProductId, StudentAssociatedProduct, StudentProduct,
    StudentProductId,
};
use tenure_store::RecordStore;

use crate::engine::LifecycleEngine;
use crate::error::LifecycleError;
use crate::metrics;

impl LifecycleEngine {
    /// Bundle components ordered alongside their package.
    ///
    /// `order_items` are the order's items after their StudentProducts were
    /// created; each association names a package item and a component item
    /// among them.
    #[tracing::instrument(skip_all, fields(associations = associations.len()))]
    pub fn create_associated_student_products<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        associations: &[ProductAssociation],
        order_items: &[OrderItemData],
    ) -> Result<(), LifecycleError> {
        self.bundle_inner(store, associations, order_items)
            .map_err(|e| self.rejected("associate", e))
    }

    fn bundle_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        associations: &[ProductAssociation],
        order_items: &[OrderItemData],
    ) -> Result<(), LifecycleError> {
        for association in associations {
            let component = order_items
                .iter()
                .find(|item| {
                    item.product.product_id == association.product_id
                        && item.package_associated_id.as_ref() == Some(&association.package_id)
                })
                .ok_or_else(|| {
                    LifecycleError::precondition(format!(
                        "no order item for product {} bundled under {}",
                        association.product_id, association.package_id
                    ))
                })?;
            let package = order_items
                .iter()
                .find(|item| {
                    item.product.product_id == association.package_id
                        && item.package_associated_id.is_none()
                })
                .ok_or_else(|| {
                    LifecycleError::precondition(format!(
                        "no order item for package {}",
                        association.package_id
                    ))
                })?;
            let component_row = created_row(component)?;
            let package_row = created_row(package)?;

            self.verify_not_duplicated(
                store,
                package_row.student_product_id,
                &component_row.product_id,
            )?;
            self.associate(
                store,
                package_row.student_product_id,
                component_row.student_product_id,
            )?;
        }
        Ok(())
    }

    /// Bundle the item's StudentProduct under the existing package named by
    /// `associated_student_product_id`. Items without one are ignored.
    ///
    /// Only orders that create a record (new, enrollment, resume) are
    /// checked for duplicates; other orders re-attach an existing component.
    #[tracing::instrument(skip_all, fields(package = ?item.associated_student_product_id))]
    pub fn create_associated_student_product_by_associated_id<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<(), LifecycleError> {
        self.attach_inner(store, item)
            .map_err(|e| self.rejected("associate", e))
    }

    fn attach_inner<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<(), LifecycleError> {
        let Some(package_id) = item.associated_student_product_id else {
            return Ok(());
        };
        let component = created_row(item)?;
        if item
            .action()
            .is_some_and(|action| action.creates_student_product())
        {
            self.verify_not_duplicated(store, package_id, &item.product.product_id)?;
        }
        self.associate(store, package_id, component.student_product_id)
    }

    /// Remove the item's StudentProduct from the package named by
    /// `associated_student_product_id`. Returns whether an edge was removed.
    ///
    /// Recurring components are bundled by their chain's root, so the edge
    /// is looked up by root.
    #[tracing::instrument(skip_all, fields(package = ?item.associated_student_product_id))]
    pub fn delete_associated_student_product_by_associated_id<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &OrderItemData,
    ) -> Result<bool, LifecycleError> {
        let Some(package_id) = item.associated_student_product_id else {
            return Ok(false);
        };
        let component = created_row(item)?;
        let component_id = if item.is_one_time_product() {
            component.student_product_id
        } else {
            component.root_id()
        };
        let edge = StudentAssociatedProduct {
            student_product_id: package_id,
            associated_product_id: component_id,
        };
        let removed = store.delete_association(&edge)?;
        if removed {
            metrics::record_association("delete");
        }
        tracing::debug!(package = %package_id, component = %component_id, removed, "association deleted");
        Ok(removed)
    }

    fn associate<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        package_id: StudentProductId,
        component_id: StudentProductId,
    ) -> Result<(), LifecycleError> {
        store.create_association(&StudentAssociatedProduct {
            student_product_id: package_id,
            associated_product_id: component_id,
        })?;
        metrics::record_association("create");
        tracing::debug!(package = %package_id, component = %component_id, "association created");
        Ok(())
    }

    /// Reject bundling `product_id` under the package while an existing
    /// entry for it is live.
    fn verify_not_duplicated<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        package_id: StudentProductId,
        product_id: &ProductId,
    ) -> Result<(), LifecycleError> {
        let existing = store.associated_product_map(package_id)?;
        let Some(&existing_id) = existing.get(product_id) else {
            return Ok(());
        };
        let existing_row = store.get_student_product_for_update(existing_id)?;
        if is_superseded(&existing_row, self.today()) {
            tracing::debug!(product_id = %product_id, existing = %existing_id, "superseded association ignored");
            return Ok(());
        }
        Err(LifecycleError::DuplicateAssociation {
            product_id: product_id.clone(),
            associated_student_product_id: existing_id,
            package_student_product_id: package_id,
        })
    }
}

/// Whether a bundled component no longer blocks re-bundling its product.
pub fn is_superseded(component: &StudentProduct, today: NaiveDate) -> bool {
    component.is_cancelled() && component.start_date.map_or(true, |start| start <= today)
}

fn created_row(item: &OrderItemData) -> Result<&StudentProduct, LifecycleError> {
    item.student_product.as_ref().ok_or_else(|| {
        LifecycleError::precondition(format!(
            "order item for product {} has no student product yet",
            item.product.product_id
        ))
    })
}
