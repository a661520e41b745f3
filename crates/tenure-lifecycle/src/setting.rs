//! Product-setting checks run before an order mutates anything.

use tenure_core::OrderItemData;

use crate::error::LifecycleError;

/// A product that requires enrollment may only be ordered by a student
/// enrolled at the order's location.
pub fn validate_product_setting_for_create(item: &OrderItemData) -> Result<(), LifecycleError> {
    if item.product_setting.is_enrollment_required == Some(true) && !item.is_enrolled_in_location {
        return Err(LifecycleError::precondition(format!(
            "product {} requires enrollment but student {} is not enrolled in location {}",
            item.product.product_id, item.student_id, item.location_id
        )));
    }
    Ok(())
}

/// A leave of absence may only be ordered for a pausable product.
pub fn validate_product_setting_for_loa(item: &OrderItemData) -> Result<(), LifecycleError> {
    if item.product_setting.is_pausable == Some(false) {
        return Err(LifecycleError::precondition(format!(
            "LOA order created for product {} but product is not pausable",
            item.product.product_id
        )));
    }
    Ok(())
}
