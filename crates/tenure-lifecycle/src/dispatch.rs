//! # Order-Type Dispatch
//!
//! Routes a validated order item to its lifecycle operation:
//!
//! | Order type | Cancel flag | Operation |
//! |---|---|---|
//! | NEW, ENROLLMENT | any | create, then attach to an existing package |
//! | UPDATE | no | split at effective date |
//! | UPDATE | yes | cancel from effective date, then detach from its package |
//! | WITHDRAWAL | any | schedule withdrawal |
//! | GRADUATE | any | schedule graduation |
//! | LOA | any | schedule leave of absence |
//! | RESUME | any | resume, then attach to an existing package |
//! | CUSTOM_BILLING | any | rejected |
//!
//! The item is updated in place with the rows the operation produced, so
//! later steps of the same order (bundling, billing) see them.

use tenure_core::{OrderItemAction, OrderItemData, OrderType};
use tenure_store::RecordStore;

use crate::engine::{LifecycleEngine, Mutation};
use crate::error::LifecycleError;
use crate::setting::{validate_product_setting_for_create, validate_product_setting_for_loa};

/// Parse a wire order type, failing loudly on unknown strings.
pub fn parse_order_type(raw: &str) -> Result<OrderType, LifecycleError> {
    Ok(raw.parse::<OrderType>()?)
}

impl LifecycleEngine {
    /// Apply one order item to the student's chain.
    #[tracing::instrument(skip_all, fields(order_type = %item.order_type, is_cancel = item.is_cancel))]
    pub fn apply_order_item<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        item: &mut OrderItemData,
    ) -> Result<Mutation, LifecycleError> {
        let action = item.action().ok_or_else(|| {
            self.rejected(
                "dispatch",
                LifecycleError::Unimplemented(format!(
                    "{} order has no student product lifecycle",
                    item.order_type
                )),
            )
        })?;

        let mutation = match action {
            OrderItemAction::Create | OrderItemAction::Enroll => {
                validate_product_setting_for_create(item)
                    .map_err(|e| self.rejected("create", e))?;
                let row = self.create_student_product(store, item)?;
                Mutation::single(row)
            }
            OrderItemAction::Update => self.mutate_for_update_order(store, item)?,
            OrderItemAction::Cancel => self.mutate_for_cancel_order(store, item)?,
            OrderItemAction::Withdraw => {
                Mutation::single(self.mutate_for_withdrawal_order(store, item)?)
            }
            OrderItemAction::Graduate => {
                Mutation::single(self.mutate_for_graduate_order(store, item)?)
            }
            OrderItemAction::Pause => {
                validate_product_setting_for_loa(item).map_err(|e| self.rejected("loa", e))?;
                Mutation::single(self.mutate_for_loa_order(store, item)?)
            }
            OrderItemAction::Resume => self.mutate_for_resume_order(store, item)?,
        };

        item.student_product = Some(mutation.student_product.clone());
        item.root_student_product = mutation.predecessor.clone();

        match action {
            OrderItemAction::Create | OrderItemAction::Enroll | OrderItemAction::Resume => {
                self.create_associated_student_product_by_associated_id(store, item)?;
            }
            OrderItemAction::Cancel => {
                self.delete_associated_student_product_by_associated_id(store, item)?;
            }
            OrderItemAction::Update
            | OrderItemAction::Withdraw
            | OrderItemAction::Graduate
            | OrderItemAction::Pause => {}
        }

        tracing::debug!(?action, student_product_id = %mutation.student_product.student_product_id, "order item applied");
        Ok(mutation)
    }
}
