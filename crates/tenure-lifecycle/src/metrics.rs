//! Counters emitted by the engine.
//!
//! The engine only records; installing an exporter is the embedding
//! service's job. Without a recorder installed every call is a no-op.

use metrics::{counter, describe_counter};

/// Successful lifecycle mutations, labelled by `action`.
pub const MUTATIONS: &str = "tenure.student_product.mutations";

/// Rejected requests, labelled by `operation` and `reason`.
pub const REJECTIONS: &str = "tenure.student_product.rejections";

/// Voided orders, labelled by `order_type`.
pub const VOIDS: &str = "tenure.student_product.voids";

/// Association edges created or deleted, labelled by `op`.
pub const ASSOCIATIONS: &str = "tenure.student_associated_product.changes";

/// Register descriptions for every counter.
pub fn describe_metrics() {
    describe_counter!(MUTATIONS, "Successful student product mutations");
    describe_counter!(REJECTIONS, "Rejected student product requests");
    describe_counter!(VOIDS, "Voided student product orders");
    describe_counter!(ASSOCIATIONS, "Student associated product edge changes");
}

pub(crate) fn record_mutation(action: &'static str) {
    counter!(MUTATIONS, "action" => action).increment(1);
}

pub(crate) fn record_rejection(operation: &'static str, reason: &'static str) {
    counter!(REJECTIONS, "operation" => operation, "reason" => reason).increment(1);
}

pub(crate) fn record_void(order_type: &'static str) {
    counter!(VOIDS, "order_type" => order_type).increment(1);
}

pub(crate) fn record_association(op: &'static str) {
    counter!(ASSOCIATIONS, "op" => op).increment(1);
}
