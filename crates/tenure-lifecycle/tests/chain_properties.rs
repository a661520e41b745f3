//! # Chain Property Tests
//!
//! Randomized sequences of splits and reverts, checking the invariants every
//! chain must hold: contiguous intervals, one open tail, and versions that
//! count writes.

mod common;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use common::*;
use tenure_core::{day_after, StudentProductLabel};
use tenure_lifecycle::LifecycleError;
use tenure_store::Transaction;

fn new_year() -> NaiveDate {
    date(2024, 1, 1)
}

proptest! {
    /// Successive updates on the tail keep the chain contiguous with a
    /// single open tail.
    #[test]
    fn successive_updates_keep_chain_contiguous(gaps in prop::collection::vec(1i64..=30, 1..8)) {
        let h = Harness::at(new_year());
        let root = h.enroll(&course(), new_year());
        let mut tail = root.clone();
        let mut effective = new_year();
        for gap in &gaps {
            effective += Duration::days(*gap);
            tail = h
                .apply(&mut update_at(&course(), &tail, effective))
                .unwrap()
                .student_product;
        }

        let chain = walk_chain(&h.store, root.student_product_id);
        prop_assert_eq!(chain.len(), gaps.len() + 1);
        prop_assert_eq!(chain.first().and_then(|r| r.start_date), Some(new_year()));
        prop_assert_eq!(chain.last().and_then(|r| r.end_date), Some(schedule_end()));

        // ── contiguity ──
        for pair in chain.windows(2) {
            let predecessor_end = pair[0].end_date.unwrap();
            prop_assert_eq!(pair[1].start_date, Some(day_after(predecessor_end)));
            prop_assert_eq!(pair[1].updated_from_student_product_id, Some(pair[0].student_product_id));
            prop_assert_eq!(pair[1].root_id(), root.student_product_id);
        }

        // ── single open tail ──
        let open_tails = h
            .store
            .student_products()
            .into_iter()
            .filter(|r| r.root_id() == root.student_product_id && r.is_tail())
            .count();
        prop_assert_eq!(open_tails, 1);

        // ── one write per predecessor, none on the tail ──
        for row in &chain[..chain.len() - 1] {
            prop_assert_eq!(row.version_number, 1);
            prop_assert_eq!(row.label, StudentProductLabel::UpdateScheduled);
        }
        prop_assert_eq!(chain[chain.len() - 1].version_number, 0);
    }

    /// Each split-then-revert cycle costs the root exactly two writes and
    /// leaves it as it was.
    #[test]
    fn revert_undoes_split(offsets in prop::collection::vec(1i64..300, 1..6)) {
        let h = Harness::at(new_year());
        let root = h.enroll(&course(), new_year());
        let id = root.student_product_id;

        for (cycle, offset) in offsets.iter().enumerate() {
            let current = h.row(id);
            h.apply(&mut update_at(&course(), &current, new_year() + Duration::days(*offset)))
                .unwrap();

            let mut tx = h.store.begin();
            h.engine
                .revert_update_student_product(&mut tx, id, &course())
                .unwrap();
            tx.commit().unwrap();

            let restored = h.row(id);
            prop_assert_eq!(restored.version_number as usize, 2 * (cycle + 1));
            prop_assert_eq!(restored.end_date, root.end_date);
            prop_assert_eq!(restored.label, root.label);
            prop_assert!(restored.is_tail());
        }
    }

    /// A write presenting any version other than the stored one is rejected
    /// and leaves the stored record unchanged.
    #[test]
    fn stale_versions_always_rejected(presented in 1u32..100) {
        let h = Harness::at(new_year());
        let root = h.enroll(&course(), new_year());
        let mut order = update_at(&course(), &root, date(2024, 6, 1));
        order.student_product_version = presented;

        let err = h.apply(&mut order).unwrap_err();
        let is_mismatch = matches!(err, LifecycleError::VersionMismatch { .. });
        prop_assert!(is_mismatch);
        prop_assert_eq!(h.row(root.student_product_id), root);
        prop_assert_eq!(h.store.student_products().len(), 1);
    }
}
