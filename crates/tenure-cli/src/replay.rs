//! # Replay Subcommand
//!
//! Seeds an in-memory store from a scenario, replays each step in its own
//! transaction and prints the resulting chains as JSON.
//!
//! ```bash
//! tenure replay crates/tenure-cli/scenarios/upgrade_then_cancel.yaml
//! tenure -v replay scenario.yaml --resolve-on 2024-09-01 --compact
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use serde::Serialize;

use tenure_core::{
    FixedClock, OrderItemData, StudentAssociatedProduct, StudentProduct, StudentProductId,
};
use tenure_lifecycle::{EngineConfig, LifecycleEngine, LifecycleError};
use tenure_store::{
    CatalogStore, MemoryStore, MemoryTransaction, StudentProductStore, Transaction,
};

use crate::config::load_engine_config;
use crate::scenario::{OrderStep, Scenario, StepAction};

/// Replay subcommand arguments.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Scenario file to replay.
    pub scenario: PathBuf,

    /// Resolve chains as of this date instead of the scenario's `today`.
    #[arg(long)]
    pub resolve_on: Option<NaiveDate>,

    /// Print single-line JSON.
    #[arg(long)]
    pub compact: bool,
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub name: String,
    /// The StudentProduct the step produced or modified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_product_id: Option<StudentProductId>,
    /// Error code of an expected failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One chain after replay.
#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    pub root_student_product_id: StudentProductId,
    /// The record chain resolution picks as current.
    pub current_student_product_id: StudentProductId,
    /// Every record of the chain, by start date.
    pub student_products: Vec<StudentProduct>,
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub today: NaiveDate,
    pub config: EngineConfig,
    pub steps: Vec<StepOutcome>,
    pub chains: Vec<ChainReport>,
    pub associations: Vec<StudentAssociatedProduct>,
}

/// Execute the replay subcommand.
pub fn run_replay(args: &ReplayArgs, config_path: Option<&Path>) -> Result<u8> {
    let config = load_engine_config(config_path)?;
    let scenario = Scenario::load(&args.scenario)?;
    let report = replay(&scenario, config, args.resolve_on)?;
    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");
    Ok(0)
}

/// Replay `scenario` against a fresh in-memory store.
pub fn replay(
    scenario: &Scenario,
    config: EngineConfig,
    resolve_on: Option<NaiveDate>,
) -> Result<ReplayReport> {
    let store = seed(scenario);
    let engine = engine_on(scenario.today, config.clone())?;

    let mut produced: HashMap<String, StudentProductId> = HashMap::new();
    let mut steps = Vec::with_capacity(scenario.steps.len());
    for step in &scenario.steps {
        let action = step.action()?;
        let mut tx = store.begin();
        let result = run_step(&engine, &mut tx, scenario, action, &produced)
            .and_then(|id| tx.commit().map(|()| id).map_err(LifecycleError::from));

        let outcome = match (result, &step.expect_error) {
            (Ok(id), None) => {
                tracing::info!(step = %step.name, student_product_id = %id, "step applied");
                produced.insert(step.name.clone(), id);
                StepOutcome {
                    name: step.name.clone(),
                    student_product_id: Some(id),
                    error_code: None,
                    error: None,
                }
            }
            (Ok(_), Some(expected)) => {
                bail!("step {:?} succeeded but was expected to fail with {expected}", step.name)
            }
            (Err(err), Some(expected)) if format!("{:?}", err.code()) == *expected => {
                tracing::info!(step = %step.name, error = %err, "step failed as expected");
                StepOutcome {
                    name: step.name.clone(),
                    student_product_id: None,
                    error_code: Some(expected.clone()),
                    error: Some(err.to_string()),
                }
            }
            (Err(err), _) => {
                return Err(anyhow!(err).context(format!("step {:?} failed", step.name)));
            }
        };
        steps.push(outcome);
    }

    let resolver = match resolve_on {
        Some(date) => engine_on(date, config.clone())?,
        None => engine,
    };
    let chains = collect_chains(&store, &resolver)?;
    Ok(ReplayReport {
        today: resolve_on.unwrap_or(scenario.today),
        config,
        steps,
        chains,
        associations: store.associations(),
    })
}

fn seed(scenario: &Scenario) -> MemoryStore {
    let store = MemoryStore::new();
    for product in &scenario.products {
        store.insert_product(product.clone());
    }
    for package in &scenario.packages {
        store.insert_package(package.clone());
    }
    for period in &scenario.billing_periods {
        store.insert_billing_period(period.clone());
    }
    store
}

/// An engine whose clock reads midday of `today` in the operational timezone.
fn engine_on(today: NaiveDate, config: EngineConfig) -> Result<LifecycleEngine> {
    let local_noon = today
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| anyhow!("cannot build midday of {today}"))?;
    let utc = local_noon - Duration::minutes(i64::from(config.utc_offset_minutes));
    let clock = FixedClock(DateTime::from_naive_utc_and_offset(utc, Utc));
    Ok(LifecycleEngine::new(config, Arc::new(clock))?)
}

fn run_step(
    engine: &LifecycleEngine,
    tx: &mut MemoryTransaction,
    scenario: &Scenario,
    action: StepAction<'_>,
    produced: &HashMap<String, StudentProductId>,
) -> Result<StudentProductId, LifecycleError> {
    match action {
        StepAction::Order(order) => {
            let mut item = order_item(tx, scenario, order, produced)?;
            let mutation = engine.apply_order_item(tx, &mut item)?;
            Ok(mutation.student_product.student_product_id)
        }
        StepAction::Void(void) => {
            let id = lookup(produced, &void.target)?;
            let voided = engine.void_student_product(tx, id, void.order_type)?;
            Ok(voided.student_product.student_product_id)
        }
        StepAction::Revert(revert) => {
            let id = lookup(produced, &revert.target)?;
            let row = tx.get_student_product(id)?;
            let product = tx.product(&row.product_id)?;
            let reverted = engine.revert_update_student_product(tx, id, &product)?;
            Ok(reverted.predecessor.student_product_id)
        }
        StepAction::Pause(pause) => {
            let id = lookup(produced, &pause.target)?;
            Ok(engine.pause_student_product(tx, id)?.student_product_id)
        }
    }
}

fn order_item(
    tx: &MemoryTransaction,
    scenario: &Scenario,
    order: &OrderStep,
    produced: &HashMap<String, StudentProductId>,
) -> Result<OrderItemData, LifecycleError> {
    let product = tx.product(&order.product)?;
    let (student_product_id, student_product_version) = match &order.target {
        Some(target) => {
            let row = tx.get_student_product(lookup(produced, target)?)?;
            (
                Some(row.student_product_id),
                order.version.unwrap_or(row.version_number),
            )
        }
        None => (None, order.version.unwrap_or_default()),
    };
    let associated_student_product_id = order
        .package
        .as_deref()
        .map(|name| lookup(produced, name))
        .transpose()?;

    Ok(OrderItemData {
        order_type: order.order_type,
        is_cancel: order.is_cancel,
        student_id: order
            .student_id
            .clone()
            .unwrap_or_else(|| scenario.student_id.clone()),
        location_id: order
            .location_id
            .clone()
            .unwrap_or_else(|| scenario.location_id.clone()),
        product,
        product_setting: order.product_setting.clone(),
        is_enrolled_in_location: order.is_enrolled_in_location,
        student_product_id,
        student_product_version,
        start_date: order.start_date,
        effective_date: order.effective_date,
        end_date: order.end_date,
        cancellation_date: order.cancellation_date,
        package_associated_id: order.package_associated_id.clone(),
        associated_student_product_id,
        student_product: None,
        root_student_product: None,
    })
}

fn lookup(
    produced: &HashMap<String, StudentProductId>,
    name: &str,
) -> Result<StudentProductId, LifecycleError> {
    produced.get(name).copied().ok_or_else(|| {
        LifecycleError::FailedPrecondition(format!("step {name:?} produced no student product"))
    })
}

fn collect_chains(store: &MemoryStore, engine: &LifecycleEngine) -> Result<Vec<ChainReport>> {
    let roots: BTreeSet<StudentProductId> = store
        .student_products()
        .iter()
        .map(StudentProduct::root_id)
        .collect();
    let tx = store.begin();
    let mut chains = Vec::with_capacity(roots.len());
    for root in roots {
        let student_products = tx
            .list_student_products_by_root(root)
            .with_context(|| format!("failed to list chain {root}"))?;
        let current = engine
            .get_student_product_with_root_id(&tx, root)
            .with_context(|| format!("failed to resolve chain {root}"))?;
        chains.push(ChainReport {
            root_student_product_id: root,
            current_student_product_id: current.student_product_id,
            student_products,
        });
    }
    Ok(chains)
}
