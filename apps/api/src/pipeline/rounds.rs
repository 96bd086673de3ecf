//! Round-set reconciliation for a job's hiring pipeline.
//!
//! The store rejects any write that would give two rounds of one job the same
//! order, so a reorder cannot be written in a single pass (swapping 1 and 2
//! collides on the first write). Rounds that move are parked on negative orders
//! first and only then given their final positions.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job_offer::PipelineStageRow;
use crate::store::Store;

/// Pipeline seeded on every new job offer.
pub const DEFAULT_ROUNDS: [&str; 5] = ["Applied", "Screening", "Interview", "Offer", "Hired"];

/// One entry of an edited round list. Entries without a known `id` are new.
#[derive(Debug, Clone, Deserialize)]
pub struct RoundInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedRound {
    pub id: Uuid,
    pub name: String,
    pub from_order: i32,
    pub to_order: i32,
}

impl RetainedRound {
    fn moves(&self) -> bool {
        self.from_order != self.to_order
    }
}

/// The writes needed to turn the stored rounds into the edited list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundPlan {
    pub removed: Vec<Uuid>,
    pub retained: Vec<RetainedRound>,
    pub added: Vec<(String, i32)>,
}

/// Diffs `input` against the stored rounds.
///
/// Final orders are 1-based and contiguous, following the submitted `order`
/// values (ties keep submission order).
pub fn plan_rounds(
    existing: &[PipelineStageRow],
    input: &[RoundInput],
) -> Result<RoundPlan, AppError> {
    let mut seen = HashSet::new();
    for round in input {
        if round.name.trim().is_empty() {
            return Err(AppError::Validation("Round name must not be empty".to_string()));
        }
        if let Some(id) = round.id {
            if !seen.insert(id) {
                return Err(AppError::Validation(format!("Round {id} appears twice")));
            }
        }
    }

    let current: HashMap<Uuid, &PipelineStageRow> = existing.iter().map(|s| (s.id, s)).collect();

    let mut sorted: Vec<&RoundInput> = input.iter().collect();
    sorted.sort_by_key(|r| r.order);

    let mut plan = RoundPlan::default();
    for (idx, round) in sorted.into_iter().enumerate() {
        let to_order = idx as i32 + 1;
        let name = round.name.trim().to_string();
        match round.id.and_then(|id| current.get(&id)) {
            Some(stage) => plan.retained.push(RetainedRound {
                id: stage.id,
                name,
                from_order: stage.stage_order,
                to_order,
            }),
            None => {
                if let Some(id) = round.id {
                    warn!(round_id = %id, "Unknown round id, treating it as a new round");
                }
                plan.added.push((name, to_order));
            }
        }
    }

    let kept: HashSet<Uuid> = plan.retained.iter().map(|r| r.id).collect();
    plan.removed = existing
        .iter()
        .filter(|s| !kept.contains(&s.id))
        .map(|s| s.id)
        .collect();

    Ok(plan)
}

/// Replaces a job's round list.
///
/// Fails with `StageInUse`, before any write, when a removed round still holds
/// applications. Otherwise: delete removed rounds, park moving rounds on
/// negative orders, write final orders, insert new rounds.
pub async fn replace_rounds(
    store: &dyn Store,
    job_offer_id: Uuid,
    input: &[RoundInput],
) -> Result<Vec<PipelineStageRow>, AppError> {
    store
        .get_job_offer(job_offer_id)
        .await
        .map_err(AppError::storage)?
        .ok_or_else(|| AppError::NotFound(format!("job offer {job_offer_id} not found")))?;

    let existing = store.list_stages(job_offer_id).await.map_err(AppError::storage)?;
    let plan = plan_rounds(&existing, input)?;

    if !plan.removed.is_empty() {
        let occupied = store
            .applications_at_stages(&plan.removed)
            .await
            .map_err(AppError::storage)?;
        if !occupied.is_empty() {
            let mut stage_ids: Vec<Uuid> = occupied.iter().filter_map(|a| a.current_stage_id).collect();
            stage_ids.sort();
            stage_ids.dedup();
            warn!(
                job_offer_id = %job_offer_id,
                stages = stage_ids.len(),
                applications = occupied.len(),
                "Refusing to delete rounds that still hold applications"
            );
            return Err(AppError::StageInUse { stage_ids });
        }
        store.delete_stages(&plan.removed).await.map_err(AppError::storage)?;
    }

    write_retained(store, job_offer_id, &existing, &plan.retained).await?;

    for (name, order) in &plan.added {
        store
            .insert_stage(job_offer_id, name, *order)
            .await
            .map_err(AppError::storage)?;
    }

    info!(
        job_offer_id = %job_offer_id,
        removed = plan.removed.len(),
        retained = plan.retained.len(),
        added = plan.added.len(),
        "Rounds replaced"
    );
    store.list_stages(job_offer_id).await.map_err(AppError::storage)
}

async fn write_retained(
    store: &dyn Store,
    job_offer_id: Uuid,
    existing: &[PipelineStageRow],
    retained: &[RetainedRound],
) -> Result<(), AppError> {
    // Below every order already stored, including leftovers of an interrupted run.
    let floor = existing.iter().map(|s| s.stage_order.abs()).max().unwrap_or(0);

    let moving: Vec<&RetainedRound> = retained.iter().filter(|r| r.moves()).collect();
    for (idx, round) in moving.iter().enumerate() {
        let parked = -(floor + idx as i32 + 1);
        store
            .update_stage(round.id, &round.name, parked)
            .await
            .map_err(|e| {
                error!(job_offer_id = %job_offer_id, round_id = %round.id, error = %e, "Failed to park round");
                AppError::storage(e)
            })?;
    }

    for round in retained {
        store
            .update_stage(round.id, &round.name, round.to_order)
            .await
            .map_err(|e| {
                error!(job_offer_id = %job_offer_id, round_id = %round.id, error = %e, "Failed to write round order");
                AppError::storage(e)
            })?;
    }
    Ok(())
}
