use anyhow::{Context, Result};
use async_trait::async_trait;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::cleaning::{CleaningOptions, CleaningReport};
use crate::entities::Entity;
use crate::integrity::{KeyIndex, OrphanReport};

/// What storage does when the destination table already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    #[default]
    Fail,
    Replace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    HaltOnFirstError,
    #[default]
    Continue,
}

/// Delivers one entity's raw table, untransformed.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, entity: Entity) -> Result<DataFrame>;
}

/// Persists a cleaned table under its destination name.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn persist(&self, table: &DataFrame, destination: &str, on_conflict: OnConflict)
        -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    Loaded {
        entity: Entity,
        destination: &'static str,
        report: CleaningReport,
    },
    Failed {
        entity: Entity,
        error: String,
    },
}

impl EntityOutcome {
    pub fn entity(&self) -> Entity {
        match self {
            EntityOutcome::Loaded { entity, .. } | EntityOutcome::Failed { entity, .. } => *entity,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, EntityOutcome::Loaded { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineSummary {
    pub outcomes: Vec<EntityOutcome>,
    /// Entities never attempted because an earlier one failed under
    /// [`FailurePolicy::HaltOnFirstError`].
    pub skipped: Vec<Entity>,
    pub integrity: Option<OrphanReport>,
}

impl PipelineSummary {
    pub fn loaded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_loaded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.loaded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cleaning: CleaningOptions,
    pub on_conflict: OnConflict,
    pub policy: FailurePolicy,
}

/// Extract, clean and persist a single entity. Returns the cleaned table so
/// callers can run cross-table checks after the load.
pub async fn run_entity(
    entity: Entity,
    extractor: &dyn Extractor,
    storage: &dyn Storage,
    options: &RunOptions,
) -> Result<(DataFrame, CleaningReport)> {
    info!(entity = entity.code(), "extracting");
    let raw = extractor
        .extract(entity)
        .await
        .with_context(|| format!("failed to extract {entity}"))?;

    let cleaned = entity
        .clean(&raw, &options.cleaning)
        .with_context(|| format!("failed to clean {entity}"))?;

    let destination = entity.destination_table();
    storage
        .persist(&cleaned.df, destination, options.on_conflict)
        .await
        .with_context(|| format!("failed to persist {entity} into {destination}"))?;
    info!(
        entity = entity.code(),
        destination,
        rows = cleaned.report.rows_out,
        "loaded"
    );

    Ok((cleaned.df, cleaned.report))
}

/// Runs the selected entities one after another in registry order. Entities
/// share no state; a failure only stops later entities under
/// [`FailurePolicy::HaltOnFirstError`].
pub async fn run_pipeline(
    entities: &[Entity],
    extractor: &dyn Extractor,
    storage: &dyn Storage,
    options: &RunOptions,
) -> PipelineSummary {
    let mut ordered: Vec<Entity> = entities.to_vec();
    ordered.sort();
    ordered.dedup();

    let mut summary = PipelineSummary::default();
    let mut keys = KeyIndex::new();

    for (position, &entity) in ordered.iter().enumerate() {
        match run_entity(entity, extractor, storage, options).await {
            Ok((df, report)) => {
                if let Err(err) = keys.record(entity, &df) {
                    warn!(entity = entity.code(), error = %err, "failed to index keys");
                }
                summary.outcomes.push(EntityOutcome::Loaded {
                    entity,
                    destination: entity.destination_table(),
                    report,
                });
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(entity = entity.code(), error = %message, "entity failed");
                summary.outcomes.push(EntityOutcome::Failed {
                    entity,
                    error: message,
                });
                if options.policy == FailurePolicy::HaltOnFirstError {
                    summary.skipped = ordered[position + 1..].to_vec();
                    if !summary.skipped.is_empty() {
                        warn!(skipped = ?summary.skipped, "halting after first failure");
                    }
                    break;
                }
            }
        }
    }

    summary.integrity = keys.orphan_report();

    summary
}
