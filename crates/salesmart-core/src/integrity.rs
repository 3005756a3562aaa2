//! Foreign-key shape report for the cleaned fact table. Nothing here filters
//! rows; unresolved keys are logged and counted so a load can be judged
//! before the database enforces constraints.

use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::entities::Entity;

/// Fact column, owning dimension, and that dimension's identifier column.
pub const ORDER_FOREIGN_KEYS: &[(&str, Entity, &str)] = &[
    ("date_uuid", Entity::DateTimes, "date_uuid"),
    ("user_uuid", Entity::Users, "user_uuid"),
    ("card_number", Entity::Cards, "card_number"),
    ("store_code", Entity::Stores, "store_code"),
    ("product_code", Entity::Products, "product_code"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyCheck {
    pub column: &'static str,
    pub dimension: Entity,
    pub distinct_keys: usize,
    pub orphans: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrphanReport {
    pub checks: Vec<ForeignKeyCheck>,
}

impl OrphanReport {
    pub fn orphans(&self, column: &str) -> Option<usize> {
        self.checks
            .iter()
            .find(|check| check.column == column)
            .map(|check| check.orphans)
    }

    pub fn total_orphans(&self) -> usize {
        self.checks.iter().map(|check| check.orphans).sum()
    }
}

fn distinct_text(df: &DataFrame, column: &str) -> PolarsResult<HashSet<String>> {
    let as_text = df.column(column)?.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}

/// Distinct key values gathered from cleaned tables as they are loaded. Only
/// the key sets are retained, never the tables themselves.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    order_keys: Option<BTreeMap<&'static str, HashSet<String>>>,
    dimension_keys: BTreeMap<Entity, HashSet<String>>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the keys `entity` contributes to the order foreign-key checks.
    pub fn record(&mut self, entity: Entity, cleaned: &DataFrame) -> PolarsResult<()> {
        if entity == Entity::Orders {
            let mut keys = BTreeMap::new();
            for &(column, _, _) in ORDER_FOREIGN_KEYS {
                keys.insert(column, distinct_text(cleaned, column)?);
            }
            self.order_keys = Some(keys);
            return Ok(());
        }

        if let Some(&(_, _, identifier)) = ORDER_FOREIGN_KEYS
            .iter()
            .find(|(_, dimension, _)| *dimension == entity)
        {
            self.dimension_keys
                .insert(entity, distinct_text(cleaned, identifier)?);
        }
        Ok(())
    }

    /// Counts, per foreign key of the orders table, the distinct values with
    /// no match in the owning dimension. `None` until orders are recorded;
    /// dimensions never recorded are skipped.
    pub fn orphan_report(&self) -> Option<OrphanReport> {
        let order_keys = self.order_keys.as_ref()?;
        let mut report = OrphanReport::default();

        for &(column, dimension, _) in ORDER_FOREIGN_KEYS {
            let (Some(keys), Some(known)) =
                (order_keys.get(column), self.dimension_keys.get(&dimension))
            else {
                continue;
            };
            let orphans = keys.difference(known).count();

            if orphans > 0 {
                warn!(
                    column,
                    dimension = dimension.destination_table(),
                    orphans,
                    "order foreign keys do not resolve"
                );
            }

            report.checks.push(ForeignKeyCheck {
                column,
                dimension,
                distinct_keys: keys.len(),
                orphans,
            });
        }

        Some(report)
    }
}
