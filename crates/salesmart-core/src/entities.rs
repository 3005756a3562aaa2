use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::cleaning::{self, CleanedTable, CleaningOptions};
use crate::error::{CleaningError, ConfigError};

/// The six tables the warehouse is built from. Declaration order is the
/// order a full run loads them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Users,
    Cards,
    Stores,
    Products,
    Orders,
    DateTimes,
}

impl Entity {
    pub fn all() -> &'static [Entity] {
        &[
            Entity::Users,
            Entity::Cards,
            Entity::Stores,
            Entity::Products,
            Entity::Orders,
            Entity::DateTimes,
        ]
    }

    pub fn code(&self) -> &'static str {
        match self {
            Entity::Users => "users",
            Entity::Cards => "cards",
            Entity::Stores => "stores",
            Entity::Products => "products",
            Entity::Orders => "orders",
            Entity::DateTimes => "date_times",
        }
    }

    pub fn destination_table(&self) -> &'static str {
        match self {
            Entity::Users => "dim_users",
            Entity::Cards => "dim_card_details",
            Entity::Stores => "dim_store_details",
            Entity::Products => "dim_products",
            Entity::Orders => "orders_table",
            Entity::DateTimes => "dim_date_times",
        }
    }

    /// Identifier columns of the cleaned table. The fact table's identifier
    /// is the composite of its foreign keys.
    pub fn identifier_columns(&self) -> &'static [&'static str] {
        match self {
            Entity::Users => &["user_uuid"],
            Entity::Cards => &["card_number"],
            Entity::Stores => &["store_code"],
            Entity::Products => &["product_code"],
            Entity::Orders => &[
                "date_uuid",
                "user_uuid",
                "card_number",
                "store_code",
                "product_code",
            ],
            Entity::DateTimes => &["date_uuid"],
        }
    }

    pub fn clean(
        &self,
        raw: &DataFrame,
        options: &CleaningOptions,
    ) -> Result<CleanedTable, CleaningError> {
        match self {
            Entity::Users => cleaning::clean_users(raw, options),
            Entity::Cards => cleaning::clean_cards(raw, options),
            Entity::Stores => cleaning::clean_stores(raw, options),
            Entity::Products => cleaning::clean_products(raw, options),
            Entity::Orders => cleaning::clean_orders(raw, options),
            Entity::DateTimes => cleaning::clean_date_times(raw, options),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Entity {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Entity::all()
            .iter()
            .copied()
            .find(|entity| entity.code() == value)
            .ok_or_else(|| ConfigError::UnknownEntity(value.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub entity: Entity,
    pub code: &'static str,
    pub destination_table: &'static str,
    pub source_kind: &'static str,
    pub description: &'static str,
}

static ENTITIES: Lazy<Vec<EntityDescriptor>> = Lazy::new(|| {
    let describe = |entity: Entity, source_kind: &'static str, description: &'static str| EntityDescriptor {
        entity,
        code: entity.code(),
        destination_table: entity.destination_table(),
        source_kind,
        description,
    };

    vec![
        describe(
            Entity::Users,
            "database_table",
            "Customer records from the legacy users table",
        ),
        describe(
            Entity::Cards,
            "local_file",
            "Payment cards converted from the card details document",
        ),
        describe(
            Entity::Stores,
            "store_api",
            "Store records fetched one by one from the store API",
        ),
        describe(
            Entity::Products,
            "object_store",
            "Product catalogue CSV held in object storage",
        ),
        describe(
            Entity::Orders,
            "database_table",
            "Order fact rows from the legacy orders table",
        ),
        describe(
            Entity::DateTimes,
            "http_json",
            "Sale timestamps published as a column-oriented JSON document",
        ),
    ]
});

pub fn all_entity_descriptors() -> &'static [EntityDescriptor] {
    ENTITIES.as_slice()
}
