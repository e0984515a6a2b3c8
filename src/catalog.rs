//! Canonical schemas for the four target tables.
//!
//! Each table lists its columns in write order together with the synonyms a
//! source file may use for them and the kind of coercion the normaliser
//! applies. [`SynonymCatalog`] turns those lists into a reverse index keyed by
//! normalised header.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{error::MappingError, header::normalize_header};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Providers,
    Receivers,
    FoodListings,
    Claims,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Providers,
        Table::Receivers,
        Table::FoodListings,
        Table::Claims,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Providers => "providers",
            Table::Receivers => "receivers",
            Table::FoodListings => "food_listings",
            Table::Claims => "claims",
        }
    }

    pub fn columns(&self) -> &'static [ColumnDef] {
        match self {
            Table::Providers => PROVIDER_COLUMNS,
            Table::Receivers => RECEIVER_COLUMNS,
            Table::FoodListings => FOOD_LISTING_COLUMNS,
            Table::Claims => CLAIM_COLUMNS,
        }
    }

    /// The primary key is always the first column.
    pub fn key_column(&self) -> &'static ColumnDef {
        &self.columns()[0]
    }

    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns().iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns().iter().map(|column| column.name).collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_header(value);
        Table::ALL
            .into_iter()
            .find(|table| normalize_header(table.as_str()) == wanted)
            .ok_or_else(|| {
                anyhow!(
                    "Unknown table '{value}'. Expected one of: {}",
                    Table::ALL.map(|t| t.as_str()).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Non-negative integer identifier. A bad value rejects the row.
    Key,
    /// Non-negative count, defaulting to 0.
    Count,
    Text { width: usize, required: bool },
    Date,
    DateTime,
    Status { width: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub synonyms: &'static [&'static str],
    /// Foreign key target, if any.
    pub references: Option<Table>,
}

const fn key(name: &'static str, synonyms: &'static [&'static str]) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Key,
        synonyms,
        references: None,
    }
}

const fn foreign(
    name: &'static str,
    synonyms: &'static [&'static str],
    target: Table,
) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Key,
        synonyms,
        references: Some(target),
    }
}

const fn text(name: &'static str, width: usize, synonyms: &'static [&'static str]) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Text {
            width,
            required: false,
        },
        synonyms,
        references: None,
    }
}

const fn required_text(
    name: &'static str,
    width: usize,
    synonyms: &'static [&'static str],
) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Text {
            width,
            required: true,
        },
        synonyms,
        references: None,
    }
}

const fn typed(name: &'static str, kind: ColumnKind, synonyms: &'static [&'static str]) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        synonyms,
        references: None,
    }
}

const CONTACT_SYNONYMS: &[&str] = &[
    "contact",
    "phone",
    "phone_number",
    "phonenumber",
    "contactnumber",
    "email",
];

const PROVIDER_COLUMNS: &[ColumnDef] = &[
    key("Provider_ID", &["provider_id", "providerid", "id"]),
    required_text("Name", 100, &["name", "providername"]),
    text("Type", 50, &["type", "providertype"]),
    text("Address", 255, &["address", "addr", "street"]),
    text("City", 100, &["city", "locationcity"]),
    text("Contact", 100, CONTACT_SYNONYMS),
];

const RECEIVER_COLUMNS: &[ColumnDef] = &[
    key("Receiver_ID", &["receiver_id", "receiverid", "id"]),
    required_text("Name", 100, &["name", "receivername"]),
    text("Type", 50, &["type"]),
    text("City", 100, &["city"]),
    text("Contact", 100, CONTACT_SYNONYMS),
];

const FOOD_LISTING_COLUMNS: &[ColumnDef] = &[
    key("Food_ID", &["food_id", "foodid", "id"]),
    required_text("Food_Name", 120, &["food_name", "foodname", "name"]),
    typed("Quantity", ColumnKind::Count, &["quantity", "qty", "count"]),
    typed(
        "Expiry_Date",
        ColumnKind::Date,
        &["expiry_date", "expiredate", "expdate", "expiry"],
    ),
    foreign("Provider_ID", &["provider_id", "providerid"], Table::Providers),
    text("Provider_Type", 50, &["provider_type", "providertype", "type"]),
    text("Location", 100, &["location", "city", "area"]),
    text("Food_Type", 50, &["food_type", "foodtype", "category"]),
    text("Meal_Type", 50, &["meal_type", "mealtype"]),
];

const CLAIM_COLUMNS: &[ColumnDef] = &[
    key("Claim_ID", &["claim_id", "claimid", "id"]),
    foreign("Food_ID", &["food_id", "foodid"], Table::FoodListings),
    foreign("Receiver_ID", &["receiver_id", "receiverid"], Table::Receivers),
    typed("Status", ColumnKind::Status { width: 20 }, &["status"]),
    typed(
        "Timestamp",
        ColumnKind::DateTime,
        &["timestamp", "created_at", "createdat", "time"],
    ),
];

/// Extra synonyms keyed by canonical column name.
pub type SynonymOverrides = BTreeMap<String, Vec<String>>;

/// Reverse index from normalised synonym to canonical column for one table.
#[derive(Debug, Clone)]
pub struct SynonymCatalog {
    table: Table,
    index: HashMap<String, &'static str>,
}

impl SynonymCatalog {
    pub fn builtin(table: Table) -> Result<Self, MappingError> {
        Self::with_overrides(table, &SynonymOverrides::new())
    }

    /// Builds the index from the built-in synonyms plus `extra`. A normalised
    /// synonym claimed by two different columns is rejected.
    pub fn with_overrides(table: Table, extra: &SynonymOverrides) -> Result<Self, MappingError> {
        for column in extra.keys() {
            if table.column(column).is_none() {
                return Err(MappingError::UnknownColumn {
                    table,
                    column: column.clone(),
                });
            }
        }

        let mut index: HashMap<String, &'static str> = HashMap::new();
        for column in table.columns() {
            let added = extra.get(column.name).map(Vec::as_slice).unwrap_or_default();
            let candidates = std::iter::once(column.name)
                .chain(column.synonyms.iter().copied())
                .chain(added.iter().map(String::as_str));
            for synonym in candidates {
                let normalized = normalize_header(synonym);
                if normalized.is_empty() {
                    continue;
                }
                if let Some(existing) = index.get(&normalized).copied() {
                    if existing != column.name {
                        return Err(MappingError::SynonymCollision {
                            table,
                            synonym: synonym.to_string(),
                            first: existing,
                            second: column.name,
                        });
                    }
                    continue;
                }
                index.insert(normalized, column.name);
            }
        }
        Ok(Self { table, index })
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Canonical column for a raw header, if any synonym matches.
    pub fn resolve(&self, raw_header: &str) -> Option<&'static str> {
        self.index.get(&normalize_header(raw_header)).copied()
    }
}
