//! Per-table row cleaning.
//!
//! [`normalize_row()`] turns a [`RawRow`] (canonical column name to raw cell
//! text) into a typed [`CleanRow`]. Coercion happens once here so the upserter
//! only ever binds typed values:
//!
//! - null markers (`""`, `NaN`, `NaT`, `None`, `null`, `N/A`) become null,
//! - identifier columns must hold a non-negative integer or the row is rejected,
//! - `Quantity` falls back to 0,
//! - text is truncated to the column width,
//! - dates and datetimes that do not parse become null,
//! - a missing claim `Timestamp` asks the store to stamp new rows,
//! - `Status` defaults to `Pending`.

use std::{collections::BTreeMap, fmt, str::FromStr};

use anyhow::anyhow;
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use serde::Serialize;

use crate::{
    catalog::{ColumnKind, Table},
    data::{Value, clean_cell, parse_integer, parse_naive_date, parse_naive_datetime, truncate},
    error::RowCoercionError,
};

/// Raw cells of one source record keyed by canonical column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub line: u64,
    cells: BTreeMap<&'static str, String>,
}

impl RawRow {
    pub fn new(line: u64) -> Self {
        Self {
            line,
            cells: BTreeMap::new(),
        }
    }

    pub fn with(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &'static str, value: impl Into<String>) {
        self.cells.insert(column, value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClaimStatus {
    Pending,
    Completed,
    Cancelled,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "Pending",
            ClaimStatus::Completed => "Completed",
            ClaimStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ClaimStatus::Pending),
            "completed" | "complete" => Ok(ClaimStatus::Completed),
            "cancelled" | "canceled" => Ok(ClaimStatus::Cancelled),
            other => Err(anyhow!("Unknown claim status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderRow {
    pub provider_id: i64,
    pub name: String,
    pub kind: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverRow {
    pub receiver_id: i64,
    pub name: String,
    pub kind: Option<String>,
    pub city: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoodListingRow {
    pub food_id: i64,
    pub food_name: String,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    pub provider_id: i64,
    pub provider_type: Option<String>,
    pub location: Option<String>,
    pub food_type: Option<String>,
    pub meal_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimRow {
    pub claim_id: i64,
    pub food_id: i64,
    pub receiver_id: i64,
    pub status: String,
    pub timestamp: ClaimTime,
}

/// What a claim row says about its `Timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClaimTime {
    /// No value: a new row gets the store's current time, an existing row keeps its own.
    Now,
    /// A value that is not a datetime; stored as null.
    Unknown,
    At(NaiveDateTime),
}

impl ClaimTime {
    pub fn value(&self) -> Value {
        match self {
            ClaimTime::At(at) => (*at).into(),
            ClaimTime::Now | ClaimTime::Unknown => Value::Null,
        }
    }

    fn stamp_flag(&self) -> Value {
        Value::Integer(i64::from(matches!(self, ClaimTime::Now)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CleanRow {
    Provider(ProviderRow),
    Receiver(ReceiverRow),
    FoodListing(FoodListingRow),
    Claim(ClaimRow),
}

impl CleanRow {
    pub fn table(&self) -> Table {
        match self {
            CleanRow::Provider(_) => Table::Providers,
            CleanRow::Receiver(_) => Table::Receivers,
            CleanRow::FoodListing(_) => Table::FoodListings,
            CleanRow::Claim(_) => Table::Claims,
        }
    }

    pub fn key(&self) -> i64 {
        match self {
            CleanRow::Provider(row) => row.provider_id,
            CleanRow::Receiver(row) => row.receiver_id,
            CleanRow::FoodListing(row) => row.food_id,
            CleanRow::Claim(row) => row.claim_id,
        }
    }

    /// Bind parameters in the table's canonical column order, followed by one
    /// stamp flag per datetime column (see [`statements::upsert`]).
    ///
    /// [`statements::upsert`]: crate::statements::upsert
    pub fn params(&self) -> Vec<Value> {
        match self {
            CleanRow::Provider(row) => vec![
                row.provider_id.into(),
                row.name.clone().into(),
                row.kind.clone().into(),
                row.address.clone().into(),
                row.city.clone().into(),
                row.contact.clone().into(),
            ],
            CleanRow::Receiver(row) => vec![
                row.receiver_id.into(),
                row.name.clone().into(),
                row.kind.clone().into(),
                row.city.clone().into(),
                row.contact.clone().into(),
            ],
            CleanRow::FoodListing(row) => vec![
                row.food_id.into(),
                row.food_name.clone().into(),
                row.quantity.into(),
                row.expiry_date.into(),
                row.provider_id.into(),
                row.provider_type.clone().into(),
                row.location.clone().into(),
                row.food_type.clone().into(),
                row.meal_type.clone().into(),
            ],
            CleanRow::Claim(row) => vec![
                row.claim_id.into(),
                row.food_id.into(),
                row.receiver_id.into(),
                row.status.clone().into(),
                row.timestamp.value(),
                row.timestamp.stamp_flag(),
            ],
        }
    }
}

pub fn normalize_row(table: Table, raw: &RawRow) -> Result<CleanRow, RowCoercionError> {
    let mut cells = Cells {
        table,
        raw,
        key: None,
    };
    let row = match table {
        Table::Providers => CleanRow::Provider(ProviderRow {
            provider_id: cells.primary_key("Provider_ID")?,
            name: cells.required_text("Name")?,
            kind: cells.text("Type"),
            address: cells.text("Address"),
            city: cells.text("City"),
            contact: cells.text("Contact"),
        }),
        Table::Receivers => CleanRow::Receiver(ReceiverRow {
            receiver_id: cells.primary_key("Receiver_ID")?,
            name: cells.required_text("Name")?,
            kind: cells.text("Type"),
            city: cells.text("City"),
            contact: cells.text("Contact"),
        }),
        Table::FoodListings => CleanRow::FoodListing(FoodListingRow {
            food_id: cells.primary_key("Food_ID")?,
            food_name: cells.required_text("Food_Name")?,
            quantity: cells.count("Quantity"),
            expiry_date: cells.date("Expiry_Date"),
            provider_id: cells.identifier("Provider_ID")?,
            provider_type: cells.text("Provider_Type"),
            location: cells.text("Location"),
            food_type: cells.text("Food_Type"),
            meal_type: cells.text("Meal_Type"),
        }),
        Table::Claims => CleanRow::Claim(ClaimRow {
            claim_id: cells.primary_key("Claim_ID")?,
            food_id: cells.identifier("Food_ID")?,
            receiver_id: cells.identifier("Receiver_ID")?,
            status: cells.status("Status"),
            timestamp: cells.claim_time("Timestamp"),
        }),
    };
    Ok(row)
}

struct Cells<'a> {
    table: Table,
    raw: &'a RawRow,
    key: Option<i64>,
}

impl Cells<'_> {
    fn cell(&self, column: &str) -> Option<&str> {
        clean_cell(self.raw.get(column))
    }

    fn reject(&self, column: &'static str, reason: &str) -> RowCoercionError {
        RowCoercionError {
            line: self.raw.line,
            key: self.key,
            column,
            value: self.raw.get(column).map(str::to_string),
            reason: reason.to_string(),
        }
    }

    fn primary_key(&mut self, column: &'static str) -> Result<i64, RowCoercionError> {
        let key = self.identifier(column)?;
        self.key = Some(key);
        Ok(key)
    }

    fn identifier(&self, column: &'static str) -> Result<i64, RowCoercionError> {
        let raw = self
            .cell(column)
            .ok_or_else(|| self.reject(column, "is empty"))?;
        let parsed = parse_integer(raw).map_err(|_| self.reject(column, "is not an integer"))?;
        if parsed < 0 {
            return Err(self.reject(column, "must not be negative"));
        }
        Ok(parsed)
    }

    fn width(&self, column: &str) -> Option<usize> {
        match self.table.column(column).map(|def| def.kind) {
            Some(ColumnKind::Text { width, .. }) | Some(ColumnKind::Status { width }) => {
                Some(width)
            }
            _ => None,
        }
    }

    fn text(&self, column: &str) -> Option<String> {
        let value = self.cell(column)?;
        Some(match self.width(column) {
            Some(width) => truncate(value, width),
            None => value.to_string(),
        })
    }

    fn required_text(&self, column: &'static str) -> Result<String, RowCoercionError> {
        self.text(column)
            .ok_or_else(|| self.reject(column, "is required"))
    }

    fn count(&self, column: &str) -> i64 {
        let Some(raw) = self.cell(column) else {
            return 0;
        };
        match parse_integer(raw) {
            Ok(parsed) if parsed >= 0 => parsed,
            _ => {
                debug!(
                    "{} line {}: {column} '{raw}' defaulted to 0",
                    self.table, self.raw.line
                );
                0
            }
        }
    }

    fn date(&self, column: &str) -> Option<NaiveDate> {
        let raw = self.cell(column)?;
        match parse_naive_date(raw) {
            Ok(date) => Some(date),
            Err(err) => {
                debug!("{} line {}: {err}; storing null", self.table, self.raw.line);
                None
            }
        }
    }

    fn claim_time(&self, column: &str) -> ClaimTime {
        let Some(raw) = self.cell(column) else {
            return ClaimTime::Now;
        };
        match parse_naive_datetime(raw) {
            Ok(parsed) => ClaimTime::At(parsed),
            Err(err) => {
                debug!("{} line {}: {err}; storing null", self.table, self.raw.line);
                ClaimTime::Unknown
            }
        }
    }

    fn status(&self, column: &str) -> String {
        match self.cell(column) {
            None => ClaimStatus::Pending.as_str().to_string(),
            Some(raw) => match raw.parse::<ClaimStatus>() {
                Ok(status) => status.as_str().to_string(),
                Err(_) => self.text(column).unwrap_or_else(|| raw.to_string()),
            },
        }
    }
}
