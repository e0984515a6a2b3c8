//! Schema initialisation and store housekeeping.

use chrono::{Days, NaiveDate};
use log::{info, warn};
use serde::Serialize;

use crate::{
    catalog::Table,
    data::Value,
    error::StoreError,
    rows::{ClaimRow, ClaimTime, CleanRow, FoodListingRow, ProviderRow, ReceiverRow},
    statements,
    store::{Connection, ConnectionProvider, with_connection},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SchemaStatus {
    Ready,
    /// Setup failed; the caller may carry on and retry later.
    Deferred { reason: String },
}

impl SchemaStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SchemaStatus::Ready)
    }
}

/// Creates the four tables if they are absent. Safe to call on every start.
///
/// Failures (including an unreachable store) are logged as warnings and
/// returned as [`SchemaStatus::Deferred`] rather than as an error.
pub fn ensure_schema<P: ConnectionProvider>(provider: &P) -> SchemaStatus {
    let result = with_connection(provider, |conn| {
        for table in Table::ALL {
            conn.execute(&statements::create_table(table), &[])?;
        }
        Ok(())
    });
    match result {
        Ok(()) => {
            info!("Schema ready ({} tables)", Table::ALL.len());
            SchemaStatus::Ready
        }
        Err(err) => {
            warn!("Schema setup deferred: {err}");
            SchemaStatus::Deferred {
                reason: err.to_string(),
            }
        }
    }
}

pub fn existing_tables<P: ConnectionProvider>(provider: &P) -> Result<Vec<String>, StoreError> {
    let records = with_connection(provider, |conn| conn.query(statements::LIST_TABLES, &[]))?;
    Ok(records
        .iter()
        .filter_map(|record| record.first().and_then(Value::as_text).map(str::to_string))
        .collect())
}

pub fn row_count<P: ConnectionProvider>(provider: &P, table: Table) -> Result<i64, StoreError> {
    let records = with_connection(provider, |conn| {
        conn.query(&statements::row_count(table), &[])
    })?;
    Ok(records
        .first()
        .and_then(|record| record.first())
        .and_then(Value::as_integer)
        .unwrap_or_default())
}

pub fn check_connection<P: ConnectionProvider>(provider: &P) -> Result<(), StoreError> {
    let records = with_connection(provider, |conn| conn.query(statements::PING, &[]))?;
    match records.first().and_then(|record| record.first()) {
        Some(Value::Integer(1)) => Ok(()),
        other => Err(StoreError::Rejected(format!(
            "connection test returned {other:?}"
        ))),
    }
}

/// A minimal linked data set: one provider, receiver, listing and claim.
pub fn sample_rows(today: NaiveDate) -> Vec<CleanRow> {
    vec![
        CleanRow::Provider(ProviderRow {
            provider_id: 1,
            name: "Food Bank".to_string(),
            kind: Some("NGO".to_string()),
            address: Some("123 Main".to_string()),
            city: Some("Delhi".to_string()),
            contact: Some("+911234567890".to_string()),
        }),
        CleanRow::Receiver(ReceiverRow {
            receiver_id: 1,
            name: "Shelter A".to_string(),
            kind: Some("NGO".to_string()),
            city: Some("Delhi".to_string()),
            contact: Some("+911111111111".to_string()),
        }),
        CleanRow::FoodListing(FoodListingRow {
            food_id: 1,
            food_name: "Veg Meals".to_string(),
            quantity: 20,
            expiry_date: today.checked_add_days(Days::new(2)),
            provider_id: 1,
            provider_type: Some("NGO".to_string()),
            location: Some("Delhi".to_string()),
            food_type: Some("Cooked".to_string()),
            meal_type: Some("Lunch".to_string()),
        }),
        CleanRow::Claim(ClaimRow {
            claim_id: 1,
            food_id: 1,
            receiver_id: 1,
            status: "Pending".to_string(),
            timestamp: ClaimTime::Now,
        }),
    ]
}

/// Inserts [`sample_rows`] without overwriting rows that already exist.
/// Returns how many rows were actually inserted.
pub fn seed_sample_rows<P: ConnectionProvider>(
    provider: &P,
    today: NaiveDate,
) -> Result<u64, StoreError> {
    let rows = sample_rows(today);
    with_connection(provider, |conn| {
        let mut inserted = 0;
        for row in &rows {
            inserted += conn.execute(&statements::insert_if_absent(row.table()), &row.params())?;
        }
        Ok(inserted)
    })
}
