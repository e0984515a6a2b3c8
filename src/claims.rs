//! One-off claim creation outside of CSV ingestion.
//!
//! `Claim_ID` is derived as `MAX(Claim_ID) + 1`. Two concurrent callers can
//! derive the same id; the later write then updates the earlier claim.

use log::info;

use crate::{
    catalog::Table,
    data::Value,
    error::StoreError,
    rows::{ClaimRow, ClaimStatus, ClaimTime, CleanRow},
    statements,
    store::{Connection, ConnectionProvider, with_connection},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewClaim {
    pub food_id: i64,
    pub receiver_id: i64,
    pub status: ClaimStatus,
}

pub fn next_claim_id<P: ConnectionProvider>(provider: &P) -> Result<i64, StoreError> {
    let records = with_connection(provider, |conn| {
        conn.query(&statements::next_key(Table::Claims), &[])
    })?;
    Ok(records
        .first()
        .and_then(|record| record.get("next_id"))
        .and_then(Value::as_integer)
        .unwrap_or(1))
}

/// Writes a claim stamped with the store's current time and returns it.
pub fn create_claim<P: ConnectionProvider>(
    provider: &P,
    claim: NewClaim,
) -> Result<ClaimRow, StoreError> {
    let row = ClaimRow {
        claim_id: next_claim_id(provider)?,
        food_id: claim.food_id,
        receiver_id: claim.receiver_id,
        status: claim.status.as_str().to_string(),
        timestamp: ClaimTime::Now,
    };
    let params = CleanRow::Claim(row.clone()).params();
    with_connection(provider, |conn| {
        conn.execute(&statements::upsert(Table::Claims), &params)
    })?;
    info!(
        "Created claim {} (food {}, receiver {})",
        row.claim_id, row.food_id, row.receiver_id
    );
    Ok(row)
}
