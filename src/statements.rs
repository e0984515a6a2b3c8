//! SQL text for the four tables, derived from the catalog.
//!
//! Upserts use `INSERT ... ON CONFLICT (key) DO UPDATE SET col = excluded.col`,
//! which SQLite and PostgreSQL both understand.
//!
//! Datetime columns take a second parameter, a stamp flag bound after all
//! column parameters. When it is set, a new row gets `CURRENT_TIMESTAMP` and
//! an existing row keeps its stored value.

use itertools::Itertools;

use crate::catalog::{ColumnDef, ColumnKind, Table};

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

fn column_list(table: Table) -> String {
    table.columns().iter().map(|c| quote(c.name)).join(", ")
}

fn is_stamped(column: &ColumnDef) -> bool {
    matches!(column.kind, ColumnKind::DateTime)
}

/// Parameter number of the stamp flag for the column at `idx`, if it has one.
fn stamp_flag(table: Table, idx: usize) -> Option<usize> {
    let columns = table.columns();
    is_stamped(&columns[idx]).then(|| {
        let earlier = columns[..idx].iter().filter(|c| is_stamped(c)).count();
        columns.len() + 1 + earlier
    })
}

fn placeholders(table: Table) -> String {
    (0..table.columns().len())
        .map(|idx| match stamp_flag(table, idx) {
            Some(flag) => format!(
                "CASE WHEN ?{flag} THEN CURRENT_TIMESTAMP ELSE ?{} END",
                idx + 1
            ),
            None => format!("?{}", idx + 1),
        })
        .join(", ")
}

/// Insert, or on primary-key conflict overwrite every non-key column.
/// A datetime column whose stamp flag is set keeps its stored value.
pub fn upsert(table: Table) -> String {
    let key = table.key_column().name;
    let updates = table
        .columns()
        .iter()
        .enumerate()
        .skip(1)
        .map(|(idx, c)| {
            let col = quote(c.name);
            match stamp_flag(table, idx) {
                Some(flag) => format!(
                    "{col} = CASE WHEN ?{flag} THEN {table}.{col} ELSE excluded.{col} END",
                    table = quote(table.as_str()),
                ),
                None => format!("{col} = excluded.{col}"),
            }
        })
        .join(", ");
    format!(
        "INSERT INTO {table} ({columns}) VALUES ({values}) ON CONFLICT ({key}) DO UPDATE SET {updates}",
        table = quote(table.as_str()),
        columns = column_list(table),
        values = placeholders(table),
        key = quote(key),
    )
}

/// Insert unless a row with the same key exists; existing rows are left untouched.
pub fn insert_if_absent(table: Table) -> String {
    format!(
        "INSERT INTO {table} ({columns}) VALUES ({values}) ON CONFLICT DO NOTHING",
        table = quote(table.as_str()),
        columns = column_list(table),
        values = placeholders(table),
    )
}

fn column_definition(column: &ColumnDef, is_key: bool) -> String {
    let name = quote(column.name);
    let body = match column.kind {
        ColumnKind::Key if is_key => "INTEGER PRIMARY KEY".to_string(),
        ColumnKind::Key => match column.references {
            Some(target) => format!(
                "INTEGER NOT NULL REFERENCES {} ({})",
                quote(target.as_str()),
                quote(target.key_column().name)
            ),
            None => "INTEGER NOT NULL".to_string(),
        },
        ColumnKind::Count => "INTEGER DEFAULT 0".to_string(),
        ColumnKind::Text {
            width,
            required: true,
        } => format!("VARCHAR({width}) NOT NULL"),
        ColumnKind::Text { width, .. } => format!("VARCHAR({width})"),
        ColumnKind::Date => "DATE".to_string(),
        ColumnKind::DateTime => "DATETIME DEFAULT CURRENT_TIMESTAMP".to_string(),
        ColumnKind::Status { width } => format!("VARCHAR({width}) DEFAULT 'Pending'"),
    };
    format!("{name} {body}")
}

pub fn create_table(table: Table) -> String {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| format!("    {}", column_definition(column, idx == 0)))
        .join(",\n");
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{columns}\n)",
        quote(table.as_str())
    )
}

pub fn next_key(table: Table) -> String {
    format!(
        "SELECT COALESCE(MAX({key}) + 1, 1) AS next_id FROM {table}",
        key = quote(table.key_column().name),
        table = quote(table.as_str()),
    )
}

pub fn row_count(table: Table) -> String {
    format!("SELECT COUNT(*) AS row_count FROM {}", quote(table.as_str()))
}

pub const LIST_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

pub const PING: &str = "SELECT 1 AS ok";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_upsert_updates_every_non_key_column() {
        assert_eq!(
            upsert(Table::Providers),
            "INSERT INTO \"providers\" (\"Provider_ID\", \"Name\", \"Type\", \"Address\", \"City\", \"Contact\") \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT (\"Provider_ID\") DO UPDATE SET \"Name\" = excluded.\"Name\", \
             \"Type\" = excluded.\"Type\", \"Address\" = excluded.\"Address\", \
             \"City\" = excluded.\"City\", \"Contact\" = excluded.\"Contact\""
        );
    }

    #[test]
    fn claim_timestamp_is_stamped_only_for_new_rows() {
        let sql = upsert(Table::Claims);
        assert!(sql.contains(
            "VALUES (?1, ?2, ?3, ?4, CASE WHEN ?6 THEN CURRENT_TIMESTAMP ELSE ?5 END)"
        ));
        assert!(sql.contains("ON CONFLICT (\"Claim_ID\")"));
        assert!(sql.contains(
            "\"Timestamp\" = CASE WHEN ?6 THEN \"claims\".\"Timestamp\" ELSE excluded.\"Timestamp\" END"
        ));
        assert!(!sql.contains("COALESCE"));
    }

    #[test]
    fn ddl_carries_keys_widths_and_defaults() {
        let ddl = create_table(Table::FoodListings);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"food_listings\""));
        assert!(ddl.contains("\"Food_ID\" INTEGER PRIMARY KEY"));
        assert!(ddl.contains("\"Food_Name\" VARCHAR(120) NOT NULL"));
        assert!(ddl.contains("\"Quantity\" INTEGER DEFAULT 0"));
        assert!(ddl.contains(
            "\"Provider_ID\" INTEGER NOT NULL REFERENCES \"providers\" (\"Provider_ID\")"
        ));

        let claims = create_table(Table::Claims);
        assert!(claims.contains("\"Status\" VARCHAR(20) DEFAULT 'Pending'"));
        assert!(claims.contains("\"Timestamp\" DATETIME DEFAULT CURRENT_TIMESTAMP"));
    }

    #[test]
    fn next_key_falls_back_to_one() {
        assert_eq!(
            next_key(Table::Claims),
            "SELECT COALESCE(MAX(\"Claim_ID\") + 1, 1) AS next_id FROM \"claims\""
        );
    }
}
