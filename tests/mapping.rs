use std::collections::BTreeSet;

use foodshare_ingest::{
    catalog::{SynonymCatalog, Table},
    mapping::{build_mapping, missing_required},
    rows::{CleanRow, RawRow, normalize_row},
};
use proptest::prelude::*;

fn all_synonyms() -> Vec<(Table, &'static str, &'static str)> {
    Table::ALL
        .into_iter()
        .flat_map(|table| {
            table.columns().iter().flat_map(move |column| {
                std::iter::once(column.name)
                    .chain(column.synonyms.iter().copied())
                    .map(move |synonym| (table, column.name, synonym))
            })
        })
        .collect()
}

fn all_columns() -> Vec<(Table, &'static str)> {
    Table::ALL
        .into_iter()
        .flat_map(|table| table.columns().iter().map(move |c| (table, c.name)))
        .collect()
}

/// Re-cases each character and sprinkles separators between them.
fn disguise(synonym: &str, upper: &[bool], separators: &[Option<char>]) -> String {
    let mut out = String::new();
    for (idx, ch) in synonym.chars().enumerate() {
        if upper.get(idx).copied().unwrap_or(false) {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        if let Some(Some(sep)) = separators.get(idx) {
            out.push(*sep);
        }
    }
    out
}

proptest! {
    #[test]
    fn header_matching_ignores_case_and_punctuation(
        (table, canonical, synonym) in prop::sample::select(all_synonyms()),
        upper in prop::collection::vec(any::<bool>(), 0..24),
        separators in prop::collection::vec(
            prop::option::of(prop::sample::select(vec![' ', '_', '-', '.', '/', '#'])),
            0..24
        ),
    ) {
        let catalog = SynonymCatalog::builtin(table).expect("catalog");
        let header = disguise(synonym, &upper, &separators);
        let mapping = build_mapping(&catalog, &[header.clone()]).expect("mapping");
        let mapped: Vec<_> = mapping.mapped().collect();
        prop_assert_eq!(mapped, vec![(header.as_str(), canonical)]);
    }

    #[test]
    fn missing_detection_names_exactly_the_dropped_column(
        (table, dropped) in prop::sample::select(all_columns()),
    ) {
        let present: BTreeSet<&str> = table
            .column_names()
            .into_iter()
            .filter(|name| *name != dropped)
            .collect();
        prop_assert_eq!(missing_required(table, &present), vec![dropped]);
    }

    #[test]
    fn text_is_cut_to_exactly_the_column_width(tail in "[a-zA-Z0-9éüß ]{0,240}") {
        let name = format!("x{}y", tail);
        let raw = RawRow::new(2).with("Receiver_ID", "1").with("Name", name.clone());
        let CleanRow::Receiver(row) = normalize_row(Table::Receivers, &raw).expect("clean row") else {
            panic!("expected a receiver row");
        };
        let length = name.chars().count();
        if length > 100 {
            prop_assert_eq!(row.name.chars().count(), 100);
            prop_assert!(name.starts_with(&row.name));
        } else {
            prop_assert_eq!(row.name, name);
        }
    }
}

#[test]
fn every_canonical_name_maps_to_itself() {
    for table in Table::ALL {
        let catalog = SynonymCatalog::builtin(table).expect("catalog");
        let headers: Vec<String> = table.column_names().iter().map(|n| n.to_string()).collect();
        let mapping = build_mapping(&catalog, &headers).expect("mapping");
        assert!(mapping.missing_required().is_empty(), "{table}");
        assert!(mapping.unmapped().is_empty(), "{table}");
    }
}
