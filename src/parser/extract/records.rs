use std::collections::BTreeMap;

use scraper::ElementRef;
use tracing::debug;

use super::tables;
use crate::config::{ElementMatcher, RecordRule};
use crate::parser::dom;

/// Field name → text.
pub type Record = BTreeMap<String, String>;

/// Records per rule name. Rules that produce nothing leave no entry.
pub fn extract(root: ElementRef<'_>, rules: &BTreeMap<String, RecordRule>) -> BTreeMap<String, Vec<Record>> {
    let mut out = BTreeMap::new();
    for (name, rule) in rules {
        let records = match rule {
            RecordRule::Cards {
                container,
                fields,
                constants,
            } => cards(root, container, fields, constants),
            RecordRule::TableRows {
                table,
                columns,
                skip_header,
            } => table_rows(root, table, columns, *skip_header),
        };
        if records.is_empty() {
            debug!("Record rule {} produced nothing", name);
            continue;
        }
        out.insert(name.clone(), records);
    }
    out
}

/// One record per matching container. A card missing any field is skipped.
pub fn cards(
    root: ElementRef<'_>,
    container: &ElementMatcher,
    fields: &BTreeMap<String, ElementMatcher>,
    constants: &BTreeMap<String, String>,
) -> Vec<Record> {
    let found = container.find_all(root);
    debug!("Found {} cards", found.len());
    found
        .into_iter()
        .filter_map(|card| read_card(card, fields, constants))
        .collect()
}

fn read_card(
    card: ElementRef<'_>,
    fields: &BTreeMap<String, ElementMatcher>,
    constants: &BTreeMap<String, String>,
) -> Option<Record> {
    let mut record = constants.clone();
    for (name, matcher) in fields {
        let Some(el) = matcher.find_first(card) else {
            debug!("Card is missing field {:?}, skipping it", name);
            return None;
        };
        record.insert(name.clone(), dom::text_of(el));
    }
    Some(record)
}

/// Rows of the first matching table labelled by `columns`. Rows shorter than
/// `columns` are skipped, extra cells ignored.
pub fn table_rows(root: ElementRef<'_>, table: &ElementMatcher, columns: &[String], skip_header: bool) -> Vec<Record> {
    let Some(table) = table.find_first(root) else {
        debug!("No table for row records");
        return Vec::new();
    };

    tables::own_rows(table)
        .skip(usize::from(skip_header))
        .map(tables::row_cells)
        .filter(|cells| cells.len() >= columns.len())
        .map(|cells| columns.iter().cloned().zip(cells).collect())
        .collect()
}

// ── Tests ──
