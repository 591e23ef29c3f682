use std::collections::BTreeMap;

use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AnchorRule, ElementMatcher};
use crate::parser::dom::{self, NodeKind};

/// One table: a header row plus data rows. Row widths are not reconciled
/// against the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// Every matching table in document order, empty ones excluded.
pub fn extract(root: ElementRef<'_>, matcher: &ElementMatcher) -> Vec<Table> {
    let found = matcher.find_all(root);
    debug!("Found {} tables", found.len());
    found
        .into_iter()
        .map(read_table)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Tables located by anchor rules. Rules that find nothing leave no entry.
pub fn extract_named(root: ElementRef<'_>, anchors: &BTreeMap<String, AnchorRule>) -> BTreeMap<String, Table> {
    let mut named = BTreeMap::new();
    for (name, rule) in anchors {
        match locate(root, rule).map(read_table) {
            Some(table) if !table.is_empty() => {
                named.insert(name.clone(), table);
            }
            Some(_) => debug!("Anchor {} located an empty table", name),
            None => debug!("Anchor {} located no table", name),
        }
    }
    named
}

pub fn locate<'a>(root: ElementRef<'a>, rule: &AnchorRule) -> Option<ElementRef<'a>> {
    match rule {
        AnchorRule::First { table } => table.find_first(root),
        AnchorRule::AfterHeading { heading, table } => {
            let heading = heading.find_first(root)?;
            table.find_after(root, heading)
        }
        AnchorRule::Within { container, table } => {
            let container = container.find_first(root)?;
            table.find_first(container)
        }
    }
}

/// Headers come from the first `<thead>` row when the table has one,
/// otherwise from the first row with any cells. Cell-less rows are skipped.
pub fn read_table(table: ElementRef<'_>) -> Table {
    let rows: Vec<ElementRef<'_>> = own_rows(table).collect();
    let has_thead = rows.iter().any(|r| in_thead(*r, table));

    let mut out = Table::default();
    let mut header_taken = false;
    for row in rows {
        let cells = row_cells(row);
        if cells.is_empty() {
            continue;
        }
        if !header_taken && (!has_thead || in_thead(row, table)) {
            out.headers = cells;
            header_taken = true;
        } else {
            out.rows.push(cells);
        }
    }
    out
}

/// Rows of `table` itself, leaving rows of nested tables out.
pub fn own_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    dom::elements(table)
        .filter(move |el| dom::classify(*el) == NodeKind::Row && dom::owned_by(*el, table, NodeKind::Table))
}

/// Text of the row's direct `<td>`/`<th>` children, blanks kept for position.
pub fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| dom::classify(*el) == NodeKind::Cell)
        .map(dom::text_of)
        .collect()
}

fn in_thead(row: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    dom::ancestors(row)
        .take_while(|a| !dom::same_node(*a, table))
        .any(|a| a.value().name() == "thead")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn tables(html: &str) -> Vec<Table> {
        let doc = Html::parse_document(html);
        extract(doc.root_element(), &ElementMatcher::tag("table"))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_row_and_data_rows() {
        let t = tables(
            "<table>
               <tr><th>Bank</th><th>Rate</th><th>Fee</th></tr>
               <tr><td>SBI</td><td>8.5%</td><td>0.35%</td></tr>
               <tr><td>HDFC</td><td>8.7%</td><td>0.5%</td></tr>
             </table>",
        );
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].headers, strings(&["Bank", "Rate", "Fee"]));
        assert_eq!(t[0].rows.len(), 2);
        assert_eq!(t[0].rows[0], strings(&["SBI", "8.5%", "0.35%"]));
        assert_eq!(t[0].rows[1][0], "HDFC");
    }

    #[test]
    fn thead_supplies_headers() {
        let t = tables(
            "<table>
               <thead><tr><th>Age</th><th>Limit</th></tr></thead>
               <tbody><tr><td>21</td><td>60</td></tr></tbody>
             </table>",
        );
        assert_eq!(t[0].headers, strings(&["Age", "Limit"]));
        assert_eq!(t[0].rows, vec![strings(&["21", "60"])]);
    }

    #[test]
    fn short_rows_kept_and_empty_rows_skipped() {
        let t = tables(
            "<table>
               <tr><th>A</th><th>B</th><th>C</th></tr>
               <tr></tr>
               <tr><td>only one</td></tr>
               <tr><td>1</td><td>2</td><td>3</td><td>4</td></tr>
             </table>",
        );
        assert_eq!(t[0].headers.len(), 3);
        assert_eq!(t[0].rows, vec![strings(&["only one"]), strings(&["1", "2", "3", "4"])]);
    }

    #[test]
    fn empty_table_excluded() {
        assert!(tables("<table><tr></tr></table><p>no data</p>").is_empty());
    }

    #[test]
    fn header_only_table_kept() {
        let t = tables("<table><tr><th>Lonely</th></tr></table>");
        assert_eq!(t.len(), 1);
        assert!(t[0].rows.is_empty());
    }

    #[test]
    fn nested_table_rows_stay_with_nested_table() {
        let t = tables(
            "<table>
               <tr><th>Outer</th></tr>
               <tr><td><table><tr><th>Inner</th></tr><tr><td>x</td></tr></table></td></tr>
             </table>",
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t[0].headers, strings(&["Outer"]));
        assert_eq!(t[0].rows.len(), 1);
        assert_eq!(t[1].headers, strings(&["Inner"]));
        assert_eq!(t[1].rows, vec![strings(&["x"])]);
    }

    #[test]
    fn class_scoped_matcher() {
        let doc = Html::parse_document(
            r#"<table class="plain"><tr><td>skip</td></tr></table>
               <table class="ui celled striped structured table"><tr><th>keep</th></tr></table>"#,
        );
        let m = ElementMatcher::tag("table").with_class("structured");
        let t = extract(doc.root_element(), &m);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].headers, strings(&["keep"]));
    }

    #[test]
    fn named_after_heading_and_within() {
        let doc = Html::parse_document(
            r#"<table><tr><th>Before</th></tr></table>
               <h2 id="home_loan_eligi_6">Eligibility</h2>
               <table><tr><th>Age</th></tr><tr><td>21-65</td></tr></table>
               <div class="hfm-table"><table><tr><th>HFM</th></tr></table></div>"#,
        );
        let anchors = BTreeMap::from([
            (
                "eligibility".to_string(),
                AnchorRule::AfterHeading {
                    heading: ElementMatcher::tag("h2").with_id("home_loan_eligi_6"),
                    table: ElementMatcher::tag("table"),
                },
            ),
            (
                "hfm".to_string(),
                AnchorRule::Within {
                    container: ElementMatcher::tag("div").with_class("hfm-table"),
                    table: ElementMatcher::tag("table"),
                },
            ),
        ]);
        let named = extract_named(doc.root_element(), &anchors);
        assert_eq!(named["eligibility"].headers, strings(&["Age"]));
        assert_eq!(named["eligibility"].rows, vec![strings(&["21-65"])]);
        assert_eq!(named["hfm"].headers, strings(&["HFM"]));
    }

    #[test]
    fn named_first_table() {
        let doc = Html::parse_document(
            r#"<table><tr><th>Plain</th></tr></table>
               <table class="rates"><tr><th>Bank</th></tr><tr><td>SBI</td></tr></table>
               <table class="rates"><tr><th>Later</th></tr></table>"#,
        );
        let anchors = BTreeMap::from([(
            "rates".to_string(),
            AnchorRule::First {
                table: ElementMatcher::tag("table").with_class("rates"),
            },
        )]);
        let named = extract_named(doc.root_element(), &anchors);
        assert_eq!(named.len(), 1);
        assert_eq!(named["rates"].headers, strings(&["Bank"]));
        assert_eq!(named["rates"].rows, vec![strings(&["SBI"])]);
    }

    #[test]
    fn missing_container_yields_no_entry() {
        let doc = Html::parse_document("<table><tr><th>x</th></tr></table>");
        let anchors = BTreeMap::from([(
            "hfm".to_string(),
            AnchorRule::Within {
                container: ElementMatcher::tag("div").with_class("hfm-table"),
                table: ElementMatcher::tag("table"),
            },
        )]);
        assert!(extract_named(doc.root_element(), &anchors).is_empty());
    }
}
