pub mod bullets;
pub mod faqs;
pub mod records;
pub mod tables;

use std::collections::BTreeMap;

use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use super::sections::{self, KeywordSet};
use crate::config::ExtractorConfig;

pub use faqs::FaqEntry;
pub use records::Record;
pub use tables::Table;

/// Everything extracted from one page. Every key is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub general_tables: Vec<Table>,
    pub bullet_points: BTreeMap<String, Vec<String>>,
    pub named_tables: BTreeMap<String, Table>,
    pub sections: BTreeMap<String, Vec<String>>,
    pub faqs: Vec<FaqEntry>,
    #[serde(default)]
    pub records: BTreeMap<String, Vec<Record>>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.general_tables.is_empty()
            && self.bullet_points.is_empty()
            && self.named_tables.is_empty()
            && self.sections.is_empty()
            && self.faqs.is_empty()
            && self.records.is_empty()
    }
}

/// Run every extractor over the same tree. None of them sees another's output.
pub fn extract_all(root: ElementRef<'_>, config: &ExtractorConfig) -> ExtractionResult {
    let keywords = KeywordSet::new(&config.section_keywords);

    ExtractionResult {
        general_tables: tables::extract(root, &config.table),
        bullet_points: bullets::categorize(
            root,
            &config.bullet_list,
            &config.category_levels,
            &config.category_fallback,
        ),
        named_tables: tables::extract_named(root, &config.named_anchors),
        sections: sections::extract_sections(root, &keywords, &config.section_levels),
        faqs: faqs::extract(root, &config.faq),
        records: records::extract(root, &config.records),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use scraper::Html;

    fn run(html: &str, config: &ExtractorConfig) -> ExtractionResult {
        let doc = Html::parse_document(html);
        extract_all(doc.root_element(), config)
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_page_has_every_key_empty() {
        let result = run("<p>Just words.</p><div>More words.</div>", &ExtractorConfig::default());
        assert!(result.is_empty());

        let json = serde_json::to_value(&result).unwrap();
        for key in ["general_tables", "bullet_points", "named_tables", "sections", "faqs", "records"] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(json["general_tables"], serde_json::json!([]));
        assert_eq!(json["bullet_points"], serde_json::json!({}));
    }

    #[test]
    fn empty_document() {
        assert!(run("", &ExtractorConfig::default()).is_empty());
    }

    #[test]
    fn aggregation_is_repeatable() {
        let html = fixture("home_loan");
        let doc = Html::parse_document(&html);
        let config = ExtractorConfig::preset(Preset::HomeLoan);
        let first = extract_all(doc.root_element(), &config);
        let second = extract_all(doc.root_element(), &config);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn home_loan_fixture_generic() {
        let result = run(&fixture("home_loan"), &ExtractorConfig::default());

        assert_eq!(result.general_tables.len(), 4);
        assert_eq!(result.general_tables[0].headers, strings(&["Bank", "Interest Rate", "Processing Fee"]));
        assert_eq!(result.general_tables[0].rows.len(), 3);
        assert_eq!(result.general_tables[0].rows[2], strings(&["Axis Bank", "8.75%"]));

        assert_eq!(
            result.sections["Home Loan Eligibility"],
            strings(&["Age between 21 and 65 years.", "See the table below."])
        );
        assert_eq!(
            result.sections["Documents Required"],
            strings(&["Address proof", "Salary slips"])
        );
        assert_eq!(
            result.sections["Features and Benefits"],
            strings(&["Tax benefits on principal and interest", "Long repayment tenure"])
        );
        assert!(!result.sections.contains_key("Home Loan Interest Rates"));

        assert_eq!(result.named_tables["eligibility"].headers, strings(&["Age", "Income"]));

        assert_eq!(
            result.bullet_points["Documents Required"],
            strings(&["Address proof", "Salary slips"])
        );
        assert_eq!(result.bullet_points["Miscellaneous"], strings(&["Compare", "Apply"]));

        assert_eq!(result.faqs.len(), 2);
        assert_eq!(result.faqs[0].question, "What is the maximum tenure?");
        assert_eq!(result.faqs[1].answer, "Yes, most banks allow it.");
        assert!(result.records.is_empty());
    }

    #[test]
    fn home_loan_fixture_preset() {
        let result = run(&fixture("home_loan"), &ExtractorConfig::preset(Preset::HomeLoan));

        // Only the structured tables match the preset's table matcher.
        assert_eq!(result.general_tables.len(), 3);
        assert_eq!(result.named_tables.len(), 2);
        assert_eq!(result.named_tables["home_loan_eligibility"].headers, strings(&["Age", "Income"]));
        assert_eq!(result.named_tables["hfm_table"].headers, strings(&["Lender", "Max Funding"]));
        assert_eq!(result.named_tables["hfm_table"].rows, vec![strings(&["SBI", "90%"])]);

        // Only "ui list" bullets, categorized by h2 only.
        assert_eq!(result.bullet_points.len(), 1);
        assert_eq!(
            result.bullet_points["Features and Benefits"],
            strings(&["Tax benefits on principal and interest", "Long repayment tenure"])
        );
    }
}
