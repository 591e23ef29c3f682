use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Structural predicate over one element. Every populated field must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementMatcher {
    /// Any of these tag names (lowercase). Empty matches every tag.
    pub tags: Vec<String>,
    pub id: Option<String>,
    /// Class tokens that must all be present.
    pub classes: Vec<String>,
    /// Attributes that must be present with exactly this value.
    pub attrs: BTreeMap<String, String>,
    /// Attributes that must be present and contain this substring.
    pub attr_contains: BTreeMap<String, String>,
    /// Case-insensitive substring of the element's normalized text.
    pub text_contains: Option<String>,
    /// Some ancestor must match this.
    pub within: Option<Box<ElementMatcher>>,
    /// No ancestor may match any of these.
    pub not_within: Vec<ElementMatcher>,
}

impl ElementMatcher {
    pub fn tag(name: &str) -> Self {
        Self {
            tags: vec![name.to_string()],
            ..Default::default()
        }
    }

    pub fn tags(names: &[&str]) -> Self {
        Self {
            tags: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, needle: &str) -> Self {
        self.text_contains = Some(needle.to_string());
        self
    }

    pub fn within(mut self, ancestor: ElementMatcher) -> Self {
        self.within = Some(Box::new(ancestor));
        self
    }

    pub fn not_within(mut self, ancestor: ElementMatcher) -> Self {
        self.not_within.push(ancestor);
        self
    }

    fn validate(&self, at: &str) -> Result<()> {
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            bail!("{at}: empty tag name in matcher");
        }
        if self.classes.iter().any(|c| c.split_whitespace().count() != 1) {
            bail!("{at}: class entries must be single tokens, got {:?}", self.classes);
        }
        if let Some(inner) = &self.within {
            inner.validate(&format!("{at}.within"))?;
        }
        for (i, m) in self.not_within.iter().enumerate() {
            m.validate(&format!("{at}.not_within[{i}]"))?;
        }
        Ok(())
    }
}

/// Locates one well-known table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnchorRule {
    /// First matching table anywhere.
    First { table: ElementMatcher },
    /// First matching table after the first matching heading, in document order.
    AfterHeading {
        heading: ElementMatcher,
        table: ElementMatcher,
    },
    /// First matching table inside the first matching container.
    Within {
        container: ElementMatcher,
        table: ElementMatcher,
    },
}

/// Produces flat field → text records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordRule {
    /// One record per container; each field is its first matching descendant.
    /// `constants` are added to every record as-is.
    Cards {
        container: ElementMatcher,
        fields: BTreeMap<String, ElementMatcher>,
        #[serde(default)]
        constants: BTreeMap<String, String>,
    },
    /// One record per row of the first matching table, labelled by `columns`.
    TableRows {
        table: ElementMatcher,
        columns: Vec<String>,
        #[serde(default = "default_true")]
        skip_header: bool,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqRules {
    pub heading: ElementMatcher,
    pub container: ElementMatcher,
    pub question: ElementMatcher,
    pub answer: ElementMatcher,
    /// Heading levels that close the FAQ block.
    pub stop_levels: Vec<u8>,
}

impl Default for FaqRules {
    fn default() -> Self {
        Self {
            heading: ElementMatcher::tags(&["h1", "h2", "h3"]).with_text("faq"),
            container: ElementMatcher::default().with_class("faq"),
            question: ElementMatcher::default().with_class("question"),
            answer: ElementMatcher::default().with_class("answer"),
            stop_levels: vec![1, 2, 3],
        }
    }
}

/// Everything the extractors need to know about a target site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Tables collected into `general_tables`.
    pub table: ElementMatcher,
    /// Keywords a heading must contain (case-insensitive) to open a section.
    pub section_keywords: Vec<String>,
    /// Heading levels scanned for sections.
    pub section_levels: Vec<u8>,
    pub faq: FaqRules,
    /// Lists collected into `bullet_points`.
    pub bullet_list: ElementMatcher,
    /// Heading levels that can name a bullet category.
    pub category_levels: Vec<u8>,
    /// Category used when no heading precedes a list.
    pub category_fallback: String,
    pub named_anchors: BTreeMap<String, AnchorRule>,
    pub records: BTreeMap<String, RecordRule>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            table: ElementMatcher::tag("table"),
            section_keywords: ["eligibility", "document", "feature", "benefit"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            section_levels: vec![1, 2, 3],
            faq: FaqRules::default(),
            bullet_list: ElementMatcher::tag("ul")
                .not_within(ElementMatcher::tag("li"))
                .not_within(ElementMatcher::tag("table"))
                .not_within(ElementMatcher::default().with_class("faq")),
            category_levels: vec![1, 2, 3],
            category_fallback: "Miscellaneous".to_string(),
            named_anchors: BTreeMap::from([(
                "eligibility".to_string(),
                AnchorRule::AfterHeading {
                    heading: ElementMatcher::tags(&["h1", "h2", "h3"]).with_text("eligibility"),
                    table: ElementMatcher::tag("table"),
                },
            )]),
            records: BTreeMap::new(),
        }
    }
}

/// Built-in configurations for the loan pages this extractor grew up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    Generic,
    HomeLoan,
    PersonalLoan,
    CarLoan,
    EducationLoan,
}

const STRUCTURED_TABLE: &[&str] = &["ui", "celled", "striped", "structured", "table"];

fn structured_table() -> ElementMatcher {
    STRUCTURED_TABLE
        .iter()
        .fold(ElementMatcher::tag("table"), |m, c| m.with_class(c))
}

fn loan_details_rows(columns: &[&str]) -> RecordRule {
    RecordRule::TableRows {
        table: ElementMatcher::tag("table").with_attr("data-testid", "table-"),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        skip_header: true,
    }
}

impl ExtractorConfig {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Generic => Self::default(),
            Preset::HomeLoan => Self {
                table: structured_table(),
                bullet_list: ElementMatcher::tag("ul").with_class("ui").with_class("list"),
                category_levels: vec![2],
                named_anchors: BTreeMap::from([
                    (
                        "home_loan_eligibility".to_string(),
                        AnchorRule::AfterHeading {
                            heading: ElementMatcher::tag("h2").with_id("home_loan_eligi_6"),
                            table: structured_table(),
                        },
                    ),
                    (
                        "hfm_table".to_string(),
                        AnchorRule::Within {
                            container: ElementMatcher::tag("div").with_class("hfm-table"),
                            table: structured_table(),
                        },
                    ),
                ]),
                ..Self::default()
            },
            Preset::PersonalLoan => Self {
                records: BTreeMap::from([(
                    "loan_cards".to_string(),
                    RecordRule::Cards {
                        container: ElementMatcher::tag("div").with_class("loan-card"),
                        fields: BTreeMap::from([
                            (
                                "Bank Name".to_string(),
                                ElementMatcher::tag("h3").with_class("bank-name"),
                            ),
                            (
                                "Interest Rate".to_string(),
                                ElementMatcher::tag("div").with_class("interest-rate"),
                            ),
                            (
                                "Loan Amount".to_string(),
                                ElementMatcher::tag("div").with_class("loan-amount"),
                            ),
                        ]),
                        constants: BTreeMap::from([("Loan Type".to_string(), "Personal Loan".to_string())]),
                    },
                )]),
                ..Self::default()
            },
            Preset::CarLoan => Self {
                records: BTreeMap::from([(
                    "loan_details".to_string(),
                    loan_details_rows(&["Bank Name", "Interest Rate (p.a.)", "Processing Fee"]),
                )]),
                ..Self::default()
            },
            Preset::EducationLoan => Self {
                records: BTreeMap::from([(
                    "loan_details".to_string(),
                    loan_details_rows(&["Bank Name", "Interest Rate", "Processing Fee"]),
                )]),
                ..Self::default()
            },
        }
    }

    /// Read a JSON config file. Missing fields fall back to the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config JSON in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, levels) in [
            ("section_levels", &self.section_levels),
            ("category_levels", &self.category_levels),
            ("faq.stop_levels", &self.faq.stop_levels),
        ] {
            if let Some(bad) = levels.iter().find(|l| !(1..=6).contains(*l)) {
                bail!("{name}: heading level {bad} is outside 1..=6");
            }
        }
        if self.section_keywords.iter().any(|k| k.trim().is_empty()) {
            bail!("section_keywords: keywords must not be blank");
        }

        self.table.validate("table")?;
        self.bullet_list.validate("bullet_list")?;
        self.faq.heading.validate("faq.heading")?;
        self.faq.container.validate("faq.container")?;
        self.faq.question.validate("faq.question")?;
        self.faq.answer.validate("faq.answer")?;

        for (name, rule) in &self.named_anchors {
            match rule {
                AnchorRule::First { table } => table.validate(&format!("named_anchors.{name}"))?,
                AnchorRule::AfterHeading { heading, table } => {
                    heading.validate(&format!("named_anchors.{name}.heading"))?;
                    table.validate(&format!("named_anchors.{name}.table"))?;
                }
                AnchorRule::Within { container, table } => {
                    container.validate(&format!("named_anchors.{name}.container"))?;
                    table.validate(&format!("named_anchors.{name}.table"))?;
                }
            }
        }

        for (name, rule) in &self.records {
            match rule {
                RecordRule::Cards { container, fields, .. } => {
                    if fields.is_empty() {
                        bail!("records.{name}: card rule has no fields");
                    }
                    container.validate(&format!("records.{name}.container"))?;
                    for (field, m) in fields {
                        m.validate(&format!("records.{name}.fields.{field}"))?;
                    }
                }
                RecordRule::TableRows { table, columns, .. } => {
                    if columns.is_empty() {
                        bail!("records.{name}: table_rows rule has no columns");
                    }
                    table.validate(&format!("records.{name}.table"))?;
                }
            }
        }
        Ok(())
    }
}
