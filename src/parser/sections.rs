use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use scraper::ElementRef;
use tracing::{debug, warn};

use super::dom::{self, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub content: Vec<String>,
}

/// Case-insensitive "contains any of" predicate over heading text.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    re: Option<Regex>,
}

impl KeywordSet {
    pub fn new(keywords: &[String]) -> Self {
        let alternation = keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Self { re: None };
        }
        match RegexBuilder::new(&alternation).case_insensitive(true).build() {
            Ok(re) => Self { re: Some(re) },
            Err(e) => {
                warn!("Keyword set could not be compiled, no sections will match: {}", e);
                Self { re: None }
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.re.as_ref().is_some_and(|re| re.is_match(text))
    }
}

/// Keyword sections keyed by heading text. Later duplicates overwrite earlier ones.
pub fn extract_sections(root: ElementRef<'_>, keywords: &KeywordSet, levels: &[u8]) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for section in scan_sections(root, keywords, levels) {
        if out.insert(section.title.clone(), section.content).is_some() {
            debug!("Section {:?} appears more than once, keeping the later one", section.title);
        }
    }
    out
}

/// Non-empty keyword sections in document order.
pub fn scan_sections(root: ElementRef<'_>, keywords: &KeywordSet, levels: &[u8]) -> Vec<Section> {
    let mut sections = Vec::new();
    for heading in dom::elements(root) {
        let Some(level) = dom::heading_level(heading) else {
            continue;
        };
        if !levels.contains(&level) {
            continue;
        }
        let title = dom::text_of(heading);
        if !keywords.is_match(&title) {
            continue;
        }

        let section = collect_section(heading, title, level, levels);
        if section.content.is_empty() {
            debug!("Dropping empty section {:?}", section.title);
            continue;
        }
        sections.push(section);
    }
    sections
}

/// Walk the heading's following siblings until a heading of the same or higher
/// rank, collecting list items and paragraph text.
pub fn collect_section(heading: ElementRef<'_>, title: String, level: u8, levels: &[u8]) -> Section {
    let mut content = Vec::new();
    for sibling in dom::following_siblings(heading) {
        match dom::classify(sibling) {
            NodeKind::Heading(l) if l <= level && levels.contains(&l) => break,
            NodeKind::List => content.extend(dom::list_items(sibling)),
            NodeKind::Paragraph => {
                let text = dom::text_of(sibling);
                if !text.is_empty() {
                    content.push(text);
                }
            }
            _ => {}
        }
    }
    Section { title, content }
}

// ── Tests ──
