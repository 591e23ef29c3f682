use std::collections::BTreeMap;

use scraper::ElementRef;
use tracing::debug;

use crate::config::ElementMatcher;
use crate::parser::dom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletGroup {
    pub category: String,
    pub items: Vec<String>,
}

/// Category → items. A later list with the same category replaces the earlier one.
pub fn categorize(
    root: ElementRef<'_>,
    matcher: &ElementMatcher,
    category_levels: &[u8],
    fallback: &str,
) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for group in scan(root, matcher, category_levels, fallback) {
        if out.contains_key(&group.category) {
            debug!("Bullet category {:?} repeated, keeping the later list", group.category);
        }
        out.insert(group.category, group.items);
    }
    out
}

/// Non-empty bullet lists in document order, each named by the nearest heading
/// that precedes it anywhere in the document.
pub fn scan(root: ElementRef<'_>, matcher: &ElementMatcher, category_levels: &[u8], fallback: &str) -> Vec<BulletGroup> {
    let mut groups = Vec::new();
    let mut current: Option<String> = None;
    let mut seen = 0usize;

    for el in dom::elements(root) {
        if let Some(level) = dom::heading_level(el) {
            if category_levels.contains(&level) {
                let text = dom::text_of(el);
                if text.is_empty() {
                    debug!("Blank heading, following lists are filed under \"\"");
                }
                current = Some(text);
            }
            continue;
        }
        if !matcher.matches(el) {
            continue;
        }

        seen += 1;
        let items = dom::list_items(el);
        if items.is_empty() {
            continue;
        }
        groups.push(BulletGroup {
            category: current.clone().unwrap_or_else(|| fallback.to_string()),
            items,
        });
    }

    debug!("Found {} bullet lists, {} with items", seen, groups.len());
    groups
}

// ── Tests ──
