use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

use crate::config::ElementMatcher;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Coarse role of an element as far as the extractors care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Heading(u8),
    List,
    ListItem,
    Paragraph,
    Table,
    Row,
    Cell,
    Other,
}

pub fn classify(el: ElementRef<'_>) -> NodeKind {
    match el.value().name() {
        "h1" => NodeKind::Heading(1),
        "h2" => NodeKind::Heading(2),
        "h3" => NodeKind::Heading(3),
        "h4" => NodeKind::Heading(4),
        "h5" => NodeKind::Heading(5),
        "h6" => NodeKind::Heading(6),
        "ul" | "ol" => NodeKind::List,
        "li" => NodeKind::ListItem,
        "p" => NodeKind::Paragraph,
        "table" => NodeKind::Table,
        "tr" => NodeKind::Row,
        "td" | "th" => NodeKind::Cell,
        _ => NodeKind::Other,
    }
}

pub fn heading_level(el: ElementRef<'_>) -> Option<u8> {
    match classify(el) {
        NodeKind::Heading(level) => Some(level),
        _ => None,
    }
}

/// All text below `el`, trimmed, with whitespace runs collapsed to one space.
pub fn text_of(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

/// `root` and every element below it, in document order.
pub fn elements<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants().filter_map(ElementRef::wrap)
}

/// Element siblings after `el`, in document order.
pub fn following_siblings<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.next_siblings().filter_map(ElementRef::wrap)
}

/// Element ancestors of `el`, nearest first.
pub fn ancestors<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.ancestors().filter_map(ElementRef::wrap)
}

pub fn same_node(a: ElementRef<'_>, b: ElementRef<'_>) -> bool {
    a.id() == b.id()
}

/// True when the nearest ancestor of kind `kind` is `owner`.
/// Keeps rows of nested tables and items of nested lists with their own parent.
pub fn owned_by(el: ElementRef<'_>, owner: ElementRef<'_>, kind: NodeKind) -> bool {
    ancestors(el)
        .find(|a| classify(*a) == kind)
        .is_some_and(|a| same_node(a, owner))
}

/// Non-blank text of the list's own `<li>` items.
pub fn list_items(list: ElementRef<'_>) -> Vec<String> {
    elements(list)
        .filter(|el| classify(*el) == NodeKind::ListItem && owned_by(*el, list, NodeKind::List))
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Matches that are not nested inside another match, in document order.
pub fn outermost<'a>(root: ElementRef<'a>, matcher: &ElementMatcher) -> Vec<ElementRef<'a>> {
    let mut found = Vec::new();
    collect_outermost(root, matcher, &mut found);
    found
}

fn collect_outermost<'a>(el: ElementRef<'a>, matcher: &ElementMatcher, found: &mut Vec<ElementRef<'a>>) {
    if matcher.matches(el) {
        found.push(el);
        return;
    }
    for child in el.children().filter_map(ElementRef::wrap) {
        collect_outermost(child, matcher, found);
    }
}

impl ElementMatcher {
    pub fn matches(&self, el: ElementRef<'_>) -> bool {
        let element = el.value();

        if !self.tags.is_empty() && !self.tags.iter().any(|t| t.eq_ignore_ascii_case(element.name())) {
            return false;
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.classes().any(|have| have == c.as_str())) {
            return false;
        }
        if self.attrs.iter().any(|(k, v)| element.attr(k) != Some(v.as_str())) {
            return false;
        }
        if !self
            .attr_contains
            .iter()
            .all(|(k, v)| element.attr(k).is_some_and(|a| a.contains(v.as_str())))
        {
            return false;
        }
        if let Some(needle) = &self.text_contains {
            if !text_of(el).to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(outer) = &self.within {
            if !ancestors(el).any(|a| outer.matches(a)) {
                return false;
            }
        }
        !self
            .not_within
            .iter()
            .any(|m| ancestors(el).any(|a| m.matches(a)))
    }

    /// Every match under `root` (inclusive), in document order.
    pub fn find_all<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        elements(root).filter(|el| self.matches(*el)).collect()
    }

    pub fn find_first<'a>(&self, root: ElementRef<'a>) -> Option<ElementRef<'a>> {
        elements(root).find(|el| self.matches(*el))
    }

    /// First match strictly after `anchor` in document order (its descendants count).
    pub fn find_after<'a>(&self, root: ElementRef<'a>, anchor: ElementRef<'a>) -> Option<ElementRef<'a>> {
        elements(root)
            .skip_while(|el| !same_node(*el, anchor))
            .skip(1)
            .find(|el| self.matches(*el))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: u8,
    pub text: String,
}

/// Every heading h1–h6 in document order.
pub fn outline(root: ElementRef<'_>) -> Vec<OutlineEntry> {
    elements(root)
        .filter_map(|el| {
            heading_level(el).map(|level| OutlineEntry {
                level,
                text: text_of(el),
            })
        })
        .collect()
}

// ── Tests ──
