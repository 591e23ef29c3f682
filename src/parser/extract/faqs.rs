use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FaqRules;
use crate::parser::dom;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// Question/answer pairs from the FAQ block under the first FAQ heading.
/// No FAQ heading means no entries.
pub fn extract(root: ElementRef<'_>, rules: &FaqRules) -> Vec<FaqEntry> {
    let Some(heading) = rules.heading.find_first(root) else {
        debug!("No FAQ heading found");
        return Vec::new();
    };

    let mut entries = Vec::new();
    for sibling in dom::following_siblings(heading) {
        if dom::heading_level(sibling).is_some_and(|l| rules.stop_levels.contains(&l)) {
            break;
        }
        for container in dom::outermost(sibling, &rules.container) {
            entries.extend(pair(container, rules));
        }
    }

    debug!("Found {} FAQ entries under {:?}", entries.len(), dom::text_of(heading));
    entries
}

/// Pair questions with answers by position; the longer side's excess is dropped.
pub fn pair(container: ElementRef<'_>, rules: &FaqRules) -> Vec<FaqEntry> {
    let questions: Vec<String> = rules.question.find_all(container).into_iter().map(dom::text_of).collect();
    let answers: Vec<String> = rules.answer.find_all(container).into_iter().map(dom::text_of).collect();

    if questions.len() != answers.len() {
        debug!(
            "FAQ block has {} questions and {} answers, dropping the unmatched tail",
            questions.len(),
            answers.len()
        );
    }

    questions
        .into_iter()
        .zip(answers)
        .map(|(question, answer)| FaqEntry { question, answer })
        .collect()
}

// ── Tests ──
