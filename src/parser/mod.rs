pub mod dom;
pub mod extract;
pub mod sections;

use scraper::{ElementRef, Html};

use crate::config::ExtractorConfig;
use extract::ExtractionResult;

/// Parse an HTML page and run every extractor over it.
pub fn process_page(html: &str, config: &ExtractorConfig) -> ExtractionResult {
    let document = Html::parse_document(html);
    aggregate(document.root_element(), config)
}

/// Extract from an already-parsed tree. Never fails; missing pieces come back empty.
pub fn aggregate(root: ElementRef<'_>, config: &ExtractorConfig) -> ExtractionResult {
    extract::extract_all(root, config)
}
