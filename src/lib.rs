//! Structured extraction from semi-structured HTML pages.
//!
//! Hand [`parser::process_page`] an HTML string (or [`parser::aggregate`] an
//! already-parsed tree) plus an [`ExtractorConfig`] and get back one
//! [`ExtractionResult`]: tables, categorized bullet lists, keyword sections,
//! FAQ pairs and field records. Fetching and persistence are left to the caller.

pub mod config;
pub mod parser;

pub use config::{AnchorRule, ElementMatcher, ExtractorConfig, FaqRules, Preset, RecordRule};
pub use parser::extract::{ExtractionResult, FaqEntry, Record, Table};
pub use parser::{aggregate, process_page};
