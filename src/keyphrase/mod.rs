//! Keyphrase consolidation and export
//!
//! Extraction methods themselves live outside this crate behind
//! [`KeyphraseExtractor`]; this module merges what they return.

pub mod consolidate;
pub mod extract;
pub mod lcs;
pub mod similarity;

pub use consolidate::{
    find_keys_in_text, keyphrase_difference, partial_match, remove_common_strings, ConsolidationParams,
    KeyphraseConsolidator,
};
pub use extract::{
    export_keyphrases, load_auxiliary_keyphrases, ExportColumns, ExportReport, ExtractionParams, KeyphraseExtractor,
};
pub use lcs::longest_common_substring;
pub use similarity::SimilarityMeasure;
