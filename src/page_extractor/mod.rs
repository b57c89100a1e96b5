//! Structured-data extraction from the loaded product page
//!
//! Reads one attribute per logical field and classifies availability.
//! Extraction is all-or-nothing: a missing field fails the whole step.

mod availability;
mod fields;

pub use availability::is_available;
pub use fields::{ExtractedFields, ExtractionPolicy, extract};
