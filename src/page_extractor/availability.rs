use crate::utils::constants::AVAILABLE_MARKERS;

/// Whether a raw availability value signals a purchasable item
///
/// Lower-cases and checks for `instock` or `backorder` as substrings. No
/// other normalization: `"In Stock"` with a space does not match.
#[must_use]
pub fn is_available(raw: &str) -> bool {
    let lowered = raw.to_lowercase();
    AVAILABLE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
