//! Conversion between the two identifier encodings used by roster and detections.
//!
//! The recognition service labels people in key form (words joined by
//! underscores, `Jane_Doe`) while the roster carries human-readable display
//! names (`Jane Doe`). The two sources pick their separators independently, so
//! no inverse key encoding is assumed; callers compare identifiers by
//! normalizing BOTH sides to display form.
//!
//! A display name that legitimately contains an underscore is
//! indistinguishable from a key-encoded space. The ambiguity is inherent to
//! the encoding and left unresolved here.

/// Convert a key-form identifier to display form.
///
/// Every underscore becomes a single space; already-normalized input passes
/// through unchanged, so the conversion is idempotent.
pub fn to_display(key: &str) -> String {
    key.replace('_', " ")
}

/// The form used for equality checks between roster names and detection
/// labels. Both sides go through this before comparison.
pub fn comparison_key(raw: &str) -> String {
    to_display(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_underscore_with_a_space() {
        assert_eq!(to_display("Jane_Doe"), "Jane Doe");
        assert_eq!(to_display("Amit_Kumar_Jr"), "Amit Kumar Jr");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = to_display("Jane_Doe");
        assert_eq!(to_display(&once), once);
        assert_eq!(to_display("Jane Doe"), "Jane Doe");
    }

    #[test]
    fn comparison_keys_agree_across_encodings() {
        assert_eq!(comparison_key("Jane_Doe"), comparison_key("Jane Doe"));
    }

    #[test]
    fn adjacent_underscores_are_not_collapsed() {
        assert_eq!(to_display("a__b"), "a  b");
    }
}
