//! Detection-to-roster reconciliation.
//!
//! Merges the enrolled roster with the labels the recognition service
//! returned for one uploaded photo, producing a presence verdict per roster
//! entry. Verdicts are a view over their inputs; they are recomputed whenever
//! either side changes and never stored.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::identity;

/// The enrolled roster: display name mapped to roll number, as fetched from
/// the backend. Owned by whichever screen fetched it.
pub type Roster = BTreeMap<String, String>;

/// Pixel location of a detected face within the uploaded photo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct BoundingBox {
    /// Offset from the top edge.
    #[serde(default)]
    pub top: f64,
    /// Offset from the left edge.
    #[serde(default)]
    pub left: f64,
}

/// One recognized identity from the recognition service, for one photo.
/// Ephemeral; never persisted client-side.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DetectionResult {
    /// Recognized label in key form (`Jane_Doe`).
    #[serde(rename = "student")]
    pub label: String,
    /// Roll number reported by the service.
    #[serde(rename = "roll")]
    pub roll_number: String,
    /// Confidence in `[0, 100]`. Carried for display only; it never gates
    /// presence.
    #[serde(rename = "confidence")]
    pub confidence_percent: f64,
    /// Face location within the photo.
    #[serde(rename = "location", default)]
    pub bounding_box: BoundingBox,
}

/// Per-roster-entry presence verdict derived from one detection list.
#[derive(Clone, Debug, PartialEq)]
pub struct PresenceVerdict {
    /// Roster display name.
    pub display_name: String,
    /// Roster roll number.
    pub roll_number: String,
    /// Whether any detection matched this entry.
    pub present: bool,
    /// The matching detection, carried for display. First match wins when
    /// the service reports duplicates.
    pub matched: Option<DetectionResult>,
}

/// Produce one verdict per roster entry.
///
/// An entry is present iff some detection's normalized label equals the
/// entry's normalized display name. Runs in O(N+M) via a lookup keyed by
/// normalized label; rosters can reach hundreds of entries.
pub fn reconcile(roster: &Roster, detections: &[DetectionResult]) -> Vec<PresenceVerdict> {
    let mut by_label: HashMap<String, &DetectionResult> =
        HashMap::with_capacity(detections.len());
    for detection in detections {
        // First occurrence wins; duplicates are independent evidence, not
        // merged.
        by_label
            .entry(identity::comparison_key(&detection.label))
            .or_insert(detection);
    }

    roster
        .iter()
        .map(|(display_name, roll_number)| {
            let matched = by_label
                .get(&identity::comparison_key(display_name))
                .map(|detection| (*detection).clone());
            PresenceVerdict {
                display_name: display_name.clone(),
                roll_number: roll_number.clone(),
                present: matched.is_some(),
                matched,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str, roll: &str, confidence: f64) -> DetectionResult {
        DetectionResult {
            label: label.to_string(),
            roll_number: roll.to_string(),
            confidence_percent: confidence,
            bounding_box: BoundingBox::default(),
        }
    }

    fn roster(entries: &[(&str, &str)]) -> Roster {
        entries
            .iter()
            .map(|(name, roll)| (name.to_string(), roll.to_string()))
            .collect()
    }

    #[test]
    fn matches_key_form_labels_against_display_names() {
        let roster = roster(&[("Jane_Doe", "R01"), ("Amit_Kumar", "R02")]);
        let detections = vec![detection("Jane_Doe", "R01", 91.0)];
        let verdicts = reconcile(&roster, &detections);

        assert_eq!(verdicts.len(), 2);
        let amit = verdicts.iter().find(|v| v.display_name == "Amit_Kumar").unwrap();
        let jane = verdicts.iter().find(|v| v.display_name == "Jane_Doe").unwrap();
        assert!(jane.present);
        assert_eq!(jane.matched.as_ref().unwrap().roll_number, "R01");
        assert!(!amit.present);
        assert!(amit.matched.is_none());
    }

    #[test]
    fn mixed_encodings_on_either_side_still_match() {
        let roster = roster(&[("Jane Doe", "R01")]);
        let detections = vec![detection("Jane_Doe", "R01", 77.5)];
        assert!(reconcile(&roster, &detections)[0].present);
    }

    #[test]
    fn empty_detections_mean_everyone_absent() {
        let roster = roster(&[("A", "1"), ("B", "2"), ("C", "3")]);
        let verdicts = reconcile(&roster, &[]);
        assert_eq!(verdicts.len(), 3);
        assert!(verdicts.iter().all(|v| !v.present && v.matched.is_none()));
    }

    #[test]
    fn output_is_exactly_one_verdict_per_roster_entry() {
        let roster = roster(&[("Jane_Doe", "R01"), ("Amit_Kumar", "R02")]);
        // More detections than roster entries, including an unknown face.
        let detections = vec![
            detection("Jane_Doe", "R01", 91.0),
            detection("Jane_Doe", "R01", 45.0),
            detection("Unknown_Person", "R99", 88.0),
        ];
        let verdicts = reconcile(&roster, &detections);
        assert_eq!(verdicts.len(), roster.len());
        let mut names: Vec<_> = verdicts.iter().map(|v| v.display_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), roster.len());
        assert!(!names.contains(&"Unknown_Person"));
    }

    #[test]
    fn first_duplicate_detection_wins() {
        let roster = roster(&[("Jane_Doe", "R01")]);
        let detections = vec![
            detection("Jane_Doe", "R01", 91.0),
            detection("Jane_Doe", "R01", 33.0),
        ];
        let verdicts = reconcile(&roster, &detections);
        assert_eq!(
            verdicts[0].matched.as_ref().unwrap().confidence_percent,
            91.0
        );
    }

    #[test]
    fn no_threshold_applied_to_confidence() {
        let roster = roster(&[("Jane_Doe", "R01")]);
        // Even a near-zero confidence detection counts as present.
        let detections = vec![detection("Jane_Doe", "R01", 0.5)];
        assert!(reconcile(&roster, &detections)[0].present);
    }

    #[test]
    fn detection_wire_shape_deserializes() {
        let raw = r#"{
            "student": "Jane_Doe",
            "roll": "R01",
            "confidence": 91.25,
            "location": {"top": 12.0, "left": 40.0, "right": 90.0, "bottom": 70.0}
        }"#;
        let parsed: DetectionResult = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.label, "Jane_Doe");
        assert_eq!(parsed.roll_number, "R01");
        assert_eq!(parsed.confidence_percent, 91.25);
        assert_eq!(parsed.bounding_box.top, 12.0);
        assert_eq!(parsed.bounding_box.left, 40.0);
    }
}
