use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text placed in every canonical field when structuring failed and the
/// note had to be substituted with a fallback.
pub const MANUAL_REVIEW: &str = "Requires manual review.";

/// The structured clinical note.
///
/// The five canonical fields are load-bearing for display and stay
/// strongly typed; anything else the structuring step emits is kept in the
/// flattened extension map so newer note templates survive a round-trip
/// without a type change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredNote {
    pub chief_complaint: String,
    pub history_of_present_illness: String,
    pub physical_exam: String,
    pub assessment: String,
    pub plan: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl StructuredNote {
    /// The fallback note: every canonical field flags manual review. Used
    /// when the structuring step produced nothing usable; the raw
    /// transcript is kept, only the note degrades.
    pub fn manual_review() -> Self {
        Self {
            chief_complaint: MANUAL_REVIEW.to_string(),
            history_of_present_illness: MANUAL_REVIEW.to_string(),
            physical_exam: MANUAL_REVIEW.to_string(),
            assessment: MANUAL_REVIEW.to_string(),
            plan: MANUAL_REVIEW.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    /// Tolerant parse of a backend `structured_note` payload. Returns
    /// `None` when the value is not an object carrying all five canonical
    /// fields as strings.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    pub fn is_manual_review(&self) -> bool {
        self.chief_complaint == MANUAL_REVIEW
            && self.history_of_present_illness == MANUAL_REVIEW
            && self.physical_exam == MANUAL_REVIEW
            && self.assessment == MANUAL_REVIEW
            && self.plan == MANUAL_REVIEW
    }
}
