//! Second-opinion validators
//!
//! Independent re-analysis of the raw audio under each decided chord segment:
//! - [`BassValidator`]: multi-estimator bass pitch vote, slash-bass and root rewrites
//! - [`QualityValidator`]: major vs. minor third comparison with rolling history
//!
//! Validators are advisory. Every segment they look at yields a [`ValidationRecord`]
//! stating what was detected, what label was suggested, with which confidence, and
//! whether the suggestion was applied. Per-segment evidence is gathered in parallel;
//! decisions are applied in timeline order.

pub mod bass;
pub mod quality;

pub use bass::{BassDetection, BassValidator};
pub use quality::{QualityValidator, ThirdEvidence};

use crate::analysis::result::ChordEvent;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Marker recorded when no stable bass was found
pub const NO_BASS: &str = "NO_BASS";

/// Which validator produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    /// Bass pitch validator
    Bass,
    /// Major/minor quality validator
    Quality,
}

/// Audit entry for one validator decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Producing validator
    pub validator: ValidatorKind,
    /// Index of the event in the returned timeline
    pub event_index: usize,
    /// Event start time in seconds
    pub time: f32,
    /// Label before validation
    pub original_label: String,
    /// What the validator measured (note name, "major"/"minor", or `NO_BASS`)
    pub detected: String,
    /// Label the validator suggests
    pub suggested_label: String,
    /// Confidence of the detection (0.0-1.0)
    pub confidence: f32,
    /// Whether the suggestion replaced the label
    pub applied: bool,
}

/// Sample range of every event: from its start frame to the next event's start frame
pub fn segment_ranges(events: &[ChordEvent], hop_size: usize, n_samples: usize) -> Vec<Range<usize>> {
    (0..events.len())
        .map(|i| {
            let start = (events[i].frame_index * hop_size).min(n_samples);
            let end = events
                .get(i + 1)
                .map_or(n_samples, |next| (next.frame_index * hop_size).min(n_samples))
                .max(start);
            start..end
        })
        .collect()
}

/// Point records at the merged timeline after duplicate neighbours were collapsed
///
/// `index_map[i]` is the merged index of pre-merge event `i`; records outside the map
/// are left untouched.
pub fn remap_records(records: &mut [ValidationRecord], index_map: &[usize], events: &[ChordEvent]) {
    for record in records.iter_mut() {
        let Some(&merged) = index_map.get(record.event_index) else {
            continue;
        };
        if let Some(event) = events.get(merged) {
            record.event_index = merged;
            record.time = event.time;
        }
    }
}
