//! Beam-searched Viterbi chord tracker
//!
//! States are the chord candidates of the current key. For every frame the tracker
//! scores each candidate against the frame's chroma, bass and energy (emission), then
//! finds the best predecessor among the `beam_width` highest-scoring states of the
//! previous frame (transition). Backtracking yields one state per frame; runs of the
//! same state collapse into a single timeline event.
//!
//! # Algorithm
//!
//! ```text
//! delta[0][s]  = emit(0, s)
//! delta[i][s]  = max_{p in beam(i-1)} (delta[i-1][p] - cost(p, s)) + emit(i, s)
//! beam(i)      = top-K states of delta[i] (ties: lower index)
//! ```

use super::transitions::transition_matrix;
use super::vocabulary::{candidates_for_key, ChordCandidate};
use crate::analysis::result::{ChordEvent, Key};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::chroma::normalization::cosine_similarity;
use crate::features::chroma::FrameFeatures;
use std::cmp::Ordering;

/// Minimum cosine similarity for a candidate to be considered at all
pub const MIN_TEMPLATE_SIMILARITY: f32 = 0.35;

/// Emission bonus for diatonic candidates
const DIATONIC_BONUS: f32 = 0.20;

/// Emission penalty for borrowed candidates
const BORROWED_PENALTY: f32 = 0.25;

/// Bass-on-root bonus, scaled by the configured bass multiplier
const BASS_ROOT_BONUS: f32 = 0.15;

/// Penalty on frames quieter than the 30th energy percentile
const LOW_ENERGY_PENALTY: f32 = 0.30;

/// Key-constrained chord tracker
#[derive(Debug, Clone)]
pub struct ChordTracker {
    key: Key,
    candidates: Vec<ChordCandidate>,
    templates: Vec<[f32; 12]>,
    costs: Vec<Vec<f32>>,
    bass_multiplier: f32,
    beam_width: usize,
}

impl ChordTracker {
    /// Build the vocabulary, templates and transition costs for `key`
    pub fn new(key: Key, config: &AnalysisConfig) -> Self {
        let candidates = candidates_for_key(&key);
        let templates = candidates.iter().map(|c| c.template()).collect();
        let costs = transition_matrix(&candidates, &key);
        Self {
            key,
            candidates,
            templates,
            costs,
            bass_multiplier: config.bass_multiplier,
            beam_width: config.beam_width.max(1),
        }
    }

    /// Key the vocabulary was built for
    pub fn key(&self) -> Key {
        self.key
    }

    /// Tracker states
    pub fn candidates(&self) -> &[ChordCandidate] {
        &self.candidates
    }

    /// Emission score of candidate `state` at frame `frame` (`-inf` when rejected)
    pub fn emission(&self, features: &FrameFeatures, frame: usize, state: usize) -> f32 {
        let candidate = &self.candidates[state];
        let similarity = cosine_similarity(&features.chroma[frame], &self.templates[state]);
        if similarity < MIN_TEMPLATE_SIMILARITY {
            return f32::NEG_INFINITY;
        }

        let mut score = similarity;
        if candidate.borrowed {
            score -= BORROWED_PENALTY;
        } else {
            score += DIATONIC_BONUS;
        }
        if features.bass[frame] == Some(candidate.root) {
            score += BASS_ROOT_BONUS * self.bass_multiplier;
        }
        if features.energy[frame] < features.percentiles.p30 {
            score -= LOW_ENERGY_PENALTY;
        }
        score
    }

    /// Emission scores of all states at `frame`
    ///
    /// When every candidate is rejected the frame carries no information; all states
    /// then score 0 so the path is decided by transitions alone.
    pub fn emission_scores(&self, features: &FrameFeatures, frame: usize) -> Vec<f32> {
        let scores: Vec<f32> = (0..self.candidates.len())
            .map(|s| self.emission(features, frame, s))
            .collect();
        if scores.iter().all(|s| *s == f32::NEG_INFINITY) {
            vec![0.0; scores.len()]
        } else {
            scores
        }
    }

    /// Most likely state index per frame
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ProcessingError` if the feature arrays disagree in length
    pub fn decode(&self, features: &FrameFeatures) -> Result<Vec<usize>, AnalysisError> {
        let n_frames = features.len();
        if features.bass.len() != n_frames || features.energy.len() != n_frames {
            return Err(AnalysisError::ProcessingError(format!(
                "Feature length mismatch: chroma={}, bass={}, energy={}",
                n_frames,
                features.bass.len(),
                features.energy.len()
            )));
        }
        if n_frames == 0 {
            return Ok(Vec::new());
        }

        let n_states = self.candidates.len();
        let mut delta = self.emission_scores(features, 0);
        let mut backpointers: Vec<Vec<usize>> = Vec::with_capacity(n_frames);
        backpointers.push(vec![0; n_states]);

        for frame in 1..n_frames {
            let beam = top_k(&delta, self.beam_width);
            let emissions = self.emission_scores(features, frame);
            let mut next = vec![f32::NEG_INFINITY; n_states];
            let mut pointers = vec![0usize; n_states];

            for (state, emission) in emissions.iter().enumerate() {
                let mut best_score = f32::NEG_INFINITY;
                let mut best_prev = beam.first().copied().unwrap_or(0);
                for &prev in &beam {
                    let score = delta[prev] - self.costs[prev][state];
                    if score > best_score || (score == best_score && prev < best_prev) {
                        best_score = score;
                        best_prev = prev;
                    }
                }
                next[state] = best_score + emission;
                pointers[state] = best_prev;
            }

            delta = next;
            backpointers.push(pointers);
        }

        let mut state = argmax(&delta);
        let mut path = vec![0usize; n_frames];
        for frame in (0..n_frames).rev() {
            if state >= n_states {
                log::warn!("Corrupted backpointer {} at frame {}, using state 0", state, frame);
                state = 0;
            }
            path[frame] = state;
            state = backpointers[frame][state];
        }
        Ok(path)
    }

    /// Decode and collapse the state path into timeline events
    ///
    /// Each run of identical states becomes one event at the run's first frame.
    pub fn track(&self, features: &FrameFeatures) -> Result<Vec<ChordEvent>, AnalysisError> {
        let path = self.decode(features)?;
        let events = collapse_path(&path, &self.candidates, features);
        log::debug!(
            "Tracked {} frames in {} ({} states, beam {}): {} events",
            path.len(),
            self.key.name(),
            self.candidates.len(),
            self.beam_width,
            events.len()
        );
        Ok(events)
    }
}

/// One event per run of identical states
pub fn collapse_path(path: &[usize], candidates: &[ChordCandidate], features: &FrameFeatures) -> Vec<ChordEvent> {
    let mut events: Vec<ChordEvent> = Vec::new();
    let mut previous: Option<usize> = None;
    for (frame, &state) in path.iter().enumerate() {
        if previous == Some(state) {
            continue;
        }
        previous = Some(state);
        let label = candidates.get(state).or(candidates.first()).map(|c| c.label.clone());
        if let Some(label) = label {
            events.push(ChordEvent::new(features.frame_time(frame), label, frame));
        }
    }
    events
}

/// Indices of the `k` largest finite scores (ties: lower index first)
fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    let finite = order.iter().take_while(|&&i| scores[i].is_finite()).count();
    order.truncate(k.min(finite.max(1)));
    order
}

/// Index of the largest score (ties: lower index)
fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    best
}
