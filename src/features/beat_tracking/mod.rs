//! Beat tracking modules
//!
//! Generate a beat grid from the BPM estimate. Tempo is assumed constant across the
//! track; the grid is phase-anchored at the first non-quiet frame.

pub mod grid;

pub use grid::{generate_beat_grid, nearest_beat, BEATS_PER_BAR};
